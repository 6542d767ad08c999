mod parse;
mod print;

pub use self::{
	parse::{CfgParser, Error},
	print::PseudoPrinter,
};
