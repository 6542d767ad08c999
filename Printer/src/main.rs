use std::io::{BufWriter, StdoutLock, Write};

use clap::Parser;
use flow_graph::Dot;
use flow_printer::{CfgParser, PseudoPrinter};
use flow_restructurer::{Folder, Restructurer};

#[derive(Parser)]
#[command(version)]
struct Arguments {
	/// The control flow description for processing
	file: String,

	/// Fold simple branches only instead of fully restructuring
	#[arg(long, short)]
	fold: bool,

	/// Print the parsed graph as Graphviz and exit
	#[arg(long, short)]
	dot: bool,
}

fn lock_standard_output() -> BufWriter<StdoutLock<'static>> {
	const DEFAULT_BUF_SIZE: usize = 1024 * 1024 * 1;

	BufWriter::with_capacity(DEFAULT_BUF_SIZE, std::io::stdout().lock())
}

fn main() {
	let arguments = Arguments::parse();
	let source = std::fs::read_to_string(arguments.file).unwrap();

	let mut parser = CfgParser::new();
	let mut function = parser
		.run(&source)
		.expect("`file` should be a control flow description");

	let mut output = lock_standard_output();

	if arguments.dot {
		write!(output, "{}", Dot::new(&function)).expect("graph should print");
		output.flush().expect("graph should print");

		return;
	}

	if arguments.fold {
		let mut folder = Folder::new();

		folder.run(&mut function).expect("branches should fold");
	} else {
		let mut restructurer = Restructurer::new();

		restructurer
			.run(&mut function)
			.expect("control flow should be supported");
	}

	let mut printer = PseudoPrinter::new();

	printer
		.print(&function, &mut output)
		.expect("source should print");
	output.flush().expect("source should print");
}
