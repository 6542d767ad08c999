use flow_graph::{
	instruction::{Instruction, Jump, Source},
	Function,
};
use flow_printer::CfgParser;

/// Builds functions out of textual control flow descriptions. Parsing
/// the same description twice yields one function to transform and one
/// to keep as the behavioral reference.
pub struct Loader {
	parser: CfgParser,
}

impl Loader {
	pub fn new() -> Self {
		Self {
			parser: CfgParser::new(),
		}
	}

	pub fn run(&mut self, source: &str) -> Function {
		self.parser
			.run(source)
			.expect("source should describe a control flow graph")
	}
}

/// How many distinct `Value` conditions the function branches on. The
/// ids are dense, so this bounds the assignment space to enumerate.
pub fn value_count(function: &Function) -> u32 {
	let mut count = 0;

	for id in function.block_ids() {
		for instruction in &function.blocks[usize::from(id)].instructions {
			if let Instruction::Jump(Jump::GotoIf { condition, .. }) = instruction {
				if let Source::Value(value) = condition.source {
					count = count.max(u32::from(value) + 1);
				}
			}
		}
	}

	count
}
