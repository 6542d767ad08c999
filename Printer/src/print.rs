use std::io::{Result, Write};

use flow_graph::{
	instruction::{Condition, Instruction, Jump, Source},
	Element, Function,
};

fn write_condition(condition: Condition, out: &mut dyn Write) -> Result<()> {
	if condition.inverted {
		write!(out, "!")?;
	}

	match condition.source {
		Source::Value(value) => write!(out, "v{value}"),
		Source::Variable(variable) => write!(out, "p{}", variable.0),
		Source::Constant(data) => write!(out, "{data}"),
	}
}

/// Prints a function as brace delimited pseudocode. Blocks still
/// sitting at the top level of a partially structured function keep a
/// `bN:` label so their remaining `goto`s have something to name.
pub struct PseudoPrinter {
	depth: u16,
}

impl PseudoPrinter {
	#[must_use]
	pub const fn new() -> Self {
		Self { depth: 0 }
	}

	fn tab(&self, out: &mut dyn Write) -> Result<()> {
		(0..self.depth).try_for_each(|_| write!(out, "\t"))
	}

	const fn indent(&mut self) {
		self.depth = self.depth.wrapping_add(1);
	}

	const fn outdent(&mut self) {
		self.depth = self.depth.wrapping_sub(1);
	}

	/// # Errors
	///
	/// Returns any IO errors that the `out` produces during the process.
	pub fn print(&mut self, function: &Function, out: &mut dyn Write) -> Result<()> {
		self.depth = 0;

		self.print_container(function, Function::ROOT, out)
	}

	fn print_container(&mut self, function: &Function, container: u16, out: &mut dyn Write) -> Result<()> {
		for &element in &function.containers[usize::from(container)].elements {
			match element {
				Element::Block(id) => self.print_block(function, id, container, out)?,
				Element::If(id) => self.print_if(function, id, out)?,
				Element::Loop(id) => self.print_loop(function, id, out)?,
			}
		}

		Ok(())
	}

	fn print_block(
		&mut self,
		function: &Function,
		id: u16,
		container: u16,
		out: &mut dyn Write,
	) -> Result<()> {
		if container == Function::ROOT && !function.structured {
			writeln!(out, "b{id}:")?;
		}

		for &instruction in &function.blocks[usize::from(id)].instructions {
			self.tab(out)?;
			Self::print_instruction(instruction, out)?;
			writeln!(out)?;
		}

		Ok(())
	}

	fn print_instruction(instruction: Instruction, out: &mut dyn Write) -> Result<()> {
		match instruction {
			Instruction::Opaque(opaque) => write!(out, "op {}", opaque.operation),
			Instruction::Store(store) => {
				write!(out, "p{} = ", store.destination.0)?;
				write_condition(store.source, out)
			}
			Instruction::Jump(Jump::Goto { target }) => write!(out, "goto b{target}"),
			Instruction::Jump(Jump::GotoIf {
				condition,
				then,
				other,
			}) => {
				write!(out, "goto_if ")?;
				write_condition(condition, out)?;
				write!(out, " b{then} b{other}")
			}
			Instruction::Jump(Jump::Return) => write!(out, "return"),
			Instruction::Jump(Jump::Break) => write!(out, "break"),
			Instruction::Jump(Jump::Continue) => write!(out, "continue"),
		}
	}

	fn print_if(&mut self, function: &Function, id: u16, out: &mut dyn Write) -> Result<()> {
		let nif = &function.ifs[usize::from(id)];

		self.tab(out)?;
		write!(out, "if ")?;
		write_condition(nif.condition, out)?;
		writeln!(out, " {{")?;

		self.indent();
		self.print_container(function, nif.then_body, out)?;
		self.outdent();

		let else_body = nif.else_body;

		if function.containers[usize::from(else_body)].elements.is_empty() {
			self.tab(out)?;

			return writeln!(out, "}}");
		}

		self.tab(out)?;
		writeln!(out, "}} else {{")?;

		self.indent();
		self.print_container(function, else_body, out)?;
		self.outdent();

		self.tab(out)?;
		writeln!(out, "}}")
	}

	fn print_loop(&mut self, function: &Function, id: u16, out: &mut dyn Write) -> Result<()> {
		self.tab(out)?;
		writeln!(out, "loop {{")?;

		self.indent();
		self.print_container(function, function.loops[usize::from(id)].body, out)?;
		self.outdent();

		self.tab(out)?;
		writeln!(out, "}}")
	}
}

impl Default for PseudoPrinter {
	fn default() -> Self {
		Self::new()
	}
}
