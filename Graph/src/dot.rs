use core::fmt::{Display, Formatter, Result};

use crate::{
	instruction::{Condition, Instruction, Jump, Source},
	Function,
};

#[derive(PartialEq, Eq, Clone, Copy)]
enum Vertex {
	Empty,
	Routing,
	Instructions,
}

impl Vertex {
	fn from_instructions(instructions: &[Instruction]) -> Self {
		if instructions.is_empty() {
			Self::Empty
		} else if instructions
			.iter()
			.all(|instruction| matches!(instruction, Instruction::Store(_) | Instruction::Jump(_)))
		{
			Self::Routing
		} else {
			Self::Instructions
		}
	}

	const fn group(self) -> &'static str {
		match self {
			Self::Empty => "A",
			Self::Routing => "B",
			Self::Instructions => "C",
		}
	}

	const fn color(self) -> &'static str {
		match self {
			Self::Empty => "#C2C5FA",
			Self::Routing => "#EF8784",
			Self::Instructions => "#FBE78E",
		}
	}
}

impl Display for Vertex {
	fn fmt(&self, f: &mut Formatter) -> Result {
		writeln!(
			f,
			"\tnode [fillcolor = \"{}\", group = {}];",
			self.color(),
			self.group()
		)
	}
}

fn fmt_condition(condition: Condition, f: &mut Formatter) -> Result {
	if condition.inverted {
		write!(f, "!")?;
	}

	match condition.source {
		Source::Value(value) => write!(f, "v{value}"),
		Source::Variable(variable) => write!(f, "p{}", variable.0),
		Source::Constant(data) => write!(f, "{data}"),
	}
}

fn fmt_instruction(instruction: Instruction, f: &mut Formatter) -> Result {
	match instruction {
		Instruction::Opaque(opaque) => write!(f, "op {}", opaque.operation),
		Instruction::Store(store) => {
			write!(f, "p{} = ", store.destination.0)?;
			fmt_condition(store.source, f)
		}
		Instruction::Jump(Jump::Goto { target }) => write!(f, "goto {target}"),
		Instruction::Jump(Jump::GotoIf {
			condition,
			then,
			other,
		}) => {
			write!(f, "goto_if ")?;
			fmt_condition(condition, f)?;
			write!(f, " {then} {other}")
		}
		Instruction::Jump(Jump::Return) => write!(f, "return"),
		Instruction::Jump(Jump::Break) => write!(f, "break"),
		Instruction::Jump(Jump::Continue) => write!(f, "continue"),
	}
}

pub struct Dot<'inner> {
	inner: &'inner Function,
}

impl<'inner> Dot<'inner> {
	#[must_use]
	pub const fn new(inner: &'inner Function) -> Self {
		Self { inner }
	}

	fn fmt_nodes(&self, f: &mut Formatter) -> Result {
		writeln!(f, "\tnode [shape = box, style = filled, ordering = out];")?;

		let mut last_vertex = Vertex::Instructions;

		last_vertex.fmt(f)?;

		self.inner.block_ids().try_for_each(|id| {
			let instructions = &self.inner.blocks[usize::from(id)].instructions;
			let vertex = Vertex::from_instructions(instructions);

			if vertex != last_vertex {
				last_vertex = vertex;

				last_vertex.fmt(f)?;
			}

			write!(f, "\tN{id} [xlabel = {id}, label = \"")?;

			instructions.iter().try_for_each(|&instruction| {
				fmt_instruction(instruction, f)?;

				write!(f, "\\l")
			})?;

			writeln!(f, "\"];")
		})
	}

	fn fmt_edges(&self, f: &mut Formatter) -> Result {
		writeln!(f, "\tedge [color = \"#444477\"];")?;

		self.inner.block_ids().try_for_each(|id| {
			self.inner.successors(id).try_for_each(|successor| {
				let style = if successor <= id {
					" [style = dashed]"
				} else {
					""
				};

				writeln!(f, "\tN{id} -> N{successor}{style};")
			})
		})
	}
}

impl Display for Dot<'_> {
	fn fmt(&self, f: &mut Formatter) -> Result {
		writeln!(f, "digraph {{")?;

		self.fmt_nodes(f)?;
		self.fmt_edges(f)?;

		writeln!(f, "}}")
	}
}
