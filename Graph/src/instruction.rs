/// A function scoped boolean storage location. These only come into
/// existence when the restructurer synthesizes routing decisions; input
/// graphs carry none.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Variable(pub u16);

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Source {
	Value(u16),
	Variable(Variable),
	Constant(bool),
}

/// A boolean operand, with negation folded in so no instruction is
/// needed to invert one.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Condition {
	pub source: Source,
	pub inverted: bool,
}

impl Condition {
	#[must_use]
	pub const fn value(value: u16) -> Self {
		Self {
			source: Source::Value(value),
			inverted: false,
		}
	}

	#[must_use]
	pub const fn variable(variable: Variable) -> Self {
		Self {
			source: Source::Variable(variable),
			inverted: false,
		}
	}

	#[must_use]
	pub const fn constant(data: bool) -> Self {
		Self {
			source: Source::Constant(data),
			inverted: false,
		}
	}

	#[must_use]
	pub const fn inverted(self) -> Self {
		Self {
			source: self.source,
			inverted: !self.inverted,
		}
	}
}

/// A relocatable unit of straight line code. Its meaning is external to
/// this crate; only the operation id is carried.
#[derive(Clone, Copy, Debug)]
pub struct Opaque {
	pub operation: u16,
}

#[derive(Clone, Copy, Debug)]
pub struct Store {
	pub destination: Variable,
	pub source: Condition,
}

/// A block terminator. `Goto` and `GotoIf` only appear in unstructured
/// input; `Return`, `Break`, and `Continue` only in structured output.
/// A block with no terminator falls through to its structural successor.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Jump {
	Goto {
		target: u16,
	},
	GotoIf {
		condition: Condition,
		then: u16,
		other: u16,
	},
	Return,
	Break,
	Continue,
}

#[derive(Clone, Copy, Debug)]
pub enum Instruction {
	Opaque(Opaque),
	Store(Store),
	Jump(Jump),
}
