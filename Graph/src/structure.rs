use alloc::vec::Vec;

use crate::instruction::Condition;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Element {
	Block(u16),
	If(u16),
	Loop(u16),
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Owner {
	Function,
	Then(u16),
	Else(u16),
	Loop(u16),
}

/// An ordered list of elements executed in sequence, owned by the
/// function body, one arm of an `If`, or the body of a `Loop`.
#[derive(Debug)]
pub struct Container {
	pub owner: Owner,
	pub elements: Vec<Element>,
}

impl Container {
	#[must_use]
	pub const fn new(owner: Owner) -> Self {
		Self {
			owner,
			elements: Vec::new(),
		}
	}
}

#[derive(Debug)]
pub struct If {
	pub condition: Condition,
	pub then_body: u16,
	pub else_body: u16,
	pub parent: u16,
}

#[derive(Debug)]
pub struct Loop {
	pub body: u16,
	pub parent: u16,
}
