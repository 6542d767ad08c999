use alloc::vec::Vec;

use list::resizable::Resizable;

use crate::instruction::{Instruction, Jump};

#[derive(Debug)]
pub struct BasicBlock {
	pub instructions: Vec<Instruction>,

	pub predecessors: Resizable<u16, 7>,
	pub successors: Resizable<u16, 7>,

	pub parent: u16,
}

impl BasicBlock {
	#[must_use]
	pub const fn new(parent: u16) -> Self {
		Self {
			instructions: Vec::new(),
			predecessors: Resizable::new(),
			successors: Resizable::new(),
			parent,
		}
	}

	#[must_use]
	pub fn jump(&self) -> Option<Jump> {
		match self.instructions.last() {
			Some(&Instruction::Jump(jump)) => Some(jump),
			_ => None,
		}
	}

	pub fn take_jump(&mut self) -> Option<Jump> {
		let jump = self.jump();

		if jump.is_some() {
			self.instructions.pop();
		}

		jump
	}

}

impl Default for BasicBlock {
	fn default() -> Self {
		Self::new(u16::MAX)
	}
}
