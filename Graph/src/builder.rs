use alloc::vec::Vec;

use crate::{
	instruction::{Condition, Instruction, Jump, Store, Variable},
	Element, Function,
};

enum Frame {
	If(u16),
	Loop(u16),
}

/// An append cursor over one function. Emission always happens at the
/// tail of the current container; pushing an `If` or `Loop` moves the
/// cursor inside it and popping returns to where it was.
pub struct Builder<'function> {
	function: &'function mut Function,
	container: u16,
	frames: Vec<Frame>,
}

impl<'function> Builder<'function> {
	#[must_use]
	pub fn new(function: &'function mut Function, container: u16) -> Self {
		Self {
			function,
			container,
			frames: Vec::new(),
		}
	}

	#[must_use]
	pub fn function(&mut self) -> &mut Function {
		self.function
	}

	#[must_use]
	pub const fn container(&self) -> u16 {
		self.container
	}

	/// The block new instructions land in: the trailing block of the
	/// current container, or a fresh one when the container is empty,
	/// ends with structure, or its trailing block already terminated.
	pub fn block(&mut self) -> u16 {
		if let Some(&Element::Block(id)) = self.function.containers[usize::from(self.container)]
			.elements
			.last()
		{
			if self.function.jump(id).is_none() {
				return id;
			}
		}

		self.function.add_block(self.container)
	}

	pub fn store(&mut self, destination: Variable, source: Condition) {
		let id = self.block();

		self.function.push(
			id,
			Instruction::Store(Store {
				destination,
				source,
			}),
		);
	}

	pub fn jump(&mut self, jump: Jump) {
		let id = self.block();

		self.function.push(id, Instruction::Jump(jump));
	}

	pub fn variable(&mut self, name: &'static str) -> Variable {
		self.function.add_variable(name)
	}

	/// Relocates an existing block to the cursor.
	pub fn plant(&mut self, block: u16) {
		self.function.detach(Element::Block(block));
		self.function.attach(Element::Block(block), self.container);
	}

	pub fn push_if(&mut self, condition: Condition) -> u16 {
		// The element preceding an `If` is always its guard block.
		self.block();

		let id = self.function.add_if(self.container, condition);

		self.frames.push(Frame::If(id));
		self.container = self.function.ifs[usize::from(id)].then_body;

		id
	}

	pub fn push_else(&mut self) {
		let Some(&Frame::If(id)) = self.frames.last() else {
			unreachable!()
		};

		self.container = self.function.ifs[usize::from(id)].else_body;
	}

	pub fn pop_if(&mut self) {
		let Some(Frame::If(id)) = self.frames.pop() else {
			unreachable!()
		};

		self.container = self.function.ifs[usize::from(id)].parent;
	}

	pub fn push_loop(&mut self) -> u16 {
		let id = self.function.add_loop(self.container);

		self.frames.push(Frame::Loop(id));
		self.container = self.function.loops[usize::from(id)].body;

		id
	}

	pub fn pop_loop(&mut self) {
		let Some(Frame::Loop(id)) = self.frames.pop() else {
			unreachable!()
		};

		self.container = self.function.loops[usize::from(id)].parent;
	}
}
