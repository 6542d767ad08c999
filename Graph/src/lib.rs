#![no_std]
#![expect(clippy::missing_panics_doc)]

extern crate alloc;

mod basic_block;
mod builder;
mod dot;
mod structure;

pub mod instruction;

use alloc::{vec, vec::Vec};

use self::instruction::{Condition, Instruction, Jump, Variable};

pub use self::{
	basic_block::BasicBlock,
	builder::Builder,
	dot::Dot,
	structure::{Container, Element, If, Loop, Owner},
};

/// A function body: an arena of basic blocks threaded two ways at once,
/// by predecessor and successor edges, and by membership in nested
/// containers. Unstructured input keeps every block in the root
/// container with `Goto`/`GotoIf` terminators; structured output nests
/// blocks under `If` and `Loop` elements.
///
/// The block at [`Function::END`] is the designated end block. It holds
/// no instructions, lives in no container, and every return edge
/// targets it.
#[derive(Debug)]
pub struct Function {
	pub blocks: Vec<BasicBlock>,
	pub containers: Vec<Container>,
	pub ifs: Vec<If>,
	pub loops: Vec<Loop>,

	pub entry: u16,
	pub structured: bool,

	variable_names: Vec<&'static str>,
}

impl Function {
	pub const END: u16 = 0;
	pub const ROOT: u16 = 0;

	const DETACHED: u16 = u16::MAX;

	#[must_use]
	pub fn new() -> Self {
		Self {
			blocks: vec![BasicBlock::new(Self::DETACHED)],
			containers: vec![Container::new(Owner::Function)],
			ifs: Vec::new(),
			loops: Vec::new(),

			entry: Self::END,
			structured: false,

			variable_names: Vec::new(),
		}
	}

	#[must_use]
	pub fn block_ids(&self) -> core::ops::Range<u16> {
		0..self.blocks.len().try_into().unwrap()
	}

	#[must_use]
	pub const fn is_end(&self, id: u16) -> bool {
		id == Self::END
	}

	pub fn predecessors(&self, id: u16) -> impl Iterator<Item = u16> + '_ {
		self.blocks[usize::from(id)].predecessors.iter().copied()
	}

	pub fn successors(&self, id: u16) -> impl Iterator<Item = u16> + '_ {
		self.blocks[usize::from(id)].successors.iter().copied()
	}

	pub fn add_block(&mut self, parent: u16) -> u16 {
		let id = self.blocks.len().try_into().unwrap();

		self.blocks.push(BasicBlock::new(parent));
		self.containers[usize::from(parent)]
			.elements
			.push(Element::Block(id));

		id
	}

	pub fn add_variable(&mut self, name: &'static str) -> Variable {
		let id = self.variable_names.len().try_into().unwrap();

		self.variable_names.push(name);

		Variable(id)
	}

	#[must_use]
	pub fn variable_count(&self) -> u16 {
		self.variable_names.len().try_into().unwrap()
	}

	#[must_use]
	pub fn variable_name(&self, variable: Variable) -> &'static str {
		self.variable_names[usize::from(variable.0)]
	}

	pub fn push(&mut self, id: u16, instruction: Instruction) {
		self.blocks[usize::from(id)].instructions.push(instruction);
	}

	#[must_use]
	pub fn jump(&self, id: u16) -> Option<Jump> {
		self.blocks[usize::from(id)].jump()
	}

	pub fn take_jump(&mut self, id: u16) -> Option<Jump> {
		self.blocks[usize::from(id)].take_jump()
	}

	pub fn terminate_goto(&mut self, id: u16, target: u16) {
		self.push(id, Instruction::Jump(Jump::Goto { target }));
		self.add_edge(id, target);
	}

	pub fn terminate_goto_if(&mut self, id: u16, condition: Condition, then: u16, other: u16) {
		let jump = Jump::GotoIf {
			condition,
			then,
			other,
		};

		self.push(id, Instruction::Jump(jump));
		self.add_edge(id, then);
		self.add_edge(id, other);
	}

	pub fn terminate_return(&mut self, id: u16) {
		self.terminate_goto(id, Self::END);
	}

	pub fn add_edge(&mut self, from: u16, to: u16) {
		self.blocks[usize::from(to)].predecessors.push(from);
		self.blocks[usize::from(from)].successors.push(to);
	}

	pub fn remove_edge(&mut self, from: u16, to: u16) {
		let successor = self.successors(from).position(|id| id == to).unwrap();

		self.blocks[usize::from(from)].successors.remove(successor);

		let predecessor = self.predecessors(to).position(|id| id == from).unwrap();

		self.blocks[usize::from(to)].predecessors.remove(predecessor);
	}

	pub fn replace_edge(&mut self, from: u16, to: u16, new: u16) {
		let successor = self.successors(from).position(|id| id == to).unwrap();

		self.blocks[usize::from(from)].successors[successor] = new;
		self.blocks[usize::from(new)].predecessors.push(from);

		let predecessor = self.predecessors(to).position(|id| id == from).unwrap();

		self.blocks[usize::from(to)].predecessors.remove(predecessor);
	}

	pub fn clear_edges(&mut self) {
		for block in &mut self.blocks {
			block.predecessors = list::resizable::Resizable::new();
			block.successors = list::resizable::Resizable::new();
		}
	}

	#[must_use]
	pub fn parent(&self, element: Element) -> u16 {
		match element {
			Element::Block(id) => self.blocks[usize::from(id)].parent,
			Element::If(id) => self.ifs[usize::from(id)].parent,
			Element::Loop(id) => self.loops[usize::from(id)].parent,
		}
	}

	fn set_parent(&mut self, element: Element, parent: u16) {
		match element {
			Element::Block(id) => self.blocks[usize::from(id)].parent = parent,
			Element::If(id) => self.ifs[usize::from(id)].parent = parent,
			Element::Loop(id) => self.loops[usize::from(id)].parent = parent,
		}
	}

	/// Removes `element` from its parent container, if it still sits in
	/// one. Blocks stashed out of a container wholesale keep a stale
	/// parent id, so a missing entry is not an error.
	pub fn detach(&mut self, element: Element) {
		let parent = self.parent(element);

		if parent == Self::DETACHED {
			return;
		}

		let elements = &mut self.containers[usize::from(parent)].elements;

		if let Some(position) = elements.iter().position(|&other| other == element) {
			elements.remove(position);
		}

		self.set_parent(element, Self::DETACHED);
	}

	pub fn attach(&mut self, element: Element, container: u16) {
		self.containers[usize::from(container)].elements.push(element);
		self.set_parent(element, container);
	}

	pub fn attach_at(&mut self, element: Element, container: u16, position: usize) {
		self.containers[usize::from(container)]
			.elements
			.insert(position, element);
		self.set_parent(element, container);
	}

	fn add_container(&mut self, owner: Owner) -> u16 {
		let id = self.containers.len().try_into().unwrap();

		self.containers.push(Container::new(owner));

		id
	}

	pub fn add_if(&mut self, parent: u16, condition: Condition) -> u16 {
		let id = self.ifs.len().try_into().unwrap();

		let then_body = self.add_container(Owner::Then(id));
		let else_body = self.add_container(Owner::Else(id));

		self.ifs.push(If {
			condition,
			then_body,
			else_body,
			parent,
		});

		self.containers[usize::from(parent)]
			.elements
			.push(Element::If(id));

		id
	}

	pub fn add_loop(&mut self, parent: u16) -> u16 {
		let id = self.loops.len().try_into().unwrap();

		let body = self.add_container(Owner::Loop(id));

		self.loops.push(Loop { body, parent });

		self.containers[usize::from(parent)]
			.elements
			.push(Element::Loop(id));

		id
	}
}

impl Default for Function {
	fn default() -> Self {
		Self::new()
	}
}
