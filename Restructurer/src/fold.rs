use alloc::vec::Vec;

use flow_graph::{
	instruction::{Condition, Instruction, Jump},
	Element, Function, Owner,
};

use crate::Error;

enum Kind {
	Block,
	If,
	Loop,
}

/// Folds two way branches into `If` and `Loop` structure wherever a
/// local pattern allows it, without synthesizing any variables. Only
/// diamonds whose arms are single entry chains and loops whose head
/// branches straight back to itself qualify; anything else is left for
/// the full restructurer.
pub struct Folder {
	breaks: Vec<u16>,
	region: Vec<Element>,
}

impl Folder {
	#[must_use]
	pub const fn new() -> Self {
		Self {
			breaks: Vec::new(),
			region: Vec::new(),
		}
	}

	/// Repeats over the top level blocks until no fold applies. Returns
	/// whether anything changed; the function is only partially
	/// structured afterward unless every branch happened to fold. An
	/// unsupported loop head surfaces as an error, with any folds
	/// applied before it left in place.
	pub fn run(&mut self, function: &mut Function) -> Result<bool, Error> {
		if function.structured {
			return Ok(false);
		}

		let mut progress = false;

		loop {
			let mut changed = false;
			let mut position = 0;

			while position < function.containers[usize::from(Function::ROOT)].elements.len() {
				let element = function.containers[usize::from(Function::ROOT)].elements[position];

				if let Element::Block(id) = element {
					changed |= self.fold_block(function, id, position)?;
				}

				position += 1;
			}

			if !changed {
				break;
			}

			progress = true;
		}

		Ok(progress)
	}

	fn fold_block(&mut self, function: &mut Function, id: u16, position: usize) -> Result<bool, Error> {
		let Some(Jump::GotoIf {
			condition,
			then,
			other,
		}) = function.jump(id)
		else {
			return Ok(false);
		};

		match self.classify(function, id, then, other) {
			Kind::Block => Ok(false),
			Kind::If => {
				self.fold_if(function, id, position, condition, then, other);

				Ok(true)
			}
			Kind::Loop => Self::fold_loop(function, id, position, condition, then, other),
		}
	}

	/// Follows each branch until the paths hit a block with multiple
	/// predecessors and compares where they land. Meeting at the same
	/// block makes a diamond, coming back to the branch itself makes a
	/// loop, and anything murkier stays untouched. A diamond only holds
	/// when both arms can be entered solely through the branch.
	fn classify(&mut self, function: &Function, id: u16, then: u16, other: u16) -> Kind {
		if then == other {
			return Kind::Block;
		}

		let t = Self::follow_to_merge(function, then);
		let e = Self::follow_to_merge(function, other);

		if t.is_none() && e.is_none() {
			return Kind::Block;
		}

		if t == e {
			if t == Some(id) {
				return Kind::Block;
			}

			let merge = t.unwrap();

			if self.arm_is_single_entry(function, id, then, merge)
				&& self.arm_is_single_entry(function, id, other, merge)
			{
				return Kind::If;
			}

			return Kind::Block;
		}

		if t == Some(id) || e == Some(id) {
			return Kind::Loop;
		}

		Kind::Block
	}

	/// Whether the chain from `block` to `merge` may be spliced out
	/// whole. Control must only enter it through `head`: a block with a
	/// predecessor elsewhere would lose that entry once the chain moves
	/// into an arm, and the function entry never moves at all.
	fn arm_is_single_entry(&mut self, function: &Function, head: u16, block: u16, merge: u16) -> bool {
		self.region.clear();

		let mut current = block;

		while current != merge {
			let parent = function.blocks[usize::from(current)].parent;

			match function.containers[usize::from(parent)].owner {
				Owner::Function => {
					self.region.push(Element::Block(current));

					current = if let Some(Jump::Goto { target }) = function.jump(current) {
						target
					} else {
						function.successors(current).next().unwrap()
					};
				}
				Owner::Then(id) | Owner::Else(id) => {
					self.region.push(Element::If(id));

					let Some(behind) = Self::after_element(function, Element::If(id)) else {
						return false;
					};

					if behind == merge {
						break;
					}

					self.region.push(Element::Block(behind));

					current = function.successors(behind).next().unwrap();
				}
				Owner::Loop(id) => {
					self.region.push(Element::Loop(id));

					let Some(behind) = Self::after_element(function, Element::Loop(id)) else {
						return false;
					};

					current = behind;
				}
			}
		}

		self.region.iter().all(|&element| match element {
			Element::Block(id) => self.enters_through_chain(function, head, id),
			Element::Loop(id) => {
				// a loop head keeps its outside predecessors, so they
				// have to come from the chain as well
				let body = function.loops[usize::from(id)].body;

				match function.containers[usize::from(body)].elements.first() {
					Some(&Element::Block(first)) => self.enters_through_chain(function, head, first),
					_ => false,
				}
			}
			Element::If(_) => true,
		})
	}

	fn enters_through_chain(&self, function: &Function, head: u16, block: u16) -> bool {
		block != function.entry
			&& function.predecessors(block).all(|pred| {
				pred == head || self.region.contains(&Self::root_element_of(function, pred))
			})
	}

	/// The element under the top level container that holds `block`.
	fn root_element_of(function: &Function, block: u16) -> Element {
		let mut element = Element::Block(block);
		let mut container = function.blocks[usize::from(block)].parent;

		loop {
			element = match function.containers[usize::from(container)].owner {
				Owner::Function => return element,
				Owner::Then(id) | Owner::Else(id) => Element::If(id),
				Owner::Loop(id) => Element::Loop(id),
			};

			container = function.parent(element);
		}
	}

	/// Walks forward from `block` along sole successors, skipping over
	/// structure already folded, until a join point with a top level
	/// predecessor turns up. Two way branches along the way give up
	/// unless both targets sit in the same nested container.
	fn follow_to_merge(function: &Function, block: u16) -> Option<u16> {
		let mut block = block;

		loop {
			if block == Function::END {
				return None;
			}

			let parent = function.blocks[usize::from(block)].parent;

			match function.containers[usize::from(parent)].owner {
				Owner::Then(id) | Owner::Else(id) => {
					block = Self::after_element(function, Element::If(id))?;
				}
				Owner::Loop(id) => {
					block = Self::after_element(function, Element::Loop(id))?;
				}
				Owner::Function => {
					let mut predecessors = function.predecessors(block);

					if predecessors.next().is_some()
						&& predecessors.next().is_some() && function.predecessors(block).any(|id| {
							function.blocks[usize::from(id)].parent == Function::ROOT
						}) {
						return Some(block);
					}

					let mut successors = function.successors(block);
					let first = successors.next()?;

					if let Some(second) = successors.next() {
						let first = Self::structure_of(function, first);
						let second = Self::structure_of(function, second);

						if first != second || first.is_none() {
							return None;
						}
					}

					block = first;
				}
			}
		}
	}

	/// The structure whose arm or body holds `block`, when it is not at
	/// the top level. Both targets of a folded guard answer the same
	/// `If` even though they sit in opposite arms.
	fn structure_of(function: &Function, block: u16) -> Option<Element> {
		let parent = function.blocks[usize::from(block)].parent;

		match function.containers[usize::from(parent)].owner {
			Owner::Function => None,
			Owner::Then(id) | Owner::Else(id) => Some(Element::If(id)),
			Owner::Loop(id) => Some(Element::Loop(id)),
		}
	}

	/// The block element following `element` in its container, when
	/// there is one.
	fn after_element(function: &Function, element: Element) -> Option<u16> {
		let parent = function.parent(element);
		let elements = &function.containers[usize::from(parent)].elements;
		let position = elements.iter().position(|&other| other == element).unwrap();

		match elements.get(position + 1) {
			Some(&Element::Block(id)) => Some(id),
			_ => None,
		}
	}

	fn has_edge(function: &Function, from: u16, to: u16) -> bool {
		function.successors(from).any(|id| id == to)
	}

	/// Whether `block` sits somewhere under `container`.
	fn is_within(function: &Function, block: u16, container: u16) -> bool {
		let mut current = function.blocks[usize::from(block)].parent;

		loop {
			if current == container {
				return true;
			}

			current = match function.containers[usize::from(current)].owner {
				Owner::Function => return false,
				Owner::Then(id) | Owner::Else(id) => function.ifs[usize::from(id)].parent,
				Owner::Loop(id) => function.loops[usize::from(id)].parent,
			};
		}
	}

	fn fold_if(
		&mut self,
		function: &mut Function,
		head: u16,
		position: usize,
		condition: Condition,
		then: u16,
		other: u16,
	) {
		let merge = Self::follow_to_merge(function, other)
			.or_else(|| Self::follow_to_merge(function, then))
			.unwrap();

		function.take_jump(head);

		let nif = function.add_if(Function::ROOT, condition);

		function.detach(Element::If(nif));
		function.attach_at(Element::If(nif), Function::ROOT, position + 1);

		let after = function.add_block(Function::ROOT);

		function.detach(Element::Block(after));
		function.attach_at(Element::Block(after), Function::ROOT, position + 2);

		let then_body = function.ifs[usize::from(nif)].then_body;
		let else_body = function.ifs[usize::from(nif)].else_body;

		self.fold_arm(function, head, then, merge, after, then_body);
		self.fold_arm(function, head, other, merge, after, else_body);

		function.add_edge(after, merge);
	}

	/// Splices the chain starting at `block` out of the top level and
	/// into `arm`, rewiring the tail to fall through `after` instead of
	/// jumping at `merge`. An arm that goes straight to the merge stays
	/// empty.
	fn fold_arm(
		&mut self,
		function: &mut Function,
		head: u16,
		block: u16,
		merge: u16,
		after: u16,
		arm: u16,
	) {
		if block == merge {
			function.remove_edge(head, merge);
			function.add_edge(head, after);

			return;
		}

		let mut prev = None;
		let mut current = block;

		while current != merge {
			let parent = function.blocks[usize::from(current)].parent;

			match function.containers[usize::from(parent)].owner {
				Owner::Function => {
					let next = if let Some(Jump::Goto { target }) = function.jump(current) {
						function.take_jump(current);

						target
					} else {
						// a guard folded earlier, its branch resumes
						// inside the structure that follows it
						function.successors(current).next().unwrap()
					};

					function.detach(Element::Block(current));
					function.attach(Element::Block(current), arm);

					prev = Some(current);
					current = next;
				}
				Owner::Then(id) | Owner::Else(id) => {
					current = self.fold_arm_if(function, id, merge, after, arm, &mut prev);
				}
				Owner::Loop(id) => {
					current = Self::fold_arm_loop(function, id, arm);
				}
			}
		}

		let prev = prev.unwrap();

		if Self::has_edge(function, prev, merge) {
			function.replace_edge(prev, merge, after);
		}
	}

	/// Absorbs an already folded `If` the chain ran into, along with
	/// the block behind it, and reports where the chain resumes.
	fn fold_arm_if(
		&mut self,
		function: &mut Function,
		id: u16,
		merge: u16,
		after: u16,
		arm: u16,
		prev: &mut Option<u16>,
	) -> u16 {
		let behind = Self::after_element(function, Element::If(id)).unwrap();

		function.detach(Element::If(id));
		function.attach(Element::If(id), arm);

		if behind == merge {
			// the structure fell straight at the merge, so its fall
			// throughs need a fresh landing inside the arm
			let created = function.add_block(arm);
			let then_body = function.ifs[usize::from(id)].then_body;
			let else_body = function.ifs[usize::from(id)].else_body;
			let guard = prev.unwrap();

			self.breaks.clear();
			self.breaks.extend(function.predecessors(merge).filter(|&source| {
				source == guard
					|| Self::is_within(function, source, then_body)
					|| Self::is_within(function, source, else_body)
			}));

			for &source in &self.breaks {
				function.replace_edge(source, merge, created);
			}

			function.add_edge(created, after);

			*prev = Some(created);

			return merge;
		}

		let next = function.successors(behind).next().unwrap();

		function.detach(Element::Block(behind));
		function.attach(Element::Block(behind), arm);

		if let Some(Jump::Goto { .. }) = function.jump(behind) {
			function.take_jump(behind);
		}

		*prev = Some(behind);

		next
	}

	/// Absorbs an already folded `Loop` the same way. Its break edges
	/// funnel through the landing block behind it, so the chain simply
	/// resumes there.
	fn fold_arm_loop(function: &mut Function, id: u16, arm: u16) -> u16 {
		let behind = Self::after_element(function, Element::Loop(id)).unwrap();

		function.detach(Element::Loop(id));
		function.attach(Element::Loop(id), arm);

		behind
	}

	fn fold_loop(
		function: &mut Function,
		head: u16,
		position: usize,
		condition: Condition,
		then: u16,
		other: u16,
	) -> Result<bool, Error> {
		let exit = if other == head {
			then
		} else if then == head {
			other
		} else {
			// the cycle goes through a chain rather than straight back
			return Ok(false);
		};

		if head == function.entry {
			// the entry must stay at the top level
			return Ok(false);
		}

		if function.predecessors(head).count() != 2 {
			return Err(Error::UnsupportedControlFlow {
				reason: "loop head with multiple entries",
			});
		}

		function.take_jump(head);

		let repeat = function.add_loop(Function::ROOT);

		function.detach(Element::Loop(repeat));
		function.attach_at(Element::Loop(repeat), Function::ROOT, position);

		let landing = function.add_block(Function::ROOT);

		function.detach(Element::Block(landing));
		function.attach_at(Element::Block(landing), Function::ROOT, position + 1);

		let body = function.loops[usize::from(repeat)].body;

		function.detach(Element::Block(head));
		function.attach(Element::Block(head), body);

		let nif = function.add_if(body, condition);
		let then_block = function.add_block(function.ifs[usize::from(nif)].then_body);
		let else_block = function.add_block(function.ifs[usize::from(nif)].else_body);

		function.remove_edge(head, then);
		function.remove_edge(head, other);
		function.add_edge(head, then_block);
		function.add_edge(head, else_block);

		for (block, target) in [(then_block, then), (else_block, other)] {
			if target == exit {
				function.push(block, Instruction::Jump(Jump::Break));
				function.add_edge(block, landing);
			} else {
				function.push(block, Instruction::Jump(Jump::Continue));
				function.add_edge(block, target);
			}
		}

		function.add_edge(landing, exit);

		Ok(true)
	}
}

impl Default for Folder {
	fn default() -> Self {
		Self::new()
	}
}
