use alloc::vec::Vec;

use flow_graph::{instruction::Jump, Element, Function, Owner};

/// Rebuilds the predecessor and successor lists of a structured
/// function from its container tree. Fall throughs, `Break`,
/// `Continue`, and `Return` all resolve to concrete blocks, so the
/// edges stay queryable after structuring.
pub struct Relinker {
	enclosing: Vec<(u16, usize)>,
}

impl Relinker {
	#[must_use]
	pub const fn new() -> Self {
		Self {
			enclosing: Vec::new(),
		}
	}

	pub fn run(&mut self, function: &mut Function) {
		function.clear_edges();

		self.relink_container(function, Function::ROOT);

		assert!(self.enclosing.is_empty());
	}

	fn relink_container(&mut self, function: &mut Function, container: u16) {
		for position in 0..function.containers[usize::from(container)].elements.len() {
			match function.containers[usize::from(container)].elements[position] {
				Element::Block(id) => self.relink_block(function, id, container, position),
				Element::If(id) => {
					let then_body = function.ifs[usize::from(id)].then_body;
					let else_body = function.ifs[usize::from(id)].else_body;

					self.relink_container(function, then_body);
					self.relink_container(function, else_body);
				}
				Element::Loop(id) => {
					let body = function.loops[usize::from(id)].body;

					self.enclosing.push((container, position));
					self.relink_container(function, body);
					self.enclosing.pop();
				}
			}
		}
	}

	fn relink_block(&mut self, function: &mut Function, id: u16, container: u16, position: usize) {
		match function.jump(id) {
			None => self.relink_fall_through(function, id, container, position),
			Some(Jump::Return) => function.add_edge(id, Function::END),
			Some(Jump::Break) => {
				let &(container, position) = self.enclosing.last().unwrap();
				let target = self.follow(function, container, position + 1);

				function.add_edge(id, target);
			}
			Some(Jump::Continue) => {
				let &(container, position) = self.enclosing.last().unwrap();
				let Element::Loop(inner) =
					function.containers[usize::from(container)].elements[position]
				else {
					unreachable!()
				};

				let body = function.loops[usize::from(inner)].body;
				let target = self.head(function, body).unwrap();

				function.add_edge(id, target);
			}
			Some(Jump::Goto { .. } | Jump::GotoIf { .. }) => unreachable!(),
		}
	}

	/// A block without a terminator runs into whatever follows it. When
	/// an `If` follows, the block is its guard and edges lead into both
	/// arms, an empty arm passing straight over the `If`.
	fn relink_fall_through(
		&mut self,
		function: &mut Function,
		id: u16,
		container: u16,
		position: usize,
	) {
		let next = function.containers[usize::from(container)]
			.elements
			.get(position + 1);

		if let Some(&Element::If(nif)) = next {
			for arm in [
				function.ifs[usize::from(nif)].then_body,
				function.ifs[usize::from(nif)].else_body,
			] {
				let target = self
					.head(function, arm)
					.unwrap_or_else(|| self.follow(function, container, position + 2));

				function.add_edge(id, target);
			}
		} else {
			let target = self.follow(function, container, position + 1);

			function.add_edge(id, target);
		}
	}

	/// The block control reaches when it passes `position` in
	/// `container`, cascading out of arms and around loop bodies.
	fn follow(&self, function: &Function, container: u16, position: usize) -> u16 {
		if let Some(&element) = function.containers[usize::from(container)]
			.elements
			.get(position)
		{
			return match element {
				Element::Block(id) => id,
				Element::Loop(id) => self
					.head(function, function.loops[usize::from(id)].body)
					.unwrap(),
				// An `If` always sits behind its guard block.
				Element::If(_) => unreachable!(),
			};
		}

		match function.containers[usize::from(container)].owner {
			Owner::Function => Function::END,
			Owner::Then(id) | Owner::Else(id) => {
				let parent = function.ifs[usize::from(id)].parent;
				let position = function.containers[usize::from(parent)]
					.elements
					.iter()
					.position(|&element| element == Element::If(id))
					.unwrap();

				self.follow(function, parent, position + 1)
			}
			// Falling off a loop body is an implicit continue.
			Owner::Loop(id) => self
				.head(function, function.loops[usize::from(id)].body)
				.unwrap(),
		}
	}

	fn head(&self, function: &Function, container: u16) -> Option<u16> {
		match *function.containers[usize::from(container)].elements.first()? {
			Element::Block(id) => Some(id),
			Element::Loop(id) => self.head(function, function.loops[usize::from(id)].body),
			Element::If(_) => unreachable!(),
		}
	}
}

impl Default for Relinker {
	fn default() -> Self {
		Self::new()
	}
}
