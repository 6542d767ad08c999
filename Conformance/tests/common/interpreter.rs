use flow_graph::{
	instruction::{Condition, Instruction, Jump, Source},
	Element, Function, Owner,
};

/// How many opaque operations one run may record before the trace is
/// cut off. Equivalent functions cut off at the same operation, so
/// bounded traces still compare exactly.
pub const FUEL: usize = 64;

const STEPS: usize = 1 << 12;

enum Outcome {
	Fall,
	Jump(u16),
	Break(u16),
	Continue,
	Return,
	Halt,
}

/// Executes a function under one assignment of its `Value` conditions,
/// recording the opaque operations crossed along the way. Top level
/// blocks are chained through their jumps and edges, structured regions
/// through their containers, so the same interpreter runs a function
/// before and after any transformation.
pub struct Interpreter {
	variables: Vec<bool>,
	trace: Vec<u16>,
	fuel: usize,
	steps: usize,
}

impl Interpreter {
	pub fn new() -> Self {
		Self {
			variables: Vec::new(),
			trace: Vec::new(),
			fuel: 0,
			steps: 0,
		}
	}

	pub fn run(&mut self, function: &Function, assignment: u32) -> &[u16] {
		self.variables.clear();
		self.variables
			.resize(usize::from(function.variable_count()), false);
		self.trace.clear();
		self.fuel = FUEL;
		self.steps = STEPS;

		let mut position = Self::position_of(function, function.entry);

		loop {
			let elements = &function.containers[usize::from(Function::ROOT)].elements;
			let Some(&element) = elements.get(position) else {
				break;
			};

			let outcome = match element {
				Element::Loop(id) => self.execute_repeat(function, id, assignment),
				_ => self.execute_element(function, element, assignment),
			};

			let target = match outcome {
				Outcome::Fall => match element {
					Element::Block(id) => {
						let mut successors = function.successors(id);

						match (successors.next(), successors.next()) {
							(Some(target), None) => target,
							_ => {
								position += 1;

								continue;
							}
						}
					}
					Element::If(_) | Element::Loop(_) => {
						position += 1;

						continue;
					}
				},
				Outcome::Jump(target) => target,
				Outcome::Break(id) => function.successors(id).next().unwrap(),
				Outcome::Continue => unreachable!("`continue` outside a loop"),
				Outcome::Return | Outcome::Halt => break,
			};

			if function.is_end(target) {
				break;
			}

			position = Self::position_of(function, target);
		}

		&self.trace
	}

	/// The index in the root container of the element holding `block`,
	/// however deeply it nests. Jumping at a block inside a loop enters
	/// the loop itself.
	fn position_of(function: &Function, block: u16) -> usize {
		let mut element = Element::Block(block);
		let mut container = function.blocks[usize::from(block)].parent;

		while container != Function::ROOT {
			element = match function.containers[usize::from(container)].owner {
				Owner::Function => unreachable!(),
				Owner::Then(id) | Owner::Else(id) => Element::If(id),
				Owner::Loop(id) => Element::Loop(id),
			};

			container = function.parent(element);
		}

		function.containers[usize::from(Function::ROOT)]
			.elements
			.iter()
			.position(|&other| other == element)
			.unwrap()
	}

	fn execute_repeat(&mut self, function: &Function, id: u16, assignment: u32) -> Outcome {
		let body = function.loops[usize::from(id)].body;

		loop {
			if self.steps == 0 {
				break Outcome::Halt;
			}

			self.steps -= 1;

			match self.execute_container(function, body, assignment) {
				Outcome::Fall | Outcome::Continue => {}
				outcome => break outcome,
			}
		}
	}

	fn execute_container(&mut self, function: &Function, container: u16, assignment: u32) -> Outcome {
		for &element in &function.containers[usize::from(container)].elements {
			match self.execute_element(function, element, assignment) {
				Outcome::Fall => {}
				outcome => return outcome,
			}
		}

		Outcome::Fall
	}

	fn execute_element(&mut self, function: &Function, element: Element, assignment: u32) -> Outcome {
		match element {
			Element::Block(id) => self.execute_block(function, id, assignment),
			Element::If(id) => {
				let nif = &function.ifs[usize::from(id)];
				let body = if self.evaluate(nif.condition, assignment) {
					nif.then_body
				} else {
					nif.else_body
				};

				self.execute_container(function, body, assignment)
			}
			Element::Loop(id) => match self.execute_repeat(function, id, assignment) {
				Outcome::Break(_) => Outcome::Fall,
				outcome => outcome,
			},
		}
	}

	fn execute_block(&mut self, function: &Function, id: u16, assignment: u32) -> Outcome {
		if self.steps == 0 {
			return Outcome::Halt;
		}

		self.steps -= 1;

		for &instruction in &function.blocks[usize::from(id)].instructions {
			match instruction {
				Instruction::Opaque(opaque) => {
					if self.fuel == 0 {
						return Outcome::Halt;
					}

					self.fuel -= 1;
					self.trace.push(opaque.operation);
				}
				Instruction::Store(store) => {
					let data = self.evaluate(store.source, assignment);

					self.variables[usize::from(store.destination.0)] = data;
				}
				Instruction::Jump(Jump::Goto { target }) => return Outcome::Jump(target),
				Instruction::Jump(Jump::GotoIf {
					condition,
					then,
					other,
				}) => {
					let target = if self.evaluate(condition, assignment) {
						then
					} else {
						other
					};

					return Outcome::Jump(target);
				}
				Instruction::Jump(Jump::Return) => return Outcome::Return,
				Instruction::Jump(Jump::Break) => return Outcome::Break(id),
				Instruction::Jump(Jump::Continue) => return Outcome::Continue,
			}
		}

		Outcome::Fall
	}

	fn evaluate(&self, condition: Condition, assignment: u32) -> bool {
		let data = match condition.source {
			Source::Value(value) => assignment & 1 << value != 0,
			Source::Variable(variable) => self.variables[usize::from(variable.0)],
			Source::Constant(data) => data,
		};

		data != condition.inverted
	}
}
