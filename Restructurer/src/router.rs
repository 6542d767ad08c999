use alloc::vec::Vec;

use flow_graph::{
	instruction::{Condition, Jump, Variable},
	Builder, Function,
};
use set::Set;

/// How one fork decides between its two arms. A `Variable` fork reads a
/// synthesized boolean; an `Inline` fork remembers the one condition
/// written into it and spends no storage. Inline forks are only sound
/// when a single write is emitted before the read, which holds for the
/// first level below a dominating terminator.
enum Discriminator {
	Variable(Variable),
	Inline(Option<Condition>),
}

/// A binary decision point. Arm 1 is taken when the discriminator is
/// true, arm 0 otherwise.
struct Fork {
	discriminator: Discriminator,
	paths: [Path; 2],
}

/// A destination set paired with the fork tree that narrows it down to
/// one block. `reachable` is an interned set id, so paths compare by
/// identity.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Path {
	pub reachable: u16,
	pub fork: Option<u16>,
}

/// The three ways control may leave the point currently being emitted:
/// falling through, breaking out of the innermost loop, or continuing
/// it.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Routes {
	pub regular: Path,
	pub brk: Path,
	pub cont: Path,
}

/// Owns the interned reachable sets and fork arenas for one run and
/// emits the stores and jumps that steer control along a [`Path`].
pub struct Router {
	sets: Vec<Set>,
	forks: Vec<Fork>,
	saved: Vec<Routes>,
}

impl Router {
	#[must_use]
	pub const fn new() -> Self {
		Self {
			sets: Vec::new(),
			forks: Vec::new(),
			saved: Vec::new(),
		}
	}

	pub fn clear(&mut self) {
		self.sets.clear();
		self.forks.clear();
		self.saved.clear();
	}

	#[must_use]
	pub fn is_balanced(&self) -> bool {
		self.saved.is_empty()
	}

	pub fn intern<I: IntoIterator<Item = u16>>(&mut self, blocks: I) -> u16 {
		let mut set = Set::new();

		for id in blocks {
			set.grow_insert(id.into());
		}

		let id = self.sets.len().try_into().unwrap();

		self.sets.push(set);

		id
	}

	fn union(&mut self, first: u16, second: u16) -> u16 {
		let mut set = Set::new();

		for index in self.sets[usize::from(first)].ascending() {
			set.grow_insert(index);
		}

		for index in self.sets[usize::from(second)].ascending() {
			set.grow_insert(index);
		}

		let id = self.sets.len().try_into().unwrap();

		self.sets.push(set);

		id
	}

	#[must_use]
	pub fn contains(&self, path: Path, block: u16) -> bool {
		self.sets[usize::from(path.reachable)].contains(block.into())
	}

	#[must_use]
	pub fn single(&self, path: Path) -> u16 {
		let mut ascending = self.sets[usize::from(path.reachable)].ascending();
		let id = ascending.next().unwrap();

		assert!(ascending.next().is_none());

		id.try_into().unwrap()
	}

	fn add_fork(&mut self, discriminator: Discriminator, paths: [Path; 2]) -> u16 {
		let id = self.forks.len().try_into().unwrap();

		self.forks.push(Fork {
			discriminator,
			paths,
		});

		id
	}

	#[must_use]
	pub fn arms(&self, fork: u16) -> [Path; 2] {
		self.forks[usize::from(fork)].paths
	}

	/// The condition deciding a fork, read at its dispatch point.
	#[must_use]
	pub fn read(&self, fork: u16) -> Condition {
		match self.forks[usize::from(fork)].discriminator {
			Discriminator::Variable(variable) => Condition::variable(variable),
			Discriminator::Inline(slot) => slot.unwrap(),
		}
	}

	fn write(&mut self, builder: &mut Builder, fork: u16, condition: Condition) {
		match &mut self.forks[usize::from(fork)].discriminator {
			Discriminator::Variable(variable) => builder.store(*variable, condition),
			Discriminator::Inline(slot) => *slot = Some(condition),
		}
	}

	/// Writes every discriminator along `path` so that later dispatch
	/// arrives at `target`.
	pub fn set_path_vars(&mut self, builder: &mut Builder, path: Path, target: u16) {
		let mut fork = path.fork;

		while let Some(id) = fork {
			let paths = self.arms(id);
			let arm = usize::from(self.contains(paths[1], target));

			self.write(builder, id, Condition::constant(arm == 1));

			fork = paths[arm].fork;
		}
	}

	/// Like [`Self::set_path_vars`], but for a two way terminator whose
	/// targets both lie on `path`. Descends while both targets agree,
	/// then stores `condition` at the fork where they part. Returns
	/// `false` when they never part before the forks run out, meaning
	/// the targets coincide below the last fork.
	pub fn set_path_vars_cond(
		&mut self,
		builder: &mut Builder,
		path: Path,
		condition: Condition,
		then: u16,
		other: u16,
	) -> bool {
		let mut fork = path.fork;

		while let Some(id) = fork {
			let paths = self.arms(id);
			let then_arm = usize::from(self.contains(paths[1], then));
			let other_arm = usize::from(self.contains(paths[1], other));

			if then_arm != other_arm {
				let decided = if then_arm == 1 {
					condition
				} else {
					condition.inverted()
				};

				self.write(builder, id, decided);
				self.set_path_vars(builder, paths[then_arm], then);
				self.set_path_vars(builder, paths[other_arm], other);

				return true;
			}

			self.write(builder, id, Condition::constant(then_arm == 1));

			fork = paths[then_arm].fork;
		}

		false
	}

	/// Emits the stores and jump that send control to `target` along
	/// whichever of the three routes can reach it. Falling through is
	/// an implicit jump, so the regular route emits none.
	pub fn route_to(&mut self, builder: &mut Builder, routing: Routes, target: u16) {
		if self.contains(routing.regular, target) {
			self.set_path_vars(builder, routing.regular, target);
		} else if self.contains(routing.brk, target) {
			self.set_path_vars(builder, routing.brk, target);
			builder.jump(Jump::Break);
		} else if self.contains(routing.cont, target) {
			self.set_path_vars(builder, routing.cont, target);
			builder.jump(Jump::Continue);
		} else {
			assert_eq!(target, Function::END);

			builder.jump(Jump::Return);
		}
	}

	/// The two way counterpart of [`Self::route_to`]. When both targets
	/// take the same route the conditional is folded into the path
	/// variables; otherwise an `If` splits the two routes apart.
	pub fn route_to_cond(
		&mut self,
		builder: &mut Builder,
		routing: Routes,
		condition: Condition,
		then: u16,
		other: u16,
	) {
		if then == other {
			self.route_to(builder, routing, then);

			return;
		}

		let pairs = [
			(routing.regular, None),
			(routing.brk, Some(Jump::Break)),
			(routing.cont, Some(Jump::Continue)),
		];

		for (path, jump) in pairs {
			if !self.contains(path, then) || !self.contains(path, other) {
				continue;
			}

			if self.set_path_vars_cond(builder, path, condition, then, other) {
				if let Some(jump) = jump {
					builder.jump(jump);
				}

				return;
			}
		}

		builder.push_if(condition);
		self.route_to(builder, routing, then);
		builder.push_else();
		self.route_to(builder, routing, other);
		builder.pop_if();
	}

	/// Rebases `routing` for emission inside a loop whose members form
	/// `path`. The old regular continuation becomes the break route,
	/// and routes needed by `reach` that a single break cannot serve
	/// get a funnel fork so the loop exit can tell them apart. The
	/// replaced routes are kept until [`Self::loop_routing_end`].
	pub fn loop_routing_start(
		&mut self,
		builder: &mut Builder,
		routing: &mut Routes,
		path: Path,
		reach: u16,
	) {
		let backup = *routing;

		self.saved.push(backup);

		let mut break_needed = false;
		let mut continue_needed = false;

		for index in self.sets[usize::from(reach)].ascending() {
			let id = u16::try_from(index).unwrap();

			// the end block is served by a plain `return` at any depth
			if id == Function::END
				|| self.contains(path, id) || self.contains(backup.regular, id)
			{
				continue;
			}

			if self.contains(backup.brk, id) {
				break_needed = true;
			} else {
				assert!(self.contains(backup.cont, id));

				continue_needed = true;
			}
		}

		routing.brk = backup.regular;
		routing.cont = path;
		routing.regular = path;

		if break_needed {
			let variable = builder.variable("path_break");
			let paths = [routing.brk, backup.brk];
			let reachable = self.union(paths[0].reachable, paths[1].reachable);
			let fork = self.add_fork(Discriminator::Variable(variable), paths);

			routing.brk = Path {
				reachable,
				fork: Some(fork),
			};
		}

		if continue_needed {
			let variable = builder.variable("path_continue");
			let paths = [routing.brk, backup.cont];
			let reachable = self.union(paths[0].reachable, paths[1].reachable);
			let fork = self.add_fork(Discriminator::Variable(variable), paths);

			routing.brk = Path {
				reachable,
				fork: Some(fork),
			};
		}
	}

	/// Unwinds [`Self::loop_routing_start`] after the loop is emitted:
	/// each funnel fork becomes a conditional `Continue` or `Break`
	/// right after the loop, and `routing` returns to what it was.
	pub fn loop_routing_end(&mut self, builder: &mut Builder, routing: &mut Routes) {
		let backup = self.saved.pop().unwrap();

		assert_eq!(routing.regular, routing.cont);

		if let Some(fork) = routing.brk.fork {
			if self.arms(fork)[1] == backup.cont {
				builder.push_if(self.read(fork));
				builder.jump(Jump::Continue);
				builder.pop_if();

				routing.brk = self.arms(fork)[0];
			}
		}

		if let Some(fork) = routing.brk.fork {
			if self.arms(fork)[1] == backup.brk {
				builder.push_if(self.read(fork));
				builder.jump(Jump::Break);
				builder.pop_if();

				routing.brk = self.arms(fork)[0];
			}
		}

		assert_eq!(routing.brk, backup.regular);

		*routing = backup;
	}

	/// Wraps a level entry in a stored gate so branches past the level
	/// can fall through it. Arm 1 enters, arm 0 skips.
	pub fn gate_fork(&mut self, builder: &mut Builder, outside: Path, inside: Path) -> Path {
		let variable = builder.variable("path_skip");
		let paths = [outside, inside];
		let reachable = self.union(paths[0].reachable, paths[1].reachable);
		let fork = self.add_fork(Discriminator::Variable(variable), paths);

		Path {
			reachable,
			fork: Some(fork),
		}
	}

	/// Builds a balanced fork tree narrowing `blocks` down to one
	/// entry, or `None` when no decision is needed.
	pub fn select_fork(
		&mut self,
		builder: &mut Builder,
		blocks: &[u16],
		needs_storage: bool,
	) -> Option<u16> {
		(blocks.len() > 1).then(|| {
			let (first, second) = blocks.split_at(blocks.len() / 2);
			let paths = [
				self.select_path(builder, first, needs_storage),
				self.select_path(builder, second, needs_storage),
			];

			let discriminator = if needs_storage {
				Discriminator::Variable(builder.variable("path_select"))
			} else {
				Discriminator::Inline(None)
			};

			self.add_fork(discriminator, paths)
		})
	}

	fn select_path(&mut self, builder: &mut Builder, blocks: &[u16], needs_storage: bool) -> Path {
		let reachable = self.intern(blocks.iter().copied());
		let fork = self.select_fork(builder, blocks, needs_storage);

		Path {
			reachable,
			fork,
		}
	}
}

impl Default for Router {
	fn default() -> Self {
		Self::new()
	}
}
