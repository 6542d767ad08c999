use alloc::vec::Vec;

use flow_dominance::Dominance;
use flow_graph::{Builder, Function};
use set::Set;

use crate::router::{Path, Router, Routes};

/// One rank of sibling children, emitted in order. Every branch into a
/// level arrives through `in_path` and every branch past it leaves
/// through `out_path`. A level whose members form a cycle among
/// themselves is irreducible and carries the interned set of blocks
/// reachable from the cycle.
pub struct Level {
	pub blocks: Vec<u16>,
	pub in_path: Path,
	pub out_path: Path,
	pub irreducible: Option<u16>,
	pub skip: bool,
}

/// Partitions the children of a dominator into ordered levels such
/// that dominance frontiers only point forward, then threads the
/// routing paths through them back to front.
pub struct Organizer {
	remaining: Set,
	placed: Set,
	escapes: Set,
	closure: Set,
}

impl Organizer {
	#[must_use]
	pub const fn new() -> Self {
		Self {
			remaining: Set::new(),
			placed: Set::new(),
			escapes: Set::new(),
			closure: Set::new(),
		}
	}

	/// Splits the children of a dominating loop header into the blocks
	/// belonging to its cycle and the ones it merely dominates, along
	/// with the blocks reachable once the cycle is left.
	pub fn inside_outside(
		&mut self,
		dominance: &Dominance,
		block: u16,
	) -> (Vec<u16>, Vec<u16>, Vec<u16>) {
		let children: Vec<u16> = dominance
			.children(block)
			.iter()
			.copied()
			.filter(|&id| id != Function::END)
			.collect();

		self.closure.clear();
		self.closure.grow_insert(block.into());

		let mut inside = Vec::new();

		loop {
			let mut changed = false;

			for &id in &children {
				if self.closure.contains(id.into()) {
					continue;
				}

				if dominance
					.frontier(id)
					.ascending()
					.any(|index| self.closure.contains(index))
				{
					self.closure.grow_insert(id.into());
					inside.push(id);

					changed = true;
				}
			}

			if !changed {
				break;
			}
		}

		let outside: Vec<u16> = children
			.iter()
			.copied()
			.filter(|&id| !self.closure.contains(id.into()))
			.collect();

		self.escapes.clear();
		self.escapes.extend(outside.iter().map(|&id| usize::from(id)));
		self.escapes.extend(dominance.frontier(block).ascending());

		for &id in &inside {
			self.escapes.extend(dominance.frontier(id).ascending());
		}

		self.escapes.remove(block.into());

		for &id in &inside {
			self.escapes.remove(id.into());
		}

		let reach = self
			.escapes
			.ascending()
			.map(|index| index.try_into().unwrap())
			.collect();

		(inside, outside, reach)
	}

	/// Partitions `children` into levels, marks the ones a branch may
	/// skip over, and threads `routing.regular` through every level's
	/// entry path. `successors` are the targets of the dominator's own
	/// terminator; `is_dominated` states that it is the only way in, so
	/// the first level may decide its fork without storage.
	pub fn run(
		&mut self,
		router: &mut Router,
		builder: &mut Builder,
		dominance: &Dominance,
		routing: &mut Routes,
		children: &[u16],
		successors: &[u16],
		is_dominated: bool,
	) -> Vec<Level> {
		let mut levels = self.partition(router, dominance, children);

		self.mark_skips(router, dominance, *routing, &mut levels, successors);

		let mut after = routing.regular;

		for (index, level) in levels.iter_mut().enumerate().rev() {
			level.out_path = after;

			let needs_storage = !is_dominated || index != 0 || level.irreducible.is_some();
			let fork = router.select_fork(builder, &level.blocks, needs_storage);
			let mut in_path = Path {
				reachable: router.intern(level.blocks.iter().copied()),
				fork,
			};

			if level.skip {
				in_path = router.gate_fork(builder, after, in_path);
			}

			level.in_path = in_path;
			after = in_path;
		}

		routing.regular = after;

		levels
	}

	fn partition(
		&mut self,
		router: &mut Router,
		dominance: &Dominance,
		children: &[u16],
	) -> Vec<Level> {
		self.remaining.clear();
		self.remaining
			.extend(children.iter().map(|&id| usize::from(id)));

		let mut count = children.len();
		let mut levels = Vec::new();

		while count != 0 {
			let mut blocks: Vec<u16> = children
				.iter()
				.copied()
				.filter(|&id| self.remaining.contains(id.into()) && !self.is_blocked(dominance, children, id))
				.collect();

			let irreducible = blocks
				.is_empty()
				.then(|| self.close_cycle(router, dominance, children, &mut blocks));

			for &id in &blocks {
				self.remaining.remove(id.into());
			}

			count -= blocks.len();

			levels.push(Level {
				blocks,
				in_path: Path {
					reachable: 0,
					fork: None,
				},
				out_path: Path {
					reachable: 0,
					fork: None,
				},
				irreducible,
				skip: false,
			});
		}

		levels
	}

	/// A child must wait while a branch out of some other unplaced
	/// child's region can still reach it.
	fn is_blocked(&self, dominance: &Dominance, children: &[u16], id: u16) -> bool {
		children.iter().any(|&other| {
			other != id
				&& self.remaining.contains(other.into())
				&& dominance.frontier(other).contains(id.into())
		})
	}

	/// No child could be placed, so the remaining ones contain a cycle
	/// not broken by dominance. Grows the first unplaced child into the
	/// full cycle and interns everything reachable from it.
	fn close_cycle(
		&mut self,
		router: &mut Router,
		dominance: &Dominance,
		children: &[u16],
		blocks: &mut Vec<u16>,
	) -> u16 {
		let first = children
			.iter()
			.copied()
			.find(|&id| self.remaining.contains(id.into()))
			.unwrap();

		self.closure.clear();
		self.closure.grow_insert(first.into());
		blocks.push(first);

		loop {
			let mut changed = false;

			for &id in children {
				if !self.remaining.contains(id.into()) || self.closure.contains(id.into()) {
					continue;
				}

				if dominance
					.frontier(id)
					.ascending()
					.any(|index| self.closure.contains(index))
				{
					self.closure.grow_insert(id.into());
					blocks.push(id);

					changed = true;
				}
			}

			if !changed {
				break;
			}
		}

		self.escapes.clear();

		for &id in blocks.iter() {
			self.escapes.extend(dominance.frontier(id).ascending());
		}

		for &id in blocks.iter() {
			self.escapes.remove(id.into());
		}

		router.intern(
			self.escapes
				.ascending()
				.map(|index| index.try_into().unwrap()),
		)
	}

	/// A level is skippable when some earlier branch targets a block
	/// past it that neither the break nor the continue route covers.
	fn mark_skips(
		&mut self,
		router: &Router,
		dominance: &Dominance,
		routing: Routes,
		levels: &mut [Level],
		successors: &[u16],
	) {
		self.placed.clear();
		self.escapes.clear();
		self.escapes
			.extend(successors.iter().map(|&id| usize::from(id)));

		for level in levels {
			for &id in &level.blocks {
				self.placed.grow_insert(id.into());
			}

			level.skip = self.escapes.ascending().any(|index| {
				let id = index.try_into().unwrap();

				!self.placed.contains(index)
					&& !router.contains(routing.brk, id)
					&& !router.contains(routing.cont, id)
			});

			for &id in &level.blocks {
				self.escapes.extend(dominance.frontier(id).ascending());
			}
		}
	}
}

impl Default for Organizer {
	fn default() -> Self {
		Self::new()
	}
}
