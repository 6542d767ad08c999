// Resources:
// "A Simple, Fast Dominance Algorithm",
//     by Keith D. Cooper, Timothy J. Harvey, and Ken Kennedy

#![no_std]
#![expect(clippy::missing_panics_doc)]

extern crate alloc;

use alloc::vec::Vec;

use flow_graph::Function;
use set::Set;

const UNSEEN: u16 = u16::MAX;

/// Dominator tree and dominance frontiers of one function, indexed by
/// block id at the time of the run. Blocks added afterward are unknown
/// to it.
pub struct Dominance {
	parents: Vec<u16>,
	children: Vec<u16>,
	offsets: Vec<u32>,
	frontiers: Vec<Set>,
}

impl Dominance {
	pub const UNDEFINED: u16 = u16::MAX;

	#[must_use]
	pub fn block_count(&self) -> u16 {
		self.parents.len().try_into().unwrap()
	}

	/// The immediate dominator, the block itself for the entry, or
	/// [`Self::UNDEFINED`] for blocks unreachable from the entry.
	#[must_use]
	pub fn immediate(&self, id: u16) -> u16 {
		self.parents[usize::from(id)]
	}

	#[must_use]
	pub fn is_reachable(&self, id: u16) -> bool {
		self.immediate(id) != Self::UNDEFINED
	}

	#[must_use]
	pub fn children(&self, id: u16) -> &[u16] {
		let start = usize::try_from(self.offsets[usize::from(id)]).unwrap();
		let end = usize::try_from(self.offsets[usize::from(id) + 1]).unwrap();

		&self.children[start..end]
	}

	#[must_use]
	pub fn frontier(&self, id: u16) -> &Set {
		&self.frontiers[usize::from(id)]
	}
}

pub struct DominanceFinder {
	post: Vec<u16>,
	indices: Vec<u16>,
	seen: Set,
	stack: Vec<(u16, bool)>,
}

impl DominanceFinder {
	#[must_use]
	pub const fn new() -> Self {
		Self {
			post: Vec::new(),
			indices: Vec::new(),
			seen: Set::new(),
			stack: Vec::new(),
		}
	}

	fn add_successor(&mut self, id: u16) {
		if self.seen.contains(id.into()) {
			return;
		}

		self.stack.push((id, false));
	}

	fn find_post_order(&mut self, function: &Function) {
		self.post.clear();
		self.seen.clear();

		self.add_successor(function.entry);

		while let Some((id, post)) = self.stack.pop() {
			if !self.seen.grow_insert(id.into()) {
				self.stack.push((id, true));

				for id in function.successors(id) {
					self.add_successor(id);
				}
			} else if post {
				self.post.push(id);
			}
		}

		self.indices.clear();
		self.indices.resize(function.blocks.len(), UNSEEN);

		for (index, &id) in self.post.iter().enumerate() {
			self.indices[usize::from(id)] = index.try_into().unwrap();
		}
	}

	fn intersect(parents: &[u16], mut first: u16, mut second: u16) -> u16 {
		while first != second {
			while first < second {
				first = parents[usize::from(first)];
			}

			while second < first {
				second = parents[usize::from(second)];
			}
		}

		first
	}

	// Iterates to a fixed point over the reverse post order, in post
	// order index space where the entry has the highest index.
	fn find_parents(&self, function: &Function) -> Vec<u16> {
		let len = self.post.len();
		let mut parents = alloc::vec![UNSEEN; len];

		parents[len - 1] = (len - 1).try_into().unwrap();

		let mut changed = true;

		while changed {
			changed = false;

			for index in (0..len - 1).rev() {
				let id = self.post[index];
				let mut parent = UNSEEN;

				for predecessor in function.predecessors(id) {
					let predecessor = self.indices[usize::from(predecessor)];

					if predecessor == UNSEEN || parents[usize::from(predecessor)] == UNSEEN {
						continue;
					}

					parent = if parent == UNSEEN {
						predecessor
					} else {
						Self::intersect(&parents, parent, predecessor)
					};
				}

				if parent != parents[index] {
					parents[index] = parent;
					changed = true;
				}
			}
		}

		let mut result = alloc::vec![Dominance::UNDEFINED; function.blocks.len()];

		for (index, &id) in self.post.iter().enumerate() {
			result[usize::from(id)] = self.post[usize::from(parents[index])];
		}

		result
	}

	fn find_children(&self, function: &Function, parents: &[u16]) -> (Vec<u16>, Vec<u32>) {
		let mut offsets = alloc::vec![0_u32; function.blocks.len() + 1];

		for id in function.block_ids() {
			let parent = parents[usize::from(id)];

			if parent == Dominance::UNDEFINED || parent == id {
				continue;
			}

			offsets[usize::from(parent) + 1] += 1;
		}

		for index in 1..offsets.len() {
			offsets[index] += offsets[index - 1];
		}

		let mut positions = offsets.clone();
		let mut children = alloc::vec![0_u16; usize::try_from(offsets[offsets.len() - 1]).unwrap()];

		for id in function.block_ids() {
			let parent = parents[usize::from(id)];

			if parent == Dominance::UNDEFINED || parent == id {
				continue;
			}

			let position = &mut positions[usize::from(parent)];

			children[usize::try_from(*position).unwrap()] = id;
			*position += 1;
		}

		(children, offsets)
	}

	fn find_frontiers(&self, function: &Function, parents: &[u16]) -> Vec<Set> {
		let mut frontiers: Vec<Set> = core::iter::repeat_with(Set::new)
			.take(function.blocks.len())
			.collect();

		for id in function.block_ids() {
			let parent = parents[usize::from(id)];

			if parent == Dominance::UNDEFINED {
				continue;
			}

			for predecessor in function.predecessors(id) {
				if parents[usize::from(predecessor)] == Dominance::UNDEFINED {
					continue;
				}

				let mut runner = predecessor;

				while runner != parent {
					frontiers[usize::from(runner)].grow_insert(id.into());

					runner = parents[usize::from(runner)];
				}
			}

			// The entry dominates itself only non strictly, so a back
			// edge into it puts it in its own frontier.
			if id == function.entry && function.predecessors(id).next().is_some() {
				frontiers[usize::from(id)].grow_insert(id.into());
			}
		}

		frontiers
	}

	pub fn run(&mut self, function: &Function) -> Dominance {
		self.find_post_order(function);

		let parents = self.find_parents(function);
		let (children, offsets) = self.find_children(function, &parents);
		let frontiers = self.find_frontiers(function, &parents);

		Dominance {
			parents,
			children,
			offsets,
			frontiers,
		}
	}
}

impl Default for DominanceFinder {
	fn default() -> Self {
		Self::new()
	}
}
