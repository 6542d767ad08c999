// Resources:
// "Emscripten: An LLVM-to-JavaScript Compiler",
//     by Alon Zakai

#![no_std]
#![expect(clippy::missing_panics_doc)]

extern crate alloc;

mod fold;
mod levels;
mod relink;
mod router;

use alloc::vec::Vec;

use flow_dominance::{Dominance, DominanceFinder};
use flow_graph::{
	instruction::Jump,
	Builder, Function,
};

use self::{
	levels::{Level, Organizer},
	relink::Relinker,
	router::{Path, Router, Routes},
};

pub use self::fold::Folder;

#[derive(PartialEq, Eq, Clone, Copy, Debug, thiserror::Error)]
pub enum Error {
	/// The function already contains structure, which the restructurer
	/// cannot thread its routing through.
	#[error("the function is already partially structured")]
	PartiallyStructured,

	/// The dominance information handed in was built for a different
	/// shape of the function.
	#[error("the dominance information does not match the function")]
	StaleDominance,

	#[error("unsupported control flow: {reason}")]
	UnsupportedControlFlow { reason: &'static str },
}

/// Rebuilds a function of `Goto` and `GotoIf` blocks into nested `If`
/// and `Loop` structure, synthesizing boolean routing variables where
/// the branches do not nest on their own.
pub struct Restructurer {
	dominance_finder: DominanceFinder,
	organizer: Organizer,
	router: Router,
	relinker: Relinker,
}

impl Restructurer {
	#[must_use]
	pub const fn new() -> Self {
		Self {
			dominance_finder: DominanceFinder::new(),
			organizer: Organizer::new(),
			router: Router::new(),
			relinker: Relinker::new(),
		}
	}

	/// Structures the whole function in one pass over its dominator
	/// tree. Returns `Ok(false)` when the function is already
	/// structured and `Ok(true)` when it was rebuilt.
	pub fn run(&mut self, function: &mut Function) -> Result<bool, Error> {
		if function.structured {
			return Ok(false);
		}

		Self::check_unstructured(function)?;

		let dominance = self.dominance_finder.run(function);

		self.run_structuring(function, &dominance);

		Ok(true)
	}

	/// Like [`Self::run`], but reuses dominance information the caller
	/// already has.
	pub fn run_with(&mut self, function: &mut Function, dominance: &Dominance) -> Result<bool, Error> {
		if function.structured {
			return Ok(false);
		}

		Self::check_unstructured(function)?;

		if usize::from(dominance.block_count()) != function.blocks.len() {
			return Err(Error::StaleDominance);
		}

		self.run_structuring(function, dominance);

		Ok(true)
	}

	fn check_unstructured(function: &Function) -> Result<(), Error> {
		if !function.ifs.is_empty() || !function.loops.is_empty() {
			return Err(Error::PartiallyStructured);
		}

		for id in function.block_ids() {
			if function.is_end(id) {
				continue;
			}

			match function.jump(id) {
				Some(Jump::Goto { .. } | Jump::GotoIf { .. }) => {}
				_ => {
					return Err(Error::UnsupportedControlFlow {
						reason: "block not terminated by a branch",
					})
				}
			}
		}

		Ok(())
	}

	fn run_structuring(&mut self, function: &mut Function, dominance: &Dominance) {
		debug_assert!(function
			.block_ids()
			.all(|id| function.is_end(id) || dominance.is_reachable(id)));

		self.router.clear();

		// emission refills the root; the stashed blocks are planted
		// back one by one as the dominator tree is walked
		function.containers[usize::from(Function::ROOT)].elements.clear();

		let mut routing = Routes {
			regular: Path {
				reachable: self.router.intern([Function::END]),
				fork: None,
			},
			brk: Path {
				reachable: self.router.intern(core::iter::empty()),
				fork: None,
			},
			cont: Path {
				reachable: self.router.intern(core::iter::empty()),
				fork: None,
			},
		};

		let entry = function.entry;
		let mut builder = Builder::new(function, Function::ROOT);

		self.structurize(&mut builder, dominance, &mut routing, entry);

		assert!(self.router.is_balanced());

		function.structured = true;

		self.relinker.run(function);
	}

	/// Plants `block`, then every block it dominates, organized into
	/// levels so all routing runs forward. A block in its own frontier
	/// heads a loop; its cycle goes inside and the rest of its children
	/// are planted after the loop.
	fn structurize(
		&mut self,
		builder: &mut Builder,
		dominance: &Dominance,
		routing: &mut Routes,
		block: u16,
	) {
		let head = dominance.frontier(block).contains(block.into());
		let mut inside = Vec::new();
		let mut outside_levels = Vec::new();

		if head {
			let (cycle, outside, reach) = self.organizer.inside_outside(dominance, block);

			outside_levels = self.organizer.run(
				&mut self.router,
				builder,
				dominance,
				routing,
				&outside,
				&reach,
				false,
			);

			let path = Path {
				reachable: self.router.intern([block]),
				fork: None,
			};
			let reach = self.router.intern(reach.iter().copied());

			self.router.loop_routing_start(builder, routing, path, reach);
			builder.push_loop();

			inside = cycle;
		}

		builder.plant(block);

		let jump = builder.function().take_jump(block).unwrap();
		let successors: Vec<u16> = builder.function().successors(block).collect();

		let children: Vec<u16> = if head {
			inside
		} else {
			dominance
				.children(block)
				.iter()
				.copied()
				.filter(|&id| id != Function::END)
				.collect()
		};

		let levels = self.organizer.run(
			&mut self.router,
			builder,
			dominance,
			routing,
			&children,
			&successors,
			true,
		);

		match jump {
			Jump::Goto { target } => self.router.route_to(builder, *routing, target),
			Jump::GotoIf {
				condition,
				then,
				other,
			} => self
				.router
				.route_to_cond(builder, *routing, condition, then, other),
			_ => unreachable!(),
		}

		self.plant_levels(builder, dominance, routing, levels);

		if head {
			builder.pop_loop();
			self.router.loop_routing_end(builder, routing);
			self.plant_levels(builder, dominance, routing, outside_levels);
		}
	}

	fn plant_levels(
		&mut self,
		builder: &mut Builder,
		dominance: &Dominance,
		routing: &mut Routes,
		levels: Vec<Level>,
	) {
		for level in levels {
			let inner = if level.skip {
				let fork = level.in_path.fork.unwrap();

				builder.push_if(self.router.read(fork));

				self.router.arms(fork)[1]
			} else {
				level.in_path
			};

			routing.regular = level.out_path;

			if let Some(reach) = level.irreducible {
				// the cycle has no dominating head, so a dispatch loop
				// re-reads the selection variables every iteration
				self.router
					.loop_routing_start(builder, routing, inner, reach);
				builder.push_loop();
				self.plant_path(builder, dominance, routing, inner);
				builder.pop_loop();
				self.router.loop_routing_end(builder, routing);
			} else {
				self.plant_path(builder, dominance, routing, inner);
			}

			if level.skip {
				builder.pop_if();
			}
		}
	}

	fn plant_path(
		&mut self,
		builder: &mut Builder,
		dominance: &Dominance,
		routing: &mut Routes,
		path: Path,
	) {
		if let Some(fork) = path.fork {
			let arms = self.router.arms(fork);

			builder.push_if(self.router.read(fork));
			self.plant_path(builder, dominance, routing, arms[1]);
			builder.push_else();
			self.plant_path(builder, dominance, routing, arms[0]);
			builder.pop_if();
		} else {
			let block = self.router.single(path);

			self.structurize(builder, dominance, routing, block);
		}
	}
}

impl Default for Restructurer {
	fn default() -> Self {
		Self::new()
	}
}
