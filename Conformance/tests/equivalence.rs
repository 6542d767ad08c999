use std::path::Path;

use flow_graph::{
	instruction::{Instruction, Jump},
	Function,
};
use flow_restructurer::{Error, Folder, Restructurer};
use pretty_assertions::assert_eq;

use self::common::{
	interpreter::Interpreter,
	loader::{value_count, Loader},
};

mod common;

fn check_adjacency(function: &Function) {
	for id in function.block_ids() {
		for successor in function.successors(id) {
			assert!(
				function.predecessors(successor).any(|other| other == id),
				"edge {id} -> {successor} should be mirrored"
			);
		}

		for predecessor in function.predecessors(id) {
			assert!(
				function.successors(predecessor).any(|other| other == id),
				"edge {predecessor} -> {id} should be mirrored"
			);
		}

		assert!(
			function.successors(id).count() <= 2,
			"block {id} should branch at most two ways"
		);
	}
}

fn check_structured(function: &Function) {
	assert!(function.structured, "function should be marked structured");

	for id in function.block_ids() {
		for instruction in &function.blocks[usize::from(id)].instructions {
			assert!(
				!matches!(
					instruction,
					Instruction::Jump(Jump::Goto { .. } | Jump::GotoIf { .. })
				),
				"block {id} should not hold a goto"
			);
		}

		let count = function.successors(id).count();

		if function.is_end(id) {
			assert_eq!(count, 0, "the end block should have no successors");
		} else {
			match function.jump(id) {
				// a fall through, or a guard feeding both arms of an `If`
				None => assert!(count == 1 || count == 2, "block {id} should fall somewhere"),
				_ => assert_eq!(count, 1, "block {id} should transfer to one place"),
			}
		}
	}
}

fn compare(original: &Function, transformed: &Function) {
	let values = value_count(original);

	assert!(values <= 12, "assignment space should stay enumerable");

	let mut interpreter = Interpreter::new();

	for assignment in 0..1_u32 << values {
		let expected = interpreter.run(original, assignment).to_vec();
		let actual = interpreter.run(transformed, assignment).to_vec();

		assert_eq!(expected, actual, "assignment {assignment:#b} should agree");
	}
}

fn restructured(path: &Path) -> datatest_stable::Result<()> {
	let source = std::fs::read_to_string(path)?;
	let mut loader = Loader::new();

	let original = loader.run(&source);
	let mut function = loader.run(&source);
	let mut restructurer = Restructurer::new();

	let progress = restructurer
		.run(&mut function)
		.expect("control flow should be supported");

	assert!(progress, "an unstructured function should make progress");

	check_structured(&function);
	check_adjacency(&function);

	let progress = restructurer
		.run(&mut function)
		.expect("a structured function should be accepted");

	assert!(!progress, "a second run should change nothing");

	compare(&original, &function);

	Ok(())
}

fn folded(path: &Path) -> datatest_stable::Result<()> {
	let source = std::fs::read_to_string(path)?;
	let mut loader = Loader::new();

	let original = loader.run(&source);
	let mut function = loader.run(&source);
	let mut folder = Folder::new();

	match folder.run(&mut function) {
		Ok(_) => {}
		// out of the folder's reach, but not malformed
		Err(Error::UnsupportedControlFlow { .. }) => return Ok(()),
		Err(error) => panic!("{error}"),
	}

	check_adjacency(&function);
	compare(&original, &function);

	Ok(())
}

datatest_stable::harness! {
	{ test = restructured, root = "cases", pattern = r"^.*\.cfg$" },
	{ test = folded, root = "cases", pattern = r"^.*\.cfg$" },
}
