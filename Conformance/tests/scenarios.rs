use flow_dominance::DominanceFinder;
use flow_graph::{
	instruction::{Jump, Source, Variable},
	Function,
};
use flow_printer::{CfgParser, Error as ParseError, PseudoPrinter};
use flow_restructurer::{Error, Folder, Restructurer};
use pretty_assertions::assert_eq;

use self::common::{
	interpreter::{Interpreter, FUEL},
	loader::{value_count, Loader},
};

mod common;

fn restructure(source: &str) -> Function {
	let mut function = Loader::new().run(source);

	assert!(Restructurer::new().run(&mut function).unwrap());

	function
}

#[test]
fn diamond_needs_no_variables() {
	let function = restructure(include_str!("../cases/diamond.cfg"));

	assert_eq!(function.variable_count(), 0);
	assert_eq!(function.ifs.len(), 1);
	assert!(function.loops.is_empty());
}

#[test]
fn while_loop_needs_no_variables() {
	let function = restructure(include_str!("../cases/while_loop.cfg"));

	assert_eq!(function.variable_count(), 0);
	assert_eq!(function.ifs.len(), 1);
	assert_eq!(function.loops.len(), 1);
}

#[test]
fn break_and_exit_share_the_merge() {
	let function = restructure(include_str!("../cases/break_merge.cfg"));

	assert_eq!(function.variable_count(), 0);
	assert_eq!(function.loops.len(), 1);
}

#[test]
fn skipped_level_gets_one_gate() {
	let function = restructure(include_str!("../cases/skip_level.cfg"));

	assert_eq!(function.variable_count(), 1);
	assert_eq!(function.variable_name(Variable(0)), "path_skip");
	assert!(function.loops.is_empty());
}

#[test]
fn irreducible_pair_gets_one_dispatch_loop() {
	let function = restructure(include_str!("../cases/irreducible.cfg"));

	assert_eq!(function.variable_count(), 1);
	assert_eq!(function.variable_name(Variable(0)), "path_select");
	assert_eq!(function.loops.len(), 1);
}

#[test]
fn returns_escape_nested_loops() {
	let function = restructure(include_str!("../cases/loop_return.cfg"));

	assert_eq!(function.loops.len(), 3);
	assert_eq!(function.variable_count(), 1);
	assert_eq!(function.variable_name(Variable(0)), "path_skip");
}

#[test]
fn inner_loop_escapes_need_two_variables() {
	let function = restructure(include_str!("../cases/inner_escape.cfg"));

	assert_eq!(function.loops.len(), 2);
	assert_eq!(function.variable_count(), 2);
	assert_eq!(function.variable_name(Variable(0)), "path_break");
	assert_eq!(function.variable_name(Variable(1)), "path_continue");
}

#[test]
fn folder_builds_a_diamond() {
	let mut function = Loader::new().run(include_str!("../cases/diamond.cfg"));
	let mut folder = Folder::new();

	assert!(folder.run(&mut function).unwrap());
	assert_eq!(function.ifs.len(), 1);
	assert!(function.loops.is_empty());

	assert!(!folder.run(&mut function).unwrap());
}

#[test]
fn folder_builds_a_self_loop() {
	let source = include_str!("../cases/self_loop.cfg");
	let mut loader = Loader::new();

	let original = loader.run(source);
	let mut function = loader.run(source);

	assert!(Folder::new().run(&mut function).unwrap());
	assert_eq!(function.loops.len(), 1);
	assert_eq!(function.ifs.len(), 1);

	let mut interpreter = Interpreter::new();

	for assignment in 0..1_u32 << value_count(&original) {
		let expected = interpreter.run(&original, assignment).to_vec();
		let actual = interpreter.run(&function, assignment).to_vec();

		assert_eq!(expected, actual, "assignment {assignment:#b} should agree");
	}

	// spins forever once the branch always holds
	assert_eq!(interpreter.run(&function, 1).len(), FUEL);
}

#[test]
fn folder_leaves_a_chain_loop() {
	let mut function = Loader::new().run(include_str!("../cases/while_loop.cfg"));

	assert!(!Folder::new().run(&mut function).unwrap());
	assert!(function.ifs.is_empty());
	assert!(function.loops.is_empty());
}

#[test]
fn folder_rejects_a_multi_entry_loop() {
	let mut function = Loader::new().run(include_str!("../cases/multi_entry.cfg"));

	assert!(matches!(
		Folder::new().run(&mut function),
		Err(Error::UnsupportedControlFlow { .. })
	));
}

#[test]
fn folder_keeps_the_entry_in_place() {
	let mut function = Loader::new().run(include_str!("../cases/entry_loop.cfg"));

	assert!(!Folder::new().run(&mut function).unwrap());
	assert!(function.loops.is_empty());
	assert!(function.ifs.is_empty());
}

#[test]
fn rejected_fold_keeps_earlier_progress() {
	let mut function = Loader::new().run(
		"entry a\n\
		a: op 0 ; goto_if v0 b c\n\
		b: op 1 ; goto m\n\
		c: op 2 ; goto m\n\
		m: op 3 ; goto_if v1 e h\n\
		e: op 4 ; goto_if v2 h x\n\
		h: op 5 ; goto_if v3 h x\n\
		x: op 6 ; return\n",
	);

	assert!(matches!(
		Folder::new().run(&mut function),
		Err(Error::UnsupportedControlFlow { .. })
	));
	assert_eq!(function.ifs.len(), 1);
}

#[test]
fn partial_structure_is_rejected() {
	let mut function = Loader::new().run(include_str!("../cases/diamond.cfg"));

	assert!(Folder::new().run(&mut function).unwrap());
	assert_eq!(
		Restructurer::new().run(&mut function),
		Err(Error::PartiallyStructured)
	);
}

#[test]
fn missing_terminator_is_rejected() {
	let mut function = Function::new();

	function.entry = function.add_block(Function::ROOT);

	assert!(matches!(
		Restructurer::new().run(&mut function),
		Err(Error::UnsupportedControlFlow { .. })
	));
}

#[test]
fn stale_dominance_is_rejected() {
	let mut function = Loader::new().run(include_str!("../cases/diamond.cfg"));
	let mut finder = DominanceFinder::new();
	let dominance = finder.run(&function);

	let block = function.add_block(Function::ROOT);

	function.terminate_return(block);

	assert_eq!(
		Restructurer::new().run_with(&mut function, &dominance),
		Err(Error::StaleDominance)
	);
}

#[test]
fn fresh_dominance_is_accepted() {
	let mut function = Loader::new().run(include_str!("../cases/while_loop.cfg"));
	let mut finder = DominanceFinder::new();
	let dominance = finder.run(&function);

	assert_eq!(
		Restructurer::new().run_with(&mut function, &dominance),
		Ok(true)
	);
	assert!(function.structured);
}

#[test]
fn parser_reads_inverted_conditions() {
	let function = Loader::new().run("entry a\na: ; goto_if !v1 b b\nb: ; return\n");

	let Some(Jump::GotoIf { condition, .. }) = function.jump(function.entry) else {
		panic!("entry should branch");
	};

	assert_eq!(condition.source, Source::Value(1));
	assert!(condition.inverted);
}

#[test]
fn parser_rejects_an_unknown_target() {
	let error = CfgParser::new().run("entry a\na: op 0 ; goto b\n").unwrap_err();

	assert!(matches!(error, ParseError::UnknownBlock { .. }));
}

#[test]
fn parser_rejects_a_duplicate_label() {
	let error = CfgParser::new()
		.run("entry a\na: ; return\na: ; return\n")
		.unwrap_err();

	assert!(matches!(error, ParseError::DuplicateLabel { .. }));
}

#[test]
fn parser_requires_an_entry() {
	let error = CfgParser::new().run("a: ; return\n").unwrap_err();

	assert_eq!(error, ParseError::MissingEntry);
}

#[test]
fn printer_renders_structure() {
	let function = restructure(include_str!("../cases/diamond.cfg"));
	let mut output = Vec::new();

	PseudoPrinter::new().print(&function, &mut output).unwrap();

	let text = String::from_utf8(output).unwrap();

	assert!(text.contains("if "));
	assert!(!text.contains("goto"));
}

#[test]
fn printer_labels_unstructured_blocks() {
	let function = Loader::new().run(include_str!("../cases/diamond.cfg"));
	let mut output = Vec::new();

	PseudoPrinter::new().print(&function, &mut output).unwrap();

	let text = String::from_utf8(output).unwrap();

	assert!(text.contains("b1:"));
	assert!(text.contains("goto_if"));
}
