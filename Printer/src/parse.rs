use flow_graph::{
	instruction::{Condition, Instruction, Opaque},
	Function,
};
use hashbrown::HashMap;

#[derive(PartialEq, Eq, Clone, Debug, thiserror::Error)]
pub enum Error {
	#[error("line {line}: malformed block description")]
	Malformed { line: usize },

	#[error("line {line}: duplicate label `{name}`")]
	DuplicateLabel { line: usize, name: String },

	#[error("line {line}: unknown block `{name}`")]
	UnknownBlock { line: usize, name: String },

	#[error("no entry block declared")]
	MissingEntry,
}

/// Parses a line oriented control flow description into a [`Function`].
///
/// ```text
/// entry start
///
/// start: op 0 ; goto_if v0 left right
/// left: op 1 ; goto merge
/// right: op 2 ; goto merge
/// merge: op 3 ; return
/// ```
///
/// Everything from a `#` to the end of its line is a comment. A block
/// holds `op N` instructions up to the `;`, then one terminator:
/// `goto <name>`, `goto_if [!]vK <name> <name>`, or `return`.
pub struct CfgParser {
	labels: HashMap<String, u16>,
}

impl CfgParser {
	#[must_use]
	pub fn new() -> Self {
		Self {
			labels: HashMap::new(),
		}
	}

	/// # Errors
	///
	/// Returns a parse error naming the offending line.
	pub fn run(&mut self, source: &str) -> Result<Function, Error> {
		self.labels.clear();

		let mut function = Function::new();
		let mut entry = None;

		for (index, content) in Self::contents(source) {
			if let Some((name, _)) = content.split_once(':') {
				self.add_label(&mut function, index, name.trim())?;
			} else {
				let mut tokens = content.split_whitespace();

				if tokens.next() != Some("entry") || entry.is_some() {
					return Err(Error::Malformed { line: index });
				}

				let Some(name) = tokens.next() else {
					return Err(Error::Malformed { line: index });
				};

				if tokens.next().is_some() {
					return Err(Error::Malformed { line: index });
				}

				entry = Some((index, name));
			}
		}

		for (index, content) in Self::contents(source) {
			if let Some((name, rest)) = content.split_once(':') {
				let id = self.labels[name.trim()];

				self.fill_block(&mut function, id, index, rest)?;
			}
		}

		let (index, name) = entry.ok_or(Error::MissingEntry)?;

		function.entry = self.lookup(index, name)?;

		Ok(function)
	}

	fn contents(source: &str) -> impl Iterator<Item = (usize, &str)> {
		source.lines().enumerate().filter_map(|(index, line)| {
			let content = line.split('#').next().unwrap().trim();

			(!content.is_empty()).then_some((index + 1, content))
		})
	}

	fn add_label(&mut self, function: &mut Function, line: usize, name: &str) -> Result<(), Error> {
		if name.is_empty() || name.contains(char::is_whitespace) {
			return Err(Error::Malformed { line });
		}

		let id = function.add_block(Function::ROOT);

		if self.labels.insert(name.to_owned(), id).is_some() {
			return Err(Error::DuplicateLabel {
				line,
				name: name.to_owned(),
			});
		}

		Ok(())
	}

	fn fill_block(
		&self,
		function: &mut Function,
		id: u16,
		line: usize,
		rest: &str,
	) -> Result<(), Error> {
		let Some((body, terminator)) = rest.split_once(';') else {
			return Err(Error::Malformed { line });
		};

		let mut tokens = body.split_whitespace();

		while let Some(token) = tokens.next() {
			if token != "op" {
				return Err(Error::Malformed { line });
			}

			let operation = tokens
				.next()
				.and_then(|token| token.parse().ok())
				.ok_or(Error::Malformed { line })?;

			function.push(id, Instruction::Opaque(Opaque { operation }));
		}

		let tokens: Vec<&str> = terminator.split_whitespace().collect();

		match *tokens {
			["return"] => function.terminate_return(id),
			["goto", target] => {
				let target = self.lookup(line, target)?;

				function.terminate_goto(id, target);
			}
			["goto_if", condition, then, other] => {
				let condition = Self::parse_condition(line, condition)?;
				let then = self.lookup(line, then)?;
				let other = self.lookup(line, other)?;

				function.terminate_goto_if(id, condition, then, other);
			}
			_ => return Err(Error::Malformed { line }),
		}

		Ok(())
	}

	fn parse_condition(line: usize, token: &str) -> Result<Condition, Error> {
		let (token, inverted) = match token.strip_prefix('!') {
			Some(token) => (token, true),
			None => (token, false),
		};

		let value = token
			.strip_prefix('v')
			.and_then(|token| token.parse().ok())
			.ok_or(Error::Malformed { line })?;

		let condition = Condition::value(value);

		Ok(if inverted { condition.inverted() } else { condition })
	}

	fn lookup(&self, line: usize, name: &str) -> Result<u16, Error> {
		self.labels
			.get(name)
			.copied()
			.ok_or_else(|| Error::UnknownBlock {
				line,
				name: name.to_owned(),
			})
	}
}

impl Default for CfgParser {
	fn default() -> Self {
		Self::new()
	}
}
