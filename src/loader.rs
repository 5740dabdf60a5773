//! Loading INI-style configuration text into a [`ConfigTree`].
//!
//! The text format itself is owned by the `rust-ini` parser; this module
//! consumes its ordered (section, key, raw string) view, routes a designated
//! constants section into the evaluator first, then evaluates every other
//! raw string into a [`Value`] and assigns it into the tree.

use crate::error::{EvalError, LoadError};
use crate::expr::Evaluator;
use crate::tree::ConfigTree;
use crate::value::Value;
use indexmap::IndexMap;
use ini::{Ini, ParseOption};
use log::debug;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;

/// One configuration input: a file on disk, inline text, or an open reader.
/// All sources are merged into a single parse before the tree is built.
pub enum Source {
	Path(PathBuf),
	Text(String),
	Reader(Box<dyn Read>),
}

impl Source {
	pub fn path(path: impl Into<PathBuf>) -> Self {
		Source::Path(path.into())
	}

	pub fn text(text: impl Into<String>) -> Self {
		Source::Text(text.into())
	}

	pub fn reader(reader: impl Read + 'static) -> Self {
		Source::Reader(Box::new(reader))
	}
}

impl fmt::Debug for Source {
	fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Source::Path(path) => out.debug_tuple("Path").field(path).finish(),
			Source::Text(text) => out.debug_tuple("Text").field(&text.len()).finish(),
			Source::Reader(_) => out.write_str("Reader(..)"),
		}
	}
}

/// Builder for loading configuration sources into a [`ConfigTree`].
///
/// Section headers are placed relative to the previously loaded section: each
/// header is prefixed with one separator and expanded from there, so a header
/// starting with a separator nests under the section before it.
///
/// Entries of the constants section (default `Constants`) are evaluated and
/// registered into the evaluator before anything else, making them visible to
/// every other value in the same load. The section still appears in the tree.
///
/// # Example
///
/// ```
/// use figtree::{Loader, Source, Value};
///
/// let tree = Loader::new("Config")
/// 	.source(Source::text(
/// 		"[Constants]\n\
/// 		 c = 3 * 10 ** 8\n\
/// 		 [detector]\n\
/// 		 rate = c / 2\n",
/// 	))
/// 	.load()
/// 	.unwrap();
///
/// let rate = tree.get("rate").unwrap().value().cloned();
/// assert_eq!(rate, Some(Value::Float(150000000.0)));
/// ```
#[derive(Debug)]
pub struct Loader {
	root_name: String,
	separator: String,
	constants_section: Option<String>,
	evaluator: Evaluator,
	sources: Vec<Source>,
}

impl Loader {
	/// A loader producing a tree rooted at `root_name`, with the `/`
	/// separator and a `Constants` constants section.
	pub fn new(root_name: impl Into<String>) -> Self {
		Loader {
			root_name: root_name.into(),
			separator: "/".to_string(),
			constants_section: Some("Constants".to_string()),
			evaluator: Evaluator::new(),
			sources: Vec::new(),
		}
	}

	/// Use a different path separator for the resulting tree.
	pub fn separator(mut self, separator: impl Into<String>) -> Self {
		self.separator = separator.into();
		self
	}

	/// Use a different section name as the constants section.
	pub fn constants_section(mut self, name: impl Into<String>) -> Self {
		self.constants_section = Some(name.into());
		self
	}

	/// Do not treat any section as a constants section.
	pub fn without_constants(mut self) -> Self {
		self.constants_section = None;
		self
	}

	/// Pre-register a constant, visible to every evaluated value.
	pub fn register_constant(mut self, name: impl Into<String>, value: Value) -> Self {
		self.evaluator.register_constant(name, value);
		self
	}

	/// Pre-register a function callable from configuration expressions.
	pub fn register_function<F>(mut self, name: impl Into<String>, function: F) -> Self
	where
		F: Fn(&[Value], &[(String, Value)]) -> Result<Value, EvalError> + Send + Sync + 'static,
	{
		self.evaluator.register_function(name, function);
		self
	}

	/// Add a configuration source. Sources are parsed in order; a later
	/// source overwrites keys it shares with an earlier one.
	pub fn source(mut self, source: Source) -> Self {
		self.sources.push(source);
		self
	}

	/// Parse every source, register constants, and build the tree.
	///
	/// Any evaluation failure aborts the load: a malformed configuration
	/// value is a misconfiguration, not a recoverable condition.
	pub fn load(self) -> Result<ConfigTree, LoadError> {
		let Loader {
			root_name,
			separator,
			constants_section,
			mut evaluator,
			sources,
		} = self;

		let mut merged: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
		for source in sources {
			let ini = parse_source(source)?;
			for (section, properties) in ini.iter() {
				// Keys outside any section header are ignored.
				let Some(section) = section else { continue };
				let entries = merged.entry(section.to_string()).or_default();
				for (key, value) in properties.iter() {
					let _ = entries.insert(key.to_string(), value.to_string());
				}
			}
		}

		if let Some(constants_section) = &constants_section {
			if let Some(entries) = merged.get(constants_section) {
				for (key, raw) in entries {
					let value =
						evaluator
							.evaluate(raw)
							.map_err(|source| LoadError::Evaluate {
								section: constants_section.clone(),
								key: key.clone(),
								source,
							})?;
					debug!("constant {key} = {value} from [{constants_section}]");
					evaluator.register_constant(key.clone(), value);
				}
			}
		}

		let mut tree = ConfigTree::with_separator(root_name, separator);
		let mut cursor = tree.root();
		for (section_name, entries) in &merged {
			// Place the section relative to the previous one.
			let placement = format!("{}{}", tree.separator(), section_name);
			let (section, created) = tree.ensure_path(cursor, &placement)?;
			debug!(
				"section {} ({} created)",
				tree.full_path(section),
				created.len()
			);
			cursor = section;
			for (key, raw) in entries {
				let value = evaluator
					.evaluate(raw)
					.map_err(|source| LoadError::Evaluate {
						section: section_name.clone(),
						key: key.clone(),
						source,
					})?;
				tree.set_from(cursor, key, value)?;
			}
		}
		Ok(tree)
	}
}

/// Quote and escape interpretation stay off so raw expression text reaches
/// the evaluator untouched.
fn parse_option() -> ParseOption {
	ParseOption {
		enabled_quote: false,
		enabled_escape: false,
		..ParseOption::default()
	}
}

fn parse_source(source: Source) -> Result<Ini, LoadError> {
	match source {
		Source::Path(path) => {
			Ini::load_from_file_opt(&path, parse_option()).map_err(|err| match err {
				ini::Error::Io(source) => LoadError::ReadSource {
					path: path.clone(),
					source,
				},
				ini::Error::Parse(source) => LoadError::ParseSource { source },
			})
		}
		Source::Text(text) => Ini::load_from_str_opt(&text, parse_option())
			.map_err(|source| LoadError::ParseSource { source }),
		Source::Reader(mut reader) => {
			Ini::read_from_opt(&mut reader, parse_option()).map_err(|err| match err {
				ini::Error::Io(source) => LoadError::ReadStream { source },
				ini::Error::Parse(source) => LoadError::ParseSource { source },
			})
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::{EvalError, TreeError};

	#[test]
	fn test_load_flat_sections() {
		let tree = Loader::new("Config")
			.source(Source::text(
				"[server]\nport = 8000 + 80\nhost = 'localhost'\n[client]\nretries = 3\n",
			))
			.load()
			.unwrap();

		assert_eq!(
			tree.get("port").unwrap().value(),
			Some(&Value::Int(8080))
		);
		assert_eq!(
			tree.get("host").unwrap().value(),
			Some(&Value::Str("localhost".into()))
		);
		assert_eq!(
			tree.get("client/retries").unwrap().value(),
			Some(&Value::Int(3))
		);
	}

	#[test]
	fn test_leading_separator_nests_under_previous_section() {
		let tree = Loader::new("Config")
			.source(Source::text(
				"[detectors]\nwidth = 2\n[/det1]\nheight = 1.5\n[/det2]\nheight = 2\n",
			))
			.load()
			.unwrap();

		assert_eq!(
			tree.get("detectors/det1/height").unwrap().value(),
			Some(&Value::Float(1.5))
		);
		assert_eq!(
			tree.get("detectors/det2/height").unwrap().value(),
			Some(&Value::Int(2))
		);
	}

	#[test]
	fn test_constants_are_visible_to_later_sections() {
		let tree = Loader::new("Config")
			.source(Source::text(
				"[Constants]\nc = 3 * 10 ** 8\n[physics]\nhalf = c / 2\nname = 'c'\n",
			))
			.load()
			.unwrap();

		assert_eq!(
			tree.get("half").unwrap().value(),
			Some(&Value::Float(150000000.0))
		);
		// String literals naming a constant substitute its value.
		assert_eq!(
			tree.get("name").unwrap().value(),
			Some(&Value::Int(300000000))
		);
		// The constants section itself is part of the tree.
		assert_eq!(
			tree.get("Constants/c").unwrap().value(),
			Some(&Value::Int(300000000))
		);
	}

	#[test]
	fn test_constants_can_reference_earlier_constants() {
		let tree = Loader::new("Config")
			.source(Source::text("[Constants]\na = 2\nb = a * 3\n[s]\nv = b\n"))
			.load()
			.unwrap();
		assert_eq!(tree.get("v").unwrap().value(), Some(&Value::Int(6)));
	}

	#[test]
	fn test_without_constants_section() {
		let tree = Loader::new("Config")
			.without_constants()
			.source(Source::text("[Constants]\nc = 2\n[s]\nv = c\n"))
			.load()
			.unwrap();
		// `c` is just an unresolved name now.
		assert_eq!(
			tree.get("v").unwrap().value(),
			Some(&Value::Str("c".into()))
		);
	}

	#[test]
	fn test_custom_constants_section_name() {
		let tree = Loader::new("Config")
			.constants_section("Defs")
			.source(Source::text("[Defs]\nc = 2\n[s]\nv = c * 2\n"))
			.load()
			.unwrap();
		assert_eq!(tree.get("v").unwrap().value(), Some(&Value::Int(4)));
	}

	#[test]
	fn test_later_sources_overwrite_keys() {
		let tree = Loader::new("Config")
			.source(Source::text("[s]\na = 1\nb = 2\n"))
			.source(Source::text("[s]\na = 10\n[t]\nc = 3\n"))
			.load()
			.unwrap();
		assert_eq!(tree.get("a").unwrap().value(), Some(&Value::Int(10)));
		assert_eq!(tree.get("b").unwrap().value(), Some(&Value::Int(2)));
		assert_eq!(tree.get("c").unwrap().value(), Some(&Value::Int(3)));
	}

	#[test]
	fn test_preregistered_constants_and_functions() {
		let tree = Loader::new("Config")
			.register_constant("answer", Value::Int(42))
			.register_function("double", |args: &[Value], _: &[(String, Value)]| {
				match args.first() {
					Some(Value::Int(n)) => Ok(Value::Int(n * 2)),
					_ => Err(EvalError::evaluation("double() expects an int")),
				}
			})
			.source(Source::text("[s]\nv = double(answer)\n"))
			.load()
			.unwrap();
		assert_eq!(tree.get("v").unwrap().value(), Some(&Value::Int(84)));
	}

	#[test]
	fn test_evaluation_failure_aborts_load() {
		let result = Loader::new("Config")
			.source(Source::text("[s]\nv = 1 / 0\n"))
			.load();
		match result {
			Err(LoadError::Evaluate { section, key, .. }) => {
				assert_eq!(section, "s");
				assert_eq!(key, "v");
			}
			other => panic!("expected evaluation failure, got {other:?}"),
		}
	}

	#[test]
	fn test_rejected_syntax_aborts_load() {
		let result = Loader::new("Config")
			.source(Source::text("[s]\nv = __import__('os')\n"))
			.load();
		assert!(matches!(
			result,
			Err(LoadError::Evaluate {
				source: EvalError::UnknownFunction { .. },
				..
			})
		));
	}

	#[test]
	fn test_lookup_errors_after_load() {
		let tree = Loader::new("Config")
			.source(Source::text("[a]\nk = 1\n[b]\nk = 2\n"))
			.load()
			.unwrap();
		assert!(matches!(
			tree.get("k"),
			Err(TreeError::AmbiguousKey { .. })
		));
		assert_eq!(tree.get("a/k").unwrap().value(), Some(&Value::Int(1)));
	}
}
