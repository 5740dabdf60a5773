use std::path::PathBuf;

/// Errors raised while evaluating a configuration expression.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// Every rejected syntactic form gets its own variant so the sandboxing
/// behavior of the evaluator is observable, not just a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
	#[error("unsupported syntax: {construct}")]
	UnsupportedSyntax { construct: String },

	#[error("unknown function: {name}")]
	UnknownFunction { name: String },

	#[error("unsupported operator: {op}")]
	UnsupportedOperator { op: String },

	#[error("'{op}' requires at least two operands, got {count}")]
	Arity { op: String, count: usize },

	#[error("invalid expression: {message}")]
	Parse { message: String },

	#[error("evaluation failed: {message}")]
	Evaluation { message: String },
}

impl EvalError {
	/// Shorthand for the catch-all numeric/type failure variant.
	pub fn evaluation(message: impl Into<String>) -> Self {
		EvalError::Evaluation {
			message: message.into(),
		}
	}
}

/// Errors raised by section-tree lookup and mutation.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
	#[error("no value or section named {key:?}")]
	KeyNotFound { key: String },

	#[error("key {key:?} is ambiguous; candidates: {}", .candidates.join(", "))]
	AmbiguousKey {
		key: String,
		candidates: Vec<String>,
	},

	#[error("cannot reach {path:?}: subsection {missing:?} does not exist")]
	MissingSubsection { path: String, missing: String },

	#[error("invalid path: {path:?}")]
	InvalidPath { path: String },
}

/// Errors raised while loading configuration sources into a tree.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
	#[error("failed to read config file: {path}")]
	ReadSource {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to read config stream")]
	ReadStream {
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse config text")]
	ParseSource {
		#[source]
		source: ini::ParseError,
	},

	#[error("failed to evaluate key {key:?} in section {section:?}")]
	Evaluate {
		section: String,
		key: String,
		#[source]
		source: EvalError,
	},

	#[error(transparent)]
	Tree(#[from] TreeError),
}
