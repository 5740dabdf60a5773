//! Figtree - hierarchical configuration with safely evaluated values.
//!
//! This library reads INI-style configuration text into a tree of named
//! sections whose leaf values are produced by a restricted expression
//! evaluator, including:
//! - A whitelist-dispatch evaluator for arithmetic, boolean logic, chained
//!   comparisons, collection literals, named constants, and calls into a
//!   closed function registry - everything else fails closed
//! - A section tree with positional path normalization, idempotent ancestor
//!   creation, and bare-key breadth search with direct-child preference
//! - A loader that merges files, inline text, and open readers, registering
//!   a designated constants section before evaluating the rest
//!
//! # Example
//!
//! ```
//! use figtree::{Loader, Source, Value};
//!
//! let tree = Loader::new("Config")
//! 	.source(Source::text(
//! 		"[Constants]\n\
//! 		 c = 3 * 10 ** 8\n\
//! 		 [Sampler]\n\
//! 		 sampler_name = custom\n\
//! 		 [/parameter1]\n\
//! 		 min = 0\n\
//! 		 max = sin(pi / 2)\n",
//! 	))
//! 	.load()
//! 	.unwrap();
//!
//! // Unique keys resolve from anywhere in the tree.
//! assert_eq!(
//! 	tree.get("sampler_name").unwrap().value(),
//! 	Some(&Value::Str("custom".into()))
//! );
//! // Paths resolve directly.
//! assert_eq!(
//! 	tree.get("Sampler/parameter1/max").unwrap().value(),
//! 	Some(&Value::Float(1.0))
//! );
//! ```

pub mod error;
pub mod expr;
pub mod loader;
pub mod tree;
pub mod value;

pub use error::{EvalError, LoadError, TreeError};
pub use expr::Evaluator;
pub use loader::{Loader, Source};
pub use tree::{ConfigTree, Resolved, SectionId};
pub use value::{Sequence, Value};
