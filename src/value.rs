use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// A dynamically-typed configuration value.
///
/// This is the closed set of types the expression evaluator can produce and
/// the section tree can store. Equality follows the numeric tower: booleans
/// compare as 0/1 and integers compare numerically against floats, so
/// `Int(1) == Float(1.0) == Bool(true)`. All other cross-type comparisons are
/// unequal. Ordering is only defined between numbers, between strings, and
/// between lists (elementwise); everything else is unordered.
#[derive(Debug, Clone)]
pub enum Value {
	Int(i64),
	Float(f64),
	Bool(bool),
	Str(String),

	/// Ordered, eager collection.
	List(Vec<Value>),

	/// Deduplicated-by-equality collection. Insertion order is retained
	/// internally but carries no meaning.
	Set(Vec<Value>),

	/// Key/value pairs. A later duplicate key overwrites the earlier entry.
	Map(Vec<(Value, Value)>),

	/// Lazy, single-pass sequence produced by tuple literals.
	Sequence(Sequence),
}

/// A single-pass sequence of values.
///
/// Tuple literals evaluate to this instead of an eager collection. The cursor
/// is shared: clones consume from the same underlying queue, so once a
/// sequence has been walked it is exhausted everywhere. Two sequences are
/// equal only if they are the same sequence.
#[derive(Debug, Clone)]
pub struct Sequence {
	items: Rc<RefCell<VecDeque<Value>>>,
}

impl Sequence {
	pub fn new(items: Vec<Value>) -> Self {
		Sequence {
			items: Rc::new(RefCell::new(items.into())),
		}
	}

	/// Take the next value, advancing the shared cursor.
	pub fn next(&self) -> Option<Value> {
		self.items.borrow_mut().pop_front()
	}

	/// Number of values not yet consumed.
	pub fn remaining(&self) -> usize {
		self.items.borrow().len()
	}

	/// Consume every remaining value into an eager list.
	pub fn drain(&self) -> Vec<Value> {
		self.items.borrow_mut().drain(..).collect()
	}
}

impl PartialEq for Sequence {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.items, &other.items)
	}
}

impl Value {
	/// Name of this value's type, for error messages.
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Int(_) => "int",
			Value::Float(_) => "float",
			Value::Bool(_) => "bool",
			Value::Str(_) => "str",
			Value::List(_) => "list",
			Value::Set(_) => "set",
			Value::Map(_) => "map",
			Value::Sequence(_) => "sequence",
		}
	}

	/// Truthiness: nonzero numbers, nonempty strings and collections.
	/// Sequences are always truthy, exhausted or not.
	pub fn truthy(&self) -> bool {
		match self {
			Value::Int(n) => *n != 0,
			Value::Float(f) => *f != 0.0,
			Value::Bool(b) => *b,
			Value::Str(s) => !s.is_empty(),
			Value::List(items) | Value::Set(items) => !items.is_empty(),
			Value::Map(entries) => !entries.is_empty(),
			Value::Sequence(_) => true,
		}
	}

	/// Numeric view of this value, if it has one (bools count as 0/1).
	pub fn as_number(&self) -> Option<f64> {
		match self {
			Value::Int(n) => Some(*n as f64),
			Value::Float(f) => Some(*f),
			Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
			_ => None,
		}
	}

	/// Membership test used by the `in` operator. `None` means the
	/// right-hand side does not support membership for this operand.
	pub fn contains(&self, needle: &Value) -> Option<bool> {
		match self {
			Value::Str(haystack) => match needle {
				Value::Str(sub) => Some(haystack.contains(sub.as_str())),
				_ => None,
			},
			Value::List(items) | Value::Set(items) => {
				Some(items.iter().any(|item| item == needle))
			}
			Value::Map(entries) => Some(entries.iter().any(|(k, _)| k == needle)),
			Value::Sequence(seq) => {
				// Searching a sequence consumes it.
				while let Some(item) = seq.next() {
					if &item == needle {
						return Some(true);
					}
				}
				Some(false)
			}
			_ => None,
		}
	}

	/// A rendering that evaluates back to the same value for primitive
	/// forms: strings are quoted, unlike `Display`.
	pub fn repr(&self) -> String {
		match self {
			Value::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
			_ => self.to_string(),
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Int(a), Value::Int(b)) => a == b,
			(Value::Str(a), Value::Str(b)) => a == b,
			(Value::List(a), Value::List(b)) => a == b,
			(Value::Set(a), Value::Set(b)) => {
				a.len() == b.len() && a.iter().all(|item| b.contains(item))
			}
			(Value::Map(a), Value::Map(b)) => {
				a.len() == b.len()
					&& a.iter()
						.all(|(k, v)| b.iter().any(|(bk, bv)| bk == k && bv == v))
			}
			(Value::Sequence(a), Value::Sequence(b)) => a == b,
			// Numeric tower: Bool/Int/Float mix freely.
			_ => match (self.as_number(), other.as_number()) {
				(Some(a), Some(b)) => a == b,
				_ => false,
			},
		}
	}
}

impl PartialOrd for Value {
	fn partial_cmp(&self, other: &Value) -> Option<std::cmp::Ordering> {
		match (self, other) {
			// Int/Int compares exactly; everything else numeric goes
			// through f64.
			(Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
			(Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
			(Value::List(a), Value::List(b)) => cmp_lists(a, b),
			_ => match (self.as_number(), other.as_number()) {
				(Some(a), Some(b)) => a.partial_cmp(&b),
				_ => None,
			},
		}
	}
}

fn cmp_lists(a: &[Value], b: &[Value]) -> Option<std::cmp::Ordering> {
	use std::cmp::Ordering;
	for (x, y) in a.iter().zip(b.iter()) {
		if x == y {
			continue;
		}
		return x.partial_cmp(y);
	}
	Some(a.len().cmp(&b.len()))
}

/// Format a float so it round-trips as a float literal (always keeps a
/// decimal point or exponent).
fn fmt_float(f: f64) -> String {
	if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
		format!("{f:.1}")
	} else {
		format!("{f:?}")
	}
}

impl fmt::Display for Value {
	fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Int(n) => write!(out, "{n}"),
			Value::Float(f) => write!(out, "{}", fmt_float(*f)),
			Value::Bool(true) => write!(out, "True"),
			Value::Bool(false) => write!(out, "False"),
			Value::Str(s) => write!(out, "{s}"),
			Value::List(items) => {
				let parts: Vec<String> = items.iter().map(Value::repr).collect();
				write!(out, "[{}]", parts.join(", "))
			}
			Value::Set(items) => {
				let parts: Vec<String> = items.iter().map(Value::repr).collect();
				write!(out, "{{{}}}", parts.join(", "))
			}
			Value::Map(entries) => {
				let parts: Vec<String> = entries
					.iter()
					.map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
					.collect();
				write!(out, "{{{}}}", parts.join(", "))
			}
			Value::Sequence(_) => write!(out, "<sequence>"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_numeric_tower_equality() {
		assert_eq!(Value::Int(1), Value::Float(1.0));
		assert_eq!(Value::Bool(true), Value::Int(1));
		assert_eq!(Value::Bool(false), Value::Float(0.0));
		assert_ne!(Value::Int(1), Value::Str("1".to_string()));
		assert_ne!(Value::Int(2), Value::Float(2.5));
	}

	#[test]
	fn test_collection_equality() {
		let a = Value::List(vec![Value::Int(1), Value::Int(2)]);
		let b = Value::List(vec![Value::Int(1), Value::Float(2.0)]);
		assert_eq!(a, b);

		// Sets compare without order.
		let s1 = Value::Set(vec![Value::Int(1), Value::Int(2)]);
		let s2 = Value::Set(vec![Value::Int(2), Value::Int(1)]);
		assert_eq!(s1, s2);

		let m1 = Value::Map(vec![(Value::Str("a".into()), Value::Int(1))]);
		let m2 = Value::Map(vec![(Value::Str("a".into()), Value::Int(1))]);
		assert_eq!(m1, m2);
	}

	#[test]
	fn test_truthiness() {
		assert!(Value::Int(3).truthy());
		assert!(!Value::Int(0).truthy());
		assert!(!Value::Str(String::new()).truthy());
		assert!(Value::Str("x".to_string()).truthy());
		assert!(!Value::List(vec![]).truthy());
		assert!(Value::Sequence(Sequence::new(vec![])).truthy());
	}

	#[test]
	fn test_ordering() {
		use std::cmp::Ordering;
		assert_eq!(
			Value::Int(1).partial_cmp(&Value::Float(1.5)),
			Some(Ordering::Less)
		);
		assert_eq!(
			Value::Str("a".into()).partial_cmp(&Value::Str("b".into())),
			Some(Ordering::Less)
		);
		assert_eq!(Value::Str("a".into()).partial_cmp(&Value::Int(1)), None);
	}

	#[test]
	fn test_sequence_is_single_pass() {
		let seq = Sequence::new(vec![Value::Int(1), Value::Int(2)]);
		let alias = seq.clone();
		assert_eq!(seq.next(), Some(Value::Int(1)));
		// The clone shares the cursor.
		assert_eq!(alias.next(), Some(Value::Int(2)));
		assert_eq!(seq.next(), None);
	}

	#[test]
	fn test_sequence_equality_is_identity() {
		let a = Sequence::new(vec![Value::Int(1)]);
		let b = Sequence::new(vec![Value::Int(1)]);
		assert_ne!(Value::Sequence(a.clone()), Value::Sequence(b));
		assert_eq!(Value::Sequence(a.clone()), Value::Sequence(a));
	}

	#[test]
	fn test_display_and_repr() {
		assert_eq!(Value::Int(5).to_string(), "5");
		assert_eq!(Value::Float(1.5).to_string(), "1.5");
		assert_eq!(Value::Float(2.0).to_string(), "2.0");
		assert_eq!(Value::Bool(true).to_string(), "True");
		assert_eq!(Value::Str("custom".into()).to_string(), "custom");
		assert_eq!(Value::Str("custom".into()).repr(), "'custom'");
		assert_eq!(
			Value::List(vec![Value::Int(1), Value::Str("a".into())]).to_string(),
			"[1, 'a']"
		);
		assert_eq!(
			Value::Map(vec![(Value::Str("k".into()), Value::Float(2.7))]).to_string(),
			"{'k': 2.7}"
		);
	}

	#[test]
	fn test_contains() {
		let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
		assert_eq!(list.contains(&Value::Int(2)), Some(true));
		assert_eq!(list.contains(&Value::Int(9)), Some(false));

		let s = Value::Str("hello world".into());
		assert_eq!(s.contains(&Value::Str("lo wo".into())), Some(true));
		assert_eq!(s.contains(&Value::Int(1)), None);

		let map = Value::Map(vec![(Value::Str("k".into()), Value::Int(1))]);
		assert_eq!(map.contains(&Value::Str("k".into())), Some(true));
		assert_eq!(map.contains(&Value::Int(1)), Some(false));
	}
}
