use crate::error::EvalError;
use crate::expr::ast::{BinOp, CallArg, CmpOp, Expr, LogicOp, UnaryOp};
use crate::expr::builtins;
use crate::expr::parser;
use crate::value::{Sequence, Value};
use std::collections::HashMap;

/// A function callable from configuration expressions.
///
/// Receives the evaluated positional and keyword arguments.
pub type NativeFn =
	Box<dyn Fn(&[Value], &[(String, Value)]) -> Result<Value, EvalError> + Send + Sync>;

/// Evaluates expression strings into [`Value`]s against a closed registry of
/// constants and functions.
///
/// Only a whitelisted grammar is interpretable: arithmetic, boolean logic,
/// chained comparisons, collection literals, named constants, and calls to
/// registered functions. Every other syntactic form fails with
/// [`EvalError::UnsupportedSyntax`] — the evaluator never reaches attribute
/// access, subscripting, assignment, or any host execution primitive.
///
/// Registries are plain values owned by the evaluator; populate them before
/// evaluating and treat them as read-only afterwards.
pub struct Evaluator {
	constants: HashMap<String, Value>,
	functions: HashMap<String, NativeFn>,
}

impl std::fmt::Debug for Evaluator {
	fn fmt(&self, out: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut functions: Vec<&str> = self.functions.keys().map(String::as_str).collect();
		functions.sort_unstable();
		out.debug_struct("Evaluator")
			.field("constants", &self.constants)
			.field("functions", &functions)
			.finish()
	}
}

impl Default for Evaluator {
	fn default() -> Self {
		Self::new()
	}
}

impl Evaluator {
	/// An evaluator with the default registries: trigonometry, `exp`,
	/// `sqrt`/`root`, `sum`, the `int`/`float`/`bool`/`str` coercions, and
	/// the constants `pi`/`Pi`/`PI` and `e`/`E`.
	pub fn new() -> Self {
		let mut evaluator = Self::empty();
		builtins::install(&mut evaluator);
		evaluator
	}

	/// An evaluator with no registered constants or functions.
	pub fn empty() -> Self {
		Evaluator {
			constants: HashMap::new(),
			functions: HashMap::new(),
		}
	}

	/// Register a named constant. An existing constant of the same name is
	/// overwritten without warning.
	pub fn register_constant(&mut self, name: impl Into<String>, value: Value) {
		let _ = self.constants.insert(name.into(), value);
	}

	/// Register a named function. An existing function of the same name is
	/// overwritten without warning.
	pub fn register_function<F>(&mut self, name: impl Into<String>, function: F)
	where
		F: Fn(&[Value], &[(String, Value)]) -> Result<Value, EvalError> + Send + Sync + 'static,
	{
		let _ = self.functions.insert(name.into(), Box::new(function));
	}

	/// Look up a registered constant.
	pub fn constant(&self, name: &str) -> Option<&Value> {
		self.constants.get(name)
	}

	/// Parse and evaluate one expression.
	pub fn evaluate(&self, text: &str) -> Result<Value, EvalError> {
		let expr = parser::parse(text)?;
		self.eval(&expr)
	}

	/// Reduce a syntax tree to a value. Exhaustive over [`Expr`]: every
	/// variant is either interpreted here or rejected by name.
	pub fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
		match expr {
			Expr::Int(n) => Ok(Value::Int(*n)),
			Expr::Float(f) => Ok(Value::Float(*f)),
			Expr::Bool(b) => Ok(Value::Bool(*b)),

			// A string literal that names a registered constant yields the
			// constant's value; configuration authors can write bare words
			// in quotes and still get the constant.
			Expr::Str(s) => Ok(match self.constants.get(s) {
				Some(value) => value.clone(),
				None => Value::Str(s.clone()),
			}),

			// Unresolved names are not an error; they degrade to their own
			// spelling.
			Expr::Name(name) => Ok(match self.constants.get(name) {
				Some(value) => value.clone(),
				None => Value::Str(name.clone()),
			}),

			Expr::Binary { op, left, right } => {
				let lhs = self.eval(left)?;
				let rhs = self.eval(right)?;
				binary_op(*op, lhs, rhs)
			}

			Expr::Unary { op, operand } => unary_op(*op, self.eval(operand)?),

			Expr::Logical { op, operands } => {
				if operands.len() < 2 {
					return Err(EvalError::Arity {
						op: op.word().to_string(),
						count: operands.len(),
					});
				}
				// All operands are evaluated; and/or do not short-circuit.
				let mut truths = Vec::with_capacity(operands.len());
				for operand in operands {
					truths.push(self.eval(operand)?.truthy());
				}
				Ok(Value::Bool(match op {
					LogicOp::And => truths.iter().all(|t| *t),
					LogicOp::Or => truths.iter().any(|t| *t),
				}))
			}

			Expr::Compare { first, rest } => {
				let mut previous = self.eval(first)?;
				let mut results = Vec::with_capacity(rest.len());
				for (op, operand) in rest {
					let next = self.eval(operand)?;
					results.push(compare(*op, &previous, &next)?);
					// The chain advances whether or not the pair held.
					previous = next;
				}
				Ok(Value::Bool(results.iter().all(|r| *r)))
			}

			Expr::List(items) => {
				let values = self.eval_all(items)?;
				Ok(Value::List(values))
			}

			Expr::Set(items) => {
				let mut values: Vec<Value> = Vec::with_capacity(items.len());
				for item in items {
					let value = self.eval(item)?;
					if !values.contains(&value) {
						values.push(value);
					}
				}
				Ok(Value::Set(values))
			}

			Expr::Map(entries) => {
				let mut pairs: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
				for (key_expr, value_expr) in entries {
					let key = self.eval(key_expr)?;
					let value = self.eval(value_expr)?;
					match pairs.iter_mut().find(|(k, _)| *k == key) {
						Some(entry) => entry.1 = value,
						None => pairs.push((key, value)),
					}
				}
				Ok(Value::Map(pairs))
			}

			// Tuples build a lazy, single-pass sequence, not an eager
			// collection.
			Expr::Tuple(items) => {
				let values = self.eval_all(items)?;
				Ok(Value::Sequence(Sequence::new(values)))
			}

			Expr::Call { target, args } => self.call(target, args),

			Expr::Attribute { .. } | Expr::Index { .. } => Err(EvalError::UnsupportedSyntax {
				construct: expr.kind().to_string(),
			}),
		}
	}

	fn eval_all(&self, items: &[Expr]) -> Result<Vec<Value>, EvalError> {
		items.iter().map(|item| self.eval(item)).collect()
	}

	fn call(&self, target: &Expr, args: &[CallArg]) -> Result<Value, EvalError> {
		// Only a bare-name call against the registry is permitted.
		let Expr::Name(name) = target else {
			return Err(EvalError::UnsupportedSyntax {
				construct: format!("call of {}", target.kind()),
			});
		};
		let function = self
			.functions
			.get(name)
			.ok_or_else(|| EvalError::UnknownFunction { name: name.clone() })?;

		let mut positional = Vec::new();
		let mut keyword = Vec::new();
		for arg in args {
			match arg {
				CallArg::Positional(expr) => positional.push(self.eval(expr)?),
				CallArg::Keyword(name, expr) => keyword.push((name.clone(), self.eval(expr)?)),
				CallArg::Star(_) => {
					return Err(EvalError::UnsupportedSyntax {
						construct: "argument unpacking".to_string(),
					});
				}
				CallArg::DoubleStar(_) => {
					return Err(EvalError::UnsupportedSyntax {
						construct: "keyword argument unpacking".to_string(),
					});
				}
			}
		}
		function(&positional, &keyword)
	}
}

/// Integer floor division, rounding toward negative infinity.
fn floor_div_i64(a: i64, b: i64) -> Result<i64, EvalError> {
	if b == 0 {
		return Err(EvalError::evaluation("integer division by zero"));
	}
	let quotient = a / b;
	if a % b != 0 && (a < 0) != (b < 0) {
		quotient
			.checked_sub(1)
			.ok_or_else(|| EvalError::evaluation("integer overflow in //"))
	} else {
		Ok(quotient)
	}
}

/// Integer modulo; the result takes the sign of the divisor.
fn floor_mod_i64(a: i64, b: i64) -> Result<i64, EvalError> {
	if b == 0 {
		return Err(EvalError::evaluation("integer modulo by zero"));
	}
	let remainder = a % b;
	if remainder != 0 && (remainder < 0) != (b < 0) {
		Ok(remainder + b)
	} else {
		Ok(remainder)
	}
}

fn int_pow(base: i64, exponent: i64) -> Result<Value, EvalError> {
	if exponent < 0 {
		if base == 0 {
			return Err(EvalError::evaluation("zero to a negative power"));
		}
		return Ok(Value::Float((base as f64).powi(exponent as i32)));
	}
	let exponent: u32 = exponent
		.try_into()
		.map_err(|_| EvalError::evaluation("exponent too large"))?;
	base.checked_pow(exponent)
		.map(Value::Int)
		.ok_or_else(|| EvalError::evaluation("integer overflow in **"))
}

/// Integer view for arithmetic: bools promote to 0/1.
fn as_int(value: &Value) -> Option<i64> {
	match value {
		Value::Int(n) => Some(*n),
		Value::Bool(b) => Some(i64::from(*b)),
		_ => None,
	}
}

fn type_mismatch(op: BinOp, lhs: &Value, rhs: &Value) -> EvalError {
	EvalError::evaluation(format!(
		"'{}' not supported between {} and {}",
		op.symbol(),
		lhs.type_name(),
		rhs.type_name()
	))
}

fn binary_op(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
	// Whitelisted operator table; everything the parser understands beyond
	// this is rejected, not interpreted.
	match op {
		BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::FloorDiv | BinOp::Mod
		| BinOp::Pow => {}
		other => {
			return Err(EvalError::UnsupportedOperator {
				op: other.symbol().to_string(),
			});
		}
	}

	// Concatenation and repetition for strings and lists.
	match (&op, &lhs, &rhs) {
		(BinOp::Add, Value::Str(a), Value::Str(b)) => {
			return Ok(Value::Str(format!("{a}{b}")));
		}
		(BinOp::Add, Value::List(a), Value::List(b)) => {
			let mut items = a.clone();
			items.extend(b.iter().cloned());
			return Ok(Value::List(items));
		}
		(BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) => {
			if let Some(count) = as_int(n) {
				return Ok(Value::Str(s.repeat(count.max(0) as usize)));
			}
		}
		(BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items)) => {
			if let Some(count) = as_int(n) {
				let mut out = Vec::new();
				for _ in 0..count.max(0) {
					out.extend(items.iter().cloned());
				}
				return Ok(Value::List(out));
			}
		}
		_ => {}
	}

	// Integer arithmetic stays integral, except true division.
	if let (Some(a), Some(b)) = (as_int(&lhs), as_int(&rhs)) {
		return match op {
			BinOp::Add => a
				.checked_add(b)
				.map(Value::Int)
				.ok_or_else(|| EvalError::evaluation("integer overflow in +")),
			BinOp::Sub => a
				.checked_sub(b)
				.map(Value::Int)
				.ok_or_else(|| EvalError::evaluation("integer overflow in -")),
			BinOp::Mul => a
				.checked_mul(b)
				.map(Value::Int)
				.ok_or_else(|| EvalError::evaluation("integer overflow in *")),
			BinOp::Div => {
				if b == 0 {
					Err(EvalError::evaluation("division by zero"))
				} else {
					Ok(Value::Float(a as f64 / b as f64))
				}
			}
			BinOp::FloorDiv => floor_div_i64(a, b).map(Value::Int),
			BinOp::Mod => floor_mod_i64(a, b).map(Value::Int),
			BinOp::Pow => int_pow(a, b),
			_ => unreachable!("operator already whitelisted"),
		};
	}

	let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) else {
		return Err(type_mismatch(op, &lhs, &rhs));
	};
	match op {
		BinOp::Add => Ok(Value::Float(a + b)),
		BinOp::Sub => Ok(Value::Float(a - b)),
		BinOp::Mul => Ok(Value::Float(a * b)),
		BinOp::Div => {
			if b == 0.0 {
				Err(EvalError::evaluation("float division by zero"))
			} else {
				Ok(Value::Float(a / b))
			}
		}
		BinOp::FloorDiv => {
			if b == 0.0 {
				Err(EvalError::evaluation("float floor division by zero"))
			} else {
				Ok(Value::Float((a / b).floor()))
			}
		}
		BinOp::Mod => {
			if b == 0.0 {
				Err(EvalError::evaluation("float modulo by zero"))
			} else {
				Ok(Value::Float(a - b * (a / b).floor()))
			}
		}
		BinOp::Pow => Ok(Value::Float(a.powf(b))),
		_ => unreachable!("operator already whitelisted"),
	}
}

fn unary_op(op: UnaryOp, operand: Value) -> Result<Value, EvalError> {
	match op {
		UnaryOp::Not => Ok(Value::Bool(!operand.truthy())),
		UnaryOp::Pos => match operand {
			Value::Int(_) | Value::Float(_) => Ok(operand),
			Value::Bool(b) => Ok(Value::Int(i64::from(b))),
			other => Err(EvalError::evaluation(format!(
				"unary '+' not supported on {}",
				other.type_name()
			))),
		},
		UnaryOp::Neg => match operand {
			Value::Int(n) => n
				.checked_neg()
				.map(Value::Int)
				.ok_or_else(|| EvalError::evaluation("integer overflow in unary '-'")),
			Value::Float(f) => Ok(Value::Float(-f)),
			Value::Bool(b) => Ok(Value::Int(-i64::from(b))),
			other => Err(EvalError::evaluation(format!(
				"unary '-' not supported on {}",
				other.type_name()
			))),
		},
		UnaryOp::Invert => match as_int(&operand) {
			Some(n) => Ok(Value::Int(!n)),
			None => Err(EvalError::evaluation(format!(
				"unary '~' not supported on {}",
				operand.type_name()
			))),
		},
	}
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
	use std::cmp::Ordering;

	let ordering = |op: &'static str| -> Result<Ordering, EvalError> {
		lhs.partial_cmp(rhs).ok_or_else(|| {
			EvalError::evaluation(format!(
				"'{op}' not supported between {} and {}",
				lhs.type_name(),
				rhs.type_name()
			))
		})
	};

	match op {
		CmpOp::Eq => Ok(lhs == rhs),
		CmpOp::Ne => Ok(lhs != rhs),
		CmpOp::Lt => Ok(ordering("<")? == Ordering::Less),
		CmpOp::Le => Ok(ordering("<=")? != Ordering::Greater),
		CmpOp::Gt => Ok(ordering(">")? == Ordering::Greater),
		CmpOp::Ge => Ok(ordering(">=")? != Ordering::Less),
		// Strict same-type equality stands in for host identity.
		CmpOp::Is => Ok(std::mem::discriminant(lhs) == std::mem::discriminant(rhs) && lhs == rhs),
		CmpOp::IsNot => {
			Ok(!(std::mem::discriminant(lhs) == std::mem::discriminant(rhs) && lhs == rhs))
		}
		CmpOp::In => rhs.contains(lhs).ok_or_else(|| {
			EvalError::evaluation(format!(
				"'in' not supported between {} and {}",
				lhs.type_name(),
				rhs.type_name()
			))
		}),
		CmpOp::NotIn => rhs
			.contains(lhs)
			.map(|found| !found)
			.ok_or_else(|| {
				EvalError::evaluation(format!(
					"'not in' not supported between {} and {}",
					lhs.type_name(),
					rhs.type_name()
				))
			}),
	}
}
