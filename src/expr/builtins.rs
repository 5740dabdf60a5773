//! Default constant and function registries.
//!
//! Installed by [`Evaluator::new`]; an [`Evaluator::empty`] starts without
//! them. Registered names can be shadowed by re-registering.

use crate::error::EvalError;
use crate::expr::eval::Evaluator;
use crate::value::Value;

/// Install the default registries into an evaluator.
pub fn install(evaluator: &mut Evaluator) {
	evaluator.register_constant("pi", Value::Float(std::f64::consts::PI));
	evaluator.register_constant("Pi", Value::Float(std::f64::consts::PI));
	evaluator.register_constant("PI", Value::Float(std::f64::consts::PI));
	evaluator.register_constant("e", Value::Float(std::f64::consts::E));
	evaluator.register_constant("E", Value::Float(std::f64::consts::E));

	evaluator.register_function("sin", |args, kwargs| {
		Ok(Value::Float(unary_float("sin", args, kwargs)?.sin()))
	});
	evaluator.register_function("cos", |args, kwargs| {
		Ok(Value::Float(unary_float("cos", args, kwargs)?.cos()))
	});
	evaluator.register_function("tan", |args, kwargs| {
		Ok(Value::Float(unary_float("tan", args, kwargs)?.tan()))
	});
	evaluator.register_function("exp", |args, kwargs| {
		Ok(Value::Float(unary_float("exp", args, kwargs)?.exp()))
	});
	evaluator.register_function("sqrt", |args, kwargs| sqrt("sqrt", args, kwargs));
	evaluator.register_function("root", |args, kwargs| sqrt("root", args, kwargs));
	evaluator.register_function("sum", sum);
	evaluator.register_function("int", to_int);
	evaluator.register_function("float", to_float);
	evaluator.register_function("bool", to_bool);
	evaluator.register_function("str", to_str);
}

fn no_kwargs(name: &str, kwargs: &[(String, Value)]) -> Result<(), EvalError> {
	match kwargs.first() {
		Some((kw, _)) => Err(EvalError::evaluation(format!(
			"{name}() got an unexpected keyword argument {kw:?}"
		))),
		None => Ok(()),
	}
}

fn unary_float(
	name: &str,
	args: &[Value],
	kwargs: &[(String, Value)],
) -> Result<f64, EvalError> {
	no_kwargs(name, kwargs)?;
	match args {
		[value] => value.as_number().ok_or_else(|| {
			EvalError::evaluation(format!(
				"{name}() expects a number, got {}",
				value.type_name()
			))
		}),
		_ => Err(EvalError::evaluation(format!(
			"{name}() takes exactly one argument, got {}",
			args.len()
		))),
	}
}

fn sqrt(name: &str, args: &[Value], kwargs: &[(String, Value)]) -> Result<Value, EvalError> {
	let operand = unary_float(name, args, kwargs)?;
	if operand < 0.0 {
		return Err(EvalError::evaluation(format!(
			"{name}() of a negative number"
		)));
	}
	Ok(Value::Float(operand.sqrt()))
}

/// Sum an iterable, with an optional start value (positional or `start=`).
/// Integer sums stay integral until a float joins in.
fn sum(args: &[Value], kwargs: &[(String, Value)]) -> Result<Value, EvalError> {
	for (kw, _) in kwargs {
		if kw != "start" {
			return Err(EvalError::evaluation(format!(
				"sum() got an unexpected keyword argument {kw:?}"
			)));
		}
	}

	let items: Vec<Value> = match args.first() {
		Some(Value::List(items)) | Some(Value::Set(items)) => items.clone(),
		Some(Value::Sequence(seq)) => seq.drain(),
		Some(other) => {
			return Err(EvalError::evaluation(format!(
				"sum() expects an iterable, got {}",
				other.type_name()
			)));
		}
		None => return Err(EvalError::evaluation("sum() takes at least one argument")),
	};

	let start = args
		.get(1)
		.or_else(|| {
			kwargs
				.iter()
				.find(|(kw, _)| kw == "start")
				.map(|(_, value)| value)
		})
		.cloned()
		.unwrap_or(Value::Int(0));

	let mut total = start;
	for item in items {
		total = add_numbers(total, item)?;
	}
	Ok(total)
}

fn add_numbers(acc: Value, item: Value) -> Result<Value, EvalError> {
	match (&acc, &item) {
		(Value::Int(a), Value::Int(b)) => a
			.checked_add(*b)
			.map(Value::Int)
			.ok_or_else(|| EvalError::evaluation("integer overflow in sum()")),
		_ => match (acc.as_number(), item.as_number()) {
			(Some(a), Some(b)) => Ok(Value::Float(a + b)),
			_ => Err(EvalError::evaluation(format!(
				"sum() cannot add {}",
				item.type_name()
			))),
		},
	}
}

fn to_int(args: &[Value], kwargs: &[(String, Value)]) -> Result<Value, EvalError> {
	no_kwargs("int", kwargs)?;
	match args {
		[] => Ok(Value::Int(0)),
		[Value::Int(n)] => Ok(Value::Int(*n)),
		[Value::Float(f)] => Ok(Value::Int(f.trunc() as i64)),
		[Value::Bool(b)] => Ok(Value::Int(i64::from(*b))),
		[Value::Str(s)] => s
			.trim()
			.parse::<i64>()
			.map(Value::Int)
			.map_err(|_| EvalError::evaluation(format!("invalid int literal {s:?}"))),
		[other] => Err(EvalError::evaluation(format!(
			"int() cannot convert {}",
			other.type_name()
		))),
		_ => Err(EvalError::evaluation("int() takes at most one argument")),
	}
}

fn to_float(args: &[Value], kwargs: &[(String, Value)]) -> Result<Value, EvalError> {
	no_kwargs("float", kwargs)?;
	match args {
		[] => Ok(Value::Float(0.0)),
		[Value::Str(s)] => s
			.trim()
			.parse::<f64>()
			.map(Value::Float)
			.map_err(|_| EvalError::evaluation(format!("invalid float literal {s:?}"))),
		[value] => value.as_number().map(Value::Float).ok_or_else(|| {
			EvalError::evaluation(format!("float() cannot convert {}", value.type_name()))
		}),
		_ => Err(EvalError::evaluation("float() takes at most one argument")),
	}
}

fn to_bool(args: &[Value], kwargs: &[(String, Value)]) -> Result<Value, EvalError> {
	no_kwargs("bool", kwargs)?;
	match args {
		[] => Ok(Value::Bool(false)),
		[value] => Ok(Value::Bool(value.truthy())),
		_ => Err(EvalError::evaluation("bool() takes at most one argument")),
	}
}

fn to_str(args: &[Value], kwargs: &[(String, Value)]) -> Result<Value, EvalError> {
	no_kwargs("str", kwargs)?;
	match args {
		[] => Ok(Value::Str(String::new())),
		[value] => Ok(Value::Str(value.to_string())),
		_ => Err(EvalError::evaluation("str() takes at most one argument")),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn eval(text: &str) -> Result<Value, EvalError> {
		Evaluator::new().evaluate(text)
	}

	#[test]
	fn test_default_constants() {
		assert_eq!(eval("pi").unwrap(), Value::Float(std::f64::consts::PI));
		assert_eq!(eval("PI").unwrap(), eval("Pi").unwrap());
		assert_eq!(eval("E").unwrap(), Value::Float(std::f64::consts::E));
	}

	#[test]
	fn test_trigonometry() {
		assert_eq!(eval("sin(0)").unwrap(), Value::Float(0.0));
		assert_eq!(eval("cos(0)").unwrap(), Value::Float(1.0));
		let Value::Float(almost_one) = eval("sin(pi / 2)").unwrap() else {
			panic!("expected a float");
		};
		assert!((almost_one - 1.0).abs() < 1e-12);
	}

	#[test]
	fn test_sqrt_and_alias() {
		assert_eq!(eval("sqrt(9)").unwrap(), Value::Float(3.0));
		assert_eq!(eval("root(9)").unwrap(), Value::Float(3.0));
		assert!(matches!(eval("sqrt(-1)"), Err(EvalError::Evaluation { .. })));
	}

	#[test]
	fn test_exp() {
		assert_eq!(eval("exp(0)").unwrap(), Value::Float(1.0));
	}

	#[test]
	fn test_sum() {
		assert_eq!(eval("sum([1, 2, 3])").unwrap(), Value::Int(6));
		assert_eq!(eval("sum([1, 2], 10)").unwrap(), Value::Int(13));
		assert_eq!(eval("sum([1, 2], start = 10)").unwrap(), Value::Int(13));
		assert_eq!(eval("sum([1.5, 2])").unwrap(), Value::Float(3.5));
		// Summing a tuple consumes the sequence.
		assert_eq!(eval("sum((1, 2, 3))").unwrap(), Value::Int(6));
		assert!(matches!(eval("sum(1)"), Err(EvalError::Evaluation { .. })));
	}

	#[test]
	fn test_coercions() {
		assert_eq!(eval("int(3.9)").unwrap(), Value::Int(3));
		assert_eq!(eval("int('  42 ')").unwrap(), Value::Int(42));
		assert_eq!(eval("int(True)").unwrap(), Value::Int(1));
		assert_eq!(eval("float('2.5')").unwrap(), Value::Float(2.5));
		assert_eq!(eval("float(3)").unwrap(), Value::Float(3.0));
		assert_eq!(eval("bool([])").unwrap(), Value::Bool(false));
		assert_eq!(eval("bool('x')").unwrap(), Value::Bool(true));
		assert_eq!(eval("str(2.5)").unwrap(), Value::Str("2.5".into()));
		assert_eq!(eval("str(True)").unwrap(), Value::Str("True".into()));
		assert!(matches!(eval("int('3.5')"), Err(EvalError::Evaluation { .. })));
	}

	#[test]
	fn test_zero_argument_coercions() {
		assert_eq!(eval("int()").unwrap(), Value::Int(0));
		assert_eq!(eval("float()").unwrap(), Value::Float(0.0));
		assert_eq!(eval("bool()").unwrap(), Value::Bool(false));
		assert_eq!(eval("str()").unwrap(), Value::Str(String::new()));
	}

	#[test]
	fn test_unexpected_keyword_is_rejected() {
		assert!(matches!(
			eval("sin(0, x = 1)"),
			Err(EvalError::Evaluation { .. })
		));
		assert!(matches!(
			eval("sum([1], x = 1)"),
			Err(EvalError::Evaluation { .. })
		));
	}
}
