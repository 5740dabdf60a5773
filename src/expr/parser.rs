use crate::error::EvalError;
use crate::expr::ast::{BinOp, CallArg, CmpOp, Expr, LogicOp, UnaryOp};
use crate::expr::token::{Token, tokenize};

// Binding powers, Python's ladder: or < and < not < comparisons < | < ^ < &
// < shifts < additive < multiplicative < unary < ** < postfix.
const BP_OR: (u8, u8) = (1, 2);
const BP_AND: (u8, u8) = (3, 4);
const BP_NOT: u8 = 6;
const BP_CMP: (u8, u8) = (7, 8);
const BP_UNARY: u8 = 21;
const BP_POW: (u8, u8) = (23, 22);
const BP_POSTFIX: u8 = 25;

/// Parse one expression. Trailing input is an error; a trailing `=` is
/// reported as rejected assignment syntax.
pub fn parse(input: &str) -> Result<Expr, EvalError> {
	let tokens = tokenize(input)?;
	let mut parser = Parser { tokens, pos: 0 };
	let expr = parser.expression(0)?;
	match parser.peek() {
		None => Ok(expr),
		Some(Token::Assign) => Err(unsupported("assignment")),
		Some(Token::Forbidden(kw)) => Err(unsupported(*kw)),
		Some(token) => Err(parse_error(format!(
			"unexpected input after expression: {token:?}"
		))),
	}
}

fn parse_error(message: impl Into<String>) -> EvalError {
	EvalError::Parse {
		message: message.into(),
	}
}

fn unsupported(construct: impl Into<String>) -> EvalError {
	EvalError::UnsupportedSyntax {
		construct: construct.into(),
	}
}

struct Parser {
	tokens: Vec<Token>,
	pos: usize,
}

impl Parser {
	fn peek(&self) -> Option<&Token> {
		self.tokens.get(self.pos)
	}

	fn peek2(&self) -> Option<&Token> {
		self.tokens.get(self.pos + 1)
	}

	fn advance(&mut self) -> Option<Token> {
		let token = self.tokens.get(self.pos).cloned();
		if token.is_some() {
			self.pos += 1;
		}
		token
	}

	fn expect(&mut self, expected: &Token, context: &str) -> Result<(), EvalError> {
		match self.advance() {
			Some(ref token) if token == expected => Ok(()),
			Some(token) => Err(parse_error(format!(
				"expected {expected:?} {context}, found {token:?}"
			))),
			None => Err(parse_error(format!(
				"expected {expected:?} {context}, found end of input"
			))),
		}
	}

	fn expression(&mut self, min_bp: u8) -> Result<Expr, EvalError> {
		let mut lhs = self.prefix()?;

		loop {
			let Some(token) = self.peek() else { break };

			// Postfix: call, subscript, attribute access.
			if BP_POSTFIX >= min_bp {
				match token {
					Token::LParen => {
						lhs = self.call(lhs)?;
						continue;
					}
					Token::LBracket => {
						self.pos += 1;
						let index = self.expression(0)?;
						self.expect(&Token::RBracket, "to close subscript")?;
						lhs = Expr::Index {
							value: Box::new(lhs),
							index: Box::new(index),
						};
						continue;
					}
					Token::Dot => {
						self.pos += 1;
						let attr = match self.advance() {
							Some(Token::Name(name)) => name,
							other => {
								return Err(parse_error(format!(
									"expected attribute name after '.', found {other:?}"
								)));
							}
						};
						lhs = Expr::Attribute {
							value: Box::new(lhs),
							attr,
						};
						continue;
					}
					_ => {}
				}
			}

			// Chained comparison collects into a single node.
			if let Some((op, width)) = self.peek_comparison() {
				if BP_CMP.0 < min_bp {
					break;
				}
				self.pos += width;
				let mut rest = vec![(op, self.expression(BP_CMP.1)?)];
				while let Some((op, width)) = self.peek_comparison() {
					self.pos += width;
					rest.push((op, self.expression(BP_CMP.1)?));
				}
				lhs = Expr::Compare {
					first: Box::new(lhs),
					rest,
				};
				continue;
			}

			// Boolean combinators flatten chains into one node.
			if let Some((logic, bp)) = match token {
				Token::Or => Some((LogicOp::Or, BP_OR)),
				Token::And => Some((LogicOp::And, BP_AND)),
				_ => None,
			} {
				if bp.0 < min_bp {
					break;
				}
				self.pos += 1;
				let rhs = self.expression(bp.1)?;
				lhs = match lhs {
					Expr::Logical { op, mut operands } if op == logic => {
						operands.push(rhs);
						Expr::Logical { op, operands }
					}
					other => Expr::Logical {
						op: logic,
						operands: vec![other, rhs],
					},
				};
				continue;
			}

			let Some((op, bp)) = binary_binding(token) else {
				break;
			};
			if bp.0 < min_bp {
				break;
			}
			self.pos += 1;
			let rhs = self.expression(bp.1)?;
			lhs = Expr::Binary {
				op,
				left: Box::new(lhs),
				right: Box::new(rhs),
			};
		}

		Ok(lhs)
	}

	fn prefix(&mut self) -> Result<Expr, EvalError> {
		match self.advance() {
			Some(Token::Int(n)) => Ok(Expr::Int(n)),
			Some(Token::Float(f)) => Ok(Expr::Float(f)),
			Some(Token::Str(s)) => Ok(Expr::Str(s)),
			Some(Token::True) => Ok(Expr::Bool(true)),
			Some(Token::False) => Ok(Expr::Bool(false)),
			Some(Token::Name(name)) => Ok(Expr::Name(name)),
			Some(Token::Not) => Ok(Expr::Unary {
				op: UnaryOp::Not,
				operand: Box::new(self.expression(BP_NOT)?),
			}),
			Some(Token::Plus) => Ok(Expr::Unary {
				op: UnaryOp::Pos,
				operand: Box::new(self.expression(BP_UNARY)?),
			}),
			Some(Token::Minus) => Ok(Expr::Unary {
				op: UnaryOp::Neg,
				operand: Box::new(self.expression(BP_UNARY)?),
			}),
			Some(Token::Tilde) => Ok(Expr::Unary {
				op: UnaryOp::Invert,
				operand: Box::new(self.expression(BP_UNARY)?),
			}),
			Some(Token::LParen) => self.group_or_tuple(),
			Some(Token::LBracket) => self.list(),
			Some(Token::LBrace) => self.set_or_map(),
			Some(Token::Forbidden(kw)) => Err(unsupported(kw)),
			Some(token) => Err(parse_error(format!("unexpected token {token:?}"))),
			None => Err(parse_error("empty expression")),
		}
	}

	/// `(a)` is grouping; `()`, `(a,)` and `(a, b)` are tuples.
	fn group_or_tuple(&mut self) -> Result<Expr, EvalError> {
		if self.peek() == Some(&Token::RParen) {
			self.pos += 1;
			return Ok(Expr::Tuple(Vec::new()));
		}
		let first = self.expression(0)?;
		if self.peek() != Some(&Token::Comma) {
			self.expect(&Token::RParen, "to close parenthesized expression")?;
			return Ok(first);
		}
		let mut items = vec![first];
		while self.peek() == Some(&Token::Comma) {
			self.pos += 1;
			if self.peek() == Some(&Token::RParen) {
				break;
			}
			items.push(self.expression(0)?);
		}
		self.expect(&Token::RParen, "to close tuple literal")?;
		Ok(Expr::Tuple(items))
	}

	fn list(&mut self) -> Result<Expr, EvalError> {
		let mut items = Vec::new();
		if self.peek() == Some(&Token::RBracket) {
			self.pos += 1;
			return Ok(Expr::List(items));
		}
		items.push(self.expression(0)?);
		while self.peek() == Some(&Token::Comma) {
			self.pos += 1;
			if self.peek() == Some(&Token::RBracket) {
				break;
			}
			items.push(self.expression(0)?);
		}
		self.expect(&Token::RBracket, "to close list literal")?;
		Ok(Expr::List(items))
	}

	/// `{}` is an empty mapping; `{a}` a set; `{a: b}` a mapping.
	fn set_or_map(&mut self) -> Result<Expr, EvalError> {
		if self.peek() == Some(&Token::RBrace) {
			self.pos += 1;
			return Ok(Expr::Map(Vec::new()));
		}
		let first = self.expression(0)?;
		if self.peek() == Some(&Token::Colon) {
			self.pos += 1;
			let value = self.expression(0)?;
			let mut entries = vec![(first, value)];
			while self.peek() == Some(&Token::Comma) {
				self.pos += 1;
				if self.peek() == Some(&Token::RBrace) {
					break;
				}
				let key = self.expression(0)?;
				self.expect(&Token::Colon, "between mapping key and value")?;
				entries.push((key, self.expression(0)?));
			}
			self.expect(&Token::RBrace, "to close mapping literal")?;
			return Ok(Expr::Map(entries));
		}
		let mut items = vec![first];
		while self.peek() == Some(&Token::Comma) {
			self.pos += 1;
			if self.peek() == Some(&Token::RBrace) {
				break;
			}
			items.push(self.expression(0)?);
		}
		self.expect(&Token::RBrace, "to close set literal")?;
		Ok(Expr::Set(items))
	}

	fn call(&mut self, target: Expr) -> Result<Expr, EvalError> {
		self.expect(&Token::LParen, "to open call arguments")?;
		let mut args = Vec::new();
		if self.peek() == Some(&Token::RParen) {
			self.pos += 1;
			return Ok(Expr::Call {
				target: Box::new(target),
				args,
			});
		}
		loop {
			let arg = match self.peek() {
				Some(Token::Star) => {
					self.pos += 1;
					CallArg::Star(self.expression(0)?)
				}
				Some(Token::DoubleStar) => {
					self.pos += 1;
					CallArg::DoubleStar(self.expression(0)?)
				}
				Some(Token::Name(name)) if self.peek2() == Some(&Token::Assign) => {
					let name = name.clone();
					self.pos += 2;
					CallArg::Keyword(name, self.expression(0)?)
				}
				_ => CallArg::Positional(self.expression(0)?),
			};
			args.push(arg);
			if self.peek() == Some(&Token::Comma) {
				self.pos += 1;
				if self.peek() == Some(&Token::RParen) {
					break;
				}
				continue;
			}
			break;
		}
		self.expect(&Token::RParen, "to close call arguments")?;
		Ok(Expr::Call {
			target: Box::new(target),
			args,
		})
	}

	fn peek_comparison(&self) -> Option<(CmpOp, usize)> {
		match self.peek()? {
			Token::Eq => Some((CmpOp::Eq, 1)),
			Token::Ne => Some((CmpOp::Ne, 1)),
			Token::Lt => Some((CmpOp::Lt, 1)),
			Token::Le => Some((CmpOp::Le, 1)),
			Token::Gt => Some((CmpOp::Gt, 1)),
			Token::Ge => Some((CmpOp::Ge, 1)),
			Token::In => Some((CmpOp::In, 1)),
			Token::Is => match self.peek2() {
				Some(Token::Not) => Some((CmpOp::IsNot, 2)),
				_ => Some((CmpOp::Is, 1)),
			},
			Token::Not => match self.peek2() {
				Some(Token::In) => Some((CmpOp::NotIn, 2)),
				_ => None,
			},
			_ => None,
		}
	}
}

fn binary_binding(token: &Token) -> Option<(BinOp, (u8, u8))> {
	Some(match token {
		Token::Pipe => (BinOp::BitOr, (9, 10)),
		Token::Caret => (BinOp::BitXor, (11, 12)),
		Token::Amp => (BinOp::BitAnd, (13, 14)),
		Token::Shl => (BinOp::Shl, (15, 16)),
		Token::Shr => (BinOp::Shr, (15, 16)),
		Token::Plus => (BinOp::Add, (17, 18)),
		Token::Minus => (BinOp::Sub, (17, 18)),
		Token::Star => (BinOp::Mul, (19, 20)),
		Token::Slash => (BinOp::Div, (19, 20)),
		Token::DoubleSlash => (BinOp::FloorDiv, (19, 20)),
		Token::Percent => (BinOp::Mod, (19, 20)),
		Token::At => (BinOp::MatMul, (19, 20)),
		Token::DoubleStar => (BinOp::Pow, BP_POW),
		_ => return None,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
		Expr::Binary {
			op,
			left: Box::new(left),
			right: Box::new(right),
		}
	}

	#[test]
	fn test_precedence() {
		// 1 + 2 * 3 parses as 1 + (2 * 3).
		assert_eq!(
			parse("1 + 2 * 3").unwrap(),
			binary(
				BinOp::Add,
				Expr::Int(1),
				binary(BinOp::Mul, Expr::Int(2), Expr::Int(3)),
			)
		);
		// Parentheses override.
		assert_eq!(
			parse("(1 + 2) * 3").unwrap(),
			binary(
				BinOp::Mul,
				binary(BinOp::Add, Expr::Int(1), Expr::Int(2)),
				Expr::Int(3),
			)
		);
	}

	#[test]
	fn test_power_is_right_associative() {
		assert_eq!(
			parse("2 ** 3 ** 2").unwrap(),
			binary(
				BinOp::Pow,
				Expr::Int(2),
				binary(BinOp::Pow, Expr::Int(3), Expr::Int(2)),
			)
		);
	}

	#[test]
	fn test_unary_binds_looser_than_power() {
		// -2 ** 2 is -(2 ** 2).
		assert_eq!(
			parse("-2 ** 2").unwrap(),
			Expr::Unary {
				op: UnaryOp::Neg,
				operand: Box::new(binary(BinOp::Pow, Expr::Int(2), Expr::Int(2))),
			}
		);
	}

	#[test]
	fn test_boolean_chains_flatten() {
		assert_eq!(
			parse("a and b and c").unwrap(),
			Expr::Logical {
				op: LogicOp::And,
				operands: vec![
					Expr::Name("a".into()),
					Expr::Name("b".into()),
					Expr::Name("c".into()),
				],
			}
		);
	}

	#[test]
	fn test_comparison_chain_is_one_node() {
		assert_eq!(
			parse("1 < 2 <= 3").unwrap(),
			Expr::Compare {
				first: Box::new(Expr::Int(1)),
				rest: vec![(CmpOp::Lt, Expr::Int(2)), (CmpOp::Le, Expr::Int(3))],
			}
		);
	}

	#[test]
	fn test_word_comparisons() {
		assert_eq!(
			parse("a is not b").unwrap(),
			Expr::Compare {
				first: Box::new(Expr::Name("a".into())),
				rest: vec![(CmpOp::IsNot, Expr::Name("b".into()))],
			}
		);
		assert_eq!(
			parse("a not in b").unwrap(),
			Expr::Compare {
				first: Box::new(Expr::Name("a".into())),
				rest: vec![(CmpOp::NotIn, Expr::Name("b".into()))],
			}
		);
	}

	#[test]
	fn test_not_binds_looser_than_comparison() {
		assert_eq!(
			parse("not 1 == 2").unwrap(),
			Expr::Unary {
				op: UnaryOp::Not,
				operand: Box::new(Expr::Compare {
					first: Box::new(Expr::Int(1)),
					rest: vec![(CmpOp::Eq, Expr::Int(2))],
				}),
			}
		);
	}

	#[test]
	fn test_tuple_vs_grouping() {
		assert_eq!(parse("(1)").unwrap(), Expr::Int(1));
		assert_eq!(parse("(1,)").unwrap(), Expr::Tuple(vec![Expr::Int(1)]));
		assert_eq!(parse("()").unwrap(), Expr::Tuple(vec![]));
		assert_eq!(
			parse("(1, 2)").unwrap(),
			Expr::Tuple(vec![Expr::Int(1), Expr::Int(2)])
		);
	}

	#[test]
	fn test_collections() {
		assert_eq!(
			parse("[1, 2,]").unwrap(),
			Expr::List(vec![Expr::Int(1), Expr::Int(2)])
		);
		assert_eq!(parse("{}").unwrap(), Expr::Map(vec![]));
		assert_eq!(parse("{1, 2}").unwrap(), Expr::Set(vec![Expr::Int(1), Expr::Int(2)]));
		assert_eq!(
			parse("{'a': 1}").unwrap(),
			Expr::Map(vec![(Expr::Str("a".into()), Expr::Int(1))])
		);
	}

	#[test]
	fn test_call_arguments() {
		assert_eq!(
			parse("f(1, x = 2)").unwrap(),
			Expr::Call {
				target: Box::new(Expr::Name("f".into())),
				args: vec![
					CallArg::Positional(Expr::Int(1)),
					CallArg::Keyword("x".into(), Expr::Int(2)),
				],
			}
		);
		assert_eq!(
			parse("f(*a, **b)").unwrap(),
			Expr::Call {
				target: Box::new(Expr::Name("f".into())),
				args: vec![
					CallArg::Star(Expr::Name("a".into())),
					CallArg::DoubleStar(Expr::Name("b".into())),
				],
			}
		);
	}

	#[test]
	fn test_postfix_forms_parse() {
		assert_eq!(
			parse("a.b").unwrap(),
			Expr::Attribute {
				value: Box::new(Expr::Name("a".into())),
				attr: "b".into(),
			}
		);
		assert_eq!(
			parse("a[0]").unwrap(),
			Expr::Index {
				value: Box::new(Expr::Name("a".into())),
				index: Box::new(Expr::Int(0)),
			}
		);
	}

	#[test]
	fn test_rejected_forms() {
		assert!(matches!(
			parse("lambda x: x"),
			Err(EvalError::UnsupportedSyntax { construct }) if construct == "lambda"
		));
		assert!(matches!(
			parse("x = 5"),
			Err(EvalError::UnsupportedSyntax { construct }) if construct == "assignment"
		));
		assert!(matches!(
			parse("1 if x else 2"),
			Err(EvalError::UnsupportedSyntax { construct }) if construct == "if"
		));
	}

	#[test]
	fn test_trailing_input_is_an_error() {
		assert!(matches!(parse("1 2"), Err(EvalError::Parse { .. })));
		assert!(matches!(parse(""), Err(EvalError::Parse { .. })));
		assert!(matches!(parse("a not b"), Err(EvalError::Parse { .. })));
	}
}
