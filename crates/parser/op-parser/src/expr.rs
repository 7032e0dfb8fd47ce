//! Untyped expressions and the precedence-climbing expression parser

use crate::support::{Require, expect, expect_identifier, next_is};
use op_lexer::{Newlines, TokenStream};
use op_syntax::{Diagnostic, FileLocation, Labeled, Located, TokenKind};

/// Binary operators, grouped by precedence
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    ShiftLeft,
    ShiftRight,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOperator {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Self::Add),
            "-" => Some(Self::Subtract),
            "*" => Some(Self::Multiply),
            "/" => Some(Self::Divide),
            "<<" => Some(Self::ShiftLeft),
            ">>" => Some(Self::ShiftRight),
            "&" => Some(Self::BitAnd),
            "|" => Some(Self::BitOr),
            "^" => Some(Self::BitXor),
            _ => None,
        }
    }

    /// Multiplicative operators bind tighter than additive/shift ones
    pub fn precedence(self) -> u8 {
        match self {
            Self::Multiply | Self::Divide => 2,
            _ => 1,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
        }
    }
}

/// Unary prefix operators
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UnaryOperator {
    /// Arithmetic negation (`-`)
    Negate,
    /// Bitwise negation (`~`)
    BitNot,
}

/// A call before resolution: free function (`target` absent) or
/// method/static call on a target expression
#[derive(Clone, Debug, PartialEq)]
pub struct UnresolvedCall {
    pub target: Option<Box<UnresolvedExpression>>,
    pub name: Located<String>,
    pub arguments: Vec<Labeled<UnresolvedExpression>>,
}

/// An expression before name and type binding
#[derive(Clone, Debug, PartialEq)]
pub enum UnresolvedExpression {
    Boolean(bool, FileLocation),
    Integer(i64, FileLocation),
    Real(f64, FileLocation),
    Bitfield(u64, FileLocation),
    Identifier(String, FileLocation),
    /// Raw name→value pairs; field binding is deferred until a
    /// contextual declared type is known
    StructureLiteral {
        fields: Vec<(Located<String>, UnresolvedExpression)>,
        location: FileLocation,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<UnresolvedExpression>,
        location: FileLocation,
    },
    Binary {
        left: Box<UnresolvedExpression>,
        operator: BinaryOperator,
        right: Box<UnresolvedExpression>,
    },
    Member {
        target: Box<UnresolvedExpression>,
        member: Located<String>,
    },
    Call(UnresolvedCall),
}

impl UnresolvedExpression {
    /// The location reported for diagnostics about this node
    pub fn location(&self) -> FileLocation {
        match self {
            Self::Boolean(_, location)
            | Self::Integer(_, location)
            | Self::Real(_, location)
            | Self::Bitfield(_, location)
            | Self::Identifier(_, location)
            | Self::StructureLiteral { location, .. }
            | Self::Unary { location, .. } => *location,
            Self::Binary { left, .. } => left.location(),
            Self::Member { member, .. } => member.location,
            Self::Call(call) => call.name.location,
        }
    }

    /// Parse a full expression, folding infix operators
    pub fn parse(stream: &mut TokenStream) -> Result<Self, Diagnostic> {
        Self::parse_with_precedence(stream, 0)
    }

    fn parse_with_precedence(stream: &mut TokenStream, min_precedence: u8) -> Result<Self, Diagnostic> {
        let mut left = Self::parse_prefix(stream)?;

        while let Some(token) = stream.peek_with(Newlines::Keep) {
            let Some(operator) = BinaryOperator::from_symbol(&token.value) else {
                break;
            };
            if operator.precedence() < min_precedence {
                break;
            }
            stream.next();
            let right = Self::parse_with_precedence(stream, operator.precedence() + 1)?;
            left = Self::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_prefix(stream: &mut TokenStream) -> Result<Self, Diagnostic> {
        let token = stream.peek().required()?;

        let expression = match token.value.as_str() {
            "true" => {
                stream.next();
                Self::Boolean(true, token.location)
            }
            "false" => {
                stream.next();
                Self::Boolean(false, token.location)
            }
            "self" => {
                stream.next();
                Self::Identifier("self".into(), token.location)
            }
            "(" => {
                stream.next();
                let inner = Self::parse(stream)?;
                expect(stream, ")")?;
                inner
            }
            "~" => {
                stream.next();
                Self::Unary {
                    operator: UnaryOperator::BitNot,
                    operand: Box::new(Self::parse_prefix(stream)?),
                    location: token.location,
                }
            }
            "-" => {
                stream.next();
                Self::Unary {
                    operator: UnaryOperator::Negate,
                    operand: Box::new(Self::parse_prefix(stream)?),
                    location: token.location,
                }
            }
            "{" => Self::parse_structure_literal(stream)?,
            _ if token.kind == TokenKind::Decimal => {
                stream.next();
                parse_decimal(&token)?
            }
            _ if token.kind == TokenKind::Binary => {
                stream.next();
                parse_binary_literal(&token)?
            }
            _ if token.kind == TokenKind::Identifier => {
                stream.next();
                if next_is_inline(stream, "(") {
                    let arguments = parse_arguments(stream)?;
                    Self::Call(UnresolvedCall {
                        target: None,
                        name: Located::new(token.value.clone(), token.location),
                        arguments,
                    })
                } else {
                    Self::Identifier(token.value.clone(), token.location)
                }
            }
            _ => return Err(Diagnostic::InvalidToken { token }),
        };

        Self::parse_postfix(stream, expression)
    }

    /// Fold `.name` lookups and `.name(args)` calls left-to-right
    fn parse_postfix(stream: &mut TokenStream, mut expression: Self) -> Result<Self, Diagnostic> {
        while next_is(stream, ".") {
            stream.next();
            let member = expect_identifier(stream)?;
            let member = Located::new(member.value, member.location);
            if next_is_inline(stream, "(") {
                let arguments = parse_arguments(stream)?;
                expression = Self::Call(UnresolvedCall {
                    target: Some(Box::new(expression)),
                    name: member,
                    arguments,
                });
            } else {
                expression = Self::Member {
                    target: Box::new(expression),
                    member,
                };
            }
        }
        Ok(expression)
    }

    fn parse_structure_literal(stream: &mut TokenStream) -> Result<Self, Diagnostic> {
        let opening = expect(stream, "{")?;
        let mut fields = Vec::new();
        while !next_is(stream, "}") {
            let name = expect_identifier(stream)?;
            expect(stream, ":")?;
            let value = Self::parse(stream)?;
            fields.push((Located::new(name.value, name.location), value));

            if next_is(stream, ",") {
                stream.next();
            } else if next_is(stream, "}") {
                break;
            } else {
                stream
                    .next_with(Newlines::Keep)
                    .requiring(|token| token.is("\n"))?;
            }
        }
        expect(stream, "}")?;
        Ok(Self::StructureLiteral {
            fields,
            location: opening.location,
        })
    }
}

/// Parse a parenthesized, comma-separated argument list with optional labels
pub(crate) fn parse_arguments(
    stream: &mut TokenStream,
) -> Result<Vec<Labeled<UnresolvedExpression>>, Diagnostic> {
    expect(stream, "(")?;
    let mut arguments = Vec::new();
    if !next_is(stream, ")") {
        loop {
            let label = argument_label(stream);
            let value = UnresolvedExpression::parse(stream)?;
            arguments.push(Labeled { label, value });
            if next_is(stream, ",") {
                stream.next();
            } else {
                break;
            }
        }
    }
    expect(stream, ")")?;
    Ok(arguments)
}

/// True if the next token on the same line has the given text
fn next_is_inline(stream: &TokenStream, text: &str) -> bool {
    stream
        .peek_with(Newlines::Keep)
        .is_some_and(|token| token.is(text))
}

/// Consume `label:` if the next two tokens spell one
fn argument_label(stream: &mut TokenStream) -> Option<String> {
    let mut ahead = stream.clone();
    let first = ahead.next()?;
    let second = ahead.next()?;
    if first.kind == TokenKind::Identifier && second.is(":") {
        stream.next();
        stream.next();
        Some(first.value)
    } else {
        None
    }
}

fn parse_decimal(token: &op_syntax::Token) -> Result<UnresolvedExpression, Diagnostic> {
    let cleaned = token.value.replace('_', "");
    if let Ok(integer) = cleaned.parse::<i64>() {
        Ok(UnresolvedExpression::Integer(integer, token.location))
    } else if let Ok(real) = cleaned.parse::<f64>() {
        Ok(UnresolvedExpression::Real(real, token.location))
    } else {
        Err(Diagnostic::InvalidToken {
            token: token.clone(),
        })
    }
}

fn parse_binary_literal(token: &op_syntax::Token) -> Result<UnresolvedExpression, Diagnostic> {
    let (digits, radix) = if let Some(hex) = token.value.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(bin) = token.value.strip_prefix("0b") {
        (bin, 2)
    } else {
        return Err(Diagnostic::InvalidToken {
            token: token.clone(),
        });
    };
    u64::from_str_radix(&digits.replace('_', ""), radix)
        .map(|bits| UnresolvedExpression::Bitfield(bits, token.location))
        .map_err(|_| Diagnostic::InvalidToken {
            token: token.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> UnresolvedExpression {
        let mut stream = TokenStream::new(source);
        UnresolvedExpression::parse(&mut stream).expect(source)
    }

    #[test]
    fn grouping_separators_do_not_change_values() {
        assert!(matches!(parse("1_2_3"), UnresolvedExpression::Integer(123, _)));
        assert!(
            matches!(parse("1_2.3"), UnresolvedExpression::Real(real, _) if (real - 12.3).abs() < f64::EPSILON)
        );
        assert!(matches!(parse("0x1_2_3"), UnresolvedExpression::Bitfield(0x123, _)));
        assert!(matches!(parse("0b1_1_0"), UnresolvedExpression::Bitfield(0b110, _)));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let UnresolvedExpression::Binary { left, operator, right } = parse("1 + 2 * 3") else {
            panic!("expected binary expression");
        };
        assert_eq!(operator, BinaryOperator::Add);
        assert!(matches!(*left, UnresolvedExpression::Integer(1, _)));
        let UnresolvedExpression::Binary { operator: inner, .. } = *right else {
            panic!("expected right operand to be a product");
        };
        assert_eq!(inner, BinaryOperator::Multiply);
    }

    #[test]
    fn equal_precedence_folds_left() {
        // 1 + 2 - 3 parses as (1 + 2) - 3
        let UnresolvedExpression::Binary { left, operator, right } = parse("1 + 2 - 3") else {
            panic!("expected binary expression");
        };
        assert_eq!(operator, BinaryOperator::Subtract);
        assert!(matches!(*right, UnresolvedExpression::Integer(3, _)));
        let UnresolvedExpression::Binary { operator: inner, .. } = *left else {
            panic!("expected left operand to be a sum");
        };
        assert_eq!(inner, BinaryOperator::Add);
    }

    #[test]
    fn parentheses_override_precedence() {
        let UnresolvedExpression::Binary { left, operator, .. } = parse("(1 + 2) * 3") else {
            panic!("expected binary expression");
        };
        assert_eq!(operator, BinaryOperator::Multiply);
        assert!(matches!(*left, UnresolvedExpression::Binary { .. }));
    }

    #[test]
    fn shift_shares_additive_precedence() {
        let UnresolvedExpression::Binary { operator, .. } = parse("1 << 2 + 3") else {
            panic!("expected binary expression");
        };
        // (1 << 2) + 3: left associative at equal precedence
        assert_eq!(operator, BinaryOperator::Add);
    }

    #[test]
    fn unary_bitwise_negation() {
        let UnresolvedExpression::Unary { operator, operand, .. } = parse("~0b1010") else {
            panic!("expected unary expression");
        };
        assert_eq!(operator, UnaryOperator::BitNot);
        assert!(matches!(*operand, UnresolvedExpression::Bitfield(0b1010, _)));
    }

    #[test]
    fn member_chain_nests_left_to_right() {
        let UnresolvedExpression::Member { target, member } = parse("x.innie.value") else {
            panic!("expected member lookup");
        };
        assert_eq!(member.value, "value");
        let UnresolvedExpression::Member { target: root, member: inner } = *target else {
            panic!("expected nested member lookup");
        };
        assert_eq!(inner.value, "innie");
        assert!(matches!(*root, UnresolvedExpression::Identifier(name, _) if name == "x"));
    }

    #[test]
    fn member_binds_tighter_than_operators() {
        let UnresolvedExpression::Binary { left, .. } = parse("a.b + c") else {
            panic!("expected binary expression");
        };
        assert!(matches!(*left, UnresolvedExpression::Member { .. }));
    }

    #[test]
    fn method_call_with_labels() {
        let UnresolvedExpression::Call(call) = parse("point.moved(dx: 1, 2)") else {
            panic!("expected call");
        };
        assert_eq!(call.name.value, "moved");
        assert!(call.target.is_some());
        assert_eq!(call.arguments[0].label.as_deref(), Some("dx"));
        assert_eq!(call.arguments[1].label, None);
    }

    #[test]
    fn free_function_call() {
        let UnresolvedExpression::Call(call) = parse("f(4)") else {
            panic!("expected call");
        };
        assert!(call.target.is_none());
        assert_eq!(call.name.value, "f");
        assert_eq!(call.arguments.len(), 1);
        assert_eq!(call.arguments[0].label, None);
    }

    #[test]
    fn structure_literal_keeps_field_order() {
        let UnresolvedExpression::StructureLiteral { fields, .. } = parse("{x: 1, y: 2}") else {
            panic!("expected structure literal");
        };
        let names: Vec<&str> = fields.iter().map(|(name, _)| name.value.as_str()).collect();
        assert_eq!(names, ["x", "y"]);
    }

    #[test]
    fn structure_literal_accepts_newline_separators() {
        let UnresolvedExpression::StructureLiteral { fields, .. } = parse("{\n  x: 1\n  y: 2\n}")
        else {
            panic!("expected structure literal");
        };
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn invalid_prefix_token_is_rejected() {
        let mut stream = TokenStream::new(")");
        let error = UnresolvedExpression::parse(&mut stream).unwrap_err();
        assert!(matches!(error, Diagnostic::InvalidToken { token } if token.value == ")"));
    }
}
