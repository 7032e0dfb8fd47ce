//! The token model produced by the lexer

use crate::location::FileLocation;
use std::fmt;

/// Classification of a single token
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TokenKind {
    /// Decimal number, possibly with `_` groupings and a fraction
    Decimal,
    /// `0x`/`0b` literal
    Binary,
    Operator,
    Punctuation,
    Keyword,
    Identifier,
    /// One of the builtin type names (`integer`, `real`, ...)
    BuiltinType,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Decimal => "DECIMAL",
            Self::Binary => "BINARY",
            Self::Operator => "OPERATOR",
            Self::Punctuation => "PUNCTUATION",
            Self::Keyword => "KEYWORD",
            Self::Identifier => "IDENTIFIER",
            Self::BuiltinType => "BUILTIN",
        };
        f.write_str(name)
    }
}

/// A located, classified piece of source text
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub value: String,
    pub kind: TokenKind,
    pub location: FileLocation,
}

impl Token {
    pub fn new(value: impl Into<String>, kind: TokenKind, location: FileLocation) -> Self {
        Self {
            value: value.into(),
            kind,
            location,
        }
    }

    /// True if this token is the given keyword or punctuation text
    pub fn is(&self, text: &str) -> bool {
        self.value == text
    }
}
