//! The closed diagnostic taxonomy
//!
//! Every user-facing failure in the pipeline is one of these variants.
//! Lowering and emission never produce diagnostics; they only ever see
//! trees the resolution pass has already accepted.

use crate::location::FileLocation;
use crate::token::Token;
use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// A user-facing compilation failure, carrying the offending location
#[derive(Error, Debug, Clone, PartialEq, MietteDiagnostic)]
pub enum Diagnostic {
    #[error("unexpected end of input")]
    #[diagnostic(code(opal::unexpected_eof))]
    UnexpectedEof,

    /// No eligible parser claimed the token
    #[error("invalid token `{}` ({})", token.value, token.kind)]
    #[diagnostic(code(opal::invalid_token))]
    InvalidToken { token: Token },

    /// No declared type and no inferable type, or an undeclared type name
    #[error("unresolved type")]
    #[diagnostic(code(opal::unresolved_type))]
    UnresolvedType { location: FileLocation },

    #[error("type mismatch; expected: {declared}, was: {inferred}")]
    #[diagnostic(code(opal::type_mismatch))]
    TypeMismatch {
        declared: String,
        inferred: String,
        location: FileLocation,
    },

    #[error("unknown variable: {name}")]
    #[diagnostic(code(opal::unknown_variable))]
    UnknownVariable {
        name: String,
        location: FileLocation,
    },

    /// The overload key was not found; an overload existing under a
    /// different label signature is still reported here
    #[error("unknown function: {signature}")]
    #[diagnostic(code(opal::unknown_function))]
    UnknownFunction {
        signature: String,
        location: FileLocation,
    },

    /// A method marked pure attempted mutation
    #[error("pure method `{method}` must not mutate instance state")]
    #[diagnostic(code(opal::impure_method))]
    ImpureMethod {
        method: String,
        location: FileLocation,
    },
}

impl Diagnostic {
    /// The source location to prefix in a one-line report, if any
    pub fn location(&self) -> Option<FileLocation> {
        match self {
            Self::UnexpectedEof => None,
            Self::InvalidToken { token } => Some(token.location),
            Self::UnresolvedType { location }
            | Self::TypeMismatch { location, .. }
            | Self::UnknownVariable { location, .. }
            | Self::UnknownFunction { location, .. }
            | Self::ImpureMethod { location, .. } => Some(*location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    #[test]
    fn invalid_token_message_names_value_and_kind() {
        let diagnostic = Diagnostic::InvalidToken {
            token: Token::new("}", TokenKind::Punctuation, FileLocation::new(4, 1)),
        };
        assert_eq!(diagnostic.to_string(), "invalid token `}` (PUNCTUATION)");
        assert_eq!(diagnostic.location(), Some(FileLocation::new(4, 1)));
    }

    #[test]
    fn type_mismatch_names_both_types() {
        let diagnostic = Diagnostic::TypeMismatch {
            declared: "integer".into(),
            inferred: "real".into(),
            location: FileLocation::new(1, 18),
        };
        assert_eq!(
            diagnostic.to_string(),
            "type mismatch; expected: integer, was: real"
        );
    }
}
