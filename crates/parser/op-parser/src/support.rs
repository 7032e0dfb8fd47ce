//! Token-requirement helpers shared by the builders

use op_lexer::TokenStream;
use op_syntax::{Diagnostic, Token, TokenKind};

/// Convert optional tokens into diagnostics at the point of use
pub(crate) trait Require {
    fn required(self) -> Result<Token, Diagnostic>;
    fn requiring(self, is_good: impl FnOnce(&Token) -> bool) -> Result<Token, Diagnostic>;
}

impl Require for Option<Token> {
    fn required(self) -> Result<Token, Diagnostic> {
        self.ok_or(Diagnostic::UnexpectedEof)
    }

    fn requiring(self, is_good: impl FnOnce(&Token) -> bool) -> Result<Token, Diagnostic> {
        let token = self.required()?;
        if is_good(&token) {
            Ok(token)
        } else {
            Err(Diagnostic::InvalidToken { token })
        }
    }
}

/// Consume the next token, requiring the exact text
pub(crate) fn expect(stream: &mut TokenStream, text: &str) -> Result<Token, Diagnostic> {
    stream.next().requiring(|token| token.is(text))
}

/// Consume the next token, requiring an identifier
pub(crate) fn expect_identifier(stream: &mut TokenStream) -> Result<Token, Diagnostic> {
    stream.next().requiring(|token| token.kind == TokenKind::Identifier)
}

/// Consume the next token, requiring an identifier or builtin type name
pub(crate) fn expect_type_name(stream: &mut TokenStream) -> Result<Token, Diagnostic> {
    stream
        .next()
        .requiring(|token| matches!(token.kind, TokenKind::Identifier | TokenKind::BuiltinType))
}

/// True if the next token (skipping newlines) has the given text
pub(crate) fn next_is(stream: &TokenStream, text: &str) -> bool {
    stream.peek().is_some_and(|token| token.is(text))
}
