//! Syntax construction for Opal
//!
//! One recursive-descent builder per declaration and statement form,
//! consuming tokens from [`op_lexer::TokenStream`] and producing an
//! untyped tree that retains source locations for diagnostics. No
//! semantic binding happens here; names and type annotations stay raw
//! strings until the resolution pass.

pub mod decl;
pub mod expr;
pub mod stmt;
mod support;

pub use decl::{
    ConformanceDeclaration, DataDeclaration, FunctionBody, FunctionDeclaration, FunctionSignature,
    ObjectDeclaration, StaticSection, TraitDeclaration, VariableDeclaration,
};
pub use expr::{BinaryOperator, UnaryOperator, UnresolvedCall, UnresolvedExpression};
pub use stmt::UnresolvedStatement;

use op_lexer::TokenStream;
use op_syntax::Diagnostic;

/// Parse a whole source file into untyped statements
pub fn parse_source(source: &str) -> Result<Vec<UnresolvedStatement>, Diagnostic> {
    let mut stream = TokenStream::new(source);
    let statements = stmt::parse_block(&mut stream)?;
    if let Some(trailing) = stream.peek() {
        return Err(Diagnostic::InvalidToken { token: trailing });
    }
    Ok(statements)
}
