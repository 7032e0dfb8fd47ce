//! Statement parsing
//!
//! A block is a newline-separated sequence of statements; each
//! statement form is probed in a fixed order before falling back to
//! expression and assignment parsing.

use crate::decl::{
    ConformanceDeclaration, DataDeclaration, FunctionDeclaration, ObjectDeclaration,
    TraitDeclaration, VariableDeclaration,
};
use crate::expr::UnresolvedExpression;
use crate::support::{Require, next_is};
use op_lexer::TokenStream;
use op_syntax::Diagnostic;

/// One statement of the untyped tree
#[derive(Clone, Debug, PartialEq)]
pub enum UnresolvedStatement {
    Variable(VariableDeclaration),
    Function(FunctionDeclaration),
    Data(DataDeclaration),
    Object(ObjectDeclaration),
    Trait(TraitDeclaration),
    Conformance(ConformanceDeclaration),
    Print(UnresolvedExpression),
    Return(UnresolvedExpression),
    Assign {
        target: UnresolvedExpression,
        value: UnresolvedExpression,
    },
    Expression(UnresolvedExpression),
}

/// Parse statements until a closing `}` or the end of the stream
pub fn parse_block(stream: &mut TokenStream) -> Result<Vec<UnresolvedStatement>, Diagnostic> {
    let mut statements = Vec::new();
    while let Some(token) = stream.peek() {
        if token.is("}") {
            break;
        }
        statements.push(parse_statement(stream)?);
    }
    Ok(statements)
}

fn parse_statement(stream: &mut TokenStream) -> Result<UnresolvedStatement, Diagnostic> {
    if VariableDeclaration::is_next(stream) {
        return Ok(UnresolvedStatement::Variable(VariableDeclaration::parse(
            stream,
        )?));
    }
    if FunctionDeclaration::is_next(stream) {
        return Ok(UnresolvedStatement::Function(FunctionDeclaration::parse(
            stream,
        )?));
    }
    if DataDeclaration::is_next(stream) {
        return Ok(UnresolvedStatement::Data(DataDeclaration::parse(stream)?));
    }
    if ObjectDeclaration::is_next(stream) {
        return Ok(UnresolvedStatement::Object(ObjectDeclaration::parse(
            stream,
        )?));
    }
    if TraitDeclaration::is_next(stream) {
        return Ok(UnresolvedStatement::Trait(TraitDeclaration::parse(stream)?));
    }
    if ConformanceDeclaration::is_next(stream) {
        return Ok(UnresolvedStatement::Conformance(
            ConformanceDeclaration::parse(stream)?,
        ));
    }
    if next_is(stream, "print") {
        stream.next();
        return Ok(UnresolvedStatement::Print(UnresolvedExpression::parse(
            stream,
        )?));
    }
    if next_is(stream, "return") {
        stream.next();
        return Ok(UnresolvedStatement::Return(UnresolvedExpression::parse(
            stream,
        )?));
    }
    parse_expression_statement(stream)
}

/// An expression at statement position: an assignment, a call, or
/// otherwise an error since a bare value has no effect
fn parse_expression_statement(
    stream: &mut TokenStream,
) -> Result<UnresolvedStatement, Diagnostic> {
    let start = stream.peek().required()?;
    let expression = UnresolvedExpression::parse(stream)?;

    if next_is(stream, "=") {
        stream.next();
        let value = UnresolvedExpression::parse(stream)?;
        return Ok(UnresolvedStatement::Assign {
            target: expression,
            value,
        });
    }

    match expression {
        UnresolvedExpression::Call(_) => Ok(UnresolvedStatement::Expression(expression)),
        _ => Err(Diagnostic::InvalidToken { token: start }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Vec<UnresolvedStatement>, Diagnostic> {
        parse_block(&mut TokenStream::new(source))
    }

    #[test]
    fn statement_sequence() {
        let statements = parse("let x = 1\nprint x\nreturn x").unwrap();
        assert_eq!(statements.len(), 3);
        assert!(matches!(statements[0], UnresolvedStatement::Variable(_)));
        assert!(matches!(statements[1], UnresolvedStatement::Print(_)));
        assert!(matches!(statements[2], UnresolvedStatement::Return(_)));
    }

    #[test]
    fn assignment_to_member() {
        let statements = parse("point.x = 4").unwrap();
        let UnresolvedStatement::Assign { target, value } = &statements[0] else {
            panic!("expected assignment, got {statements:?}");
        };
        assert!(matches!(target, UnresolvedExpression::Member { .. }));
        assert!(matches!(value, UnresolvedExpression::Integer(4, _)));
    }

    #[test]
    fn call_stands_alone_as_statement() {
        let statements = parse("counter.bump()").unwrap();
        assert!(matches!(statements[0], UnresolvedStatement::Expression(_)));
    }

    #[test]
    fn bare_value_is_not_a_statement() {
        let error = parse("1 + 2").unwrap_err();
        assert!(matches!(error, Diagnostic::InvalidToken { token } if token.is("1")));
    }

    #[test]
    fn declarations_dispatch_by_keyword() {
        let source = "data Point { x: integer }\nobject Counter {\n}\ntrait Drawable {\n}\nmodel Point: Drawable {\n}\nfunc run() {\n}";
        let statements = parse(source).unwrap();
        assert!(matches!(statements[0], UnresolvedStatement::Data(_)));
        assert!(matches!(statements[1], UnresolvedStatement::Object(_)));
        assert!(matches!(statements[2], UnresolvedStatement::Trait(_)));
        assert!(matches!(statements[3], UnresolvedStatement::Conformance(_)));
        assert!(matches!(statements[4], UnresolvedStatement::Function(_)));
    }

    #[test]
    fn block_stops_at_closing_brace() {
        let mut stream = TokenStream::new("print 1\n}");
        let statements = parse_block(&mut stream).unwrap();
        assert_eq!(statements.len(), 1);
        assert!(stream.peek().is_some_and(|token| token.is("}")));
    }
}
