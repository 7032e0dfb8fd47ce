use crate::{Newlines, TokenStream};
use op_syntax::{FileLocation, Token, TokenKind};

fn tokenize(source: &str) -> Vec<Token> {
    let mut stream = TokenStream::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = stream.next_with(Newlines::Keep) {
        tokens.push(token);
    }
    tokens
}

fn at(line: u32, column: u32) -> FileLocation {
    FileLocation::new(line, column)
}

#[test]
fn keywords() {
    for keyword in [
        "let", "mut", "ref", "print", "data", "object", "trait", "model", "factory", "static",
        "mutating", "abstract",
    ] {
        assert_eq!(
            tokenize(keyword),
            vec![Token::new(keyword, TokenKind::Keyword, at(1, 1))],
        );
    }
}

#[test]
fn builtin_types() {
    for name in ["integer", "bitfield", "real", "boolean"] {
        assert_eq!(
            tokenize(name),
            vec![Token::new(name, TokenKind::BuiltinType, at(1, 1))],
        );
    }
}

#[test]
fn identifiers() {
    for identifier in ["x", "y", "entity"] {
        assert_eq!(
            tokenize(identifier),
            vec![Token::new(identifier, TokenKind::Identifier, at(1, 1))],
        );
    }
}

#[test]
fn decimal_numbers() {
    for literal in ["12", "1_000_000", "9_223_372_036_854_775_807", "12.4"] {
        assert_eq!(
            tokenize(literal),
            vec![Token::new(literal, TokenKind::Decimal, at(1, 1))],
        );
    }
}

#[test]
fn binary_numbers() {
    for literal in ["0x2A", "0x1_2_3", "0b1_1_0"] {
        assert_eq!(
            tokenize(literal),
            vec![Token::new(literal, TokenKind::Binary, at(1, 1))],
        );
    }
}

#[test]
fn punctuation_symbols() {
    for symbol in [":", "=>", "->"] {
        assert_eq!(
            tokenize(symbol),
            vec![Token::new(symbol, TokenKind::Punctuation, at(1, 1))],
        );
    }
}

#[test]
fn operators() {
    for symbol in ["=", ">>", "<<", "~"] {
        assert_eq!(
            tokenize(symbol),
            vec![Token::new(symbol, TokenKind::Operator, at(1, 1))],
        );
    }
}

#[test]
fn complete_variable_declaration() {
    assert_eq!(
        tokenize("let x: integer = 27"),
        vec![
            Token::new("let", TokenKind::Keyword, at(1, 1)),
            Token::new("x", TokenKind::Identifier, at(1, 5)),
            Token::new(":", TokenKind::Punctuation, at(1, 6)),
            Token::new("integer", TokenKind::BuiltinType, at(1, 8)),
            Token::new("=", TokenKind::Operator, at(1, 16)),
            Token::new("27", TokenKind::Decimal, at(1, 18)),
        ],
    );
}

#[test]
fn consecutive_newlines_collapse_to_one_token() {
    assert_eq!(
        tokenize("let\n\nx:\ninteger =\n    27"),
        vec![
            Token::new("let", TokenKind::Keyword, at(1, 1)),
            Token::new("\n", TokenKind::Punctuation, at(1, 4)),
            Token::new("x", TokenKind::Identifier, at(3, 1)),
            Token::new(":", TokenKind::Punctuation, at(3, 2)),
            Token::new("\n", TokenKind::Punctuation, at(3, 3)),
            Token::new("integer", TokenKind::BuiltinType, at(4, 1)),
            Token::new("=", TokenKind::Operator, at(4, 9)),
            Token::new("\n", TokenKind::Punctuation, at(4, 10)),
            Token::new("27", TokenKind::Decimal, at(5, 5)),
        ],
    );
}

#[test]
fn line_comment_is_elided() {
    assert_eq!(
        tokenize("let // ignored text\nx"),
        vec![
            Token::new("let", TokenKind::Keyword, at(1, 1)),
            Token::new("x", TokenKind::Identifier, at(2, 1)),
        ],
    );
}

#[test]
fn block_comment_is_elided() {
    assert_eq!(
        tokenize("let /* ignored\ntext */ x"),
        vec![
            Token::new("let", TokenKind::Keyword, at(1, 1)),
            Token::new("x", TokenKind::Identifier, at(2, 9)),
        ],
    );
}

#[test]
fn chained_comments_are_elided() {
    assert_eq!(
        tokenize("let /* one */ /* two */ x"),
        vec![
            Token::new("let", TokenKind::Keyword, at(1, 1)),
            Token::new("x", TokenKind::Identifier, at(1, 25)),
        ],
    );
}

#[test]
fn peek_does_not_consume() {
    let mut stream = TokenStream::new("let x");
    assert_eq!(
        stream.peek(),
        Some(Token::new("let", TokenKind::Keyword, at(1, 1)))
    );
    assert_eq!(
        stream.peek(),
        Some(Token::new("let", TokenKind::Keyword, at(1, 1)))
    );
    assert_eq!(
        stream.next(),
        Some(Token::new("let", TokenKind::Keyword, at(1, 1)))
    );
    assert_eq!(
        stream.next(),
        Some(Token::new("x", TokenKind::Identifier, at(1, 5)))
    );
    assert_eq!(stream.next(), None);
}

#[test]
fn skipping_newlines_hides_separator_tokens() {
    let mut stream = TokenStream::new("a\nb");
    assert_eq!(
        stream.next(),
        Some(Token::new("a", TokenKind::Identifier, at(1, 1)))
    );
    assert_eq!(
        stream.peek_with(Newlines::Keep).map(|token| token.value),
        Some("\n".to_string())
    );
    assert_eq!(
        stream.next(),
        Some(Token::new("b", TokenKind::Identifier, at(2, 1)))
    );
}

#[test]
fn compound_assignment_operators_lex_longest_first() {
    let tokens = tokenize("a <<= 2");
    assert_eq!(tokens[1], Token::new("<<=", TokenKind::Operator, at(1, 3)));
}

#[test]
fn member_access_splits_identifier_and_dot() {
    assert_eq!(
        tokenize("x.innie"),
        vec![
            Token::new("x", TokenKind::Identifier, at(1, 1)),
            Token::new(".", TokenKind::Punctuation, at(1, 2)),
            Token::new("innie", TokenKind::Identifier, at(1, 3)),
        ],
    );
}
