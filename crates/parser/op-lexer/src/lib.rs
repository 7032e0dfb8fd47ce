//! Pull-based lexer for Opal source text
//!
//! [`TokenStream`] classifies punctuation, operators, keywords and
//! literals lazily, collapsing whitespace and stripping comments as it
//! goes. Newlines are significant: they surface as punctuation tokens
//! used by the parser as statement and field separators, unless the
//! caller asks for them to be skipped.

mod tables;

use op_syntax::{FileLocation, Token, TokenKind};
use tables::{classify, is_symbol_glyph, longest_symbol_at};

/// Whether `peek`/`next` should treat newlines as token separators or
/// surface them as tokens
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Newlines {
    Skip,
    Keep,
}

/// A lazy sequence of located tokens over one source file
///
/// Cloning is cheap enough for the parser's bounded lookahead.
#[derive(Clone)]
pub struct TokenStream {
    chars: std::rc::Rc<[char]>,
    cursor: Cursor,
}

#[derive(Copy, Clone)]
struct Cursor {
    pos: usize,
    location: FileLocation,
}

impl TokenStream {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect::<Vec<_>>().into(),
            cursor: Cursor {
                pos: 0,
                location: FileLocation::start(),
            },
        }
    }

    /// Look at the next token without consuming it, skipping newlines
    pub fn peek(&self) -> Option<Token> {
        self.peek_with(Newlines::Skip)
    }

    /// Look at the next token without consuming it
    pub fn peek_with(&self, newlines: Newlines) -> Option<Token> {
        let mut cursor = self.cursor;
        self.scan(&mut cursor, newlines)
    }

    /// Consume and return the next token, skipping newlines
    pub fn next(&mut self) -> Option<Token> {
        self.next_with(Newlines::Skip)
    }

    /// Consume and return the next token
    pub fn next_with(&mut self, newlines: Newlines) -> Option<Token> {
        let mut cursor = self.cursor;
        let token = self.scan(&mut cursor, newlines);
        self.cursor = cursor;
        token
    }

    fn scan(&self, cursor: &mut Cursor, newlines: Newlines) -> Option<Token> {
        match newlines {
            Newlines::Skip => self.skip_while(cursor, char::is_whitespace),
            Newlines::Keep => self.skip_inline_whitespace(cursor),
        }
        self.skip_comments(cursor, newlines);

        let current = self.char_at(cursor.pos)?;

        if current == '\n' {
            let location = cursor.location;
            self.skip_while(cursor, |c| c == '\n');
            self.skip_while(cursor, char::is_whitespace);
            return Some(Token::new("\n", TokenKind::Punctuation, location));
        }

        if is_symbol_glyph(current) {
            let symbol = longest_symbol_at(&self.chars, cursor.pos)?;
            let location = cursor.location;
            self.advance_by(cursor, symbol.chars().count());
            self.skip_inline_whitespace(cursor);
            return Some(Token::new(symbol, classify(symbol), location));
        }

        // A word token: identifier, keyword, builtin name or number.
        // A leading digit allows `.` inside the token so that decimal
        // fractions lex as one piece.
        let is_decimal = current.is_ascii_digit();
        let location = cursor.location;
        let start = cursor.pos;
        while let Some(c) = self.char_at(cursor.pos) {
            let part_of_word = !c.is_whitespace() && ((is_decimal && c == '.') || !is_symbol_glyph(c));
            if !part_of_word {
                break;
            }
            self.advance(cursor);
        }
        if cursor.pos == start {
            return None;
        }
        let value: String = self.chars[start..cursor.pos].iter().collect();
        self.skip_inline_whitespace(cursor);
        let kind = classify(&value);
        Some(Token::new(value, kind, location))
    }

    fn skip_comments(&self, cursor: &mut Cursor, newlines: Newlines) {
        let Some('/') = self.char_at(cursor.pos) else {
            return;
        };
        match self.char_at(cursor.pos + 1) {
            Some('/') => {
                self.skip_while(cursor, |c| c != '\n');
                if self.char_at(cursor.pos).is_some() {
                    self.advance(cursor);
                }
            }
            Some('*') => {
                self.advance_by(cursor, 2);
                while self.char_at(cursor.pos).is_some() && !self.matches_at(cursor.pos, "*/") {
                    self.advance(cursor);
                }
                self.advance_by(cursor, 2);
            }
            _ => return,
        }
        match newlines {
            Newlines::Skip => self.skip_while(cursor, char::is_whitespace),
            Newlines::Keep => self.skip_inline_whitespace(cursor),
        }
        self.skip_comments(cursor, newlines);
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.chars.get(pos).copied()
    }

    fn matches_at(&self, pos: usize, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(offset, expected)| self.char_at(pos + offset) == Some(expected))
    }

    fn skip_while(&self, cursor: &mut Cursor, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.char_at(cursor.pos) {
            if !predicate(c) {
                break;
            }
            self.advance(cursor);
        }
    }

    fn skip_inline_whitespace(&self, cursor: &mut Cursor) {
        self.skip_while(cursor, |c| c.is_whitespace() && c != '\n');
    }

    fn advance(&self, cursor: &mut Cursor) {
        if let Some(c) = self.char_at(cursor.pos) {
            if c == '\n' {
                cursor.location.line += 1;
                cursor.location.column = 1;
            } else {
                cursor.location.column += 1;
            }
            cursor.pos += 1;
        }
    }

    fn advance_by(&self, cursor: &mut Cursor, count: usize) {
        for _ in 0..count {
            self.advance(cursor);
        }
    }
}

#[cfg(test)]
mod tests;
