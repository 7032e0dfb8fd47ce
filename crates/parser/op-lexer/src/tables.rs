//! Token classification tables

use op_syntax::TokenKind;

pub(crate) const BUILTIN_TYPES: &[&str] = &[
    "integer", "real", "boolean", "bitfield", "string", "regex",
];

pub(crate) const KEYWORDS: &[&str] = &[
    // Modeling
    "let", "mut", "ref", // variables
    "func", "pure", "operator", // functions / methods / operators
    "data", "enum", "object", "service", "role", "trait", "model", // types
    "static", "mutating", "factory", // object modeling
    "abstract", "extendable", "virtual", // inheritance
    // Single keyword expressions
    "true", "false", "null", "self", "super",
    "print",
    // Control flow
    "return", "continue", "fallthrough", "break",
    "if", "else", "unless", "guard", "switch", "when", "case",
    "do", "while", "for", "in",
];

pub(crate) const OPERATORS: &[&str] = &[
    // Arithmetics
    "+", "-", "*", "/",
    // Comparisons
    "==", "===", "!=", "!==", "<", ">", ">=", "<=",
    // Boolean operators
    "&&", "||", "!",
    // Bitfield operators
    "&", "|", "^", "~",
    // Assignment
    "+=", "-=", "/=", "*=", "=",
    "|=", "&=", "^=", "<<", ">>", "<<=", ">>=",
];

pub(crate) const PUNCTUATION: &[&str] = &[
    ",", ".", "?", ":",
    "[", "]", "{", "}", "(", ")",
    // Functions
    "->", "=>",
    // Null-coalescing
    "!.", "?.", "??",
];

/// True if the character can begin or continue a symbol token
pub(crate) fn is_symbol_glyph(c: char) -> bool {
    OPERATORS
        .iter()
        .chain(PUNCTUATION)
        .any(|symbol| symbol.contains(c))
}

/// The longest operator or punctuation symbol starting at `pos`
pub(crate) fn longest_symbol_at(chars: &[char], pos: usize) -> Option<&'static str> {
    OPERATORS
        .iter()
        .chain(PUNCTUATION)
        .filter(|symbol| matches_at(chars, pos, symbol))
        .copied()
        .max_by_key(|symbol| symbol.len())
}

fn matches_at(chars: &[char], pos: usize, text: &str) -> bool {
    text.chars()
        .enumerate()
        .all(|(offset, expected)| chars.get(pos + offset) == Some(&expected))
}

pub(crate) fn classify(value: &str) -> TokenKind {
    if is_decimal_literal(value) {
        TokenKind::Decimal
    } else if KEYWORDS.contains(&value) {
        TokenKind::Keyword
    } else if BUILTIN_TYPES.contains(&value) {
        TokenKind::BuiltinType
    } else if OPERATORS.contains(&value) {
        TokenKind::Operator
    } else if PUNCTUATION.contains(&value) {
        TokenKind::Punctuation
    } else if value.starts_with("0x") || value.starts_with("0b") {
        TokenKind::Binary
    } else {
        TokenKind::Identifier
    }
}

/// Digits with optional `_` groupings and an optional fraction:
/// `\d+(_\d+)*(\.\d+(_\d+)*)?`
fn is_decimal_literal(value: &str) -> bool {
    fn digits_with_groupings(part: &str) -> bool {
        !part.is_empty()
            && part
                .split('_')
                .all(|group| !group.is_empty() && group.chars().all(|c| c.is_ascii_digit()))
    }

    match value.split_once('.') {
        Some((whole, fraction)) => digits_with_groupings(whole) && digits_with_groupings(fraction),
        None => digits_with_groupings(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouped_decimals_classify_as_decimal() {
        for literal in ["12", "1_000_000", "1_2.3_4", "9_223_372_036_854_775_807"] {
            assert_eq!(classify(literal), TokenKind::Decimal, "{literal}");
        }
    }

    #[test]
    fn malformed_groupings_are_identifiers() {
        for text in ["_12", "1__2", "1.", "1._2"] {
            assert_ne!(classify(text), TokenKind::Decimal, "{text}");
        }
    }

    #[test]
    fn hex_and_bin_prefixes_classify_as_binary() {
        assert_eq!(classify("0x1_2_3"), TokenKind::Binary);
        assert_eq!(classify("0b1_1_0"), TokenKind::Binary);
    }

    #[test]
    fn longest_symbol_wins() {
        let chars: Vec<char> = "<<= 4".chars().collect();
        assert_eq!(longest_symbol_at(&chars, 0), Some("<<="));
    }
}
