//! Source file locations

use std::fmt;

/// A 1-based line/column position in a source file
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct FileLocation {
    pub line: u32,
    pub column: u32,
}

impl FileLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// The position of the first character of a file
    pub fn start() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A value paired with the location it was read from
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Located<T> {
    pub value: T,
    pub location: FileLocation,
}

impl<T> Located<T> {
    pub fn new(value: T, location: FileLocation) -> Self {
        Self { value, location }
    }

    /// Transform the value, keeping the location
    pub fn map<U>(self, transform: impl FnOnce(T) -> U) -> Located<U> {
        Located {
            value: transform(self.value),
            location: self.location,
        }
    }

    pub fn as_ref(&self) -> Located<&T> {
        Located {
            value: &self.value,
            location: self.location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_line_then_column() {
        assert_eq!(FileLocation::new(3, 14).to_string(), "3:14");
    }

    #[test]
    fn map_preserves_location() {
        let located = Located::new("27", FileLocation::new(2, 5));
        let mapped = located.map(|text| text.len());
        assert_eq!(mapped.value, 2);
        assert_eq!(mapped.location, FileLocation::new(2, 5));
    }
}
