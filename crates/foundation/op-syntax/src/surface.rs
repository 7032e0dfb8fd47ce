//! Surface-language vocabulary shared between the untyped and typed trees

/// Ownership/mutability intent of a variable, carried through lowering
///
/// `Isolated` owns an independent allocation (the default for fields);
/// `Reference` aliases without ownership transfer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Semantics {
    Isolated,
    Mutable,
    Immutable,
    Reference,
}

impl Semantics {
    /// The semantics spelled by a variable-introduction keyword
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "let" => Some(Self::Immutable),
            "mut" => Some(Self::Mutable),
            "ref" => Some(Self::Reference),
            _ => None,
        }
    }
}

/// A value carrying an optional argument/parameter label
///
/// An absent label prints as `_` in overload signatures.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Labeled<T> {
    pub label: Option<String>,
    pub value: T,
}

impl<T> Labeled<T> {
    pub fn labeled(label: impl Into<String>, value: T) -> Self {
        Self {
            label: Some(label.into()),
            value,
        }
    }

    pub fn unlabeled(value: T) -> Self {
        Self { label: None, value }
    }

    /// Transform the value, keeping the label
    pub fn map<U>(self, transform: impl FnOnce(T) -> U) -> Labeled<U> {
        Labeled {
            label: self.label,
            value: transform(self.value),
        }
    }
}
