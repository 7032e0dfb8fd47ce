//! Shared surface-syntax types for the Opal compiler
//!
//! This crate holds the pieces every pass agrees on: source locations,
//! the token model produced by the lexer, and the closed diagnostic
//! taxonomy reported to users.

pub mod diagnostics;
pub mod location;
pub mod surface;
pub mod token;

pub use diagnostics::Diagnostic;
pub use location::{FileLocation, Located};
pub use surface::{Labeled, Semantics};
pub use token::{Token, TokenKind};
