//! Name and type resolution
//!
//! A single top-to-bottom pass over the untyped statements that binds
//! every name, types every expression, and fails fast on the first
//! diagnostic. Type inference is strictly local: the declared type of
//! the binding under construction flows inward as a contextual hint,
//! and the only coercion in the language is an integer literal adopting
//! a hinted `real` type.
//!
//! # Architecture
//!
//! - **Scope tree**: parent-linked symbol tables for variables,
//!   functions by overload key, and named types
//! - **Resolver**: the statement/expression walk producing the typed
//!   [`op_hir::Module`]

pub mod resolver;
pub mod scope;

pub use resolver::Resolver;
pub use scope::{ScopeId, ScopeTree, VariableBinding};

use op_hir::Module;
use op_parser::UnresolvedStatement;
use op_syntax::Diagnostic;

/// Resolve a parsed compilation unit into a typed module
pub fn resolve(statements: Vec<UnresolvedStatement>) -> Result<Module, Diagnostic> {
    Resolver::new().run(statements)
}
