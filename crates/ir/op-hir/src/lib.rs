//! Resolved (typed) tree
//!
//! Resolution turns the untyped parser output into these nodes: every
//! name bound, every expression typed. Type declarations live in an
//! arena and are addressed by stable ids, so self-referential types
//! work and type equality is id equality. Declarations are registered
//! in the arena before their bodies resolve and mutated in place;
//! after resolution the module is read-only.

pub mod body;
pub mod types;

pub use body::{Function, ResolvedExpression, ResolvedStatement, Variable};
pub use types::{
    BuiltinType, CompanionObject, Conformance, DataStructure, Object, ResolvedType, Signature,
    TraitDecl, TraitRequirement, TypeDecl,
};

// Operator enums are shared with the untyped tree unchanged.
pub use op_parser::{BinaryOperator, UnaryOperator};

use la_arena::Arena;

/// Stable id of a type declaration within its module
pub type DeclId = la_arena::Idx<TypeDecl>;

/// Stable id of a function or method within its module
pub type FunctionId = la_arena::Idx<Function>;

/// One fully resolved compilation unit
#[derive(Debug, Default)]
pub struct Module {
    /// Every data, object, companion, and trait declaration
    pub types: Arena<TypeDecl>,
    /// Every function, method, and factory, free or owned
    pub functions: Arena<Function>,
    /// Top-level non-declaration statements in source order
    pub statements: Vec<ResolvedStatement>,
}

impl Module {
    /// The declared name of a type
    pub fn type_name(&self, id: DeclId) -> &str {
        self.types[id].name()
    }
}
