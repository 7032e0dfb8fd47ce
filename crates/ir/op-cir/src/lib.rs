//! C-shaped intermediate representation
//!
//! The lowering pass produces these nodes and the emitter renders them
//! with fixed per-node templates. The representation is append-only
//! and deliberately close to C: struct declarations, typedefs, globals
//! with designated initializers, functions, and the statement forms a
//! lowered program needs. Nothing here performs lookups or checking;
//! ill-formed input is a bug in the pass that built it.

use std::fmt;

/// A C type reference
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CType {
    Void,
    /// A typedef'd or builtin name (`integer`, `T`)
    Named(String),
    /// A `struct` tag reference (`struct __T_data`)
    Struct(String),
    Pointer(Box<CType>),
}

impl CType {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn pointer_to(self) -> Self {
        Self::Pointer(Box::new(self))
    }
}

impl fmt::Display for CType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => formatter.write_str("void"),
            Self::Named(name) => formatter.write_str(name),
            Self::Struct(tag) => write!(formatter, "struct {tag}"),
            Self::Pointer(inner) => write!(formatter, "{inner}*"),
        }
    }
}

/// One struct member
#[derive(Clone, Debug, PartialEq)]
pub enum CField {
    Plain {
        ty: CType,
        name: String,
    },
    /// A function-pointer member, used by v-table structs
    FnPtr {
        returns: CType,
        name: String,
        parameters: Vec<CType>,
    },
}

/// A function parameter
#[derive(Clone, Debug, PartialEq)]
pub struct CParameter {
    pub ty: CType,
    pub name: String,
}

/// A C expression
#[derive(Clone, Debug, PartialEq)]
pub enum CExpr {
    Int(i64),
    /// Rendered in hexadecimal
    Hex(u64),
    Real(f64),
    Str(String),
    Name(String),
    AddressOf(Box<CExpr>),
    /// `target.member` or `target->member`
    Member {
        target: Box<CExpr>,
        member: String,
        arrow: bool,
    },
    Call {
        callee: String,
        arguments: Vec<CExpr>,
    },
    Unary {
        operator: &'static str,
        operand: Box<CExpr>,
    },
    Binary {
        left: Box<CExpr>,
        operator: &'static str,
        right: Box<CExpr>,
    },
    Cast {
        ty: CType,
        value: Box<CExpr>,
    },
    SizeOf(String),
    /// A designated struct initializer `{ .a = ..., .b = ... }`
    StructInit(Vec<(String, CExpr)>),
    /// A compound array literal `(element[]){ a, b }`
    ArrayLit {
        element: String,
        values: Vec<CExpr>,
    },
}

impl CExpr {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn call(callee: impl Into<String>, arguments: Vec<CExpr>) -> Self {
        Self::Call {
            callee: callee.into(),
            arguments,
        }
    }

    pub fn address_of(self) -> Self {
        Self::AddressOf(Box::new(self))
    }

    pub fn member(self, member: impl Into<String>, arrow: bool) -> Self {
        Self::Member {
            target: Box::new(self),
            member: member.into(),
            arrow,
        }
    }
}

/// A C statement or top-level item
#[derive(Clone, Debug, PartialEq)]
pub enum CStmt {
    /// `typedef struct name { fields } name;` (or a bare struct
    /// declaration when `typedef` is false)
    StructDecl {
        name: String,
        fields: Vec<CField>,
        typedef: bool,
    },
    /// A file-scope variable
    Global {
        ty: CType,
        name: String,
        initializer: Option<CExpr>,
        is_const: bool,
    },
    Prototype {
        name: String,
        returns: CType,
        parameters: Vec<CParameter>,
    },
    Function {
        name: String,
        returns: CType,
        parameters: Vec<CParameter>,
        body: Vec<CStmt>,
    },
    /// A block-scope declaration
    Declare {
        ty: CType,
        name: String,
        initializer: Option<CExpr>,
    },
    Assign {
        target: CExpr,
        value: CExpr,
    },
    Expression(CExpr),
    Return(Option<CExpr>),
}
