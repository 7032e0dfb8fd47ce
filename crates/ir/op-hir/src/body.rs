//! Resolved expressions, statements, and function bodies

use crate::{BinaryOperator, DeclId, FunctionId, ResolvedType, Signature, UnaryOperator};
use op_syntax::{FileLocation, Located, Semantics};

/// A resolved binding: a local, parameter, or field
#[derive(Clone, Debug)]
pub struct Variable {
    pub name: Located<String>,
    pub semantics: Semantics,
    pub ty: ResolvedType,
    pub initializer: Option<ResolvedExpression>,
}

/// A function, method, or factory with a fully resolved body
#[derive(Debug)]
pub struct Function {
    pub name: Located<String>,
    pub is_pure: bool,
    pub is_mutating: bool,
    /// The type owning this method, when it is not a free function
    pub owner: Option<ResolvedType>,
    pub signature: Signature,
    pub parameters: Vec<Variable>,
    pub return_type: Option<ResolvedType>,
    pub body: Vec<ResolvedStatement>,
}

/// A typed expression
#[derive(Clone, Debug)]
pub enum ResolvedExpression {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Bitfield(u64),
    /// A read of a bound local, parameter, or companion binding
    Variable { name: String, ty: ResolvedType },
    /// The receiver inside a method body
    SelfValue { ty: ResolvedType },
    /// Member access on a typed target
    Field {
        target: Box<ResolvedExpression>,
        field: String,
        ty: ResolvedType,
        location: FileLocation,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<ResolvedExpression>,
        ty: ResolvedType,
    },
    Binary {
        left: Box<ResolvedExpression>,
        operator: BinaryOperator,
        right: Box<ResolvedExpression>,
        ty: ResolvedType,
    },
    /// A structure literal bound to a declared data or object type,
    /// fields in declaration order
    StructureLiteral {
        ty: ResolvedType,
        fields: Vec<(String, ResolvedExpression)>,
    },
    /// A call to a free function, method, or companion method; the
    /// callee is bound by overload key during resolution
    Call {
        function: FunctionId,
        /// Receiver for instance and companion calls
        target: Option<Box<ResolvedExpression>>,
        arguments: Vec<ResolvedExpression>,
        ty: Option<ResolvedType>,
    },
    /// A factory call: allocate the object, then run the factory with
    /// the fresh instance as the receiver
    FactoryCall {
        object: DeclId,
        function: FunctionId,
        arguments: Vec<ResolvedExpression>,
    },
}

impl ResolvedExpression {
    /// The expression's type; `None` only for calls to functions
    /// without a return type
    pub fn ty(&self) -> Option<ResolvedType> {
        match self {
            Self::Boolean(_) => Some(ResolvedType::Builtin(crate::BuiltinType::Boolean)),
            Self::Integer(_) => Some(ResolvedType::Builtin(crate::BuiltinType::Integer)),
            Self::Real(_) => Some(ResolvedType::Builtin(crate::BuiltinType::Real)),
            Self::Bitfield(_) => Some(ResolvedType::Builtin(crate::BuiltinType::Bitfield)),
            Self::Variable { ty, .. }
            | Self::SelfValue { ty }
            | Self::Field { ty, .. }
            | Self::Unary { ty, .. }
            | Self::Binary { ty, .. }
            | Self::StructureLiteral { ty, .. } => Some(*ty),
            Self::Call { ty, .. } => *ty,
            Self::FactoryCall { object, .. } => Some(ResolvedType::Object(*object)),
        }
    }
}

/// A typed statement
#[derive(Clone, Debug)]
pub enum ResolvedStatement {
    Variable(Variable),
    Print(ResolvedExpression),
    Return(Option<ResolvedExpression>),
    Assign {
        target: ResolvedExpression,
        value: ResolvedExpression,
    },
    Expression(ResolvedExpression),
}
