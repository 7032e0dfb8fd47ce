//! Type declarations and resolved type references

use crate::{DeclId, FunctionId, Module, Variable};
use op_syntax::Located;
use std::fmt;

/// The builtin value types
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BuiltinType {
    Boolean,
    Integer,
    Real,
    Bitfield,
}

impl BuiltinType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(Self::Boolean),
            "integer" => Some(Self::Integer),
            "real" => Some(Self::Real),
            "bitfield" => Some(Self::Bitfield),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Bitfield => "bitfield",
        }
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// A reference to a resolved type; user-defined types point into the
/// module's declaration arena
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ResolvedType {
    Builtin(BuiltinType),
    Data(DeclId),
    Object(DeclId),
    Companion(DeclId),
}

impl ResolvedType {
    /// The declaration id for user-defined types
    pub fn decl(self) -> Option<DeclId> {
        match self {
            Self::Builtin(_) => None,
            Self::Data(id) | Self::Object(id) | Self::Companion(id) => Some(id),
        }
    }

    /// Whether values of this type live behind a reference-counted
    /// pointer at runtime
    pub fn is_reference_counted(self) -> bool {
        !matches!(self, Self::Builtin(_))
    }

    /// The name used in diagnostics
    pub fn display_name(self, module: &Module) -> String {
        match self {
            Self::Builtin(builtin) => builtin.name().to_string(),
            Self::Data(id) | Self::Object(id) | Self::Companion(id) => {
                module.type_name(id).to_string()
            }
        }
    }
}

/// Overload identity: a function is identified by its name and the
/// ordered parameter labels, never by parameter types
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Signature {
    pub name: String,
    /// One entry per parameter; `None` for an unlabeled one
    pub labels: Vec<Option<String>>,
}

impl Signature {
    pub fn new(name: impl Into<String>, labels: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            labels,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}(", self.name)?;
        for label in &self.labels {
            write!(formatter, "{}:", label.as_deref().unwrap_or("_"))?;
        }
        write!(formatter, ")")
    }
}

/// One entry in the module's type arena
#[derive(Debug)]
pub enum TypeDecl {
    Data(DataStructure),
    Object(Object),
    Companion(CompanionObject),
    Trait(TraitDecl),
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        match self {
            Self::Data(data) => &data.name.value,
            Self::Object(object) => &object.name.value,
            Self::Companion(companion) => &companion.name,
            Self::Trait(decl) => &decl.name.value,
        }
    }

    pub fn as_data(&self) -> Option<&DataStructure> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_companion(&self) -> Option<&CompanionObject> {
        match self {
            Self::Companion(companion) => Some(companion),
            _ => None,
        }
    }

    pub fn as_trait(&self) -> Option<&TraitDecl> {
        match self {
            Self::Trait(decl) => Some(decl),
            _ => None,
        }
    }
}

/// A value-semantic `data` structure
#[derive(Debug)]
pub struct DataStructure {
    pub name: Located<String>,
    pub fields: Vec<Variable>,
    /// The companion singleton, when a `static:` section exists
    pub companion: Option<DeclId>,
    pub conformances: Vec<Conformance>,
}

/// A single-inheritance `object` type
#[derive(Debug)]
pub struct Object {
    pub name: Located<String>,
    pub is_abstract: bool,
    pub supertype: Option<DeclId>,
    /// The object's own fields; ancestor fields live on the ancestor
    pub fields: Vec<Variable>,
    /// Pure and mutating methods
    pub methods: Vec<FunctionId>,
    pub factory_methods: Vec<FunctionId>,
    pub companion: Option<DeclId>,
    pub conformances: Vec<Conformance>,
}

/// The per-type singleton holding `static:` fields and methods; it is
/// registered as a named type of its own, bound to a variable named
/// after the owning type
#[derive(Debug)]
pub struct CompanionObject {
    pub name: String,
    /// The type this companion belongs to
    pub owner: DeclId,
    pub fields: Vec<Variable>,
    pub methods: Vec<FunctionId>,
}

/// A trait: a named set of required method signatures
#[derive(Debug)]
pub struct TraitDecl {
    pub name: Located<String>,
    pub requirements: Vec<TraitRequirement>,
}

/// One required method of a trait
#[derive(Debug)]
pub struct TraitRequirement {
    pub signature: Signature,
    pub parameters: Vec<ResolvedType>,
    pub return_type: Option<ResolvedType>,
}

/// A `model Type: Trait` conformance attached to the type
#[derive(Clone, Debug)]
pub struct Conformance {
    pub trait_id: DeclId,
    /// Implementations in the trait's requirement order
    pub methods: Vec<FunctionId>,
}
