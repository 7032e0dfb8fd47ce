//! Scope tree: parent-linked symbol tables
//!
//! Each scope holds three tables: variables by name, functions by
//! overload key, and named types. Registration is always local to one
//! scope; lookup walks the parent chain. Inner declarations shadow
//! outer ones.

use op_hir::{DeclId, FunctionId, ResolvedType, Signature};
use op_syntax::Semantics;
use rustc_hash::FxHashMap;

/// Unique identifier for a scope
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct ScopeId(u32);

/// What a variable name resolves to
#[derive(Clone, Debug)]
pub struct VariableBinding {
    pub ty: ResolvedType,
    pub semantics: Semantics,
}

/// A single scope
#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    variables: FxHashMap<String, VariableBinding>,
    functions: FxHashMap<Signature, FunctionId>,
    types: FxHashMap<String, DeclId>,
}

/// All scopes of one compilation unit
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    root: ScopeId,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            root: ScopeId(0),
        }
    }

    /// The top-level scope
    pub fn root(&self) -> ScopeId {
        self.root
    }

    /// Open a child scope under `parent`
    pub fn create_child(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        id
    }

    pub fn define_variable(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        binding: VariableBinding,
    ) {
        self.scopes[scope.0 as usize]
            .variables
            .insert(name.into(), binding);
    }

    pub fn define_function(&mut self, scope: ScopeId, signature: Signature, id: FunctionId) {
        self.scopes[scope.0 as usize].functions.insert(signature, id);
    }

    pub fn define_type(&mut self, scope: ScopeId, name: impl Into<String>, id: DeclId) {
        self.scopes[scope.0 as usize].types.insert(name.into(), id);
    }

    pub fn lookup_variable(&self, scope: ScopeId, name: &str) -> Option<&VariableBinding> {
        self.walk(scope, |scope| scope.variables.get(name))
    }

    pub fn lookup_function(&self, scope: ScopeId, signature: &Signature) -> Option<FunctionId> {
        self.walk(scope, |scope| scope.functions.get(signature)).copied()
    }

    pub fn lookup_type(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        self.walk(scope, |scope| scope.types.get(name)).copied()
    }

    fn walk<'tree, T>(
        &'tree self,
        scope: ScopeId,
        mut find: impl FnMut(&'tree Scope) -> Option<&'tree T>,
    ) -> Option<&'tree T> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.0 as usize];
            if let Some(found) = find(scope) {
                return Some(found);
            }
            current = scope.parent;
        }
        None
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use op_hir::BuiltinType;

    fn integer() -> VariableBinding {
        VariableBinding {
            ty: ResolvedType::Builtin(BuiltinType::Integer),
            semantics: Semantics::Immutable,
        }
    }

    fn real() -> VariableBinding {
        VariableBinding {
            ty: ResolvedType::Builtin(BuiltinType::Real),
            semantics: Semantics::Immutable,
        }
    }

    #[test]
    fn lookup_walks_parents() {
        let mut tree = ScopeTree::new();
        tree.define_variable(tree.root(), "x", integer());
        let inner = tree.create_child(tree.root());
        let binding = tree.lookup_variable(inner, "x").unwrap();
        assert_eq!(binding.ty, ResolvedType::Builtin(BuiltinType::Integer));
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut tree = ScopeTree::new();
        tree.define_variable(tree.root(), "x", integer());
        let inner = tree.create_child(tree.root());
        tree.define_variable(inner, "x", real());
        assert_eq!(
            tree.lookup_variable(inner, "x").unwrap().ty,
            ResolvedType::Builtin(BuiltinType::Real)
        );
        assert_eq!(
            tree.lookup_variable(tree.root(), "x").unwrap().ty,
            ResolvedType::Builtin(BuiltinType::Integer)
        );
    }

    #[test]
    fn sibling_scopes_are_independent() {
        let mut tree = ScopeTree::new();
        let left = tree.create_child(tree.root());
        let right = tree.create_child(tree.root());
        tree.define_variable(left, "x", integer());
        assert!(tree.lookup_variable(right, "x").is_none());
    }

    #[test]
    fn overload_keys_differ_by_labels() {
        let labeled = Signature::new("move", vec![Some("to".to_string())]);
        let unlabeled = Signature::new("move", vec![None]);
        assert_ne!(labeled, unlabeled);
        assert_eq!(labeled.to_string(), "move(to:)");
        assert_eq!(unlabeled.to_string(), "move(_:)");
    }
}
