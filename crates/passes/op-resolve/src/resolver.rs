//! The resolution walk
//!
//! Statements resolve top to bottom; the first diagnostic aborts the
//! pass. Type declarations are allocated in the module arena and
//! registered under their name *before* their bodies resolve, so a
//! type's own name is visible inside it and self-referential fields
//! bind to the arena id instead of recursing.

use crate::scope::{ScopeId, ScopeTree, VariableBinding};
use op_hir::{
    BuiltinType, CompanionObject, Conformance, DataStructure, DeclId, Function, FunctionId,
    Module, Object, ResolvedExpression, ResolvedStatement, ResolvedType, Signature, TraitDecl,
    TraitRequirement, TypeDecl, Variable,
};
use op_parser::{
    ConformanceDeclaration, DataDeclaration, FunctionBody, FunctionDeclaration,
    ObjectDeclaration, StaticSection, TraitDeclaration, UnresolvedCall, UnresolvedExpression,
    UnresolvedStatement, VariableDeclaration,
};
use op_syntax::{Diagnostic, FileLocation, Labeled, Located, Semantics};

/// Purity context while a method body resolves
struct MethodContext {
    name: String,
    is_pure: bool,
}

/// Walks untyped statements into a typed [`Module`]
pub struct Resolver {
    module: Module,
    scopes: ScopeTree,
    /// The receiver type while a method body resolves
    self_type: Option<ResolvedType>,
    current_method: Option<MethodContext>,
    /// Declared return type of the enclosing function body
    return_hint: Option<ResolvedType>,
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            module: Module::default(),
            scopes: ScopeTree::new(),
            self_type: None,
            current_method: None,
            return_hint: None,
        }
    }

    /// Resolve a whole compilation unit
    pub fn run(mut self, statements: Vec<UnresolvedStatement>) -> Result<Module, Diagnostic> {
        let root = self.scopes.root();
        for statement in statements {
            if let Some(resolved) = self.resolve_statement(statement, root)? {
                self.module.statements.push(resolved);
            }
        }
        Ok(self.module)
    }

    // ---- statements ----

    fn resolve_statement(
        &mut self,
        statement: UnresolvedStatement,
        scope: ScopeId,
    ) -> Result<Option<ResolvedStatement>, Diagnostic> {
        match statement {
            UnresolvedStatement::Variable(declaration) => {
                let variable = self.resolve_variable(declaration, scope)?;
                Ok(Some(ResolvedStatement::Variable(variable)))
            }
            UnresolvedStatement::Function(declaration) => {
                self.resolve_free_function(declaration, scope)?;
                Ok(None)
            }
            UnresolvedStatement::Data(declaration) => {
                self.resolve_data(declaration, scope)?;
                Ok(None)
            }
            UnresolvedStatement::Object(declaration) => {
                self.resolve_object(declaration, scope)?;
                Ok(None)
            }
            UnresolvedStatement::Trait(declaration) => {
                self.resolve_trait(declaration, scope)?;
                Ok(None)
            }
            UnresolvedStatement::Conformance(declaration) => {
                self.resolve_conformance(declaration, scope)?;
                Ok(None)
            }
            UnresolvedStatement::Print(expression) => {
                let location = expression.location();
                let value = self.resolve_expression(expression, scope, None)?;
                if value.ty().is_none() {
                    return Err(Diagnostic::UnresolvedType { location });
                }
                Ok(Some(ResolvedStatement::Print(value)))
            }
            UnresolvedStatement::Return(expression) => {
                let location = expression.location();
                let hint = self.return_hint;
                let value = self.resolve_expression(expression, scope, hint)?;
                if let Some(expected) = hint {
                    self.check_type(expected, value.ty(), location)?;
                }
                Ok(Some(ResolvedStatement::Return(Some(value))))
            }
            UnresolvedStatement::Assign { target, value } => {
                let target_location = target.location();
                let value_location = value.location();
                let target = self.resolve_expression(target, scope, None)?;
                let Some(target_ty) = target.ty() else {
                    return Err(Diagnostic::UnresolvedType {
                        location: target_location,
                    });
                };
                if let Some(context) = &self.current_method {
                    if context.is_pure && Self::is_self_rooted(&target) {
                        return Err(Diagnostic::ImpureMethod {
                            method: context.name.clone(),
                            location: target_location,
                        });
                    }
                }
                let value = self.resolve_expression(value, scope, Some(target_ty))?;
                self.check_type(target_ty, value.ty(), value_location)?;
                Ok(Some(ResolvedStatement::Assign { target, value }))
            }
            UnresolvedStatement::Expression(expression) => {
                let value = self.resolve_expression(expression, scope, None)?;
                Ok(Some(ResolvedStatement::Expression(value)))
            }
        }
    }

    fn resolve_variable(
        &mut self,
        declaration: VariableDeclaration,
        scope: ScopeId,
    ) -> Result<Variable, Diagnostic> {
        let declared = declaration
            .ty
            .as_ref()
            .map(|annotation| self.resolve_type_name(annotation, scope))
            .transpose()?;
        let initializer_location = declaration
            .initializer
            .as_ref()
            .map(UnresolvedExpression::location);
        let initializer = declaration
            .initializer
            .map(|value| self.resolve_expression(value, scope, declared))
            .transpose()?;

        let ty = match (declared, initializer.as_ref().and_then(ResolvedExpression::ty)) {
            (Some(declared), Some(inferred)) => {
                if declared != inferred {
                    return Err(Diagnostic::TypeMismatch {
                        declared: declared.display_name(&self.module),
                        inferred: inferred.display_name(&self.module),
                        location: initializer_location
                            .unwrap_or(declaration.name.location),
                    });
                }
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(inferred)) => inferred,
            (None, None) => {
                return Err(Diagnostic::UnresolvedType {
                    location: declaration.name.location,
                });
            }
        };

        self.scopes.define_variable(
            scope,
            declaration.name.value.clone(),
            VariableBinding {
                ty,
                semantics: declaration.semantics.value,
            },
        );
        Ok(Variable {
            name: declaration.name,
            semantics: declaration.semantics.value,
            ty,
            initializer,
        })
    }

    // ---- functions ----

    fn resolve_free_function(
        &mut self,
        declaration: FunctionDeclaration,
        scope: ScopeId,
    ) -> Result<FunctionId, Diagnostic> {
        let id = self.declare_function(&declaration, None, scope)?;
        let signature = self.module.functions[id].signature.clone();
        self.scopes.define_function(scope, signature, id);
        self.resolve_function_body(declaration, id, scope, None)?;
        Ok(id)
    }

    /// Allocate a function with resolved signature, parameters, and
    /// return type; the body resolves in a later step so mutually
    /// recursive calls bind
    fn declare_function(
        &mut self,
        declaration: &FunctionDeclaration,
        owner: Option<ResolvedType>,
        scope: ScopeId,
    ) -> Result<FunctionId, Diagnostic> {
        let labels = declaration
            .parameters
            .iter()
            .map(|parameter| parameter.label.clone())
            .collect();
        let signature = Signature::new(declaration.name.value.clone(), labels);

        let mut parameters = Vec::new();
        for parameter in &declaration.parameters {
            let field = &parameter.value;
            let Some(annotation) = &field.ty else {
                return Err(Diagnostic::UnresolvedType {
                    location: field.name.location,
                });
            };
            let ty = self.resolve_type_name(annotation, scope)?;
            parameters.push(Variable {
                name: field.name.clone(),
                semantics: field.semantics.value,
                ty,
                initializer: None,
            });
        }

        let return_type = declaration
            .return_type
            .as_ref()
            .map(|annotation| self.resolve_type_name(annotation, scope))
            .transpose()?;

        Ok(self.module.functions.alloc(Function {
            name: declaration.name.clone(),
            is_pure: declaration.is_pure,
            is_mutating: declaration.is_mutating,
            owner,
            signature,
            parameters,
            return_type,
            body: Vec::new(),
        }))
    }

    fn resolve_function_body(
        &mut self,
        declaration: FunctionDeclaration,
        id: FunctionId,
        scope: ScopeId,
        self_type: Option<ResolvedType>,
    ) -> Result<(), Diagnostic> {
        let body_scope = self.scopes.create_child(scope);
        let parameters = self.module.functions[id].parameters.clone();
        for parameter in &parameters {
            self.scopes.define_variable(
                body_scope,
                parameter.name.value.clone(),
                VariableBinding {
                    ty: parameter.ty,
                    semantics: parameter.semantics,
                },
            );
        }

        let saved_self = std::mem::replace(&mut self.self_type, self_type);
        let saved_method = std::mem::replace(
            &mut self.current_method,
            self_type.map(|_| MethodContext {
                name: declaration.name.value.clone(),
                is_pure: declaration.is_pure,
            }),
        );
        let declared_return = self.module.functions[id].return_type;
        let saved_return = std::mem::replace(&mut self.return_hint, declared_return);

        let outcome = self.resolve_body(declaration, id, body_scope, declared_return);

        self.self_type = saved_self;
        self.current_method = saved_method;
        self.return_hint = saved_return;
        outcome
    }

    fn resolve_body(
        &mut self,
        declaration: FunctionDeclaration,
        id: FunctionId,
        body_scope: ScopeId,
        declared_return: Option<ResolvedType>,
    ) -> Result<(), Diagnostic> {
        match declaration.body {
            FunctionBody::ImplicitReturn(expression) => {
                let location = expression.location();
                let value = self.resolve_expression(expression, body_scope, declared_return)?;
                match declared_return {
                    Some(expected) => self.check_type(expected, value.ty(), location)?,
                    None => {
                        let Some(inferred) = value.ty() else {
                            return Err(Diagnostic::UnresolvedType {
                                location: declaration.name.location,
                            });
                        };
                        self.module.functions[id].return_type = Some(inferred);
                    }
                }
                self.module.functions[id].body = vec![ResolvedStatement::Return(Some(value))];
            }
            FunctionBody::Statements(statements) => {
                let mut body = Vec::new();
                for statement in statements {
                    if let Some(resolved) = self.resolve_statement(statement, body_scope)? {
                        body.push(resolved);
                    }
                }
                self.module.functions[id].body = body;
            }
        }
        Ok(())
    }

    // ---- type declarations ----

    fn resolve_data(
        &mut self,
        declaration: DataDeclaration,
        scope: ScopeId,
    ) -> Result<DeclId, Diagnostic> {
        // Register the name before the fields resolve so the type can
        // refer to itself.
        let id = self.module.types.alloc(TypeDecl::Data(DataStructure {
            name: declaration.name.clone(),
            fields: Vec::new(),
            companion: None,
            conformances: Vec::new(),
        }));
        self.scopes
            .define_type(scope, declaration.name.value.clone(), id);

        let fields = self.resolve_fields(declaration.fields, scope)?;
        self.data_mut(id).fields = fields;

        if let Some(section) = declaration.static_section {
            let companion =
                self.resolve_companion(section, id, &declaration.name.value, scope)?;
            self.data_mut(id).companion = Some(companion);
        }
        Ok(id)
    }

    fn resolve_object(
        &mut self,
        declaration: ObjectDeclaration,
        scope: ScopeId,
    ) -> Result<DeclId, Diagnostic> {
        let id = self.module.types.alloc(TypeDecl::Object(Object {
            name: declaration.name.clone(),
            is_abstract: declaration.is_abstract,
            supertype: None,
            fields: Vec::new(),
            methods: Vec::new(),
            factory_methods: Vec::new(),
            companion: None,
            conformances: Vec::new(),
        }));
        self.scopes
            .define_type(scope, declaration.name.value.clone(), id);

        if let Some(super_name) = &declaration.supertype {
            let super_id = self
                .scopes
                .lookup_type(scope, &super_name.value)
                .ok_or(Diagnostic::UnresolvedType {
                    location: super_name.location,
                })?;
            if self.module.types[super_id].as_object().is_none() {
                return Err(Diagnostic::UnresolvedType {
                    location: super_name.location,
                });
            }
            self.object_mut(id).supertype = Some(super_id);
        }

        let fields = self.resolve_fields(declaration.fields, scope)?;
        self.object_mut(id).fields = fields;

        let owner_ty = ResolvedType::Object(id);
        let mut method_ids = Vec::new();
        for method in &declaration.methods {
            method_ids.push(self.declare_function(method, Some(owner_ty), scope)?);
        }
        self.object_mut(id).methods = method_ids.clone();

        let mut factory_ids = Vec::new();
        for factory in &declaration.factory_methods {
            factory_ids.push(self.declare_function(factory, Some(owner_ty), scope)?);
        }
        self.object_mut(id).factory_methods = factory_ids.clone();

        if let Some(section) = declaration.static_section {
            let companion =
                self.resolve_companion(section, id, &declaration.name.value, scope)?;
            self.object_mut(id).companion = Some(companion);
        }

        for (method, method_id) in declaration.methods.into_iter().zip(method_ids) {
            self.resolve_function_body(method, method_id, scope, Some(owner_ty))?;
        }
        for (factory, factory_id) in declaration.factory_methods.into_iter().zip(factory_ids) {
            self.resolve_function_body(factory, factory_id, scope, Some(owner_ty))?;
        }
        Ok(id)
    }

    /// Register the `static:` section as a companion type plus a
    /// binding named after the owning type, so `Type.member` resolves
    /// through ordinary member lookup
    fn resolve_companion(
        &mut self,
        section: StaticSection,
        owner: DeclId,
        owner_name: &str,
        scope: ScopeId,
    ) -> Result<DeclId, Diagnostic> {
        let companion_name = format!("{owner_name}_static");
        let id = self.module.types.alloc(TypeDecl::Companion(CompanionObject {
            name: companion_name.clone(),
            owner,
            fields: Vec::new(),
            methods: Vec::new(),
        }));
        self.scopes.define_type(scope, companion_name, id);
        self.scopes.define_variable(
            scope,
            owner_name,
            VariableBinding {
                ty: ResolvedType::Companion(id),
                semantics: Semantics::Immutable,
            },
        );

        let fields = self.resolve_fields(section.fields, scope)?;
        self.companion_mut(id).fields = fields;

        let companion_ty = ResolvedType::Companion(id);
        let mut method_ids = Vec::new();
        for method in &section.methods {
            method_ids.push(self.declare_function(method, Some(companion_ty), scope)?);
        }
        self.companion_mut(id).methods = method_ids.clone();
        for (method, method_id) in section.methods.into_iter().zip(method_ids) {
            // Companion methods have no receiver.
            self.resolve_function_body(method, method_id, scope, None)?;
        }
        Ok(id)
    }

    fn resolve_trait(
        &mut self,
        declaration: TraitDeclaration,
        scope: ScopeId,
    ) -> Result<DeclId, Diagnostic> {
        let id = self.module.types.alloc(TypeDecl::Trait(TraitDecl {
            name: declaration.name.clone(),
            requirements: Vec::new(),
        }));
        self.scopes
            .define_type(scope, declaration.name.value.clone(), id);

        let mut requirements = Vec::new();
        for required in declaration.requirements {
            let labels = required
                .parameters
                .iter()
                .map(|parameter| parameter.label.clone())
                .collect();
            let mut parameters = Vec::new();
            for parameter in &required.parameters {
                let Some(annotation) = &parameter.value.ty else {
                    return Err(Diagnostic::UnresolvedType {
                        location: parameter.value.name.location,
                    });
                };
                parameters.push(self.resolve_type_name(annotation, scope)?);
            }
            let return_type = required
                .return_type
                .as_ref()
                .map(|annotation| self.resolve_type_name(annotation, scope))
                .transpose()?;
            requirements.push(TraitRequirement {
                signature: Signature::new(required.name.value, labels),
                parameters,
                return_type,
            });
        }
        match &mut self.module.types[id] {
            TypeDecl::Trait(decl) => decl.requirements = requirements,
            _ => unreachable!("freshly allocated trait changed kind"),
        }
        Ok(id)
    }

    fn resolve_conformance(
        &mut self,
        declaration: ConformanceDeclaration,
        scope: ScopeId,
    ) -> Result<(), Diagnostic> {
        let target_id = self
            .scopes
            .lookup_type(scope, &declaration.target.value)
            .ok_or(Diagnostic::UnresolvedType {
                location: declaration.target.location,
            })?;
        let target_ty = match &self.module.types[target_id] {
            TypeDecl::Data(_) => ResolvedType::Data(target_id),
            TypeDecl::Object(_) => ResolvedType::Object(target_id),
            _ => {
                return Err(Diagnostic::UnresolvedType {
                    location: declaration.target.location,
                });
            }
        };

        let trait_id = self
            .scopes
            .lookup_type(scope, &declaration.trait_name.value)
            .ok_or(Diagnostic::UnresolvedType {
                location: declaration.trait_name.location,
            })?;
        if self.module.types[trait_id].as_trait().is_none() {
            return Err(Diagnostic::UnresolvedType {
                location: declaration.trait_name.location,
            });
        }

        let mut method_ids = Vec::new();
        for method in &declaration.methods {
            method_ids.push(self.declare_function(method, Some(target_ty), scope)?);
        }

        // Every requirement needs an implementation under the same
        // overload key, collected in requirement order.
        let requirements: Vec<Signature> = match &self.module.types[trait_id] {
            TypeDecl::Trait(decl) => decl
                .requirements
                .iter()
                .map(|required| required.signature.clone())
                .collect(),
            _ => Vec::new(),
        };
        let mut ordered = Vec::new();
        for required in &requirements {
            let found = method_ids
                .iter()
                .copied()
                .find(|&id| self.module.functions[id].signature == *required)
                .ok_or_else(|| Diagnostic::UnknownFunction {
                    signature: required.to_string(),
                    location: declaration.target.location,
                })?;
            ordered.push(found);
        }

        let conformance = Conformance {
            trait_id,
            methods: ordered,
        };
        match &mut self.module.types[target_id] {
            TypeDecl::Data(data) => data.conformances.push(conformance),
            TypeDecl::Object(object) => object.conformances.push(conformance),
            _ => unreachable!("conformance target kind checked above"),
        }

        for (method, method_id) in declaration.methods.into_iter().zip(method_ids) {
            self.resolve_function_body(method, method_id, scope, Some(target_ty))?;
        }
        Ok(())
    }

    /// Structure fields: `name: type` or `name = default`, default
    /// semantics Isolated, never registered as scope variables
    fn resolve_fields(
        &mut self,
        fields: Vec<VariableDeclaration>,
        scope: ScopeId,
    ) -> Result<Vec<Variable>, Diagnostic> {
        let mut resolved = Vec::new();
        for field in fields {
            let declared = field
                .ty
                .as_ref()
                .map(|annotation| self.resolve_type_name(annotation, scope))
                .transpose()?;
            let initializer_location = field.initializer.as_ref().map(UnresolvedExpression::location);
            let initializer = field
                .initializer
                .map(|value| self.resolve_expression(value, scope, declared))
                .transpose()?;
            let ty = match (declared, initializer.as_ref().and_then(ResolvedExpression::ty)) {
                (Some(declared), Some(inferred)) if declared != inferred => {
                    return Err(Diagnostic::TypeMismatch {
                        declared: declared.display_name(&self.module),
                        inferred: inferred.display_name(&self.module),
                        location: initializer_location.unwrap_or(field.name.location),
                    });
                }
                (Some(declared), _) => declared,
                (None, Some(inferred)) => inferred,
                (None, None) => {
                    return Err(Diagnostic::UnresolvedType {
                        location: field.name.location,
                    });
                }
            };
            resolved.push(Variable {
                name: field.name,
                semantics: field.semantics.value,
                ty,
                initializer,
            });
        }
        Ok(resolved)
    }

    // ---- expressions ----

    fn resolve_expression(
        &mut self,
        expression: UnresolvedExpression,
        scope: ScopeId,
        hint: Option<ResolvedType>,
    ) -> Result<ResolvedExpression, Diagnostic> {
        match expression {
            UnresolvedExpression::Boolean(value, _) => Ok(ResolvedExpression::Boolean(value)),
            UnresolvedExpression::Integer(value, _) => {
                // The language's only coercion: an integer literal
                // adopts a hinted real type.
                if hint == Some(ResolvedType::Builtin(BuiltinType::Real)) {
                    Ok(ResolvedExpression::Real(value as f64))
                } else {
                    Ok(ResolvedExpression::Integer(value))
                }
            }
            UnresolvedExpression::Real(value, _) => Ok(ResolvedExpression::Real(value)),
            UnresolvedExpression::Bitfield(value, _) => Ok(ResolvedExpression::Bitfield(value)),
            UnresolvedExpression::Identifier(name, location) => {
                self.resolve_identifier(&name, location, scope)
            }
            UnresolvedExpression::StructureLiteral { fields, location } => {
                self.resolve_structure_literal(fields, location, scope, hint)
            }
            UnresolvedExpression::Unary {
                operator,
                operand,
                location,
            } => {
                let operand = self.resolve_expression(*operand, scope, hint)?;
                let Some(ty) = operand.ty() else {
                    return Err(Diagnostic::UnresolvedType { location });
                };
                Ok(ResolvedExpression::Unary {
                    operator,
                    operand: Box::new(operand),
                    ty,
                })
            }
            UnresolvedExpression::Binary {
                left,
                operator,
                right,
            } => {
                let left_location = left.location();
                let right_location = right.location();
                let left = self.resolve_expression(*left, scope, hint)?;
                let Some(ty) = left.ty() else {
                    return Err(Diagnostic::UnresolvedType {
                        location: left_location,
                    });
                };
                let right = self.resolve_expression(*right, scope, Some(ty))?;
                self.check_type(ty, right.ty(), right_location)?;
                Ok(ResolvedExpression::Binary {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                    ty,
                })
            }
            UnresolvedExpression::Member { target, member } => {
                let target_location = target.location();
                let target = self.resolve_expression(*target, scope, None)?;
                let Some(target_ty) = target.ty() else {
                    return Err(Diagnostic::UnresolvedType {
                        location: target_location,
                    });
                };
                let Some(ty) = self.find_field(target_ty, &member.value) else {
                    return Err(Diagnostic::UnknownVariable {
                        name: member.value,
                        location: member.location,
                    });
                };
                Ok(ResolvedExpression::Field {
                    target: Box::new(target),
                    field: member.value,
                    ty,
                    location: member.location,
                })
            }
            UnresolvedExpression::Call(call) => self.resolve_call(call, scope),
        }
    }

    fn resolve_identifier(
        &mut self,
        name: &str,
        location: FileLocation,
        scope: ScopeId,
    ) -> Result<ResolvedExpression, Diagnostic> {
        if name == "self" {
            return match self.self_type {
                Some(ty) => Ok(ResolvedExpression::SelfValue { ty }),
                None => Err(Diagnostic::UnknownVariable {
                    name: name.to_string(),
                    location,
                }),
            };
        }
        match self.scopes.lookup_variable(scope, name) {
            Some(binding) => Ok(ResolvedExpression::Variable {
                name: name.to_string(),
                ty: binding.ty,
            }),
            None => Err(Diagnostic::UnknownVariable {
                name: name.to_string(),
                location,
            }),
        }
    }

    /// A structure literal only types against a contextual data or
    /// object hint; without one it is unresolved
    fn resolve_structure_literal(
        &mut self,
        fields: Vec<(Located<String>, UnresolvedExpression)>,
        location: FileLocation,
        scope: ScopeId,
        hint: Option<ResolvedType>,
    ) -> Result<ResolvedExpression, Diagnostic> {
        let ty = match hint {
            Some(ty @ (ResolvedType::Data(_) | ResolvedType::Object(_))) => ty,
            _ => return Err(Diagnostic::UnresolvedType { location }),
        };
        let declared = self.collect_fields(ty);

        let mut provided = Vec::new();
        for (name, value) in fields {
            let Some((_, field_ty, _)) = declared
                .iter()
                .find(|(field_name, _, _)| *field_name == name.value)
            else {
                return Err(Diagnostic::UnknownVariable {
                    name: name.value,
                    location: name.location,
                });
            };
            let field_ty = *field_ty;
            let value_location = value.location();
            let value = self.resolve_expression(value, scope, Some(field_ty))?;
            self.check_type(field_ty, value.ty(), value_location)?;
            provided.push((name.value, value));
        }

        // Emit fields in declaration order; absent fields fall back to
        // their declared default when one exists.
        let mut ordered = Vec::new();
        for (field_name, _, default) in declared {
            if let Some(index) = provided.iter().position(|(name, _)| *name == field_name) {
                ordered.push(provided.remove(index));
            } else if let Some(default) = default {
                ordered.push((field_name, default));
            }
        }
        Ok(ResolvedExpression::StructureLiteral { ty, fields: ordered })
    }

    fn resolve_call(
        &mut self,
        call: UnresolvedCall,
        scope: ScopeId,
    ) -> Result<ResolvedExpression, Diagnostic> {
        let UnresolvedCall {
            target,
            name,
            arguments,
        } = call;
        let labels = arguments
            .iter()
            .map(|argument| argument.label.clone())
            .collect();
        let signature = Signature::new(name.value.clone(), labels);

        let Some(target) = target else {
            let id = self.scopes.lookup_function(scope, &signature).ok_or_else(|| {
                Diagnostic::UnknownFunction {
                    signature: signature.to_string(),
                    location: name.location,
                }
            })?;
            let arguments = self.resolve_arguments(arguments, id, scope)?;
            let ty = self.module.functions[id].return_type;
            return Ok(ResolvedExpression::Call {
                function: id,
                target: None,
                arguments,
                ty,
            });
        };

        // A bare type name as target dispatches statically even when
        // the type has no companion binding (factory calls).
        if let UnresolvedExpression::Identifier(target_name, _) = &*target {
            if self.scopes.lookup_variable(scope, target_name).is_none() {
                if let Some(type_id) = self.scopes.lookup_type(scope, target_name) {
                    return self.resolve_static_call(
                        type_id,
                        &signature,
                        arguments,
                        name.location,
                        scope,
                    );
                }
            }
        }

        let target_location = target.location();
        let target = self.resolve_expression(*target, scope, None)?;
        let Some(target_ty) = target.ty() else {
            return Err(Diagnostic::UnresolvedType {
                location: target_location,
            });
        };

        if let ResolvedType::Companion(companion_id) = target_ty {
            return self.resolve_companion_call(
                companion_id,
                &signature,
                arguments,
                name.location,
                scope,
            );
        }

        let Some(id) = self.find_method(target_ty, &signature) else {
            return Err(Diagnostic::UnknownFunction {
                signature: signature.to_string(),
                location: name.location,
            });
        };
        if let Some(context) = &self.current_method {
            if context.is_pure
                && matches!(target, ResolvedExpression::SelfValue { .. })
                && self.module.functions[id].is_mutating
            {
                return Err(Diagnostic::ImpureMethod {
                    method: context.name.clone(),
                    location: name.location,
                });
            }
        }
        let arguments = self.resolve_arguments(arguments, id, scope)?;
        let ty = self.module.functions[id].return_type;
        Ok(ResolvedExpression::Call {
            function: id,
            target: Some(Box::new(target)),
            arguments,
            ty,
        })
    }

    /// `Type.name(args)` where `Type` has no companion binding: only
    /// factory methods can answer
    fn resolve_static_call(
        &mut self,
        type_id: DeclId,
        signature: &Signature,
        arguments: Vec<Labeled<UnresolvedExpression>>,
        location: FileLocation,
        scope: ScopeId,
    ) -> Result<ResolvedExpression, Diagnostic> {
        if let Some(object) = self.module.types[type_id].as_object() {
            let factory = object
                .factory_methods
                .iter()
                .copied()
                .find(|&id| self.module.functions[id].signature == *signature);
            if let Some(id) = factory {
                let arguments = self.resolve_arguments(arguments, id, scope)?;
                return Ok(ResolvedExpression::FactoryCall {
                    object: type_id,
                    function: id,
                    arguments,
                });
            }
        }
        Err(Diagnostic::UnknownFunction {
            signature: signature.to_string(),
            location,
        })
    }

    /// Calls through a companion binding: companion methods first,
    /// then the owning object's factories
    fn resolve_companion_call(
        &mut self,
        companion_id: DeclId,
        signature: &Signature,
        arguments: Vec<Labeled<UnresolvedExpression>>,
        location: FileLocation,
        scope: ScopeId,
    ) -> Result<ResolvedExpression, Diagnostic> {
        let Some(companion) = self.module.types[companion_id].as_companion() else {
            unreachable!("companion type id resolved to a non-companion")
        };
        let owner = companion.owner;
        let method = companion
            .methods
            .iter()
            .copied()
            .find(|&id| self.module.functions[id].signature == *signature);

        if let Some(id) = method {
            let arguments = self.resolve_arguments(arguments, id, scope)?;
            let ty = self.module.functions[id].return_type;
            return Ok(ResolvedExpression::Call {
                function: id,
                target: None,
                arguments,
                ty,
            });
        }
        self.resolve_static_call(owner, signature, arguments, location, scope)
    }

    /// Arguments resolve against the bound function's parameter types;
    /// the overload key already fixed the arity
    fn resolve_arguments(
        &mut self,
        arguments: Vec<Labeled<UnresolvedExpression>>,
        function: FunctionId,
        scope: ScopeId,
    ) -> Result<Vec<ResolvedExpression>, Diagnostic> {
        let parameter_types: Vec<ResolvedType> = self.module.functions[function]
            .parameters
            .iter()
            .map(|parameter| parameter.ty)
            .collect();
        let mut resolved = Vec::new();
        for (argument, parameter_ty) in arguments.into_iter().zip(parameter_types) {
            let location = argument.value.location();
            let value = self.resolve_expression(argument.value, scope, Some(parameter_ty))?;
            self.check_type(parameter_ty, value.ty(), location)?;
            resolved.push(value);
        }
        Ok(resolved)
    }

    // ---- lookups ----

    fn resolve_type_name(
        &self,
        annotation: &Located<String>,
        scope: ScopeId,
    ) -> Result<ResolvedType, Diagnostic> {
        if let Some(builtin) = BuiltinType::from_name(&annotation.value) {
            return Ok(ResolvedType::Builtin(builtin));
        }
        let id = self
            .scopes
            .lookup_type(scope, &annotation.value)
            .ok_or(Diagnostic::UnresolvedType {
                location: annotation.location,
            })?;
        match &self.module.types[id] {
            TypeDecl::Data(_) => Ok(ResolvedType::Data(id)),
            TypeDecl::Object(_) => Ok(ResolvedType::Object(id)),
            TypeDecl::Companion(_) => Ok(ResolvedType::Companion(id)),
            TypeDecl::Trait(_) => Err(Diagnostic::UnresolvedType {
                location: annotation.location,
            }),
        }
    }

    /// Field lookup; objects search their own layer first, then the
    /// ancestor chain
    fn find_field(&self, ty: ResolvedType, name: &str) -> Option<ResolvedType> {
        match ty {
            ResolvedType::Builtin(_) => None,
            ResolvedType::Data(id) => self.module.types[id]
                .as_data()
                .and_then(|data| Self::field_in(&data.fields, name)),
            ResolvedType::Companion(id) => self.module.types[id]
                .as_companion()
                .and_then(|companion| Self::field_in(&companion.fields, name)),
            ResolvedType::Object(id) => {
                let object = self.module.types[id].as_object()?;
                Self::field_in(&object.fields, name).or_else(|| {
                    object
                        .supertype
                        .and_then(|super_id| self.find_field(ResolvedType::Object(super_id), name))
                })
            }
        }
    }

    fn field_in(fields: &[Variable], name: &str) -> Option<ResolvedType> {
        fields
            .iter()
            .find(|field| field.name.value == name)
            .map(|field| field.ty)
    }

    /// Method lookup by overload key: own methods, then conformance
    /// methods, then the ancestor chain
    fn find_method(&self, ty: ResolvedType, signature: &Signature) -> Option<FunctionId> {
        let matches_signature =
            |&id: &FunctionId| self.module.functions[id].signature == *signature;
        match ty {
            ResolvedType::Builtin(_) => None,
            ResolvedType::Data(id) => {
                let data = self.module.types[id].as_data()?;
                data.conformances
                    .iter()
                    .flat_map(|conformance| conformance.methods.iter())
                    .copied()
                    .find(|id| matches_signature(id))
            }
            ResolvedType::Companion(id) => {
                let companion = self.module.types[id].as_companion()?;
                companion.methods.iter().copied().find(|id| matches_signature(id))
            }
            ResolvedType::Object(id) => {
                let object = self.module.types[id].as_object()?;
                object
                    .methods
                    .iter()
                    .copied()
                    .find(|id| matches_signature(id))
                    .or_else(|| {
                        object
                            .conformances
                            .iter()
                            .flat_map(|conformance| conformance.methods.iter())
                            .copied()
                            .find(|id| matches_signature(id))
                    })
                    .or_else(|| {
                        object.supertype.and_then(|super_id| {
                            self.find_method(ResolvedType::Object(super_id), signature)
                        })
                    })
            }
        }
    }

    /// All fields of a type in layout order (ancestors first for
    /// objects), with declared types and default initializers
    fn collect_fields(
        &self,
        ty: ResolvedType,
    ) -> Vec<(String, ResolvedType, Option<ResolvedExpression>)> {
        fn layer(fields: &[Variable]) -> Vec<(String, ResolvedType, Option<ResolvedExpression>)> {
            fields
                .iter()
                .map(|field| (field.name.value.clone(), field.ty, field.initializer.clone()))
                .collect()
        }
        match ty {
            ResolvedType::Builtin(_) => Vec::new(),
            ResolvedType::Data(id) => self.module.types[id]
                .as_data()
                .map(|data| layer(&data.fields))
                .unwrap_or_default(),
            ResolvedType::Companion(id) => self.module.types[id]
                .as_companion()
                .map(|companion| layer(&companion.fields))
                .unwrap_or_default(),
            ResolvedType::Object(id) => {
                let Some(object) = self.module.types[id].as_object() else {
                    return Vec::new();
                };
                let mut collected = object
                    .supertype
                    .map(|super_id| self.collect_fields(ResolvedType::Object(super_id)))
                    .unwrap_or_default();
                collected.extend(layer(&object.fields));
                collected
            }
        }
    }

    // ---- helpers ----

    fn check_type(
        &self,
        expected: ResolvedType,
        actual: Option<ResolvedType>,
        location: FileLocation,
    ) -> Result<(), Diagnostic> {
        match actual {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(Diagnostic::TypeMismatch {
                declared: expected.display_name(&self.module),
                inferred: actual.display_name(&self.module),
                location,
            }),
            None => Err(Diagnostic::UnresolvedType { location }),
        }
    }

    fn is_self_rooted(expression: &ResolvedExpression) -> bool {
        match expression {
            ResolvedExpression::SelfValue { .. } => true,
            ResolvedExpression::Field { target, .. } => Self::is_self_rooted(target),
            _ => false,
        }
    }

    fn data_mut(&mut self, id: DeclId) -> &mut DataStructure {
        match &mut self.module.types[id] {
            TypeDecl::Data(data) => data,
            _ => unreachable!("id allocated as a data declaration"),
        }
    }

    fn object_mut(&mut self, id: DeclId) -> &mut Object {
        match &mut self.module.types[id] {
            TypeDecl::Object(object) => object,
            _ => unreachable!("id allocated as an object declaration"),
        }
    }

    fn companion_mut(&mut self, id: DeclId) -> &mut CompanionObject {
        match &mut self.module.types[id] {
            TypeDecl::Companion(companion) => companion,
            _ => unreachable!("id allocated as a companion declaration"),
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_source(source: &str) -> Result<Module, Diagnostic> {
        crate::resolve(op_parser::parse_source(source)?)
    }

    fn initializer(module: &Module, index: usize) -> &ResolvedExpression {
        let ResolvedStatement::Variable(variable) = &module.statements[index] else {
            panic!("expected a variable statement");
        };
        variable.initializer.as_ref().unwrap()
    }

    #[test]
    fn annotated_literal_mismatch_reports_both_names_and_location() {
        let error = resolve_source("let x: integer = 2.0").unwrap_err();
        assert_eq!(
            error,
            Diagnostic::TypeMismatch {
                declared: "integer".to_string(),
                inferred: "real".to_string(),
                location: FileLocation::new(1, 18),
            }
        );
    }

    #[test]
    fn integer_literal_adopts_hinted_real() {
        let module = resolve_source("let x: real = 27").unwrap();
        let ResolvedExpression::Real(value) = initializer(&module, 0) else {
            panic!("expected coercion to a real literal");
        };
        assert!((value - 27.0).abs() < f64::EPSILON);
    }

    #[test]
    fn coercion_is_for_literals_only() {
        let error = resolve_source("let y: integer = 1\nlet x: real = y").unwrap_err();
        assert!(matches!(
            error,
            Diagnostic::TypeMismatch { declared, inferred, .. }
                if declared == "real" && inferred == "integer"
        ));
    }

    #[test]
    fn structure_literal_fields_type_contextually() {
        let source = "data Point {\nx: real\ny: real\n}\nlet p: Point = {x: 1, y: 2}";
        let module = resolve_source(source).unwrap();
        let ResolvedExpression::StructureLiteral { fields, .. } = initializer(&module, 0) else {
            panic!("expected a structure literal");
        };
        assert_eq!(fields.len(), 2);
        assert!(matches!(fields[0].1, ResolvedExpression::Real(_)));
        assert!(matches!(fields[1].1, ResolvedExpression::Real(_)));
    }

    #[test]
    fn structure_literal_without_context_is_unresolved() {
        let error = resolve_source("data Point {\nx: real\n}\nlet p = {x: 1}").unwrap_err();
        assert!(matches!(error, Diagnostic::UnresolvedType { .. }));
    }

    #[test]
    fn overload_key_miss_is_unknown_function() {
        let source = "func greet(to name: integer) {\n}\ngreet(4)";
        let error = resolve_source(source).unwrap_err();
        assert_eq!(
            error,
            Diagnostic::UnknownFunction {
                signature: "greet(_:)".to_string(),
                location: FileLocation::new(3, 1),
            }
        );
    }

    #[test]
    fn member_chain_resolves_with_per_level_locations() {
        let source = "data Inner { value: integer }\n\
                      data Middle { inner: Inner }\n\
                      data Outer { middle: Middle }\n\
                      let o: Outer = {middle: {inner: {value: 3}}}\n\
                      let v: integer = o.middle.inner.value";
        let module = resolve_source(source).unwrap();
        let ResolvedExpression::Field {
            target, location, ..
        } = initializer(&module, 1)
        else {
            panic!("expected a member chain");
        };
        assert_eq!(*location, FileLocation::new(5, 33));
        let ResolvedExpression::Field { location, .. } = target.as_ref() else {
            panic!("expected a nested member lookup");
        };
        assert_eq!(*location, FileLocation::new(5, 27));
    }

    #[test]
    fn unknown_member_names_the_offending_level() {
        let source = "data Inner { value: integer }\n\
                      data Outer { inner: Inner }\n\
                      let o: Outer = {inner: {value: 3}}\n\
                      let v: integer = o.missing.value";
        let error = resolve_source(source).unwrap_err();
        assert_eq!(
            error,
            Diagnostic::UnknownVariable {
                name: "missing".to_string(),
                location: FileLocation::new(4, 20),
            }
        );
    }

    #[test]
    fn companion_resolves_from_outside_and_inside() {
        let source = "data Counter {\n\
                      value: integer\n\
                      static:\n\
                      let start: integer = 7\n\
                      func origin() -> integer => Counter.start\n\
                      }\n\
                      let s: integer = Counter.start\n\
                      let t: integer = Counter.origin()";
        let module = resolve_source(source).unwrap();
        assert!(matches!(
            initializer(&module, 0),
            ResolvedExpression::Field { .. }
        ));
        assert!(matches!(
            initializer(&module, 1),
            ResolvedExpression::Call { target: None, .. }
        ));
    }

    #[test]
    fn self_referential_field_binds_through_preregistration() {
        let module = resolve_source("data Node {\nnext: Node\n}").unwrap();
        let (id, decl) = module.types.iter().next().unwrap();
        let data = decl.as_data().unwrap();
        assert_eq!(data.fields[0].ty, ResolvedType::Data(id));
    }

    #[test]
    fn unknown_variable_reports_name_and_location() {
        let error = resolve_source("print missing").unwrap_err();
        assert_eq!(
            error,
            Diagnostic::UnknownVariable {
                name: "missing".to_string(),
                location: FileLocation::new(1, 7),
            }
        );
    }

    #[test]
    fn fields_resolve_through_the_ancestor_chain() {
        let source = "object A {\ndata:\na: integer\n}\n\
                      object B: A {\ndata:\nb: integer\n}\n\
                      object C: B {\ndata:\nc: integer\n}\n\
                      func sum(of c: C) -> integer => c.a + c.b + c.c";
        resolve_source(source).unwrap();
    }

    #[test]
    fn factory_call_produces_the_object_type() {
        let source = "object Point {\nfactory:\nfunc origin() {\n}\n}\n\
                      let p: Point = Point.origin()";
        let module = resolve_source(source).unwrap();
        assert!(matches!(
            initializer(&module, 0),
            ResolvedExpression::FactoryCall { .. }
        ));
    }

    #[test]
    fn pure_method_must_not_assign_to_self() {
        let source = "object Box {\n\
                      func poke() {\n\
                      self.value = 3\n\
                      }\n\
                      data:\n\
                      value: integer\n\
                      }";
        let error = resolve_source(source).unwrap_err();
        assert!(matches!(
            error,
            Diagnostic::ImpureMethod { method, .. } if method == "poke"
        ));
    }

    #[test]
    fn mutating_methods_may_assign_to_self() {
        let source = "object Box {\n\
                      mutating:\n\
                      func poke() {\n\
                      self.value = 3\n\
                      }\n\
                      data:\n\
                      value: integer\n\
                      }";
        resolve_source(source).unwrap();
    }

    #[test]
    fn pure_method_must_not_call_mutating_on_self() {
        let source = "object Jar {\n\
                      func sneak() {\n\
                      self.fill()\n\
                      }\n\
                      mutating:\n\
                      func fill() {\n\
                      self.level = 1\n\
                      }\n\
                      data:\n\
                      level: integer\n\
                      }";
        let error = resolve_source(source).unwrap_err();
        assert!(matches!(
            error,
            Diagnostic::ImpureMethod { method, .. } if method == "sneak"
        ));
    }

    #[test]
    fn conformance_missing_requirement_is_unknown_function() {
        let source = "trait Drawable {\nfunc draw() -> integer\n}\n\
                      data Dot {\nx: integer\n}\n\
                      model Dot: Drawable {\n}";
        let error = resolve_source(source).unwrap_err();
        assert!(matches!(
            error,
            Diagnostic::UnknownFunction { signature, .. } if signature == "draw()"
        ));
    }

    #[test]
    fn conformance_methods_answer_instance_calls() {
        let source = "trait Drawable {\nfunc draw() -> integer\n}\n\
                      data Dot {\nx: integer\n}\n\
                      model Dot: Drawable {\nfunc draw() -> integer => self.x\n}\n\
                      let d: Dot = {x: 1}\n\
                      let n: integer = d.draw()";
        let module = resolve_source(source).unwrap();
        assert!(matches!(
            initializer(&module, 1),
            ResolvedExpression::Call { target: Some(_), .. }
        ));
    }

    #[test]
    fn argument_adopts_hinted_parameter_type() {
        let source = "func half(of value: real) -> real => value\nlet h: real = half(of: 2)";
        resolve_source(source).unwrap();
    }

    #[test]
    fn implicit_body_infers_the_return_type() {
        let source = "func three() => 3\nlet x: integer = three()";
        let module = resolve_source(source).unwrap();
        let (_, function) = module.functions.iter().next().unwrap();
        assert_eq!(
            function.return_type,
            Some(ResolvedType::Builtin(BuiltinType::Integer))
        );
    }
}
