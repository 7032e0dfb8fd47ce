//! The lowering walk

use crate::mangle::{self, type_names};
use op_cir::{CExpr, CField, CParameter, CStmt, CType};
use op_hir::{
    BuiltinType, DeclId, Function, FunctionId, Module, ResolvedExpression, ResolvedStatement,
    ResolvedType, TypeDecl, Variable,
};
use op_syntax::Semantics;
use rustc_hash::FxHashSet;

/// Lower a resolved module into C IR statements, emission-ordered:
/// struct declarations, prototypes, globals, functions, `main`
pub fn lower(module: &Module) -> Vec<CStmt> {
    LoweringContext::new(module).run()
}

/// One lowering invocation; owns the de-duplication set for emitted
/// structure types
pub struct LoweringContext<'m> {
    module: &'m Module,
    lowered_types: FxHashSet<DeclId>,
    structs: Vec<CStmt>,
    prototypes: Vec<CStmt>,
    globals: Vec<CStmt>,
    functions: Vec<CStmt>,
    temp_counter: usize,
    /// Factories lower to void functions; their returns drop the value
    in_factory: bool,
}

impl<'m> LoweringContext<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self {
            module,
            lowered_types: FxHashSet::default(),
            structs: Vec::new(),
            prototypes: Vec::new(),
            globals: Vec::new(),
            functions: Vec::new(),
            temp_counter: 0,
            in_factory: false,
        }
    }

    pub fn run(mut self) -> Vec<CStmt> {
        let module = self.module;

        // Forward typedefs let layer structs hold pointers to types
        // declared later (including themselves).
        for (_, decl) in module.types.iter() {
            if matches!(decl, TypeDecl::Data(_) | TypeDecl::Object(_)) {
                self.structs.push(CStmt::StructDecl {
                    name: decl.name().to_string(),
                    fields: Vec::new(),
                    typedef: true,
                });
            }
        }

        for (id, _) in module.types.iter() {
            self.lower_type(id);
        }
        for (id, function) in module.functions.iter() {
            if function.owner.is_none() {
                self.lower_function(id);
            }
        }
        let main = self.lower_main();

        let mut program = self.structs;
        program.append(&mut self.prototypes);
        program.append(&mut self.globals);
        program.append(&mut self.functions);
        program.push(main);
        program
    }

    // ---- types ----

    fn lower_type(&mut self, id: DeclId) {
        if !self.lowered_types.insert(id) {
            return;
        }
        let module = self.module;
        match &module.types[id] {
            TypeDecl::Data(_) => self.lower_data(id),
            TypeDecl::Object(_) => self.lower_object(id),
            TypeDecl::Companion(_) => self.lower_companion(id),
            TypeDecl::Trait(_) => self.lower_trait(id),
        }
    }

    fn lower_data(&mut self, id: DeclId) {
        let module = self.module;
        let Some(data) = module.types[id].as_data() else {
            unreachable!("lower_data called on a non-data declaration")
        };
        let name = data.name.value.clone();

        self.lower_field_dependencies(&data.fields);
        self.push_layer_struct(&name, &data.fields);
        self.push_instance_struct(&name, &[(name.clone(), !data.fields.is_empty())]);

        if let Some(companion) = data.companion {
            self.lower_type(companion);
        }

        let tables = self.lower_conformances(id, &name);
        self.globals.push(CStmt::Global {
            ty: CType::named("__opal_data_type"),
            name: type_names::data_descriptor(&name),
            initializer: Some(CExpr::StructInit(descriptor_fields(&name, tables))),
            is_const: false,
        });
        self.globals.push(CStmt::Global {
            ty: CType::named("__opal_type_info"),
            name: type_names::info(&name),
            initializer: Some(CExpr::StructInit(vec![(
                "data".to_string(),
                CExpr::name(type_names::data_descriptor(&name)).address_of(),
            )])),
            is_const: true,
        });
    }

    fn lower_object(&mut self, id: DeclId) {
        let module = self.module;
        let Some(object) = module.types[id].as_object() else {
            unreachable!("lower_object called on a non-object declaration")
        };
        let name = object.name.value.clone();

        if let Some(super_id) = object.supertype {
            self.lower_type(super_id);
        }
        self.lower_field_dependencies(&object.fields);
        self.push_layer_struct(&name, &object.fields);

        // Ancestor layers root-first, own layer last; reinterpreting
        // an instance pointer as an ancestor stays layout-compatible.
        let layers: Vec<(String, bool)> = self
            .ancestry(id)
            .iter()
            .map(|&ancestor| {
                let Some(ancestor_object) = module.types[ancestor].as_object() else {
                    unreachable!("object ancestry contains a non-object")
                };
                (
                    ancestor_object.name.value.clone(),
                    !ancestor_object.fields.is_empty(),
                )
            })
            .collect();
        self.push_instance_struct(&name, &layers);

        if let Some(companion) = object.companion {
            self.lower_type(companion);
        }

        let method_ids = object.methods.clone();
        let factory_ids = object.factory_methods.clone();
        for &method in &method_ids {
            self.lower_function(method);
        }
        for &factory in &factory_ids {
            self.lower_function(factory);
        }

        let has_vtable = !method_ids.is_empty();
        if has_vtable {
            let fields = method_ids
                .iter()
                .map(|&method| self.vtable_field(method, CType::named(&name).pointer_to()))
                .collect();
            self.structs.push(CStmt::StructDecl {
                name: type_names::vtable_struct(&name),
                fields,
                typedef: false,
            });
            let entries = method_ids
                .iter()
                .map(|&method| {
                    let function = &module.functions[method];
                    (
                        mangle::vtable_member(&function.name.value, &function.signature.labels),
                        CExpr::name(self.symbol(method)),
                    )
                })
                .collect();
            self.globals.push(CStmt::Global {
                ty: CType::Struct(type_names::vtable_struct(&name)),
                name: type_names::vtable_instance(&name),
                initializer: Some(CExpr::StructInit(entries)),
                is_const: true,
            });
        }

        let tables = self.lower_conformances(id, &name);
        let mut fields = descriptor_fields(&name, tables);
        fields.push((
            "vtable".to_string(),
            if has_vtable {
                CExpr::Cast {
                    ty: CType::Void.pointer_to(),
                    value: Box::new(CExpr::name(type_names::vtable_instance(&name)).address_of()),
                }
            } else {
                CExpr::name("NULL")
            },
        ));
        fields.push((
            "super".to_string(),
            match object.supertype {
                Some(super_id) => {
                    CExpr::name(type_names::object_descriptor(module.type_name(super_id)))
                        .address_of()
                }
                None => CExpr::name("NULL"),
            },
        ));
        self.globals.push(CStmt::Global {
            ty: CType::named("__opal_object_type"),
            name: type_names::object_descriptor(&name),
            initializer: Some(CExpr::StructInit(fields)),
            is_const: false,
        });
        self.globals.push(CStmt::Global {
            ty: CType::named("__opal_type_info"),
            name: type_names::info(&name),
            initializer: Some(CExpr::StructInit(vec![(
                "object".to_string(),
                CExpr::name(type_names::object_descriptor(&name)).address_of(),
            )])),
            is_const: true,
        });
    }

    fn lower_companion(&mut self, id: DeclId) {
        let module = self.module;
        let Some(companion) = module.types[id].as_companion() else {
            unreachable!("lower_companion called on a non-companion declaration")
        };
        let name = companion.name.clone();
        let struct_name = type_names::companion_struct(module.type_name(companion.owner));

        self.lower_field_dependencies(&companion.fields);
        let fields = companion
            .fields
            .iter()
            .map(|field| CField::Plain {
                ty: self.ctype(field.ty),
                name: field.name.value.clone(),
            })
            .collect();
        self.structs.push(CStmt::StructDecl {
            name: struct_name.clone(),
            fields,
            typedef: false,
        });

        // The singleton global, initialized from the field defaults.
        // Allocating defaults cannot appear in a C global initializer;
        // they start NULL.
        let mut prelude = Vec::new();
        let values = companion
            .fields
            .iter()
            .map(|field| {
                let value = match &field.initializer {
                    Some(
                        ResolvedExpression::StructureLiteral { .. }
                        | ResolvedExpression::FactoryCall { .. },
                    ) => CExpr::name("NULL"),
                    Some(value) => self.lower_expression(value, &mut prelude),
                    None if field.ty.is_reference_counted() => CExpr::name("NULL"),
                    None => CExpr::Int(0),
                };
                (field.name.value.clone(), value)
            })
            .collect();
        debug_assert!(prelude.is_empty(), "companion defaults must be constant");
        self.globals.push(CStmt::Global {
            ty: CType::Struct(struct_name),
            name,
            initializer: Some(CExpr::StructInit(values)),
            is_const: false,
        });

        for &method in &companion.methods {
            self.lower_function(method);
        }
    }

    fn lower_trait(&mut self, id: DeclId) {
        let module = self.module;
        let Some(decl) = module.types[id].as_trait() else {
            unreachable!("lower_trait called on a non-trait declaration")
        };
        let name = decl.name.value.clone();

        // Requirement entries take the receiver untyped; conformances
        // provide concretely-typed functions behind them.
        let fields = decl
            .requirements
            .iter()
            .map(|required| {
                let mut parameters = vec![CType::Void.pointer_to()];
                parameters.extend(required.parameters.iter().map(|&ty| self.ctype(ty)));
                CField::FnPtr {
                    returns: required
                        .return_type
                        .map_or(CType::Void, |ty| self.ctype(ty)),
                    name: mangle::vtable_member(
                        &required.signature.name,
                        &required.signature.labels,
                    ),
                    parameters,
                }
            })
            .collect();
        self.structs.push(CStmt::StructDecl {
            name: type_names::trait_vtable_struct(&name),
            fields,
            typedef: true,
        });
        self.globals.push(CStmt::Global {
            ty: CType::named("__opal_trait_descriptor"),
            name: type_names::trait_descriptor(&name),
            initializer: Some(CExpr::StructInit(vec![(
                "name".to_string(),
                CExpr::Str(name.clone()),
            )])),
            is_const: true,
        });
    }

    /// Lower a type's conformances: their methods, one v-table
    /// instance per (type, trait) pair, and the descriptor's parallel
    /// trait tables
    fn lower_conformances(&mut self, id: DeclId, type_name: &str) -> TraitTables {
        let module = self.module;
        let conformances = match &module.types[id] {
            TypeDecl::Data(data) => data.conformances.clone(),
            TypeDecl::Object(object) => object.conformances.clone(),
            _ => Vec::new(),
        };

        let mut tables = TraitTables::default();
        for conformance in conformances {
            self.lower_type(conformance.trait_id);
            let trait_name = module.type_name(conformance.trait_id).to_string();

            let entries = conformance
                .methods
                .iter()
                .map(|&method| {
                    self.lower_function(method);
                    let function = &module.functions[method];
                    (
                        mangle::vtable_member(&function.name.value, &function.signature.labels),
                        CExpr::Cast {
                            ty: CType::Void.pointer_to(),
                            value: Box::new(CExpr::name(self.symbol(method))),
                        },
                    )
                })
                .collect();
            let vtable_name = type_names::conformance_vtable(type_name, &trait_name);
            self.globals.push(CStmt::Global {
                ty: CType::named(type_names::trait_vtable_struct(&trait_name)),
                name: vtable_name.clone(),
                initializer: Some(CExpr::StructInit(entries)),
                is_const: true,
            });

            tables
                .descriptors
                .push(CExpr::name(type_names::trait_descriptor(&trait_name)).address_of());
            tables.vtables.push(CExpr::Cast {
                ty: CType::Void.pointer_to(),
                value: Box::new(CExpr::name(vtable_name).address_of()),
            });
        }
        tables
    }

    /// Make sure every reference-counted field type is declared before
    /// the struct that points at it
    fn lower_field_dependencies(&mut self, fields: &[Variable]) {
        for field in fields {
            if let Some(decl) = field.ty.decl() {
                self.lower_type(decl);
            }
        }
    }

    /// `struct __T_data { ... };` — omitted entirely for a level with
    /// no fields, since C forbids empty structs
    fn push_layer_struct(&mut self, type_name: &str, fields: &[Variable]) {
        if fields.is_empty() {
            return;
        }
        let fields = fields
            .iter()
            .map(|field| CField::Plain {
                ty: self.ctype(field.ty),
                name: field.name.value.clone(),
            })
            .collect();
        self.structs.push(CStmt::StructDecl {
            name: type_names::layer(type_name),
            fields,
            typedef: false,
        });
    }

    /// The instance struct: header first, then one member per
    /// inheritance level, root-first
    fn push_instance_struct(&mut self, type_name: &str, layers: &[(String, bool)]) {
        let mut fields = vec![CField::Plain {
            ty: CType::named("__opal_rc_header"),
            name: "header".to_string(),
        }];
        for (layer_name, has_fields) in layers {
            if *has_fields {
                fields.push(CField::Plain {
                    ty: CType::Struct(type_names::layer(layer_name)),
                    name: layer_name.clone(),
                });
            }
        }
        self.structs.push(CStmt::StructDecl {
            name: type_name.to_string(),
            fields,
            typedef: false,
        });
    }

    /// The inheritance chain of an object, root ancestor first, the
    /// object itself last
    fn ancestry(&self, id: DeclId) -> Vec<DeclId> {
        let module = self.module;
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(level) = current {
            chain.push(level);
            current = module.types[level]
                .as_object()
                .and_then(|object| object.supertype);
        }
        chain.reverse();
        chain
    }

    fn vtable_field(&self, method: FunctionId, self_ty: CType) -> CField {
        let function = &self.module.functions[method];
        let mut parameters = vec![self_ty];
        parameters.extend(function.parameters.iter().map(|p| self.ctype(p.ty)));
        CField::FnPtr {
            returns: function.return_type.map_or(CType::Void, |ty| self.ctype(ty)),
            name: mangle::vtable_member(&function.name.value, &function.signature.labels),
            parameters,
        }
    }

    // ---- functions ----

    fn lower_function(&mut self, id: FunctionId) {
        let module = self.module;
        let function = &module.functions[id];
        let symbol = self.symbol(id);
        let is_factory = self.is_factory(id);

        let mut parameters = Vec::new();
        if let Some(owner @ (ResolvedType::Data(_) | ResolvedType::Object(_))) = function.owner {
            parameters.push(CParameter {
                ty: self.ctype(owner),
                name: "self".to_string(),
            });
        }
        for parameter in &function.parameters {
            parameters.push(CParameter {
                ty: self.ctype(parameter.ty),
                name: parameter.name.value.clone(),
            });
        }
        let returns = if is_factory {
            CType::Void
        } else {
            function.return_type.map_or(CType::Void, |ty| self.ctype(ty))
        };

        self.prototypes.push(CStmt::Prototype {
            name: symbol.clone(),
            returns: returns.clone(),
            parameters: parameters.clone(),
        });

        let saved = std::mem::replace(&mut self.in_factory, is_factory);
        let body = self.lower_statements(&function.body);
        self.in_factory = saved;

        self.functions.push(CStmt::Function {
            name: symbol,
            returns,
            parameters,
            body,
        });
    }

    /// Top-level non-function statements collect into `main`, with the
    /// reference-counted locals released before the final `return 0`
    fn lower_main(&mut self) -> CStmt {
        let module = self.module;
        let mut body = self.lower_statements(&module.statements);
        for statement in module.statements.iter().rev() {
            if let ResolvedStatement::Variable(variable) = statement {
                if variable.ty.is_reference_counted() {
                    body.push(CStmt::Expression(CExpr::call(
                        "__opal_release",
                        vec![CExpr::name(variable.name.value.clone())],
                    )));
                }
            }
        }
        body.push(CStmt::Return(Some(CExpr::Int(0))));
        CStmt::Function {
            name: "main".to_string(),
            returns: CType::named("int"),
            parameters: Vec::new(),
            body,
        }
    }

    // ---- statements ----

    fn lower_statements(&mut self, statements: &[ResolvedStatement]) -> Vec<CStmt> {
        let mut lowered = Vec::new();
        for statement in statements {
            self.lower_statement(statement, &mut lowered);
        }
        lowered
    }

    fn lower_statement(&mut self, statement: &ResolvedStatement, out: &mut Vec<CStmt>) {
        match statement {
            ResolvedStatement::Variable(variable) => self.lower_variable(variable, out),
            ResolvedStatement::Print(value) => self.lower_print(value, out),
            ResolvedStatement::Return(value) => {
                if self.in_factory {
                    out.push(CStmt::Return(None));
                    return;
                }
                let value = value
                    .as_ref()
                    .map(|value| self.lower_expression(value, out));
                out.push(CStmt::Return(value));
            }
            ResolvedStatement::Assign { target, value } => self.lower_assign(target, value, out),
            ResolvedStatement::Expression(value) => {
                // A mutating call through a pointer root copies-on-write
                // before the mutation.
                if let ResolvedExpression::Call {
                    function,
                    target: Some(receiver),
                    ..
                } = value
                {
                    if self.module.functions[*function].is_mutating {
                        self.push_pre_modify(receiver, out);
                    }
                }
                let value = self.lower_expression(value, out);
                out.push(CStmt::Expression(value));
            }
        }
    }

    fn lower_variable(&mut self, variable: &Variable, out: &mut Vec<CStmt>) {
        let ty = self.ctype(variable.ty);
        let name = variable.name.value.clone();
        match &variable.initializer {
            Some(ResolvedExpression::StructureLiteral { ty: literal_ty, fields }) => {
                out.push(CStmt::Declare {
                    ty,
                    name: name.clone(),
                    initializer: Some(self.alloc_call(*literal_ty, variable.semantics)),
                });
                self.assign_literal_fields(CExpr::name(name), *literal_ty, fields, out);
            }
            Some(ResolvedExpression::FactoryCall {
                object,
                function,
                arguments,
            }) => {
                out.push(CStmt::Declare {
                    ty,
                    name: name.clone(),
                    initializer: Some(
                        self.alloc_call(ResolvedType::Object(*object), variable.semantics),
                    ),
                });
                let mut call_arguments = vec![CExpr::name(name)];
                for argument in arguments {
                    let lowered = self.lower_expression(argument, out);
                    call_arguments.push(lowered);
                }
                out.push(CStmt::Expression(CExpr::call(
                    self.symbol(*function),
                    call_arguments,
                )));
            }
            // Binding one reference-counted value to a second variable
            // shares the allocation.
            Some(source @ ResolvedExpression::Variable { ty: source_ty, .. })
                if source_ty.is_reference_counted() =>
            {
                let source = self.lower_expression(source, out);
                out.push(CStmt::Declare {
                    ty,
                    name,
                    initializer: Some(CExpr::call("__opal_retain", vec![source])),
                });
            }
            Some(value) => {
                let value = self.lower_expression(value, out);
                out.push(CStmt::Declare {
                    ty,
                    name,
                    initializer: Some(value),
                });
            }
            None if variable.ty.is_reference_counted() => out.push(CStmt::Declare {
                ty,
                name,
                initializer: Some(CExpr::name("NULL")),
            }),
            None => out.push(CStmt::Declare {
                ty,
                name,
                initializer: None,
            }),
        }
    }

    fn lower_assign(
        &mut self,
        target: &ResolvedExpression,
        value: &ResolvedExpression,
        out: &mut Vec<CStmt>,
    ) {
        if let ResolvedExpression::Field { target: owner, .. } = target {
            self.push_pre_modify(owner, out);
        }
        let target_expr = self.lower_expression(target, out);
        match value {
            ResolvedExpression::StructureLiteral { ty, fields } => {
                out.push(CStmt::Assign {
                    target: target_expr.clone(),
                    value: self.alloc_call(*ty, Semantics::Isolated),
                });
                self.assign_literal_fields(target_expr, *ty, fields, out);
            }
            value => {
                let value = self.lower_expression(value, out);
                out.push(CStmt::Assign {
                    target: target_expr,
                    value,
                });
            }
        }
    }

    /// `root = __opal_pre_modify(root)` when the expression chain is
    /// rooted in a reference-counted variable or `self`
    fn push_pre_modify(&mut self, expression: &ResolvedExpression, out: &mut Vec<CStmt>) {
        let mut root = expression;
        while let ResolvedExpression::Field { target, .. } = root {
            root = target;
        }
        let root_name = match root {
            ResolvedExpression::Variable { name, ty } if ty.is_reference_counted() => name.clone(),
            ResolvedExpression::SelfValue { .. } => "self".to_string(),
            _ => return,
        };
        out.push(CStmt::Assign {
            target: CExpr::name(root_name.clone()),
            value: CExpr::call("__opal_pre_modify", vec![CExpr::name(root_name)]),
        });
    }

    fn lower_print(&mut self, value: &ResolvedExpression, out: &mut Vec<CStmt>) {
        match value.ty() {
            Some(ResolvedType::Builtin(builtin)) => {
                let lowered = self.lower_expression(value, out);
                let temp = self.fresh_temp();
                out.push(CStmt::Declare {
                    ty: CType::named("__opal_box").pointer_to(),
                    name: temp.clone(),
                    initializer: Some(CExpr::call(
                        "__opal_make_box",
                        vec![lowered, CExpr::name(box_info(builtin))],
                    )),
                });
                out.push(CStmt::Expression(CExpr::call(
                    "__opal_print",
                    vec![CExpr::name(temp.clone())],
                )));
                out.push(CStmt::Expression(CExpr::call(
                    "__opal_release",
                    vec![CExpr::name(temp)],
                )));
            }
            _ => {
                let lowered = self.lower_expression(value, out);
                out.push(CStmt::Expression(CExpr::call("__opal_print", vec![lowered])));
            }
        }
    }

    /// Assign literal fields through the freshly allocated target,
    /// recursing for nested literals
    fn assign_literal_fields(
        &mut self,
        target: CExpr,
        ty: ResolvedType,
        fields: &[(String, ResolvedExpression)],
        out: &mut Vec<CStmt>,
    ) {
        for (field_name, value) in fields {
            let path = self.field_path(target.clone(), ty, field_name);
            match value {
                ResolvedExpression::StructureLiteral {
                    ty: nested_ty,
                    fields: nested,
                } => {
                    out.push(CStmt::Assign {
                        target: path.clone(),
                        value: self.alloc_call(*nested_ty, Semantics::Isolated),
                    });
                    self.assign_literal_fields(path, *nested_ty, nested, out);
                }
                value => {
                    let value = self.lower_expression(value, out);
                    out.push(CStmt::Assign {
                        target: path,
                        value,
                    });
                }
            }
        }
    }

    // ---- expressions ----

    /// Lower to a C expression; forms that need their own statements
    /// (structure literals and factory calls outside an initializer)
    /// land in `prelude` and yield a temporary
    fn lower_expression(
        &mut self,
        expression: &ResolvedExpression,
        prelude: &mut Vec<CStmt>,
    ) -> CExpr {
        let module = self.module;
        match expression {
            ResolvedExpression::Boolean(value) => CExpr::Int(i64::from(*value)),
            ResolvedExpression::Integer(value) => CExpr::Int(*value),
            ResolvedExpression::Real(value) => CExpr::Real(*value),
            ResolvedExpression::Bitfield(value) => CExpr::Hex(*value),
            ResolvedExpression::Variable { name, ty } => match ty {
                // A companion binding reads the singleton global.
                ResolvedType::Companion(id) => CExpr::name(module.type_name(*id)),
                _ => CExpr::name(name.clone()),
            },
            ResolvedExpression::SelfValue { .. } => CExpr::name("self"),
            ResolvedExpression::Field { target, field, .. } => {
                let target_ty = target.ty();
                let target = self.lower_expression(target, prelude);
                match target_ty {
                    Some(ty @ (ResolvedType::Data(_) | ResolvedType::Object(_))) => {
                        self.field_path(target, ty, field)
                    }
                    // Companion fields sit directly on the singleton.
                    _ => target.member(field.clone(), false),
                }
            }
            ResolvedExpression::Unary { operator, operand, .. } => CExpr::Unary {
                operator: match operator {
                    op_hir::UnaryOperator::Negate => "-",
                    op_hir::UnaryOperator::BitNot => "~",
                },
                operand: Box::new(self.lower_expression(operand, prelude)),
            },
            ResolvedExpression::Binary {
                left,
                operator,
                right,
                ..
            } => CExpr::Binary {
                left: Box::new(self.lower_expression(left, prelude)),
                operator: operator.symbol(),
                right: Box::new(self.lower_expression(right, prelude)),
            },
            ResolvedExpression::StructureLiteral { ty, fields } => {
                let temp = self.fresh_temp();
                prelude.push(CStmt::Declare {
                    ty: self.ctype(*ty),
                    name: temp.clone(),
                    initializer: Some(self.alloc_call(*ty, Semantics::Isolated)),
                });
                self.assign_literal_fields(CExpr::name(temp.clone()), *ty, fields, prelude);
                CExpr::name(temp)
            }
            ResolvedExpression::Call {
                function,
                target,
                arguments,
                ..
            } => {
                let mut call_arguments = Vec::new();
                if let Some(target) = target {
                    let lowered = self.lower_expression(target, prelude);
                    call_arguments.push(lowered);
                }
                for argument in arguments {
                    let lowered = self.lower_expression(argument, prelude);
                    call_arguments.push(lowered);
                }
                CExpr::call(self.symbol(*function), call_arguments)
            }
            ResolvedExpression::FactoryCall {
                object,
                function,
                arguments,
            } => {
                let temp = self.fresh_temp();
                prelude.push(CStmt::Declare {
                    ty: self.ctype(ResolvedType::Object(*object)),
                    name: temp.clone(),
                    initializer: Some(
                        self.alloc_call(ResolvedType::Object(*object), Semantics::Isolated),
                    ),
                });
                let mut call_arguments = vec![CExpr::name(temp.clone())];
                for argument in arguments {
                    let lowered = self.lower_expression(argument, prelude);
                    call_arguments.push(lowered);
                }
                prelude.push(CStmt::Expression(CExpr::call(
                    self.symbol(*function),
                    call_arguments,
                )));
                CExpr::name(temp)
            }
        }
    }

    /// Member access through the declaring inheritance layer:
    /// `target->Declaring.field`
    fn field_path(&self, target: CExpr, ty: ResolvedType, field: &str) -> CExpr {
        let module = self.module;
        let declaring = match ty {
            ResolvedType::Data(id) => Some(module.type_name(id).to_string()),
            ResolvedType::Object(id) => self.declaring_level(id, field),
            _ => None,
        };
        match declaring {
            Some(layer) => target.member(layer, true).member(field.to_string(), false),
            None => target.member(field.to_string(), true),
        }
    }

    /// The object level that declares `field`, searched from the type
    /// up the ancestor chain
    fn declaring_level(&self, id: DeclId, field: &str) -> Option<String> {
        let module = self.module;
        let mut current = Some(id);
        while let Some(level) = current {
            let object = module.types[level].as_object()?;
            if object.fields.iter().any(|f| f.name.value == field) {
                return Some(object.name.value.clone());
            }
            current = object.supertype;
        }
        None
    }

    // ---- helpers ----

    fn alloc_call(&self, ty: ResolvedType, semantics: Semantics) -> CExpr {
        let module = self.module;
        let info = match ty.decl() {
            Some(id) => type_names::info(module.type_name(id)),
            None => unreachable!("allocation of a builtin type"),
        };
        let tag = match semantics {
            Semantics::Reference => "__OPAL_REFERENCE",
            _ => "__OPAL_ISOLATED",
        };
        CExpr::call(
            "__opal_alloc_rc",
            vec![CExpr::name(info).address_of(), CExpr::name(tag)],
        )
    }

    fn ctype(&self, ty: ResolvedType) -> CType {
        let module = self.module;
        match ty {
            ResolvedType::Builtin(builtin) => CType::named(builtin.name()),
            ResolvedType::Data(id) | ResolvedType::Object(id) => {
                CType::named(module.type_name(id)).pointer_to()
            }
            ResolvedType::Companion(id) => {
                let owner = match module.types[id].as_companion() {
                    Some(companion) => companion.owner,
                    None => unreachable!("companion type without a companion declaration"),
                };
                CType::Struct(type_names::companion_struct(module.type_name(owner)))
            }
        }
    }

    /// The mangled C symbol for a function
    fn symbol(&self, id: FunctionId) -> String {
        let module = self.module;
        let function: &Function = &module.functions[id];
        match function.owner {
            None => mangle::function_symbol(&function.name.value, &function.signature.labels),
            Some(owner) => {
                let type_name = match owner.decl() {
                    Some(decl) => module.type_name(decl),
                    None => unreachable!("method owned by a builtin type"),
                };
                mangle::method_symbol(type_name, &function.name.value, &function.signature.labels)
            }
        }
    }

    fn is_factory(&self, id: FunctionId) -> bool {
        let module = self.module;
        let Some(ResolvedType::Object(owner)) = module.functions[id].owner else {
            return false;
        };
        module.types[owner]
            .as_object()
            .is_some_and(|object| object.factory_methods.contains(&id))
    }

    fn fresh_temp(&mut self) -> String {
        let index = self.temp_counter;
        self.temp_counter += 1;
        format!("__opal_tmp{index}")
    }
}

fn descriptor_fields(type_name: &str, tables: TraitTables) -> Vec<(String, CExpr)> {
    let mut fields = vec![(
        "size".to_string(),
        CExpr::SizeOf(type_name.to_string()),
    )];
    let count = tables.descriptors.len();
    if count > 0 {
        fields.push((
            "trait_descs".to_string(),
            CExpr::ArrayLit {
                element: "const __opal_trait_descriptor*".to_string(),
                values: tables.descriptors,
            },
        ));
        fields.push((
            "trait_vtables".to_string(),
            CExpr::ArrayLit {
                element: "void*".to_string(),
                values: tables.vtables,
            },
        ));
    }
    fields.push(("trait_count".to_string(), CExpr::Int(count as i64)));
    fields
}

/// Parallel descriptor/v-table arrays for a type's trait table
#[derive(Default)]
struct TraitTables {
    descriptors: Vec<CExpr>,
    vtables: Vec<CExpr>,
}

fn box_info(builtin: BuiltinType) -> String {
    format!("__opal_{}_box_info", builtin.name())
}
