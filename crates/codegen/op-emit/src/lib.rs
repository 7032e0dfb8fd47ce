//! C source rendering
//!
//! Turns a lowered program into compilable C text with one fixed
//! template per node. The emitter never inspects the program's
//! meaning; every decision was made by the lowering pass.

use op_cir::{CExpr, CField, CParameter, CStmt, CType};

const INDENT: &str = "    ";

/// Render a program as a single C translation unit
pub fn emit(program: &[CStmt]) -> String {
    let mut out = String::from("#include \"opal-runtime.h\"\n#include \"opal-stdlib.h\"\n");
    for item in program {
        out.push('\n');
        out.push_str(&render_item(item));
    }
    out
}

fn render_item(item: &CStmt) -> String {
    match item {
        CStmt::StructDecl {
            name,
            fields,
            typedef,
        } => render_struct(name, fields, *typedef),
        CStmt::Global {
            ty,
            name,
            initializer,
            is_const,
        } => {
            let qualifier = if *is_const { "const " } else { "" };
            match initializer {
                Some(value) => {
                    format!("{qualifier}{ty} {name} = {};\n", render_expr(value))
                }
                None => format!("{qualifier}{ty} {name};\n"),
            }
        }
        CStmt::Prototype {
            name,
            returns,
            parameters,
        } => format!("{returns} {name}({});\n", render_parameters(parameters)),
        CStmt::Function {
            name,
            returns,
            parameters,
            body,
        } => {
            let mut out = format!("{returns} {name}({}) {{\n", render_parameters(parameters));
            for statement in body {
                out.push_str(INDENT);
                out.push_str(&render_statement(statement));
            }
            out.push_str("}\n");
            out
        }
        statement => render_statement(statement),
    }
}

fn render_struct(name: &str, fields: &[CField], typedef: bool) -> String {
    // A typedef with no members is a forward declaration.
    if typedef && fields.is_empty() {
        return format!("typedef struct {name} {name};\n");
    }
    let mut out = if typedef {
        format!("typedef struct {name} {{\n")
    } else {
        format!("struct {name} {{\n")
    };
    for field in fields {
        out.push_str(INDENT);
        match field {
            CField::Plain { ty, name } => out.push_str(&format!("{ty} {name};\n")),
            CField::FnPtr {
                returns,
                name,
                parameters,
            } => {
                let parameters = if parameters.is_empty() {
                    "void".to_string()
                } else {
                    parameters
                        .iter()
                        .map(CType::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                out.push_str(&format!("{returns} (*{name})({parameters});\n"));
            }
        }
    }
    if typedef {
        out.push_str(&format!("}} {name};\n"));
    } else {
        out.push_str("};\n");
    }
    out
}

fn render_parameters(parameters: &[CParameter]) -> String {
    if parameters.is_empty() {
        return "void".to_string();
    }
    parameters
        .iter()
        .map(|parameter| format!("{} {}", parameter.ty, parameter.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_statement(statement: &CStmt) -> String {
    match statement {
        CStmt::Declare {
            ty,
            name,
            initializer,
        } => match initializer {
            Some(value) => format!("{ty} {name} = {};\n", render_expr(value)),
            None => format!("{ty} {name};\n"),
        },
        CStmt::Assign { target, value } => {
            format!("{} = {};\n", render_expr(target), render_expr(value))
        }
        CStmt::Expression(value) => format!("{};\n", render_expr(value)),
        CStmt::Return(Some(value)) => format!("return {};\n", render_expr(value)),
        CStmt::Return(None) => "return;\n".to_string(),
        item => render_item(item),
    }
}

fn render_expr(expression: &CExpr) -> String {
    match expression {
        CExpr::Int(value) => value.to_string(),
        CExpr::Hex(value) => format!("0x{value:x}"),
        // Debug formatting keeps the decimal point on whole values.
        CExpr::Real(value) => format!("{value:?}"),
        CExpr::Str(value) => render_string(value),
        CExpr::Name(name) => name.clone(),
        CExpr::AddressOf(inner) => format!("&{}", render_expr(inner)),
        CExpr::Member {
            target,
            member,
            arrow,
        } => {
            let accessor = if *arrow { "->" } else { "." };
            format!("{}{accessor}{member}", render_expr(target))
        }
        CExpr::Call { callee, arguments } => {
            let arguments = arguments
                .iter()
                .map(render_expr)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{callee}({arguments})")
        }
        CExpr::Unary { operator, operand } => {
            format!("{operator}{}", render_operand(operand))
        }
        CExpr::Binary {
            left,
            operator,
            right,
        } => format!(
            "({} {operator} {})",
            render_expr(left),
            render_expr(right)
        ),
        CExpr::Cast { ty, value } => format!("({ty}){}", render_operand(value)),
        CExpr::SizeOf(name) => format!("sizeof({name})"),
        CExpr::StructInit(fields) => {
            if fields.is_empty() {
                return "{0}".to_string();
            }
            let fields = fields
                .iter()
                .map(|(name, value)| format!(".{name} = {}", render_expr(value)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{ {fields} }}")
        }
        CExpr::ArrayLit { element, values } => {
            let values = values
                .iter()
                .map(render_expr)
                .collect::<Vec<_>>()
                .join(", ");
            format!("({element}[]){{ {values} }}")
        }
    }
}

/// Parenthesize operands that would otherwise glue onto a prefix
/// operator or cast
fn render_operand(operand: &CExpr) -> String {
    match operand {
        CExpr::Int(_)
        | CExpr::Hex(_)
        | CExpr::Real(_)
        | CExpr::Name(_)
        | CExpr::Member { .. }
        | CExpr::Call { .. }
        | CExpr::AddressOf(_)
        | CExpr::SizeOf(_) => render_expr(operand),
        other => format!("({})", render_expr(other)),
    }
}

fn render_string(value: &str) -> String {
    let mut out = String::from("\"");
    for character in value.chars() {
        match character {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn structs_globals_and_main() {
        let program = vec![
            CStmt::StructDecl {
                name: "Point".to_string(),
                fields: Vec::new(),
                typedef: true,
            },
            CStmt::StructDecl {
                name: "__Point_data".to_string(),
                fields: vec![CField::Plain {
                    ty: CType::named("integer"),
                    name: "x".to_string(),
                }],
                typedef: false,
            },
            CStmt::StructDecl {
                name: "Point".to_string(),
                fields: vec![
                    CField::Plain {
                        ty: CType::named("__opal_rc_header"),
                        name: "header".to_string(),
                    },
                    CField::Plain {
                        ty: CType::Struct("__Point_data".to_string()),
                        name: "Point".to_string(),
                    },
                ],
                typedef: false,
            },
            CStmt::Global {
                ty: CType::named("__opal_data_type"),
                name: "__Point_data_type".to_string(),
                initializer: Some(CExpr::StructInit(vec![
                    ("size".to_string(), CExpr::SizeOf("Point".to_string())),
                    ("trait_count".to_string(), CExpr::Int(0)),
                ])),
                is_const: false,
            },
            CStmt::Function {
                name: "main".to_string(),
                returns: CType::named("int"),
                parameters: Vec::new(),
                body: vec![
                    CStmt::Declare {
                        ty: CType::named("Point").pointer_to(),
                        name: "p".to_string(),
                        initializer: Some(CExpr::call(
                            "__opal_alloc_rc",
                            vec![
                                CExpr::name("__Point_info").address_of(),
                                CExpr::name("__OPAL_ISOLATED"),
                            ],
                        )),
                    },
                    CStmt::Assign {
                        target: CExpr::name("p").member("Point", true).member("x", false),
                        value: CExpr::Int(1),
                    },
                    CStmt::Return(Some(CExpr::Int(0))),
                ],
            },
        ];
        expect![[r#"
            #include "opal-runtime.h"
            #include "opal-stdlib.h"

            typedef struct Point Point;

            struct __Point_data {
                integer x;
            };

            struct Point {
                __opal_rc_header header;
                struct __Point_data Point;
            };

            __opal_data_type __Point_data_type = { .size = sizeof(Point), .trait_count = 0 };

            int main(void) {
                Point* p = __opal_alloc_rc(&__Point_info, __OPAL_ISOLATED);
                p->Point.x = 1;
                return 0;
            }
        "#]]
        .assert_eq(&emit(&program));
    }

    #[test]
    fn function_pointer_members_and_casts() {
        let program = vec![
            CStmt::StructDecl {
                name: "Printable_vtable".to_string(),
                fields: vec![CField::FnPtr {
                    returns: CType::named("integer"),
                    name: "describe__".to_string(),
                    parameters: vec![CType::Void.pointer_to()],
                }],
                typedef: true,
            },
            CStmt::Global {
                ty: CType::named("Printable_vtable"),
                name: "Point_Printable_vtable".to_string(),
                initializer: Some(CExpr::StructInit(vec![(
                    "describe__".to_string(),
                    CExpr::Cast {
                        ty: CType::Void.pointer_to(),
                        value: Box::new(CExpr::name("Point_describe__")),
                    },
                )])),
                is_const: true,
            },
        ];
        expect![[r#"
            #include "opal-runtime.h"
            #include "opal-stdlib.h"

            typedef struct Printable_vtable {
                integer (*describe__)(void*);
            } Printable_vtable;

            const Printable_vtable Point_Printable_vtable = { .describe__ = (void*)Point_describe__ };
        "#]]
        .assert_eq(&emit(&program));
    }

    #[test]
    fn expressions_parenthesize_predictably() {
        let nested = CExpr::Binary {
            left: Box::new(CExpr::Int(1)),
            operator: "+",
            right: Box::new(CExpr::Binary {
                left: Box::new(CExpr::Int(2)),
                operator: "*",
                right: Box::new(CExpr::name("x")),
            }),
        };
        assert_eq!(render_expr(&nested), "(1 + (2 * x))");

        let negated = CExpr::Unary {
            operator: "-",
            operand: Box::new(CExpr::Unary {
                operator: "-",
                operand: Box::new(CExpr::name("x")),
            }),
        };
        assert_eq!(render_expr(&negated), "-(-x)");

        assert_eq!(render_expr(&CExpr::Real(3.0)), "3.0");
        assert_eq!(render_expr(&CExpr::Hex(0b1010)), "0xa");
        assert_eq!(
            render_expr(&CExpr::ArrayLit {
                element: "void*".to_string(),
                values: vec![CExpr::name("a").address_of()],
            }),
            "(void*[]){ &a }"
        );
    }

    #[test]
    fn factory_prototype_returns_void() {
        let program = vec![CStmt::Prototype {
            name: "Counter_fresh__".to_string(),
            returns: CType::Void,
            parameters: vec![CParameter {
                ty: CType::named("Counter").pointer_to(),
                name: "self".to_string(),
            }],
        }];
        expect![[r#"
            #include "opal-runtime.h"
            #include "opal-stdlib.h"

            void Counter_fresh__(Counter* self);
        "#]]
        .assert_eq(&emit(&program));
    }
}
