//! Declaration builders
//!
//! Each declaration form answers "is this construct next?" with a
//! one-token lookahead predicate and parses itself from the stream,
//! failing with a diagnostic on malformed input.

use crate::expr::UnresolvedExpression;
use crate::stmt::{self, UnresolvedStatement};
use crate::support::{Require, expect, expect_identifier, expect_type_name, next_is};
use op_lexer::{Newlines, TokenStream};
use op_syntax::{Diagnostic, Labeled, Located, Semantics, TokenKind};

/// Keywords that end a section inside an `object` or `data` body
const SECTION_ENDERS: &[&str] = &["data", "static", "mutating", "factory", "}"];

/// `let`/`mut`/`ref` variable declaration, or a field
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDeclaration {
    pub name: Located<String>,
    pub semantics: Located<Semantics>,
    pub ty: Option<Located<String>>,
    pub initializer: Option<UnresolvedExpression>,
}

impl VariableDeclaration {
    pub fn is_next(stream: &TokenStream) -> bool {
        stream
            .peek()
            .is_some_and(|token| Semantics::from_keyword(&token.value).is_some())
    }

    /// Parse a keyword-introduced declaration (`let x: integer = 27`)
    pub fn parse(stream: &mut TokenStream) -> Result<Self, Diagnostic> {
        let keyword = stream
            .next()
            .requiring(|token| token.kind == TokenKind::Keyword)?;
        let Some(semantics) = Semantics::from_keyword(&keyword.value) else {
            return Err(Diagnostic::InvalidToken { token: keyword });
        };
        Self::parse_declarator(stream, Located::new(semantics, keyword.location))
    }

    /// Parse a bare field (`name: type` or `name = value`) with the
    /// default semantics of its surrounding construct
    pub fn parse_field(stream: &mut TokenStream, semantics: Semantics) -> Result<Self, Diagnostic> {
        let location = stream.peek().required()?.location;
        Self::parse_declarator(stream, Located::new(semantics, location))
    }

    fn parse_declarator(
        stream: &mut TokenStream,
        semantics: Located<Semantics>,
    ) -> Result<Self, Diagnostic> {
        let name = expect_identifier(stream)?;
        let ty = parse_type_annotation(stream)?;
        let initializer = if next_is(stream, "=") {
            stream.next();
            Some(UnresolvedExpression::parse(stream)?)
        } else {
            None
        };
        Ok(Self {
            name: Located::new(name.value, name.location),
            semantics,
            ty,
            initializer,
        })
    }
}

/// `: TypeName` if present
fn parse_type_annotation(stream: &mut TokenStream) -> Result<Option<Located<String>>, Diagnostic> {
    if !next_is(stream, ":") {
        return Ok(None);
    }
    stream.next();
    let name = expect_type_name(stream)?;
    Ok(Some(Located::new(name.value, name.location)))
}

/// A function body: implicit single-expression return or a block
#[derive(Clone, Debug, PartialEq)]
pub enum FunctionBody {
    ImplicitReturn(UnresolvedExpression),
    Statements(Vec<UnresolvedStatement>),
}

/// `[pure] func name(params) [-> type]` with a block or `=>` body
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDeclaration {
    pub name: Located<String>,
    pub is_pure: bool,
    pub is_mutating: bool,
    pub parameters: Vec<Labeled<VariableDeclaration>>,
    pub return_type: Option<Located<String>>,
    pub body: FunctionBody,
}

impl FunctionDeclaration {
    pub fn is_next(stream: &TokenStream) -> bool {
        stream
            .peek()
            .is_some_and(|token| token.is("func") || token.is("pure"))
    }

    pub fn parse(stream: &mut TokenStream) -> Result<Self, Diagnostic> {
        let is_pure = if next_is(stream, "pure") {
            stream.next();
            true
        } else {
            false
        };
        expect(stream, "func")?;
        let name = expect_identifier(stream)?;

        let parameters = parse_parameters(stream)?;
        let return_type = if next_is(stream, "->") {
            stream.next();
            let ty = expect_type_name(stream)?;
            Some(Located::new(ty.value, ty.location))
        } else {
            None
        };

        let body = if next_is(stream, "=>") {
            stream.next();
            FunctionBody::ImplicitReturn(UnresolvedExpression::parse(stream)?)
        } else {
            expect(stream, "{")?;
            let statements = stmt::parse_block(stream)?;
            expect(stream, "}")?;
            FunctionBody::Statements(statements)
        };

        Ok(Self {
            name: Located::new(name.value, name.location),
            is_pure,
            is_mutating: false,
            parameters,
            return_type,
            body,
        })
    }
}

fn parse_parameters(
    stream: &mut TokenStream,
) -> Result<Vec<Labeled<VariableDeclaration>>, Diagnostic> {
    expect(stream, "(")?;
    let mut parameters = Vec::new();
    if !next_is(stream, ")") {
        loop {
            parameters.push(parse_parameter(stream)?);
            if next_is(stream, ")") {
                break;
            }
            expect(stream, ",")?;
        }
    }
    expect(stream, ")")?;
    Ok(parameters)
}

/// One parameter: `label name: type`, `name: type` (label = name), or
/// `_ name: type` (unlabeled)
fn parse_parameter(stream: &mut TokenStream) -> Result<Labeled<VariableDeclaration>, Diagnostic> {
    let mut ahead = stream.clone();
    let label = ahead
        .next()
        .requiring(|token| token.kind == TokenKind::Identifier)?;
    let has_explicit_label = ahead
        .next()
        .is_some_and(|token| token.kind == TokenKind::Identifier);

    if has_explicit_label {
        stream.next();
        let variable = VariableDeclaration::parse_field(stream, Semantics::Immutable)?;
        if label.value == "_" {
            Ok(Labeled::unlabeled(variable))
        } else {
            Ok(Labeled::labeled(label.value, variable))
        }
    } else {
        let variable = VariableDeclaration::parse_field(stream, Semantics::Immutable)?;
        let label = variable.name.value.clone();
        Ok(Labeled::labeled(label, variable))
    }
}

/// A `static:` section: per-type singleton fields and methods
#[derive(Clone, Debug, PartialEq)]
pub struct StaticSection {
    pub fields: Vec<VariableDeclaration>,
    pub methods: Vec<FunctionDeclaration>,
}

impl StaticSection {
    /// Parse the section body after its `static :` introducer
    fn parse_body(stream: &mut TokenStream) -> Result<Self, Diagnostic> {
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while let Some(token) = stream.peek() {
            if SECTION_ENDERS.contains(&token.value.as_str()) {
                break;
            }
            if FunctionDeclaration::is_next(stream) {
                methods.push(FunctionDeclaration::parse(stream)?);
            } else if VariableDeclaration::is_next(stream) {
                fields.push(VariableDeclaration::parse(stream)?);
            } else {
                return Err(Diagnostic::InvalidToken { token });
            }
        }
        Ok(Self { fields, methods })
    }
}

/// `data Name { fields [static: ...] }`
#[derive(Clone, Debug, PartialEq)]
pub struct DataDeclaration {
    pub name: Located<String>,
    pub fields: Vec<VariableDeclaration>,
    pub static_section: Option<StaticSection>,
}

impl DataDeclaration {
    pub fn is_next(stream: &TokenStream) -> bool {
        stream.peek().is_some_and(|token| token.is("data"))
    }

    pub fn parse(stream: &mut TokenStream) -> Result<Self, Diagnostic> {
        expect(stream, "data")?;
        let name = expect_identifier(stream)?;
        expect(stream, "{")?;

        let mut fields = Vec::new();
        let mut static_section = None;
        while let Some(token) = stream.peek() {
            if token.is("}") {
                break;
            }
            if token.is("static") {
                if static_section.is_some() {
                    return Err(Diagnostic::InvalidToken { token });
                }
                stream.next();
                expect(stream, ":")?;
                static_section = Some(StaticSection::parse_body(stream)?);
                continue;
            }
            fields.push(VariableDeclaration::parse_field(stream, Semantics::Isolated)?);
            consume_field_separator(stream);
        }
        expect(stream, "}")?;

        Ok(Self {
            name: Located::new(name.value, name.location),
            fields,
            static_section,
        })
    }
}

/// Fields separate with a comma or a newline; `}` needs neither
fn consume_field_separator(stream: &mut TokenStream) {
    if next_is(stream, ",") {
        stream.next();
    } else if stream
        .peek_with(Newlines::Keep)
        .is_some_and(|token| token.is("\n"))
    {
        stream.next_with(Newlines::Keep);
    }
}

/// `object [abstract] Name [: Super] { methods and sections }`
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDeclaration {
    pub name: Located<String>,
    pub is_abstract: bool,
    pub supertype: Option<Located<String>>,
    /// Pure methods from the leading section plus mutating-section
    /// methods (flagged `is_mutating`)
    pub methods: Vec<FunctionDeclaration>,
    pub fields: Vec<VariableDeclaration>,
    pub factory_methods: Vec<FunctionDeclaration>,
    pub static_section: Option<StaticSection>,
}

impl ObjectDeclaration {
    pub fn is_next(stream: &TokenStream) -> bool {
        stream.peek().is_some_and(|token| token.is("object"))
    }

    pub fn parse(stream: &mut TokenStream) -> Result<Self, Diagnostic> {
        expect(stream, "object")?;
        let is_abstract = if next_is(stream, "abstract") {
            stream.next();
            true
        } else {
            false
        };
        let name = expect_identifier(stream)?;

        let supertype = if next_is(stream, ":") {
            stream.next();
            let super_name = expect_identifier(stream)?;
            Some(Located::new(super_name.value, super_name.location))
        } else {
            None
        };

        expect(stream, "{")?;

        // The leading section holds pure methods.
        let mut methods = Vec::new();
        while let Some(token) = stream.peek() {
            if SECTION_ENDERS.contains(&token.value.as_str()) {
                break;
            }
            let mut method = FunctionDeclaration::parse(stream)?;
            method.is_pure = true;
            methods.push(method);
        }

        let mut fields = Vec::new();
        let mut factory_methods: Option<Vec<FunctionDeclaration>> = None;
        let mut mutating_methods: Option<Vec<FunctionDeclaration>> = None;
        let mut seen_data_section = false;
        let mut static_section = None;

        while let Some(token) = stream.peek() {
            match token.value.as_str() {
                "}" => break,
                "factory" => {
                    if factory_methods.is_some() {
                        return Err(Diagnostic::InvalidToken { token });
                    }
                    stream.next();
                    expect(stream, ":")?;
                    factory_methods = Some(Self::parse_factories(stream, &name.value)?);
                }
                "mutating" => {
                    if mutating_methods.is_some() {
                        return Err(Diagnostic::InvalidToken { token });
                    }
                    stream.next();
                    expect(stream, ":")?;
                    let mut section = Vec::new();
                    while let Some(next) = stream.peek() {
                        if SECTION_ENDERS.contains(&next.value.as_str()) {
                            break;
                        }
                        let mut method = FunctionDeclaration::parse(stream)?;
                        method.is_mutating = true;
                        section.push(method);
                    }
                    mutating_methods = Some(section);
                }
                "static" => {
                    if static_section.is_some() {
                        return Err(Diagnostic::InvalidToken { token });
                    }
                    stream.next();
                    expect(stream, ":")?;
                    static_section = Some(StaticSection::parse_body(stream)?);
                }
                "data" => {
                    if seen_data_section {
                        return Err(Diagnostic::InvalidToken { token });
                    }
                    seen_data_section = true;
                    stream.next();
                    expect(stream, ":")?;
                    while let Some(next) = stream.peek() {
                        if SECTION_ENDERS.contains(&next.value.as_str()) {
                            break;
                        }
                        fields.push(VariableDeclaration::parse_field(stream, Semantics::Isolated)?);
                        consume_field_separator(stream);
                    }
                }
                _ => return Err(Diagnostic::InvalidToken { token }),
            }
        }
        expect(stream, "}")?;

        methods.extend(mutating_methods.unwrap_or_default());

        Ok(Self {
            name: Located::new(name.value, name.location),
            is_abstract,
            supertype,
            methods,
            fields,
            factory_methods: factory_methods.unwrap_or_default(),
            static_section,
        })
    }

    /// Factory methods return the object's own type; an annotation
    /// naming anything else is an error at that annotation
    fn parse_factories(
        stream: &mut TokenStream,
        owner: &str,
    ) -> Result<Vec<FunctionDeclaration>, Diagnostic> {
        let mut factories = Vec::new();
        while let Some(token) = stream.peek() {
            if SECTION_ENDERS.contains(&token.value.as_str()) {
                break;
            }
            let mut method = FunctionDeclaration::parse(stream)?;
            if let Some(return_type) = &method.return_type {
                if return_type.value != owner {
                    return Err(Diagnostic::UnresolvedType {
                        location: return_type.location,
                    });
                }
            } else {
                method.return_type = Some(Located::new(owner.to_string(), method.name.location));
            }
            factories.push(method);
        }
        Ok(factories)
    }
}

/// A trait method requirement: a signature with no body
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionSignature {
    pub name: Located<String>,
    pub parameters: Vec<Labeled<VariableDeclaration>>,
    pub return_type: Option<Located<String>>,
}

/// `trait Name { func requirements }`
#[derive(Clone, Debug, PartialEq)]
pub struct TraitDeclaration {
    pub name: Located<String>,
    pub requirements: Vec<FunctionSignature>,
}

impl TraitDeclaration {
    pub fn is_next(stream: &TokenStream) -> bool {
        stream.peek().is_some_and(|token| token.is("trait"))
    }

    pub fn parse(stream: &mut TokenStream) -> Result<Self, Diagnostic> {
        expect(stream, "trait")?;
        let name = expect_identifier(stream)?;
        expect(stream, "{")?;

        let mut requirements = Vec::new();
        while !next_is(stream, "}") {
            expect(stream, "func")?;
            let method = expect_identifier(stream)?;
            let parameters = parse_parameters(stream)?;
            let return_type = if next_is(stream, "->") {
                stream.next();
                let ty = expect_type_name(stream)?;
                Some(Located::new(ty.value, ty.location))
            } else {
                None
            };
            requirements.push(FunctionSignature {
                name: Located::new(method.value, method.location),
                parameters,
                return_type,
            });
        }
        expect(stream, "}")?;

        Ok(Self {
            name: Located::new(name.value, name.location),
            requirements,
        })
    }
}

/// `model Type: Trait { method bodies }` — trait conformance declared
/// independently of the type
#[derive(Clone, Debug, PartialEq)]
pub struct ConformanceDeclaration {
    pub target: Located<String>,
    pub trait_name: Located<String>,
    pub methods: Vec<FunctionDeclaration>,
}

impl ConformanceDeclaration {
    pub fn is_next(stream: &TokenStream) -> bool {
        stream.peek().is_some_and(|token| token.is("model"))
    }

    pub fn parse(stream: &mut TokenStream) -> Result<Self, Diagnostic> {
        expect(stream, "model")?;
        let target = expect_identifier(stream)?;
        expect(stream, ":")?;
        let trait_name = expect_identifier(stream)?;
        expect(stream, "{")?;

        let mut methods = Vec::new();
        while !next_is(stream, "}") {
            methods.push(FunctionDeclaration::parse(stream)?);
        }
        expect(stream, "}")?;

        Ok(Self {
            target: Located::new(target.value, target.location),
            trait_name: Located::new(trait_name.value, trait_name.location),
            methods,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(source: &str) -> TokenStream {
        TokenStream::new(source)
    }

    #[test]
    fn variable_with_annotation_and_initializer() {
        let mut stream = stream("let x: integer = 27");
        let variable = VariableDeclaration::parse(&mut stream).unwrap();
        assert_eq!(variable.name.value, "x");
        assert_eq!(variable.semantics.value, Semantics::Immutable);
        assert_eq!(variable.ty.as_ref().unwrap().value, "integer");
        assert!(matches!(
            variable.initializer,
            Some(UnresolvedExpression::Integer(27, _))
        ));
    }

    #[test]
    fn mutable_and_reference_keywords() {
        let mut first = stream("mut count = 0");
        let mutable = VariableDeclaration::parse(&mut first).unwrap();
        assert_eq!(mutable.semantics.value, Semantics::Mutable);
        assert!(mutable.ty.is_none());

        let mut second = stream("ref shared: integer");
        let reference = VariableDeclaration::parse(&mut second).unwrap();
        assert_eq!(reference.semantics.value, Semantics::Reference);
        assert!(reference.initializer.is_none());
    }

    #[test]
    fn function_with_block_body() {
        let mut stream = stream("func add(a: integer, b: integer) -> integer {\nreturn a + b\n}");
        let function = FunctionDeclaration::parse(&mut stream).unwrap();
        assert_eq!(function.name.value, "add");
        assert!(!function.is_pure);
        assert_eq!(function.parameters.len(), 2);
        assert_eq!(function.parameters[0].label.as_deref(), Some("a"));
        assert_eq!(function.parameters[0].value.name.value, "a");
        assert_eq!(function.return_type.as_ref().unwrap().value, "integer");
        assert!(matches!(&function.body, FunctionBody::Statements(body) if body.len() == 1));
    }

    #[test]
    fn function_with_implicit_return() {
        let mut stream = stream("pure func double(value: integer) -> integer => value * 2");
        let function = FunctionDeclaration::parse(&mut stream).unwrap();
        assert!(function.is_pure);
        assert!(matches!(
            function.body,
            FunctionBody::ImplicitReturn(UnresolvedExpression::Binary { .. })
        ));
    }

    #[test]
    fn parameter_label_forms() {
        let mut stream =
            stream("func move(to destination: integer, speed: integer, _ flags: bitfield) {\n}");
        let function = FunctionDeclaration::parse(&mut stream).unwrap();
        assert_eq!(function.parameters[0].label.as_deref(), Some("to"));
        assert_eq!(function.parameters[0].value.name.value, "destination");
        assert_eq!(function.parameters[1].label.as_deref(), Some("speed"));
        assert_eq!(function.parameters[2].label, None);
        assert_eq!(function.parameters[2].value.name.value, "flags");
    }

    #[test]
    fn data_with_fields_and_static_section() {
        let source = "data Point {\nx: integer\ny: integer\nstatic:\nlet origin_x: integer = 0\nfunc describe() -> integer => 0\n}";
        let mut stream = stream(source);
        let data = DataDeclaration::parse(&mut stream).unwrap();
        assert_eq!(data.name.value, "Point");
        assert_eq!(data.fields.len(), 2);
        assert_eq!(data.fields[0].semantics.value, Semantics::Isolated);
        let section = data.static_section.unwrap();
        assert_eq!(section.fields.len(), 1);
        assert_eq!(section.methods.len(), 1);
    }

    #[test]
    fn data_fields_separated_by_commas() {
        let mut stream = stream("data Pair { first: integer, second: integer }");
        let data = DataDeclaration::parse(&mut stream).unwrap();
        assert_eq!(data.fields.len(), 2);
        assert_eq!(data.fields[1].name.value, "second");
    }

    #[test]
    fn object_sections() {
        let source = "object Counter {\nfunc value() -> integer => self.count\nmutating:\nfunc bump() {\n}\nfactory:\nfunc fresh() {\n}\ndata:\ncount: integer\n}";
        let mut stream = stream(source);
        let object = ObjectDeclaration::parse(&mut stream).unwrap();
        assert_eq!(object.name.value, "Counter");
        assert!(!object.is_abstract);
        assert_eq!(object.methods.len(), 2);
        assert!(object.methods[0].is_pure);
        assert!(object.methods[1].is_mutating);
        assert_eq!(object.fields.len(), 1);
        assert_eq!(object.factory_methods.len(), 1);
        // Factories default to returning their owning object.
        assert_eq!(
            object.factory_methods[0].return_type.as_ref().unwrap().value,
            "Counter"
        );
    }

    #[test]
    fn abstract_object_with_supertype() {
        let mut stream = stream("object abstract Shape: Drawable {\n}");
        let object = ObjectDeclaration::parse(&mut stream).unwrap();
        assert!(object.is_abstract);
        assert_eq!(object.supertype.unwrap().value, "Drawable");
    }

    #[test]
    fn factory_return_type_must_name_owner() {
        let mut stream = stream("object Counter {\nfactory:\nfunc fresh() -> integer {\n}\n}");
        let error = ObjectDeclaration::parse(&mut stream).unwrap_err();
        assert!(matches!(error, Diagnostic::UnresolvedType { .. }));
    }

    #[test]
    fn duplicate_section_rejected() {
        let mut stream = stream("object Counter {\ndata:\ncount: integer\ndata:\nother: integer\n}");
        let error = ObjectDeclaration::parse(&mut stream).unwrap_err();
        assert!(matches!(error, Diagnostic::InvalidToken { .. }));
    }

    #[test]
    fn trait_requirements() {
        let mut stream =
            stream("trait Drawable {\nfunc draw() -> integer\nfunc scale(by factor: integer)\n}");
        let decl = TraitDeclaration::parse(&mut stream).unwrap();
        assert_eq!(decl.name.value, "Drawable");
        assert_eq!(decl.requirements.len(), 2);
        assert_eq!(decl.requirements[0].name.value, "draw");
        assert_eq!(decl.requirements[1].parameters[0].label.as_deref(), Some("by"));
    }

    #[test]
    fn conformance_declaration() {
        let mut stream = stream("model Point: Drawable {\nfunc draw() -> integer => 0\n}");
        let conformance = ConformanceDeclaration::parse(&mut stream).unwrap();
        assert_eq!(conformance.target.value, "Point");
        assert_eq!(conformance.trait_name.value, "Drawable");
        assert_eq!(conformance.methods.len(), 1);
    }

    #[test]
    fn unterminated_declaration_reports_eof() {
        let mut stream = stream("data Point {");
        let error = DataDeclaration::parse(&mut stream).unwrap_err();
        assert!(matches!(error, Diagnostic::UnexpectedEof));
    }
}
