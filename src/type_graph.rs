//! Owned representation of TypeScript type syntax.
//!
//! The oxc AST lives inside an arena that is dropped as soon as a file has been
//! read, so every type the generator needs later is lowered into a [`TypeNode`]
//! first. The representation is a plain tagged tree: keywords, literals, object
//! literals, unions, intersections and the three kinds of named references that
//! TypeScript declaration output uses (`Foo<T>`, `import("mod").Foo<T>` and
//! `typeof foo`). References remember the module they were written in so the
//! [`TypeResolver`](crate::type_resolver::TypeResolver) can resolve them in the
//! right scope.

use oxc_ast::ast::{
    PropertyKey, TSImportTypeQualifier, TSLiteral, TSSignature, TSTupleElement, TSType,
    TSTypeName, TSTypeOperatorOperator, TSTypeParameterInstantiation, TSTypeQueryExprName,
};
use oxc_span::GetSpan;
use std::collections::HashMap;
use std::fmt;

/// Index of a loaded module inside the analysis session.
pub type ModuleId = usize;

/// A TypeScript type, lowered from source syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    /// `string`, `number`, `null`, ...
    Keyword(Keyword),
    /// `"a"`, `200`, `true`
    Literal(LiteralType),
    /// `T[]`, `Array<T>`, `readonly T[]`
    Array(Box<TypeNode>),
    /// `[A, B]`
    Tuple(Vec<TypeNode>),
    /// `{ a: A; b?: B }`
    Object(ObjectType),
    /// `A | B`
    Union(Vec<TypeNode>),
    /// `A & B`
    Intersection(Vec<TypeNode>),
    /// `Foo<A, B>` or `ns.Foo`
    Reference(TypeRef),
    /// `import("mod").Foo<A>`
    Import(ImportRef),
    /// `typeof foo`
    Query(TypeQuery),
    /// Any syntax the generator does not interpret, kept as source text.
    Other(String),
}

/// Keyword types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Any,
    Unknown,
    Never,
    Void,
    Null,
    Undefined,
    String,
    Number,
    Boolean,
    BigInt,
    Symbol,
    Object,
}

/// Literal types.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralType {
    String(String),
    Number(f64),
    Boolean(bool),
}

/// Members of an object type literal or interface body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectType {
    pub members: Vec<Member>,
}

/// A single property signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub optional: bool,
    pub ty: TypeNode,
}

/// A named type reference, resolved in the scope of `module`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub name: String,
    pub args: Vec<TypeNode>,
    pub module: ModuleId,
}

/// An inline import type.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRef {
    pub specifier: String,
    pub qualifier: Option<String>,
    pub args: Vec<TypeNode>,
    pub module: ModuleId,
}

/// A `typeof` query on a value binding.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeQuery {
    pub name: String,
    pub module: ModuleId,
}

/// A declared type parameter with its optional default.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
    pub default: Option<TypeNode>,
}

impl ObjectType {
    /// Look up a member by property name.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl TypeNode {
    /// Short kind name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeNode::Keyword(_) => "Keyword",
            TypeNode::Literal(_) => "LiteralType",
            TypeNode::Array(_) => "ArrayType",
            TypeNode::Tuple(_) => "TupleType",
            TypeNode::Object(_) => "TypeLiteral",
            TypeNode::Union(_) => "UnionType",
            TypeNode::Intersection(_) => "IntersectionType",
            TypeNode::Reference(_) => "TypeReference",
            TypeNode::Import(_) => "ImportType",
            TypeNode::Query(_) => "TypeQuery",
            TypeNode::Other(_) => "Unsupported",
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            TypeNode::Object(object) => Some(object),
            _ => None,
        }
    }

    /// String value of a string literal type.
    pub fn as_string_literal(&self) -> Option<&str> {
        match self {
            TypeNode::Literal(LiteralType::String(value)) => Some(value),
            _ => None,
        }
    }

    /// Integral value of a numeric literal type.
    pub fn as_integer_literal(&self) -> Option<u16> {
        match self {
            TypeNode::Literal(LiteralType::Number(value))
                if value.fract() == 0.0 && *value >= 0.0 && *value <= u16::MAX as f64 =>
            {
                Some(*value as u16)
            }
            _ => None,
        }
    }

    /// Whether this is `null` or `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, TypeNode::Keyword(Keyword::Null | Keyword::Undefined))
    }

    /// Generic arguments of a reference or import type.
    pub fn type_args(&self) -> &[TypeNode] {
        match self {
            TypeNode::Reference(r) => &r.args,
            TypeNode::Import(i) => &i.args,
            _ => &[],
        }
    }

    /// Replace references to type parameters with their bound arguments.
    pub fn substitute(&self, bindings: &HashMap<String, TypeNode>) -> TypeNode {
        if bindings.is_empty() {
            return self.clone();
        }
        let map = |nodes: &[TypeNode]| nodes.iter().map(|n| n.substitute(bindings)).collect();
        match self {
            TypeNode::Reference(r) if r.args.is_empty() && bindings.contains_key(&r.name) => {
                bindings[&r.name].clone()
            }
            TypeNode::Reference(r) => TypeNode::Reference(TypeRef {
                name: r.name.clone(),
                args: map(&r.args),
                module: r.module,
            }),
            TypeNode::Import(i) => TypeNode::Import(ImportRef {
                specifier: i.specifier.clone(),
                qualifier: i.qualifier.clone(),
                args: map(&i.args),
                module: i.module,
            }),
            TypeNode::Array(inner) => TypeNode::Array(Box::new(inner.substitute(bindings))),
            TypeNode::Tuple(items) => TypeNode::Tuple(map(items)),
            TypeNode::Union(items) => TypeNode::Union(map(items)),
            TypeNode::Intersection(items) => TypeNode::Intersection(map(items)),
            TypeNode::Object(object) => TypeNode::Object(ObjectType {
                members: object
                    .members
                    .iter()
                    .map(|m| Member {
                        name: m.name.clone(),
                        optional: m.optional,
                        ty: m.ty.substitute(bindings),
                    })
                    .collect(),
            }),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Keyword::Any => "any",
            Keyword::Unknown => "unknown",
            Keyword::Never => "never",
            Keyword::Void => "void",
            Keyword::Null => "null",
            Keyword::Undefined => "undefined",
            Keyword::String => "string",
            Keyword::Number => "number",
            Keyword::Boolean => "boolean",
            Keyword::BigInt => "bigint",
            Keyword::Symbol => "symbol",
            Keyword::Object => "object",
        };
        f.write_str(text)
    }
}

impl fmt::Display for LiteralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralType::String(value) => write!(f, "{:?}", value),
            LiteralType::Number(value) => write!(f, "{}", value),
            LiteralType::Boolean(value) => write!(f, "{}", value),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[TypeNode], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[TypeNode]) -> fmt::Result {
    if args.is_empty() {
        return Ok(());
    }
    f.write_str("<")?;
    write_joined(f, args, ", ")?;
    f.write_str(">")
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNode::Keyword(k) => write!(f, "{}", k),
            TypeNode::Literal(l) => write!(f, "{}", l),
            TypeNode::Array(inner) => match inner.as_ref() {
                TypeNode::Union(_) | TypeNode::Intersection(_) => write!(f, "({})[]", inner),
                _ => write!(f, "{}[]", inner),
            },
            TypeNode::Tuple(items) => {
                f.write_str("[")?;
                write_joined(f, items, ", ")?;
                f.write_str("]")
            }
            TypeNode::Object(object) => {
                if object.members.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for member in &object.members {
                    let optional = if member.optional { "?" } else { "" };
                    write!(f, "{:?}{}: {}; ", member.name, optional, member.ty)?;
                }
                f.write_str("}")
            }
            TypeNode::Union(items) => write_joined(f, items, " | "),
            TypeNode::Intersection(items) => write_joined(f, items, " & "),
            TypeNode::Reference(r) => {
                f.write_str(&r.name)?;
                write_args(f, &r.args)
            }
            TypeNode::Import(i) => {
                write!(f, "import({:?})", i.specifier)?;
                if let Some(qualifier) = &i.qualifier {
                    write!(f, ".{}", qualifier)?;
                }
                write_args(f, &i.args)
            }
            TypeNode::Query(q) => write!(f, "typeof {}", q.name),
            TypeNode::Other(text) => f.write_str(text),
        }
    }
}

/// Lowers oxc type syntax of one source file into [`TypeNode`]s.
pub struct Lowerer<'s> {
    source: &'s str,
    module: ModuleId,
}

impl<'s> Lowerer<'s> {
    pub fn new(source: &'s str, module: ModuleId) -> Self {
        Self { source, module }
    }

    pub fn lower(&self, ty: &TSType<'_>) -> TypeNode {
        match ty {
            TSType::TSAnyKeyword(_) => TypeNode::Keyword(Keyword::Any),
            TSType::TSUnknownKeyword(_) => TypeNode::Keyword(Keyword::Unknown),
            TSType::TSNeverKeyword(_) => TypeNode::Keyword(Keyword::Never),
            TSType::TSVoidKeyword(_) => TypeNode::Keyword(Keyword::Void),
            TSType::TSNullKeyword(_) => TypeNode::Keyword(Keyword::Null),
            TSType::TSUndefinedKeyword(_) => TypeNode::Keyword(Keyword::Undefined),
            TSType::TSStringKeyword(_) => TypeNode::Keyword(Keyword::String),
            TSType::TSNumberKeyword(_) => TypeNode::Keyword(Keyword::Number),
            TSType::TSBooleanKeyword(_) => TypeNode::Keyword(Keyword::Boolean),
            TSType::TSBigIntKeyword(_) => TypeNode::Keyword(Keyword::BigInt),
            TSType::TSSymbolKeyword(_) => TypeNode::Keyword(Keyword::Symbol),
            TSType::TSObjectKeyword(_) => TypeNode::Keyword(Keyword::Object),
            TSType::TSLiteralType(lit) => self.lower_literal(&lit.literal, ty),
            TSType::TSArrayType(array) => {
                TypeNode::Array(Box::new(self.lower(&array.element_type)))
            }
            TSType::TSTupleType(tuple) => TypeNode::Tuple(
                tuple
                    .element_types
                    .iter()
                    .map(|element| self.lower_tuple_element(element))
                    .collect(),
            ),
            TSType::TSNamedTupleMember(member) => self.lower_tuple_element(&member.element_type),
            TSType::TSTypeLiteral(literal) => {
                TypeNode::Object(self.lower_signatures(&literal.members))
            }
            TSType::TSUnionType(union) => {
                TypeNode::Union(union.types.iter().map(|t| self.lower(t)).collect())
            }
            TSType::TSIntersectionType(intersection) => TypeNode::Intersection(
                intersection.types.iter().map(|t| self.lower(t)).collect(),
            ),
            TSType::TSParenthesizedType(paren) => self.lower(&paren.type_annotation),
            TSType::TSTypeOperatorType(op) if op.operator == TSTypeOperatorOperator::Readonly => {
                self.lower(&op.type_annotation)
            }
            TSType::TSTypeReference(reference) => {
                let name = type_name_text(&reference.type_name);
                let mut args = self.lower_args(reference.type_arguments.as_deref());
                if (name == "Array" || name == "ReadonlyArray") && args.len() == 1 {
                    return TypeNode::Array(Box::new(args.remove(0)));
                }
                TypeNode::Reference(TypeRef {
                    name,
                    args,
                    module: self.module,
                })
            }
            TSType::TSImportType(import) => TypeNode::Import(ImportRef {
                specifier: import.source.value.to_string(),
                qualifier: import.qualifier.as_ref().map(import_qualifier_text),
                args: self.lower_args(import.type_arguments.as_deref()),
                module: self.module,
            }),
            TSType::TSTypeQuery(query) => match &query.expr_name {
                TSTypeQueryExprName::IdentifierReference(ident) => TypeNode::Query(TypeQuery {
                    name: ident.name.to_string(),
                    module: self.module,
                }),
                TSTypeQueryExprName::QualifiedName(qualified) => TypeNode::Query(TypeQuery {
                    name: format!(
                        "{}.{}",
                        type_name_text(&qualified.left),
                        qualified.right.name
                    ),
                    module: self.module,
                }),
                _ => self.other(ty),
            },
            _ => self.other(ty),
        }
    }

    fn lower_literal(&self, literal: &TSLiteral<'_>, ty: &TSType<'_>) -> TypeNode {
        match literal {
            TSLiteral::StringLiteral(s) => {
                TypeNode::Literal(LiteralType::String(s.value.to_string()))
            }
            TSLiteral::NumericLiteral(n) => TypeNode::Literal(LiteralType::Number(n.value)),
            TSLiteral::BooleanLiteral(b) => TypeNode::Literal(LiteralType::Boolean(b.value)),
            TSLiteral::TemplateLiteral(t) => match t.single_quasi() {
                Some(text) => TypeNode::Literal(LiteralType::String(text.to_string())),
                None => self.other(ty),
            },
            TSLiteral::UnaryExpression(unary) => {
                match unary.span.source_text(self.source).trim().parse::<f64>() {
                    Ok(value) => TypeNode::Literal(LiteralType::Number(value)),
                    Err(_) => self.other(ty),
                }
            }
            TSLiteral::BigIntLiteral(_) => TypeNode::Keyword(Keyword::BigInt),
        }
    }

    fn lower_tuple_element(&self, element: &TSTupleElement<'_>) -> TypeNode {
        match element {
            TSTupleElement::TSOptionalType(optional) => self.lower(&optional.type_annotation),
            TSTupleElement::TSRestType(rest) => self.lower(&rest.type_annotation),
            other => match other.as_ts_type() {
                Some(ty) => self.lower(ty),
                None => TypeNode::Other(other.span().source_text(self.source).to_string()),
            },
        }
    }

    /// A reference written in this file, e.g. an interface heritage clause.
    pub fn reference(&self, name: String, args: Vec<TypeNode>) -> TypeNode {
        TypeNode::Reference(TypeRef {
            name,
            args,
            module: self.module,
        })
    }

    fn lower_args(&self, args: Option<&TSTypeParameterInstantiation<'_>>) -> Vec<TypeNode> {
        args.map(|a| a.params.iter().map(|t| self.lower(t)).collect())
            .unwrap_or_default()
    }

    /// Lower the property signatures of a type literal or interface body.
    ///
    /// Methods, call signatures and index signatures carry no route or schema
    /// information and are skipped.
    pub fn lower_signatures(&self, signatures: &[TSSignature<'_>]) -> ObjectType {
        let members = signatures
            .iter()
            .filter_map(|signature| match signature {
                TSSignature::TSPropertySignature(prop) => {
                    let name = property_key_text(&prop.key)?;
                    let ty = prop
                        .type_annotation
                        .as_ref()
                        .map(|annotation| self.lower(&annotation.type_annotation))
                        .unwrap_or(TypeNode::Keyword(Keyword::Any));
                    Some(Member {
                        name,
                        optional: prop.optional,
                        ty,
                    })
                }
                _ => None,
            })
            .collect();
        ObjectType { members }
    }

    fn other(&self, ty: &TSType<'_>) -> TypeNode {
        TypeNode::Other(ty.span().source_text(self.source).to_string())
    }
}

/// Render a (possibly qualified) type name as dotted text.
pub fn type_name_text(name: &TSTypeName<'_>) -> String {
    match name {
        TSTypeName::IdentifierReference(ident) => ident.name.to_string(),
        TSTypeName::QualifiedName(qualified) => {
            format!("{}.{}", type_name_text(&qualified.left), qualified.right.name)
        }
        TSTypeName::ThisExpression(_) => "this".to_string(),
    }
}

fn import_qualifier_text(qualifier: &TSImportTypeQualifier<'_>) -> String {
    match qualifier {
        TSImportTypeQualifier::Identifier(ident) => ident.name.to_string(),
        TSImportTypeQualifier::QualifiedName(qualified) => {
            format!("{}.{}", import_qualifier_text(&qualified.left), qualified.right.name)
        }
    }
}

/// Static text of a property key; computed keys have none.
pub fn property_key_text(key: &PropertyKey<'_>) -> Option<String> {
    key.static_name().map(|name| name.into_owned())
}
