use crate::type_graph::{Keyword, LiteralType, ObjectType, TypeNode};
use crate::type_resolver::TypeResolver;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Schema generator - converts TypeScript types to OpenAPI schemas
///
/// Generation is total: shapes without an OpenAPI counterpart (classes, intersections,
/// opaque library types, ...) degrade to the empty schema `{}`.
pub struct SchemaGenerator<'r> {
    /// Session used to expand named types
    type_resolver: &'r mut TypeResolver,
    /// Named types currently being expanded, to stop on recursive types
    expanding: Vec<String>,
}

/// OpenAPI Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The type of the schema (string, number, boolean, object, array)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Enum values for string literal unions
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Alternatives of a union
    #[serde(rename = "oneOf", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Schema>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Properties for object types, in declaration order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    /// Required field names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl Schema {
    /// Schema with only `type` set
    pub fn of_type(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }

    /// Schema combining alternatives with `oneOf`
    pub fn one_of(schemas: Vec<Schema>) -> Self {
        Self {
            one_of: Some(schemas),
            ..Self::default()
        }
    }

    /// Whether this is the empty schema `{}`
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl<'r> SchemaGenerator<'r> {
    pub fn new(type_resolver: &'r mut TypeResolver) -> Self {
        Self {
            type_resolver,
            expanding: Vec::new(),
        }
    }

    /// Generate a schema for a type
    pub fn generate_schema(&mut self, ty: &TypeNode) -> Schema {
        match ty {
            TypeNode::Reference(_) | TypeNode::Import(_) | TypeNode::Query(_) => {
                self.generate_named_schema(ty)
            }
            TypeNode::Union(members) => self.generate_union_schema(members),
            TypeNode::Keyword(Keyword::String) => Schema::of_type("string"),
            TypeNode::Keyword(Keyword::Number) => Schema::of_type("number"),
            TypeNode::Keyword(Keyword::Boolean) => Schema::of_type("boolean"),
            TypeNode::Literal(literal) => literal_schema(literal),
            TypeNode::Array(element) => Schema {
                schema_type: Some("array".to_string()),
                items: Some(Box::new(self.generate_schema(element))),
                ..Schema::default()
            },
            TypeNode::Object(object) => self.generate_object_schema(object),
            other => {
                debug!("No schema for {} type: {}", other.kind_name(), other);
                Schema::default()
            }
        }
    }

    fn generate_named_schema(&mut self, ty: &TypeNode) -> Schema {
        let key = named_key(ty);
        if self.expanding.contains(&key) {
            warn!("Circular type reference detected for: {}", ty);
            return Schema::default();
        }

        match self.type_resolver.expand(ty) {
            Some(expanded) => {
                self.expanding.push(key);
                let schema = self.generate_schema(&expanded);
                self.expanding.pop();
                schema
            }
            None => {
                debug!("Type {} cannot be expanded, using empty schema", ty);
                Schema::default()
            }
        }
    }

    fn generate_union_schema(&mut self, members: &[TypeNode]) -> Schema {
        let members = self.flatten_union(members);
        let nullable = members.iter().any(TypeNode::is_nullish);

        let literals: Option<Vec<String>> = members
            .iter()
            .filter(|m| !m.is_nullish())
            .map(|m| m.as_string_literal().map(str::to_string))
            .collect();
        if let Some(values) = literals {
            return Schema {
                schema_type: Some("string".to_string()),
                enum_values: Some(values),
                nullable: nullable.then_some(true),
                ..Schema::default()
            };
        }

        let has_true = members.contains(&TypeNode::Literal(LiteralType::Boolean(true)));
        let has_false = members.contains(&TypeNode::Literal(LiteralType::Boolean(false)));
        let mut alternatives = Vec::new();
        for member in &members {
            if member.is_nullish() {
                continue;
            }
            // `boolean` is spelled `true | false` in declaration output.
            if has_true && has_false {
                if let TypeNode::Literal(LiteralType::Boolean(value)) = member {
                    if *value {
                        alternatives.push(Schema::of_type("boolean"));
                    }
                    continue;
                }
            }
            alternatives.push(self.generate_schema(member));
        }
        Schema::one_of(alternatives)
    }

    /// Expand named members and splice nested unions into one member list.
    fn flatten_union(&mut self, members: &[TypeNode]) -> Vec<TypeNode> {
        let mut flat = Vec::new();
        for member in members {
            match member {
                TypeNode::Reference(_) | TypeNode::Import(_) => {
                    match self.type_resolver.resolve(member) {
                        TypeNode::Union(inner) => flat.extend(self.flatten_union(&inner)),
                        TypeNode::Literal(literal) => flat.push(TypeNode::Literal(literal)),
                        TypeNode::Keyword(keyword) => flat.push(TypeNode::Keyword(keyword)),
                        _ => flat.push(member.clone()),
                    }
                }
                TypeNode::Union(inner) => flat.extend(self.flatten_union(inner)),
                _ => flat.push(member.clone()),
            }
        }
        flat
    }

    fn generate_object_schema(&mut self, object: &ObjectType) -> Schema {
        let mut properties = IndexMap::new();
        let mut required = Vec::new();

        for member in &object.members {
            let schema = self.generate_schema(&member.ty);
            properties.insert(member.name.clone(), schema);
            if !member.optional {
                required.push(member.name.clone());
            }
        }

        Schema {
            schema_type: Some("object".to_string()),
            properties: Some(properties),
            required: if required.is_empty() {
                None
            } else {
                Some(required)
            },
            ..Schema::default()
        }
    }
}

fn literal_schema(literal: &LiteralType) -> Schema {
    match literal {
        LiteralType::String(value) => Schema {
            schema_type: Some("string".to_string()),
            enum_values: Some(vec![value.clone()]),
            ..Schema::default()
        },
        LiteralType::Number(_) => Schema::of_type("number"),
        LiteralType::Boolean(_) => Schema::of_type("boolean"),
    }
}

fn named_key(ty: &TypeNode) -> String {
    let module = match ty {
        TypeNode::Reference(r) => r.module,
        TypeNode::Import(i) => i.module,
        TypeNode::Query(q) => q.module,
        _ => 0,
    };
    format!("{}:{}", module, ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_resolver::PathAliases;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    /// Build the schema of alias `T` declared in `source`
    fn schema_of(source: &str) -> serde_json::Value {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("types.ts");
        fs::write(&path, source).unwrap();

        let mut resolver = TypeResolver::new(PathAliases::default());
        let module = resolver.add_source_file(&path).unwrap();
        let ty = resolver.app_type(module, Some("T")).unwrap();
        let schema = SchemaGenerator::new(&mut resolver).generate_schema(&ty);
        serde_json::to_value(schema).unwrap()
    }

    #[test]
    fn test_primitive_types() {
        assert_eq!(schema_of("export type T = string;"), json!({"type": "string"}));
        assert_eq!(schema_of("export type T = number;"), json!({"type": "number"}));
        assert_eq!(schema_of("export type T = boolean;"), json!({"type": "boolean"}));
    }

    #[test]
    fn test_string_literal_union_with_null() {
        assert_eq!(
            schema_of(r#"export type T = "a" | "b" | null;"#),
            json!({"type": "string", "enum": ["a", "b"], "nullable": true})
        );
    }

    #[test]
    fn test_mixed_union_uses_one_of() {
        assert_eq!(
            schema_of("export type T = string | number | undefined;"),
            json!({"oneOf": [{"type": "string"}, {"type": "number"}]})
        );
    }

    #[test]
    fn test_true_false_union_collapses_to_boolean() {
        assert_eq!(
            schema_of("export type T = string | true | false;"),
            json!({"oneOf": [{"type": "string"}, {"type": "boolean"}]})
        );
    }

    #[test]
    fn test_single_literals() {
        assert_eq!(
            schema_of(r#"export type T = "ok";"#),
            json!({"type": "string", "enum": ["ok"]})
        );
        assert_eq!(schema_of("export type T = 42;"), json!({"type": "number"}));
        assert_eq!(schema_of("export type T = false;"), json!({"type": "boolean"}));
    }

    #[test]
    fn test_object_with_optional_fields() {
        assert_eq!(
            schema_of("export type T = { id: number; name?: string };"),
            json!({
                "type": "object",
                "properties": {"id": {"type": "number"}, "name": {"type": "string"}},
                "required": ["id"]
            })
        );
        assert_eq!(
            schema_of("export type T = { name?: string };"),
            json!({"type": "object", "properties": {"name": {"type": "string"}}})
        );
    }

    #[test]
    fn test_nested_arrays_of_unions_of_objects() {
        assert_eq!(
            schema_of(
                r#"
                interface User { id: number }
                export type T = (User | { kind: "guest" })[][];
                "#
            ),
            json!({
                "type": "array",
                "items": {
                    "type": "array",
                    "items": {
                        "oneOf": [
                            {"type": "object", "properties": {"id": {"type": "number"}}, "required": ["id"]},
                            {
                                "type": "object",
                                "properties": {"kind": {"type": "string", "enum": ["guest"]}},
                                "required": ["kind"]
                            }
                        ]
                    }
                }
            })
        );
    }

    #[test]
    fn test_enum_reference_in_union() {
        assert_eq!(
            schema_of(
                r#"
                enum Role { Admin = "admin", User = "user" }
                export type T = Role | null;
                "#
            ),
            json!({"type": "string", "enum": ["admin", "user"], "nullable": true})
        );
    }

    #[test]
    fn test_classes_and_intersections_are_empty() {
        assert_eq!(schema_of("class C { id = 1 }\nexport type T = C;"), json!({}));
        assert_eq!(
            schema_of("export type T = { a: string } & { b: string };"),
            json!({})
        );
        assert_eq!(schema_of("export type T = Date;"), json!({}));
    }

    #[test]
    fn test_recursive_interface_terminates() {
        assert_eq!(
            schema_of(
                r#"
                interface Node { name: string; children: Node[] }
                export type T = Node;
                "#
            ),
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "children": {"type": "array", "items": {}}
                },
                "required": ["name", "children"]
            })
        );
    }
}
