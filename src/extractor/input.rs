use crate::extractor::Branch;
use crate::openapi_builder::{MediaType, Parameter, ParameterLocation, RequestBody};
use crate::schema_generator::SchemaGenerator;
use crate::type_graph::{ObjectType, TypeNode};
use crate::type_resolver::TypeResolver;
use indexmap::IndexMap;
use log::debug;

/// Parameter sources of a Hono `input` shape, in emission order.
const PARAMETER_SOURCES: &[(&str, ParameterLocation)] = &[
    ("query", ParameterLocation::Query),
    ("param", ParameterLocation::Path),
    ("header", ParameterLocation::Header),
    ("cookie", ParameterLocation::Cookie),
];

/// Request body sources of a Hono `input` shape and their media types.
const BODY_SOURCES: &[(&str, &str)] = &[
    ("json", "application/json"),
    ("form", "multipart/form-data"),
];

/// Generate OpenAPI parameters from a branch's `input` shape.
///
/// A missing `input`, or a missing source inside it, contributes no parameters.
pub fn gen_parameters(resolver: &mut TypeResolver, branch: &Branch) -> Vec<Parameter> {
    let Some(input) = input_object(resolver, branch) else {
        return Vec::new();
    };

    let mut parameters = Vec::new();
    for (source, location) in PARAMETER_SOURCES {
        let Some(fields) = source_object(resolver, &input, source) else {
            continue;
        };
        for field in &fields.members {
            let schema = SchemaGenerator::new(resolver).generate_schema(&field.ty);
            parameters.push(Parameter {
                name: field.name.clone(),
                location: *location,
                required: !field.optional,
                schema,
            });
        }
    }

    debug!("Generated {} parameters", parameters.len());
    parameters
}

/// Generate the request body from a branch's `input.json` and `input.form` shapes.
///
/// Returns `None` when neither is present.
pub fn gen_request_body(resolver: &mut TypeResolver, branch: &Branch) -> Option<RequestBody> {
    let input = input_object(resolver, branch)?;

    let mut content = IndexMap::new();
    for (source, media_type) in BODY_SOURCES {
        if let Some(member) = input.member(source) {
            let schema = SchemaGenerator::new(resolver).generate_schema(&member.ty);
            content.insert(media_type.to_string(), MediaType { schema });
        }
    }

    if content.is_empty() {
        None
    } else {
        Some(RequestBody {
            required: true,
            content,
        })
    }
}

fn input_object(resolver: &mut TypeResolver, branch: &Branch) -> Option<ObjectType> {
    let input = branch.input.as_ref()?;
    as_object(resolver, input)
}

fn source_object(resolver: &mut TypeResolver, input: &ObjectType, source: &str) -> Option<ObjectType> {
    let member = input.member(source)?;
    as_object(resolver, &member.ty)
}

fn as_object(resolver: &mut TypeResolver, ty: &TypeNode) -> Option<ObjectType> {
    match resolver.resolve(ty) {
        TypeNode::Object(object) => Some(object),
        TypeNode::Intersection(parts) => {
            let mut merged = ObjectType::default();
            for part in &parts {
                if let Some(object) = as_object(resolver, part) {
                    merged.members.extend(object.members);
                }
            }
            Some(merged)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_resolver::PathAliases;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn with_branch<T>(input: &str, f: impl FnOnce(&mut TypeResolver, &Branch) -> T) -> T {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("routes.ts");
        fs::write(
            &path,
            format!(
                "export type T = {{ input: {}; output: {{}}; outputFormat: \"json\"; status: 200 }};",
                input
            ),
        )
        .unwrap();

        let mut resolver = TypeResolver::new(PathAliases::default());
        let module = resolver.add_source_file(&path).unwrap();
        let ty = resolver.app_type(module, Some("T")).unwrap();
        let literal = resolver.resolve(&ty).as_object().unwrap().clone();
        let branch = Branch::from_literal(&mut resolver, &literal);
        f(&mut resolver, &branch)
    }

    #[test]
    fn test_parameters_from_all_sources() {
        let params = with_branch(
            r#"{
                param: { id: string };
                query: { page?: string; tags: string[] };
                header: { "x-request-id"?: string };
                cookie: { session: string };
            }"#,
            |resolver, branch| gen_parameters(resolver, branch),
        );

        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!([
                {"name": "page", "in": "query", "required": false, "schema": {"type": "string"}},
                {"name": "tags", "in": "query", "required": true,
                 "schema": {"type": "array", "items": {"type": "string"}}},
                {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}},
                {"name": "x-request-id", "in": "header", "required": false, "schema": {"type": "string"}},
                {"name": "session", "in": "cookie", "required": true, "schema": {"type": "string"}}
            ])
        );
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let (params, body) = with_branch("{}", |resolver, branch| {
            (gen_parameters(resolver, branch), gen_request_body(resolver, branch))
        });
        assert!(params.is_empty());
        assert!(body.is_none());
    }

    #[test]
    fn test_branch_without_input_member() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("routes.ts");
        fs::write(
            &path,
            "export type T = { output: { ok: boolean }; outputFormat: \"json\"; status: 200 };",
        )
        .unwrap();
        let mut resolver = TypeResolver::new(PathAliases::default());
        let module = resolver.add_source_file(&path).unwrap();
        let ty = resolver.app_type(module, Some("T")).unwrap();
        let literal = resolver.resolve(&ty).as_object().unwrap().clone();
        let branch = Branch::from_literal(&mut resolver, &literal);

        assert!(branch.input.is_none());
        assert!(gen_parameters(&mut resolver, &branch).is_empty());
        assert!(gen_request_body(&mut resolver, &branch).is_none());
    }

    #[test]
    fn test_request_body_json_and_form() {
        let body = with_branch(
            "{ json: { name: string }; form: { file: string } }",
            |resolver, branch| gen_request_body(resolver, branch),
        )
        .unwrap();

        assert!(body.required);
        let media_types: Vec<_> = body.content.keys().cloned().collect();
        assert_eq!(media_types, vec!["application/json", "multipart/form-data"]);
        assert_eq!(
            serde_json::to_value(&body.content["application/json"].schema).unwrap(),
            json!({"type": "object", "properties": {"name": {"type": "string"}}, "required": ["name"]})
        );
    }
}
