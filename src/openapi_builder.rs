use crate::doc_lookup::DocLookup;
use crate::extractor::input::{gen_parameters, gen_request_body};
use crate::extractor::{
    combine_paths, method_signatures, Branch, DiscoveredRoute, HttpMethod, RouteEntry,
};
use crate::schema_generator::{Schema, SchemaGenerator};
use crate::type_graph::{Keyword, TypeNode};
use crate::type_resolver::TypeResolver;
use indexmap::IndexMap;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Response key for branches without a concrete status code
pub const DEFAULT_STATUS: &str = "default";

/// Description of `default` responses
pub const DEFAULT_RESPONSE_DESCRIPTION: &str = "Default response";

/// OpenAPI document builder
///
/// Collects the operations of one route group. Paths keep the order in which they were first
/// added, so the same input always produces the same document.
pub struct OpenApiBuilder {
    /// OpenAPI version
    openapi: String,
    /// OpenAPI info section
    info: Info,
    servers: Option<Vec<Server>>,
    /// Paths collection (URL path -> PathItem)
    paths: IndexMap<String, PathItem>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Server object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Tag object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    /// GET operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// POST operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// PUT operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// DELETE operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// PATCH operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// OPTIONS operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    /// Parameters (path, query, header, cookie)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Request body
    #[serde(rename = "requestBody", default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code or `default`
    pub responses: IndexMap<String, Response>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter location
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Whether the parameter is required
    pub required: bool,
    /// Parameter schema
    pub schema: Schema,
}

/// Where a parameter is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
    Cookie,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Whether the request body is required
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    pub description: String,
    /// Response content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<Server>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    /// API paths
    pub paths: IndexMap<String, PathItem>,
}

impl PathItem {
    /// The operation slot for `method`
    pub fn operation_mut(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        }
    }

    /// Operations present on this path, in fixed method order
    pub fn operations_mut(&mut self) -> impl Iterator<Item = (HttpMethod, &mut Operation)> {
        [
            (HttpMethod::Get, &mut self.get),
            (HttpMethod::Post, &mut self.post),
            (HttpMethod::Put, &mut self.put),
            (HttpMethod::Delete, &mut self.delete),
            (HttpMethod::Patch, &mut self.patch),
            (HttpMethod::Options, &mut self.options),
            (HttpMethod::Head, &mut self.head),
        ]
        .into_iter()
        .filter_map(|(method, slot)| slot.as_mut().map(|op| (method, op)))
    }

    /// Move every operation of `other` into this item, returning the methods that were replaced.
    pub fn merge(&mut self, mut other: PathItem) -> Vec<HttpMethod> {
        let mut replaced = Vec::new();
        for method in ALL_METHODS {
            if let Some(operation) = other.operation_mut(method).take() {
                if self.operation_mut(method).replace(operation).is_some() {
                    replaced.push(method);
                }
            }
        }
        replaced
    }

    pub fn is_empty(&self) -> bool {
        *self == PathItem::default()
    }
}

const ALL_METHODS: [HttpMethod; 7] = [
    HttpMethod::Get,
    HttpMethod::Post,
    HttpMethod::Put,
    HttpMethod::Delete,
    HttpMethod::Patch,
    HttpMethod::Options,
    HttpMethod::Head,
];

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            openapi: "3.0.0".to_string(),
            info: Info {
                title: "Generated API".to_string(),
                version: "1.0.0".to_string(),
                description: None,
            },
            servers: None,
            paths: IndexMap::new(),
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, info: Info) -> Self {
        self.info = info;
        self
    }

    pub fn with_openapi_version(mut self, openapi: impl Into<String>) -> Self {
        self.openapi = openapi.into();
        self
    }

    pub fn with_servers(mut self, servers: Option<Vec<Server>>) -> Self {
        self.servers = servers;
        self
    }

    /// Add every route of the recovered route literals.
    pub fn add_route_entries(
        &mut self,
        resolver: &mut TypeResolver,
        entries: &[RouteEntry],
        docs: &DocLookup,
        group_name: &str,
    ) {
        for entry in entries {
            for route in &entry.literal.members {
                let path = normalize_path(&combine_paths(&entry.prefix, &route.name));
                for signature in method_signatures(resolver, &route.ty) {
                    debug!("Adding route: {} {}", signature.method.as_upper(), path);
                    let mut operation = documented_operation(
                        signature.method,
                        &route.name,
                        &path,
                        docs,
                        group_name,
                    );

                    if let Some(first) = signature.branches.first() {
                        operation.parameters = gen_parameters(resolver, first);
                        operation.request_body = gen_request_body(resolver, first);
                    }
                    operation.responses = group_responses(resolver, &signature.branches);
                    if operation.responses.is_empty() {
                        operation.responses = default_responses();
                    }

                    self.insert_operation(path.clone(), signature.method, operation);
                }
            }
        }
    }

    /// Add routes found by the source-text fallback.
    ///
    /// These carry no parameters or body and a single `default` response.
    pub fn add_discovered_routes(
        &mut self,
        routes: &[DiscoveredRoute],
        docs: &DocLookup,
        group_name: &str,
    ) {
        for route in routes {
            let path = normalize_path(&route.path);
            debug!("Adding discovered route: {} {}", route.method.as_upper(), path);
            let mut operation =
                documented_operation(route.method, &route.path, &path, docs, group_name);
            operation.responses = default_responses();
            self.insert_operation(path, route.method, operation);
        }
    }

    fn insert_operation(&mut self, path: String, method: HttpMethod, operation: Operation) {
        let item = self.paths.entry(path.clone()).or_default();
        if item.operation_mut(method).replace(operation).is_some() {
            warn!("Duplicate operation {} {}, keeping the last one", method.as_upper(), path);
        }
    }

    /// Number of paths collected so far
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Build the final OpenAPI document
    pub fn build(self) -> OpenApiDocument {
        debug!("Building OpenAPI document with {} paths", self.paths.len());
        OpenApiDocument {
            openapi: self.openapi,
            info: self.info,
            servers: self.servers,
            tags: None,
            paths: self.paths,
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Operation with summary, description, tags and deprecation filled from documentation.
///
/// Documentation is looked up by the raw route path, before any prefix was applied.
fn documented_operation(
    method: HttpMethod,
    raw_path: &str,
    path: &str,
    docs: &DocLookup,
    group_name: &str,
) -> Operation {
    let auto_summary = format!("Auto-generated {} {}", method.as_upper(), path);
    match docs.get(method, raw_path) {
        Some(doc) => Operation {
            summary: Some(doc.summary.clone().unwrap_or(auto_summary)),
            description: doc.description.clone(),
            tags: doc.tags.clone(),
            deprecated: doc.deprecated,
            ..Operation::default()
        },
        None => Operation {
            summary: Some(auto_summary),
            tags: Some(vec![group_name.to_string()]),
            ..Operation::default()
        },
    }
}

fn default_responses() -> IndexMap<String, Response> {
    let mut responses = IndexMap::new();
    responses.insert(
        DEFAULT_STATUS.to_string(),
        Response {
            description: DEFAULT_RESPONSE_DESCRIPTION.to_string(),
            content: None,
        },
    );
    responses
}

/// Group response branches by status code.
///
/// Each distinct numeric status gets one response; non-numeric statuses share `default`.
/// Several schemas under one status and media type are combined with `oneOf`.
pub fn group_responses(
    resolver: &mut TypeResolver,
    branches: &[Branch],
) -> IndexMap<String, Response> {
    let mut grouped: IndexMap<String, IndexMap<String, Vec<Schema>>> = IndexMap::new();

    for branch in branches {
        let status = branch
            .status
            .map(|code| code.to_string())
            .unwrap_or_else(|| DEFAULT_STATUS.to_string());
        let content = grouped.entry(status).or_default();

        let Some(output) = branch.output.as_ref() else {
            continue;
        };
        let output = resolver.resolve(output);
        if matches!(
            output,
            TypeNode::Keyword(Keyword::Null | Keyword::Undefined | Keyword::Void | Keyword::Never)
        ) {
            continue;
        }

        let media_type = match branch.output_format.as_deref() {
            Some("text") => "text/plain",
            _ => "application/json",
        };
        let schema = SchemaGenerator::new(resolver).generate_schema(&output);
        content.entry(media_type.to_string()).or_default().push(schema);
    }

    grouped
        .into_iter()
        .map(|(status, content)| {
            let content: IndexMap<String, MediaType> = content
                .into_iter()
                .map(|(media_type, mut schemas)| {
                    let schema = if schemas.len() == 1 {
                        schemas.remove(0)
                    } else {
                        Schema::one_of(schemas)
                    };
                    (media_type, MediaType { schema })
                })
                .collect();
            let response = Response {
                description: status_description(&status),
                content: if content.is_empty() {
                    None
                } else {
                    Some(content)
                },
            };
            (status, response)
        })
        .collect()
}

/// Canonical reason phrase for a status key.
pub fn status_description(status: &str) -> String {
    if status == DEFAULT_STATUS {
        return DEFAULT_RESPONSE_DESCRIPTION.to_string();
    }
    status
        .parse::<u16>()
        .ok()
        .and_then(|code| http::StatusCode::from_u16(code).ok())
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Response")
        .to_string()
}

static PATH_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":([A-Za-z0-9_]+)(\{(?:[^{}]|\{[^{}]*\})*\})?\??")
        .expect("valid path parameter pattern")
});

/// Convert Hono path parameters (`:id`, `:id?`, `:id{[0-9]+}`) to OpenAPI `{id}` syntax.
///
/// Already-converted paths are left unchanged, so normalizing twice is harmless.
pub fn normalize_path(path: &str) -> String {
    PATH_PARAM.replace_all(path, "{$1}").into_owned()
}
