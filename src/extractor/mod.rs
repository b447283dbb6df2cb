//! Route extraction from Hono application types.
//!
//! Hono encodes every route of an application in the type of the app instance: a route table
//! keyed by path, whose values map `$verb` keys to one or more response branches. This module
//! recovers those routes in two ways:
//!
//! - [`hono::HonoExtractor`] walks the route-table type, following prefix merges
//!   (`MergeSchemaPath<Schema, "/prefix">`) and unions produced by `app.route(...)`.
//! - [`source_scan::scan_routes`] is the fallback used when the route table collapsed to the
//!   empty placeholder; it scans the route source for `.get("/path", ...)` style calls.
//!
//! [`input`] turns a branch's `input` shape into OpenAPI parameters and request bodies.

pub mod hono;
pub mod input;
pub mod source_scan;

use crate::type_graph::{ObjectType, TypeNode};
use crate::type_resolver::TypeResolver;
use log::{debug, warn};

/// Type literal enumerating path -> verb -> signature members, mounted at `prefix`.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEntry {
    /// Accumulated path prefix (possibly empty)
    pub prefix: String,
    /// Route literal; member names are raw route paths
    pub literal: ObjectType,
}

/// A `(method, path)` pair discovered by the source-text fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredRoute {
    /// Route path exactly as written
    pub path: String,
    pub method: HttpMethod,
}

/// HTTP methods supported by route extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// Parse a method name (`get`, `POST`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            "patch" => Some(HttpMethod::Patch),
            "options" => Some(HttpMethod::Options),
            "head" => Some(HttpMethod::Head),
            _ => None,
        }
    }

    /// Parse a route-table verb key (`$get`, `$post`, ...)
    pub fn from_verb_key(key: &str) -> Option<Self> {
        key.strip_prefix('$').and_then(Self::from_name)
    }

    /// Lowercase name, as used for OpenAPI path item keys
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
        }
    }

    /// Uppercase name, as used in generated summaries
    pub fn as_upper(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }
}

/// One response branch of a verb signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub input: Option<TypeNode>,
    pub output: Option<TypeNode>,
    /// `json`, `text`, ... when declared as a string literal
    pub output_format: Option<String>,
    /// Numeric status; `None` means the status is not a concrete code
    pub status: Option<u16>,
}

/// All branches of one verb at one route path.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    pub method: HttpMethod,
    pub branches: Vec<Branch>,
}

impl Branch {
    /// Read a branch literal, resolving `outputFormat` and `status` through aliases.
    pub fn from_literal(resolver: &mut TypeResolver, literal: &ObjectType) -> Self {
        let field = |name: &str| literal.member(name).map(|m| m.ty.clone());

        let output_format = field("outputFormat")
            .map(|ty| resolver.resolve(&ty))
            .and_then(|ty| ty.as_string_literal().map(str::to_string));
        let status = field("status")
            .map(|ty| resolver.resolve(&ty))
            .and_then(|ty| ty.as_integer_literal());

        Self {
            input: field("input"),
            output: field("output"),
            output_format,
            status,
        }
    }
}

/// Decode the verb members of one route path value.
///
/// The value is normally a type literal keyed by `$verb`; intersections of such literals are
/// flattened. Each verb's value is a single branch literal or a union of them.
pub fn method_signatures(resolver: &mut TypeResolver, value: &TypeNode) -> Vec<MethodSignature> {
    let mut signatures: Vec<MethodSignature> = Vec::new();

    for member in flatten_objects(resolver, value).members {
        let Some(method) = HttpMethod::from_verb_key(&member.name) else {
            warn!("Ignoring unknown verb key: {}", member.name);
            continue;
        };

        let branches = branch_literals(resolver, &member.ty)
            .iter()
            .map(|literal| Branch::from_literal(resolver, literal))
            .collect::<Vec<_>>();
        if branches.is_empty() {
            debug!("No response branches for {}", member.name);
        }

        match signatures.iter_mut().find(|s| s.method == method) {
            Some(existing) => existing.branches.extend(branches),
            None => signatures.push(MethodSignature { method, branches }),
        }
    }

    signatures
}

/// Resolve `node` and merge the members of every type literal it is made of.
fn flatten_objects(resolver: &mut TypeResolver, node: &TypeNode) -> ObjectType {
    match resolver.resolve(node) {
        TypeNode::Object(object) => object,
        TypeNode::Intersection(parts) => {
            let mut merged = ObjectType::default();
            for part in &parts {
                merged.members.extend(flatten_objects(resolver, part).members);
            }
            merged
        }
        other => {
            debug!("Route value is not an object ({}): {}", other.kind_name(), other);
            ObjectType::default()
        }
    }
}

fn branch_literals(resolver: &mut TypeResolver, node: &TypeNode) -> Vec<ObjectType> {
    match resolver.resolve(node) {
        TypeNode::Union(members) => members
            .iter()
            .flat_map(|member| branch_literals(resolver, member))
            .collect(),
        TypeNode::Object(object) => vec![object],
        TypeNode::Intersection(_) => vec![flatten_objects(resolver, node)],
        other => {
            debug!("Skipping non-literal branch ({}): {}", other.kind_name(), other);
            Vec::new()
        }
    }
}

/// Join a mount prefix and a route path.
///
/// An empty or root prefix leaves `path` unchanged, a root `path` collapses to the prefix, and
/// the result never contains a doubled slash at the join.
pub fn combine_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path.to_string();
    }
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return prefix.to_string();
    }
    format!("{}/{}", prefix, path)
}
