use crate::error::{GenError, Result};
use crate::extractor::{combine_paths, RouteEntry};
use crate::type_graph::{ObjectType, TypeNode};
use crate::type_resolver::TypeResolver;
use log::{debug, warn};

/// Hono route-table walker
///
/// Recovers [`RouteEntry`] values from the type of a Hono application. The app type is
/// `Hono<Env, Schema, BasePath>` (or `HonoBase`), and `Schema` is a tree of type literals,
/// intersections, unions and `MergeSchemaPath<Schema, "/prefix">` applications built up by
/// `app.get(...)` and `app.route("/prefix", sub)` calls.
pub struct HonoExtractor<'r> {
    type_resolver: &'r mut TypeResolver,
}

/// How a node of the route-table tree is treated.
enum RouteNode {
    Literal(ObjectType),
    Intersection(Vec<TypeNode>),
    Union(Vec<TypeNode>),
    /// `MergeSchemaPath<Schema, Path>` arguments
    Merge(Vec<TypeNode>),
    /// `BlankSchema`
    Blank,
    Other(TypeNode),
}

impl<'r> HonoExtractor<'r> {
    pub fn new(type_resolver: &'r mut TypeResolver) -> Self {
        Self { type_resolver }
    }

    /// Extract all route literals from an application type.
    ///
    /// Returns `Ok(None)` when the route table collapsed to the empty placeholder, in which
    /// case the caller falls back to scanning the route source text.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::MalformedAppType`] when the app type has fewer than two generic
    /// arguments and [`GenError::UnsupportedRouteShape`] when the route table is not a literal,
    /// union, intersection or placeholder.
    pub fn extract(&mut self, app_type: &TypeNode) -> Result<Option<Vec<RouteEntry>>> {
        match self.routes_node(app_type)? {
            Some(routes) => self.extract_route_literals(&routes).map(Some),
            None => Ok(None),
        }
    }

    /// Find the routes node (second generic argument) of an application type.
    ///
    /// Returns `Ok(None)` for the empty placeholder.
    pub fn routes_node(&mut self, app_type: &TypeNode) -> Result<Option<TypeNode>> {
        let app = self.type_resolver.resolve(app_type);
        match &app {
            TypeNode::Reference(_) | TypeNode::Import(_) => {}
            TypeNode::Query(query) => {
                debug!("App value `{}` has no declared type, treating routes as collapsed", query.name);
                return Ok(None);
            }
            other => {
                return Err(GenError::MalformedAppType(format!(
                    "expected a Hono application type, found {} `{}`",
                    other.kind_name(),
                    other
                )))
            }
        }

        let args = app.type_args();
        if args.len() < 2 {
            return Err(GenError::MalformedAppType(format!(
                "`{}` has {} type argument(s), expected at least 2",
                app,
                args.len()
            )));
        }

        let routes = args[1].clone();
        match self.classify(&routes) {
            RouteNode::Blank => Ok(None),
            RouteNode::Literal(object) if object.is_empty() => Ok(None),
            _ => Ok(Some(routes)),
        }
    }

    /// Flatten a routes node into one entry per route literal.
    pub fn extract_route_literals(&mut self, routes: &TypeNode) -> Result<Vec<RouteEntry>> {
        let mut entries = Vec::new();
        match self.classify(routes) {
            RouteNode::Other(node) => {
                return Err(GenError::UnsupportedRouteShape {
                    kind: node.kind_name().to_string(),
                    text: node.to_string(),
                })
            }
            classified => self.walk(classified, "", &mut entries),
        }
        debug!("Recovered {} route literals", entries.len());
        Ok(entries)
    }

    fn walk(&mut self, node: RouteNode, prefix: &str, entries: &mut Vec<RouteEntry>) {
        match node {
            RouteNode::Literal(literal) => entries.push(RouteEntry {
                prefix: prefix.to_string(),
                literal,
            }),
            RouteNode::Intersection(members) | RouteNode::Union(members) => {
                for member in &members {
                    let classified = self.classify(member);
                    self.walk(classified, prefix, entries);
                }
            }
            RouteNode::Merge(args) => {
                let Some(mount) = args.get(1).map(|p| self.type_resolver.resolve(p)) else {
                    warn!("MergeSchemaPath without a path argument, skipping");
                    return;
                };
                let Some(mount) = mount.as_string_literal() else {
                    warn!("MergeSchemaPath path is not a string literal: {}", mount);
                    return;
                };
                let nested_prefix = combine_paths(prefix, mount);
                debug!("Descending into routes mounted at {}", nested_prefix);
                let classified = self.classify(&args[0]);
                self.walk(classified, &nested_prefix, entries);
            }
            RouteNode::Blank => {}
            RouteNode::Other(node) => {
                debug!("Ignoring {} member of route table: {}", node.kind_name(), node);
            }
        }
    }

    fn classify(&mut self, node: &TypeNode) -> RouteNode {
        if let Some(construct) = self.framework_construct(node) {
            return construct;
        }
        let resolved = self.type_resolver.resolve(node);
        if let Some(construct) = self.framework_construct(&resolved) {
            return construct;
        }
        match resolved {
            TypeNode::Object(object) => RouteNode::Literal(object),
            TypeNode::Intersection(members) => RouteNode::Intersection(members),
            TypeNode::Union(members) => RouteNode::Union(members),
            other => RouteNode::Other(other),
        }
    }

    fn framework_construct(&self, node: &TypeNode) -> Option<RouteNode> {
        match self.type_resolver.canonical_name(node)?.as_str() {
            "MergeSchemaPath" if node.type_args().len() >= 2 => {
                Some(RouteNode::Merge(node.type_args().to_vec()))
            }
            "BlankSchema" => Some(RouteNode::Blank),
            _ => None,
        }
    }
}
