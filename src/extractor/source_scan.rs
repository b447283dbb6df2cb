use crate::error::Result;
use crate::extractor::{DiscoveredRoute, HttpMethod};
use crate::parser::{AstParser, SourceFile};
use log::{debug, info};
use oxc_ast::ast::{Argument, CallExpression, Expression};
use oxc_ast_visit::{walk, Visit};
use oxc_span::GetSpan;

/// Find `(verb, path)` pairs written as `x.verb("/path", ...)` calls in a route source file.
///
/// This is the fallback for applications whose route table collapsed to the empty placeholder
/// (routes registered by repeated mutation instead of a returned chain). It only recovers
/// methods and literal paths; duplicates are reported once, in source order. Paths must
/// start with `/` or `*`, which keeps calls such as `map.get("key")` out.
pub fn scan_routes(file: &SourceFile) -> Result<Vec<DiscoveredRoute>> {
    let mut found = AstParser::with_program(file, |program| {
        let mut visitor = RouteCallVisitor::default();
        visitor.visit_program(program);
        visitor.found
    })?;

    // Chained calls are visited outermost first; order by where the path is written.
    found.sort_by_key(|(position, _)| *position);
    let mut routes: Vec<DiscoveredRoute> = Vec::new();
    for (_, route) in found {
        if !routes.contains(&route) {
            routes.push(route);
        }
    }

    info!(
        "Source scan of {} found {} routes",
        file.path.display(),
        routes.len()
    );
    Ok(routes)
}

/// Recognize `x.verb(path, ...)` and return the method and literal path.
pub(crate) fn route_call(call: &CallExpression<'_>) -> Option<(HttpMethod, String)> {
    let Expression::StaticMemberExpression(member) = call.callee.get_inner_expression() else {
        return None;
    };
    let method = HttpMethod::from_name(&member.property.name)?;
    // Method names are matched case-sensitively: `app.GET` is not a route call.
    if member.property.name.as_str() != method.as_str() {
        return None;
    }
    let path = call.arguments.first().and_then(string_argument)?;
    if !path.starts_with('/') && !path.starts_with('*') {
        return None;
    }
    Some((method, path))
}

/// Value of a string literal or substitution-free template literal argument.
pub(crate) fn string_argument(argument: &Argument<'_>) -> Option<String> {
    match argument.as_expression()?.get_inner_expression() {
        Expression::StringLiteral(literal) => Some(literal.value.to_string()),
        Expression::TemplateLiteral(template) => template
            .single_quasi()
            .map(|text| text.to_string()),
        _ => None,
    }
}

#[derive(Default)]
struct RouteCallVisitor {
    /// Routes with the source offset of their path argument
    found: Vec<(u32, DiscoveredRoute)>,
}

impl<'a> Visit<'a> for RouteCallVisitor {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Some((method, path)) = route_call(call) {
            debug!("Found route call: {} {}", method.as_upper(), path);
            let position = call.arguments.first().map_or(0, |arg| arg.span().start);
            self.found.push((position, DiscoveredRoute { path, method }));
        }
        walk::walk_call_expression(self, call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scan(source: &str) -> Vec<(HttpMethod, String)> {
        let file = SourceFile::new(PathBuf::from("routes.ts"), source.to_string());
        scan_routes(&file)
            .unwrap()
            .into_iter()
            .map(|r| (r.method, r.path))
            .collect()
    }

    #[test]
    fn test_scan_mutating_registrations() {
        let routes = scan(
            r#"
            import { Hono } from "hono";
            const app = new Hono();
            app.get("/users", (c) => c.json([]));
            app.post(`/users`, async (c) => c.json({}, 201));
            app.delete("/users/:id", (c) => c.body(null, 204));
            export default app;
            "#,
        );

        assert_eq!(
            routes,
            vec![
                (HttpMethod::Get, "/users".to_string()),
                (HttpMethod::Post, "/users".to_string()),
                (HttpMethod::Delete, "/users/:id".to_string()),
            ]
        );
    }

    #[test]
    fn test_scan_chained_and_nested_calls() {
        let routes = scan(
            r#"
            const app = new Hono()
                .get("/a", describeRoute({ summary: "A" }), (c) => c.text("a"))
                .put("/b", (c) => c.text("b"))
                .get("/a", (c) => c.text("again"));
            "#,
        );

        assert_eq!(
            routes,
            vec![
                (HttpMethod::Get, "/a".to_string()),
                (HttpMethod::Put, "/b".to_string()),
            ]
        );
    }

    #[test]
    fn test_scan_ignores_non_literal_paths_and_other_calls() {
        let routes = scan(
            r#"
            const path = "/dynamic";
            app.get(path, handler);
            app.get(`/users/${id}`, handler);
            map.get("key");
            app.GET("/upper", handler);
            "#,
        );

        assert!(routes.is_empty());
    }
}
