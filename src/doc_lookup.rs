//! Inline route documentation.
//!
//! Route authors attach documentation with a no-op marker middleware written right after the
//! route path:
//!
//! ```ts
//! app.get("/users/:id", describeRoute({ summary: "Get a user", tags: ["users"] }), handler)
//! ```
//!
//! The marker does nothing at runtime; this module recovers its argument from the source text.

use crate::error::Result;
use crate::extractor::source_scan::route_call;
use crate::extractor::HttpMethod;
use crate::parser::{AstParser, SourceFile};
use log::{debug, warn};
use oxc_ast::ast::{
    ArrayExpressionElement, CallExpression, Expression, ObjectExpression, ObjectPropertyKind,
    TemplateLiteral,
};
use oxc_ast_visit::{walk, Visit};
use oxc_span::GetSpan;
use std::collections::HashMap;
use std::path::PathBuf;

/// Documentation attached to one route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocConfig {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub deprecated: Option<bool>,
}

impl DocConfig {
    /// Drop fields that are not meaningfully set: blank strings and empty tag lists.
    fn normalized(self) -> Self {
        let non_blank = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        Self {
            summary: non_blank(self.summary),
            description: non_blank(self.description),
            tags: self.tags.filter(|tags| !tags.is_empty()),
            deprecated: self.deprecated,
        }
    }

    fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.deprecated.is_none()
    }
}

/// Route documentation keyed by `"{verb}:{rawPath}"`.
#[derive(Debug, Clone, Default)]
pub struct DocLookup {
    entries: HashMap<String, DocConfig>,
}

/// Lookup key of a route: lowercase verb and the path exactly as written.
pub fn doc_key(method: HttpMethod, raw_path: &str) -> String {
    format!("{}:{}", method.as_str(), raw_path)
}

impl DocLookup {
    /// Collect documentation from several source files.
    ///
    /// Never fails: a file that cannot be read or parsed contributes nothing and is reported
    /// as a warning.
    pub fn from_sources(paths: &[PathBuf], marker: &str) -> Self {
        let mut lookup = Self::default();
        for path in paths {
            let result = AstParser::read_file(path).and_then(|file| Self::from_source(&file, marker));
            match result {
                Ok(found) => lookup.entries.extend(found.entries),
                Err(e) => warn!("Skipping route documentation from {}: {}", path.display(), e),
            }
        }
        debug!("Indexed documentation for {} routes", lookup.entries.len());
        lookup
    }

    /// Collect documentation from one parsed source file.
    pub fn from_source(file: &SourceFile, marker: &str) -> Result<Self> {
        let entries = AstParser::with_program(file, |program| {
            let mut visitor = MarkerVisitor {
                marker,
                source: &file.text,
                entries: HashMap::new(),
            };
            visitor.visit_program(program);
            visitor.entries
        })?;
        Ok(Self { entries })
    }

    pub fn get(&self, method: HttpMethod, raw_path: &str) -> Option<&DocConfig> {
        self.entries.get(&doc_key(method, raw_path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct MarkerVisitor<'s> {
    marker: &'s str,
    source: &'s str,
    entries: HashMap<String, DocConfig>,
}

impl<'a> Visit<'a> for MarkerVisitor<'_> {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Some((method, path)) = route_call(call) {
            let docs = call
                .arguments
                .iter()
                .skip(1)
                .filter_map(|arg| arg.as_expression())
                .find_map(|expr| self.marker_argument(expr))
                .map(|object| self.read_config(object).normalized());

            if let Some(docs) = docs.filter(|d| !d.is_empty()) {
                let key = doc_key(method, &path);
                debug!("Found documentation for {}", key);
                if self.entries.insert(key.clone(), docs).is_some() {
                    debug!("Documentation for {} declared more than once, keeping the last", key);
                }
            }
        }
        walk::walk_call_expression(self, call);
    }
}

impl MarkerVisitor<'_> {
    /// The object literal passed to `marker(...)`, if `expr` is such a call.
    fn marker_argument<'e, 'a>(&self, expr: &'e Expression<'a>) -> Option<&'e ObjectExpression<'a>> {
        let Expression::CallExpression(call) = expr.get_inner_expression() else {
            return None;
        };
        match call.callee.get_inner_expression() {
            Expression::Identifier(ident) if ident.name.as_str() == self.marker => {}
            _ => return None,
        }
        match call.arguments.first()?.as_expression()?.get_inner_expression() {
            Expression::ObjectExpression(object) => Some(&**object),
            _ => None,
        }
    }

    fn read_config(&self, object: &ObjectExpression<'_>) -> DocConfig {
        let mut config = DocConfig::default();
        for property in &object.properties {
            let ObjectPropertyKind::ObjectProperty(property) = property else {
                continue;
            };
            let Some(key) = property.key.static_name() else {
                continue;
            };
            let value = property.value.get_inner_expression();
            match key.as_ref() {
                "summary" => config.summary = self.text_value(value),
                "description" => config.description = self.text_value(value),
                "tags" => {
                    if let Expression::ArrayExpression(array) = value {
                        let tags = array
                            .elements
                            .iter()
                            .filter_map(ArrayExpressionElement::as_expression)
                            .filter_map(|e| match e.get_inner_expression() {
                                Expression::StringLiteral(s) => Some(s.value.to_string()),
                                _ => None,
                            })
                            .collect();
                        config.tags = Some(tags);
                    }
                }
                "deprecated" => {
                    if let Expression::BooleanLiteral(flag) = value {
                        config.deprecated = Some(flag.value);
                    }
                }
                _ => {}
            }
        }
        config
    }

    fn text_value(&self, value: &Expression<'_>) -> Option<String> {
        match value {
            Expression::StringLiteral(s) => Some(s.value.to_string()),
            Expression::TemplateLiteral(template) => Some(dedent(&self.template_text(template))),
            _ => None,
        }
    }

    /// Template text with substitutions kept as written (`${...}`).
    fn template_text(&self, template: &TemplateLiteral<'_>) -> String {
        let mut text = String::new();
        for (i, quasi) in template.quasis.iter().enumerate() {
            match &quasi.value.cooked {
                Some(cooked) => text.push_str(cooked),
                None => text.push_str(&quasi.value.raw),
            }
            if let Some(expr) = template.expressions.get(i) {
                text.push_str("${");
                text.push_str(expr.span().source_text(self.source));
                text.push('}');
            }
        }
        text
    }
}

/// Remove the leading whitespace prefix shared by all non-blank lines.
///
/// Leading and trailing blank lines are dropped; blank lines inside the text are kept empty and
/// deeper indentation stays relative to the shallowest line.
pub fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let is_blank = |line: &&str| line.trim().is_empty();
    let start = lines.iter().position(|l| !is_blank(l)).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !is_blank(l)).map_or(start, |i| i + 1);
    let lines = &lines[start..end];

    let mut prefix: Option<&str> = None;
    for line in lines.iter().filter(|l| !is_blank(l)) {
        let indent = &line[..line.len() - line.trim_start_matches([' ', '\t']).len()];
        prefix = Some(match prefix {
            None => indent,
            Some(current) => common_prefix(current, indent),
        });
    }
    let prefix = prefix.unwrap_or("");

    lines
        .iter()
        .map(|line| {
            if is_blank(line) {
                ""
            } else {
                line[prefix.len()..].trim_end()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn common_prefix<'t>(a: &'t str, b: &str) -> &'t str {
    let len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..len]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup(source: &str) -> DocLookup {
        let file = SourceFile::new(PathBuf::from("routes.ts"), source.to_string());
        DocLookup::from_source(&file, "describeRoute").unwrap()
    }

    #[test]
    fn test_marker_fields() {
        let docs = lookup(
            r#"
            const app = new Hono()
                .get("/users/:id", describeRoute({
                    summary: "Get user",
                    tags: ["users", "public"],
                    deprecated: false,
                }), (c) => c.json({}))
                .post("/users", describeRoute({ description: "Create" }), handler);
            "#,
        );

        assert_eq!(docs.len(), 2);
        assert_eq!(
            docs.get(HttpMethod::Get, "/users/:id"),
            Some(&DocConfig {
                summary: Some("Get user".to_string()),
                description: None,
                tags: Some(vec!["users".to_string(), "public".to_string()]),
                deprecated: Some(false),
            })
        );
        assert_eq!(
            docs.get(HttpMethod::Post, "/users").unwrap().description.as_deref(),
            Some("Create")
        );
        assert!(docs.get(HttpMethod::Get, "/users").is_none());
    }

    #[test]
    fn test_template_description_is_dedented() {
        let docs = lookup(
            "app.get('/a', validator, describeRoute({ description: `\n        First line\n\n          indented\n        Last line\n      ` }), h);",
        );

        assert_eq!(
            docs.get(HttpMethod::Get, "/a").unwrap().description.as_deref(),
            Some("First line\n\n  indented\nLast line")
        );
    }

    #[test]
    fn test_meaningless_config_is_discarded() {
        let docs = lookup(
            r#"
            app.get("/a", describeRoute({ summary: "   ", tags: [] }), h);
            app.get("/b", describeRoute({}), h);
            app.get("/c", otherMarker({ summary: "nope" }), h);
            app.get("/d", describeRoute({ deprecated: true }), h);
            "#,
        );

        assert_eq!(docs.len(), 1);
        assert_eq!(docs.get(HttpMethod::Get, "/d").unwrap().deprecated, Some(true));
    }

    #[test]
    fn test_unreadable_sources_degrade_to_empty() {
        let docs = DocLookup::from_sources(&[PathBuf::from("/nonexistent/routes.ts")], "describeRoute");
        assert!(docs.is_empty());

        let file = SourceFile::new(PathBuf::from("broken.ts"), "app.get('/a', describeRoute({".to_string());
        assert!(DocLookup::from_source(&file, "describeRoute").is_err());
    }

    #[test]
    fn test_dedent() {
        assert_eq!(dedent("\n    a\n      b\n    c\n"), "a\n  b\nc");
        assert_eq!(dedent("single"), "single");
        assert_eq!(dedent("   \n  "), "");
    }

    #[test]
    fn test_dedent_mixed_tabs_and_spaces() {
        // Only the literal shared prefix is removed
        assert_eq!(dedent("\t  a\n\t    b"), "a\n  b");
        assert_eq!(dedent("\ta\n  b"), "\ta\n  b");
        assert_eq!(dedent("  \tx\n    y"), "\tx\n  y");
    }
}
