use crate::config::{ApiGroup, ExcludePath};
use crate::error::{GenError, Result};
use crate::extractor::{combine_paths, HttpMethod};
use crate::openapi_builder::{
    normalize_path, Info, OpenApiDocument, PathItem, Response, Server, Tag,
    DEFAULT_RESPONSE_DESCRIPTION,
};
use indexmap::IndexMap;
use log::{debug, info, warn};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Marker of a type dump leaking into a response description
const TYPE_DUMP_MARKER: &str = "import(";

static OPENAPI_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}/]+)\}").expect("valid OpenAPI parameter pattern"));

/// Spec merger - combines per-group documents into the final document
///
/// Groups are merged in the order they are added; paths keep first-seen order so repeated
/// merges of the same inputs produce identical output.
pub struct SpecMerger {
    openapi: String,
    info: Info,
    servers: Option<Vec<Server>>,
    tags: Vec<Tag>,
    paths: IndexMap<String, PathItem>,
}

/// Compiled `excludePaths` of one group
struct ExcludeRules {
    literals: Vec<String>,
    patterns: Vec<Regex>,
}

impl ExcludeRules {
    fn new(group: &ApiGroup) -> Result<Self> {
        let mut rules = Self {
            literals: Vec::new(),
            patterns: Vec::new(),
        };
        for exclude in &group.exclude_paths {
            match exclude {
                ExcludePath::Literal(path) => rules.literals.push(normalize_path(path)),
                ExcludePath::Pattern { pattern } => {
                    let regex = Regex::new(pattern).map_err(|e| {
                        GenError::Config(format!("invalid exclude pattern `{}`: {}", pattern, e))
                    })?;
                    rules.patterns.push(regex);
                }
            }
        }
        Ok(rules)
    }

    /// Whether `path` (in `{param}` form) is excluded; patterns also see the `:param` form.
    fn matches(&self, path: &str) -> bool {
        if self.literals.iter().any(|literal| literal == path) {
            return true;
        }
        let colon_form = OPENAPI_PARAM.replace_all(path, ":$1");
        self.patterns
            .iter()
            .any(|re| re.is_match(path) || re.is_match(&colon_form))
    }
}

impl SpecMerger {
    pub fn new(openapi: String, info: Info, servers: Option<Vec<Server>>) -> Self {
        Self {
            openapi,
            info,
            servers,
            tags: Vec::new(),
            paths: IndexMap::new(),
        }
    }

    /// Merge one group's intermediate document.
    ///
    /// A missing document is skipped with a warning; the group's tag is still listed.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be read or parsed.
    pub fn merge_group_file(&mut self, group: &ApiGroup, file: &Path) -> Result<()> {
        self.add_tag(&group.name);
        if !file.exists() {
            warn!(
                "Intermediate document for group `{}` not found at {}, skipping",
                group.name,
                file.display()
            );
            return Ok(());
        }

        let content = fs::read_to_string(file).map_err(|source| GenError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        let document: OpenApiDocument = serde_json::from_str(&content)?;
        self.merge_group(group, document)
    }

    /// Merge one group's document.
    pub fn merge_group(&mut self, group: &ApiGroup, document: OpenApiDocument) -> Result<()> {
        self.add_tag(&group.name);
        let excludes = ExcludeRules::new(group)?;
        let overrides: HashMap<String, _> = group
            .api
            .iter()
            .map(|entry| {
                let key = override_key(&entry.method.to_lowercase(), &normalize_path(&entry.path));
                (key, entry)
            })
            .collect();
        let prefix = group.api_prefix.as_deref().map(normalize_path).unwrap_or_default();

        let mut merged_paths = 0;
        for (path, mut item) in document.paths {
            let full_path = normalize_path(&combine_paths(&prefix, &path));
            if excludes.matches(&full_path) {
                debug!("Excluding {} from group `{}`", full_path, group.name);
                continue;
            }

            for (method, operation) in item.operations_mut() {
                if let Some(entry) = overrides.get(&override_key(method.as_str(), &full_path)) {
                    debug!("Applying manual override for {} {}", method.as_str(), full_path);
                    if entry.summary.is_some() {
                        operation.summary = entry.summary.clone();
                    }
                    if entry.description.is_some() {
                        operation.description = entry.description.clone();
                    }
                    if entry.tags.is_some() {
                        operation.tags = entry.tags.clone();
                    }
                }
                if operation.tags.as_ref().map_or(true, Vec::is_empty) {
                    operation.tags = Some(vec![group.name.clone()]);
                }
                clean_type_dump_responses(method, &full_path, &mut operation.responses);
            }

            let replaced = self.paths.entry(full_path.clone()).or_default().merge(item);
            for method in replaced {
                warn!(
                    "Group `{}` redefines {} {}, keeping the later definition",
                    group.name,
                    method.as_upper(),
                    full_path
                );
            }
            merged_paths += 1;
        }

        info!("Merged {} paths from group `{}`", merged_paths, group.name);
        Ok(())
    }

    fn add_tag(&mut self, name: &str) {
        if !self.tags.iter().any(|tag| tag.name == name) {
            self.tags.push(Tag {
                name: name.to_string(),
            });
        }
    }

    /// Build the merged document
    pub fn build(self) -> OpenApiDocument {
        OpenApiDocument {
            openapi: self.openapi,
            info: self.info,
            servers: self.servers,
            tags: Some(self.tags),
            paths: self.paths,
        }
    }
}

/// Key of a manual override: lowercase method and the full path without a trailing slash.
fn override_key(method: &str, full_path: &str) -> String {
    let trimmed = full_path.trim_end_matches('/');
    let path = if trimmed.is_empty() { "/" } else { trimmed };
    format!("{} {}", method, path)
}

/// Relabel or drop responses whose description is a leaked type dump.
fn clean_type_dump_responses(
    method: HttpMethod,
    path: &str,
    responses: &mut IndexMap<String, Response>,
) {
    responses.retain(|status, response| {
        if !response.description.contains(TYPE_DUMP_MARKER) {
            return true;
        }
        let has_content = response.content.as_ref().is_some_and(|c| !c.is_empty());
        if has_content {
            debug!("Relabeling {} response of {} {}", status, method.as_upper(), path);
            response.description = DEFAULT_RESPONSE_DESCRIPTION.to_string();
            true
        } else {
            debug!("Dropping {} response of {} {}", status, method.as_upper(), path);
            false
        }
    });
}
