//! Generator configuration.
//!
//! The configuration is a YAML or JSON file (JSON when the extension is `.json`) with camelCase
//! keys. Relative paths inside it are resolved against the directory of the file.

use crate::error::{GenError, Result};
use crate::openapi_builder::{Info, Server};
use crate::type_resolver::PathAliases;
use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// TypeScript project configuration used for import path aliases
    #[serde(default)]
    pub ts_config: Option<PathBuf>,
    #[serde(default = "default_openapi_version")]
    pub openapi: String,
    pub info: Info,
    #[serde(default)]
    pub servers: Option<Vec<Server>>,
    /// Final merged document; `.yaml`/`.yml` writes YAML, anything else JSON
    pub output: PathBuf,
    /// Scratch directory for per-group documents
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    /// Name of the documentation marker function
    #[serde(default = "default_doc_marker")]
    pub doc_marker: String,
    pub apis: Vec<ApiGroup>,
}

/// One route module to document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGroup {
    /// Display name; also the fallback tag of the group's operations
    pub name: String,
    /// File exporting the app type alias
    pub app_type_path: PathBuf,
    /// Exported alias name; defaults to `AppType` or the first exported alias
    #[serde(default)]
    pub app_type_name: Option<String>,
    /// Route source scanned for documentation markers and by the fallback
    #[serde(default)]
    pub routes_path: Option<PathBuf>,
    /// Extra sources whose documentation markers are indexed
    #[serde(default)]
    pub doc_paths: Vec<PathBuf>,
    /// Manual per-route overrides
    #[serde(default)]
    pub api: Vec<CustomApiEntry>,
    #[serde(default)]
    pub exclude_paths: Vec<ExcludePath>,
    /// Mount prefix applied to every path of the group
    #[serde(default)]
    pub api_prefix: Option<String>,
}

/// Manual documentation for one operation
#[derive(Debug, Clone, Deserialize)]
pub struct CustomApiEntry {
    pub path: String,
    pub method: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// A path excluded from the merged document
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExcludePath {
    Literal(String),
    Pattern { pattern: String },
}

fn default_openapi_version() -> String {
    "3.0.0".to_string()
}

fn default_doc_marker() -> String {
    "describeRoute".to_string()
}

impl GeneratorConfig {
    /// Load, resolve and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::Io`] if the file cannot be read and [`GenError::Config`] if it is
    /// malformed or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| GenError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let mut config: GeneratorConfig = if is_json {
            serde_json::from_str(&content)
                .map_err(|e| GenError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| GenError::Config(format!("{}: {}", path.display(), e)))?
        };

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    /// Make every relative path absolute against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        if let Some(ts_config) = self.ts_config.as_mut() {
            join(ts_config);
        }
        join(&mut self.output);
        if let Some(temp_dir) = self.temp_dir.as_mut() {
            join(temp_dir);
        }
        for group in &mut self.apis {
            join(&mut group.app_type_path);
            if let Some(routes_path) = group.routes_path.as_mut() {
                join(routes_path);
            }
            group.doc_paths.iter_mut().for_each(join);
        }
    }

    /// Check the configuration before any generation starts.
    pub fn validate(&self) -> Result<()> {
        if self.apis.is_empty() {
            return Err(GenError::Config("`apis` must list at least one group".to_string()));
        }

        let mut names = HashSet::new();
        let mut file_names: HashMap<String, &str> = HashMap::new();
        for group in &self.apis {
            if group.name.trim().is_empty() {
                return Err(GenError::Config("group name must not be empty".to_string()));
            }
            if !names.insert(group.name.as_str()) {
                return Err(GenError::Config(format!("duplicate group name `{}`", group.name)));
            }
            if let Some(other) = file_names.insert(group.intermediate_file_name(), &group.name) {
                return Err(GenError::Config(format!(
                    "groups `{}` and `{}` both write {}",
                    other,
                    group.name,
                    group.intermediate_file_name()
                )));
            }
            if !group.app_type_path.is_file() {
                return Err(GenError::Config(format!(
                    "group `{}`: appTypePath {} does not exist",
                    group.name,
                    group.app_type_path.display()
                )));
            }
            for exclude in &group.exclude_paths {
                if let ExcludePath::Pattern { pattern } = exclude {
                    Regex::new(pattern).map_err(|e| {
                        GenError::Config(format!(
                            "group `{}`: invalid exclude pattern `{}`: {}",
                            group.name, pattern, e
                        ))
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Directory for per-group intermediate documents
    pub fn temp_dir(&self) -> PathBuf {
        match &self.temp_dir {
            Some(dir) => dir.clone(),
            None => self
                .output
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(".openapi-groups"),
        }
    }

    /// Import path aliases from the TypeScript project configuration.
    ///
    /// A missing or unreadable tsconfig disables aliases with a warning.
    pub fn path_aliases(&self) -> PathAliases {
        let Some(ts_config) = &self.ts_config else {
            return PathAliases::default();
        };
        match read_path_aliases(ts_config) {
            Ok(aliases) => {
                debug!("Loaded {} path aliases from {}", aliases.paths.len(), ts_config.display());
                aliases
            }
            Err(e) => {
                warn!("Ignoring path aliases from {}: {}", ts_config.display(), e);
                PathAliases::default()
            }
        }
    }
}

fn read_path_aliases(ts_config: &Path) -> Result<PathAliases> {
    let content = fs::read_to_string(ts_config).map_err(|source| GenError::Io {
        path: ts_config.to_path_buf(),
        source,
    })?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let options = &value["compilerOptions"];

    let root = ts_config.parent().unwrap_or_else(|| Path::new("."));
    let base_url = root.join(options["baseUrl"].as_str().unwrap_or("."));
    let paths = options["paths"]
        .as_object()
        .map(|paths| {
            paths
                .iter()
                .map(|(pattern, targets)| {
                    let targets = targets
                        .as_array()
                        .map(|t| t.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                        .unwrap_or_default();
                    (pattern.clone(), targets)
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(PathAliases { base_url, paths })
}

impl ApiGroup {
    /// Source scanned for documentation markers and by the fallback
    pub fn routes_source(&self) -> &Path {
        self.routes_path.as_deref().unwrap_or(&self.app_type_path)
    }

    /// All sources whose documentation markers are indexed
    pub fn doc_sources(&self) -> Vec<PathBuf> {
        let mut sources = vec![self.routes_source().to_path_buf()];
        for path in &self.doc_paths {
            if !sources.contains(path) {
                sources.push(path.clone());
            }
        }
        sources
    }

    /// File name of the group's intermediate document
    pub fn intermediate_file_name(&self) -> String {
        let mut slug = String::new();
        for c in self.name.to_lowercase().chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c);
            } else if !slug.ends_with('-') {
                slug.push('-');
            }
        }
        let slug = slug.trim_matches('-');
        format!("{}.json", if slug.is_empty() { "group" } else { slug })
    }
}
