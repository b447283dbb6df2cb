//! Generation pipeline.
//!
//! Groups are processed strictly one after another against a single [`TypeResolver`], so files
//! shared between groups are parsed once. Each group produces an intermediate JSON document in
//! the scratch directory; the merger then combines those files into the final output.

use crate::config::{ApiGroup, GeneratorConfig};
use crate::doc_lookup::DocLookup;
use crate::extractor::hono::HonoExtractor;
use crate::extractor::source_scan::scan_routes;
use crate::merger::SpecMerger;
use crate::openapi_builder::{OpenApiBuilder, OpenApiDocument};
use crate::parser::AstParser;
use crate::serializer::{serialize, serialize_json, write_to_file, OutputFormat};
use crate::type_resolver::TypeResolver;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationSummary {
    pub groups: usize,
    /// Groups that went through the source-text fallback
    pub fallback_groups: usize,
    pub operations: usize,
    pub merged_paths: usize,
}

pub struct Generator {
    config: GeneratorConfig,
    type_resolver: TypeResolver,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        let type_resolver = TypeResolver::new(config.path_aliases());
        Self {
            config,
            type_resolver,
        }
    }

    /// Generate every group, merge them and write the final document.
    ///
    /// # Errors
    ///
    /// Fails on the first group whose route table cannot be analysed, and on any write error.
    /// Documentation problems and missing intermediate files are only logged.
    pub fn run(&mut self) -> Result<GenerationSummary> {
        let mut summary = GenerationSummary::default();
        let groups = self.config.apis.clone();

        for group in &groups {
            info!("Generating group `{}`...", group.name);
            let (document, used_fallback) = self
                .generate_group(group)
                .with_context(|| format!("Failed to generate group `{}`", group.name))?;

            summary.groups += 1;
            if used_fallback {
                summary.fallback_groups += 1;
            }
            summary.operations += count_operations(&document);

            let file = self.intermediate_path(group);
            write_to_file(&serialize_json(&document)?, &file)?;
            info!("Wrote group `{}` to {}", group.name, file.display());
        }

        let merged = self.merge()?;
        summary.merged_paths = merged.paths.len();

        let output = &self.config.output;
        let content = serialize(&merged, OutputFormat::from_path(output))?;
        write_to_file(&content, output)?;
        info!("Successfully wrote OpenAPI document to {}", output.display());

        Ok(summary)
    }

    /// Build the document of one group.
    ///
    /// Returns the document and whether the source-text fallback was used.
    pub fn generate_group(&mut self, group: &ApiGroup) -> Result<(OpenApiDocument, bool)> {
        let module = self.type_resolver.add_source_file(&group.app_type_path)?;
        let app_type = self
            .type_resolver
            .app_type(module, group.app_type_name.as_deref())?;
        debug!("App type of `{}`: {}", group.name, app_type);

        let docs = DocLookup::from_sources(&group.doc_sources(), &self.config.doc_marker);
        debug!("Group `{}` has documentation for {} routes", group.name, docs.len());

        let mut builder = OpenApiBuilder::new()
            .with_openapi_version(self.config.openapi.clone())
            .with_info(self.config.info.clone())
            .with_servers(self.config.servers.clone());

        let entries = HonoExtractor::new(&mut self.type_resolver).extract(&app_type)?;
        let used_fallback = match entries {
            Some(entries) => {
                info!("Found {} route literals in `{}`", entries.len(), group.name);
                builder.add_route_entries(&mut self.type_resolver, &entries, &docs, &group.name);
                false
            }
            None => {
                let source = group.routes_source();
                warn!(
                    "Route table of `{}` collapsed to the empty placeholder, scanning {} instead",
                    group.name,
                    source.display()
                );
                let file = AstParser::read_file(source)?;
                let routes = scan_routes(&file)?;
                builder.add_discovered_routes(&routes, &docs, &group.name);
                true
            }
        };

        info!("Group `{}` has {} paths", group.name, builder.path_count());
        Ok((builder.build(), used_fallback))
    }

    /// Merge the intermediate documents of all groups in configuration order.
    pub fn merge(&self) -> Result<OpenApiDocument> {
        info!("Merging {} groups...", self.config.apis.len());
        let mut merger = SpecMerger::new(
            self.config.openapi.clone(),
            self.config.info.clone(),
            self.config.servers.clone(),
        );
        for group in &self.config.apis {
            let file = self.intermediate_path(group);
            merger
                .merge_group_file(group, &file)
                .with_context(|| format!("Failed to merge group `{}`", group.name))?;
        }
        Ok(merger.build())
    }

    fn intermediate_path(&self, group: &ApiGroup) -> PathBuf {
        self.config.temp_dir().join(group.intermediate_file_name())
    }

    /// Files loaded into the analysis session so far
    pub fn loaded_modules(&self) -> usize {
        self.type_resolver.module_count()
    }
}

fn count_operations(document: &OpenApiDocument) -> usize {
    document
        .paths
        .values()
        .map(|item| {
            [
                &item.get,
                &item.post,
                &item.put,
                &item.delete,
                &item.patch,
                &item.options,
                &item.head,
            ]
            .iter()
            .filter(|op| op.is_some())
            .count()
        })
        .sum()
}
