//! Hono OpenAPI Generator - OpenAPI documents from the route types of Hono applications.
//!
//! A Hono application that chains its routes exposes a route-table type describing every path,
//! method, input and response. This library reads that type from TypeScript sources (no
//! TypeScript compiler involved), turns it into OpenAPI 3.0 operations and merges several route
//! groups into one document.
//!
//! # Architecture
//!
//! 1. [`config`] - Loads and validates the generator configuration
//! 2. [`parser`] - Parses TypeScript sources with `oxc`
//! 3. [`type_graph`] / [`type_resolver`] - Owned type graph and the shared analysis session
//! 4. [`extractor`] - Walks the route-table type into route literals, with a source-text fallback
//! 5. [`doc_lookup`] - Recovers inline route documentation markers
//! 6. [`schema_generator`] - Converts types to OpenAPI schemas
//! 7. [`openapi_builder`] - Constructs one document per route group
//! 8. [`merger`] - Merges group documents into the final document
//! 9. [`serializer`] - Serializes documents to YAML or JSON
//!
//! [`generator`] runs the whole pipeline.
//!
//! # Example Usage
//!
//! ```no_run
//! use hono_openapi_gen::{config::GeneratorConfig, generator::Generator};
//! use std::path::Path;
//!
//! let config = GeneratorConfig::load(Path::new("openapi.config.yaml")).unwrap();
//! let summary = Generator::new(config).run().unwrap();
//! println!("{} operations", summary.operations);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod config;
pub mod doc_lookup;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod merger;
pub mod openapi_builder;
pub mod parser;
pub mod schema_generator;
pub mod serializer;
pub mod type_graph;
pub mod type_resolver;
