//! Hono OpenAPI Generator - Command-line tool for generating OpenAPI documentation.
//!
//! Reads a generator configuration listing the route groups of a Hono application, recovers
//! each group's routes from its exported route-table type and writes one merged OpenAPI 3.0
//! document.
//!
//! # Usage
//!
//! ```bash
//! hono-openapi-gen generate --config openapi.config.yaml
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! hono-openapi-gen generate --config openapi.config.yaml -v
//! ```

use anyhow::Result;
use clap::Parser;
use hono_openapi_gen::cli;
use log::info;

fn main() -> Result<()> {
    // Parse first so the verbose flag can pick the log level
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Hono OpenAPI Generator starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
