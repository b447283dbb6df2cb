use crate::config::GeneratorConfig;
use crate::generator::Generator;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;

/// Hono OpenAPI Generator - Generate OpenAPI documents from the route types of Hono applications
#[derive(Parser, Debug)]
#[command(name = "hono-openapi-gen")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the OpenAPI document described by a configuration file
    Generate {
        /// Path to the generator configuration (YAML or JSON)
        #[arg(short = 'c', long = "config", value_name = "FILE")]
        config: PathBuf,
    },
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    match &args.command {
        Command::Generate { config } => {
            if !config.is_file() {
                anyhow::bail!("Config file does not exist: {}", config.display());
            }
            info!("Config file: {}", config.display());
        }
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Generate { config } => {
            info!("Starting OpenAPI document generation...");

            let config = GeneratorConfig::load(&config)
                .with_context(|| format!("Failed to load config {}", config.display()))?;
            info!("Loaded {} API groups", config.apis.len());
            let output = config.output.clone();

            let mut generator = Generator::new(config);
            let summary = generator.run()?;

            info!("Generation complete!");
            info!("Summary:");
            info!("  - Groups: {}", summary.groups);
            info!("  - Groups using source fallback: {}", summary.fallback_groups);
            info!("  - Operations: {}", summary.operations);
            info!("  - Merged paths: {}", summary.merged_paths);
            info!("  - Files analysed: {}", generator.loaded_modules());
            info!("  - Output: {}", output.display());
        }
    }

    Ok(())
}
