//! CLI for the object-model codec.
//!
//! Provides commands for:
//! - Schema validation
//! - Deflating JSON records into serialized maps
//! - Collapsing records into write plans, optionally applied to an in-memory store

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::CollapseArgs;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    let config = commands::load_config(cli.config.as_deref())?;
    tracing::debug!(?config, "codec configuration loaded");

    let output = match cli.command {
        Commands::Validate { schema } => commands::validate(&schema)?,
        Commands::Deflate {
            schema,
            type_name,
            input,
            base,
        } => commands::deflate(config, &schema, &type_name, &input, base.as_deref())?,
        Commands::Collapse {
            schema,
            type_name,
            input,
            parent_type,
            parent,
            disposition,
            apply,
        } => commands::collapse(
            config,
            CollapseArgs {
                schema: &schema,
                type_name: &type_name,
                input: &input,
                parent: parent_type.as_deref().zip(parent.as_deref()),
                disposition,
                apply,
            },
        )?,
    };

    println!("{}", output);
    Ok(())
}
