use clap::{Parser, Subcommand};
use model_codec_core::WriteDisposition;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Codec configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and resolve a schema, then list its record types
    Validate {
        /// Schema file (TOML)
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Inflate a JSON record and print its serialized map
    Deflate {
        /// Schema file (TOML)
        #[arg(short, long)]
        schema: PathBuf,

        /// Record type name
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// JSON record
        #[arg(short, long)]
        input: PathBuf,

        /// JSON record holding the previous state
        #[arg(short, long)]
        base: Option<PathBuf>,
    },

    /// Inflate a JSON record and print its write plan
    Collapse {
        /// Schema file (TOML)
        #[arg(short, long)]
        schema: PathBuf,

        /// Record type name
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// JSON record
        #[arg(short, long)]
        input: PathBuf,

        /// Record type of the parent
        #[arg(long, requires = "parent")]
        parent_type: Option<String>,

        /// JSON record the root is stored under
        #[arg(long, requires = "parent_type")]
        parent: Option<PathBuf>,

        /// Write disposition: blind, create or update
        #[arg(short, long, default_value = "blind")]
        disposition: WriteDisposition,

        /// Execute the plan against an in-memory store and print the documents
        #[arg(long)]
        apply: bool,
    },
}
