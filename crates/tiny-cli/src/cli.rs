use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tiny", about = "Tiny schema object model tools", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project configuration (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the builtin types, or write them as records
    Schema(SchemaArgs),
    /// Run a scripted edit/undo session and report each step
    Demo(DemoArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct SchemaArgs {
    /// Write every property, including defaults
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Save the final snapshot here (`.json` for JSON, anything else binary)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConfigArgs {}
