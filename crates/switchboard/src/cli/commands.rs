//! CLI command definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Switchboard - OpenAI-compatible inference gateway
#[derive(Parser, Debug)]
#[command(name = "switchboard")]
#[command(about = "Run OpenAI-style completion, edit and chat requests against a local model server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Gateway settings file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Model server base URL (overrides the settings file)
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Directory holding model configs and templates
    #[arg(long, global = true)]
    pub models_path: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a completion request
    Complete(RequestArgs),

    /// Run an edit request
    Edit(RequestArgs),

    /// Run a chat request
    Chat(RequestArgs),

    /// List model configurations found in the models directory
    Models,
}

/// Options shared by every request command.
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// OpenAI request body (JSON); reads stdin when absent or "-"
    pub request: Option<PathBuf>,

    /// Print tokens as they are generated
    #[arg(long)]
    pub stream: bool,

    /// Print each prompt's result as it finishes
    #[arg(long)]
    pub prompt_results: bool,
}
