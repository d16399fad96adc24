//! CLI argument parsing using clap derive API
//!
//! Purely declarative; no side effects or I/O happen here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Gatekeeper -- security scan gate for MCP server registry publication.
///
/// Use `gatekeeper <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "gatekeeper", version, about, long_about = None)]
pub struct Cli {
    /// Path to a gatekeeper.toml configuration file.
    ///
    /// When omitted, built-in defaults plus `GATEKEEPER_*` environment overrides are used.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Override the registry document path.
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    /// Output format for human-facing commands.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Handle one JSON request (`{"function": ..., "args": {...}}`) and print one JSON response.
    Call(CallArgs),

    /// Scan a repository and print the security report.
    Scan(ScanArgs),
}

// ---- call ----

/// Process one boundary request.
#[derive(Args, Debug)]
pub struct CallArgs {
    /// Request JSON. Read from stdin when omitted.
    pub request: Option<String>,
}

// ---- scan ----

/// Run the scan pipeline against one repository.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Repository URL (https://host/owner/repo or git@host:owner/repo).
    #[arg(long)]
    pub repo_url: String,

    /// Server name the report is recorded under.
    #[arg(long)]
    pub server_name: String,

    /// Store the report in the registry after a successful scan.
    #[arg(long)]
    pub register: bool,
}
