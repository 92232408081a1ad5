//! CLI command definitions and dispatch for the `ragdesk` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod ingest;
pub mod session;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Ask questions about your documents.
#[derive(Parser)]
#[command(name = "ragdesk", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true, env = "RAGDESK_OTEL", hide = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload and index documents, showing per-file progress.
    Ingest {
        /// Files to ingest.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Create a knowledge base from the completed files.
        #[arg(long)]
        kb_name: Option<String>,

        /// Knowledge base description.
        #[arg(long)]
        description: Option<String>,
    },

    /// Start an interactive chat.
    Chat {
        /// Session ID (or unique prefix) to continue. Defaults to the most recent.
        #[arg(long)]
        session: Option<String>,
    },

    /// List chat sessions.
    #[command(alias = "ls")]
    Sessions,

    /// Show a session transcript.
    Show {
        /// Session ID or unique prefix.
        id: String,
    },

    /// System status dashboard.
    Status,

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
