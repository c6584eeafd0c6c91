//! CLI command definitions for the `orderbot` binary.

pub mod chat;
pub mod check;
pub mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// LLM order-taking assistant for messaging platforms.
#[derive(Parser)]
#[command(name = "orderbot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ./orderbot.toml).
    #[arg(long, global = true, env = "ORDERBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the webhook server and REST API.
    Serve {
        /// Bind address (overrides `server.host`).
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides `server.port`).
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Chat with the assistant in the terminal.
    Chat {
        /// Conversation key to use.
        #[arg(long, default_value = "local")]
        user: String,
    },

    /// Report which integrations are configured.
    Check {
        /// Also send a one-token request to the chat backend.
        #[arg(long)]
        ping: bool,

        /// Output machine-readable JSON instead of styled text.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Filter directive used when `RUST_LOG` is unset.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "info,tower_http=warn",
            1 => "debug,hyper=info,reqwest=info",
            _ => "trace",
        }
    }
}
