//! orderbot CLI and webhook server entry point.
//!
//! Binary name: `orderbot`
//!
//! Parses CLI arguments, sets up tracing, loads configuration and secrets,
//! then dispatches to the requested command.

mod cli;
mod http;
mod state;
#[cfg(test)]
mod test_support;

use clap::Parser;

use cli::{Cli, Commands};
use orderbot_infra::config::config_path;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    orderbot_observe::tracing_setup::init_tracing(cli.log_directive(), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let config_file = config_path(cli.config.as_deref());
    let state = AppState::init(&config_file).await?;
    tracing::debug!(
        config = %config_file.display(),
        secrets = ?state.secrets,
        "Application state ready"
    );

    let result = match cli.command {
        Commands::Serve { host, port } => cli::serve::serve(state, host, port).await,
        Commands::Chat { user } => cli::chat::run_chat(&state, &user).await,
        Commands::Check { ping, json } => cli::check::check(&state, ping, json).await,
    };

    orderbot_observe::tracing_setup::shutdown_tracing();
    result
}
