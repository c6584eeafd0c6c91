//! Configuration report command.

use anyhow::Result;
use console::style;
use serde::Serialize;

use orderbot_infra::llm::test_provider_connection;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub version: &'static str,
    pub backend: String,
    pub model: String,
    pub ai: bool,
    pub messenger: bool,
    pub sheets: bool,
    pub signature_verification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping: Option<PingResult>,
}

#[derive(Debug, Serialize)]
pub struct PingResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckReport {
    pub fn gather(state: &AppState) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            backend: state.config.provider.backend.to_string(),
            model: state.orchestrator.config().model.clone(),
            ai: state.ai_configured(),
            messenger: state.messenger.is_configured(),
            sheets: state.sheets.is_configured(),
            signature_verification: state.secrets.app_secret.is_some(),
            ping: None,
        }
    }

    /// Chat, delivery, and persistence all have credentials.
    pub fn ready(&self) -> bool {
        self.ai && self.messenger && self.sheets && self.ping.as_ref().is_none_or(|p| p.ok)
    }
}

/// Print which integrations are configured, optionally pinging the chat backend.
pub async fn check(state: &AppState, ping: bool, json: bool) -> Result<()> {
    let mut report = CheckReport::gather(state);

    if ping {
        let result = test_provider_connection(
            state.orchestrator.provider(),
            state.orchestrator.config().request_timeout,
        )
        .await;
        report.ping = Some(PingResult {
            ok: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mark = |ok: bool| {
        if ok {
            format!("{}", style("✓").green())
        } else {
            format!("{}", style("✗").red())
        }
    };

    println!();
    println!("  {} orderbot v{}", style("⚡").bold(), report.version);
    println!();
    println!(
        "  {} Chat backend: {} ({})",
        mark(report.ai),
        style(&report.backend).cyan(),
        report.model
    );
    println!("  {} Messenger page token", mark(report.messenger));
    println!("  {} Google Sheets credentials", mark(report.sheets));
    println!(
        "  {} Webhook signature verification",
        mark(report.signature_verification)
    );
    if let Some(ping) = &report.ping {
        match &ping.error {
            None => println!("  {} Backend reachable", mark(true)),
            Some(error) => {
                println!("  {} Backend ping failed: {}", mark(false), style(error).red())
            }
        }
    }
    println!();

    Ok(())
}
