//! `orderbot chat`: drive a conversation from the terminal.
//!
//! Each line goes through the same orchestrator the webhook uses. Completed
//! orders are printed as JSON and left pending; nothing is delivered or
//! persisted.

use std::io::Write;

use anyhow::Result;
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::state::AppState;

#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    Help,
    /// Reset the conversation to a fresh history.
    Clear,
    /// Print the pending order, if any.
    Order,
    History,
    Exit,
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let cmd = trimmed
        .split_whitespace()
        .next()
        .unwrap_or(trimmed)
        .to_lowercase();
    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/clear" | "/reset" => Some(ChatCommand::Clear),
        "/order" => Some(ChatCommand::Order),
        "/history" => Some(ChatCommand::History),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        _ => Some(ChatCommand::Unknown(cmd)),
    }
}

fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}    Show this help message", style("/help").cyan());
    println!("  {}   Start over with an empty conversation", style("/clear").cyan());
    println!("  {}   Show the pending order", style("/order").cyan());
    println!("  {} Show the conversation so far", style("/history").cyan());
    println!("  {}    End the chat", style("/exit").cyan());
    println!();
    println!("  {}", style("Ctrl+D to exit").dim());
    println!();
}

/// What the loop should do after a line.
#[derive(Debug, PartialEq)]
pub enum LineOutcome {
    Continue,
    Exit,
}

/// Run the interactive loop until `/exit` or end of input.
pub async fn run_chat(state: &AppState, user_id: &str) -> Result<()> {
    let provider = state.orchestrator.provider();
    println!();
    println!(
        "  {} {} ({})",
        style("🍕").bold(),
        style(state.business().name()).cyan().bold(),
        state.business().kind()
    );
    println!(
        "  {}",
        style(format!(
            "{} / {} -- type /help for commands",
            provider.name(),
            state.orchestrator.config().model
        ))
        .dim()
    );
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", style("you ›").green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        if handle_line(state, user_id, &line).await? == LineOutcome::Exit {
            break;
        }
    }

    println!("  {}", style("Goodbye!").dim());
    Ok(())
}

/// Process one line of input: a slash command or a message.
pub async fn handle_line(state: &AppState, user_id: &str, line: &str) -> Result<LineOutcome> {
    let input = line.trim();
    if input.is_empty() {
        return Ok(LineOutcome::Continue);
    }

    match parse(input) {
        Some(ChatCommand::Exit) => return Ok(LineOutcome::Exit),
        Some(ChatCommand::Help) => print_help(),
        Some(ChatCommand::Clear) => {
            state.orchestrator.clear(user_id).await;
            println!("  {}", style("Conversation cleared.").dim());
        }
        Some(ChatCommand::Order) => match state.orchestrator.pending_order(user_id).await {
            Some(order) => println!("{}", serde_json::to_string_pretty(&order)?),
            None => println!("  {}", style("No order yet.").dim()),
        },
        Some(ChatCommand::History) => {
            let turns = state
                .orchestrator
                .snapshot(user_id)
                .await
                .map(|s| s.turns)
                .unwrap_or_default();
            for turn in &turns {
                println!("  {} {}", style(format!("[{}]", turn.role())).dim(), turn.content());
            }
        }
        Some(ChatCommand::Unknown(cmd)) => {
            println!("  {} Unknown command {cmd}. Try /help.", style("?").yellow());
        }
        None => {
            let result = state
                .orchestrator
                .handle(user_id, input, state.business())
                .await;
            println!("{} {}", style("bot ›").magenta().bold(), result.response_text);
            if let Some(order) = &result.order {
                println!();
                println!("  {}", style("Order complete:").green().bold());
                println!("{}", serde_json::to_string_pretty(order)?);
            }
        }
    }

    Ok(LineOutcome::Continue)
}
