//! Interactive chat loop for `ragdesk chat`.
//!
//! Reads lines from stdin, dispatches slash commands, and sends everything
//! else to the conversation engine. While a reply is pending a spinner is
//! shown; Ctrl+C abandons the pending reply without leaving the chat.

pub mod commands;

use std::time::Duration;

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use ragdesk_types::error::{ChatError, ValidationError};
use ragdesk_types::event::{CoreEvent, ReplyOutcome};

use crate::cli::session::{print_message, print_summaries, resolve_session_id};
use crate::state::AppState;
use commands::ChatCommand;

/// Wait for the `ReplyResolved` event of `session_id`.
///
/// Returns `None` if the bus closes first.
pub async fn wait_for_reply(
    events: &mut broadcast::Receiver<CoreEvent>,
    session_id: Uuid,
) -> Option<ReplyOutcome> {
    loop {
        match events.recv().await {
            Ok(CoreEvent::ReplyResolved {
                session_id: resolved,
                outcome,
                ..
            }) if resolved == session_id => return Some(outcome),
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Chat event receiver lagged");
                continue;
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

fn spinner() -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}")?);
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    Ok(spinner)
}

async fn print_header(state: &AppState, session_id: Uuid) -> Result<()> {
    let session = state.sessions.get_session(&session_id).await?;
    println!();
    println!(
        "  {} {} {}",
        style("💬").bold(),
        style(&session.name).cyan().bold(),
        style(format!("({})", session.id)).dim()
    );
    println!("  {}", style("Type /help for commands").dim());
    println!();
    for message in state.sessions.messages(&session_id).await? {
        print_message(&message);
    }
    Ok(())
}

/// Send one message and render whatever the engine appended in response.
async fn exchange(state: &AppState, session_id: Uuid, text: &str, json: bool) -> Result<()> {
    let mut events = state.events.subscribe();
    let message_id = match state.engine.send_user_message(session_id, text).await {
        Ok(id) => id,
        Err(ChatError::Validation(ValidationError::EmptyMessage)) => return Ok(()),
        Err(err @ ChatError::ReplyPending(_)) => {
            println!("  {}", style(err).yellow());
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let spinner = if json { None } else { Some(spinner()?) };
    let outcome = tokio::select! {
        outcome = wait_for_reply(&mut events, session_id) => outcome,
        _ = tokio::signal::ctrl_c() => {
            state.engine.abandon_session(&session_id);
            Some(ReplyOutcome::Cancelled)
        }
    };
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let messages = state.sessions.messages(&session_id).await?;
    let new_messages: Vec<_> = messages
        .iter()
        .skip_while(|m| m.id != message_id)
        .skip(1)
        .collect();
    for message in &new_messages {
        if json {
            println!("{}", serde_json::to_string(message)?);
        } else {
            print_message(message);
        }
    }
    if json {
        return Ok(());
    }
    match outcome {
        Some(ReplyOutcome::Cancelled) => {
            println!("  {}", style("Reply cancelled.").dim());
            println!();
        }
        // The reply could not be saved, so nothing above explains it.
        Some(ReplyOutcome::Failed) if new_messages.is_empty() => {
            println!("  {}", style("The reply could not be saved. Please try again.").red());
            println!();
        }
        _ => {}
    }
    Ok(())
}

/// Run the interactive chat loop until `/quit` or end of input.
pub async fn run_chat(state: &AppState, session: Option<String>, json: bool) -> Result<()> {
    let mut current = match session {
        Some(input) => resolve_session_id(state, &input).await?,
        None => match state.sessions.list_sessions().await.first() {
            Some(session) => session.id,
            None => state.sessions.create_session(None).await?.id,
        },
    };
    // Fail early on an unknown id.
    state.sessions.get_session(&current).await?;
    if !json {
        print_header(state, current).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        if !json {
            stdout.write_all(b"  > ").await?;
            stdout.flush().await?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match commands::parse(&line) {
            None => exchange(state, current, &line, json).await?,
            Some(ChatCommand::Help) => commands::print_help(),
            Some(ChatCommand::Quit) => break,
            Some(ChatCommand::New(name)) => {
                let session = state.sessions.create_session(name).await?;
                current = session.id;
                if !json {
                    print_header(state, current).await?;
                }
            }
            Some(ChatCommand::Sessions) => {
                print_summaries(&state.sessions.summaries().await, Some(current));
            }
            Some(ChatCommand::Switch(input)) => match resolve_session_id(state, &input).await {
                Ok(id) if state.sessions.contains(&id) => {
                    current = id;
                    print_header(state, current).await?;
                }
                Ok(id) => println!("  {}", style(format!("Session {id} not found")).red()),
                Err(err) => println!("  {}", style(err).red()),
            },
            Some(ChatCommand::Unknown(msg)) => {
                println!("  {} {}", style("Unknown command:").yellow(), msg);
            }
        }
    }

    if !json {
        println!();
        println!("  {}", style("Goodbye.").dim());
    }
    Ok(())
}
