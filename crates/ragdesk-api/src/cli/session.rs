//! Session browsing CLI commands: list and show.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use ragdesk_types::chat::{ChatMessage, MessageKind, Sender, SessionSummary};

use crate::state::AppState;

/// Relative time as shown in the session list: "Just now", "3h ago", "2d ago".
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (now - then).num_hours();
    let days = hours / 24;
    if days > 0 {
        format!("{days}d ago")
    } else if hours > 0 {
        format!("{hours}h ago")
    } else {
        "Just now".to_string()
    }
}

/// Resolve a full session ID or a unique prefix of one.
pub async fn resolve_session_id(state: &AppState, input: &str) -> Result<Uuid> {
    let input = input.trim();
    if let Ok(id) = input.parse::<Uuid>() {
        return Ok(id);
    }

    let needle = input.to_lowercase();
    let matches: Vec<Uuid> = state
        .sessions
        .list_sessions()
        .await
        .into_iter()
        .map(|s| s.id)
        .filter(|id| id.to_string().starts_with(&needle))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("No session matches '{input}'"),
        _ => bail!("'{input}' matches {} sessions; use a longer prefix", matches.len()),
    }
}

fn short_id(id: &Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

/// Print the session table used by `ragdesk sessions` and `/sessions`.
pub fn print_summaries(summaries: &[SessionSummary], current: Option<Uuid>) {
    let now = Utc::now();
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Messages").fg(Color::White),
        Cell::new("Last activity").fg(Color::White),
        Cell::new("Last message").fg(Color::White),
    ]);

    for summary in summaries {
        let marker = if Some(summary.id) == current { "*" } else { " " };
        table.add_row(vec![
            Cell::new(format!("{marker}{}", short_id(&summary.id))).fg(Color::DarkGrey),
            Cell::new(&summary.name).fg(Color::Cyan),
            Cell::new(summary.message_count.to_string()).fg(Color::White),
            Cell::new(format_relative(summary.last_activity_at, now)).fg(Color::DarkGrey),
            Cell::new(&summary.last_message_preview).fg(Color::White),
        ]);
    }

    println!();
    println!("{table}");
    println!();
}

/// Print one message in transcript form.
pub fn print_message(message: &ChatMessage) {
    let time = message.timestamp.format("%H:%M");
    match (message.sender, message.kind) {
        (Sender::User, _) => {
            println!(
                "  {} {}",
                style(format!("you {time}")).green().bold(),
                message.content
            );
        }
        (Sender::Assistant, MessageKind::Error) => {
            println!(
                "  {} {}",
                style(format!("assistant {time}")).red().bold(),
                style(&message.content).red()
            );
        }
        (Sender::Assistant, MessageKind::Normal) => {
            println!(
                "  {} {}",
                style(format!("assistant {time}")).cyan().bold(),
                message.content
            );
            if !message.sources.is_empty() {
                let names: Vec<&str> = message
                    .sources
                    .iter()
                    .map(|c| c.document_name.as_str())
                    .collect();
                println!("  {}", style(format!("Sources: {}", names.join(", "))).dim());
            }
        }
    }
    println!();
}

/// List sessions, most recently active first.
///
/// # Examples
///
/// ```bash
/// ragdesk sessions
/// ragdesk sessions --json
/// ```
pub async fn list_sessions(state: &AppState, json: bool) -> Result<()> {
    let summaries = state.sessions.summaries().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    print_summaries(&summaries, None);
    println!(
        "  {} session{}",
        style(summaries.len()).bold(),
        if summaries.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

/// Show a session and its full transcript.
pub async fn show_session(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id = resolve_session_id(state, id).await?;
    let session = state.sessions.get_session(&id).await?;
    let messages = state.sessions.messages(&id).await?;

    if json {
        let out = serde_json::json!({
            "session": session,
            "messages": messages,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style(&session.name).cyan().bold(),
        style(format!("({})", session.id)).dim()
    );
    println!(
        "  {}",
        style(format!(
            "Created {} · {} messages",
            session.created_at.format("%Y-%m-%d %H:%M"),
            messages.len()
        ))
        .dim()
    );
    println!();
    for message in &messages {
        print_message(message);
    }
    Ok(())
}
