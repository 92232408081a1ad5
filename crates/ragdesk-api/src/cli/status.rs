//! System status dashboard command.

use anyhow::Result;
use console::style;

use crate::state::AppState;

/// Display file, knowledge-base, and chat counts.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let stats = state.stats().await;

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "persistence": state.persistence_label(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} ragdesk v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Files ──").dim());
    println!("  Total:      {}", style(stats.total_files).bold());
    println!("  Completed:  {}", style(stats.files.completed).green());
    if stats.files.in_flight() > 0 {
        println!("  In flight:  {}", style(stats.files.in_flight()).yellow());
    }
    if stats.files.error > 0 {
        println!("  Failed:     {}", style(stats.files.error).red());
    }
    println!("  Knowledge bases: {}", stats.knowledge_bases);
    println!();

    println!("  {}", style("── Chat ──").dim());
    println!("  Sessions:        {}", style(stats.sessions).bold());
    println!("  Messages:        {}", stats.messages);
    println!("  Pending replies: {}", stats.pending_replies);
    println!();

    println!("  {}", style("── System ──").dim());
    println!("  Data dir:    {}", style(state.data_dir.display()).dim());
    println!("  Persistence: {}", style(state.persistence_label()).dim());
    println!(
        "  Answers:     {}",
        style(format!("{:?}", state.config.answer.backend).to_lowercase()).dim()
    );
    println!();

    Ok(())
}
