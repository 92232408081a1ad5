//! `ragdesk ingest`: upload and index documents with live progress bars.
//!
//! Progress is driven by the event bus. Each event triggers a refresh from
//! pipeline snapshots, so a lagging receiver only costs redraws.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use ragdesk_infra::filesystem::read_descriptor;
use ragdesk_types::file::{FileStatus, IngestFile, format_file_size};

use crate::state::AppState;

struct ProgressView {
    multi: MultiProgress,
    bars: HashMap<Uuid, ProgressBar>,
}

impl ProgressView {
    fn new(files: &[IngestFile]) -> Result<Self> {
        let bar_style = ProgressStyle::with_template(
            "  {prefix:<24.bold} [{bar:30.cyan/blue}] {pos:>3}% {msg}",
        )?
        .progress_chars("=> ");

        let multi = MultiProgress::new();
        let mut bars = HashMap::new();
        for file in files {
            let bar = multi.add(ProgressBar::new(100));
            bar.set_style(bar_style.clone());
            bar.set_prefix(truncate(&file.name, 24));
            bar.set_message(file.status.to_string());
            bars.insert(file.id, bar);
        }
        Ok(Self { multi, bars })
    }

    fn update(&self, file: &IngestFile) {
        let Some(bar) = self.bars.get(&file.id) else {
            return;
        };
        bar.set_position(u64::from(file.progress));
        match file.status {
            FileStatus::Completed => {
                bar.finish_with_message(format!("{}", style("completed").green()));
            }
            FileStatus::Error => {
                let reason = file.error.as_deref().unwrap_or("failed");
                bar.abandon_with_message(format!("{}", style(reason).red()));
            }
            status => bar.set_message(status.to_string()),
        }
    }

    fn clear(&self) {
        let _ = self.multi.clear();
    }
}

fn truncate(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        name.to_string()
    } else {
        let cut: String = name.chars().take(max - 3).collect();
        format!("{cut}...")
    }
}

/// Ingest `paths`, wait until every file completes or fails, and optionally
/// create a knowledge base from the completed ones.
pub async fn ingest(
    state: &AppState,
    paths: Vec<PathBuf>,
    kb_name: Option<String>,
    description: Option<String>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let mut descriptors = Vec::with_capacity(paths.len());
    for path in &paths {
        let descriptor = read_descriptor(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        descriptors.push(descriptor);
    }

    // Subscribe before enqueueing so no transition is missed.
    let mut events = state.events.subscribe();
    let ids = state.pipeline.enqueue(descriptors)?;

    let snapshot = |ids: &[Uuid]| -> Vec<IngestFile> {
        ids.iter().filter_map(|id| state.pipeline.get(id)).collect()
    };

    let view = if json || quiet {
        None
    } else {
        Some(ProgressView::new(&snapshot(&ids))?)
    };

    let files = loop {
        let files = snapshot(&ids);
        if let Some(view) = &view {
            for file in &files {
                view.update(file);
            }
        }
        if files.iter().all(|f| f.status.is_terminal()) {
            break files;
        }
        match events.recv().await {
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break snapshot(&ids),
        }
    };
    if let Some(view) = &view {
        view.clear();
    }

    let completed: Vec<Uuid> = files
        .iter()
        .filter(|f| f.status == FileStatus::Completed)
        .map(|f| f.id)
        .collect();

    let knowledge_base = match kb_name {
        Some(name) if completed.is_empty() => {
            bail!("No files completed ingestion; knowledge base '{name}' was not created")
        }
        Some(name) => Some(state.knowledge_bases.create(
            &*state.pipeline,
            &name,
            description.as_deref().unwrap_or_default(),
            completed.iter().copied(),
        )?),
        None => None,
    };

    if json {
        let out = serde_json::json!({
            "files": files,
            "knowledge_base": knowledge_base,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    println!();
    for file in &files {
        match file.status {
            FileStatus::Completed => println!(
                "  {} {} {}",
                style("✓").green(),
                file.name,
                style(format_file_size(file.size_bytes)).dim()
            ),
            _ => println!(
                "  {} {} {}",
                style("✗").red(),
                file.name,
                style(file.error.as_deref().unwrap_or("failed")).red()
            ),
        }
    }
    println!();
    println!(
        "  {} of {} file{} indexed",
        style(completed.len()).bold(),
        files.len(),
        if files.len() == 1 { "" } else { "s" }
    );
    if let Some(kb) = &knowledge_base {
        println!(
            "  {} Knowledge base '{}' created ({} files)",
            style("📚").bold(),
            style(&kb.name).cyan(),
            kb.file_ids.len()
        );
    }
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short.pdf", 24), "short.pdf");
        assert_eq!(
            truncate("a-very-long-document-name-indeed.pdf", 12),
            "a-very-lo..."
        );
    }

    #[tokio::test]
    async fn test_ingest_creates_knowledge_base() {
        let (state, dir) = crate::state::tests::test_state().await;
        let good = dir.path().join("policy.txt");
        let bad = dir.path().join("empty.txt");
        tokio::fs::write(&good, b"refunds within 30 days").await.unwrap();
        tokio::fs::write(&bad, b"").await.unwrap();

        // Empty files fail validation up front; nothing is queued.
        let err = ingest(&state, vec![good.clone(), bad], None, None, false, true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
        assert!(state.pipeline.list().is_empty());

        ingest(&state, vec![good], Some("Policies".into()), None, false, true)
            .await
            .unwrap();
        let files = state.pipeline.list();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].status, FileStatus::Completed);
        let kbs = state.knowledge_bases.list();
        assert_eq!(kbs.len(), 1);
        assert_eq!(kbs[0].name, "Policies");
    }

    #[tokio::test]
    async fn test_ingest_missing_path_fails() {
        let (state, dir) = crate::state::tests::test_state().await;
        let missing = dir.path().join("nope.pdf");
        let err = ingest(&state, vec![missing], None, None, true, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
