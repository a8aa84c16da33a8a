use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use std::sync::Arc;

use super::UpdaterOptions;
use crate::domain::UpdateCandidate;
use crate::git::{GitCli, GitInfo};
use crate::notify::ConsoleSink;
use crate::updater::SessionPhase;

pub async fn run_status(options: &UpdaterOptions) -> Result<()> {
    let session = options.open_session(Arc::new(ConsoleSink)).await?;
    let state = session.snapshot().await;

    let phase = state.phase();
    match phase {
        SessionPhase::Idle => println!("✅ Updater is idle"),
        SessionPhase::Checking => println!(
            "🔍 Checking for updates ({}/{})",
            state.checking_progress.done, state.checking_progress.total
        ),
        SessionPhase::HasUpdates => println!("📦 {} update(s) available", state.updates.len()),
        SessionPhase::Updating => println!("⬇️  Installing updates"),
        SessionPhase::Failed => println!("❌ {} update(s) failed to install", state.updates.len()),
    }

    if state.disabled {
        println!("   Updater is disabled");
    } else if state.paused {
        println!("   Scheduled checks are paused");
    }
    println!(
        "   Mode: {}, every {} minute(s)",
        if state.automatic { "automatic" } else { "manual" },
        state.interval
    );
    println!(
        "   Last check: {}",
        state
            .last_check
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string())
    );
    let root = options.install_root()?;
    match GitInfo::resolve(&GitCli, &root).await {
        Ok(info) => println!(
            "   Loader: {} on {} at {}",
            info.upstream.as_deref().unwrap_or("unknown repository"),
            info.branch,
            &info.revision[..info.revision.len().min(7)]
        ),
        Err(e) => println!("   Loader: not a git checkout ({})", e),
    }
    if state.awaiting_reload {
        println!("   🔄 Updates installed; restart the client to load them");
    }

    if !state.entities_disabled.is_empty() {
        println!("\nDisabled:");
        for record in &state.entities_disabled {
            println!("   {} {} ({})", record.icon.label(), record.name, record.id);
        }
    }

    if !state.entities_skipped.is_empty() {
        println!("\nSkipped:");
        let mut skipped: Vec<_> = state.entities_skipped.iter().collect();
        skipped.sort();
        for (id, commit) in skipped {
            println!("   {} at {}", id, commit);
        }
    }

    if !state.updates.is_empty() {
        println!();
        print_candidates(&state.updates);
    }

    Ok(())
}

/// Print pending updates with their commits, newest first.
pub(super) fn print_candidates(updates: &[UpdateCandidate]) {
    for candidate in updates {
        println!(
            "📦 {} {} ({}): {} new commit(s)",
            candidate.icon.label(),
            candidate.name,
            candidate.id,
            candidate.commits.len()
        );
        for commit in &candidate.commits {
            let date = DateTime::<Utc>::from_timestamp(commit.timestamp, 0)
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            println!(
                "   {} {} ({}, {})",
                commit.short_id(),
                commit.message,
                commit.author,
                date
            );
        }
    }
}
