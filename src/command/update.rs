use anyhow::Result;
use std::io::{self, Write};
use std::sync::Arc;

use super::UpdaterOptions;
use crate::notify::{ConsoleSink, UserIntent, FORCE_UPDATE_WARNING};

pub async fn run_update(options: &UpdaterOptions, force: bool, yes: bool) -> Result<()> {
    let session = options.open_session(Arc::new(ConsoleSink)).await?;

    let pending = session.snapshot().await.updates;
    if pending.is_empty() {
        println!("Nothing to update. Run 'mod-updater check' first.");
        return Ok(());
    }

    if force && !yes {
        println!("⚠️  {}\n", FORCE_UPDATE_WARNING);
        print!("Continue with the forced update? [y/N]: ");
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        let answer = answer.trim().to_lowercase();

        if answer != "y" && answer != "yes" {
            println!("Force update cancelled. Local changes were left untouched.");
            return Ok(());
        }
    }

    let intent = if force {
        UserIntent::ForceUpdate
    } else {
        UserIntent::UpdateNow
    };

    let report = match session.handle_intent(intent).await {
        Ok(Some(report)) => report,
        Ok(None) => return Ok(()),
        Err(e) => {
            println!("⏸️  Update not started: {}", e);
            return Ok(());
        }
    };

    for id in &report.applied {
        println!("✅ Updated {}", id);
    }
    for candidate in &report.failed {
        println!("❌ Failed to update {} ({})", candidate.name, candidate.id);
    }
    if !report.applied.is_empty() {
        println!("\n🔄 Restart the client to load the new versions.");
    }

    Ok(())
}
