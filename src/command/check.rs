use anyhow::Result;
use std::sync::Arc;

use super::status::print_candidates;
use super::UpdaterOptions;
use crate::notify::ConsoleSink;

pub async fn run_check(options: &UpdaterOptions) -> Result<()> {
    let session = options.open_session(Arc::new(ConsoleSink)).await?;

    let found = match session.check_for_updates().await {
        Ok(found) => found,
        Err(e) => {
            println!("⏸️  Check not started: {}", e);
            return Ok(());
        }
    };

    let state = session.snapshot().await;
    if found == 0 {
        println!("✅ Everything is up to date.");
    } else if state.updates.is_empty() {
        println!("✅ Installed {} update(s). Restart the client to load them.", found);
    } else {
        println!();
        print_candidates(&state.updates);
    }

    Ok(())
}
