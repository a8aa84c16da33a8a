use anyhow::{anyhow, Result};
use std::sync::Arc;

use super::UpdaterOptions;
use crate::cli::ConfigArgs;
use crate::notify::ConsoleSink;

pub async fn run_skip(options: &UpdaterOptions, id: &str, commit: Option<String>) -> Result<()> {
    let session = options.open_session(Arc::new(ConsoleSink)).await?;

    let commit = match commit {
        Some(commit) => commit,
        None => session
            .snapshot()
            .await
            .find_update(id)
            .and_then(|u| u.head())
            .map(|c| c.id.clone())
            .ok_or_else(|| anyhow!("No pending update for {}. Pass --commit to skip a specific revision.", id))?,
    };

    session.skip_update(id, &commit).await;
    println!("⏭️  Skipping {} until upstream moves past {}", id, commit);
    Ok(())
}

pub async fn run_disable(options: &UpdaterOptions, id: &str) -> Result<()> {
    let session = options.open_session(Arc::new(ConsoleSink)).await?;

    let entity = session
        .registry()
        .get(id)
        .ok_or_else(|| anyhow!("Unknown entity: {}", id))?;
    session.disable_updates(entity.info().disabled_record()).await;

    println!("🚫 Updates disabled for {}", entity.info().display_name);
    Ok(())
}

pub async fn run_enable(options: &UpdaterOptions, id: &str) -> Result<()> {
    let session = options.open_session(Arc::new(ConsoleSink)).await?;

    if !session.snapshot().await.is_disabled(id) {
        println!("Updates are not disabled for {}.", id);
        return Ok(());
    }

    session.enable_updates(id).await;
    println!("✅ Updates enabled for {}", id);
    Ok(())
}

pub async fn run_pause(options: &UpdaterOptions) -> Result<()> {
    let session = options.open_session(Arc::new(ConsoleSink)).await?;
    session.pause().await;
    println!("⏸️  Scheduled checks paused.");
    Ok(())
}

pub async fn run_resume(options: &UpdaterOptions) -> Result<()> {
    let session = options.open_session(Arc::new(ConsoleSink)).await?;
    session.resume().await;
    println!("▶️  Scheduled checks resumed.");
    Ok(())
}

pub async fn run_config(options: &UpdaterOptions, args: ConfigArgs) -> Result<()> {
    let session = options.open_session(Arc::new(ConsoleSink)).await?;

    if let Some(automatic) = args.automatic {
        session.set_automatic(automatic).await;
    }
    if let Some(minutes) = args.interval {
        let applied = session.set_interval(minutes).await;
        if applied != minutes {
            println!("⚠️  Interval raised to {} minute(s)", applied);
        }
    }
    if let Some(disabled) = args.disabled {
        session.set_disabled(disabled).await;
    }

    let state = session.snapshot().await;
    if !args.is_empty() {
        println!("✅ Configuration saved");
    }
    println!("   automatic: {}", state.automatic);
    println!("   interval:  {} minute(s)", state.interval);
    println!("   disabled:  {}", state.disabled);
    println!("   paused:    {}", state.paused);
    Ok(())
}
