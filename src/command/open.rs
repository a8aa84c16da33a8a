use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use url::Url;

use super::UpdaterOptions;
use crate::notify::ConsoleSink;

const HOSTING_BASE_URL: &str = "https://github.com/";

/// Web URL of `commit` in `repo` (`owner/name`).
fn commit_url(repo: &str, commit: &str) -> Result<Url> {
    let base = Url::parse(HOSTING_BASE_URL)?;
    base.join(&format!("{}/commit/{}", repo, commit))
        .with_context(|| format!("Invalid repository identity: {}", repo))
}

pub async fn run_open(options: &UpdaterOptions, id: &str) -> Result<()> {
    let session = options.open_session(Arc::new(ConsoleSink)).await?;
    let state = session.snapshot().await;

    let candidate = state
        .find_update(id)
        .ok_or_else(|| anyhow!("No pending update for {}", id))?;
    let repo = candidate
        .repo
        .as_deref()
        .ok_or_else(|| anyhow!("Repository of {} is unknown", candidate.name))?;
    let head = candidate
        .head()
        .ok_or_else(|| anyhow!("No commits pending for {}", candidate.name))?;

    let url = commit_url(repo, &head.id)?;
    println!("🌐 Opening {}", url);
    if open::that(url.as_str()).is_err() {
        println!("⚠️  Could not open browser automatically.");
    }

    Ok(())
}
