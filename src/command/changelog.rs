use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use super::UpdaterOptions;
use crate::notify::changelog::{ChangelogDocument, ChangelogPresenter, RenderedChangelog};
use crate::notify::ConsoleSink;

/// Prints the changelog and waits for Enter.
pub(super) struct ConsolePresenter;

#[async_trait]
impl ChangelogPresenter for ConsolePresenter {
    async fn present(&self, changelog: &RenderedChangelog) -> Result<()> {
        println!("📰 What's new ({})\n", changelog.date);
        print!("{}", changelog.body);
        print!("Press Enter to continue...");
        io::stdout().flush()?;

        wait_for_enter(&mut BufReader::new(tokio::io::stdin())).await
    }
}

/// Resolve once a line is read. End of input means nobody saw the prompt.
async fn wait_for_enter<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<()> {
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .context("Failed to read from stdin")?;
    if read == 0 {
        bail!("stdin closed before the changelog was dismissed");
    }
    Ok(())
}

pub async fn run_changelog(options: &UpdaterOptions, manifest: &str, force: bool) -> Result<()> {
    let session = options.open_session(Arc::new(ConsoleSink)).await?;
    let doc = ChangelogDocument::load(Path::new(manifest))?;

    if !session.show_changelog(&doc, &ConsolePresenter, force).await? {
        println!(
            "Changelog {} was already shown. Use --force to show it again.",
            doc.id
        );
    }
    Ok(())
}
