use anyhow::Result;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::changelog::ConsolePresenter;
use super::UpdaterOptions;
use crate::notify::changelog::{ChangelogDocument, ChangelogPresenter};
use crate::notify::LogSink;
use crate::updater::UpdateSession;

pub async fn run_watch(options: &UpdaterOptions, changelog: Option<String>) -> Result<()> {
    let session = options.open_session(Arc::new(LogSink)).await?;
    let period = session.start().await;

    let changelog = match changelog {
        Some(path) => Some(ChangelogDocument::load(Path::new(&path))?),
        None => None,
    };

    info!(
        "⏱️  Checking for updates every {} minute(s). Press Ctrl-C to stop.",
        period.as_secs() / 60
    );

    run_timer(
        &session,
        period,
        changelog.as_ref(),
        &ConsolePresenter,
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        },
    )
    .await;

    Ok(())
}

/// Drive the update timer until `shutdown`, presenting `changelog` alongside.
///
/// The first check starts before the changelog is shown, and a changelog
/// waiting for the user never holds back the timer.
async fn run_timer<F>(
    session: &UpdateSession,
    period: Duration,
    changelog: Option<&ChangelogDocument>,
    presenter: &dyn ChangelogPresenter,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let timer = session.run_periodic(period, shutdown);
    tokio::pin!(timer);

    let show = async {
        if let Some(doc) = changelog {
            if let Err(e) = session.show_changelog(doc, presenter, false).await {
                warn!("Changelog {} not shown: {:#}", doc.id, e);
            }
        }
    };
    tokio::pin!(show);
    let mut shown = false;

    loop {
        tokio::select! {
            biased;
            _ = &mut timer => break,
            _ = &mut show, if !shown => shown = true,
        }
    }
}
