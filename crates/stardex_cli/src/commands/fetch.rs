//! Download the starred collection and refresh the cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use console::{Term, style};
use stardex::{FetchProgress, ProgressCallback, RefreshOutcome};

use crate::commands::{open_session, resolve_token, resolve_username};
use crate::config::Config;
use crate::progress::ProgressReporter;

pub(crate) async fn handle_fetch(
    username: Option<String>,
    concurrency: Option<usize>,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(config, database_url, concurrency).await?;
    let username = resolve_username(username, config, &session).await?;
    let token = resolve_token(config, &session).await?;

    let is_tty = Term::stdout().is_term();
    let reporter = Arc::new(ProgressReporter::new());
    let started = Instant::now();
    let downloaded = Arc::new(AtomicBool::new(false));
    let on_progress = mark_download_complete(reporter.as_callback(), Arc::clone(&downloaded));

    let result = tokio::select! {
        result = session.refresh(&username, &token, Some(on_progress)) => result,
        _ = tokio::signal::ctrl_c() => {
            reporter.abandon();
            return Err(interrupted_message(downloaded.load(Ordering::Acquire)).into());
        }
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            reporter.abandon();
            tracing::error!(error = %e, "Fetch failed");
            return Err(e.user_message().into());
        }
    };

    report(&username, outcome, started.elapsed(), is_tty);
    Ok(())
}

/// Forward progress to `inner`, raising `downloaded` once every page is in.
/// Past that point the refresh is writing to the cache.
fn mark_download_complete(
    inner: ProgressCallback,
    downloaded: Arc<AtomicBool>,
) -> ProgressCallback {
    Box::new(move |event| {
        if matches!(event, FetchProgress::FetchComplete { .. }) {
            downloaded.store(true, Ordering::Release);
        }
        inner(event);
    })
}

fn interrupted_message(downloaded: bool) -> &'static str {
    if downloaded {
        "Fetch interrupted while caching; some repositories may already be updated. \
Run `stardex fetch` again to finish."
    } else {
        "Fetch interrupted before the download finished; the cache keeps its previous contents"
    }
}

fn report(username: &str, outcome: RefreshOutcome, elapsed: std::time::Duration, is_tty: bool) {
    if is_tty {
        println!(
            "{} Fetched {} starred repositories for {} in {:.1}s",
            style("✓").green(),
            style(outcome.fetched).bold(),
            style(username).cyan(),
            elapsed.as_secs_f64()
        );
        if !outcome.persisted {
            println!(
                "{} Some repositories could not be cached; they will be fetched again next time",
                style("!").yellow()
            );
        }
    } else {
        tracing::info!(
            username,
            fetched = outcome.fetched,
            persisted = outcome.persisted,
            elapsed_ms = elapsed.as_millis() as u64,
            "Fetch complete"
        );
    }
}
