pub(crate) mod clear;
pub(crate) mod fetch;
pub(crate) mod login;
pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod search;
pub(crate) mod status;

use std::sync::Arc;

use clap::ValueEnum;
use stardex::{GitHubClient, StarSession, StarredFetcher, connect_and_migrate};

use crate::config::Config;

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Open the database, apply migrations and build a session around it.
pub(crate) async fn open_session(
    config: &Config,
    database_url: &str,
    concurrency: Option<usize>,
) -> Result<StarSession, Box<dyn std::error::Error>> {
    let db = Arc::new(connect_and_migrate(database_url).await?);

    let client = GitHubClient::with_timeout(config.fetch_timeout())?.with_api_url(config.api_url());
    let fetcher = StarredFetcher::new(client)
        .with_concurrency(concurrency.unwrap_or(config.fetch.concurrency));

    Ok(StarSession::new(fetcher, db))
}

/// First candidate that is present and not blank.
pub(crate) fn first_non_blank<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Resolve whose stars to fetch: flag, then config/env, then saved login.
pub(crate) async fn resolve_username(
    flag: Option<String>,
    config: &Config,
    session: &StarSession,
) -> Result<String, Box<dyn std::error::Error>> {
    let saved = session.credentials().username().await?;
    first_non_blank([flag, config.github.username.clone(), saved]).ok_or_else(|| {
        "No GitHub username configured. Run: stardex login --username <name>"
            .to_string()
            .into()
    })
}

/// Resolve the access token: config/env, then saved login.
///
/// Returns an empty string when nothing is configured; the fetch rejects it
/// before any request is made.
pub(crate) async fn resolve_token(
    config: &Config,
    session: &StarSession,
) -> Result<String, Box<dyn std::error::Error>> {
    let saved = session.credentials().token().await?;
    Ok(first_non_blank([config.github.token.clone(), saved]).unwrap_or_default())
}
