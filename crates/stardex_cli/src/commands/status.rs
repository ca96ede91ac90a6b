//! Show cache and credential status.

use std::sync::Arc;

use stardex::{CredentialStore, RepositoryCache, connect_and_migrate};

use crate::commands::OutputFormat;
use crate::config::Config;

/// Snapshot of what is stored locally.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, tabled::Tabled)]
pub(crate) struct StatusDisplay {
    #[tabled(rename = "Username")]
    pub username: String,
    #[tabled(rename = "Token")]
    pub token: String,
    #[tabled(rename = "Cached")]
    pub cached: u64,
    #[tabled(rename = "Endpoint")]
    pub endpoint: String,
    #[tabled(rename = "Database")]
    pub database: String,
}

impl StatusDisplay {
    fn print(&self, output: OutputFormat) -> Result<(), serde_json::Error> {
        match output {
            OutputFormat::Table => {
                let mut table = tabled::Table::new(vec![self.clone()]);
                table.with(tabled::settings::Style::rounded());
                println!("{}", table);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(self)?);
            }
        }
        Ok(())
    }
}

/// Describe where a token comes from without revealing it.
fn token_source(configured: Option<&str>, saved: Option<&str>) -> String {
    let present = |v: Option<&str>| v.is_some_and(|t| !t.trim().is_empty());
    if present(configured) {
        "configured".to_string()
    } else if present(saved) {
        "saved".to_string()
    } else {
        "missing".to_string()
    }
}

pub(crate) async fn handle_status(
    output: OutputFormat,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Arc::new(connect_and_migrate(database_url).await?);
    let credentials = CredentialStore::new(Arc::clone(&db));
    let cache = RepositoryCache::new(db);

    let saved_username = credentials.username().await?;
    let saved_token = credentials.token().await?;

    let status = StatusDisplay {
        username: config
            .github
            .username
            .clone()
            .or(saved_username)
            .unwrap_or_else(|| "-".to_string()),
        token: token_source(config.github.token.as_deref(), saved_token.as_deref()),
        cached: cache.count().await?,
        endpoint: config.api_url(),
        database: database_url.to_string(),
    };

    status.print(output)?;
    Ok(())
}
