//! Search the cached repositories.

use std::sync::Arc;

use console::Term;
use stardex::{Repository, RepositoryCache, SearchIndex, SortKey, connect_and_migrate};

use crate::commands::OutputFormat;

const DESCRIPTION_WIDTH: usize = 60;

/// One row of the search results table.
#[derive(Debug, Clone, PartialEq, tabled::Tabled)]
pub(crate) struct RepoRow {
    #[tabled(rename = "Repository")]
    pub name: String,
    #[tabled(rename = "Stars")]
    pub stars: u32,
    #[tabled(rename = "Language")]
    pub language: String,
    #[tabled(rename = "Updated")]
    pub updated: String,
    #[tabled(rename = "Description")]
    pub description: String,
}

impl From<&Repository> for RepoRow {
    fn from(repo: &Repository) -> Self {
        Self {
            name: repo.full_name(),
            stars: repo.star_count,
            language: repo.language.clone().unwrap_or_else(|| "-".to_string()),
            updated: repo
                .updated_at_parsed()
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| repo.updated_at.clone()),
            description: truncate(repo.description.as_deref().unwrap_or(""), DESCRIPTION_WIDTH),
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub(crate) async fn handle_search(
    term: &str,
    sort: SortKey,
    limit: usize,
    output: OutputFormat,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Arc::new(connect_and_migrate(database_url).await?);
    let repos = RepositoryCache::new(db).load_all().await?;
    let total = repos.len();

    let index = SearchIndex::build(repos);
    let mut hits = index.query(term, sort);
    let matched = hits.len();
    if limit > 0 {
        hits.truncate(limit);
    }

    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        OutputFormat::Table => {
            if total == 0 {
                println!("The cache is empty. Run `stardex fetch` first.");
                return Ok(());
            }
            if hits.is_empty() {
                println!("No repositories match '{}'.", term);
                return Ok(());
            }

            let rows: Vec<RepoRow> = hits.iter().map(RepoRow::from).collect();
            let mut table = tabled::Table::new(rows);
            table.with(tabled::settings::Style::rounded());
            println!("{}", table);

            if Term::stdout().is_term() {
                println!(
                    "Showing {} of {} match(es) across {} cached repositories (sorted by {})",
                    hits.len(),
                    matched,
                    total,
                    sort
                );
            }
        }
    }

    tracing::debug!(term, %sort, matched, shown = hits.len(), "Search complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> Repository {
        Repository {
            id: 7,
            name: "tokio".to_string(),
            description: Some("A runtime for writing reliable asynchronous applications".to_string()),
            url: "https://github.com/tokio-rs/tokio".to_string(),
            language: Some("Rust".to_string()),
            star_count: 25_000,
            updated_at: "2024-03-05T10:20:30Z".to_string(),
            owner_login: "tokio-rs".to_string(),
        }
    }

    #[test]
    fn test_row_from_repository() {
        let row = RepoRow::from(&repo());
        assert_eq!(row.name, "tokio-rs/tokio");
        assert_eq!(row.stars, 25_000);
        assert_eq!(row.language, "Rust");
        assert_eq!(row.updated, "2024-03-05");
    }

    #[test]
    fn test_row_placeholders_for_missing_fields() {
        let mut repo = repo();
        repo.language = None;
        repo.description = None;
        repo.updated_at = "yesterday".to_string();

        let row = RepoRow::from(&repo);
        assert_eq!(row.language, "-");
        assert_eq!(row.description, "");
        assert_eq!(row.updated, "yesterday");
    }

    #[test]
    fn test_truncate_long_description() {
        assert_eq!(truncate("short", 10), "short");
        let cut = truncate("abcdefghijkl", 5);
        assert_eq!(cut, "abcd…");
        assert_eq!(cut.chars().count(), 5);
    }
}
