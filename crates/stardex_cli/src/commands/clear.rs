use std::sync::Arc;

use console::{Term, style};
use stardex::{RepositoryCache, connect_and_migrate};

pub(crate) async fn handle_clear(database_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let db = Arc::new(connect_and_migrate(database_url).await?);
    let removed = RepositoryCache::new(db).clear().await?;

    if Term::stdout().is_term() {
        println!("{} Removed {} cached repositories", style("✓").green(), removed);
    } else {
        tracing::info!(removed, "Cache cleared");
    }
    Ok(())
}
