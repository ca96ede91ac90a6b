//! Save GitHub credentials to the local database.

use std::sync::Arc;

use console::{Term, style};
use stardex::{CredentialStore, connect_and_migrate};

pub(crate) async fn handle_login(
    username: &str,
    token: Option<&str>,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let username = username.trim();
    if username.is_empty() {
        return Err("Username cannot be empty".into());
    }

    let db = Arc::new(connect_and_migrate(database_url).await?);
    let store = CredentialStore::new(db);

    store.save_username(username).await?;
    let saved_token = match token.map(str::trim) {
        Some(token) if !token.is_empty() => {
            store.save_token(token).await?;
            true
        }
        _ => false,
    };

    if Term::stdout().is_term() {
        println!("{} Saved username {}", style("✓").green(), style(username).cyan());
        if saved_token {
            println!("{} Saved access token", style("✓").green());
        } else {
            println!(
                "{} No token given; pass --token or set STARDEX_GITHUB_TOKEN before fetching",
                style("!").yellow()
            );
        }
    } else {
        tracing::info!(username, token_saved = saved_token, "Credentials saved");
    }

    Ok(())
}
