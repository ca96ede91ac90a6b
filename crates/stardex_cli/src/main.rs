//! Stardex CLI - fetch, cache and search your GitHub starred repositories.

mod commands;
mod config;
mod progress;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use stardex::SortKey;
use tracing_subscriber::EnvFilter;

use crate::commands::OutputFormat;

#[derive(Parser)]
#[command(name = "stardex")]
#[command(version)]
#[command(about = "Fetch, cache and search your GitHub starred repositories")]
#[command(
    long_about = "Stardex downloads every repository a GitHub user has starred, keeps the \
snapshots in a local SQLite database and searches them offline with typo-tolerant \
matching on name, description, owner and language."
)]
#[command(after_long_help = r#"EXAMPLES
    Save your credentials once:
        $ stardex login --username octocat --token ghp_...

    Download your starred repositories:
        $ stardex fetch

    Search them, most starred first:
        $ stardex search "async runtime" --sort stars

    Generate shell completions:
        $ stardex completions bash > ~/.local/share/bash-completion/completions/stardex

CONFIGURATION
    Stardex reads configuration from:
      1. ~/.config/stardex/config.toml (or $XDG_CONFIG_HOME/stardex/config.toml)
      2. ./stardex.toml
      3. Environment variables (STARDEX_* prefix, e.g., STARDEX_GITHUB_TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    STARDEX_DATABASE_URL       Database connection string (default: ~/.local/state/stardex/stardex.db)
    STARDEX_GITHUB_USERNAME    Whose stars to fetch
    STARDEX_GITHUB_TOKEN       GitHub personal access token
    STARDEX_GITHUB_ENDPOINT    GitHub API base URL
    STARDEX_FETCH_CONCURRENCY  Parallel page requests (default: 8)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save GitHub credentials to the local database
    Login {
        /// GitHub username whose stars are fetched
        #[arg(short, long)]
        username: String,

        /// Personal access token
        #[arg(short, long, env = "STARDEX_GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Download all starred repositories and refresh the cache
    Fetch {
        /// GitHub username (default from config or saved login)
        #[arg(short, long)]
        username: Option<String>,

        /// Maximum concurrent page requests, 0 for unlimited (default from config or 8)
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
    /// Search the cached repositories
    Search {
        /// Search term; omit to list everything
        term: Option<String>,

        /// Result order: relevance, stars, name or updated (default from config)
        #[arg(short, long)]
        sort: Option<SortKey>,

        /// Maximum number of results (default from config or 50)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show cache and credential status
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Remove every cached repository
    Clear,
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging only when not attached to a TTY
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("stardex=info,stardex_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();

    let cli = Cli::parse();

    // Commands that don't touch the database
    match &cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(());
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(());
        }
        _ => {}
    }

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database location; set STARDEX_DATABASE_URL")?;
    ensure_database_dir(&database_url)?;

    match cli.command {
        Commands::Login { username, token } => {
            commands::login::handle_login(&username, token.as_deref(), &database_url).await?;
        }
        Commands::Fetch {
            username,
            concurrency,
        } => {
            commands::fetch::handle_fetch(username, concurrency, &config, &database_url).await?;
        }
        Commands::Search {
            term,
            sort,
            limit,
            output,
        } => {
            let sort = sort.unwrap_or_else(|| config.default_sort());
            let limit = limit.unwrap_or(config.search.limit);
            commands::search::handle_search(
                term.as_deref().unwrap_or_default(),
                sort,
                limit,
                output,
                &database_url,
            )
            .await?;
        }
        Commands::Status { output } => {
            commands::status::handle_status(output, &config, &database_url).await?;
        }
        Commands::Clear => {
            commands::clear::handle_clear(&database_url).await?;
        }
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Completions { .. } | Commands::Man { .. } => {}
    }

    Ok(())
}

/// Create the parent directory of a file-backed SQLite database.
fn ensure_database_dir(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
