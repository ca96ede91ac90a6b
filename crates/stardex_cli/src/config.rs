//! Configuration file support for stardex.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `STARDEX_`, e.g., `STARDEX_GITHUB_TOKEN`)
//! 3. Config file (./stardex.toml, then ~/.config/stardex/config.toml)
//! 4. Built-in defaults
//!
//! Environment variables map onto keys by splitting on `_`, so every key is
//! a single word.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/stardex/stardex.db?mode=rwc"  # optional, this is the default
//!
//! [github]
//! username = "octocat"
//! token = "ghp_..."                      # or use STARDEX_GITHUB_TOKEN
//! endpoint = "https://api.github.com"    # GitHub Enterprise: https://host/api/v3
//!
//! [fetch]
//! concurrency = 8   # parallel page requests after the first page
//! timeout = 30      # per-request timeout in seconds
//!
//! [search]
//! sort = "relevance"  # relevance | stars | name | updated
//! limit = 50
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use stardex::{DEFAULT_API_URL, SortKey};

const APP_NAME: &str = "stardex";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub fetch: FetchConfig,
    pub search: SearchConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Defaults to `sqlite://<state dir>/stardex.db?mode=rwc` if not specified.
    pub url: Option<String>,
}

/// GitHub configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Whose stars to fetch when `--username` is not given.
    pub username: Option<String>,
    /// GitHub API token.
    pub token: Option<String>,
    /// API base URL.
    pub endpoint: Option<String>,
}

/// Fetch options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum concurrent page requests; 0 fetches all pages at once.
    pub concurrency: usize,
    /// Per-request timeout in seconds.
    pub timeout: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            timeout: 30,
        }
    }
}

/// Search defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub sort: String,
    pub limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            sort: SortKey::Relevance.to_string(),
            limit: 50,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/stardex/config.toml)
    /// 3. Local config file (./stardex.toml)
    /// 4. Environment variables with STARDEX_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("stardex.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./stardex.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., STARDEX_FETCH_CONCURRENCY -> fetch.concurrency
        builder = builder.add_source(environment());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("stardex.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    pub fn api_url(&self) -> String {
        self.github
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout.max(1))
    }

    /// The configured default sort, or relevance if it doesn't parse.
    pub fn default_sort(&self) -> SortKey {
        self.search.sort.parse().unwrap_or_else(|e| {
            tracing::warn!("Ignoring search.sort: {}", e);
            SortKey::Relevance
        })
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/stardex` or `~/.local/state/stardex`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

fn environment() -> Environment {
    Environment::with_prefix("STARDEX")
        .separator("_")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database.url.is_none());
        assert!(config.github.username.is_none());
        assert!(config.github.token.is_none());
        assert_eq!(config.fetch.concurrency, 8);
        assert_eq!(config.fetch.timeout, 30);
        assert_eq!(config.search.limit, 50);
        assert_eq!(config.default_sort(), SortKey::Relevance);
        assert_eq!(config.api_url(), DEFAULT_API_URL);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_full_config_parsing() {
        let config = from_toml(
            r#"
            [database]
            url = "sqlite:///tmp/test.db"

            [github]
            username = "octocat"
            token = "ghp_test123"
            endpoint = "https://ghe.example.com/api/v3"

            [fetch]
            concurrency = 4
            timeout = 10

            [search]
            sort = "stars"
            limit = 20
        "#,
        );

        assert_eq!(config.database.url.as_deref(), Some("sqlite:///tmp/test.db"));
        assert_eq!(config.github.username.as_deref(), Some("octocat"));
        assert_eq!(config.github.token.as_deref(), Some("ghp_test123"));
        assert_eq!(config.api_url(), "https://ghe.example.com/api/v3");
        assert_eq!(config.fetch.concurrency, 4);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.default_sort(), SortKey::Stars);
        assert_eq!(config.search.limit, 20);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = from_toml(
            r#"
            [fetch]
            concurrency = 2
        "#,
        );
        assert_eq!(config.fetch.concurrency, 2);
        assert_eq!(config.fetch.timeout, 30);
        assert_eq!(config.search.limit, 50);
    }

    #[test]
    fn test_invalid_sort_falls_back_to_relevance() {
        let config = from_toml(
            r#"
            [search]
            sort = "popularity"
        "#,
        );
        assert_eq!(config.default_sort(), SortKey::Relevance);
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let config = from_toml(
            r#"
            [fetch]
            timeout = 0
        "#,
        );
        assert_eq!(config.fetch_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_environment_maps_onto_sections() {
        let vars = config::Map::from([
            ("STARDEX_GITHUB_TOKEN".to_string(), "ghp_env".to_string()),
            ("STARDEX_GITHUB_USERNAME".to_string(), "env-user".to_string()),
            ("STARDEX_FETCH_CONCURRENCY".to_string(), "3".to_string()),
            ("STARDEX_DATABASE_URL".to_string(), "sqlite::memory:".to_string()),
        ]);

        let config: Config = ConfigBuilder::builder()
            .add_source(config::File::from_str(
                "[github]\ntoken = \"ghp_file\"",
                FileFormat::Toml,
            ))
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.github.token.as_deref(), Some("ghp_env"));
        assert_eq!(config.github.username.as_deref(), Some("env-user"));
        assert_eq!(config.fetch.concurrency, 3);
        assert_eq!(config.database.url.as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn test_database_url_defaults_to_state_dir() {
        let url = Config::default().database_url().expect("default url");
        assert!(url.starts_with("sqlite://"));
        assert!(url.contains("stardex.db"));
        assert!(url.ends_with("?mode=rwc"));
    }

    #[test]
    fn test_database_url_respects_configured_value() {
        let config = from_toml(
            r#"
            [database]
            url = "sqlite:///var/lib/stardex.db"
        "#,
        );
        assert_eq!(
            config.database_url().as_deref(),
            Some("sqlite:///var/lib/stardex.db")
        );
    }

    #[test]
    fn test_config_invalid_toml() {
        let result = ConfigBuilder::builder()
            .add_source(config::File::from_str("[fetch\nconcurrency = 1", FileFormat::Toml))
            .build();
        assert!(result.is_err());
    }
}
