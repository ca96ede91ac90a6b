//! Stardex - fetch, cache and search your GitHub starred repositories.
//!
//! The library fetches every page of a user's starred repositories from the
//! GitHub API (pages after the first concurrently), keeps the snapshots in a
//! SQLite cache and answers fuzzy queries over them offline.
//!
//! # Features
//!
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to automatically run migrations on connection.
//!
//! # Example
//!
//! ```ignore
//! use stardex::{GitHubClient, SortKey, StarSession, StarredFetcher, connect_and_migrate};
//!
//! let db = Arc::new(connect_and_migrate("sqlite://stardex.db?mode=rwc").await?);
//! let client = GitHubClient::with_timeout(Duration::from_secs(30))?;
//! let session = StarSession::new(StarredFetcher::new(client).with_concurrency(8), db);
//!
//! session.load_cached().await;
//! session.refresh("octocat", &token, None).await?;
//! let hits = session.search("async runtime", SortKey::Stars);
//! ```

pub mod cache;
pub mod credentials;
pub mod db;
pub mod entity;
pub mod github;
pub mod http;
pub mod progress;
pub mod search;
pub mod session;
pub mod types;

#[cfg(feature = "migrate")]
pub mod migration;

pub use cache::{CacheError, RepositoryCache, SaveReport};
pub use credentials::CredentialStore;
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use github::{DEFAULT_API_URL, FetchError, GitHubClient, StarredFetcher, StarredPage};
pub use progress::{FetchProgress, ProgressCallback, ProgressState, ProgressTracker};
pub use search::{SearchIndex, SearchOptions, SearchWeights, SortKey};
pub use session::{RefreshOutcome, SessionError, StarSession};
pub use types::{PAGE_SIZE, Repository};
