//! GitHub API access for a user's starred repositories.
//!
//! # Module Structure
//!
//! - [`error`] - Failure classification for the starred endpoint
//! - [`types`] - Wire shapes of the API responses
//! - [`client`] - Single-page fetcher with auth headers and status mapping
//! - [`pagination`] - Page count discovery from the `Link` header
//! - [`starred`] - Complete multi-page fetch with progress
//! - [`convert`] - Wire record to [`Repository`](crate::Repository) conversion
//!
//! ```ignore
//! use stardex::github::{GitHubClient, StarredFetcher};
//!
//! let client = GitHubClient::with_timeout(Duration::from_secs(30))?;
//! let repos = StarredFetcher::new(client)
//!     .with_concurrency(8)
//!     .fetch_all("octocat", &token, None)
//!     .await?;
//! ```

pub mod client;
pub mod convert;
pub mod error;
pub mod pagination;
pub mod starred;
pub mod types;

pub use client::{DEFAULT_API_URL, GitHubClient, StarredPage};
pub use convert::to_repository;
pub use error::FetchError;
pub use pagination::{LinkPagination, parse_link_header, total_pages};
pub use starred::{MAX_PAGES, StarredFetcher};
