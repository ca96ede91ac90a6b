//! Core value types shared by the fetch engine, the cache and the search index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of repositories requested per page; also the unit progress is
/// reported in.
pub const PAGE_SIZE: u32 = 100;

/// A starred repository snapshot as returned by the API.
///
/// `id` is the identity key: a later snapshot with the same id replaces the
/// earlier one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Platform-wide numeric ID.
    pub id: i64,
    /// Repository name.
    pub name: String,
    /// Repository description.
    pub description: Option<String>,
    /// Canonical web link.
    pub url: String,
    /// Primary programming language.
    pub language: Option<String>,
    /// Stargazer count.
    pub star_count: u32,
    /// Last update time, ISO-8601 as delivered by the API.
    pub updated_at: String,
    /// Owner login (user or organization).
    pub owner_login: String,
}

impl Repository {
    /// Get the full name (owner/name).
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner_login, self.name)
    }

    /// Parse `updated_at`, returning `None` for malformed timestamps.
    #[must_use]
    pub fn updated_at_parsed(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.updated_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
