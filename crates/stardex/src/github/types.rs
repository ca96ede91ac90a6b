//! GitHub API data types.
//!
//! Only the fields the cache and the search index use are decoded; everything
//! else in the payload is ignored.

use serde::Deserialize;

/// A repository entry from `GET /users/{user}/starred`.
#[derive(Debug, Clone, Deserialize)]
pub struct StarredRepoResponse {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    pub updated_at: String,
    pub owner: OwnerResponse,
}

/// The `owner` object nested in a repository payload.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnerResponse {
    pub login: String,
}

/// Error body returned on 4xx/5xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default)]
    pub documentation_url: Option<String>,
}
