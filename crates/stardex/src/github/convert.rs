//! Conversion from GitHub API payloads to [`Repository`] snapshots.

use crate::types::Repository;

use super::types::StarredRepoResponse;

/// Convert a starred-repository payload to a [`Repository`].
pub fn to_repository(repo: StarredRepoResponse) -> Repository {
    Repository {
        id: repo.id,
        name: repo.name,
        description: repo.description,
        url: repo.html_url,
        language: repo.language,
        star_count: repo.stargazers_count,
        updated_at: repo.updated_at,
        owner_login: repo.owner.login,
    }
}
