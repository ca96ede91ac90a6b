//! StarredRepository entity - one cached snapshot per repository id.

use chrono::{DateTime, Utc};
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::Repository;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "starred_repositories")]
pub struct Model {
    /// Platform-wide numeric ID; also the upsert key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub url: String,
    pub language: Option<String>,
    pub star_count: i64,
    /// ISO-8601 string exactly as the API delivered it.
    pub updated_at: String,
    pub owner_login: String,

    /// When this snapshot was written.
    pub cached_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Repository {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            url: model.url,
            language: model.language,
            star_count: u32::try_from(model.star_count.max(0)).unwrap_or(u32::MAX),
            updated_at: model.updated_at,
            owner_login: model.owner_login,
        }
    }
}

impl ActiveModel {
    /// Build a full snapshot row for `repo`, stamped with `cached_at`.
    pub fn from_repository(repo: &Repository, cached_at: DateTime<Utc>) -> Self {
        Self {
            id: Set(repo.id),
            name: Set(repo.name.clone()),
            description: Set(repo.description.clone()),
            url: Set(repo.url.clone()),
            language: Set(repo.language.clone()),
            star_count: Set(i64::from(repo.star_count)),
            updated_at: Set(repo.updated_at.clone()),
            owner_login: Set(repo.owner_login.clone()),
            cached_at: Set(cached_at.fixed_offset()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::repo;

    #[test]
    fn test_model_converts_to_repository() {
        let model = Model {
            id: 7,
            name: "tokio".to_string(),
            description: Some("async runtime".to_string()),
            url: "https://github.com/tokio-rs/tokio".to_string(),
            language: Some("Rust".to_string()),
            star_count: 25_000,
            updated_at: "2024-05-01T10:00:00Z".to_string(),
            owner_login: "tokio-rs".to_string(),
            cached_at: Utc::now().fixed_offset(),
        };

        let repo: Repository = model.into();
        assert_eq!(repo.id, 7);
        assert_eq!(repo.full_name(), "tokio-rs/tokio");
        assert_eq!(repo.star_count, 25_000);
        assert_eq!(repo.language.as_deref(), Some("Rust"));
    }

    #[test]
    fn test_negative_star_count_clamps_to_zero() {
        let model = Model {
            id: 1,
            name: "a".to_string(),
            description: None,
            url: String::new(),
            language: None,
            star_count: -5,
            updated_at: String::new(),
            owner_login: "o".to_string(),
            cached_at: Utc::now().fixed_offset(),
        };
        assert_eq!(Repository::from(model).star_count, 0);
    }

    #[test]
    fn test_active_model_carries_every_field() {
        let mut r = repo(42, "octocat", "hello-world");
        r.star_count = 3;
        let now = Utc::now();
        let active = ActiveModel::from_repository(&r, now);

        assert_eq!(active.id, Set(42));
        assert_eq!(active.star_count, Set(3));
        assert_eq!(active.owner_login, Set("octocat".to_string()));
        assert_eq!(active.cached_at, Set(now.fixed_offset()));
    }
}
