//! Saved GitHub username and token, kept in the `settings` table.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{DatabaseConnection, EntityTrait, Set, sea_query::OnConflict};

use crate::cache::CacheError;
use crate::entity::setting::{ActiveModel, Column, Entity as Setting};

const USERNAME: &str = "username";
const TOKEN: &str = "token";

/// Read/write access to the saved credentials.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    db: Arc<DatabaseConnection>,
}

impl CredentialStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn username(&self) -> Result<Option<String>, CacheError> {
        self.get(USERNAME).await
    }

    pub async fn token(&self) -> Result<Option<String>, CacheError> {
        self.get(TOKEN).await
    }

    pub async fn save_username(&self, username: &str) -> Result<(), CacheError> {
        self.set(USERNAME, username).await
    }

    pub async fn save_token(&self, token: &str) -> Result<(), CacheError> {
        self.set(TOKEN, token).await
    }

    /// A stored blank value reads back as `None`.
    async fn get(&self, name: &str) -> Result<Option<String>, CacheError> {
        let setting = Setting::find_by_id(name.to_string()).one(self.db.as_ref()).await?;
        Ok(setting
            .map(|s| s.value)
            .filter(|value| !value.trim().is_empty()))
    }

    async fn set(&self, name: &str, value: &str) -> Result<(), CacheError> {
        let model = ActiveModel {
            name: Set(name.to_string()),
            value: Set(value.to_string()),
            saved_at: Set(Utc::now().fixed_offset()),
        };

        Setting::insert(model)
            .on_conflict(
                OnConflict::column(Column::Name)
                    .update_columns([Column::Value, Column::SavedAt])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        tracing::debug!(setting = name, "Saved setting");
        Ok(())
    }
}
