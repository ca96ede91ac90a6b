//! Persistent cache of starred repository snapshots.
//!
//! One row per repository id. Saving the same id again overwrites the row
//! wholesale; rows are never expired automatically.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryOrder, sea_query::OnConflict,
};
use thiserror::Error;
use tokio::task::JoinSet;

use crate::entity::starred_repository::{ActiveModel, Column, Entity as StarredRepository};
use crate::types::Repository;

/// Errors from the repository cache and the credential store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The database cannot be reached or has no usable schema.
    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String },

    /// Any other database error from sea-orm.
    #[error("Database error: {0}")]
    Database(DbErr),

    /// Some upserts of a save failed; the others were persisted.
    #[error("Cache save partially failed: {succeeded} succeeded, {failed} failed")]
    PartialFailure { succeeded: usize, failed: usize },
}

impl CacheError {
    #[inline]
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }
}

/// Message fragments SQLite uses when the file or schema is unusable.
const UNAVAILABLE_MARKERS: [&str; 5] = [
    "no such table",
    "unable to open database",
    "disk i/o error",
    "readonly database",
    "database is locked",
];

impl From<DbErr> for CacheError {
    fn from(err: DbErr) -> Self {
        let unavailable = match &err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => true,
            other => {
                let message = other.to_string().to_ascii_lowercase();
                UNAVAILABLE_MARKERS.iter().any(|m| message.contains(m))
            }
        };

        if unavailable {
            Self::StorageUnavailable {
                message: err.to_string(),
            }
        } else {
            Self::Database(err)
        }
    }
}

/// Outcome of a fully successful save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
}

/// Repository snapshot store backed by the `starred_repositories` table.
#[derive(Debug, Clone)]
pub struct RepositoryCache {
    db: Arc<DatabaseConnection>,
}

impl RepositoryCache {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Upsert every repository by id, stamping them with the current time.
    ///
    /// The upserts run concurrently and independently; this waits for all of
    /// them. If any failed, the rest are still persisted and
    /// [`CacheError::PartialFailure`] reports the split. When nothing could be
    /// written because the storage itself is unusable, the underlying
    /// [`CacheError::StorageUnavailable`] is returned instead.
    pub async fn save_all(&self, repos: &[Repository]) -> Result<SaveReport, CacheError> {
        if repos.is_empty() {
            return Ok(SaveReport::default());
        }

        let cached_at = Utc::now();
        let mut join_set = JoinSet::new();
        for repo in repos {
            let db = Arc::clone(&self.db);
            let id = repo.id;
            let model = ActiveModel::from_repository(repo, cached_at);
            join_set.spawn(async move { (id, upsert(&db, model).await) });
        }

        let mut succeeded = 0usize;
        let mut failed = 0usize;
        let mut unavailable: Option<CacheError> = None;

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => succeeded += 1,
                Ok((id, Err(e))) => {
                    failed += 1;
                    let err = CacheError::from(e);
                    tracing::debug!(id, error = %err, "Failed to cache repository");
                    if err.is_storage_unavailable() && unavailable.is_none() {
                        unavailable = Some(err);
                    }
                }
                Err(e) => {
                    failed += 1;
                    tracing::debug!(error = %e, "Cache upsert task failed");
                }
            }
        }

        if failed == 0 {
            tracing::debug!(saved = succeeded, "Cached repositories");
            return Ok(SaveReport { saved: succeeded });
        }

        tracing::warn!(succeeded, failed, "Some repositories could not be cached");
        match unavailable {
            Some(err) if succeeded == 0 => Err(err),
            _ => Err(CacheError::PartialFailure { succeeded, failed }),
        }
    }

    /// Every cached repository, in ascending id order.
    pub async fn load_all(&self) -> Result<Vec<Repository>, CacheError> {
        let models = StarredRepository::find()
            .order_by_asc(Column::Id)
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Repository::from).collect())
    }

    pub async fn count(&self) -> Result<u64, CacheError> {
        Ok(StarredRepository::find().count(self.db.as_ref()).await?)
    }

    /// Remove every cached repository, returning how many rows were deleted.
    pub async fn clear(&self) -> Result<u64, CacheError> {
        let result = StarredRepository::delete_many().exec(self.db.as_ref()).await?;
        tracing::info!(deleted = result.rows_affected, "Cleared repository cache");
        Ok(result.rows_affected)
    }
}

fn upsert_on_conflict() -> OnConflict {
    OnConflict::column(Column::Id)
        .update_columns([
            Column::Name,
            Column::Description,
            Column::Url,
            Column::Language,
            Column::StarCount,
            Column::UpdatedAt,
            Column::OwnerLogin,
            Column::CachedAt,
        ])
        .to_owned()
}

async fn upsert(db: &DatabaseConnection, model: ActiveModel) -> Result<(), DbErr> {
    StarredRepository::insert(model)
        .on_conflict(upsert_on_conflict())
        .exec_without_returning(db)
        .await?;
    Ok(())
}
