//! Initial migration: the repository cache and the settings store.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_starred_repositories(manager).await?;
        self.create_settings(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settings::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(StarredRepositories::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_starred_repositories(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StarredRepositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StarredRepositories::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StarredRepositories::Name).string().not_null())
                    .col(ColumnDef::new(StarredRepositories::Description).text().null())
                    .col(ColumnDef::new(StarredRepositories::Url).text().not_null())
                    .col(ColumnDef::new(StarredRepositories::Language).string().null())
                    .col(
                        ColumnDef::new(StarredRepositories::StarCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(StarredRepositories::UpdatedAt)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StarredRepositories::OwnerLogin)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StarredRepositories::CachedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_starred_repositories_owner")
                    .table(StarredRepositories::Table)
                    .col(StarredRepositories::OwnerLogin)
                    .to_owned(),
            )
            .await
    }

    async fn create_settings(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settings::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settings::Value).text().not_null())
                    .col(
                        ColumnDef::new(Settings::SavedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum StarredRepositories {
    Table,
    Id,
    Name,
    Description,
    Url,
    Language,
    StarCount,
    UpdatedAt,
    OwnerLogin,
    CachedAt,
}

#[derive(DeriveIden)]
enum Settings {
    Table,
    Name,
    Value,
    SavedAt,
}
