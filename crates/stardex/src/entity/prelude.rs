//! Common re-exports for convenient entity usage.

pub use super::setting::{
    ActiveModel as SettingActiveModel, Column as SettingColumn, Entity as Setting,
    Model as SettingModel,
};
pub use super::starred_repository::{
    ActiveModel as StarredRepositoryActiveModel, Column as StarredRepositoryColumn,
    Entity as StarredRepository, Model as StarredRepositoryModel,
};
