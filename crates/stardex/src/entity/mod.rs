//! SeaORM entity definitions for the stardex database schema.

pub mod prelude;
pub mod setting;
pub mod starred_repository;
