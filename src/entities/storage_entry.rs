//! Storage entry entity - one row per persisted slice.
//!
//! The value is the JSON encoding of the slice. There is no schema version;
//! a payload that no longer decodes is treated as absent.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Durable key-value row
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "storage_entries")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Slice key (e.g., `"employees-root"`)
    #[sea_orm(unique)]
    pub key: String,
    /// Encoded slice
    pub value: String,
    /// When the value was last written
    pub updated_at: DateTime,
}

/// `StorageEntry` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
