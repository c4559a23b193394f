//! SeaORM-backed [`KeyValueStore`].

use super::KeyValueStore;
use crate::entities::{StorageEntry, storage_entry};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use tracing::{debug, instrument};

/// Key-value rows in the `storage_entries` table.
#[derive(Clone, Debug)]
pub struct SqliteKeyValueStore {
    db: DatabaseConnection,
}

impl SqliteKeyValueStore {
    /// Wraps an open connection. Tables must already exist.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = StorageEntry::find()
            .filter(storage_entry::Column::Key.eq(key))
            .one(&self.db)
            .await?;
        Ok(entry.map(|entry| entry.value))
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().naive_utc();

        let existing = StorageEntry::find()
            .filter(storage_entry::Column::Key.eq(key))
            .one(&self.db)
            .await?;

        if let Some(entry) = existing {
            let mut active_model: storage_entry::ActiveModel = entry.into();
            active_model.value = Set(value.to_string());
            active_model.updated_at = Set(now);
            active_model.update(&self.db).await?;
        } else {
            let new_entry = storage_entry::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value.to_string()),
                updated_at: Set(now),
                ..Default::default()
            };
            new_entry.insert(&self.db).await?;
        }

        debug!("Stored {} bytes", value.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> Result<()> {
        let result = StorageEntry::delete_many()
            .filter(storage_entry::Column::Key.eq(key))
            .exec(&self.db)
            .await?;
        debug!("Removed {} rows", result.rows_affected);
        Ok(())
    }
}
