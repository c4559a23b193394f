//! Durable mirroring of store slices.
//!
//! At startup each whitelisted key is read back and decoded into the slice's
//! initial state. Afterwards a background task per slice writes the encoded
//! slice on every published change. Writes are fire-and-forget: a failure is
//! logged and the in-memory state carries on regardless.

mod sqlite;

pub use sqlite::SqliteKeyValueStore;

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace, warn};

/// String key-value storage that survives restarts.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Stored value for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, overwriting any prior value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Deletes `key`. Deleting a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Reads and writes whitelisted slices through a [`KeyValueStore`].
#[derive(Clone)]
pub struct PersistenceAdapter {
    storage: Arc<dyn KeyValueStore>,
    whitelist: HashSet<String>,
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("whitelist", &self.whitelist)
            .finish_non_exhaustive()
    }
}

impl PersistenceAdapter {
    /// Adapter persisting only the keys in `whitelist`.
    pub fn new<I, K>(storage: Arc<dyn KeyValueStore>, whitelist: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            storage,
            whitelist: whitelist.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `key` is mirrored to storage.
    #[must_use]
    pub fn is_persisted(&self, key: &str) -> bool {
        self.whitelist.contains(key)
    }

    /// Initial state for `key`.
    ///
    /// Falls back to `S::default()` when the key is not whitelisted, absent,
    /// unreadable, or does not decode.
    #[instrument(skip(self))]
    pub async fn hydrate<S>(&self, key: &str) -> S
    where
        S: DeserializeOwned + Default,
    {
        if !self.is_persisted(key) {
            return S::default();
        }

        let raw = match self.storage.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Nothing stored, starting empty");
                return S::default();
            }
            Err(e) => {
                warn!("Could not read stored state, starting empty: {}", e);
                return S::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Discarding malformed stored state: {}", e);
            S::default()
        })
    }

    /// Encodes and writes `value` under `key`. Failures are logged only.
    pub async fn write<S: Serialize + ?Sized>(&self, key: &str, value: &S) {
        if !self.is_persisted(key) {
            return;
        }
        match serde_json::to_string(value) {
            Ok(encoded) => store_encoded(self.storage.as_ref(), key, &encoded).await,
            Err(e) => error!(key, "Could not encode state: {}", e),
        }
    }

    /// Deletes the stored state for `key`. Failures are logged only.
    pub async fn clear(&self, key: &str) {
        if let Err(e) = self.storage.remove(key).await {
            warn!(key, "Could not clear stored state: {}", e);
        }
    }

    /// Spawns a task writing every value published on `rx` under `key`.
    ///
    /// The value current at the time of the call is treated as already
    /// stored. The task ends once the sender is dropped and the last change
    /// has been written. Returns `None` for keys that are not whitelisted.
    pub fn mirror<V>(&self, key: &str, mut rx: watch::Receiver<V>) -> Option<JoinHandle<()>>
    where
        V: Serialize + Send + Sync + 'static,
    {
        if !self.is_persisted(key) {
            debug!(key, "Not whitelisted, not mirroring");
            return None;
        }

        rx.mark_unchanged();
        let storage = Arc::clone(&self.storage);
        let key = key.to_string();
        Some(tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let encoded = serde_json::to_string(&*rx.borrow_and_update());
                match encoded {
                    Ok(encoded) => store_encoded(storage.as_ref(), &key, &encoded).await,
                    Err(e) => error!(key, "Could not encode state: {}", e),
                }
            }
            trace!(key, "Mirror finished");
        }))
    }
}

async fn store_encoded(storage: &dyn KeyValueStore, key: &str, encoded: &str) {
    match storage.set(key, encoded).await {
        Ok(()) => trace!(key, bytes = encoded.len(), "Wrote state"),
        Err(e) => warn!(key, "Could not write state, durable copy is stale: {}", e),
    }
}
