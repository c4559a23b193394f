//! Generic CRUD store with remote synchronisation.
//!
//! Local mutations (`add`, `update`, `remove`) complete synchronously. The
//! `sync_*` and `fetch_all` variants call the remote collection first and only
//! touch local state once the server has answered; failures are recorded on
//! the slice and leave `items` untouched.
//!
//! Remote calls for the same id may complete out of order. Each `sync_update`
//! and `sync_remove` takes a ticket for its id, and a response is applied only
//! if its ticket is still the latest one issued for that id. Responses that
//! lose the race are logged and dropped.

use super::{Mutation, Operation, Record, Slice, Status};
use crate::core::ids::IdStrategy;
use crate::remote::{RemoteCollection, RemoteError, RemoteResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Canonical in-memory collection for one entity type.
pub struct EntityStore<T: Record> {
    state: watch::Sender<Slice<T>>,
    remote: Option<Arc<dyn RemoteCollection<T>>>,
    ids: IdStrategy,
    tickets: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
    latest_fetch: AtomicU64,
}

impl<T: Record> std::fmt::Debug for EntityStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("collection", &T::COLLECTION)
            .field("remote", &self.remote.is_some())
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

impl<T: Record> EntityStore<T> {
    /// Store with no remote backing. `sync_*` and `fetch_all` fail with
    /// [`RemoteError::Unconfigured`].
    #[must_use]
    pub fn local(ids: IdStrategy) -> Self {
        Self::build(ids, None)
    }

    /// Store backed by a remote collection.
    #[must_use]
    pub fn remote(ids: IdStrategy, remote: Arc<dyn RemoteCollection<T>>) -> Self {
        Self::build(ids, Some(remote))
    }

    fn build(ids: IdStrategy, remote: Option<Arc<dyn RemoteCollection<T>>>) -> Self {
        let (state, _) = watch::channel(Slice::default());
        Self {
            state,
            remote,
            ids,
            tickets: AtomicU64::new(0),
            latest: Mutex::new(HashMap::new()),
            latest_fetch: AtomicU64::new(0),
        }
    }

    /// Whether a remote collection is configured.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Replaces the whole slice, typically with state rehydrated at startup.
    pub fn hydrate(&self, slice: Slice<T>) {
        let slice = slice.settled();
        debug!(
            collection = T::COLLECTION,
            "Hydrating slice with {} records",
            slice.items.len()
        );
        self.state.send_replace(slice);
    }

    /// Receiver notified after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Slice<T>> {
        self.state.subscribe()
    }

    /// Copy of the current slice.
    #[must_use]
    pub fn snapshot(&self) -> Slice<T> {
        self.state.borrow().clone()
    }

    /// Copy of the current records.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.state.borrow().items.clone()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> Status {
        self.state.borrow().status
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().items.len()
    }

    /// True if the collection holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First record with `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<T> {
        self.state
            .borrow()
            .items
            .iter()
            .find(|record| record.id() == id)
            .cloned()
    }

    /// Appends `record`, assigning an id first if it has none.
    ///
    /// Duplicate ids are not rejected; lookups return the first match.
    pub fn add(&self, mut record: T) -> T {
        if record.id().is_empty() {
            record.assign_id(self.ids.next_id());
        }
        let stored = record.clone();
        self.state.send_modify(|slice| slice.items.push(record));
        debug!(collection = T::COLLECTION, id = stored.id(), "Added record");
        stored
    }

    /// Merges `patch` into the first record with `id`.
    pub fn update(&self, id: &str, patch: T::Patch) -> Mutation {
        let mutation = self
            .modify(id, |record| record.merge(patch))
            .map_or(Mutation::Missing, |()| Mutation::Applied);
        if mutation == Mutation::Missing {
            debug!(collection = T::COLLECTION, id, "Update ignored, no such record");
        }
        mutation
    }

    /// Runs `f` against the first record with `id`. Subscribers are notified
    /// only if the record actually changed. Returns `None` if no record has
    /// the id.
    pub fn modify<R>(&self, id: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut outcome = None;
        self.state.send_if_modified(|slice| {
            let Some(record) = slice.items.iter_mut().find(|record| record.id() == id) else {
                return false;
            };
            let before = record.clone();
            outcome = Some(f(record));
            *record != before
        });
        outcome
    }

    /// Drops every record with `id`. Removing a missing id is a no-op.
    pub fn remove(&self, id: &str) -> Mutation {
        let removed = self.state.send_if_modified(|slice| {
            let before = slice.items.len();
            slice.items.retain(|record| record.id() != id);
            slice.items.len() != before
        });
        if removed {
            debug!(collection = T::COLLECTION, id, "Removed record");
            Mutation::Applied
        } else {
            Mutation::Missing
        }
    }

    /// Replaces the collection with the server's list.
    ///
    /// On failure the previous records are kept and the error is recorded on
    /// the slice. Returns the number of records received.
    #[instrument(skip(self), fields(collection = T::COLLECTION))]
    pub async fn fetch_all(&self) -> RemoteResult<usize> {
        let remote = self.remote_for(Operation::Fetch)?;
        let ticket = self.latest_fetch.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|slice| slice.status = Status::Loading);

        let result = remote.list().await;
        if self.latest_fetch.load(Ordering::SeqCst) != ticket {
            debug!("Newer fetch in flight, dropping this response");
            return result.map(|items| items.len());
        }

        match result {
            Ok(items) => {
                let count = items.len();
                self.state.send_modify(|slice| {
                    slice.items = items;
                    slice.record_success(Operation::Fetch);
                });
                info!("Fetched {} records", count);
                Ok(count)
            }
            Err(err) => {
                self.record_failure(Operation::Fetch, &err);
                Err(err)
            }
        }
    }

    /// Creates `record` remotely and appends the server's representation.
    #[instrument(skip(self, record), fields(collection = T::COLLECTION))]
    pub async fn sync_add(&self, record: T) -> RemoteResult<T> {
        let remote = self.remote_for(Operation::Add)?;
        match remote.create(&record).await {
            Ok(created) => {
                let stored = created.clone();
                self.state.send_modify(|slice| {
                    slice.items.push(created);
                    slice.record_success(Operation::Add);
                });
                info!(id = stored.id(), "Created record");
                Ok(stored)
            }
            Err(err) => {
                self.record_failure(Operation::Add, &err);
                Err(err)
            }
        }
    }

    /// Sends `patch` for `id` and replaces the local record with the server's
    /// representation. A record removed locally in the meantime stays removed.
    #[instrument(skip(self, patch), fields(collection = T::COLLECTION))]
    pub async fn sync_update(&self, id: &str, patch: T::Patch) -> RemoteResult<T> {
        let remote = self.remote_for(Operation::Update)?;
        let ticket = self.issue_ticket(id);
        let result = remote.replace(id, &patch).await;
        if !self.settle_ticket(id, ticket) {
            warn!(id, "Dropping stale update response");
            return result;
        }

        match result {
            Ok(updated) => {
                let stored = updated.clone();
                self.state.send_modify(|slice| {
                    if let Some(record) = slice.items.iter_mut().find(|record| record.id() == id) {
                        *record = updated;
                    }
                    slice.record_success(Operation::Update);
                });
                info!(id, "Updated record");
                Ok(stored)
            }
            Err(err) => {
                self.record_failure(Operation::Update, &err);
                Err(err)
            }
        }
    }

    /// Deletes `id` remotely, then locally.
    #[instrument(skip(self), fields(collection = T::COLLECTION))]
    pub async fn sync_remove(&self, id: &str) -> RemoteResult<()> {
        let remote = self.remote_for(Operation::Remove)?;
        let ticket = self.issue_ticket(id);
        let result = remote.delete(id).await;
        if !self.settle_ticket(id, ticket) {
            warn!(id, "Dropping stale delete response");
            return result;
        }

        match result {
            Ok(()) => {
                self.state.send_modify(|slice| {
                    slice.items.retain(|record| record.id() != id);
                    slice.record_success(Operation::Remove);
                });
                info!(id, "Deleted record");
                Ok(())
            }
            Err(err) => {
                self.record_failure(Operation::Remove, &err);
                Err(err)
            }
        }
    }

    fn remote_for(&self, operation: Operation) -> RemoteResult<Arc<dyn RemoteCollection<T>>> {
        self.remote.clone().ok_or_else(|| {
            let err = RemoteError::Unconfigured {
                collection: T::COLLECTION,
            };
            self.record_failure(operation, &err);
            err
        })
    }

    fn record_failure(&self, operation: Operation, err: &RemoteError) {
        warn!(
            collection = T::COLLECTION,
            ?operation,
            "Remote operation failed: {}",
            err
        );
        self.state
            .send_modify(|slice| slice.record_failure(operation, err.to_string()));
    }

    fn issue_ticket(&self, id: &str) -> u64 {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), ticket);
        ticket
    }

    /// True if `ticket` is still the latest for `id`; the entry is released
    /// when it is.
    fn settle_ticket(&self, id: &str, ticket: u64) -> bool {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if latest.get(id) == Some(&ticket) {
            latest.remove(id);
            true
        } else {
            false
        }
    }
}
