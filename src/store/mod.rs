//! In-memory entity store.
//!
//! Every entity type gets one [`EntityStore`], which owns its [`Slice`] and
//! publishes each new snapshot to subscribers.

mod entity_store;

pub use entity_store::EntityStore;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Debug;

/// A record that can live in an [`EntityStore`].
pub trait Record:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Partial update accepted by [`EntityStore::update`] and sent as the
    /// body of a remote replace.
    type Patch: Clone + Debug + Serialize + Send + Sync;

    /// Collection name used in logs and error messages.
    const COLLECTION: &'static str;

    /// Identity; empty while unassigned.
    fn id(&self) -> &str;

    /// Sets the identity.
    fn assign_id(&mut self, id: String);

    /// Merges `patch` into `self`. Fields absent from the patch are kept.
    fn merge(&mut self, patch: Self::Patch);
}

/// Lifecycle of a slice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Nothing in flight, last operation succeeded
    #[default]
    Idle,
    /// A fetch is in flight; `items` may be stale
    Loading,
    /// The last remote operation of some kind failed
    Error,
}

/// Kind of remote operation, recorded alongside a failure so only a later
/// success of the same kind clears it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// `fetch_all`
    Fetch,
    /// `sync_add`
    Add,
    /// `sync_update`
    Update,
    /// `sync_remove`
    Remove,
}

/// Read contract exposed to the presentation layer.
///
/// Serializes as `{items, status, error}` with `error` a message or `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slice<T> {
    /// Records in insertion (or server) order
    pub items: Vec<T>,
    /// Current status
    #[serde(default)]
    pub status: Status,
    /// Message of the last unresolved failure
    #[serde(default)]
    pub error: Option<String>,
    /// Kind of operation that produced `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_operation: Option<Operation>,
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Self::with_items(Vec::new())
    }
}

impl<T> Slice<T> {
    /// Slice holding `items` with no pending work.
    #[must_use]
    pub const fn with_items(items: Vec<T>) -> Self {
        Self {
            items,
            status: Status::Idle,
            error: None,
            error_operation: None,
        }
    }

    /// True while a fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }

    /// The slice as it should look right after a restart: nothing is in
    /// flight and failures of the previous session are forgotten.
    #[must_use]
    pub fn settled(mut self) -> Self {
        self.status = Status::Idle;
        self.error = None;
        self.error_operation = None;
        self
    }

    fn resting_status(&self) -> Status {
        if self.error.is_some() {
            Status::Error
        } else {
            Status::Idle
        }
    }

    /// Only a fetch may end `Loading`; other operations finishing meanwhile
    /// leave the status to it.
    fn settle_status(&mut self, operation: Operation) {
        if operation == Operation::Fetch || self.status != Status::Loading {
            self.status = self.resting_status();
        }
    }

    pub(crate) fn record_failure(&mut self, operation: Operation, message: String) {
        self.error = Some(message);
        self.error_operation = Some(operation);
        self.settle_status(operation);
    }

    pub(crate) fn record_success(&mut self, operation: Operation) {
        if self.error_operation == Some(operation) {
            self.error = None;
            self.error_operation = None;
        }
        self.settle_status(operation);
    }
}

/// Outcome of a local mutation addressed by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// A record with the id existed and was changed
    Applied,
    /// No record had the id; the collection is unchanged
    Missing,
}

impl Mutation {
    /// True if the record was found.
    #[must_use]
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}
