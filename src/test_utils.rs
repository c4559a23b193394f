//! Shared test utilities for `crewdesk`.
//!
//! In-memory storage, a scriptable remote collection, and record fixtures
//! with sensible defaults.

use crate::{
    errors::{Error, Result},
    models::{Employee, EmployeeStatus, Expense, ExpenseKind},
    persistence::KeyValueStore,
    remote::{ErrorBody, RemoteCollection, RemoteError, RemoteResult},
    store::Record,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use std::sync::{Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once; later calls are ignored.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = crate::config::database::create_connection("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Employee with no id, joined on 2024-01-15.
///
/// # Defaults
/// * email: derived from the name
/// * phone: "9876543210"
/// * salary: 50000
pub fn sample_employee(name: &str, department: &str, status: EmployeeStatus) -> Employee {
    Employee {
        id: String::new(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        phone: "9876543210".to_string(),
        department: department.to_string(),
        designation: "Associate".to_string(),
        joining_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default(),
        salary: 50_000,
        employee_id: format!("EMP-{}", name.len()),
        status,
        profile_picture: None,
    }
}

/// Expense entry in the "General" category.
pub fn sample_expense(id: &str, employee_id: &str, amount: f64, kind: ExpenseKind) -> Expense {
    Expense {
        id: id.to_string(),
        employee_id: employee_id.to_string(),
        category: "General".to_string(),
        amount,
        kind,
    }
}

#[derive(Clone, Debug)]
enum Failure {
    Transport(String),
    Status(u16, String),
}

impl Failure {
    fn to_error(&self) -> RemoteError {
        match self {
            Self::Transport(message) => RemoteError::Transport {
                message: message.clone(),
            },
            Self::Status(status, body) => RemoteError::Status {
                status: *status,
                body: ErrorBody::from_text(body.clone()),
            },
        }
    }
}

#[derive(Debug)]
struct FakeState<T> {
    records: Vec<T>,
    next_id: u64,
    failure: Option<Failure>,
    gate: Option<oneshot::Receiver<()>>,
}

/// In-memory [`RemoteCollection`] behaving like the mock REST backend.
///
/// Ids are assigned sequentially on create. A configured failure applies to
/// every call until [`FakeCollection::recover`].
#[derive(Debug)]
pub struct FakeCollection<T> {
    state: Mutex<FakeState<T>>,
}

impl<T> Default for FakeCollection<T> {
    fn default() -> Self {
        Self::with_records(Vec::new())
    }
}

impl<T> FakeCollection<T> {
    /// Server already holding `records`.
    pub fn with_records(records: Vec<T>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: records.len() as u64 + 100,
                records,
                failure: None,
                gate: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every following call fails as if the network were down.
    pub fn fail_with_transport(&self, message: &str) {
        self.lock().failure = Some(Failure::Transport(message.to_string()));
    }

    /// Every following call answers `status` with `body`.
    pub fn fail_with_status(&self, status: u16, body: &str) {
        self.lock().failure = Some(Failure::Status(status, body.to_string()));
    }

    /// Clears a configured failure.
    pub fn recover(&self) {
        self.lock().failure = None;
    }

    /// The next call applies its change on the server immediately but does
    /// not answer until the returned sender fires (or is dropped).
    pub fn hold_next_response(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.lock().gate = Some(rx);
        tx
    }
}

impl<T: Clone> FakeCollection<T> {
    /// Current server-side records.
    pub fn records(&self) -> Vec<T> {
        self.lock().records.clone()
    }
}

impl<T: Record> FakeCollection<T> {
    async fn respond<R>(
        &self,
        apply: impl FnOnce(&mut FakeState<T>) -> RemoteResult<R> + Send,
    ) -> RemoteResult<R> {
        let (result, gate) = {
            let mut state = self.lock();
            let result = if let Some(failure) = state.failure.clone() {
                Err(failure.to_error())
            } else {
                apply(&mut state)
            };
            (result, state.gate.take())
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        result
    }
}

fn not_found() -> RemoteError {
    RemoteError::Status {
        status: 404,
        body: ErrorBody::from_text("\"Not found\"".to_string()),
    }
}

#[async_trait]
impl<T: Record> RemoteCollection<T> for FakeCollection<T> {
    async fn list(&self) -> RemoteResult<Vec<T>> {
        self.respond(|state| Ok(state.records.clone())).await
    }

    async fn create(&self, record: &T) -> RemoteResult<T> {
        let mut created = record.clone();
        self.respond(move |state| {
            state.next_id += 1;
            created.assign_id(state.next_id.to_string());
            state.records.push(created.clone());
            Ok(created)
        })
        .await
    }

    async fn replace(&self, id: &str, patch: &T::Patch) -> RemoteResult<T> {
        let patch = patch.clone();
        self.respond(move |state| {
            let record = state
                .records
                .iter_mut()
                .find(|record| record.id() == id)
                .ok_or_else(not_found)?;
            record.merge(patch);
            Ok(record.clone())
        })
        .await
    }

    async fn delete(&self, id: &str) -> RemoteResult<()> {
        self.respond(|state| {
            let before = state.records.len();
            state.records.retain(|record| record.id() != id);
            if state.records.len() == before {
                Err(not_found())
            } else {
                Ok(())
            }
        })
        .await
    }
}

/// Storage whose every call fails, for exercising write-failure paths.
#[derive(Debug, Clone, Copy)]
pub struct FailingStorage;

fn storage_full() -> Error {
    Error::Io(std::io::Error::other("storage full"))
}

#[async_trait]
impl KeyValueStore for FailingStorage {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(storage_full())
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(storage_full())
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Err(storage_full())
    }
}
