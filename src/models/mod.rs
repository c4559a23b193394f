//! Domain records held by the entity stores.
//!
//! Field names serialize in camelCase so the JSON matches what the remote
//! collections and previously persisted slices use.

mod appointment;
mod employee;
mod expense;

pub use appointment::{Appointment, AppointmentPatch, AppointmentStatus};
pub use employee::{Employee, EmployeePatch, EmployeeStatus};
pub use expense::{Expense, ExpenseKind, ExpensePatch};

use serde::{Deserialize, Deserializer};

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field
/// (`None`, via `#[serde(default)]`).
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Accepts ids written either as JSON strings or numbers.
///
/// Locally created employees historically carried millisecond timestamps as
/// numeric ids, while the remote collections return strings.
pub(crate) fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Integer(number) => number.to_string(),
    })
}
