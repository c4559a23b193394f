//! Business rules - framework-agnostic validation and per-entity operations.
//!
//! Each `validate_*` function takes raw form input and returns either a
//! ready-to-store record or the full list of field errors. Nothing here
//! touches a store until validation has passed.

/// Appointment booking, validation, and doctor decisions
pub mod appointment;
/// Great-circle distance for the map screen
pub mod distance;
/// Employee form validation
pub mod employee;
/// Expense form validation and per-employee totals
pub mod expense;
/// Local id generation
pub mod ids;

use std::borrow::Cow;
use validator::{ValidationError, ValidationErrors};

/// Builds a field error with a user-facing message.
pub(crate) fn field_error(
    code: &'static str,
    message: impl Into<Cow<'static, str>>,
) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Records the error of a parse step, keeping the value on success.
pub(crate) fn check<T>(
    errors: &mut ValidationErrors,
    field: &'static str,
    parsed: Result<T, ValidationError>,
) -> Option<T> {
    match parsed {
        Ok(value) => Some(value),
        Err(error) => {
            errors.add(field, error);
            None
        }
    }
}

/// Names of the fields that failed, sorted.
#[must_use]
pub fn failed_fields(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(ToString::to_string)
        .collect();
    fields.sort();
    fields
}
