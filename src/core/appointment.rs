//! Appointment booking and doctor decisions.
//!
//! Patients book appointments, which always start `Pending`. The doctor then
//! accepts or rejects each one exactly once; decided appointments do not
//! change again.

use super::{check, field_error};
use crate::core::ids::IdStrategy;
use crate::models::{Appointment, AppointmentPatch, AppointmentStatus};
use crate::query::{FilterSpec, filtered};
use crate::store::{EntityStore, Record};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, instrument};
use validator::{Validate, ValidationError, ValidationErrors};

/// Oldest accepted patient age.
pub const MAX_AGE: u8 = 120;

/// Raw input from the new-appointment form.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct AppointmentForm {
    /// Patient name
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    /// Age as typed
    pub age: String,
    /// Reason for the visit
    #[validate(length(min = 1, message = "Disease is required"))]
    pub disease: String,
    /// Picked date and time
    pub date: Option<DateTime<Utc>>,
}

fn parse_age(value: &str) -> Result<u8, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(field_error("required", "Age is required"));
    }
    let number: f64 = value
        .parse()
        .map_err(|_| field_error("number", "Age must be a number"))?;
    if number <= 0.0 {
        return Err(field_error("positive", "Age must be a positive number"));
    }
    if number.fract() != 0.0 {
        return Err(field_error("integer", "Age must be an integer"));
    }
    if number > f64::from(MAX_AGE) {
        return Err(field_error("max", "Age must be less than or equal to 120"));
    }
    value
        .parse()
        .map_err(|_| field_error("integer", "Age must be an integer"))
}

fn check_future(
    date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ValidationError> {
    match date {
        None => Err(field_error("required", "Date is required")),
        Some(date) if date > now => Ok(date),
        Some(_) => Err(field_error("future", "No past date allowed")),
    }
}

/// Validates the form against `now` and builds a `Pending` appointment with
/// no id.
pub fn validate_appointment(
    form: &AppointmentForm,
    now: DateTime<Utc>,
) -> Result<Appointment, ValidationErrors> {
    let mut errors = form.validate().err().unwrap_or_else(ValidationErrors::new);
    let age = check(&mut errors, "age", parse_age(&form.age));
    let date = check(&mut errors, "date", check_future(form.date, now));

    if !errors.is_empty() {
        return Err(errors);
    }
    let (Some(age), Some(date)) = (age, date) else {
        return Err(errors);
    };

    Ok(Appointment {
        id: String::new(),
        name: form.name.trim().to_string(),
        age,
        disease: form.disease.trim().to_string(),
        date,
        status: AppointmentStatus::Pending,
        reason: None,
    })
}

/// Result of a doctor decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// The appointment moved to this status
    Applied(AppointmentStatus),
    /// The appointment was already decided; nothing changed
    AlreadyDecided(AppointmentStatus),
    /// No appointment has the id
    Missing,
}

/// Appointment collection. Local only; the whole slice is persisted as one
/// blob.
#[derive(Debug)]
pub struct AppointmentBook {
    store: EntityStore<Appointment>,
}

impl Default for AppointmentBook {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentBook {
    /// Empty book with UUID ids.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: EntityStore::local(IdStrategy::Uuid),
        }
    }

    /// Underlying store, for subscriptions and snapshots.
    #[must_use]
    pub const fn store(&self) -> &EntityStore<Appointment> {
        &self.store
    }

    /// Validates `form` and, only if it passes, adds a `Pending` appointment.
    #[instrument(skip(self, form))]
    pub fn book(
        &self,
        form: &AppointmentForm,
        now: DateTime<Utc>,
    ) -> crate::errors::Result<Appointment> {
        let appointment = validate_appointment(form, now)?;
        let stored = self.store.add(appointment);
        info!(id = %stored.id, "Booked appointment for {}", stored.date);
        Ok(stored)
    }

    /// Accepts a pending appointment.
    pub fn accept(&self, id: &str) -> Decision {
        self.decide(id, AppointmentStatus::Accepted, None)
    }

    /// Rejects a pending appointment with `reason`.
    pub fn reject(&self, id: &str, reason: impl Into<String>) -> Decision {
        self.decide(id, AppointmentStatus::Rejected, Some(reason.into()))
    }

    fn decide(&self, id: &str, status: AppointmentStatus, reason: Option<String>) -> Decision {
        let decision = self
            .store
            .modify(id, |appointment| {
                if appointment.status.is_terminal() {
                    return Decision::AlreadyDecided(appointment.status);
                }
                appointment.merge(AppointmentPatch {
                    status: Some(status),
                    reason,
                });
                Decision::Applied(status)
            })
            .unwrap_or(Decision::Missing);
        info!(id, ?decision, "Doctor decision");
        decision
    }

    /// Appointments on `day` (local calendar), in booking order.
    #[must_use]
    pub fn for_day(&self, day: NaiveDate) -> Vec<Appointment> {
        let slice = self.store.snapshot();
        filtered(&slice.items, &FilterSpec::default().on_day(day))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::failed_fields;
    use crate::errors::{Error, Result};
    use chrono::{Duration, Local, TimeZone};

    fn form(date: Option<DateTime<Utc>>) -> AppointmentForm {
        AppointmentForm {
            name: "Ravi".to_string(),
            age: "34".to_string(),
            disease: "Migraine".to_string(),
            date,
        }
    }

    #[test]
    fn test_booking_starts_pending() -> Result<()> {
        let now = Utc::now();
        let book = AppointmentBook::new();
        let appointment = book.book(&form(Some(now + Duration::days(1))), now)?;
        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert!(!appointment.id.is_empty());
        assert_eq!(book.store().len(), 1);
        Ok(())
    }

    #[test]
    fn test_past_date_rejected_before_store() {
        let now = Utc::now();
        let book = AppointmentBook::new();
        let result = book.book(&form(Some(now - Duration::hours(1))), now);
        let Err(Error::Validation(errors)) = result else {
            panic!("expected validation error, got {result:?}");
        };
        assert_eq!(failed_fields(&errors), vec!["date"]);
        assert!(book.store().is_empty());
    }

    #[test]
    fn test_reject_then_accept_is_noop() -> Result<()> {
        let now = Utc::now();
        let book = AppointmentBook::new();
        let appointment = book.book(&form(Some(now + Duration::days(1))), now)?;

        assert_eq!(
            book.reject(&appointment.id, "unavailable"),
            Decision::Applied(AppointmentStatus::Rejected)
        );
        let after_reject = book.store().snapshot();

        assert_eq!(
            book.accept(&appointment.id),
            Decision::AlreadyDecided(AppointmentStatus::Rejected)
        );
        assert_eq!(book.store().snapshot(), after_reject);

        let stored = book.store().get(&appointment.id).unwrap();
        assert_eq!(stored.status, AppointmentStatus::Rejected);
        assert_eq!(stored.reason.as_deref(), Some("unavailable"));
        Ok(())
    }

    #[test]
    fn test_accept_keeps_reason_empty() -> Result<()> {
        let now = Utc::now();
        let book = AppointmentBook::new();
        let appointment = book.book(&form(Some(now + Duration::days(2))), now)?;
        assert_eq!(
            book.accept(&appointment.id),
            Decision::Applied(AppointmentStatus::Accepted)
        );
        assert_eq!(book.store().get(&appointment.id).unwrap().reason, None);
        assert_eq!(book.accept("nope"), Decision::Missing);
        Ok(())
    }

    #[test]
    fn test_for_day_uses_local_calendar() -> Result<()> {
        let day = Local::now().date_naive() + Duration::days(3);
        let morning = Local
            .from_local_datetime(&day.and_hms_opt(9, 0, 0).unwrap())
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        let next_morning = morning + Duration::days(1);
        let now = Utc::now();

        let book = AppointmentBook::new();
        let first = book.book(&form(Some(morning)), now)?;
        book.book(&form(Some(next_morning)), now)?;
        let second = book.book(&form(Some(morning + Duration::hours(2))), now)?;

        assert_eq!(book.for_day(day), vec![first, second]);
        Ok(())
    }

    #[test]
    fn test_form_rules() {
        let now = Utc::now();
        let errors = validate_appointment(&AppointmentForm::default(), now).unwrap_err();
        assert_eq!(failed_fields(&errors), vec!["age", "date", "disease", "name"]);

        for (age, code) in [
            ("0", "positive"),
            ("2.5", "integer"),
            ("121", "max"),
            ("x", "number"),
        ] {
            let errors = validate_appointment(
                &AppointmentForm {
                    age: age.to_string(),
                    ..form(Some(now + Duration::days(1)))
                },
                now,
            )
            .unwrap_err();
            let field_errors = errors.field_errors();
            assert_eq!(field_errors["age"][0].code, code, "age {age:?}");
        }
    }
}
