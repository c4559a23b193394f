//! Doctor/patient appointment record.

use crate::query::Filterable;
use crate::store::Record;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Review state of an appointment.
///
/// `Accepted` and `Rejected` are terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    /// Waiting for the doctor
    #[default]
    Pending,
    /// Confirmed by the doctor
    Accepted,
    /// Declined by the doctor, usually with a reason
    Rejected,
}

impl AppointmentStatus {
    /// Label used in JSON and on the appointment card.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }

    /// True once the doctor has decided.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }
}

/// Appointment requested by a patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    /// Client-generated unique token
    #[serde(default, deserialize_with = "super::flexible_id")]
    pub id: String,
    /// Patient name
    pub name: String,
    /// Patient age in years
    pub age: u8,
    /// Reason for the visit
    pub disease: String,
    /// Requested date and time
    pub date: DateTime<Utc>,
    /// Review state
    #[serde(default)]
    pub status: AppointmentStatus,
    /// Rejection reason, only set on rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Appointment {
    /// Calendar day of the appointment in the device's local time zone.
    #[must_use]
    pub fn local_day(&self) -> NaiveDate {
        self.date.with_timezone(&Local).date_naive()
    }
}

/// Partial appointment update.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPatch {
    /// New review state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    /// New rejection reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Record for Appointment {
    type Patch = AppointmentPatch;
    const COLLECTION: &'static str = "appointments";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn merge(&mut self, patch: AppointmentPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if patch.reason.is_some() {
            self.reason = patch.reason;
        }
    }
}

impl Filterable for Appointment {
    fn text_field(&self) -> &str {
        &self.name
    }

    fn category_field(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn date_field(&self) -> Option<NaiveDate> {
        Some(self.local_day())
    }
}
