//! Employee directory record.

use crate::query::Filterable;
use crate::store::Record;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Employment status shown on the directory card.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmployeeStatus {
    /// Currently employed
    #[default]
    Active,
    /// Left or suspended
    Inactive,
}

impl EmployeeStatus {
    /// Label used in forms and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }

    /// Parses a form label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "Active" => Some(Self::Active),
            "Inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    /// True for [`EmployeeStatus::Active`].
    #[must_use]
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

/// Employee profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Store identity (timestamp-derived locally, server-assigned remotely)
    #[serde(
        default,
        deserialize_with = "super::flexible_id",
        skip_serializing_if = "String::is_empty"
    )]
    pub id: String,
    /// Full name
    pub name: String,
    /// Work email
    pub email: String,
    /// Ten-digit phone number
    pub phone: String,
    /// Department, e.g. "HR" or "Engineering"
    pub department: String,
    /// Job title
    pub designation: String,
    /// First working day
    pub joining_date: NaiveDate,
    /// Salary in whole currency units
    pub salary: u64,
    /// Company-issued employee number; distinct from `id`
    pub employee_id: String,
    /// Active or inactive
    pub status: EmployeeStatus,
    /// Local URI of the profile image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// Partial employee update. `None` fields are left alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct EmployeePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joining_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EmployeeStatus>,
    /// `Some(None)` clears the picture; sent as `null`
    #[serde(
        default,
        deserialize_with = "super::present",
        skip_serializing_if = "Option::is_none"
    )]
    pub profile_picture: Option<Option<String>>,
}

impl From<Employee> for EmployeePatch {
    /// Full-replacement patch, as produced by the edit form.
    fn from(employee: Employee) -> Self {
        Self {
            name: Some(employee.name),
            email: Some(employee.email),
            phone: Some(employee.phone),
            department: Some(employee.department),
            designation: Some(employee.designation),
            joining_date: Some(employee.joining_date),
            salary: Some(employee.salary),
            employee_id: Some(employee.employee_id),
            status: Some(employee.status),
            profile_picture: Some(employee.profile_picture),
        }
    }
}

impl Record for Employee {
    type Patch = EmployeePatch;
    const COLLECTION: &'static str = "employees";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn merge(&mut self, patch: EmployeePatch) {
        let EmployeePatch {
            name,
            email,
            phone,
            department,
            designation,
            joining_date,
            salary,
            employee_id,
            status,
            profile_picture,
        } = patch;
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if let Some(phone) = phone {
            self.phone = phone;
        }
        if let Some(department) = department {
            self.department = department;
        }
        if let Some(designation) = designation {
            self.designation = designation;
        }
        if let Some(joining_date) = joining_date {
            self.joining_date = joining_date;
        }
        if let Some(salary) = salary {
            self.salary = salary;
        }
        if let Some(employee_id) = employee_id {
            self.employee_id = employee_id;
        }
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(profile_picture) = profile_picture {
            self.profile_picture = profile_picture;
        }
    }
}

impl Filterable for Employee {
    fn text_field(&self) -> &str {
        &self.name
    }

    fn category_field(&self) -> Option<&str> {
        Some(&self.department)
    }

    fn active_field(&self) -> Option<bool> {
        Some(self.status.is_active())
    }

    fn date_field(&self) -> Option<NaiveDate> {
        Some(self.joining_date)
    }
}
