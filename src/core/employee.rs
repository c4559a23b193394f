//! Employee form validation.

use super::{check, field_error};
use crate::models::{Employee, EmployeeStatus};
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use validator::{Validate, ValidationError, ValidationErrors};

/// Date format produced by the joining-date picker.
pub const JOINING_DATE_FORMAT: &str = "%Y-%m-%d";

/// Unanchored: any whitespace-free `x@y.z` run inside the value passes.
static EMAIL_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+"));

/// Raw input from the add/edit employee form.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct EmployeeForm {
    #[validate(length(min = 1, message = "Full Name is required"))]
    pub name: String,
    #[validate(custom(function = "validate_email"))]
    pub email: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Department is required"))]
    pub department: String,
    #[validate(length(min = 1, message = "Designation is required"))]
    pub designation: String,
    pub joining_date: String,
    pub salary: String,
    #[validate(length(min = 1, message = "Employee ID is required"))]
    pub employee_id: String,
    pub status: String,
    pub profile_picture: Option<String>,
}

impl From<&Employee> for EmployeeForm {
    /// Pre-fills the form for editing.
    fn from(employee: &Employee) -> Self {
        Self {
            name: employee.name.clone(),
            email: employee.email.clone(),
            phone: employee.phone.clone(),
            department: employee.department.clone(),
            designation: employee.designation.clone(),
            joining_date: employee.joining_date.format(JOINING_DATE_FORMAT).to_string(),
            salary: employee.salary.to_string(),
            employee_id: employee.employee_id.clone(),
            status: employee.status.as_str().to_string(),
            profile_picture: employee.profile_picture.clone(),
        }
    }
}

fn validate_email(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(field_error("required", "Email is required"));
    }
    let well_formed = EMAIL_PATTERN
        .as_ref()
        .is_ok_and(|pattern| pattern.is_match(value));
    if well_formed {
        Ok(())
    } else {
        Err(field_error("email", "Invalid email format"))
    }
}

fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(field_error("required", "Phone number is required"));
    }
    if value.len() == 10 && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(field_error("phone", "Enter a valid 10-digit phone number"))
    }
}

fn parse_joining_date(value: &str) -> Result<NaiveDate, ValidationError> {
    if value.trim().is_empty() {
        return Err(field_error("required", "Joining Date is required"));
    }
    NaiveDate::parse_from_str(value.trim(), JOINING_DATE_FORMAT)
        .map_err(|_| field_error("date", "Enter a valid joining date"))
}

fn parse_salary(value: &str) -> Result<u64, ValidationError> {
    if value.is_empty() {
        return Err(field_error("required", "Salary is required"));
    }
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(field_error("salary", "Enter a valid salary amount"));
    }
    value
        .parse()
        .map_err(|_| field_error("salary", "Enter a valid salary amount"))
}

fn parse_status(value: &str) -> Result<EmployeeStatus, ValidationError> {
    EmployeeStatus::parse(value).ok_or_else(|| field_error("required", "Status is required"))
}

/// Validates the form and builds an employee with no id.
///
/// Every failing field is reported, not just the first.
pub fn validate_employee(form: &EmployeeForm) -> Result<Employee, ValidationErrors> {
    let mut errors = form.validate().err().unwrap_or_else(ValidationErrors::new);
    let joining_date = check(
        &mut errors,
        "joining_date",
        parse_joining_date(&form.joining_date),
    );
    let salary = check(&mut errors, "salary", parse_salary(&form.salary));
    let status = check(&mut errors, "status", parse_status(&form.status));

    if !errors.is_empty() {
        return Err(errors);
    }
    let (Some(joining_date), Some(salary), Some(status)) = (joining_date, salary, status) else {
        return Err(errors);
    };

    Ok(Employee {
        id: String::new(),
        name: form.name.trim().to_string(),
        email: form.email.clone(),
        phone: form.phone.clone(),
        department: form.department.clone(),
        designation: form.designation.trim().to_string(),
        joining_date,
        salary,
        employee_id: form.employee_id.trim().to_string(),
        status,
        profile_picture: form.profile_picture.clone().filter(|uri| !uri.is_empty()),
    })
}
