//! Expense form validation and per-employee totals.

use super::{check, field_error};
use crate::models::{Expense, ExpenseKind};
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

/// Raw input from the add/edit transaction form.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpenseForm {
    /// Employee the entry belongs to
    #[validate(length(min = 1, message = "Select an employee first"))]
    pub employee_id: String,
    /// Free-text category
    #[validate(length(min = 1, message = "Please enter both category and amount"))]
    pub category: String,
    /// Amount as typed
    pub amount: String,
    /// Income or expense toggle
    pub kind: ExpenseKind,
}

impl From<&Expense> for ExpenseForm {
    fn from(expense: &Expense) -> Self {
        Self {
            employee_id: expense.employee_id.clone(),
            category: expense.category.clone(),
            amount: expense.amount.to_string(),
            kind: expense.kind,
        }
    }
}

fn parse_amount(value: &str) -> Result<f64, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(field_error("required", "Please enter both category and amount"));
    }
    match value.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        Ok(_) => Err(field_error("range", "Amount must be greater than zero")),
        Err(_) => Err(field_error("number", "Amount must be a number")),
    }
}

/// Validates the form and builds an expense with no id.
pub fn validate_expense(form: &ExpenseForm) -> Result<Expense, ValidationErrors> {
    let mut errors = form.validate().err().unwrap_or_else(ValidationErrors::new);
    let amount = check(&mut errors, "amount", parse_amount(&form.amount));

    match amount {
        Some(amount) if errors.is_empty() => Ok(Expense {
            id: String::new(),
            employee_id: form.employee_id.clone(),
            category: form.category.trim().to_string(),
            amount,
            kind: form.kind,
        }),
        _ => Err(errors),
    }
}

/// Entries belonging to `employee_id`, in source order.
pub fn entries_for<'a>(expenses: &'a [Expense], employee_id: &str) -> Vec<&'a Expense> {
    expenses
        .iter()
        .filter(|expense| expense.employee_id == employee_id)
        .collect()
}

/// Income and expense totals for one employee.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExpenseSummary {
    /// Sum of income entries
    pub income: f64,
    /// Sum of expense entries
    pub expense: f64,
    /// Number of entries counted
    pub entries: usize,
}

impl ExpenseSummary {
    /// Totals over the entries of `employee_id`.
    #[must_use]
    pub fn for_employee(expenses: &[Expense], employee_id: &str) -> Self {
        entries_for(expenses, employee_id)
            .into_iter()
            .fold(Self::default(), |mut summary, entry| {
                match entry.kind {
                    ExpenseKind::Income => summary.income += entry.amount,
                    ExpenseKind::Expense => summary.expense += entry.amount,
                }
                summary.entries += 1;
                summary
            })
    }

    /// Income plus expense; the size of the chart.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.income + self.expense
    }

    /// Income minus expense.
    #[must_use]
    pub fn balance(&self) -> f64 {
        self.income - self.expense
    }

    /// Fraction of the total that is income, `None` with no entries.
    #[must_use]
    pub fn income_share(&self) -> Option<f64> {
        let total = self.total();
        (total > 0.0).then(|| self.income / total)
    }
}
