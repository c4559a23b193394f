//! Income and expense records kept per employee.

use crate::query::Filterable;
use crate::store::Record;
use serde::{Deserialize, Serialize};

/// Direction of a money movement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseKind {
    /// Money received
    Income,
    /// Money spent
    #[default]
    Expense,
}

impl ExpenseKind {
    /// Label used in JSON and the type toggle.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

/// One income or expense entry.
///
/// `employee_id` refers to [`crate::models::Employee::id`]; nothing prevents
/// it from outliving the employee.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Server-assigned identity
    #[serde(
        default,
        deserialize_with = "super::flexible_id",
        skip_serializing_if = "String::is_empty"
    )]
    pub id: String,
    /// Owning employee
    #[serde(deserialize_with = "super::flexible_id")]
    pub employee_id: String,
    /// Free-text category, e.g. "Salary" or "Food"
    pub category: String,
    /// Positive amount
    pub amount: f64,
    /// Income or expense
    #[serde(rename = "type")]
    pub kind: ExpenseKind,
}

/// Partial expense update, sent as the `PUT` body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ExpensePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ExpenseKind>,
}

impl From<Expense> for ExpensePatch {
    fn from(expense: Expense) -> Self {
        Self {
            employee_id: Some(expense.employee_id),
            category: Some(expense.category),
            amount: Some(expense.amount),
            kind: Some(expense.kind),
        }
    }
}

impl Record for Expense {
    type Patch = ExpensePatch;
    const COLLECTION: &'static str = "expenses";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn merge(&mut self, patch: ExpensePatch) {
        if let Some(employee_id) = patch.employee_id {
            self.employee_id = employee_id;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
    }
}

impl Filterable for Expense {
    fn text_field(&self) -> &str {
        &self.category
    }

    fn category_field(&self) -> Option<&str> {
        Some(self.kind.as_str())
    }
}
