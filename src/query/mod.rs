//! Filter/query layer.
//!
//! Produces borrowed views over a slice's records. The source collection is
//! never modified and the view keeps source order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Category value meaning "no restriction".
pub const ALL: &str = "All";

/// Fields a record exposes to [`FilterSpec`].
///
/// A record that does not carry a field never matches a restriction on it.
pub trait Filterable {
    /// Field searched by [`FilterSpec::text_query`].
    fn text_field(&self) -> &str;

    /// Field compared against [`FilterSpec::category_equals`].
    fn category_field(&self) -> Option<&str> {
        None
    }

    /// Field compared against [`FilterSpec::active_flag`].
    fn active_field(&self) -> Option<bool> {
        None
    }

    /// Field compared against [`FilterSpec::date_equals`].
    fn date_field(&self) -> Option<NaiveDate> {
        None
    }
}

/// Conjunctive filter. The default spec lets everything through.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    /// Case-insensitive substring; blank means no restriction
    pub text_query: String,
    /// Exact category; `None`, empty, or [`ALL`] mean no restriction
    pub category_equals: Option<String>,
    /// `Some(true)` active only, `Some(false)` inactive only, `None` both
    pub active_flag: Option<bool>,
    /// Same calendar day
    pub date_equals: Option<NaiveDate>,
}

impl FilterSpec {
    /// Restricts by text.
    #[must_use]
    pub fn with_text(mut self, query: impl Into<String>) -> Self {
        self.text_query = query.into();
        self
    }

    /// Restricts by category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category_equals = Some(category.into());
        self
    }

    /// Restricts by active flag.
    #[must_use]
    pub const fn with_active(mut self, active: Option<bool>) -> Self {
        self.active_flag = active;
        self
    }

    /// Restricts to one calendar day.
    #[must_use]
    pub const fn on_day(mut self, day: NaiveDate) -> Self {
        self.date_equals = Some(day);
        self
    }

    fn category(&self) -> Option<&str> {
        self.category_equals
            .as_deref()
            .filter(|category| !category.is_empty() && *category != ALL)
    }

    /// True if the spec restricts nothing.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.text_query.trim().is_empty()
            && self.category().is_none()
            && self.active_flag.is_none()
            && self.date_equals.is_none()
    }

    /// True if `record` satisfies every restriction.
    pub fn matches<T: Filterable + ?Sized>(&self, record: &T) -> bool {
        let query = self.text_query.trim();
        if !query.is_empty()
            && !record
                .text_field()
                .to_lowercase()
                .contains(&query.to_lowercase())
        {
            return false;
        }

        if self
            .category()
            .is_some_and(|category| record.category_field() != Some(category))
        {
            return false;
        }

        if self
            .active_flag
            .is_some_and(|active| record.active_field() != Some(active))
        {
            return false;
        }

        if self
            .date_equals
            .is_some_and(|day| record.date_field() != Some(day))
        {
            return false;
        }

        true
    }
}

/// Records of `source` matching `spec`, in source order.
pub fn filter_view<'a, T: Filterable>(source: &'a [T], spec: &FilterSpec) -> Vec<&'a T> {
    source.iter().filter(|record| spec.matches(*record)).collect()
}

/// Owned copy of [`filter_view`], for handing a snapshot to a renderer.
pub fn filtered<T: Filterable + Clone>(source: &[T], spec: &FilterSpec) -> Vec<T> {
    filter_view(source, spec).into_iter().cloned().collect()
}

/// Distinct categories present in `source`, first-seen order, prefixed with
/// [`ALL`]. Feeds the department picker.
pub fn category_options<T: Filterable>(source: &[T]) -> Vec<String> {
    let mut options = vec![ALL.to_string()];
    for category in source.iter().filter_map(Filterable::category_field) {
        if !options.iter().any(|existing| existing == category) {
            options.push(category.to_string());
        }
    }
    options
}
