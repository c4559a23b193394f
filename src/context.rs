//! Application context.
//!
//! One [`AppContext`] is built at startup and handed by reference to every
//! screen. It owns one store per entity, the employee list filter, and the
//! background tasks mirroring persisted slices to durable storage.
//!
//! Persisted state is read back before any mirror starts, so the first
//! snapshot a screen sees (including the filtered employee view) already
//! reflects the previous session.

use crate::config::Settings;
use crate::core::appointment::AppointmentBook;
use crate::core::employee::{EmployeeForm, validate_employee};
use crate::core::expense::{ExpenseForm, ExpenseSummary, entries_for, validate_expense};
use crate::core::ids::IdStrategy;
use crate::errors::Result;
use crate::models::{Appointment, Employee, Expense};
use crate::persistence::{KeyValueStore, PersistenceAdapter};
use crate::query::{FilterSpec, category_options, filtered};
use crate::remote::HttpCollection;
use crate::store::{EntityStore, Mutation, Record, Slice};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Storage key of the employee slice
pub const EMPLOYEES_KEY: &str = "employees-root";
/// Storage key of the employee list filter
pub const FILTER_KEY: &str = "filter-root";
/// Storage key of the appointment slice
pub const APPOINTMENTS_KEY: &str = "appointments";
/// Storage key of the appointment list filter
pub const APPOINTMENT_FILTER_KEY: &str = "appointment-filter";

/// Explicit replacement for a global store.
#[derive(Debug)]
pub struct AppContext {
    employees: EntityStore<Employee>,
    expenses: EntityStore<Expense>,
    appointments: AppointmentBook,
    employee_filter: watch::Sender<FilterSpec>,
    appointment_filter: watch::Sender<FilterSpec>,
    mirrors: Vec<JoinHandle<()>>,
}

impl AppContext {
    /// Builds the stores described by `settings` and restores persisted
    /// state from `storage`.
    ///
    /// Employees are remote-backed only when `remote.employees_url` is set;
    /// expenses are remote-backed unless `remote.expenses_url` is empty.
    #[instrument(skip_all)]
    pub async fn restore(settings: &Settings, storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        let persistence =
            PersistenceAdapter::new(storage, settings.persistence.whitelist.iter().cloned());

        let employees = match settings.remote.employees_url.as_deref() {
            Some(url) if !url.trim().is_empty() => EntityStore::remote(
                IdStrategy::timestamp(),
                Arc::new(HttpCollection::<Employee>::new(url)?),
            ),
            _ => EntityStore::local(IdStrategy::timestamp()),
        };

        let expenses_url = settings.remote.expenses_url.trim();
        let expenses = if expenses_url.is_empty() {
            EntityStore::local(IdStrategy::Uuid)
        } else {
            EntityStore::remote(
                IdStrategy::Uuid,
                Arc::new(HttpCollection::<Expense>::new(expenses_url)?),
            )
        };

        Ok(Self::from_parts(&persistence, employees, expenses).await)
    }

    /// Assembles a context around pre-built stores.
    pub async fn from_parts(
        persistence: &PersistenceAdapter,
        employees: EntityStore<Employee>,
        expenses: EntityStore<Expense>,
    ) -> Self {
        let employee_slice: Slice<Employee> = persistence.hydrate(EMPLOYEES_KEY).await;
        employees.hydrate(employee_slice);

        let appointments = AppointmentBook::new();
        let appointment_slice: Slice<Appointment> = persistence.hydrate(APPOINTMENTS_KEY).await;
        appointments.store().hydrate(appointment_slice);

        let filter: FilterSpec = persistence.hydrate(FILTER_KEY).await;
        let (employee_filter, _) = watch::channel(filter);

        let filter: FilterSpec = persistence.hydrate(APPOINTMENT_FILTER_KEY).await;
        let (appointment_filter, _) = watch::channel(filter);

        let mirrors: Vec<_> = [
            persistence.mirror(EMPLOYEES_KEY, employees.subscribe()),
            persistence.mirror(APPOINTMENTS_KEY, appointments.store().subscribe()),
            persistence.mirror(FILTER_KEY, employee_filter.subscribe()),
            persistence.mirror(APPOINTMENT_FILTER_KEY, appointment_filter.subscribe()),
        ]
        .into_iter()
        .flatten()
        .collect();

        info!(
            employees = employees.len(),
            appointments = appointments.store().len(),
            mirrors = mirrors.len(),
            "Context restored"
        );

        Self {
            employees,
            expenses,
            appointments,
            employee_filter,
            appointment_filter,
            mirrors,
        }
    }

    /// Employee store
    #[must_use]
    pub const fn employees(&self) -> &EntityStore<Employee> {
        &self.employees
    }

    /// Expense store
    #[must_use]
    pub const fn expenses(&self) -> &EntityStore<Expense> {
        &self.expenses
    }

    /// Appointment book
    #[must_use]
    pub const fn appointments(&self) -> &AppointmentBook {
        &self.appointments
    }

    // Employees

    /// Validates `form` and adds the employee.
    pub async fn add_employee(&self, form: &EmployeeForm) -> Result<Employee> {
        let employee = validate_employee(form)?;
        dispatch_add(&self.employees, employee).await
    }

    /// Validates `form` and replaces every field of employee `id` with it.
    pub async fn edit_employee(&self, id: &str, form: &EmployeeForm) -> Result<Mutation> {
        let employee = validate_employee(form)?;
        dispatch_update(&self.employees, id, employee.into()).await
    }

    /// Deletes employee `id`. Their expense entries are kept.
    pub async fn delete_employee(&self, id: &str) -> Result<Mutation> {
        dispatch_remove(&self.employees, id).await
    }

    /// Current employee list filter.
    #[must_use]
    pub fn employee_filter(&self) -> FilterSpec {
        self.employee_filter.borrow().clone()
    }

    /// Notified whenever the employee filter changes.
    #[must_use]
    pub fn subscribe_employee_filter(&self) -> watch::Receiver<FilterSpec> {
        self.employee_filter.subscribe()
    }

    /// Replaces the employee filter.
    pub fn set_employee_filter(&self, spec: FilterSpec) {
        if replace_filter(&self.employee_filter, spec) {
            debug!("Employee filter changed");
        }
    }

    /// Restores the default, unrestricted employee filter.
    pub fn reset_employee_filter(&self) {
        self.set_employee_filter(FilterSpec::default());
    }

    /// Employees matching the current filter, in store order.
    #[must_use]
    pub fn filtered_employees(&self) -> Vec<Employee> {
        let spec = self.employee_filter();
        filtered(&self.employees.snapshot().items, &spec)
    }

    /// Department picker entries: `All`, then each department present.
    #[must_use]
    pub fn department_options(&self) -> Vec<String> {
        category_options(&self.employees.snapshot().items)
    }

    // Appointments

    /// Current appointment list filter.
    #[must_use]
    pub fn appointment_filter(&self) -> FilterSpec {
        self.appointment_filter.borrow().clone()
    }

    /// Notified whenever the appointment filter changes.
    #[must_use]
    pub fn subscribe_appointment_filter(&self) -> watch::Receiver<FilterSpec> {
        self.appointment_filter.subscribe()
    }

    /// Replaces the appointment filter, e.g. with the day picked on the
    /// calendar.
    pub fn set_appointment_filter(&self, spec: FilterSpec) {
        if replace_filter(&self.appointment_filter, spec) {
            debug!("Appointment filter changed");
        }
    }

    /// Restores the default, unrestricted appointment filter.
    pub fn reset_appointment_filter(&self) {
        self.set_appointment_filter(FilterSpec::default());
    }

    /// Appointments matching the current filter, in booking order.
    #[must_use]
    pub fn filtered_appointments(&self) -> Vec<Appointment> {
        let spec = self.appointment_filter();
        filtered(&self.appointments.store().snapshot().items, &spec)
    }

    // Expenses

    /// Validates `form` and records the entry.
    pub async fn add_expense(&self, form: &ExpenseForm) -> Result<Expense> {
        let expense = validate_expense(form)?;
        dispatch_add(&self.expenses, expense).await
    }

    /// Validates `form` and replaces entry `id` with it.
    pub async fn edit_expense(&self, id: &str, form: &ExpenseForm) -> Result<Mutation> {
        let expense = validate_expense(form)?;
        dispatch_update(&self.expenses, id, expense.into()).await
    }

    /// Deletes entry `id`.
    pub async fn delete_expense(&self, id: &str) -> Result<Mutation> {
        dispatch_remove(&self.expenses, id).await
    }

    /// Entries of `employee_id`, in store order.
    #[must_use]
    pub fn employee_expenses(&self, employee_id: &str) -> Vec<Expense> {
        entries_for(&self.expenses.snapshot().items, employee_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Income and expense totals of `employee_id`.
    #[must_use]
    pub fn expense_summary(&self, employee_id: &str) -> ExpenseSummary {
        ExpenseSummary::for_employee(&self.expenses.snapshot().items, employee_id)
    }

    /// Drops the stores and waits for every pending durable write.
    pub async fn close(self) {
        let Self {
            employees,
            expenses,
            appointments,
            employee_filter,
            appointment_filter,
            mirrors,
        } = self;
        drop((
            employees,
            expenses,
            appointments,
            employee_filter,
            appointment_filter,
        ));

        for mirror in mirrors {
            if let Err(e) = mirror.await {
                warn!("Mirror task failed: {}", e);
            }
        }
        debug!("Context closed");
    }
}

/// Stores `spec` unless it equals the current one. Returns whether it changed.
fn replace_filter(filter: &watch::Sender<FilterSpec>, spec: FilterSpec) -> bool {
    filter.send_if_modified(|current| {
        if *current == spec {
            false
        } else {
            *current = spec;
            true
        }
    })
}

async fn dispatch_add<T: Record>(store: &EntityStore<T>, record: T) -> Result<T> {
    if store.is_remote() {
        Ok(store.sync_add(record).await?)
    } else {
        Ok(store.add(record))
    }
}

async fn dispatch_update<T: Record>(
    store: &EntityStore<T>,
    id: &str,
    patch: T::Patch,
) -> Result<Mutation> {
    if store.is_remote() {
        store.sync_update(id, patch).await?;
        Ok(Mutation::Applied)
    } else {
        Ok(store.update(id, patch))
    }
}

async fn dispatch_remove<T: Record>(store: &EntityStore<T>, id: &str) -> Result<Mutation> {
    if store.is_remote() {
        store.sync_remove(id).await?;
        Ok(Mutation::Applied)
    } else {
        Ok(store.remove(id))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::appointment::{AppointmentForm, Decision};
    use crate::errors::Error;
    use crate::models::{AppointmentStatus, EmployeePatch, EmployeeStatus, ExpenseKind};
    use crate::persistence::SqliteKeyValueStore;
    use crate::remote::RemoteCollection;
    use crate::store::Status;
    use crate::test_utils::{
        FakeCollection, init_test_tracing, sample_employee, sample_expense, setup_test_db,
    };
    use chrono::{Duration, Utc};

    fn local_settings() -> Settings {
        let mut settings = Settings::default();
        settings.remote.expenses_url = String::new();
        settings
    }

    async fn storage() -> Result<Arc<dyn KeyValueStore>> {
        Ok(Arc::new(SqliteKeyValueStore::new(setup_test_db().await?)))
    }

    fn employee_form(name: &str, department: &str) -> EmployeeForm {
        EmployeeForm::from(&sample_employee(name, department, EmployeeStatus::Active))
    }

    #[tokio::test]
    async fn test_employee_status_filter_scenario() -> Result<()> {
        init_test_tracing();
        let ctx = AppContext::restore(&local_settings(), storage().await?).await?;

        let a = ctx.add_employee(&employee_form("A", "HR")).await?;
        assert_eq!(ctx.employees().len(), 1);

        let outcome = ctx.employees().update(
            &a.id,
            EmployeePatch {
                status: Some(EmployeeStatus::Inactive),
                ..EmployeePatch::default()
            },
        );
        assert_eq!(outcome, Mutation::Applied);

        ctx.set_employee_filter(FilterSpec::default().with_active(Some(true)));
        assert!(ctx.filtered_employees().is_empty());

        ctx.set_employee_filter(FilterSpec::default().with_active(Some(false)));
        let inactive = ctx.filtered_employees();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].id, a.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_restart_restores_slices_and_filter() -> Result<()> {
        init_test_tracing();
        let storage = storage().await?;
        let settings = local_settings();
        let now = Utc::now();

        let ctx = AppContext::restore(&settings, Arc::clone(&storage)).await?;
        ctx.add_employee(&employee_form("Asha", "HR")).await?;
        let chen = ctx.add_employee(&employee_form("Chen", "Engineering")).await?;
        ctx.set_employee_filter(FilterSpec::default().with_category("Engineering"));
        let booked = ctx.appointments().book(
            &AppointmentForm {
                name: "Ravi".to_string(),
                age: "40".to_string(),
                disease: "Fever".to_string(),
                date: Some(now + Duration::days(1)),
            },
            now,
        )?;
        ctx.appointments().reject(&booked.id, "unavailable");
        let employees_before = ctx.employees().snapshot();
        let appointments_before = ctx.appointments().store().snapshot();
        ctx.close().await;

        let ctx = AppContext::restore(&settings, storage).await?;
        assert_eq!(ctx.employees().snapshot(), employees_before);
        assert_eq!(ctx.appointments().store().snapshot(), appointments_before);
        assert_eq!(
            ctx.employee_filter(),
            FilterSpec::default().with_category("Engineering")
        );
        assert_eq!(ctx.filtered_employees(), vec![chen]);

        let restored = ctx.appointments().store().get(&booked.id).unwrap();
        assert_eq!(restored.status, AppointmentStatus::Rejected);
        assert_eq!(
            ctx.appointments().accept(&booked.id),
            Decision::AlreadyDecided(AppointmentStatus::Rejected)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_filter_survives_restart() -> Result<()> {
        let storage = storage().await?;
        let settings = local_settings();

        let ctx = AppContext::restore(&settings, Arc::clone(&storage)).await?;
        ctx.set_employee_filter(FilterSpec::default().with_text("asha"));
        ctx.reset_employee_filter();
        assert!(ctx.employee_filter().is_unrestricted());
        ctx.close().await;

        let ctx = AppContext::restore(&settings, storage).await?;
        assert_eq!(ctx.employee_filter(), FilterSpec::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_storage_starts_empty() -> Result<()> {
        init_test_tracing();
        let storage = storage().await?;
        storage.set(EMPLOYEES_KEY, "[[[").await?;
        storage.set(FILTER_KEY, r#"{"activeFlag":"sometimes"}"#).await?;

        let ctx = AppContext::restore(&local_settings(), storage).await?;

        assert!(ctx.employees().is_empty());
        assert_eq!(ctx.employee_filter(), FilterSpec::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_restart_starts_without_pending_work() -> Result<()> {
        let storage = storage().await?;
        let mut slice = Slice::with_items(vec![sample_employee("A", "HR", EmployeeStatus::Active)]);
        slice.record_failure(crate::store::Operation::Fetch, "offline".to_string());
        slice.status = Status::Loading;
        storage
            .set(EMPLOYEES_KEY, &serde_json::to_string(&slice)?)
            .await?;

        let ctx = AppContext::restore(&local_settings(), storage).await?;
        let restored = ctx.employees().snapshot();
        assert_eq!(restored.status, Status::Idle);
        assert_eq!(restored.error, None);
        assert_eq!(restored.items.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_restart_restores_appointment_filter() -> Result<()> {
        let storage = storage().await?;
        let settings = local_settings();
        let now = Utc::now();
        let tomorrow = now + Duration::days(1);
        let form = |name: &str, date| AppointmentForm {
            name: name.to_string(),
            age: "30".to_string(),
            disease: "Cough".to_string(),
            date: Some(date),
        };

        let ctx = AppContext::restore(&settings, Arc::clone(&storage)).await?;
        let ravi = ctx.appointments().book(&form("Ravi", tomorrow), now)?;
        ctx.appointments()
            .book(&form("Mina", tomorrow + Duration::days(2)), now)?;
        let day_view = FilterSpec::default().on_day(ravi.local_day());
        ctx.set_appointment_filter(day_view.clone());
        assert_eq!(ctx.filtered_appointments(), vec![ravi.clone()]);
        ctx.close().await;

        let ctx = AppContext::restore(&settings, storage).await?;
        assert_eq!(ctx.appointment_filter(), day_view);
        assert_eq!(ctx.filtered_appointments(), vec![ravi]);
        assert_eq!(ctx.employee_filter(), FilterSpec::default());

        ctx.reset_appointment_filter();
        assert_eq!(ctx.filtered_appointments().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_department_options() -> Result<()> {
        let ctx = AppContext::restore(&local_settings(), storage().await?).await?;
        for (name, department) in [("A", "HR"), ("B", "Sales"), ("C", "HR")] {
            ctx.add_employee(&employee_form(name, department)).await?;
        }
        assert_eq!(ctx.department_options(), vec!["All", "HR", "Sales"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_employee_form_leaves_store_untouched() -> Result<()> {
        let ctx = AppContext::restore(&local_settings(), storage().await?).await?;
        let form = EmployeeForm {
            phone: "12".to_string(),
            ..employee_form("A", "HR")
        };
        let result = ctx.add_employee(&form).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(ctx.employees().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_expense_tracker_against_remote() -> Result<()> {
        init_test_tracing();
        let remote = Arc::new(FakeCollection::with_records(vec![
            sample_expense("1", "e1", 1200.0, ExpenseKind::Income),
            sample_expense("2", "e2", 80.0, ExpenseKind::Expense),
        ]));
        let remote_dyn: Arc<dyn RemoteCollection<Expense>> = remote.clone();
        let persistence = PersistenceAdapter::new(storage().await?, [EMPLOYEES_KEY]);
        let ctx = AppContext::from_parts(
            &persistence,
            EntityStore::local(IdStrategy::timestamp()),
            EntityStore::remote(IdStrategy::Uuid, remote_dyn),
        )
        .await;

        ctx.expenses().fetch_all().await?;
        let created = ctx
            .add_expense(&ExpenseForm {
                employee_id: "e1".to_string(),
                category: "Travel".to_string(),
                amount: "200".to_string(),
                kind: ExpenseKind::Expense,
            })
            .await?;

        assert!(!created.id.is_empty());
        assert_eq!(remote.records().len(), 3);
        assert_eq!(ctx.employee_expenses("e1").len(), 2);
        let summary = ctx.expense_summary("e1");
        assert_eq!(summary.income, 1200.0);
        assert_eq!(summary.expense, 200.0);
        assert_eq!(summary.balance(), 1000.0);

        ctx.delete_expense(&created.id).await?;
        assert_eq!(ctx.expense_summary("e1").expense, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_failure_surfaces_on_slice_and_result() -> Result<()> {
        let remote = Arc::new(FakeCollection::<Expense>::default());
        let remote_dyn: Arc<dyn RemoteCollection<Expense>> = remote.clone();
        let persistence = PersistenceAdapter::new(storage().await?, Vec::<String>::new());
        let ctx = AppContext::from_parts(
            &persistence,
            EntityStore::local(IdStrategy::timestamp()),
            EntityStore::remote(IdStrategy::Uuid, remote_dyn),
        )
        .await;
        remote.fail_with_transport("network unreachable");

        let result = ctx
            .add_expense(&ExpenseForm {
                employee_id: "e1".to_string(),
                category: "Food".to_string(),
                amount: "12.50".to_string(),
                kind: ExpenseKind::Expense,
            })
            .await;

        assert!(matches!(result, Err(Error::Remote(_))));
        assert!(ctx.expenses().is_empty());
        assert_eq!(ctx.expenses().status(), Status::Error);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_employee_keeps_expenses() -> Result<()> {
        let ctx = AppContext::restore(&local_settings(), storage().await?).await?;
        let employee = ctx.add_employee(&employee_form("A", "HR")).await?;
        ctx.expenses()
            .add(sample_expense("x1", &employee.id, 10.0, ExpenseKind::Expense));

        assert_eq!(ctx.delete_employee(&employee.id).await?, Mutation::Applied);
        assert_eq!(ctx.delete_employee(&employee.id).await?, Mutation::Missing);
        assert_eq!(ctx.employee_expenses(&employee.id).len(), 1);
        Ok(())
    }
}
