use crewdesk::config::{database, load_settings, settings::DEFAULT_SETTINGS_PATH};
use crewdesk::context::AppContext;
use crewdesk::core::distance::{DEFAULT_LOCATION, distance_km};
use crewdesk::errors::Result;
use crewdesk::persistence::{KeyValueStore, SqliteKeyValueStore};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Settings file, then environment overrides
    let settings_path =
        std::env::var("CREWDESK_SETTINGS").unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
    let settings = load_settings(&settings_path)
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;

    // 4. Durable storage
    let db = database::create_connection(&settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;
    let storage: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyValueStore::new(db));

    // 5. Restore the previous session
    let ctx = AppContext::restore(&settings, storage).await?;
    info!(
        "Restored {} employees ({} shown), {} appointments",
        ctx.employees().len(),
        ctx.filtered_employees().len(),
        ctx.appointments().store().len()
    );

    // 6. Refresh remote-backed collections; failures stay on the slice
    if ctx.expenses().is_remote() {
        match ctx.expenses().fetch_all().await {
            Ok(count) => info!("Fetched {} expense entries", count),
            Err(e) => warn!("Expense tracker offline: {}", e),
        }
    }
    if ctx.employees().is_remote() {
        if let Err(e) = ctx.employees().fetch_all().await {
            warn!("Employee directory offline: {}", e);
        }
    }

    for employee in ctx.filtered_employees() {
        let summary = ctx.expense_summary(&employee.id);
        info!(
            "{} ({}): income {:.2}, expense {:.2}",
            employee.name, employee.department, summary.income, summary.expense
        );
    }
    info!(
        "Map origin {:?}, {} km from itself",
        DEFAULT_LOCATION,
        distance_km(DEFAULT_LOCATION, DEFAULT_LOCATION)
    );

    ctx.close().await;
    Ok(())
}
