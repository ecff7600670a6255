use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use contract_admin_api::app::{build_router, AppState};
use contract_admin_api::config::Config;
use contract_admin_api::error::expose_internal_errors;
use contract_admin_api::jobs::{ContractExpiryAlertJob, JobScheduler, ScheduledReportJob};
use contract_admin_api::middleware::{init_logging, init_metrics};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    init_logging(&config.logging).context("Failed to initialize logging")?;
    init_metrics().context("Failed to install metrics recorder")?;
    expose_internal_errors(config.server.expose_internal_errors);

    info!("Starting Contract Admin API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let addr = config.socket_addr().context("Invalid server address")?;
    let state = AppState::new(config, pool)?;

    let mut scheduler = JobScheduler::new();
    if state.config.jobs.expiry_alert_enabled {
        scheduler.register(ContractExpiryAlertJob::new(
            state.pool.clone(),
            state.notifier.clone(),
            &state.config.jobs,
        ));
    } else {
        warn!("Contract expiry alerts are disabled");
    }
    if state.config.jobs.scheduled_reports_enabled {
        scheduler.register(ScheduledReportJob::new(
            state.pool.clone(),
            state.notifier.clone(),
            &state.config.jobs,
        ));
    } else {
        warn!("Scheduled reports are disabled");
    }
    scheduler.start();

    let app = build_router(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(30)).await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
