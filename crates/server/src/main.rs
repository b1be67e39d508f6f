mod bootstrap;
mod placement;
mod prompt;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use aisle_core::config::{AppConfig, LoadOptions};
use aisle_retailer::Supermarket;

fn init_logging(config: &AppConfig) {
    use aisle_core::config::LogFormat::{Compact, Json, Pretty};
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations;
    // missing retailer credentials abort right here.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    app.supermarket.prime_session().await;

    let deadline = Duration::from_secs(app.config.checkout.placement_deadline_secs);
    let jobs = placement::spawn(placement::PlacementWorker::new(
        app.db_pool.clone(),
        Arc::clone(&app.supermarket) as Arc<dyn Supermarket>,
        app.recommender,
        deadline,
    ));

    let router = routes::router(app.db_pool.clone(), jobs);
    let bind = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(
        event_name = "system.server.started",
        address = %bind,
        "aisle server listening"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;
    tracing::info!(event_name = "system.server.stopping", "aisle server stopping");

    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
