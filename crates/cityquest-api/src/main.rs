//! CityQuest API server entry point.

use std::sync::Arc;

use cityquest_api::config::AppConfig;
use cityquest_api::error::AppError;
use cityquest_api::state::AppState;
use cityquest_api::{routes, telemetry};
use cityquest_core::clock::SystemClock;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let _telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!(
        otlp_export = config.otlp_endpoint.is_some(),
        "Starting CityQuest API server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    let app_state = AppState::with_pool(pool, Arc::new(SystemClock));
    let app = routes::app(app_state);

    let addr = config.listen_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
