//! Haven API Server Entry Point
//!
//! Bootstraps configuration, the connection pool and the object store, and
//! starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use haven_api::config::is_production_environment;
use haven_api::telemetry::{init_tracer, TelemetryConfig};
use haven_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, DbClient, DbConfig,
    StorageConfig,
};
use haven_storage::{InMemoryObjectStore, ObjectStore, S3ObjectStore};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let api_config = ApiConfig::from_env();
    let storage_config = StorageConfig::from_env();
    if is_production_environment() {
        haven_api::config::validate_for_production(&api_config, &storage_config)?;
    }

    let db_config = DbConfig::from_env();
    let db = DbClient::from_config(&db_config)?;

    let objects = build_object_store(&storage_config)?;
    let state = AppState::new(db, objects, api_config);
    let app: Router = create_api_router(state)?;

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Haven API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn build_object_store(config: &StorageConfig) -> ApiResult<Arc<dyn ObjectStore>> {
    if config.has_credentials() && !config.bucket.is_empty() {
        let store = S3ObjectStore::new(config.to_settings())?;
        tracing::info!(host = store.host(), bucket = %config.bucket, "Using S3 object storage");
        return Ok(Arc::new(store));
    }

    tracing::warn!("Object storage credentials not set, attachments are kept in memory");
    Ok(Arc::new(InMemoryObjectStore::new(&config.endpoint, "haven-dev")))
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("HAVEN_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("HAVEN_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
