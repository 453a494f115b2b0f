//! REST API Routes Module
//!
//! One router per record kind, nested under `/api`, plus:
//! - Health checks at /health/*
//! - Prometheus metrics at /metrics
//! - The change feed at /ws
//! - CORS support for browser clients

pub mod applications;
pub mod examinations;
pub mod funds;
pub mod generic;
pub mod health;
pub mod messages;
pub mod networks;
pub mod pets;
pub mod posts;
pub mod reference;
pub mod shelters;
pub mod users;
pub mod vaccinations;

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::constants::MAX_FILES_PER_REQUEST;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};
use crate::ws::ws_handler;

pub use health::create_router as health_router;

/// Room for the JSON payload and multipart framing on top of the files.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build CORS layer from configuration.
///
/// An empty origin list allows every origin (development mode).
fn build_cors_layer(config: &ApiConfig) -> ApiResult<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        return Ok(cors.allow_origin(Any).allow_headers(Any).expose_headers(Any));
    }

    tracing::info!(origins = ?config.cors_origins, "CORS: allowing configured origins");
    let origins = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|_| ApiError::invalid_input(format!("Invalid CORS origin: {}", o)))
        })
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(if config.cors_allow_credentials {
        cors.allow_origin(origins).allow_credentials(true)
    } else {
        cors.allow_origin(origins)
    })
}

/// Largest accepted request body: a full set of attachments plus the form
/// overhead.
pub fn body_limit(config: &ApiConfig) -> usize {
    config
        .max_upload_bytes
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(FORM_OVERHEAD_BYTES)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/pets", pets::create_router())
        .nest("/shelters", shelters::create_router())
        .nest("/funds", funds::create_router())
        .nest("/networks", networks::create_router())
        .nest("/feed", posts::feed_router())
        .nest("/found-homes", posts::found_home_router())
        .nest("/examinations", examinations::create_router())
        .nest("/users", users::create_router())
        .nest("/applications", applications::create_router())
        .nest("/vaccinations", vaccinations::vaccination_router())
        .nest("/vaccines", vaccinations::stock_router())
        .nest("/messages", messages::create_router())
        .nest("/reference", reference::create_router())
}

/// Create the complete API router.
///
/// - Record routes under /api/*
/// - Health checks at /health/*
/// - Metrics at /metrics
/// - WebSocket change feed at /ws
pub fn create_api_router(state: AppState) -> ApiResult<Router> {
    let cors = build_cors_layer(&state.config)?;
    let limit = body_limit(&state.config);

    let router = Router::new()
        .nest("/api", api_routes())
        .nest("/health", health_router())
        .route("/metrics", get(metrics_handler))
        .route("/ws", get(ws_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn(observability_middleware))
                .layer(RequestBodyLimitLayer::new(limit)),
        )
        .layer(cors)
        .with_state(state);

    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_accepts_configured_origins() {
        let config = ApiConfig {
            cors_origins: vec!["https://shelter.example".to_string()],
            ..ApiConfig::default()
        };
        assert!(build_cors_layer(&config).is_ok());
    }

    #[test]
    fn test_cors_rejects_malformed_origin() {
        let config = ApiConfig {
            cors_origins: vec!["bad\norigin".to_string()],
            ..ApiConfig::default()
        };
        assert!(build_cors_layer(&config).is_err());
    }

    #[test]
    fn test_body_limit_covers_every_file() {
        let config = ApiConfig {
            max_upload_bytes: 1000,
            ..ApiConfig::default()
        };
        assert_eq!(body_limit(&config), 1000 * MAX_FILES_PER_REQUEST + FORM_OVERHEAD_BYTES);
    }
}
