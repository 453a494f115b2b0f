//! Health Check Endpoints
//!
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check
//! - /health/ready - Database round trip plus pool and broadcaster counts

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::{DbClient, PoolStats};
use crate::state::AppState;
use crate::ws::WsState;

/// Body of `/health/live`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liveness {
    pub status: CheckStatus,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Unhealthy,
}

/// Body of `/health/ready`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub status: CheckStatus,
    pub database: DatabaseCheck,
    /// Open change-feed subscriptions.
    pub subscribers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_trip_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub pool: PoolStats,
}

impl DatabaseCheck {
    fn status(&self) -> CheckStatus {
        if self.error.is_none() {
            CheckStatus::Healthy
        } else {
            CheckStatus::Unhealthy
        }
    }
}

pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

pub async fn liveness(State(start_time): State<Instant>) -> Json<Liveness> {
    Json(Liveness {
        status: CheckStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
    })
}

pub async fn readiness(
    State(db): State<DbClient>,
    State(ws): State<Arc<WsState>>,
) -> (StatusCode, Json<Readiness>) {
    let started = Instant::now();
    let database = match db.health_check().await {
        Ok(()) => DatabaseCheck {
            round_trip_ms: Some(millis(started.elapsed())),
            error: None,
            pool: db.pool_stats(),
        },
        Err(e) => {
            warn!(error = %e, "Readiness check could not reach the database");
            DatabaseCheck {
                round_trip_ms: None,
                error: Some(e.message),
                pool: db.pool_stats(),
            }
        }
    };

    let report = Readiness {
        status: database.status(),
        database,
        subscribers: ws.subscriber_count(),
    };
    let code = match report.status {
        CheckStatus::Healthy => StatusCode::OK,
        CheckStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(report))
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> PoolStats {
        PoolStats {
            max_size: 16,
            open: 2,
            idle: 1,
        }
    }

    #[test]
    fn test_failed_check_is_unhealthy() -> Result<(), serde_json::Error> {
        let check = DatabaseCheck {
            round_trip_ms: None,
            error: Some("Connection refused".to_string()),
            pool: pool(),
        };
        assert_eq!(check.status(), CheckStatus::Unhealthy);

        let json = serde_json::to_value(&check)?;
        assert!(json.get("round_trip_ms").is_none());
        assert_eq!(json["pool"]["max_size"], 16);
        Ok(())
    }

    #[test]
    fn test_readiness_body() -> Result<(), serde_json::Error> {
        let report = Readiness {
            status: CheckStatus::Healthy,
            database: DatabaseCheck {
                round_trip_ms: Some(3),
                error: None,
                pool: pool(),
            },
            subscribers: 4,
        };
        let json = serde_json::to_value(&report)?;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["subscribers"], 4);
        assert_eq!(json["database"]["pool"]["idle"], 1);
        Ok(())
    }
}
