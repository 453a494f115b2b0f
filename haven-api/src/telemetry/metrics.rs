//! Prometheus metrics.
//!
//! Request traffic, database statements, object store calls and the
//! outcomes of the decision and inventory engines. Scraped at `/metrics`.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// Seconds. Requests and statements share one scale.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

pub static METRICS: Lazy<ApiResult<HavenMetrics>> = Lazy::new(HavenMetrics::new);

#[derive(Clone)]
pub struct HavenMetrics {
    /// method, route, status
    pub http_requests: IntCounterVec,
    /// method, route
    pub http_latency: HistogramVec,
    /// operation, entity, outcome
    pub db_operations: IntCounterVec,
    /// operation, entity
    pub db_latency: HistogramVec,
    /// operation, outcome
    pub object_store_calls: IntCounterVec,
    /// workflow, decision, outcome
    pub decisions: IntCounterVec,
    /// operation, outcome
    pub inventory_operations: IntCounterVec,
    /// event
    pub broadcasts: IntCounterVec,
    pub ws_subscribers: IntGauge,
}

fn registration(name: &'static str) -> impl FnOnce(prometheus::Error) -> ApiError {
    move |e| ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

fn outcome(success: bool) -> &'static str {
    if success {
        "ok"
    } else {
        "error"
    }
}

impl HavenMetrics {
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests: register_int_counter_vec!(
                "haven_http_requests_total",
                "HTTP requests by route and status",
                &["method", "route", "status"]
            )
            .map_err(registration("haven_http_requests_total"))?,
            http_latency: register_histogram_vec!(
                "haven_http_request_seconds",
                "HTTP request latency",
                &["method", "route"],
                LATENCY_BUCKETS.to_vec()
            )
            .map_err(registration("haven_http_request_seconds"))?,
            db_operations: register_int_counter_vec!(
                "haven_db_operations_total",
                "Generic record operations by entity",
                &["operation", "entity", "outcome"]
            )
            .map_err(registration("haven_db_operations_total"))?,
            db_latency: register_histogram_vec!(
                "haven_db_operation_seconds",
                "Generic record operation latency",
                &["operation", "entity"],
                LATENCY_BUCKETS.to_vec()
            )
            .map_err(registration("haven_db_operation_seconds"))?,
            object_store_calls: register_int_counter_vec!(
                "haven_object_store_calls_total",
                "Attachment uploads and deletes",
                &["operation", "outcome"]
            )
            .map_err(registration("haven_object_store_calls_total"))?,
            decisions: register_int_counter_vec!(
                "haven_decisions_total",
                "Accept and cancel decisions by workflow and outcome",
                &["workflow", "decision", "outcome"]
            )
            .map_err(registration("haven_decisions_total"))?,
            inventory_operations: register_int_counter_vec!(
                "haven_inventory_operations_total",
                "Stock and vaccination ledger changes by outcome",
                &["operation", "outcome"]
            )
            .map_err(registration("haven_inventory_operations_total"))?,
            broadcasts: register_int_counter_vec!(
                "haven_broadcasts_total",
                "Change events published to subscribers",
                &["event"]
            )
            .map_err(registration("haven_broadcasts_total"))?,
            ws_subscribers: register_int_gauge!(
                "haven_ws_subscribers",
                "Open change-feed connections"
            )
            .map_err(registration("haven_ws_subscribers"))?,
        })
    }

    pub fn record_http_request(&self, method: &str, route: &str, status: u16, seconds: f64) {
        self.http_requests
            .with_label_values(&[method, route, &status.to_string()])
            .inc();
        self.http_latency
            .with_label_values(&[method, route])
            .observe(seconds);
    }

    pub fn record_db_operation(&self, operation: &str, entity: &str, success: bool, seconds: f64) {
        self.db_operations
            .with_label_values(&[operation, entity, outcome(success)])
            .inc();
        self.db_latency
            .with_label_values(&[operation, entity])
            .observe(seconds);
    }

    pub fn record_object_store_operation(&self, operation: &str, success: bool) {
        self.object_store_calls
            .with_label_values(&[operation, outcome(success)])
            .inc();
    }

    /// `result` is `"applied"` or the error's reason label.
    pub fn record_decision(&self, workflow: &str, decision: &str, result: &str) {
        self.decisions
            .with_label_values(&[workflow, decision, result])
            .inc();
    }

    /// `result` is `"ok"` or the error's reason label.
    pub fn record_inventory(&self, operation: &str, result: &str) {
        self.inventory_operations
            .with_label_values(&[operation, result])
            .inc();
    }

    pub fn record_broadcast(&self, event: &str) {
        self.broadcasts.with_label_values(&[event]).inc();
    }

    pub fn ws_connected(&self) {
        self.ws_subscribers.inc();
    }

    pub fn ws_disconnected(&self) {
        self.ws_subscribers.dec();
    }
}

/// GET /metrics in the Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    let mut buffer = Vec::new();
    match TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                b"metrics unavailable".to_vec(),
            )
        }
    }
}
