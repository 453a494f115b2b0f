//! Haven API - REST/WebSocket layer for the shelter backend
//!
//! Exposes record CRUD over Axum, the decision and inventory workflows, and
//! a WebSocket change feed. Storage goes through `haven-storage` seams so
//! the domain services run unchanged against PostgreSQL or the in-memory
//! store used by the tests.

#[macro_use]
pub mod macros;

pub mod component;
pub mod components;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod events;
pub mod extractors;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod ws;

// Re-export commonly used types
pub use config::{ApiConfig, StorageConfig};
pub use db::{DbClient, DbConfig, PgTx};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use events::{ChangeAction, ChangeEvent};
pub use routes::create_api_router;
pub use state::AppState;
pub use ws::WsState;
