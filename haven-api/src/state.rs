//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use haven_storage::ObjectStore;

use crate::config::ApiConfig;
use crate::db::DbClient;
use crate::ws::WsState;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub db: DbClient,
    pub ws: Arc<WsState>,
    /// Object store holding attachment blobs.
    pub objects: Arc<dyn ObjectStore>,
    pub config: ApiConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(db: DbClient, objects: Arc<dyn ObjectStore>, config: ApiConfig) -> Self {
        Self {
            db,
            ws: Arc::new(WsState::new(config.ws_capacity)),
            objects,
            config,
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(DbClient, db);
crate::impl_from_ref!(Arc<WsState>, ws);
crate::impl_from_ref!(Arc<dyn ObjectStore>, objects);
crate::impl_from_ref!(ApiConfig, config);
crate::impl_from_ref!(Instant, start_time);
