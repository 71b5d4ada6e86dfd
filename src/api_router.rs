//! Combines the module routers into the API surface served by main.

use crate::shared::state::AppState;
use axum::Router;
use std::sync::Arc;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::forwarding::configure())
        .merge(crate::routing_admin::configure())
}
