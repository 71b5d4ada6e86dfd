use crate::config::AppConfig;
use crate::forwarding::ForwardingService;
use crate::shared::utils::DbPool;
use std::sync::Arc;

/// Shared application state handed to every route handler. The forwarding
/// service is wired once at startup with its store and channel dependencies;
/// nothing mutates them afterwards.
pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub forwarder: Arc<ForwardingService>,
}
