use dotenvy::dotenv;
use log::info;
use panelbridge::channels::{TelegramChannel, WhatsAppGateway};
use panelbridge::config::AppConfig;
use panelbridge::forwarding::ForwardingService;
use panelbridge::shared::state::AppState;
use panelbridge::shared::utils::create_conn;
use panelbridge::store::PgRoutingStore;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env()?;
    let pool = create_conn(&config.database_url)?;

    let store = Arc::new(PgRoutingStore::new(pool.clone()));
    let whatsapp = Arc::new(WhatsAppGateway::new(&config.whatsapp));
    let telegram = Arc::new(TelegramChannel::new());
    let forwarder = Arc::new(ForwardingService::new(store, whatsapp, telegram));

    let state = Arc::new(AppState {
        conn: pool,
        config: config.clone(),
        forwarder,
    });

    let app = panelbridge::api_router::configure_api_routes()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            panelbridge::auth::require_auth,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("panelbridge listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
