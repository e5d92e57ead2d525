use std::path::Path;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crush_api::auth::AppState;
use crush_api::routes;
use crush_gateway::connection;
use crush_gateway::relay::Relay;

/// Full application: login/match pages, chat gateway and static assets.
pub fn build_router(app: AppState, relay: Relay, static_dir: &Path) -> Router {
    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(relay);

    let static_routes = Router::new()
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/chat", ServeFile::new(static_dir.join("chat.html")))
        .route("/health", get(health))
        .fallback_service(ServeDir::new(static_dir));

    Router::new()
        .merge(routes::router(app))
        .merge(ws_route)
        .merge(static_routes)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_upgrade(State(relay): State<Relay>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, relay))
}
