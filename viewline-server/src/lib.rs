use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
};

use axum::{response::IntoResponse, routing::get, Json};
use chrono::Utc;
use log::info;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod achievements;
mod benefits;
mod context;
mod devices;
mod errors;
mod logging;
mod ratings;
mod rewards;
mod schemas;
mod serialized;
mod sessions;

pub use context::ServerContext;
pub use errors::{ServerError, ServerResult};
pub use logging::init_logger;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 5000;

pub type Router = axum::Router<ServerContext>;

/// Starts the viewline server
pub async fn run_server(context: ServerContext) {
    let port = env::var("VIEWLINE_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .merge(devices::router())
        .merge(sessions::router())
        .merge(ratings::router())
        .merge(benefits::router())
        .merge(achievements::router())
        .merge(rewards::router());

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .route("/health", get(health))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on port {}", port);

    axum::serve(listener, root_router.into_make_service())
        .await
        .unwrap();
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "viewline",
        "timestamp": Utc::now(),
    }))
}
