use std::sync::{Arc, Mutex};

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use notedesk::config::{AppConfig, DEFAULT_API_TOKEN};
use notedesk::db;
use notedesk::handlers;
use notedesk::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    if config.api_token == DEFAULT_API_TOKEN {
        tracing::warn!("API_TOKEN is not set, using the default token");
    }

    let conn = db::init_db(&config.database_url)?;

    let cors = match &config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
    });

    let app = handlers::app(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
