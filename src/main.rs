use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

mod auth;
mod config;
mod db;
mod dto;
mod error;
mod handlers;
mod models;
mod routes;
mod services;

use auth::rate_limit::RateLimitState;
use config::Config;
use services::ai::{GeminiClient, TextGenerator};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub ai: Arc<dyn TextGenerator>,
    pub rate_limiter: RateLimitState,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitcoach_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let gemini = GeminiClient::from_config(&config).context("Failed to build Gemini client")?;
    if config.gemini_api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY not set, generation endpoints will return fallback text");
    }

    let rate_limiter = RateLimitState::new();
    rate_limiter.spawn_cleanup_worker();

    let state = AppState {
        db,
        config: config.clone(),
        ai: Arc::new(gemini),
        rate_limiter,
    };

    let app = routes::app(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    // Client IPs feed the contact form rate limit.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
