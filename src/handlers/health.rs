use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "fitcoach-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness hinges on the database. Plan and chat generation degrade to
/// fallback text without a Gemini key, so that is reported but not fatal.
fn readiness(database_ok: bool, gemini_configured: bool) -> (StatusCode, Value) {
    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = json!({
        "status": if database_ok { "ready" } else { "not_ready" },
        "checks": {
            "database": if database_ok { "ok" } else { "failed" },
            "generation": if gemini_configured { "gemini" } else { "fallback_only" },
        },
    });
    (status, body)
}

pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();
    let gemini_configured = !state.config.gemini_api_key.is_empty();

    if !database_ok {
        tracing::warn!("Readiness check failed: database unreachable");
    }

    let (status, body) = readiness(database_ok, gemini_configured);
    (status, Json(body))
}
