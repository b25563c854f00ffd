use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::handlers;
use crate::AppState;

fn cors(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins()
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

pub fn app(state: AppState) -> Router {
    let contact_routes = Router::new()
        .route("/api/contact", post(handlers::contact::submit_contact))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_contact,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .merge(contact_routes);

    // Routes that call the text-generation service. The limiter needs the
    // caller identity, so these are merged under `require_auth` below.
    let generation_routes = Router::new()
        .route(
            "/api/plans/:kind/generate",
            post(handlers::plans::generate_plan),
        )
        .route("/api/chat", post(handlers::chat::send_message))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_generation,
        ));

    let protected_routes = Router::new()
        // Profile & dashboard
        .route(
            "/api/profile",
            get(handlers::profile::get_profile).put(handlers::profile::upsert_profile),
        )
        .route("/api/dashboard", get(handlers::dashboard::get_dashboard))
        // Activity logs
        .route(
            "/api/workouts",
            get(handlers::activity::list_workouts).post(handlers::activity::create_workout),
        )
        .route(
            "/api/workouts/:id",
            delete(handlers::activity::delete_workout),
        )
        .route(
            "/api/meals",
            get(handlers::activity::list_meals).post(handlers::activity::create_meal),
        )
        .route("/api/meals/:id", delete(handlers::activity::delete_meal))
        .route(
            "/api/habits",
            get(handlers::activity::list_habits).post(handlers::activity::create_habit),
        )
        .route("/api/habits/:id", delete(handlers::activity::delete_habit))
        // Plans
        .route(
            "/api/plans/:kind",
            get(handlers::plans::get_plan).put(handlers::plans::save_plan),
        )
        // Chat history
        .route("/api/chat", get(handlers::chat::get_conversations))
        .merge(generation_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let cors = cors(&state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::connect_info::MockConnectInfo,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::auth::jwt::testing::issue_token;
    use crate::auth::rate_limit::RateLimitState;
    use crate::config::Config;
    use crate::services::ai::testing::StaticGenerator;

    // The pool never connects: every request below is answered before a
    // query runs.
    fn test_app() -> Router {
        let config = Config::for_tests();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let state = AppState {
            db,
            config: Arc::new(config),
            ai: Arc::new(StaticGenerator::replying("Keep going!")),
            rate_limiter: RateLimitState::new(),
        };
        app(state).layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4000))))
    }

    fn bearer() -> String {
        let token = issue_token(
            "user_abc",
            "test-identity-secret",
            chrono::Duration::hours(1),
            None,
        );
        format!("Bearer {token}")
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let resp = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "fitcoach-api");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        for uri in ["/api/dashboard", "/api/profile", "/api/workouts", "/api/chat"] {
            let resp = test_app()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_bad_token_rejected() {
        let resp = test_app()
            .oneshot(
                Request::get("/api/dashboard")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["code"], 401);
    }

    #[tokio::test]
    async fn test_unknown_plan_kind_rejected() {
        let resp = test_app()
            .oneshot(
                Request::get("/api/plans/snack")
                    .header(header::AUTHORIZATION, bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_chat_message_rejected() {
        let auth = bearer();
        let resp = test_app()
            .oneshot(post_json("/api/chat", Some(&auth), json!({"message": "   "})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["message"], "Message required");
    }

    #[tokio::test]
    async fn test_generation_routes_rate_limited_per_user() {
        let app = test_app();
        let auth = bearer();
        for _ in 0..10 {
            let resp = app
                .clone()
                .oneshot(post_json("/api/chat", Some(&auth), json!({"message": ""})))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
        let resp = app
            .oneshot(post_json("/api/chat", Some(&auth), json!({"message": ""})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_contact_validates_and_rate_limits_per_ip() {
        let app = test_app();
        let invalid = json!({"name": "Sam", "email": "nope", "message": "short"});
        for _ in 0..5 {
            let resp = app
                .clone()
                .oneshot(post_json("/api/contact", None, invalid.clone()))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
        let resp = app
            .oneshot(post_json("/api/contact", None, invalid))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
