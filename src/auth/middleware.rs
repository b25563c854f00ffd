use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::auth::jwt::verify_identity_token;
use crate::error::AppError;
use crate::AppState;

/// Caller identity as established by the identity provider. Handlers map it to
/// an internal user row.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity_id: String,
    pub email: Option<String>,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let claims = verify_identity_token(token, &state.config)?;

    let auth_user = AuthUser {
        identity_id: claims.sub,
        email: claims.email.filter(|e| !e.is_empty()),
    };

    req.extensions_mut().insert(auth_user);
    Ok(next.run(req).await)
}
