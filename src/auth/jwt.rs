use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Session claims issued by the external identity provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IdentityClaims {
    /// Stable external user identifier.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub iss: Option<String>,
}

pub fn verify_identity_token(token: &str, config: &Config) -> AppResult<IdentityClaims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.validate_aud = false;
    if let Some(issuer) = &config.identity_issuer {
        validation.set_issuer(&[issuer]);
    }

    let data = decode::<IdentityClaims>(
        token,
        &DecodingKey::from_secret(config.identity_jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "Rejected identity token");
        AppError::Unauthorized
    })?;

    if data.claims.sub.trim().is_empty() {
        return Err(AppError::Unauthorized);
    }

    Ok(data.claims)
}
