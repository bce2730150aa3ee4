use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::entities::user;

/// JWT claims embedded in session tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user ID as a UUID string.
    pub sub: String,
    /// Account email, carried for logging and support tooling.
    pub email: String,
    /// User role: `"user"` or `"admin"`.
    pub role: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued-at time (Unix timestamp).
    pub iat: i64,
}

/// Generate a session token for the given account.
///
/// # Errors
///
/// Returns an error if JWT encoding fails.
pub fn generate_token(user_model: &user::Model, config: &Config) -> anyhow::Result<String> {
    let now = Utc::now();

    #[allow(clippy::cast_possible_wrap)]
    let exp = now.timestamp() + config.jwt_expiration_secs as i64;

    let claims = Claims {
        sub: user_model.id.to_string(),
        email: user_model.email.clone(),
        role: user_model.role.clone(),
        exp,
        iat: now.timestamp(),
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    encode(&Header::default(), &claims, &key)
        .map_err(|e| anyhow::anyhow!("Failed to encode session token: {e}"))
}

/// Validate a session token and return its claims.
///
/// # Errors
///
/// Returns an error if the token is invalid or expired.
pub fn validate_token(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &key, &validation)
        .map_err(|e| anyhow::anyhow!("Invalid session token: {e}"))?;

    Ok(token_data.claims)
}

/// Parse the subject claim back into a user ID.
///
/// # Errors
///
/// Returns an error if the subject is not a valid UUID.
pub fn subject_id(claims: &Claims) -> anyhow::Result<Uuid> {
    claims
        .sub
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid token subject"))
}
