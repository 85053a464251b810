use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::Role;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden("role not allowed".to_string()))
        }
    }
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("invalid or expired token".to_string()))
}

/// Token minting lives with the auth service; this helper exists for local
/// development and test fixtures only.
pub fn issue_token(secret: &str, user_id: Uuid, role: Role) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id,
        role,
        exp: (Utc::now() + Duration::hours(24)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| AppError::Internal(format!("failed to sign token: {err}")))
}

pub fn bearer_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|raw| raw.strip_prefix("Bearer ").unwrap_or(raw).to_string())
}

/// Verified caller identity, extracted from the bearer token. Authorization
/// is rejected before any state mutation happens.
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_from_headers(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
        let claims = verify_token(&state.jwt_secret, &token)?;
        Ok(AuthUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{issue_token, verify_token};
    use crate::models::user::Role;

    #[test]
    fn token_round_trips_subject_and_role() {
        let user_id = Uuid::new_v4();
        let token = issue_token("test-secret", user_id, Role::Customer).unwrap();

        let claims = verify_token("test-secret", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Customer);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("secret-one", Uuid::new_v4(), Role::Ops).unwrap();
        assert!(verify_token("secret-two", &token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify_token("test-secret", "not.a.token").is_err());
    }
}
