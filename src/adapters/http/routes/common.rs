use axum::http::HeaderMap;
use serde::Deserialize;

use crate::adapters::http::app_state::AppState;
use crate::application::app_error::{AppError, AppResult};
use crate::application::jwt::{self, Claims};

/// Path parameters of the entity-scoped routes.
#[derive(Debug, Deserialize)]
pub struct EntityPath {
    pub entity_type: String,
    pub entity_id: i64,
}

/// Verifies the `Authorization: Bearer` token and returns its claims.
pub fn bearer_claims(headers: &HeaderMap, app_state: &AppState) -> AppResult<Claims> {
    let token = headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::InvalidCredentials)?;
    jwt::verify(token, &app_state.config.jwt_secret)
}
