//! Token endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use mizhiwu_core::error::NON_FIELD_ERRORS;
use mizhiwu_core::{form_text, FieldErrors};
use mizhiwu_db::password::verify_password;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::AppState;

const BAD_CREDENTIALS: &str = "unable to log in with provided credentials";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginBody {
    #[serde(deserialize_with = "form_text")]
    pub username: String,
    #[serde(deserialize_with = "form_text")]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshBody {
    #[serde(deserialize_with = "form_text")]
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// `POST /api/auth/token/`: exchange username and password for a token.
pub async fn token(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<LoginBody>,
) -> ApiResult<Json<TokenResponse>> {
    let mut missing = FieldErrors::new();
    if body.username.trim().is_empty() {
        missing.add("username", "username is required");
    }
    if body.password.is_empty() {
        missing.add("password", "password is required");
    }
    missing.into_result()?;

    let user = state.db.users().get_by_username(body.username.trim()).await?;

    let verified = match &user {
        Some(user) => {
            let password = body.password;
            let hash = user.password_hash.clone();
            tokio::task::spawn_blocking(move || verify_password(&password, &hash))
                .await
                .map_err(|e| ApiError::Internal(format!("password check task failed: {}", e)))?
        }
        None => false,
    };

    let Some(user) = user.filter(|_| verified) else {
        warn!(username = %body.username, "Login rejected");
        return Err(FieldErrors::single(NON_FIELD_ERRORS, BAD_CREDENTIALS).into());
    };

    info!(user_id = user.id, "Login succeeded");
    Ok(Json(TokenResponse {
        token: state.jwt.generate_access_token(&user)?,
    }))
}

/// `POST /api/auth/refresh/`: trade a still-valid token for a fresh one.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<RefreshBody>,
) -> ApiResult<Json<TokenResponse>> {
    let claims = state.jwt.validate_access_token(body.token.trim())?;
    let user = state
        .db
        .users()
        .get_by_id(claims.user_id()?)
        .await?
        .ok_or_else(|| ApiError::unauthenticated("user not found"))?;

    Ok(Json(TokenResponse {
        token: state.jwt.generate_access_token(&user)?,
    }))
}
