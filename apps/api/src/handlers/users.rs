//! `/api/users/` handlers.
//!
//! ## Identity on charge and purchase
//! ```text
//! PUT /api/users/{id}/moneycode/{code}/   body {"code": "..."}
//!                 │            │                  │
//!                 │            └── ignored        └── the code redeemed
//!                 └── must name an account (404), but the balance that
//!                     changes is the caller's
//! ```

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mizhiwu_core::views::{ChargeReceipt, PurchaseReceipt, Registered, UserInfo, UserSsConfig, UserSsUsage};
use mizhiwu_core::{form_text, RegistrationForm, User, ValidationError};
use serde::Deserialize;
use tracing::debug;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChargeBody {
    #[serde(deserialize_with = "form_text")]
    pub code: String,
}

/// A goods reference as the portal sends it: a JSON number or a string.
///
/// Any other JSON value is kept as its JSON text, which never names a
/// catalogue entry and so reads as "goods not found".
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GoodsRef {
    Id(i64),
    Text(String),
    Other(serde_json::Value),
}

impl GoodsRef {
    fn to_text(&self) -> String {
        match self {
            GoodsRef::Id(id) => id.to_string(),
            GoodsRef::Text(text) => text.clone(),
            GoodsRef::Other(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PurchaseBody {
    pub good: Option<GoodsRef>,
}

/// Loads the account named in the path, 404 if it does not exist.
async fn path_user(state: &AppState, id: i64) -> ApiResult<User> {
    state.db.users().get_by_id(id).await?.ok_or(ApiError::NotFound)
}

/// Loads the account named in the path and checks the caller may see its
/// private views.
async fn owned_user(state: &AppState, caller: &AuthUser, id: i64) -> ApiResult<User> {
    let user = path_user(state, id).await?;
    if !user.visible_to(&caller.actor()) {
        return Err(ApiError::PermissionDenied);
    }
    Ok(user)
}

// =============================================================================
// Registration
// =============================================================================

/// `POST /api/users/`: sign up with an invite code.
pub async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(form): JsonBody<RegistrationForm>,
) -> ApiResult<(StatusCode, Json<Registered>)> {
    let user = state.ledger.register(&form).await?;
    let token = state.jwt.generate_access_token(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(Registered {
            id: user.id,
            username: user.username,
            email: user.email,
            token,
        }),
    ))
}

// =============================================================================
// Reads
// =============================================================================

/// `GET /api/users/`: every account (staff only).
pub async fn list(State(state): State<Arc<AppState>>, caller: AuthUser) -> ApiResult<Json<Vec<UserInfo>>> {
    caller.require_staff()?;
    let users = state.db.users().list().await?;
    Ok(Json(users.iter().map(UserInfo::from).collect()))
}

/// `GET /api/users/{id}/`
pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    _caller: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserInfo>> {
    let user = path_user(&state, id).await?;
    Ok(Json(UserInfo::from(&user)))
}

/// `GET /api/users/{id}/ssconfig/`
pub async fn ssconfig(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserSsConfig>> {
    let user = owned_user(&state, &caller, id).await?;
    Ok(Json(UserSsConfig::from(&user)))
}

/// `GET /api/users/{id}/ssusage/`
pub async fn ssusage(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserSsUsage>> {
    let user = owned_user(&state, &caller, id).await?;
    Ok(Json(UserSsUsage::from(&user)))
}

// =============================================================================
// Charge & Purchase
// =============================================================================

/// `PUT /api/users/{id}/moneycode/{code}/`: redeem the body's money code
/// onto the caller's balance.
pub async fn charge(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path((id, _path_code)): Path<(i64, String)>,
    JsonBody(body): JsonBody<ChargeBody>,
) -> ApiResult<Json<ChargeReceipt>> {
    path_user(&state, id).await?;
    if id != caller.id {
        debug!(path_id = id, caller_id = caller.id, "Charging the caller, not the path account");
    }

    let receipt = state.ledger.charge(caller.id, &body.code).await?;
    Ok(Json(receipt))
}

/// `PUT /api/users/{id}/goods/{good}/`: buy the body's goods for the caller.
pub async fn purchase(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path((id, _path_good)): Path<(i64, String)>,
    JsonBody(body): JsonBody<PurchaseBody>,
) -> ApiResult<Json<PurchaseReceipt>> {
    path_user(&state, id).await?;

    let good = body.good.ok_or_else(|| ValidationError::Required {
        field: "good".to_string(),
    })?;

    let receipt = state.ledger.purchase(caller.id, &good.to_text()).await?;
    Ok(Json(receipt))
}
