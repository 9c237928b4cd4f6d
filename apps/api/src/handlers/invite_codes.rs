use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mizhiwu_core::form_text;
use mizhiwu_core::views::{InviteCodeView, IssuedInviteCode};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IssueBody {
    /// Username the new code belongs to.
    #[serde(deserialize_with = "form_text")]
    pub owner: String,
}

/// `POST /api/invitecodes/`
pub async fn issue(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    JsonBody(body): JsonBody<IssueBody>,
) -> ApiResult<(StatusCode, Json<IssuedInviteCode>)> {
    let issued = state.ledger.issue_invite_code(&caller.actor(), &body.owner).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// `GET /api/invitecodes/` (staff only)
pub async fn list(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
) -> ApiResult<Json<Vec<InviteCodeView>>> {
    caller.require_staff()?;
    let codes = state.db.invite_codes().list().await?;
    Ok(Json(codes.iter().map(InviteCodeView::from).collect()))
}

/// `GET /api/invitecodes/mine/`
pub async fn mine(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<Vec<InviteCodeView>>> {
    let codes = state.db.invite_codes().list_by_owner(caller.id).await?;
    Ok(Json(codes.iter().map(InviteCodeView::from).collect()))
}

/// `GET /api/invitecodes/{id}/` (owner or staff)
pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<InviteCodeView>> {
    let code = state
        .db
        .invite_codes()
        .get_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !caller.actor().can_access(code.owner_id) {
        return Err(ApiError::PermissionDenied);
    }

    Ok(Json(InviteCodeView::from(&code)))
}
