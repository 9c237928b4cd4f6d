use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use mizhiwu_core::views::PurchaseView;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

/// The caller's purchase history, newest first.
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<Vec<PurchaseView>>> {
    let rows = state.db.purchases().list_by_user(caller.id).await?;
    Ok(Json(rows.iter().map(PurchaseView::from).collect()))
}
