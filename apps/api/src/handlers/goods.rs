use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use mizhiwu_core::views::GoodsView;

use crate::error::ApiResult;
use crate::AppState;

/// Public goods catalogue, cheapest first.
pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<GoodsView>>> {
    let goods = state.db.goods().list().await?;
    Ok(Json(goods.iter().map(GoodsView::from).collect()))
}
