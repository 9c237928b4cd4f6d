//! Request body extraction.
//!
//! axum's own `Json` answers a bad body with a plain-text 422. The portal
//! expects every 4xx in the API's JSON error shape, so handlers take
//! [`JsonBody`] instead.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// A JSON request body whose rejections convert into [`ApiError`].
///
/// ```text
/// not JSON / wrong shape     → 400 {"non_field_errors": ["..."]}
/// no application/json header → 415 {"detail": "..."}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(inner) => ApiError::UnsupportedMediaType(inner.body_text()),
            other => ApiError::malformed_body(other.body_text()),
        }
    }
}
