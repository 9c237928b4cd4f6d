//! Request handlers, one module per resource.
//!
//! Handlers parse the request, check who is calling, and hand off to
//! `mizhiwu_db`. Errors convert into [`crate::ApiError`] with `?`.

pub mod auth;
pub mod goods;
pub mod health;
pub mod invite_codes;
pub mod purchases;
pub mod users;
