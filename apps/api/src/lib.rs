//! # Mizhiwu API
//!
//! HTTP JSON server for the account portal.
//!
//! ## Routes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Routes                                     │
//! │                                                                         │
//! │  ┌──────────────────────────────┐  ┌──────────────────────────────────┐│
//! │  │  /api/users/                 │  │  /api/invitecodes/               ││
//! │  │                              │  │                                  ││
//! │  │ • POST   register (public)   │  │ • POST   issue                   ││
//! │  │ • GET    list (staff)        │  │ • GET    list (staff)            ││
//! │  │ • GET    {id}/               │  │ • GET    mine/                   ││
//! │  │ • GET    {id}/ssconfig/      │  │ • GET    {id}/ (owner or staff)  ││
//! │  │ • GET    {id}/ssusage/       │  └──────────────────────────────────┘│
//! │  │ • PUT    {id}/moneycode/{c}/ │                                      │
//! │  │ • PUT    {id}/goods/{g}/     │  ┌──────────────────────────────────┐│
//! │  └──────────────────────────────┘  │  /api/goods/  (public)           ││
//! │                                    │  /api/purchases/                 ││
//! │  ┌──────────────────────────────┐  │  /health                         ││
//! │  │  /api/auth/token/  (login)   │  └──────────────────────────────────┘│
//! │  │  /api/auth/refresh/          │                                      │
//! │  └──────────────────────────────┘                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables, see [`config::PortalConfig`]:
//! - `HTTP_PORT` - listen port (default: 8000)
//! - `BIND_ADDR` - listen interface (default: 0.0.0.0)
//! - `DATABASE_PATH` - SQLite file (default: ./mizhiwu.db)
//! - `DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `JWT_ACCESS_LIFETIME_SECS` - Access token lifetime (default: 86400)
//! - `BASE_PORT` - first service port (default: 10000)
//! - `DEFAULT_INVITECODE_NUM` - invite cap for new accounts (default: 5)

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use mizhiwu_db::{Database, Ledger};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;

// Re-exports
pub use auth::{AuthUser, JwtManager};
pub use config::PortalConfig;
pub use error::{ApiError, ApiResult};
pub use extract::JsonBody;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub ledger: Ledger,
    pub config: PortalConfig,
    pub jwt: JwtManager,
}

impl AppState {
    pub fn new(db: Database, config: PortalConfig) -> Self {
        AppState {
            ledger: db.ledger(config.ledger_settings()),
            jwt: JwtManager::new(config.jwt_secret.clone(), config.jwt_access_lifetime_secs),
            db,
            config,
        }
    }
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    use handlers::{auth, goods, health, invite_codes, purchases, users};

    Router::new()
        .route("/health", get(health::health))
        .route("/api/users/", post(users::register).get(users::list))
        .route("/api/users/{id}/", get(users::retrieve))
        .route("/api/users/{id}/ssconfig/", get(users::ssconfig))
        .route("/api/users/{id}/ssusage/", get(users::ssusage))
        .route("/api/users/{id}/moneycode/{code}/", put(users::charge))
        .route("/api/users/{id}/goods/{good}/", put(users::purchase))
        .route("/api/invitecodes/", post(invite_codes::issue).get(invite_codes::list))
        .route("/api/invitecodes/mine/", get(invite_codes::mine))
        .route("/api/invitecodes/{id}/", get(invite_codes::retrieve))
        .route("/api/goods/", get(goods::list))
        .route("/api/purchases/", get(purchases::list))
        .route("/api/auth/token/", post(auth::token))
        .route("/api/auth/refresh/", post(auth::refresh))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
