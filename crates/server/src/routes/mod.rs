//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Readiness (database ping)
//!
//! # Accounts
//! GET  /api/v1/users                   - List USER accounts (admin)
//! POST /api/v1/users/registration      - Register account + first device
//! POST /api/v1/users/login             - Exchange credentials for a token
//! GET  /api/v1/users/me                - Current account (auth)
//! PUT  /api/v1/users/update            - Update profile (auth)
//! PUT  /api/v1/users/changePassword    - Change password (auth)
//!
//! # Devices
//! GET  /api/v1/devices/mine            - Devices of the current account (auth)
//!
//! # Passports
//! GET    /api/v1/passports             - List (auth)
//! POST   /api/v1/passports             - Create (admin)
//! GET    /api/v1/passports/{id}        - Show (auth)
//! PUT    /api/v1/passports/{id}        - Replace (admin)
//! DELETE /api/v1/passports/{id}        - Delete (admin)
//! ```

pub mod devices;
pub mod extract;
pub mod health;
pub mod passports;
pub mod users;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the account routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index))
        .route("/registration", post(users::register))
        .route("/login", post(users::login))
        .route("/me", get(users::me))
        .route("/update", put(users::update))
        .route("/changePassword", put(users::change_password))
}

/// Create the device routes router.
pub fn device_routes() -> Router<AppState> {
    Router::new().route("/mine", get(devices::mine))
}

/// Create the passport routes router.
pub fn passport_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(passports::index).post(passports::create))
        .route(
            "/{id}",
            get(passports::show)
                .put(passports::update)
                .delete(passports::destroy),
        )
}

/// Create all `/api/v1` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes())
        .nest("/devices", device_routes())
        .nest("/passports", passport_routes())
}

/// Create the health check routes.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}
