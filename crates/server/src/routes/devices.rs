//! Device route handlers.

use axum::{Json, extract::State};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Device;
use crate::state::AppState;

/// Devices registered to the calling account.
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Device>>> {
    let devices = state.device_service().devices_for_user(user.id).await?;
    Ok(Json(devices))
}
