//! Passport route handlers. Reads need a token, writes need `ADMIN`.

use axum::{Json, extract::State, http::StatusCode};

use device_warranty_core::PassportId;

use super::extract::{ApiJson, ApiPath};
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{Passport, PassportDraft};
use crate::state::AppState;

pub async fn index(
    State(state): State<AppState>,
    RequireAuth(_): RequireAuth,
) -> Result<Json<Vec<Passport>>> {
    Ok(Json(state.passport_service().list().await?))
}

pub async fn show(
    State(state): State<AppState>,
    RequireAuth(_): RequireAuth,
    ApiPath(id): ApiPath<PassportId>,
) -> Result<Json<Passport>> {
    Ok(Json(state.passport_service().get(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(draft): ApiJson<PassportDraft>,
) -> Result<(StatusCode, Json<Passport>)> {
    let passport = state.passport_service().create(draft).await?;
    tracing::info!(
        passport_id = %passport.id,
        admin_id = %admin.id,
        prefix = %passport.serial_prefix,
        "Passport created"
    );
    Ok((StatusCode::CREATED, Json(passport)))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<PassportId>,
    ApiJson(draft): ApiJson<PassportDraft>,
) -> Result<Json<Passport>> {
    let passport = state.passport_service().update(id, draft).await?;
    tracing::info!(passport_id = %id, admin_id = %admin.id, "Passport updated");
    Ok(Json(passport))
}

pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<PassportId>,
) -> Result<StatusCode> {
    state.passport_service().delete(id).await?;
    tracing::info!(passport_id = %id, admin_id = %admin.id, "Passport deleted");
    Ok(StatusCode::NO_CONTENT)
}
