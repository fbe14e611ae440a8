//! Account route handlers.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use device_warranty_core::{UserId, UserRole};

use super::extract::ApiJson;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, UpdateUserRequest, User,
};
use crate::state::AppState;

/// Optional header naming the account a password change is meant for.
///
/// Clients send it as `userId`; header names are matched case-insensitively.
pub const USER_ID_HEADER: &str = "userid";

/// All `USER` accounts. Administrators are not listed.
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<User>>> {
    Ok(Json(state.accounts().list_users().await?))
}

/// Register an account together with its first device.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<Json<LoginResponse>> {
    let serial = request.device_serial_number.clone();
    let response = state.accounts().register(request).await?;

    tracing::info!(
        user_id = %response.user.id,
        serial = %serial,
        "Account registered"
    );
    Ok(Json(response))
}

/// Log in with an email or phone number and a password.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let response = state
        .accounts()
        .login(&request.username, &request.password)
        .await
        .inspect_err(|e| tracing::debug!(error = %e, "Login rejected"))?;

    tracing::info!(user_id = %response.user.id, "User logged in");
    Ok(Json(response))
}

/// The calling account.
pub async fn me(RequireAuth(user): RequireAuth) -> Json<User> {
    Json(user)
}

/// Update a profile. Plain users may only update themselves.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Json<User>> {
    match caller.role {
        UserRole::Admin => {}
        UserRole::User if caller.id == request.id => {}
        UserRole::User => {
            return Err(AppError::Forbidden(
                "cannot update another account".to_owned(),
            ));
        }
    }

    let user = state.accounts().update_user(request).await?;
    tracing::info!(user_id = %user.id, caller_id = %caller.id, "Profile updated");
    Ok(Json(user))
}

/// Change the caller's password.
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    headers: HeaderMap,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<StatusCode> {
    if let Some(target) = target_user_id(&headers)?
        && target != caller.id
    {
        return Err(AppError::Forbidden(
            "cannot change another account's password".to_owned(),
        ));
    }

    state.accounts().update_password(caller.id, &request).await?;
    tracing::info!(user_id = %caller.id, "Password changed");
    Ok(StatusCode::OK)
}

fn target_user_id(headers: &HeaderMap) -> Result<Option<UserId>> {
    headers
        .get(USER_ID_HEADER)
        .map(|value| {
            value
                .to_str()
                .ok()
                .and_then(|s| s.parse::<UserId>().ok())
                .ok_or_else(|| AppError::BadRequest(format!("invalid {USER_ID_HEADER} header")))
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_target_user_id_header() {
        let mut headers = HeaderMap::new();
        assert!(target_user_id(&headers).unwrap().is_none());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("42"));
        assert_eq!(target_user_id(&headers).unwrap(), Some(UserId::new(42)));

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("abc"));
        assert!(matches!(
            target_user_id(&headers),
            Err(AppError::BadRequest(_))
        ));
    }
}
