//! Bearer-token authentication extractors.
//!
//! The checks run in a fixed order so each failure gets its own status:
//!
//! | check                              | outcome              |
//! |------------------------------------|----------------------|
//! | no `Authorization: Bearer` header  | 401, `Unauthorized`  |
//! | token unparseable / bad signature  | 401, `MalformedToken`|
//! | token expired                      | 401, `Unauthorized`  |
//! | subject is not a known account     | 401, `Unauthorized`  |
//! | token not bound to that account    | 403, `Forbidden`     |

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use device_warranty_core::{UserId, UserRole};

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::ServiceError;
use crate::state::AppState;

/// The token from an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(RequireAuth(user): RequireAuth) -> Json<User> {
///     Json(user)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_owned()))?;
        let tokens = state.tokens();

        let subject = tokens.extract_id(token)?;
        if tokens.is_expired(token) {
            return Err(AppError::Unauthorized("token expired".to_owned()));
        }

        let unknown = || AppError::Unauthorized("unknown account".to_owned());
        let id: UserId = subject.parse().map_err(|_| unknown())?;
        let user = match state.accounts().get_user(id).await {
            Ok(user) => user,
            Err(ServiceError::NotFound(_)) => return Err(unknown()),
            Err(e) => return Err(e.into()),
        };

        if !tokens.verify(token, &user) {
            return Err(AppError::Forbidden(
                "token is not valid for this account".to_owned(),
            ));
        }

        tracing::Span::current().record("user_id", id.as_i64());
        set_sentry_user(&id, Some(user.email.as_str()));

        Ok(Self(user))
    }
}

/// Extractor that requires a valid bearer token for an `ADMIN` account.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        match user.role {
            UserRole::Admin => Ok(Self(user)),
            UserRole::User => Err(AppError::Forbidden(
                "administrator role required".to_owned(),
            )),
        }
    }
}
