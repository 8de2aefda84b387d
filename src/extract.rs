//! Request extractors for the acting principal and validated JSON bodies.

use access::Principal;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use validator::Validate;

use crate::error::ApiError;
use crate::schemas::AppState;

/// Header carrying the username authenticated by the upstream proxy.
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

/// The principal acting on this request, with groups loaded fresh from the
/// database.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get(REMOTE_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                debug!("Request without {} header", REMOTE_USER_HEADER);
                ApiError::Unauthenticated
            })?;

        trace!("Resolving principal {}", username);
        match Principal::load(&state.db, username).await? {
            Some(principal) => {
                debug!(
                    "Acting as {} (superuser: {}, groups: {:?})",
                    principal.username,
                    principal.is_superuser,
                    principal.group_names()
                );
                Ok(CurrentUser(principal))
            }
            None => {
                warn!("Unknown user {} in {} header", username, REMOTE_USER_HEADER);
                Err(ApiError::Unauthenticated)
            }
        }
    }
}

/// JSON body that has passed its `validator` rules.
///
/// Malformed JSON is reported as `INVALID_BODY`, rule violations as a
/// per-field `VALIDATION_ERROR`.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}
