use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

/// Identity of the caller, if any. Absent header means anonymous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewer(pub Option<Uuid>);

impl Viewer {
    pub fn require(&self) -> Result<Uuid, AppError> {
        self.0.ok_or_else(AppError::unauthorized)
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

/// Returns the bearer token, `None` for a missing header, or an error for any
/// other scheme.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let unsupported = || AppError::Unauthorized("unsupported authorization header".into());
    let value = value.to_str().map_err(|_| unsupported())?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => Ok(Some(token.trim())),
        _ => Err(unsupported()),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts)? else {
            return Ok(Viewer(None));
        };
        match state.identity.identity_from_token(token).await {
            Ok(user_uuid) => Ok(Viewer(Some(user_uuid))),
            Err(e) => {
                warn!(error = %e, "invalid authorization header");
                Err(AppError::Unauthorized("invalid authorization header".into()))
            }
        }
    }
}

/// Extracts and validates the bearer token, returning the user ID.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let viewer = Viewer::from_request_parts(parts, state).await?;
        viewer.require().map(AuthUser)
    }
}
