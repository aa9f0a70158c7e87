use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    jwt::{JwtKeys, TokenError},
    password::{self, PasswordError},
    repo::UserRepository,
    repo_types::User,
};
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user with username '{0}' not found")]
    UsernameNotFound(String),
    #[error("user with uuid '{0}' not found")]
    UserNotFound(Uuid),
    #[error("invalid password received")]
    InvalidCredentials,
    #[error("token rejected: {0}")]
    Unauthenticated(#[from] TokenError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            // Same wording for both login failures; only the code differs.
            AuthError::UsernameNotFound(_) => {
                AppError::NotFound(AppError::InvalidCredentials.to_string())
            }
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::UserNotFound(uuid) => {
                AppError::NotFound(format!("user with uuid '{uuid}' not found"))
            }
            AuthError::Unauthenticated(_) => AppError::unauthorized(),
            AuthError::Internal(e) => AppError::Internal(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub access_token: String,
    pub user_uuid: Uuid,
}

/// Turns credentials or bearer tokens into user identities.
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    keys: Arc<JwtKeys>,
}

impl IdentityService {
    pub fn new(users: Arc<dyn UserRepository>, keys: Arc<JwtKeys>) -> Self {
        Self { users, keys }
    }

    #[instrument(skip(self, secret))]
    pub async fn login(&self, username: &str, secret: &str) -> Result<LoginOutcome, AuthError> {
        let user = self
            .users
            .find_by_username(username)
            .await
            .context("error on find by username")?
            .ok_or_else(|| {
                warn!("login unknown username");
                AuthError::UsernameNotFound(username.to_string())
            })?;

        // Adaptive hashing is CPU bound; keep it off the async workers.
        let stored = user.password_hash.clone();
        let submitted = secret.to_string();
        let checked = tokio::task::spawn_blocking(move || password::check(&stored, &submitted))
            .await
            .context("password check task")?;
        match checked {
            Ok(()) => {}
            Err(PasswordError::Mismatch) => {
                warn!(user_uuid = %user.uuid, "login invalid password");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(anyhow::Error::new(e).context("error on compare hash").into()),
        }

        let access_token = self
            .keys
            .issue(user.uuid, Uuid::new_v4(), OffsetDateTime::now_utc())
            .context("error on sign token")?;

        info!(user_uuid = %user.uuid, "user logged in");
        Ok(LoginOutcome {
            access_token,
            user_uuid: user.uuid,
        })
    }

    #[instrument(skip_all)]
    pub async fn identity_from_token(&self, token: &str) -> Result<Uuid, AuthError> {
        let subject = self.keys.parse_subject(token).map_err(|e| {
            warn!(error = %e, "bearer token rejected");
            AuthError::Unauthenticated(e)
        })?;
        let user = self.identity_from_uuid(subject).await?;
        Ok(user.uuid)
    }

    pub async fn identity_from_uuid(&self, uuid: Uuid) -> Result<User, AuthError> {
        self.users
            .find_by_uuid(uuid)
            .await
            .context("error on find user by uuid")?
            .ok_or(AuthError::UserNotFound(uuid))
    }
}
