use std::time::Duration;

use anyhow::Context;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::config::JwtConfig;

/// Tolerated drift between the issuing clock and ours, in seconds.
const CLOCK_SKEW_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signature does not match")]
    InvalidSignature,
    #[error("token is malformed: {0}")]
    Malformed(String),
    #[error("token is older than the allowed maximum age")]
    Expired,
    #[error("token is issued in the future")]
    IssuedInFuture,
    #[error("could not sign token: {0}")]
    Signing(String),
}

/// RS256 signing and verification keys.
///
/// The signing half is optional so verification-only deployments never need
/// to hold the private key.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: Option<EncodingKey>,
    decoding: DecodingKey,
    max_age: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> anyhow::Result<Self> {
        let keys = Self::verification_only(&cfg.verification_key, cfg.max_age_minutes)?;
        let encoding = EncodingKey::from_rsa_pem(cfg.sign_key.as_bytes())
            .context("parse JWT sign key")?;
        Ok(Self {
            encoding: Some(encoding),
            ..keys
        })
    }

    pub fn verification_only(public_pem: &str, max_age_minutes: i64) -> anyhow::Result<Self> {
        let decoding = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .context("parse JWT verification key")?;
        Ok(Self {
            encoding: None,
            decoding,
            max_age: Duration::from_secs(
                u64::try_from(max_age_minutes).unwrap_or(0).saturating_mul(60),
            ),
        })
    }

    pub fn issue(
        &self,
        user_id: Uuid,
        token_id: Uuid,
        issued_at: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let encoding = self
            .encoding
            .as_ref()
            .ok_or_else(|| TokenError::Signing("no sign key configured".into()))?;
        let claims = Claims {
            sub: user_id,
            iat: issued_at.unix_timestamp(),
            jti: token_id,
        };
        let token = encode(&Header::new(Algorithm::RS256), &claims, encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        debug!(user_id = %user_id, token_id = %token_id, "jwt signed");
        Ok(token)
    }

    /// Checks the signature, the maximum age and that `iat` is not ahead of
    /// our clock; the returned claims are the only way to read the subject.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;

        let now = OffsetDateTime::now_utc().unix_timestamp();
        if data.claims.iat > now.saturating_add(CLOCK_SKEW_SECS) {
            return Err(TokenError::IssuedInFuture);
        }
        let max_age = i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX);
        if now.saturating_sub(data.claims.iat) > max_age {
            return Err(TokenError::Expired);
        }

        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }

    pub fn parse_subject(&self, token: &str) -> Result<Uuid, TokenError> {
        self.verify(token).map(|claims| claims.subject())
    }
}
