use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// RSA private key (PEM) used to sign access tokens.
    pub sign_key: String,
    /// RSA public key (PEM) used to verify access tokens.
    pub verification_key: String,
    pub max_age_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub graphiql: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let database_max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let jwt = JwtConfig {
            sign_key: pem_from_env("JWT_SIGN_KEY")?,
            verification_key: pem_from_env("JWT_VERIFICATION_KEY")?,
            max_age_minutes: std::env::var("JWT_MAX_AGE_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 30),
        };

        let storage = StorageConfig {
            endpoint: std::env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT")?,
            bucket: std::env::var("MINIO_BUCKET").context("MINIO_BUCKET")?,
            access_key: std::env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY")?,
            secret_key: std::env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY")?,
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
        };

        let graphiql = std::env::var("APP_ENV")
            .map(|v| v != "production")
            .unwrap_or(true);

        Ok(Self {
            database_url,
            database_max_connections,
            jwt,
            storage,
            graphiql,
        })
    }
}

// Env files usually carry PEM blocks on one line with escaped newlines.
fn pem_from_env(key: &str) -> anyhow::Result<String> {
    let raw = std::env::var(key).with_context(|| key.to_string())?;
    Ok(expand_newlines(&raw))
}

fn expand_newlines(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaped_pem_newlines_are_expanded() {
        let raw = "-----BEGIN PUBLIC KEY-----\\nAAAA\\n-----END PUBLIC KEY-----";
        let pem = expand_newlines(raw);
        assert_eq!(pem.lines().count(), 3);
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----\n"));
    }

    #[test]
    fn real_newlines_are_left_alone() {
        let raw = "line one\nline two";
        assert_eq!(expand_newlines(raw), raw);
    }
}
