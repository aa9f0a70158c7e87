use argon2::{
    password_hash::{self, PasswordHash, PasswordVerifier},
    Argon2,
};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password does not match")]
    Mismatch,
    #[error("stored password hash is unusable: {0}")]
    Hash(String),
}

/// Hashes a new secret as an argon2 PHC string.
#[cfg(test)]
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    use argon2::password_hash::{PasswordHasher, SaltString};
    use rand::rngs::OsRng;

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            PasswordError::Hash(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Compares a submitted secret against a stored hash. Argon2 PHC strings
/// and `$2a$`/`$2b$`/`$2y$` bcrypt hashes are both accepted.
pub fn check(stored_hash: &str, submitted: &str) -> Result<(), PasswordError> {
    if stored_hash.starts_with("$2") {
        return check_bcrypt(stored_hash, submitted);
    }
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        PasswordError::Hash(e.to_string())
    })?;
    match Argon2::default().verify_password(submitted.as_bytes(), &parsed) {
        Ok(()) => Ok(()),
        Err(password_hash::Error::Password) => Err(PasswordError::Mismatch),
        Err(e) => Err(PasswordError::Hash(e.to_string())),
    }
}

fn check_bcrypt(stored_hash: &str, submitted: &str) -> Result<(), PasswordError> {
    match bcrypt::verify(submitted, stored_hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(PasswordError::Mismatch),
        Err(e) => {
            error!(error = %e, "bcrypt verify error");
            Err(PasswordError::Hash(e.to_string()))
        }
    }
}
