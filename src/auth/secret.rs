use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{AppError, AppResult};

/// Hash of a random value nobody knows. Checked for unknown client ids so
/// they cost the same argon2 work as a wrong secret.
static DECOY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_secret(&uuid::Uuid::new_v4().to_string()).ok());

/// Hash a client secret with Argon2id and a random salt.
pub fn hash_secret(secret: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            source: anyhow::anyhow!("Failed to hash client secret: {e}"),
        })
}

/// Check a presented secret against a stored PHC hash string.
///
/// A malformed stored hash is an internal error, a mismatch is `Ok(false)`.
pub fn verify_secret(secret: &str, secret_hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(secret_hash).map_err(|e| AppError::Internal {
        source: anyhow::anyhow!("Stored secret hash is malformed: {e}"),
    })?;

    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}

/// Spend one verification against [`DECOY_HASH`].
pub fn verify_decoy(secret: &str) {
    if let Some(hash) = DECOY_HASH.as_deref() {
        let _ = verify_secret(secret, hash);
    }
}
