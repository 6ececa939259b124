// src/utils/hash.rs

use crate::error::AppError;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Hashes a claim code for roster storage. Claim codes are the only
/// credential a student holds before binding an email, so they get the same
/// treatment a password would.
pub fn hash_claim_code(code: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(code.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .to_string();

    Ok(hash)
}

pub fn verify_claim_code(code: &str, code_hash: &str) -> Result<bool, AppError> {
    let parsed_hash =
        PasswordHash::new(code_hash).map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(code.as_bytes(), &parsed_hash)
        .is_ok())
}
