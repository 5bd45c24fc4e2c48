//! Password hashing for the built-in identity provider.
//!
//! PBKDF2-HMAC-SHA256 with a per-record random salt. The iteration count
//! is stored alongside the hash so it can be raised later without
//! invalidating existing records.

use crate::error::AppError;
use crate::models::PasswordRecord;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;

const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32; // SHA-256 output size

/// Derive a fresh credential record for `uid`.
pub fn hash_password(uid: &str, password: &str) -> Result<PasswordRecord, AppError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to generate salt")))?;

    let iterations =
        NonZeroU32::new(PBKDF2_ITERATIONS).expect("iteration count must be nonzero");

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &mut hash,
    );

    Ok(PasswordRecord {
        uid: uid.to_string(),
        salt: hex::encode(salt),
        hash: hex::encode(hash),
        iterations: PBKDF2_ITERATIONS,
    })
}

/// Constant-time verification against a stored record.
///
/// Malformed records verify as false rather than erroring; they are
/// indistinguishable from a wrong password to the caller.
pub fn verify_password(record: &PasswordRecord, password: &str) -> bool {
    let Ok(salt) = hex::decode(&record.salt) else {
        return false;
    };
    let Ok(hash) = hex::decode(&record.hash) else {
        return false;
    };
    let Some(iterations) = NonZeroU32::new(record.iterations) else {
        return false;
    };

    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &hash,
    )
    .is_ok()
}
