//! Password hashing and session tokens.
//!
//! Passwords are stored as `pbkdf2_sha256$<iterations>$<salt>$<hash>` with a
//! random 16-byte salt and hex-encoded fields, so the iteration count can be
//! raised later without invalidating existing accounts. Sessions are random
//! 32-byte tokens kept in the `sessions` table and sent as a cookie.

use data_encoding::HEXLOWER;
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, pbkdf2};
use std::num::NonZeroU32;
use thiserror::Error;

pub const PBKDF2_ITERATIONS: u32 = 100_000;
const SCHEME: &str = "pbkdf2_sha256";
const SALT_LEN: usize = 16;
const TOKEN_LEN: usize = 32;
const HASH_LEN: usize = digest::SHA256_OUTPUT_LEN;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("System random source failed")]
    Random,
}

fn random_bytes<const N: usize>() -> Result<[u8; N], AuthError> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| AuthError::Random)?;
    Ok(buf)
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    hash_password_with(password, PBKDF2_ITERATIONS)
}

pub fn hash_password_with(password: &str, iterations: u32) -> Result<String, AuthError> {
    let iterations = NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN);
    let salt = random_bytes::<SALT_LEN>()?;
    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &mut hash,
    );
    Ok(format!(
        "{SCHEME}${iterations}${}${}",
        HEXLOWER.encode(&salt),
        HEXLOWER.encode(&hash)
    ))
}

/// Check `password` against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let Some(iterations) = iterations.parse().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (
        HEXLOWER.decode(salt.as_bytes()),
        HEXLOWER.decode(hash.as_bytes()),
    ) else {
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

/// New random session token, hex encoded.
pub fn new_session_token() -> Result<String, AuthError> {
    Ok(HEXLOWER.encode(&random_bytes::<TOKEN_LEN>()?))
}

/// Redirect target after login: only same-site absolute paths are honoured.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path
        }
        _ => "/",
    }
}
