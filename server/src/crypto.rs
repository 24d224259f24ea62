//! Hashing and signing primitives
//!
//! Passwords are stored as a SHA-256 hex digest. Requests to the blob
//! storage REST API are signed with HMAC-SHA256 over the account key.

use crate::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Hash a password into a 64-character lowercase hex SHA-256 digest
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sign `message` with a base64-encoded key, returning the base64 signature
pub fn sign_hmac_sha256(base64_key: &str, message: &str) -> Result<String> {
    let key = STANDARD
        .decode(base64_key)
        .map_err(|e| AppError::Config(format!("Account key is not valid base64: {}", e)))?;

    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| AppError::Config(format!("Invalid HMAC key: {}", e)))?;
    mac.update(message.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
