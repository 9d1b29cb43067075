//! Hashing helpers for LanShare.
//!
//! Provides two things:
//!   1. File identifiers: BLAKE3 of the canonical shared path
//!   2. Password hashing: salted BLAKE3, stored as `salt_hex$digest_hex`
//!
//! BLAKE3 is fast, so the password hash only keeps plaintext off
//! the heap and out of logs. It is not a defence against offline guessing.

use std::path::Path;

use rand::RngCore;

/// Context string for password hashing. Changing it invalidates every
/// stored hash.
const PASSWORD_CONTEXT: &str = "lanshare 2024-06 file password v1";

const SALT_LEN: usize = 16;

/// File IDs are the first 16 bytes of the path digest, hex encoded.
const FILE_ID_BYTES: usize = 16;

/// Derive the identifier for a shared path.
///
/// Sharing is per-path: the same path always maps to the same id, so
/// re-sharing it replaces the previous entry instead of adding a second one.
pub fn file_id(path: &Path) -> String {
    let digest = blake3::hash(path.to_string_lossy().as_bytes());
    hex::encode(&digest.as_bytes()[..FILE_ID_BYTES])
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!("{}${}", hex::encode(salt), hex::encode(salted_digest(&salt, password).as_bytes()))
}

/// Check an attempt against a value produced by [`hash_password`].
/// A malformed stored value never verifies.
pub fn verify_password(stored: &str, attempt: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
        return false;
    };
    // blake3::Hash equality is constant-time.
    match <[u8; 32]>::try_from(expected.as_slice()) {
        Ok(expected) => blake3::Hash::from(expected) == salted_digest(&salt, attempt),
        Err(_) => false,
    }
}

fn salted_digest(salt: &[u8], password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new_derive_key(PASSWORD_CONTEXT);
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize()
}
