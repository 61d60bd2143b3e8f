use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Length in bytes of a raw chunk digest.
pub const DIGEST_LEN: usize = 32;

/// Hash a given data slice and return the base64 rendering of its SHA-256 digest.
///
/// Every call starts from a fresh hasher, so this is safe to call from anywhere.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    BASE64.encode(hasher.finalize())
}

/// Returns true if `digest` is a base64 string that decodes to a 256-bit hash.
pub fn is_well_formed_digest(digest: &str) -> bool {
    matches!(BASE64.decode(digest), Ok(raw) if raw.len() == DIGEST_LEN)
}

/// A random 128-bit identifier rendered as lowercase hex.
pub fn random_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
