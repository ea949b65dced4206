//! Claim-secret generation and hashing.
//!
//! The secret is handed to the anonymous client exactly once; only its
//! SHA-256 digest is ever persisted, so a reader of the store cannot forge
//! a claim.

use rand::RngCore;
use rand::rngs::OsRng;

/// Raw entropy per secret. 16 bytes hex-encode to 32 characters.
pub const SECRET_BYTES: usize = 16;

/// Produce a fresh claim secret from the OS entropy source.
pub fn generate_secret() -> String {
    let mut raw = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut raw);
    hex::encode(raw)
}

/// One-way digest of a secret, hex-encoded. Deterministic.
pub fn digest(secret: &str) -> String {
    sha256::digest(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_32_lowercase_hex_chars() {
        let secret = generate_secret();
        assert_eq!(secret.len(), SECRET_BYTES * 2);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn secrets_are_unique() {
        assert_ne!(generate_secret(), generate_secret());
    }

    #[test]
    fn digest_is_deterministic() {
        let secret = generate_secret();
        assert_eq!(digest(&secret), digest(&secret));
        assert_eq!(digest(&secret).len(), 64);
    }

    #[test]
    fn different_secrets_produce_different_digests() {
        assert_ne!(digest("aaaa"), digest("aaab"));
    }
}
