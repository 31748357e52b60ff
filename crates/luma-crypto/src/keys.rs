//! Symmetric key material
//!
//! All keys in the wrap hierarchy (master key, collection keys, per-file
//! keys) are 32 random bytes. The same newtype is used for all of them;
//! what a key protects is decided by where it sits in the hierarchy, not
//! by its type.

use crate::{CryptoError, Result, KEY_SIZE};
use base64::Engine;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A 256-bit symmetric key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; KEY_SIZE],
}

impl SecretKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::RngCore::fill_bytes(&mut OsRng, &mut bytes);
        Self { bytes }
    }

    /// Create a key from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Decode from standard base64
    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(s)?;
        Self::from_bytes(&bytes)
    }

    /// Encode as standard base64
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.bytes)
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey").field("bytes", &"[REDACTED]").finish()
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for SecretKey {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_differ() {
        let a = SecretKey::generate();
        let b = SecretKey::generate();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn base64_roundtrip() {
        let key = SecretKey::generate();
        let encoded = key.to_base64();
        let decoded = SecretKey::from_base64(&encoded).unwrap();
        assert_eq!(key, decoded);
    }

    #[test]
    fn rejects_short_bytes() {
        assert!(SecretKey::from_bytes(&[0u8; 16]).is_err());
    }

    #[test]
    fn debug_does_not_leak() {
        let key = SecretKey::generate();
        let rendered = format!("{:?}", key);
        assert!(rendered.contains("REDACTED"));
    }
}
