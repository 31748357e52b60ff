//! Key wrapping
//!
//! Authenticated symmetric sealing of small secrets (file keys, collection
//! keys, collection names) with XChaCha20-Poly1305 and a fresh random
//! 24-byte nonce. The sealed bytes and the nonce are kept separate because
//! the catalog stores them in separate fields.

use crate::{keys::SecretKey, CryptoError, Result};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;

/// Size of a wrap nonce in bytes
pub const WRAP_NONCE_SIZE: usize = 24;

/// Seal `plain` under `key` with a fresh random nonce.
///
/// Returns `(sealed, nonce)`; `sealed` carries a 16-byte authenticator.
pub fn wrap(plain: &[u8], key: &SecretKey) -> Result<(Vec<u8>, [u8; WRAP_NONCE_SIZE])> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; WRAP_NONCE_SIZE];
    rand::RngCore::fill_bytes(&mut OsRng, &mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let sealed = cipher
        .encrypt(nonce, plain)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok((sealed, nonce_bytes))
}

/// Open a sealed value. Fails with [`CryptoError::AuthFailed`] on any
/// tamper of the sealed bytes or the nonce, or on a wrong key.
pub fn unwrap(sealed: &[u8], nonce: &[u8], key: &SecretKey) -> Result<Vec<u8>> {
    if nonce.len() != WRAP_NONCE_SIZE {
        return Err(CryptoError::InvalidNonce {
            expected: WRAP_NONCE_SIZE,
            actual: nonce.len(),
        });
    }
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    cipher
        .decrypt(XNonce::from_slice(nonce), sealed)
        .map_err(|_| CryptoError::AuthFailed)
}

/// Seal under `key`, returning both parts as standard base64.
pub fn wrap_base64(plain: &[u8], key: &SecretKey) -> Result<(String, String)> {
    use base64::Engine;
    let (sealed, nonce) = wrap(plain, key)?;
    Ok((
        base64::engine::general_purpose::STANDARD.encode(sealed),
        base64::engine::general_purpose::STANDARD.encode(nonce),
    ))
}

/// Open a base64 `(sealed, nonce)` pair produced by [`wrap_base64`].
pub fn unwrap_base64(sealed_b64: &str, nonce_b64: &str, key: &SecretKey) -> Result<Vec<u8>> {
    use base64::Engine;
    let sealed = base64::engine::general_purpose::STANDARD.decode(sealed_b64)?;
    let nonce = base64::engine::general_purpose::STANDARD.decode(nonce_b64)?;
    unwrap(&sealed, &nonce, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_unwrap_roundtrip() {
        let key = SecretKey::generate();
        let file_key = SecretKey::generate();

        let (sealed, nonce) = wrap(file_key.as_bytes(), &key).unwrap();
        let opened = unwrap(&sealed, &nonce, &key).unwrap();

        assert_eq!(opened.as_slice(), file_key.as_bytes());
    }

    #[test]
    fn sealed_size_includes_authenticator() {
        let key = SecretKey::generate();
        let (sealed, _) = wrap(&[0u8; 32], &key).unwrap();
        assert_eq!(sealed.len(), 32 + 16);
    }

    #[test]
    fn tampered_sealed_bytes_fail() {
        let key = SecretKey::generate();
        let (mut sealed, nonce) = wrap(b"secret", &key).unwrap();
        sealed[0] ^= 0xff;
        assert!(matches!(
            unwrap(&sealed, &nonce, &key),
            Err(CryptoError::AuthFailed)
        ));
    }

    #[test]
    fn tampered_nonce_fails() {
        let key = SecretKey::generate();
        let (sealed, mut nonce) = wrap(b"secret", &key).unwrap();
        nonce[0] ^= 0xff;
        assert!(matches!(
            unwrap(&sealed, &nonce, &key),
            Err(CryptoError::AuthFailed)
        ));
    }

    #[test]
    fn wrong_key_fails() {
        let (sealed, nonce) = wrap(b"secret", &SecretKey::generate()).unwrap();
        assert!(matches!(
            unwrap(&sealed, &nonce, &SecretKey::generate()),
            Err(CryptoError::AuthFailed)
        ));
    }

    #[test]
    fn wrong_nonce_length_is_rejected() {
        let key = SecretKey::generate();
        let (sealed, _) = wrap(b"secret", &key).unwrap();
        assert!(unwrap(&sealed, &[0u8; 12], &key).is_err());
    }

    #[test]
    fn base64_roundtrip() {
        let key = SecretKey::generate();
        let (sealed, nonce) = wrap_base64(b"album name", &key).unwrap();
        let opened = unwrap_base64(&sealed, &nonce, &key).unwrap();
        assert_eq!(opened, b"album name");
    }
}
