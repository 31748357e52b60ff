//! Error types for the luma-crypto crate

use thiserror::Error;

/// Result type alias using `CryptoError`
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Encryption failed
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Authentication failed while opening a sealed value or pulling a chunk
    #[error("authentication failed: ciphertext or nonce has been tampered with")]
    AuthFailed,

    /// A ciphertext chunk is shorter than the per-chunk overhead
    #[error("cipher too short: {len} bytes (minimum {min})")]
    CipherTooShort { len: usize, min: usize },

    /// Invalid key format or length
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Invalid stream header
    #[error("invalid stream header: expected {expected} bytes, got {actual}")]
    InvalidHeader { expected: usize, actual: usize },

    /// Invalid nonce
    #[error("invalid nonce: expected {expected} bytes, got {actual}")]
    InvalidNonce { expected: usize, actual: usize },

    /// The decryptor consumed a FINAL chunk but more ciphertext followed
    #[error("trailing data after final chunk")]
    TrailingData,

    /// The stream ended before a FINAL chunk was seen
    #[error("stream truncated: no final chunk")]
    Truncated,

    /// IO error while streaming
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Base64 decode error
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
