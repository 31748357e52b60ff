//! # Luma Crypto
//!
//! Client-side cryptography for the Luma ingestion engine.
//!
//! - **Streaming encryption**: secretstream-style chunked authenticated
//!   encryption (XChaCha20-Poly1305) with a 24-byte stream header and
//!   17 bytes of overhead per chunk.
//! - **Key wrapping**: XChaCha20-Poly1305 sealing of small secrets with
//!   random 24-byte nonces.
//! - **Hashing**: SHA-256 for content identity, MD5 for S3 integrity.
//!
//! Key hierarchy:
//! ```text
//! Master key (account-level, external input)
//!   └── Collection key (per album, wrapped by master key)
//!         └── File key (per upload, wrapped by collection key;
//!             encrypts the file, thumbnail, and metadata streams)
//! ```
//!
//! All encryption happens client-side; the server only ever sees sealed
//! keys and ciphertext blobs.

pub mod error;
pub mod hashing;
pub mod keys;
pub mod stream;
pub mod wrap;

pub use error::{CryptoError, Result};
pub use hashing::{md5_bytes, md5_file, part_md5s, sha256_file};
pub use keys::SecretKey;
pub use stream::{
    decrypt_bytes, decrypt_stream, encrypt_bytes, encrypt_stream, ChunkTag, StreamDecryptor,
    StreamEncryptor, CHUNK_SIZE, STREAM_HEADER_BYTES, STREAM_OVERHEAD,
};
pub use wrap::{unwrap, unwrap_base64, wrap, wrap_base64, WRAP_NONCE_SIZE};

/// Size of every key in the wrap hierarchy (256 bits)
pub const KEY_SIZE: usize = 32;
