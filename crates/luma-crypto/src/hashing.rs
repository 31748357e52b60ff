//! Content hashing helpers
//!
//! SHA-256 (hex) identifies plaintext content for deduplication; MD5
//! (base64) is what S3 expects in `Content-MD5` headers.

use crate::Result;
use base64::Engine;
use md5::{Digest as Md5Digest, Md5};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const HASH_BUF_SIZE: usize = 64 * 1024;

/// SHA-256 over a file's full content, hex-encoded.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUF_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// MD5 over a byte slice, base64-encoded.
pub fn md5_bytes(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// MD5 over a file's full content, base64-encoded.
pub fn md5_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; HASH_BUF_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(base64::engine::general_purpose::STANDARD.encode(hasher.finalize()))
}

/// Split a file into `part_size` parts and MD5 each one (base64).
///
/// The last part may be short. Used to request multipart upload URLs.
pub fn part_md5s(path: &Path, part_size: u64) -> Result<Vec<String>> {
    let mut file = File::open(path)?;
    let mut md5s = Vec::new();
    let mut buf = vec![0u8; part_size as usize];
    loop {
        let mut filled = 0;
        while filled < buf.len() {
            let n = file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            break;
        }
        md5s.push(md5_bytes(&buf[..filled]));
        if filled < buf.len() {
            break;
        }
    }
    Ok(md5s)
}
