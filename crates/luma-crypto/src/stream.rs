//! Chunked streaming authenticated encryption
//!
//! Files are encrypted as a sequence of secretstream chunks
//! (XChaCha20-Poly1305). Every chunk is authenticated together with its
//! predecessors, so reordering, truncation, and tampering are all rejected
//! on decryption. Creating an encryptor yields a 24-byte header that the
//! decryptor needs to initialize; the header travels in the catalog entry,
//! never in the blob.
//!
//! ## Framing
//!
//! Plaintext is read in 4 MiB buffers. The chunk holding the last plaintext
//! byte is tagged [`ChunkTag::Final`]. When the plaintext size is an exact
//! multiple of the buffer size, the last full chunk is tagged
//! [`ChunkTag::Message`] and an empty `Final` chunk is appended, so the
//! blob always ends with a `Final` chunk and decryptors know where the
//! stream stops without an out-of-band length.

use crate::{keys::SecretKey, CryptoError, Result};
use crypto_secretstream::{Header, Key, PullStream, PushStream, Tag};
use rand::rngs::OsRng;
use std::io::{Read, Write};

/// Plaintext buffer size for streaming encryption (4 MiB)
pub const CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Size of the stream header produced at encryptor creation
pub const STREAM_HEADER_BYTES: usize = 24;

/// Per-chunk overhead: 1-byte tag + 16-byte authenticator
pub const STREAM_OVERHEAD: usize = 17;

/// Tag carried by an encrypted chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkTag {
    /// An intermediate chunk; more chunks follow
    Message,
    /// The terminating chunk of the stream
    Final,
}

impl From<ChunkTag> for Tag {
    fn from(tag: ChunkTag) -> Self {
        match tag {
            ChunkTag::Message => Tag::Message,
            ChunkTag::Final => Tag::Final,
        }
    }
}

/// Streaming encryptor for one blob
pub struct StreamEncryptor {
    inner: PushStream,
}

impl StreamEncryptor {
    /// Create an encryptor, returning it together with the stream header
    pub fn new(key: &SecretKey) -> (Self, [u8; STREAM_HEADER_BYTES]) {
        let key = Key::from(*key.as_bytes());
        let (header, stream) = PushStream::init(&mut OsRng, &key);
        let mut header_bytes = [0u8; STREAM_HEADER_BYTES];
        header_bytes.copy_from_slice(header.as_ref());
        (Self { inner: stream }, header_bytes)
    }

    /// Encrypt one chunk. Output length is input length + [`STREAM_OVERHEAD`].
    pub fn push(&mut self, plaintext: &[u8], tag: ChunkTag) -> Result<Vec<u8>> {
        let mut buffer = plaintext.to_vec();
        self.inner
            .push(&mut buffer, &[], tag.into())
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        Ok(buffer)
    }
}

/// Streaming decryptor for one blob
pub struct StreamDecryptor {
    inner: PullStream,
}

impl StreamDecryptor {
    /// Create a decryptor from the key and the 24-byte stream header
    pub fn new(key: &SecretKey, header: &[u8]) -> Result<Self> {
        if header.len() != STREAM_HEADER_BYTES {
            return Err(CryptoError::InvalidHeader {
                expected: STREAM_HEADER_BYTES,
                actual: header.len(),
            });
        }
        let mut header_bytes = [0u8; STREAM_HEADER_BYTES];
        header_bytes.copy_from_slice(header);
        let stream = PullStream::init(Header::from(header_bytes), &Key::from(*key.as_bytes()));
        Ok(Self { inner: stream })
    }

    /// Decrypt one chunk, returning the plaintext and the chunk's tag.
    ///
    /// Fails with [`CryptoError::CipherTooShort`] for chunks below the
    /// per-chunk overhead and [`CryptoError::AuthFailed`] on any tamper,
    /// reorder, or key mismatch.
    pub fn pull(&mut self, ciphertext: &[u8]) -> Result<(Vec<u8>, ChunkTag)> {
        if ciphertext.len() < STREAM_OVERHEAD {
            return Err(CryptoError::CipherTooShort {
                len: ciphertext.len(),
                min: STREAM_OVERHEAD,
            });
        }
        let mut buffer = ciphertext.to_vec();
        let tag = self
            .inner
            .pull(&mut buffer, &[])
            .map_err(|_| CryptoError::AuthFailed)?;
        let tag = match tag {
            Tag::Message => ChunkTag::Message,
            Tag::Final => ChunkTag::Final,
            other => {
                return Err(CryptoError::Encryption(format!(
                    "unexpected chunk tag {:?}",
                    other
                )))
            }
        };
        Ok((buffer, tag))
    }
}

/// Read until `buf` is full or the reader reaches EOF; returns bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Encrypt a whole plaintext stream into `writer`.
///
/// Returns the stream header and the number of ciphertext bytes written.
/// The header is NOT written to the output; it belongs in the catalog
/// entry. The output always ends with a `Final` chunk, even for empty
/// input.
pub fn encrypt_stream<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    key: &SecretKey,
) -> Result<([u8; STREAM_HEADER_BYTES], u64)> {
    let (mut encryptor, header) = StreamEncryptor::new(key);
    let mut total: u64 = 0;

    let mut current = vec![0u8; CHUNK_SIZE];
    let n = read_full(&mut reader, &mut current)?;
    if n < CHUNK_SIZE {
        // Whole input fits in one buffer (possibly empty).
        let chunk = encryptor.push(&current[..n], ChunkTag::Final)?;
        writer.write_all(&chunk)?;
        return Ok((header, chunk.len() as u64));
    }

    let mut next = vec![0u8; CHUNK_SIZE];
    loop {
        let m = read_full(&mut reader, &mut next)?;
        if m == CHUNK_SIZE {
            let chunk = encryptor.push(&current, ChunkTag::Message)?;
            writer.write_all(&chunk)?;
            total += chunk.len() as u64;
            std::mem::swap(&mut current, &mut next);
            continue;
        }
        if m == 0 {
            // Exact multiple of the buffer size: the last full chunk stays
            // a Message and an empty Final chunk terminates the stream.
            let chunk = encryptor.push(&current, ChunkTag::Message)?;
            writer.write_all(&chunk)?;
            total += chunk.len() as u64;
            let terminator = encryptor.push(&[], ChunkTag::Final)?;
            writer.write_all(&terminator)?;
            total += terminator.len() as u64;
        } else {
            let chunk = encryptor.push(&current, ChunkTag::Message)?;
            writer.write_all(&chunk)?;
            total += chunk.len() as u64;
            let last = encryptor.push(&next[..m], ChunkTag::Final)?;
            writer.write_all(&last)?;
            total += last.len() as u64;
        }
        return Ok((header, total));
    }
}

/// Decrypt a whole ciphertext stream produced by [`encrypt_stream`].
///
/// Consumes chunks until the `Final` tag. Fails with
/// [`CryptoError::Truncated`] if the stream ends first and
/// [`CryptoError::TrailingData`] if ciphertext follows the final chunk.
pub fn decrypt_stream<R: Read>(
    mut reader: R,
    header: &[u8],
    key: &SecretKey,
) -> Result<Vec<u8>> {
    let mut decryptor = StreamDecryptor::new(key, header)?;
    let mut plaintext = Vec::new();
    let mut buf = vec![0u8; CHUNK_SIZE + STREAM_OVERHEAD];

    loop {
        let n = read_full(&mut reader, &mut buf)?;
        if n == 0 {
            return Err(CryptoError::Truncated);
        }
        let (chunk, tag) = decryptor.pull(&buf[..n])?;
        plaintext.extend_from_slice(&chunk);
        if tag == ChunkTag::Final {
            let mut probe = [0u8; 1];
            if reader.read(&mut probe)? != 0 {
                return Err(CryptoError::TrailingData);
            }
            return Ok(plaintext);
        }
    }
}

/// Encrypt a small in-memory payload as a single `Final` chunk.
///
/// Used for thumbnails and metadata, which share the blob framing but
/// never span multiple chunks. Returns `(ciphertext, header)`.
pub fn encrypt_bytes(data: &[u8], key: &SecretKey) -> Result<(Vec<u8>, [u8; STREAM_HEADER_BYTES])> {
    let (mut encryptor, header) = StreamEncryptor::new(key);
    let ciphertext = encryptor.push(data, ChunkTag::Final)?;
    Ok((ciphertext, header))
}

/// Decrypt a payload produced by [`encrypt_bytes`].
pub fn decrypt_bytes(data: &[u8], header: &[u8], key: &SecretKey) -> Result<Vec<u8>> {
    let mut decryptor = StreamDecryptor::new(key, header)?;
    let (plaintext, tag) = decryptor.pull(data)?;
    if tag != ChunkTag::Final {
        return Err(CryptoError::Truncated);
    }
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(plaintext: &[u8]) -> Vec<u8> {
        let key = SecretKey::generate();
        let mut blob = Vec::new();
        let (header, size) = encrypt_stream(Cursor::new(plaintext), &mut blob, &key).unwrap();
        assert_eq!(blob.len() as u64, size);
        decrypt_stream(Cursor::new(&blob), &header, &key).unwrap()
    }

    #[test]
    fn roundtrip_small() {
        let plaintext = vec![0x41u8; 100];
        assert_eq!(roundtrip(&plaintext), plaintext);
    }

    #[test]
    fn roundtrip_one_mib() {
        let plaintext: Vec<u8> = (0..1024 * 1024).map(|i| (i % 256) as u8).collect();
        assert_eq!(roundtrip(&plaintext), plaintext);
    }

    #[test]
    fn roundtrip_exact_chunk() {
        let plaintext = vec![0u8; CHUNK_SIZE];
        assert_eq!(roundtrip(&plaintext), plaintext);
    }

    #[test]
    fn roundtrip_just_over_chunk() {
        let plaintext: Vec<u8> = (0..CHUNK_SIZE + 100).map(|i| (i % 251) as u8).collect();
        assert_eq!(roundtrip(&plaintext), plaintext);
    }

    #[test]
    fn roundtrip_empty() {
        assert_eq!(roundtrip(&[]), Vec::<u8>::new());
    }

    #[test]
    fn small_blob_is_one_final_chunk() {
        // 100 bytes of 0x41 encrypt to exactly 117 blob bytes carrying Final.
        let key = SecretKey::generate();
        let plaintext = vec![0x41u8; 100];
        let mut blob = Vec::new();
        let (header, size) = encrypt_stream(Cursor::new(&plaintext), &mut blob, &key).unwrap();
        assert_eq!(size, 117);

        let mut decryptor = StreamDecryptor::new(&key, &header).unwrap();
        let (decrypted, tag) = decryptor.pull(&blob).unwrap();
        assert_eq!(tag, ChunkTag::Final);
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn exact_multiple_gets_empty_terminator() {
        // Exactly one buffer of zeros: a full Message chunk plus an empty
        // Final chunk, 4_194_304 + 17 + 17 bytes in total.
        let key = SecretKey::generate();
        let plaintext = vec![0u8; CHUNK_SIZE];
        let mut blob = Vec::new();
        let (header, size) = encrypt_stream(Cursor::new(&plaintext), &mut blob, &key).unwrap();
        assert_eq!(size as usize, CHUNK_SIZE + 2 * STREAM_OVERHEAD);

        let mut decryptor = StreamDecryptor::new(&key, &header).unwrap();
        let (first, tag) = decryptor.pull(&blob[..CHUNK_SIZE + STREAM_OVERHEAD]).unwrap();
        assert_eq!(tag, ChunkTag::Message);
        assert_eq!(first.len(), CHUNK_SIZE);
        let (terminator, tag) = decryptor.pull(&blob[CHUNK_SIZE + STREAM_OVERHEAD..]).unwrap();
        assert_eq!(tag, ChunkTag::Final);
        assert!(terminator.is_empty());
    }

    #[test]
    fn short_tail_is_the_final_chunk() {
        // 4_194_404 bytes: one full Message chunk (4_194_321 ciphertext
        // bytes) followed by a 117-byte Final chunk.
        let key = SecretKey::generate();
        let plaintext = vec![7u8; CHUNK_SIZE + 100];
        let mut blob = Vec::new();
        let (header, size) = encrypt_stream(Cursor::new(&plaintext), &mut blob, &key).unwrap();
        assert_eq!(size as usize, CHUNK_SIZE + STREAM_OVERHEAD + 100 + STREAM_OVERHEAD);

        let mut decryptor = StreamDecryptor::new(&key, &header).unwrap();
        let (_, tag) = decryptor.pull(&blob[..CHUNK_SIZE + STREAM_OVERHEAD]).unwrap();
        assert_eq!(tag, ChunkTag::Message);
        let (tail, tag) = decryptor.pull(&blob[CHUNK_SIZE + STREAM_OVERHEAD..]).unwrap();
        assert_eq!(tag, ChunkTag::Final);
        assert_eq!(tail.len(), 100);
    }

    #[test]
    fn header_is_not_in_blob() {
        let key = SecretKey::generate();
        let plaintext = vec![0x5au8; 4096];
        let mut blob = Vec::new();
        let (header, _) = encrypt_stream(Cursor::new(&plaintext), &mut blob, &key).unwrap();
        assert!(!blob.starts_with(&header));
    }

    #[test]
    fn bit_flip_is_rejected() {
        let key = SecretKey::generate();
        let plaintext = vec![3u8; 1000];
        let mut blob = Vec::new();
        let (header, _) = encrypt_stream(Cursor::new(&plaintext), &mut blob, &key).unwrap();

        for index in [0, blob.len() / 2, blob.len() - 1] {
            let mut tampered = blob.clone();
            tampered[index] ^= 0x01;
            assert!(
                decrypt_stream(Cursor::new(&tampered), &header, &key).is_err(),
                "flip at byte {} must fail",
                index
            );
        }
    }

    #[test]
    fn truncation_is_rejected() {
        let key = SecretKey::generate();
        let plaintext = vec![9u8; 1000];
        let mut blob = Vec::new();
        let (header, _) = encrypt_stream(Cursor::new(&plaintext), &mut blob, &key).unwrap();

        let truncated = &blob[..blob.len() - 1];
        assert!(decrypt_stream(Cursor::new(truncated), &header, &key).is_err());
    }

    #[test]
    fn chunk_swap_is_rejected() {
        let key = SecretKey::generate();
        let (mut encryptor, header) = StreamEncryptor::new(&key);
        let first = encryptor.push(b"first chunk", ChunkTag::Message).unwrap();
        let second = encryptor.push(b"second chunk", ChunkTag::Final).unwrap();

        let mut decryptor = StreamDecryptor::new(&key, &header).unwrap();
        assert!(decryptor.pull(&second).is_err());
        drop(first);
    }

    #[test]
    fn wrong_key_is_rejected() {
        let plaintext = vec![1u8; 64];
        let mut blob = Vec::new();
        let (header, _) =
            encrypt_stream(Cursor::new(&plaintext), &mut blob, &SecretKey::generate()).unwrap();
        let other = SecretKey::generate();
        assert!(matches!(
            decrypt_stream(Cursor::new(&blob), &header, &other),
            Err(CryptoError::AuthFailed)
        ));
    }

    #[test]
    fn undersized_chunk_is_cipher_too_short() {
        let key = SecretKey::generate();
        let (_, header) = StreamEncryptor::new(&key);
        let mut decryptor = StreamDecryptor::new(&key, &header).unwrap();
        match decryptor.pull(&[0u8; 16]) {
            Err(CryptoError::CipherTooShort { len: 16, min }) => {
                assert_eq!(min, STREAM_OVERHEAD)
            }
            other => panic!("expected CipherTooShort, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn trailing_data_after_final_is_rejected() {
        let key = SecretKey::generate();
        let plaintext = vec![2u8; 50];
        let mut blob = Vec::new();
        let (header, _) = encrypt_stream(Cursor::new(&plaintext), &mut blob, &key).unwrap();
        blob.push(0xff);
        assert!(matches!(
            decrypt_stream(Cursor::new(&blob), &header, &key),
            Err(CryptoError::TrailingData)
        ));
    }

    #[test]
    fn bad_header_length_is_rejected() {
        let key = SecretKey::generate();
        assert!(StreamDecryptor::new(&key, &[0u8; 12]).is_err());
    }

    #[test]
    fn encrypt_bytes_roundtrip() {
        let key = SecretKey::generate();
        let payload = b"thumbnail bytes".to_vec();
        let (ciphertext, header) = encrypt_bytes(&payload, &key).unwrap();
        assert_eq!(ciphertext.len(), payload.len() + STREAM_OVERHEAD);
        assert_eq!(decrypt_bytes(&ciphertext, &header, &key).unwrap(), payload);
    }
}
