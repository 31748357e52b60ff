//! End-to-end exercises of the wrap hierarchy and blob framing

use luma_crypto::{
    decrypt_bytes, decrypt_stream, encrypt_bytes, encrypt_stream, unwrap, wrap, ChunkTag,
    SecretKey, StreamDecryptor, CHUNK_SIZE, STREAM_OVERHEAD,
};
use std::io::Cursor;

/// Master key wraps the collection key, which wraps the file key, which
/// encrypts the streams. The whole chain must open in reverse.
#[test]
fn full_key_hierarchy_round_trips() {
    let master_key = SecretKey::generate();
    let collection_key = SecretKey::generate();
    let file_key = SecretKey::generate();

    let (sealed_collection, collection_nonce) =
        wrap(collection_key.as_bytes(), &master_key).unwrap();
    let (sealed_file, file_nonce) = wrap(file_key.as_bytes(), &collection_key).unwrap();

    let plaintext = b"the image bytes".repeat(1000);
    let mut blob = Vec::new();
    let (header, _) = encrypt_stream(Cursor::new(&plaintext), &mut blob, &file_key).unwrap();

    // Reverse: open collection key, open file key, decrypt the blob.
    let opened_collection = SecretKey::from_bytes(
        &unwrap(&sealed_collection, &collection_nonce, &master_key).unwrap(),
    )
    .unwrap();
    let opened_file =
        SecretKey::from_bytes(&unwrap(&sealed_file, &file_nonce, &opened_collection).unwrap())
            .unwrap();
    let decrypted = decrypt_stream(Cursor::new(&blob), &header, &opened_file).unwrap();
    assert_eq!(decrypted, plaintext);
}

/// One file key encrypts three independent streams, each with its own
/// header; headers are not interchangeable across streams.
#[test]
fn per_stream_headers_are_independent() {
    let file_key = SecretKey::generate();

    let (file_cipher, file_header) = encrypt_bytes(b"file", &file_key).unwrap();
    let (thumb_cipher, thumb_header) = encrypt_bytes(b"thumb", &file_key).unwrap();

    assert_ne!(file_header, thumb_header);
    assert_eq!(
        decrypt_bytes(&file_cipher, &file_header, &file_key).unwrap(),
        b"file"
    );
    // The wrong header must not decrypt the other stream.
    assert!(decrypt_bytes(&thumb_cipher, &file_header, &file_key).is_err());
}

/// Blob sizes follow `plaintext + 17 * chunk_count` exactly, and the
/// chunk count follows the framing rules for every size class.
#[test]
fn chunk_count_matches_size_class() {
    let key = SecretKey::generate();
    let cases: [(usize, usize); 5] = [
        (0, 1),                  // empty: single empty Final
        (100, 1),                // short: one Final chunk
        (CHUNK_SIZE - 1, 1),     // just under a buffer
        (CHUNK_SIZE, 2),         // exact multiple: Message + empty Final
        (CHUNK_SIZE + 1, 2),     // full Message + short Final
    ];

    for (plain_len, expected_chunks) in cases {
        let plaintext = vec![0x11u8; plain_len];
        let mut blob = Vec::new();
        let (_, size) = encrypt_stream(Cursor::new(&plaintext), &mut blob, &key).unwrap();
        assert_eq!(
            size as usize,
            plain_len + expected_chunks * STREAM_OVERHEAD,
            "size mismatch for {} bytes",
            plain_len
        );
    }
}

/// Pulling chunks in blob order always ends on a Final tag.
#[test]
fn last_chunk_carries_final_tag() {
    let key = SecretKey::generate();
    let plaintext = vec![0x22u8; CHUNK_SIZE + 50];
    let mut blob = Vec::new();
    let (header, _) = encrypt_stream(Cursor::new(&plaintext), &mut blob, &key).unwrap();

    let mut decryptor = StreamDecryptor::new(&key, &header).unwrap();
    let boundary = CHUNK_SIZE + STREAM_OVERHEAD;
    let (_, first_tag) = decryptor.pull(&blob[..boundary]).unwrap();
    let (_, last_tag) = decryptor.pull(&blob[boundary..]).unwrap();
    assert_eq!(first_tag, ChunkTag::Message);
    assert_eq!(last_tag, ChunkTag::Final);
}
