//! Symmetric stream cipher with a per-message hashed key schedule.
//!
//! Every encryption draws a fresh 16-byte nonce from the OS RNG and derives a
//! one-shot ChaCha20 key as `SHA-256(secret_key ‖ nonce)`; the nonce travels
//! in the clear ahead of the ciphertext. The stream cipher carries no
//! authentication, so decrypting under the wrong key yields garbage bytes
//! rather than an error. The key-seeded CRC32 variant below layers a weak
//! tamper detector on top of that.

use byteorder::{BigEndian, ByteOrder};
use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Size of the random nonce prepended to every ciphertext.
pub const NONCE_LEN: usize = 16;

/// Size of the CRC32 trailer appended by the integrity-checked variant.
pub const CRC_LEN: usize = 4;

/// Selects whether ciphertexts carry the key-seeded CRC32 trailer.
///
/// This is a weak wrong-key/tamper detector, not cryptographic
/// authentication. The two modes interoperate at the byte level: a
/// [`ChecksumMode::None`] decrypt of checked data yields the payload plus its
/// 4-byte trailer, still useful for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumMode {
    /// Raw stream cipher only.
    #[default]
    None,
    /// CRC32 of the plaintext, seeded with a CRC32 of the secret key,
    /// appended big-endian before encryption.
    Crc32KeySeeded,
}

impl ChecksumMode {
    pub(crate) fn encrypt(self, plain: &[u8], secret_key: &[u8]) -> Vec<u8> {
        match self {
            ChecksumMode::None => encrypt(plain, secret_key),
            ChecksumMode::Crc32KeySeeded => encrypt_checked(plain, secret_key),
        }
    }

    pub(crate) fn decrypt(self, wire: &[u8], secret_key: &[u8]) -> Vec<u8> {
        match self {
            ChecksumMode::None => decrypt(wire, secret_key),
            ChecksumMode::Crc32KeySeeded => decrypt_checked(wire, secret_key),
        }
    }
}

fn keystream(secret_key: &[u8], nonce: &[u8]) -> ChaCha20 {
    let key = Sha256::new()
        .chain_update(secret_key)
        .chain_update(nonce)
        .finalize();
    // The derived key is unique per message, so a fixed zero IV is fine.
    ChaCha20::new(&key, &chacha20::Nonce::default())
}

/// Encrypt `plain` under `secret_key`, returning `nonce ‖ ciphertext`.
///
/// The nonce is drawn fresh on every call, so two encryptions of identical
/// input never produce the same output.
pub fn encrypt(plain: &[u8], secret_key: &[u8]) -> Vec<u8> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let mut out = Vec::with_capacity(NONCE_LEN + plain.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(plain);
    keystream(secret_key, &nonce).apply_keystream(&mut out[NONCE_LEN..]);
    out
}

/// Reverse [`encrypt`]. Input shorter than the nonce yields an empty vec;
/// a wrong key yields garbage bytes, never an error.
pub fn decrypt(wire: &[u8], secret_key: &[u8]) -> Vec<u8> {
    if wire.len() < NONCE_LEN {
        return Vec::new();
    }
    let (nonce, body) = wire.split_at(NONCE_LEN);
    let mut out = body.to_vec();
    keystream(secret_key, nonce).apply_keystream(&mut out);
    out
}

fn keyed_crc(data: &[u8], secret_key: &[u8]) -> u32 {
    let mut seed = crc32fast::Hasher::new();
    seed.update(secret_key);
    let mut crc = crc32fast::Hasher::new_with_initial(seed.finalize());
    crc.update(data);
    crc.finalize()
}

/// [`encrypt`] with the key-seeded CRC32 trailer appended to the plaintext.
pub fn encrypt_checked(plain: &[u8], secret_key: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(plain.len() + CRC_LEN);
    data.extend_from_slice(plain);
    let mut trailer = [0u8; CRC_LEN];
    BigEndian::write_u32(&mut trailer, keyed_crc(plain, secret_key));
    data.extend_from_slice(&trailer);
    encrypt(&data, secret_key)
}

/// Reverse [`encrypt_checked`], verifying the trailer. Any mismatch, which
/// includes decryption under the wrong key, yields an empty vec.
pub fn decrypt_checked(wire: &[u8], secret_key: &[u8]) -> Vec<u8> {
    let mut data = decrypt(wire, secret_key);
    let Some(payload_len) = data.len().checked_sub(CRC_LEN) else {
        return Vec::new();
    };
    let received = BigEndian::read_u32(&data[payload_len..]);
    data.truncate(payload_len);
    if received != keyed_crc(&data, secret_key) {
        return Vec::new();
    }
    data
}
