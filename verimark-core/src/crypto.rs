//! Password handling for embedded payloads.
//!
//! Payloads are sealed with ChaCha20-Poly1305. The key and nonce come from
//! PBKDF2-HMAC-SHA256 over the password and a random per-payload salt, so a
//! fixed nonce per derived key is safe. Wrong passwords fail the AEAD tag
//! check deterministically.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use sha3::{Digest, Sha3_256};
use zeroize::Zeroizing;

use crate::error::{Result, VerimarkError};

/// Salt length prepended to every sealed payload.
pub const SALT_LEN: usize = 8;

/// Poly1305 tag length appended by the cipher.
pub const TAG_LEN: usize = 16;

/// Bytes added to a plaintext by [`seal`].
pub const SEAL_OVERHEAD: usize = SALT_LEN + TAG_LEN;

/// Length of truncated SHA3 checksums and keyed tags.
pub const CHECKSUM_LEN: usize = 4;

const PBKDF2_ROUNDS: u32 = 10_000;
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

fn derive(password: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN + NONCE_LEN]> {
    let mut out = Zeroizing::new([0u8; KEY_LEN + NONCE_LEN]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut out[..]);
    out
}

/// Encrypt `plaintext` under `password`. Output layout: `salt || ciphertext || tag`.
pub fn seal(password: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let material = derive(password, &salt);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&material[..KEY_LEN]));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&material[KEY_LEN..]), plaintext)
        .map_err(|e| VerimarkError::CryptoError(format!("Encryption failed: {e}")))?;

    let mut sealed = Vec::with_capacity(SALT_LEN + ciphertext.len());
    sealed.extend_from_slice(&salt);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a payload produced by [`seal`].
///
/// Returns `PasswordError` when authentication fails, which for an intact
/// payload means the password is wrong.
pub fn open(password: &str, sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < SEAL_OVERHEAD {
        return Err(VerimarkError::IntegrityError(
            "Encrypted payload is truncated".into(),
        ));
    }
    let (salt, ciphertext) = sealed.split_at(SALT_LEN);
    let material = derive(password, salt);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&material[..KEY_LEN]));
    cipher
        .decrypt(Nonce::from_slice(&material[KEY_LEN..]), ciphertext)
        .map_err(|_| VerimarkError::PasswordError("Invalid password".into()))
}

/// Truncated SHA3-256 of `data`, used to detect corrupted payloads.
pub fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha3_256::digest(data);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Truncated SHA3-256 binding `data` to `password`.
pub fn keyed_tag(password: &str, data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Sha3_256::new();
    hasher.update(b"verimark-keyed-tag");
    hasher.update((password.len() as u64).to_be_bytes());
    hasher.update(password.as_bytes());
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// 32-byte seed for keyed permutations. An absent password uses a fixed key.
pub fn permutation_seed(password: Option<&str>) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(b"verimark-permutation");
    hasher.update(password.unwrap_or("").as_bytes());
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&hasher.finalize());
    seed
}
