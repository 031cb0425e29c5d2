//! Content fingerprints: an exact SHA3-256 digest and, for images, a
//! Blockhash perceptual hash that survives re-encoding.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::{Result, VerimarkError};

/// SHA3-256 digest of raw file bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest(pub [u8; 32]);

impl ContentDigest {
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(data);
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        Self(digest)
    }

    /// `0x`-prefixed lowercase hex, 66 characters.
    pub fn to_prefixed_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_prefixed_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| VerimarkError::InputError(format!("Invalid digest hex: {e}")))?;
        let digest: [u8; 32] = bytes.try_into().map_err(|_| {
            VerimarkError::InputError("Digest must be 32 bytes".into())
        })?;
        Ok(Self(digest))
    }
}

/// Blockhash length in bytes.
pub const PERCEPTUAL_HASH_SIZE: usize = 8;

/// Default Hamming distance under which two images count as the same picture.
pub const SIMILARITY_THRESHOLD: u32 = 10;

/// 64-bit Blockhash of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PerceptualHash(pub [u8; PERCEPTUAL_HASH_SIZE]);

impl PerceptualHash {
    /// Hash image bytes. `None` if they do not decode as an image.
    #[cfg(feature = "perceptual-hash")]
    pub fn of_image(data: &[u8]) -> Option<Self> {
        let image = image::load_from_memory(data).ok()?;
        let hash: blockhash::Blockhash64 = blockhash::blockhash64(&image);
        Some(Self(hash.into()))
    }

    #[cfg(not(feature = "perceptual-hash"))]
    pub fn of_image(_data: &[u8]) -> Option<Self> {
        None
    }

    pub fn hamming_distance(&self, other: &Self) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    pub fn is_similar(&self, other: &Self, threshold: Option<u32>) -> bool {
        self.hamming_distance(other) <= threshold.unwrap_or(SIMILARITY_THRESHOLD)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| VerimarkError::InputError(format!("Invalid perceptual hash: {e}")))?;
        let hash: [u8; PERCEPTUAL_HASH_SIZE] = bytes.try_into().map_err(|_| {
            VerimarkError::InputError(format!(
                "Perceptual hash must be {PERCEPTUAL_HASH_SIZE} bytes"
            ))
        })?;
        Ok(Self(hash))
    }
}

impl From<PerceptualHash> for String {
    fn from(hash: PerceptualHash) -> Self {
        hash.to_hex()
    }
}

impl TryFrom<String> for PerceptualHash {
    type Error = VerimarkError;

    fn try_from(s: String) -> Result<Self> {
        Self::from_hex(&s)
    }
}
