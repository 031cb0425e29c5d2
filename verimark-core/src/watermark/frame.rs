//! Watermark header and slot layout.
//!
//! ```text
//! | "VM" | version | strength | redundancy | flags | content type | body_len (u16 BE) |
//! ```
//!
//! Header bits are repeated [`HEADER_COPIES`] times at a fixed quantization
//! step so the reader can find them before it knows the strength. The body
//! (payload followed by a 4-byte checksum) follows at the strength-derived
//! step, repeated `redundancy` times.

use super::ContentType;
use crate::crypto::CHECKSUM_LEN;

pub const MAGIC: [u8; 2] = *b"VM";
pub const VERSION: u8 = 1;
pub const HEADER_LEN: usize = 9;
pub const HEADER_BITS: usize = HEADER_LEN * 8;
pub const HEADER_COPIES: usize = 5;
pub const HEADER_SLOTS: usize = HEADER_BITS * HEADER_COPIES;
pub const HEADER_STEP: f32 = 28.0;

pub const FLAG_ENCRYPTED: u8 = 0b01;
pub const FLAG_PASSWORD_TAG: u8 = 0b10;

/// Quantization step for body bits.
pub fn body_step(strength: u8) -> f32 {
    8.0 + 0.32 * strength as f32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub strength: u8,
    pub redundancy: u8,
    pub flags: u8,
    pub content_type: ContentType,
    /// Payload plus checksum, in bytes.
    pub body_len: u16,
}

impl Header {
    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let [hi, lo] = self.body_len.to_be_bytes();
        [
            MAGIC[0],
            MAGIC[1],
            VERSION,
            self.strength,
            self.redundancy,
            self.flags,
            self.content_type.code(),
            hi,
            lo,
        ]
    }

    /// `None` unless the bytes carry our magic and plausible field values.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN || bytes[..2] != MAGIC || bytes[2] != VERSION {
            return None;
        }
        let (strength, redundancy, flags) = (bytes[3], bytes[4], bytes[5]);
        if strength > 100 || redundancy == 0 || redundancy > super::MAX_REDUNDANCY || flags > 0b11 {
            return None;
        }
        let body_len = u16::from_be_bytes([bytes[7], bytes[8]]);
        if (body_len as usize) < CHECKSUM_LEN {
            return None;
        }
        Some(Self {
            strength,
            redundancy,
            flags,
            content_type: ContentType::from_code(bytes[6])?,
            body_len,
        })
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    pub fn is_password_tagged(&self) -> bool {
        self.flags & FLAG_PASSWORD_TAG != 0
    }

    pub fn body_step(&self) -> f32 {
        body_step(self.strength)
    }

    pub fn body_bits(&self) -> usize {
        self.body_len as usize * 8
    }

    pub fn total_slots(&self) -> usize {
        HEADER_SLOTS + self.body_bits() * self.redundancy as usize
    }
}

/// Slot of copy `copy` of header bit `bit`.
pub fn header_slot(bit: usize, copy: usize) -> usize {
    copy * HEADER_BITS + bit
}

/// Slot of copy `copy` of body bit `bit`.
pub fn body_slot(header: &Header, bit: usize, copy: usize) -> usize {
    HEADER_SLOTS + copy * header.body_bits() + bit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Header {
        Header {
            strength: 70,
            redundancy: 3,
            flags: FLAG_ENCRYPTED,
            content_type: ContentType::Link,
            body_len: 300,
        }
    }

    #[test]
    fn test_header_bytes_roundtrip() {
        let bytes = header().to_bytes();
        assert_eq!(&bytes[..2], b"VM");
        assert_eq!(Header::from_bytes(&bytes), Some(header()));
    }

    #[test]
    fn test_header_rejects_noise() {
        let mut bytes = header().to_bytes();
        bytes[4] = 0;
        assert!(Header::from_bytes(&bytes).is_none());

        let mut bytes = header().to_bytes();
        bytes[6] = 9;
        assert!(Header::from_bytes(&bytes).is_none());

        let mut bytes = header().to_bytes();
        bytes[7..].copy_from_slice(&[0, 3]);
        assert!(Header::from_bytes(&bytes).is_none());

        assert!(Header::from_bytes(&[0u8; HEADER_LEN]).is_none());
        assert!(Header::from_bytes(b"VM").is_none());
    }

    #[test]
    fn test_slots_do_not_overlap() {
        let h = header();
        let last_header = header_slot(HEADER_BITS - 1, HEADER_COPIES - 1);
        assert_eq!(last_header + 1, body_slot(&h, 0, 0));
        assert_eq!(body_slot(&h, h.body_bits() - 1, 2) + 1, h.total_slots());
    }

    #[test]
    fn test_body_step_grows_with_strength() {
        assert_eq!(body_step(0), 8.0);
        assert!((body_step(100) - 40.0).abs() < 1e-4);
    }
}
