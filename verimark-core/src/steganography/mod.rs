//! Hiding text messages inside images.
//!
//! # Methods
//!
//! - **lsb**: header and body in sequential least significant bits of the
//!   RGB samples. Highest capacity, lossless containers only.
//! - **dct**: QIM in one mid-frequency coefficient of green-channel 8x8 DCT
//!   blocks. Lower capacity, survives high-quality JPEG re-encoding.
//! - **advanced**: LSB header, body scattered over a keyed permutation of
//!   the remaining LSB positions.
//!
//! Every method encrypts the message when a password is supplied.
//!
//! ```text
//! | "SG" | version | method | flags | quality | body_len (u32 BE) |
//! ```

mod dct;
mod lsb;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::codec::{from_bits, to_bits, Raster};
use crate::context::{OperationContext, Stage};
use crate::crypto::{self, CHECKSUM_LEN};
use crate::error::{Result, VerimarkError};
use crate::media::{require_present, MediaFile};

/// Quality used by the `dct` method when the caller does not pick one.
pub const DEFAULT_QUALITY: u8 = 75;

const MAGIC: [u8; 2] = *b"SG";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 10;
const HEADER_BITS: usize = HEADER_LEN * 8;
const FLAG_ENCRYPTED: u8 = 0b1;

const MSG_NOT_FOUND: &str = "Could not detect any hidden data in this file";
const MSG_PASSWORD_REQUIRED: &str = "This file requires a password to extract the hidden data";
const MSG_INVALID_PASSWORD: &str = "Invalid password for steganography extraction";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SteganographyMethod {
    #[default]
    Lsb,
    Dct,
    Advanced,
}

impl SteganographyMethod {
    fn code(self) -> u8 {
        match self {
            Self::Lsb => 0,
            Self::Dct => 1,
            Self::Advanced => 2,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Lsb),
            1 => Some(Self::Dct),
            2 => Some(Self::Advanced),
            _ => None,
        }
    }
}

/// Options for [`embed_steganography`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SteganographyOptions {
    pub message: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub method: SteganographyMethod,
    /// 0-100, used by `dct`. Higher means a smaller quantization step.
    #[serde(default)]
    pub quality: Option<u8>,
}

impl SteganographyOptions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: SteganographyMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn resolved_quality(&self) -> u8 {
        self.quality.unwrap_or(DEFAULT_QUALITY)
    }

    pub fn effective_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.message.is_empty() {
            return Err(VerimarkError::InvalidOptions(
                "message must not be empty".into(),
            ));
        }
        if self.resolved_quality() > 100 {
            return Err(VerimarkError::InvalidOptions(format!(
                "quality must be 0-100, got {}",
                self.resolved_quality()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    method: SteganographyMethod,
    flags: u8,
    quality: u8,
    body_len: u32,
}

impl Header {
    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let len = self.body_len.to_be_bytes();
        [
            MAGIC[0],
            MAGIC[1],
            VERSION,
            self.method.code(),
            self.flags,
            self.quality,
            len[0],
            len[1],
            len[2],
            len[3],
        ]
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN || bytes[..2] != MAGIC || bytes[2] != VERSION {
            return None;
        }
        let flags = bytes[4];
        let quality = bytes[5];
        let body_len = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        if flags > FLAG_ENCRYPTED || quality > 100 || (body_len as usize) < CHECKSUM_LEN {
            return None;
        }
        Some(Self {
            method: SteganographyMethod::from_code(bytes[3])?,
            flags,
            quality,
            body_len,
        })
    }

    fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    fn body_bits(&self) -> usize {
        self.body_len as usize * 8
    }
}

/// Hide `options.message` in `file`, returning a new file of the same type.
///
/// # Errors
///
/// - `InputError` if `file` is empty
/// - `UnsupportedType` if `file` is not an image, or if `lsb`/`advanced` is
///   requested on a lossy container
/// - `InvalidOptions` for an empty message or out-of-range quality
/// - `CapacityExceeded` if the message does not fit
/// - `IntegrityError` if the encoded result does not give the message back
pub fn embed_steganography(file: &MediaFile, options: &SteganographyOptions) -> Result<MediaFile> {
    embed_steganography_with_context(file, options, &OperationContext::default())
}

#[instrument(level = "debug", skip_all, fields(method = ?options.method, bytes = file.len()))]
pub fn embed_steganography_with_context(
    file: &MediaFile,
    options: &SteganographyOptions,
    ctx: &OperationContext,
) -> Result<MediaFile> {
    require_present(file)?;
    if !file.is_image() {
        return Err(VerimarkError::UnsupportedType(format!(
            "Steganography requires an image file, got '{}'",
            file.mime_type
        )));
    }
    options.validate()?;

    ctx.report(Stage::Decoding, 0.0);
    let mut raster = Raster::decode(file)?;
    raster.ensure_writable()?;
    if options.method != SteganographyMethod::Dct && !raster.is_lossless() {
        return Err(VerimarkError::UnsupportedType(format!(
            "The {:?} method needs a lossless container (PNG or WebP); use dct for {:?}",
            options.method, raster.format
        )));
    }

    let password = options.effective_password();
    let message = options.message.as_bytes();
    let mut body = match password {
        Some(password) => crypto::seal(password, message)?,
        None => message.to_vec(),
    };
    body.extend_from_slice(&crypto::checksum(&body));
    let body_len = u32::try_from(body.len())
        .map_err(|_| VerimarkError::InvalidOptions("message too long".into()))?;

    let header = Header {
        method: options.method,
        flags: if password.is_some() { FLAG_ENCRYPTED } else { 0 },
        quality: options.resolved_quality(),
        body_len,
    };
    let header_bits = to_bits(&header.to_bytes());
    let body_bits = to_bits(&body);

    match options.method {
        SteganographyMethod::Lsb => lsb::embed(
            &mut raster.image,
            &header_bits,
            &body_bits,
            lsb::Layout::Sequential,
            ctx,
        )?,
        SteganographyMethod::Advanced => lsb::embed(
            &mut raster.image,
            &header_bits,
            &body_bits,
            lsb::Layout::Keyed(crypto::permutation_seed(password)),
            ctx,
        )?,
        SteganographyMethod::Dct => {
            let lossless = raster.is_lossless();
            dct::embed(
                &mut raster.image,
                &header_bits,
                &body_bits,
                header.quality,
                lossless,
                ctx,
            )?
        }
    }

    ctx.check_cancelled()?;
    ctx.report(Stage::Encoding, 0.0);
    let stego = file.with_data(raster.encode()?);
    ensure_readable(&stego, options, ctx)?;
    ctx.report(Stage::Encoding, 1.0);
    info!(
        method = ?options.method,
        encrypted = header.is_encrypted(),
        body_bytes = body.len(),
        "Message hidden"
    );
    Ok(stego)
}

/// Extract from the encoded output and fail unless the message comes back.
fn ensure_readable(
    stego: &MediaFile,
    options: &SteganographyOptions,
    ctx: &OperationContext,
) -> Result<()> {
    let quiet = OperationContext::new(ctx.cancellation_token().clone());
    match extract_steganography_with_context(stego, options.effective_password(), &quiet) {
        Ok(message) if message == options.message => Ok(()),
        Err(VerimarkError::Cancelled) => Err(VerimarkError::Cancelled),
        outcome => {
            warn!(ok = outcome.is_ok(), "Hidden message did not survive encoding");
            Err(VerimarkError::IntegrityError(
                "The hidden message could not be read back from the encoded image; \
                 try a lower quality or a lossless format"
                    .into(),
            ))
        }
    }
}

/// Recover a hidden message.
///
/// # Errors
///
/// - `InputError` if `file` is empty
/// - `UnsupportedType` if `file` is not an image
/// - `PasswordError` if the message is encrypted and the password is
///   missing or wrong
/// - `IntegrityError` if no message is found or it is corrupted
pub fn extract_steganography(file: &MediaFile, password: Option<&str>) -> Result<String> {
    extract_steganography_with_context(file, password, &OperationContext::default())
}

#[instrument(level = "debug", skip_all, fields(bytes = file.len()))]
pub fn extract_steganography_with_context(
    file: &MediaFile,
    password: Option<&str>,
    ctx: &OperationContext,
) -> Result<String> {
    require_present(file)?;
    let raster = Raster::decode(file)?;
    let password = password.filter(|p| !p.is_empty());
    let not_found = || VerimarkError::IntegrityError(MSG_NOT_FOUND.into());

    let lsb_header = lsb::read_header(&raster.image, HEADER_BITS)
        .and_then(|bits| Header::from_bytes(&from_bits(&bits)))
        .filter(|h| h.method != SteganographyMethod::Dct);
    let header = match lsb_header {
        Some(header) => header,
        None => {
            ctx.check_cancelled()?;
            dct::read_header(&raster.image, HEADER_BITS)
                .and_then(|bits| Header::from_bytes(&from_bits(&bits)))
                .filter(|h| h.method == SteganographyMethod::Dct)
                .ok_or_else(not_found)?
        }
    };
    debug!(?header, "Found steganography header");

    if header.is_encrypted() && password.is_none() {
        return Err(VerimarkError::PasswordError(MSG_PASSWORD_REQUIRED.into()));
    }

    let body_bits = match header.method {
        SteganographyMethod::Lsb => lsb::read_body(
            &raster.image,
            HEADER_BITS,
            header.body_bits(),
            lsb::Layout::Sequential,
            ctx,
        )?,
        SteganographyMethod::Advanced => {
            let seed = crypto::permutation_seed(password.filter(|_| header.is_encrypted()));
            lsb::read_body(
                &raster.image,
                HEADER_BITS,
                header.body_bits(),
                lsb::Layout::Keyed(seed),
                ctx,
            )?
        }
        SteganographyMethod::Dct => dct::read_body(
            &raster.image,
            HEADER_BITS,
            header.body_bits(),
            header.quality,
            ctx,
        )?,
    };
    let body = from_bits(&body_bits.ok_or_else(not_found)?);

    let (payload, stored) = body.split_at(body.len() - CHECKSUM_LEN);
    if crypto::checksum(payload).as_slice() != stored {
        // A keyed layout read with the wrong key yields noise, not a
        // corrupted message.
        if header.method == SteganographyMethod::Advanced && header.is_encrypted() {
            return Err(VerimarkError::PasswordError(MSG_INVALID_PASSWORD.into()));
        }
        return Err(not_found());
    }

    let message = match (header.is_encrypted(), password) {
        (true, Some(password)) => crypto::open(password, payload).map_err(|e| match e {
            VerimarkError::PasswordError(_) => {
                VerimarkError::PasswordError(MSG_INVALID_PASSWORD.into())
            }
            _ => not_found(),
        })?,
        _ => payload.to_vec(),
    };

    let text = String::from_utf8(message).map_err(|_| not_found())?;
    info!(method = ?header.method, chars = text.chars().count(), "Hidden message extracted");
    Ok(text)
}
