//! Invisible watermarks carried in the frequency domain of an image.
//!
//! # Algorithms
//!
//! - **DCT**: orthonormal 8x8 DCT blocks, one bit per block in a
//!   mid-frequency coefficient.
//! - **DWT**: single-level Haar wavelet on 2x2 blocks, one bit per block in
//!   the horizontal detail coefficient.
//!
//! Both modulate the blue channel with quantization index modulation. A
//! fixed header identifies the algorithm on extraction, so callers only pass
//! the file and an optional password.
//!
//! # Example
//!
//! ```no_run
//! use verimark_core::{embed_watermark, extract_watermark, MediaFile, WatermarkOptions, WatermarkAlgorithm};
//!
//! # fn example() -> verimark_core::Result<()> {
//! let file = MediaFile::read(std::path::Path::new("photo.png")).unwrap();
//! let options = WatermarkOptions::text("HELLO")
//!     .with_algorithm(WatermarkAlgorithm::Dwt)
//!     .with_strength(70);
//! let marked = embed_watermark(&file, &options)?;
//! let result = extract_watermark(&marked, None)?;
//! assert!(result.is_verified);
//! assert_eq!(result.original_watermark.as_deref(), Some("HELLO"));
//! # Ok(())
//! # }
//! ```

mod embed;
mod extract;
mod frame;

pub use embed::{embed_watermark, embed_watermark_with_context};
pub use extract::{extract_watermark, extract_watermark_with_context};

use serde::{Deserialize, Serialize};

use crate::codec::transform::{Dct8, Haar2};
use crate::codec::BlockCarrier;
use crate::error::{Result, VerimarkError};

/// Strength used when the caller does not pick one.
pub const DEFAULT_STRENGTH: u8 = 50;

/// Copies of every payload bit when the caller does not pick a count.
pub const DEFAULT_REDUNDANCY: u8 = 3;

pub const MAX_REDUNDANCY: u8 = 15;

/// Points in [`FrequencyData`].
pub const FREQUENCY_SAMPLES: usize = 50;

/// Upper bound on [`VerificationResult::detection_points`].
pub const MAX_DETECTION_POINTS: usize = 10;

const BLUE: usize = 2;

/// What the watermark payload represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkType {
    #[default]
    Text,
    /// A QR image; the payload is the QR's raw content.
    Image,
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkAlgorithm {
    #[default]
    Dct,
    Dwt,
}

impl WatermarkAlgorithm {
    pub(crate) fn carrier(self) -> BlockCarrier {
        match self {
            // Coefficient (u=3, v=2).
            Self::Dct => BlockCarrier::new(Box::new(Dct8::new()), 2 * 8 + 3, BLUE),
            // Horizontal detail (LH).
            Self::Dwt => BlockCarrier::new(Box::new(Haar2), 1, BLUE),
        }
    }
}

/// Kind of content recovered from a watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Qr,
    Link,
}

impl From<WatermarkType> for ContentType {
    fn from(kind: WatermarkType) -> Self {
        match kind {
            WatermarkType::Text => Self::Text,
            WatermarkType::Image => Self::Qr,
            WatermarkType::Link => Self::Link,
        }
    }
}

impl ContentType {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Text => 0,
            Self::Qr => 1,
            Self::Link => 2,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Text),
            1 => Some(Self::Qr),
            2 => Some(Self::Link),
            _ => None,
        }
    }
}

/// Options for [`embed_watermark`].
///
/// `content` is not checked against `type`: a `link` is not required to be
/// a URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkOptions {
    #[serde(rename = "type", default)]
    pub kind: WatermarkType,
    pub content: String,
    /// 0-100. Higher survives more processing and is more visible.
    #[serde(default)]
    pub strength: Option<u8>,
    #[serde(default)]
    pub algorithm: WatermarkAlgorithm,
    /// Copies of each payload bit, 1-15.
    #[serde(default)]
    pub redundancy: Option<u8>,
    #[serde(default)]
    pub encryption: bool,
    #[serde(default)]
    pub password: Option<String>,
    /// Raw QR payload, embedded instead of `content` when `type` is `image`.
    #[serde(default)]
    pub qr_code: Option<String>,
}

impl WatermarkOptions {
    pub fn new(kind: WatermarkType, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(WatermarkType::Text, content)
    }

    pub fn link(url: impl Into<String>) -> Self {
        Self::new(WatermarkType::Link, url)
    }

    pub fn with_algorithm(mut self, algorithm: WatermarkAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_strength(mut self, strength: u8) -> Self {
        self.strength = Some(strength);
        self
    }

    pub fn with_redundancy(mut self, redundancy: u8) -> Self {
        self.redundancy = Some(redundancy);
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_encryption(mut self, encryption: bool) -> Self {
        self.encryption = encryption;
        self
    }

    pub fn with_qr_code(mut self, qr_code: impl Into<String>) -> Self {
        self.qr_code = Some(qr_code.into());
        self
    }

    pub fn resolved_strength(&self) -> u8 {
        self.strength.unwrap_or(DEFAULT_STRENGTH)
    }

    pub fn resolved_redundancy(&self) -> u8 {
        self.redundancy.unwrap_or(DEFAULT_REDUNDANCY)
    }

    /// Non-empty password, if any.
    pub fn effective_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// The string that actually gets embedded.
    pub fn payload_content(&self) -> &str {
        match (self.kind, self.qr_code.as_deref()) {
            (WatermarkType::Image, Some(qr)) if !qr.is_empty() => qr,
            _ => &self.content,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolved_strength() > 100 {
            return Err(VerimarkError::InvalidOptions(format!(
                "strength must be 0-100, got {}",
                self.resolved_strength()
            )));
        }
        let redundancy = self.resolved_redundancy();
        if redundancy == 0 || redundancy > MAX_REDUNDANCY {
            return Err(VerimarkError::InvalidOptions(format!(
                "redundancy must be 1-{MAX_REDUNDANCY}, got {redundancy}"
            )));
        }
        if self.payload_content().is_empty() {
            return Err(VerimarkError::InvalidOptions(
                "watermark content must not be empty".into(),
            ));
        }
        if self.encryption && self.effective_password().is_none() {
            return Err(VerimarkError::PasswordError(
                "Encryption requires a password".into(),
            ));
        }
        Ok(())
    }
}

/// Pixel rectangle that failed the redundancy cross-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TamperedArea {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Paired coefficient series for visualisation. Both vectors have the same
/// length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyData {
    /// Ideal lattice value for the decoded bit.
    pub original: Vec<f32>,
    /// Coefficient measured in the file.
    pub modified: Vec<f32>,
}

/// Carrier location in `0..=100` coordinates with its decoding confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionPoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

/// Why a watermark did not verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationFailure {
    NotDetected,
    IntegrityFailed,
    PasswordRequired,
    InvalidPassword,
}

impl VerificationFailure {
    pub fn message(self) -> &'static str {
        match self {
            Self::NotDetected => "No watermark detected in this file",
            Self::IntegrityFailed => "Could not verify watermark integrity",
            Self::PasswordRequired => "This watermark is password protected; a password is required",
            Self::InvalidPassword => "Invalid password for watermark extraction",
        }
    }
}

/// Signal measurements shared by verified and rejected results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalAnalysis {
    pub confidence_score: f32,
    pub tampered_areas: Vec<TamperedArea>,
    pub frequency_data: FrequencyData,
    pub detection_points: Vec<DetectionPoint>,
}

/// Outcome of [`extract_watermark`].
///
/// `original_watermark` and `content_type` are present exactly when
/// `is_verified` is true.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_watermark: Option<String>,
    pub confidence_score: f32,
    pub tampered_areas: Vec<TamperedArea>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub frequency_data: FrequencyData,
    pub detection_points: Vec<DetectionPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<VerificationFailure>,
}

impl VerificationResult {
    pub fn verified(content: String, content_type: ContentType, analysis: SignalAnalysis) -> Self {
        let error_message = (!analysis.tampered_areas.is_empty()).then(|| {
            format!(
                "Watermark verified, but {} region(s) show signs of tampering",
                analysis.tampered_areas.len()
            )
        });
        Self {
            is_verified: true,
            original_watermark: Some(content),
            confidence_score: analysis.confidence_score,
            tampered_areas: analysis.tampered_areas,
            error_message,
            frequency_data: analysis.frequency_data,
            detection_points: analysis.detection_points,
            content_type: Some(content_type),
            failure: None,
        }
    }

    pub fn rejected(failure: VerificationFailure, analysis: SignalAnalysis) -> Self {
        Self {
            is_verified: false,
            original_watermark: None,
            confidence_score: analysis.confidence_score,
            tampered_areas: analysis.tampered_areas,
            error_message: Some(failure.message().to_string()),
            frequency_data: analysis.frequency_data,
            detection_points: analysis.detection_points,
            content_type: None,
            failure: Some(failure),
        }
    }
}
