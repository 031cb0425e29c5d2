//! Verimark Core - content protection primitives
//!
//! This crate implements the three Verimark contracts on in-memory files:
//!
//! - **Watermark**: invisible, redundant DCT or Haar-wavelet watermarks with
//!   integrity checking, optional password binding or encryption, and tamper
//!   localisation
//! - **Steganography**: hidden text messages (LSB, DCT, keyed LSB)
//! - **Blockchain proof**: SHA3-256 content digests anchored on a [`Ledger`],
//!   collected into [`RegistrationSession`]s
//!
//! All codecs are deterministic: the same file and options always decode the
//! same way. Long-running calls take an [`OperationContext`] for progress
//! reporting and cancellation.
//!
//! # Example
//!
//! ```no_run
//! use verimark_core::{
//!     embed_watermark, extract_watermark, generate_blockchain_proof, InMemoryLedger, MediaFile,
//!     WatermarkAlgorithm, WatermarkOptions,
//! };
//!
//! # async fn example() -> verimark_core::Result<()> {
//! let file = MediaFile::read(std::path::Path::new("photo.png")).unwrap();
//!
//! let options = WatermarkOptions::text("HELLO").with_algorithm(WatermarkAlgorithm::Dwt);
//! let marked = embed_watermark(&file, &options)?;
//! let result = extract_watermark(&marked, None)?;
//! assert_eq!(result.original_watermark.as_deref(), Some("HELLO"));
//!
//! let ledger = InMemoryLedger::new();
//! let proof = generate_blockchain_proof(&marked, &ledger).await?;
//! println!("{} anchored in block {}", proof.hash, proof.block_number);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod context;
pub mod crypto;
pub mod error;
pub mod fingerprint;
pub mod ledger;
pub mod media;
pub mod proof;
pub mod session;
pub mod steganography;
pub mod watermark;

pub use context::{OperationContext, ProgressSink, ProgressUpdate, Stage};
pub use error::{Result, VerimarkError};
pub use fingerprint::{ContentDigest, PerceptualHash};
pub use ledger::{anchor_with_retry, InMemoryLedger, Ledger, LedgerReceipt, RetryPolicy};
pub use media::MediaFile;
pub use proof::{generate_blockchain_proof, generate_blockchain_proof_with_context, BlockchainProof};
pub use session::{BlockchainRecord, RegistrationSession};
pub use steganography::{
    embed_steganography, embed_steganography_with_context, extract_steganography,
    extract_steganography_with_context, SteganographyMethod, SteganographyOptions,
};
pub use watermark::{
    embed_watermark, embed_watermark_with_context, extract_watermark,
    extract_watermark_with_context, ContentType, DetectionPoint, FrequencyData, TamperedArea,
    VerificationFailure, VerificationResult, WatermarkAlgorithm, WatermarkOptions, WatermarkType,
};
