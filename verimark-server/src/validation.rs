//! Upload validation module
//!
//! Provides validation utilities for multipart file uploads.

use uuid::Uuid;
use verimark_core::media::{sniff_mime_type, OCTET_STREAM};

use crate::error::ApiError;

/// Default max file size in bytes (25 MB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

/// Validates the size of an uploaded file
///
/// Returns an error if the file exceeds the maximum size.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        let actual_mb = size / (1024 * 1024);
        Err(ApiError::payload_too_large(format!(
            "File too large: {} MB exceeds maximum of {} MB",
            actual_mb, max_mb
        )))
    } else {
        Ok(())
    }
}

/// Pick the content type for an upload.
///
/// A declared type wins unless it is missing or the generic binary type, in
/// which case the bytes are sniffed.
pub fn resolve_content_type(declared: Option<&str>, data: &[u8]) -> String {
    match declared.map(str::trim) {
        Some(ct) if !ct.is_empty() && !ct.eq_ignore_ascii_case(OCTET_STREAM) => {
            ct.to_ascii_lowercase()
        }
        _ => sniff_mime_type(data).unwrap_or(OCTET_STREAM).to_string(),
    }
}

/// Parse a session id path segment.
pub fn parse_session_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid session id: '{raw}'")))
}
