//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use verimark_core::{MediaFile, RegistrationSession};

/// Build an output path next to `file`.
///
/// Transforms `photo.png` into `photo.<tag>.png`.
pub fn build_output_path(file: &Path, tag: &str) -> PathBuf {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("png");
    file.with_file_name(format!("{stem}.{tag}.{ext}"))
}

/// Read a file from disk as a [`MediaFile`].
///
/// Empty files are returned as-is: proofs accept them and the codecs reject
/// them with an input error.
pub fn read_media(path: &Path) -> Result<MediaFile> {
    let file = MediaFile::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    info!(path = %path.display(), bytes = file.len(), mime = %file.mime_type, "Read file");
    Ok(file)
}

pub fn write_media(path: &Path, file: &MediaFile) -> Result<()> {
    std::fs::write(path, &file.data)
        .with_context(|| format!("Failed to write output: {}", path.display()))?;
    info!(path = %path.display(), bytes = file.len(), "Wrote file");
    Ok(())
}

/// Load a records file. A missing file starts a new session.
pub fn load_records(path: &Path) -> Result<RegistrationSession> {
    if !path.exists() {
        debug!(path = %path.display(), "No records file yet");
        return Ok(RegistrationSession::new());
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file: {}", path.display()))?;
    let session = RegistrationSession::from_json(&json)
        .with_context(|| format!("Failed to parse records file: {}", path.display()))?;
    debug!(path = %path.display(), records = session.len(), "Loaded records");
    Ok(session)
}

pub fn save_records(path: &Path, session: &RegistrationSession) -> Result<()> {
    let json = session
        .export_json()
        .context("Failed to serialize records")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write records file: {}", path.display()))?;
    Ok(())
}

/// Format an RFC 3339 timestamp as a human-readable UTC string.
pub fn format_timestamp(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt
            .with_timezone(&Utc)
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        Err(_) => timestamp.to_string(),
    }
}

/// First `len` characters of a hex string, for display.
pub fn short_hash(hash: &str, len: usize) -> &str {
    hash.get(..len).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_output_path() {
        assert_eq!(
            build_output_path(Path::new("image.jpg"), "watermarked"),
            PathBuf::from("image.watermarked.jpg")
        );
        assert_eq!(
            build_output_path(Path::new("dir/photo.png"), "hidden"),
            PathBuf::from("dir/photo.hidden.png")
        );
        assert_eq!(
            build_output_path(Path::new("noext"), "hidden"),
            PathBuf::from("noext.hidden.png")
        );
    }

    #[test]
    fn test_format_timestamp() {
        let formatted = format_timestamp("2024-01-15T12:30:45.123Z");
        assert_eq!(formatted, "2024-01-15 12:30:45 UTC");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(short_hash("0xabcdef", 4), "0xab");
        assert_eq!(short_hash("0x", 10), "0x");
    }

    #[test]
    fn test_missing_records_file_starts_empty() {
        let session = load_records(Path::new("/nonexistent/records.json")).unwrap();
        assert!(session.is_empty());
    }
}
