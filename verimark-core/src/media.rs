//! In-memory file handle passed to every contract operation.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VerimarkError};

/// Fallback content type when neither the caller nor the bytes tell us more.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A named blob with a content type.
///
/// Operations return a new `MediaFile` with the same name and content type as
/// their input, so callers can offer the result as a download unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub name: Option<String>,
    pub mime_type: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl MediaFile {
    pub fn new(name: Option<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name,
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Build a file whose content type is sniffed from its bytes, falling back
    /// to the file extension and then to `application/octet-stream`.
    pub fn from_bytes(name: Option<String>, data: Vec<u8>) -> Self {
        let mime_type = sniff_mime_type(&data)
            .or_else(|| name.as_deref().and_then(mime_from_extension))
            .unwrap_or(OCTET_STREAM)
            .to_string();
        Self::new(name, mime_type, data)
    }

    /// Read a file from disk, keeping its file name.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string());
        Ok(Self::from_bytes(name, data))
    }

    /// Copy of this file carrying new bytes.
    pub fn with_data(&self, data: Vec<u8>) -> Self {
        Self {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the declared content type is an image type.
    pub fn is_image(&self) -> bool {
        self.mime_type.to_ascii_lowercase().starts_with("image/")
    }

    /// Display name used in records and logs.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}

/// Reject absent input. An empty file is treated as no file at all.
pub(crate) fn require_present(file: &MediaFile) -> Result<()> {
    if file.is_empty() {
        return Err(VerimarkError::InputError("No file provided".into()));
    }
    Ok(())
}

/// Guess a content type from magic bytes.
pub fn sniff_mime_type(data: &[u8]) -> Option<&'static str> {
    image::guess_format(data).ok().map(|f| f.to_mime_type())
}

fn mime_from_extension(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        "json" => Some("application/json"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniffs_png_magic() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let file = MediaFile::from_bytes(Some("x.bin".into()), png.to_vec());
        assert_eq!(file.mime_type, "image/png");
        assert!(file.is_image());
    }

    #[test]
    fn test_falls_back_to_extension_then_octet_stream() {
        let text = MediaFile::from_bytes(Some("notes.txt".into()), b"hello".to_vec());
        assert_eq!(text.mime_type, "text/plain");
        assert!(!text.is_image());

        let unknown = MediaFile::from_bytes(None, b"hello".to_vec());
        assert_eq!(unknown.mime_type, OCTET_STREAM);
    }

    #[test]
    fn test_empty_file_is_absent() {
        let file = MediaFile::new(None, "image/png", Vec::new());
        assert!(matches!(
            require_present(&file),
            Err(VerimarkError::InputError(_))
        ));
    }

    #[test]
    fn test_with_data_keeps_metadata() {
        let file = MediaFile::new(Some("a.png".into()), "image/png", vec![1, 2, 3]);
        let copy = file.with_data(vec![9]);
        assert_eq!(copy.name.as_deref(), Some("a.png"));
        assert_eq!(copy.mime_type, "image/png");
        assert_eq!(copy.data, vec![9]);
    }
}
