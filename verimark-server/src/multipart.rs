//! Multipart form parsing helpers
//!
//! Every endpoint takes the same form layout: a `file` part plus optional
//! text parts (`options`, `password`, `is_public`).

use std::collections::HashMap;

use axum::extract::Multipart;
use serde::de::DeserializeOwned;
use verimark_core::MediaFile;

use crate::error::ApiError;
use crate::validation::{resolve_content_type, validate_file_size};

/// Represents a file uploaded via multipart form
#[derive(Debug, Clone)]
pub struct FileField {
    /// File data bytes
    pub data: Vec<u8>,
    /// Content-Type from the multipart field (if provided)
    pub content_type: Option<String>,
    /// Original filename from the multipart field (if provided)
    pub file_name: Option<String>,
}

impl FileField {
    /// Convert into the core file handle, sniffing the type when the client
    /// sent none or a generic one.
    pub fn into_media(self) -> MediaFile {
        let mime_type = resolve_content_type(self.content_type.as_deref(), &self.data);
        MediaFile::new(self.file_name, mime_type, self.data)
    }
}

/// Parsed multipart form fields
#[derive(Debug)]
pub struct MultipartFields {
    /// File field (named "file")
    file: Option<FileField>,
    /// Text fields indexed by name
    text_fields: HashMap<String, String>,
}

impl MultipartFields {
    /// Parse all fields from a multipart request
    ///
    /// # Arguments
    /// * `multipart` - The Axum multipart extractor
    /// * `max_file_size` - Maximum allowed file size in bytes
    pub async fn parse(multipart: &mut Multipart, max_file_size: usize) -> Result<Self, ApiError> {
        let mut file: Option<FileField> = None;
        let mut text_fields = HashMap::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == "file" {
                let content_type = field.content_type().map(|s| s.to_string());
                let file_name = field.file_name().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?
                    .to_vec();

                validate_file_size(data.len(), max_file_size)?;

                file = Some(FileField {
                    data,
                    content_type,
                    file_name,
                });
            } else {
                let value = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read field '{}': {}", name, e))
                })?;
                text_fields.insert(name, value);
            }
        }

        Ok(Self { file, text_fields })
    }

    /// Take the uploaded file as a [`MediaFile`]
    ///
    /// Returns an error if no file was uploaded.
    pub fn take_media(&mut self) -> Result<MediaFile, ApiError> {
        self.file
            .take()
            .map(FileField::into_media)
            .ok_or_else(|| {
                ApiError::bad_request("No file provided. Use 'file' field in multipart form.")
            })
    }

    /// Get a text field value
    ///
    /// Returns `None` if the field is not present or blank.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.text_fields
            .get(name)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Get a text field parsed as a boolean
    ///
    /// Returns `true` if the field value is "true" (case-insensitive), `false` otherwise.
    pub fn get_bool(&self, name: &str) -> bool {
        self.text_fields
            .get(name)
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false)
    }

    /// Get a text field parsed as JSON
    ///
    /// Returns:
    /// - `Ok(Some(T))` if the field exists and is valid JSON
    /// - `Ok(None)` if the field is missing or empty
    /// - `Err(ApiError)` if the field exists but JSON parsing fails
    pub fn get_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ApiError> {
        match self.text_fields.get(name) {
            Some(json) if !json.is_empty() => {
                let value: T = serde_json::from_str(json)
                    .map_err(|e| ApiError::bad_request(format!("Invalid {} JSON: {}", name, e)))?;
                Ok(Some(value))
            }
            _ => Ok(None),
        }
    }

    /// Like [`get_json`](Self::get_json) but the field must be present.
    pub fn require_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, ApiError> {
        self.get_json(name)?.ok_or_else(|| {
            ApiError::bad_request(format!("Missing '{name}' field in multipart form."))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> MultipartFields {
        MultipartFields {
            file: None,
            text_fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_get_bool() {
        let fields = fields(&[
            ("flag1", "true"),
            ("flag2", "false"),
            ("flag3", "TRUE"),
            ("flag4", "yes"),
        ]);

        assert!(fields.get_bool("flag1"));
        assert!(!fields.get_bool("flag2"));
        assert!(fields.get_bool("flag3"));
        assert!(!fields.get_bool("flag4"));
        assert!(!fields.get_bool("missing"));
    }

    #[test]
    fn test_get_text_skips_blank() {
        let fields = fields(&[("password", ""), ("name", "test")]);
        assert_eq!(fields.get_text("name"), Some("test"));
        assert_eq!(fields.get_text("password"), None);
        assert_eq!(fields.get_text("missing"), None);
    }

    #[test]
    fn test_json_fields() {
        let fields = fields(&[("options", r#"{"a": 1}"#), ("broken", "{")]);
        let value: serde_json::Value = fields.require_json("options").unwrap();
        assert_eq!(value["a"], 1);
        assert!(fields.get_json::<serde_json::Value>("broken").is_err());
        assert!(fields.require_json::<serde_json::Value>("missing").is_err());
    }

    #[test]
    fn test_take_media_missing() {
        let mut fields = fields(&[]);
        assert!(matches!(fields.take_media(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_file_field_sniffs_generic_type() {
        let field = FileField {
            data: vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
            content_type: Some("application/octet-stream".into()),
            file_name: Some("upload".into()),
        };
        let media = field.into_media();
        assert_eq!(media.mime_type, "image/png");
        assert_eq!(media.name.as_deref(), Some("upload"));
    }
}
