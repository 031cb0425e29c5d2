//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod health;
pub mod proof;
pub mod sessions;
pub mod steganography;
pub mod watermark;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;
use verimark_core::{MediaFile, OperationContext};

use crate::error::ApiError;

pub use crate::state::AppState;
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use proof::proof_handler;
pub use sessions::{
    create_session_handler, export_records_handler, list_records_handler,
    register_record_handler, SessionResponse,
};
pub use steganography::{
    steganography_embed_handler, steganography_extract_handler, ExtractMessageResponse,
};
pub use watermark::{watermark_embed_handler, watermark_extract_handler};

/// Run a codec call on the blocking pool.
///
/// The returned future owns a drop guard on the call's cancellation token, so
/// when axum drops the request (client gone, timeout layer fired) the codec
/// loop sees the cancellation and stops.
pub(crate) async fn run_codec<T, F>(operation: &'static str, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&OperationContext) -> verimark_core::Result<T> + Send + 'static,
{
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();
    let ctx = OperationContext::new(token);

    tokio::task::spawn_blocking(move || f(&ctx))
        .await
        .map_err(|e| ApiError::internal(format!("{operation} task failed: {e}")))?
        .map_err(ApiError::from)
}

/// A processed file returned as a download with its original content type.
pub(crate) fn file_download(file: MediaFile, prefix: &str) -> Response {
    let name = format!("{prefix}_{}", file.display_name());
    let disposition = format!("attachment; filename=\"{}\"", name.replace('"', ""));
    (
        [
            (header::CONTENT_TYPE, file.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.data,
    )
        .into_response()
}
