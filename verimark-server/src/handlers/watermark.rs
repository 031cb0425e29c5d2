//! Watermark handlers
//!
//! Handles POST /watermark/embed and POST /watermark/extract.

use axum::{
    extract::{Multipart, State},
    response::Response,
    Json,
};
use verimark_core::{
    embed_watermark_with_context, extract_watermark_with_context, VerificationResult,
    WatermarkOptions,
};

use crate::error::ApiError;
use crate::handlers::{file_download, run_codec};
use crate::multipart::MultipartFields;
use crate::state::AppState;

/// Embed an invisible watermark
///
/// Accepts multipart/form-data with:
/// - **file** (required): PNG, WebP or JPEG image
/// - **options** (required): JSON `WatermarkOptions`, e.g.
///   `{"type":"text","content":"HELLO","algorithm":"dwt","strength":70}`
/// - **password** (optional): used when `options.password` is absent
///
/// Responds with the watermarked image in the input's content type.
#[utoipa::path(
    post,
    path = "/watermark/embed",
    tag = "Watermark",
    request_body(content_type = "multipart/form-data", description = "Carrier image plus JSON options"),
    responses(
        (status = 200, description = "Watermarked image", content_type = "application/octet-stream"),
        (status = 400, description = "Missing file or invalid options"),
        (status = 413, description = "File too large or image too small for the payload"),
        (status = 415, description = "Not a supported raster image")
    )
)]
pub async fn watermark_embed_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let file = fields.take_media()?;
    let mut options: WatermarkOptions = fields.require_json("options")?;
    if options.password.is_none() {
        options.password = fields.get_text("password").map(str::to_string);
    }

    tracing::info!(
        file = %file.display_name(),
        bytes = file.len(),
        algorithm = ?options.algorithm,
        "Embedding watermark"
    );

    let marked = run_codec("watermark embed", move |ctx| {
        embed_watermark_with_context(&file, &options, ctx)
    })
    .await?;

    Ok(file_download(marked, "watermarked"))
}

/// Extract and verify a watermark
///
/// Accepts multipart/form-data with:
/// - **file** (required): image to check
/// - **password** (optional): for password-bound or encrypted watermarks
///
/// Always responds 200 with a `VerificationResult` when the file is an image;
/// `isVerified` and `failure` describe the outcome.
#[utoipa::path(
    post,
    path = "/watermark/extract",
    tag = "Watermark",
    request_body(content_type = "multipart/form-data", description = "Image plus optional password"),
    responses(
        (status = 200, description = "Verification result (VerificationResult JSON)", content_type = "application/json"),
        (status = 400, description = "Missing file"),
        (status = 415, description = "Not an image")
    )
)]
pub async fn watermark_extract_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<VerificationResult>, ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let file = fields.take_media()?;
    let password = fields.get_text("password").map(str::to_string);

    let result = run_codec("watermark extract", move |ctx| {
        extract_watermark_with_context(&file, password.as_deref(), ctx)
    })
    .await?;

    tracing::info!(
        verified = result.is_verified,
        failure = ?result.failure,
        confidence = result.confidence_score,
        tampered = result.tampered_areas.len(),
        "Watermark extracted"
    );
    Ok(Json(result))
}
