//! Steganography handlers
//!
//! Handles POST /steganography/embed and POST /steganography/extract.

use axum::{
    extract::{Multipart, State},
    response::Response,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use verimark_core::{
    embed_steganography_with_context, extract_steganography_with_context, SteganographyOptions,
};

use crate::error::ApiError;
use crate::handlers::{file_download, run_codec};
use crate::multipart::MultipartFields;
use crate::state::AppState;

/// Recovered hidden message
#[derive(Serialize, ToSchema)]
pub struct ExtractMessageResponse {
    #[schema(example = "meet at the old mill, 6pm")]
    pub message: String,
}

/// Hide a message inside an image
///
/// Accepts multipart/form-data with:
/// - **file** (required): carrier image (PNG/WebP for `lsb` and `advanced`)
/// - **options** (required): JSON `SteganographyOptions`, e.g.
///   `{"message":"hi","method":"advanced"}`
/// - **password** (optional): used when `options.password` is absent
#[utoipa::path(
    post,
    path = "/steganography/embed",
    tag = "Steganography",
    request_body(content_type = "multipart/form-data", description = "Carrier image plus JSON options"),
    responses(
        (status = 200, description = "Image carrying the message", content_type = "application/octet-stream"),
        (status = 400, description = "Missing file or invalid options"),
        (status = 413, description = "Message does not fit in the image"),
        (status = 415, description = "Unsupported carrier")
    )
)]
pub async fn steganography_embed_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let file = fields.take_media()?;
    let mut options: SteganographyOptions = fields.require_json("options")?;
    if options.password.is_none() {
        options.password = fields.get_text("password").map(str::to_string);
    }

    tracing::info!(
        file = %file.display_name(),
        method = ?options.method,
        encrypted = options.effective_password().is_some(),
        "Hiding message"
    );

    let stego = run_codec("steganography embed", move |ctx| {
        embed_steganography_with_context(&file, &options, ctx)
    })
    .await?;

    Ok(file_download(stego, "stego"))
}

/// Reveal a hidden message
///
/// Accepts multipart/form-data with:
/// - **file** (required): image carrying a message
/// - **password** (optional): for encrypted messages
#[utoipa::path(
    post,
    path = "/steganography/extract",
    tag = "Steganography",
    request_body(content_type = "multipart/form-data", description = "Image plus optional password"),
    responses(
        (status = 200, description = "Hidden message", body = ExtractMessageResponse),
        (status = 401, description = "Password required or invalid"),
        (status = 422, description = "No hidden data found")
    )
)]
pub async fn steganography_extract_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractMessageResponse>, ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let file = fields.take_media()?;
    let password = fields.get_text("password").map(str::to_string);

    let message = run_codec("steganography extract", move |ctx| {
        extract_steganography_with_context(&file, password.as_deref(), ctx)
    })
    .await?;

    tracing::info!(bytes = message.len(), "Message revealed");
    Ok(Json(ExtractMessageResponse { message }))
}
