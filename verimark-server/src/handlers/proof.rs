//! Proof handler
//!
//! Handles POST /proof requests.

use axum::{
    extract::{Multipart, State},
    Json,
};
use tokio_util::sync::CancellationToken;
use verimark_core::{generate_blockchain_proof_with_context, BlockchainProof, OperationContext};

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;

/// Generate a blockchain proof
///
/// Accepts multipart/form-data with **file** (required, any type). The
/// SHA3-256 digest is anchored on the server's ledger; identical bytes always
/// yield the same `hash`.
#[utoipa::path(
    post,
    path = "/proof",
    tag = "Proof",
    request_body(content_type = "multipart/form-data", description = "File to anchor"),
    responses(
        (status = 200, description = "Proof (BlockchainProof JSON)", content_type = "application/json"),
        (status = 400, description = "Missing file"),
        (status = 503, description = "Ledger unavailable")
    )
)]
pub async fn proof_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BlockchainProof>, ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let file = fields.take_media()?;

    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();
    let ctx = OperationContext::new(token);

    let proof = generate_blockchain_proof_with_context(&file, state.ledger.as_ref(), &ctx).await?;
    Ok(Json(proof))
}
