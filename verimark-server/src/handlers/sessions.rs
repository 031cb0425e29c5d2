//! Registration session handlers
//!
//! Sessions hold the records of registered files, newest first, until the
//! server restarts.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;
use uuid::Uuid;
use verimark_core::session::EXPORT_FILE_NAME;
use verimark_core::{
    generate_blockchain_proof_with_context, BlockchainRecord, OperationContext, RegistrationSession,
};

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;
use crate::validation::parse_session_id;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    pub record_count: usize,
}

fn session_not_found(id: Uuid) -> ApiError {
    ApiError::not_found(format!("Session {id} does not exist"))
}

/// Open a registration session
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "Sessions",
    responses((status = 201, description = "Session created", body = SessionResponse))
)]
pub async fn create_session_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let session = RegistrationSession::new();
    let id = session.id();
    state.sessions.insert(id, session);
    tracing::info!(session = %id, "Session created");

    (
        StatusCode::CREATED,
        Json(SessionResponse {
            id: id.to_string(),
            record_count: 0,
        }),
    )
}

/// Register a file in a session
///
/// Accepts multipart/form-data with **file** (required) and **is_public**
/// (optional, `"true"` or `"false"`, default false).
#[utoipa::path(
    post,
    path = "/sessions/{id}/records",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    request_body(content_type = "multipart/form-data", description = "File plus visibility"),
    responses(
        (status = 201, description = "Record (BlockchainRecord JSON)", content_type = "application/json"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn register_record_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<BlockchainRecord>), ApiError> {
    let id = parse_session_id(&id)?;
    if !state.sessions.contains_key(&id) {
        return Err(session_not_found(id));
    }

    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let file = fields.take_media()?;
    let is_public = fields.get_bool("is_public");

    // A dropped request cancels the anchoring in flight.
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();
    let ctx = OperationContext::new(token);

    // Anchor without holding the session entry across the await.
    let proof = generate_blockchain_proof_with_context(&file, state.ledger.as_ref(), &ctx).await?;
    let record = BlockchainRecord::from_proof(&file, proof, is_public);

    let mut session = state
        .sessions
        .get_mut(&id)
        .ok_or_else(|| session_not_found(id))?;
    session.push(record.clone());

    tracing::info!(
        session = %id,
        record = %record.id,
        block = record.block_number,
        "Registered file"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// List a session's records, newest first
#[utoipa::path(
    get,
    path = "/sessions/{id}/records",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Records (BlockchainRecord JSON array)", content_type = "application/json"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn list_records_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<BlockchainRecord>>, ApiError> {
    let id = parse_session_id(&id)?;
    let session = state.sessions.get(&id).ok_or_else(|| session_not_found(id))?;
    Ok(Json(session.records().to_vec()))
}

/// Download a session's records as `blockchain_records.json`
#[utoipa::path(
    get,
    path = "/sessions/{id}/records/export",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Pretty-printed JSON attachment", content_type = "application/json"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn export_records_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_session_id(&id)?;
    let json = {
        let session = state.sessions.get(&id).ok_or_else(|| session_not_found(id))?;
        session.export_json()?
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        json,
    )
        .into_response())
}
