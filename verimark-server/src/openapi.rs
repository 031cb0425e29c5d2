//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document served under `/docs`.

use utoipa::OpenApi;

use crate::handlers::{ExtractMessageResponse, HealthResponse, ReadyResponse, SessionResponse};

/// Verimark API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Verimark API",
        version = "0.1.0",
        description = r#"
## Content protection for images and files

- **Watermark**: invisible DCT or Haar-wavelet watermarks with integrity
  checking, optional password binding or encryption, and tamper localisation
- **Steganography**: hidden text messages (LSB, DCT, keyed LSB), optionally
  encrypted with ChaCha20-Poly1305
- **Proof**: SHA3-256 content digests anchored on a ledger, collected into
  registration sessions

All endpoints take `multipart/form-data` with a `file` part. Options are sent
as a JSON `options` part; passwords as a `password` part.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers((url = "http://localhost:3000", description = "Local development server")),
    tags(
        (name = "Watermark", description = "Embed and verify invisible watermarks"),
        (name = "Steganography", description = "Hide and reveal text messages"),
        (name = "Proof", description = "Content digests anchored on a ledger"),
        (name = "Sessions", description = "Registration sessions and record export"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::watermark::watermark_embed_handler,
        crate::handlers::watermark::watermark_extract_handler,
        crate::handlers::steganography::steganography_embed_handler,
        crate::handlers::steganography::steganography_extract_handler,
        crate::handlers::proof::proof_handler,
        crate::handlers::sessions::create_session_handler,
        crate::handlers::sessions::register_record_handler,
        crate::handlers::sessions::list_records_handler,
        crate::handlers::sessions::export_records_handler,
    ),
    components(schemas(HealthResponse, ReadyResponse, ExtractMessageResponse, SessionResponse))
)]
pub struct ApiDoc;
