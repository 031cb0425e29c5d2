//! Content-addressed proofs of existence.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::{info, instrument};

use crate::context::{OperationContext, Stage};
use crate::error::{Result, VerimarkError};
use crate::fingerprint::{ContentDigest, PerceptualHash};
use crate::ledger::{anchor_with_retry, Ledger, RetryPolicy};
use crate::media::MediaFile;

/// Bytes hashed between cancellation checks.
const HASH_CHUNK: usize = 1 << 20;

/// Proof that a file with this exact digest existed when it was anchored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainProof {
    /// `0x` + 64 hex chars of SHA3-256 over the file bytes.
    pub hash: String,
    /// RFC 3339 UTC with millisecond precision.
    pub timestamp: String,
    pub block_number: u64,
    pub transaction_id: String,
    /// Blockhash of image files, stable across re-encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perceptual_hash: Option<PerceptualHash>,
}

/// Hash `file` and anchor the digest on `ledger`.
///
/// Empty files are accepted and hash to the SHA3-256 of empty input.
/// Identical bytes always produce the same `hash`.
pub async fn generate_blockchain_proof(
    file: &MediaFile,
    ledger: &dyn Ledger,
) -> Result<BlockchainProof> {
    generate_blockchain_proof_with_context(file, ledger, &OperationContext::default()).await
}

#[instrument(level = "debug", skip_all, fields(bytes = file.len(), ledger = ledger.ledger_id()))]
pub async fn generate_blockchain_proof_with_context(
    file: &MediaFile,
    ledger: &dyn Ledger,
    ctx: &OperationContext,
) -> Result<BlockchainProof> {
    ctx.check_cancelled()?;
    let digest = digest_with_context(&file.data, ctx)?;
    let perceptual_hash = if file.is_image() {
        PerceptualHash::of_image(&file.data)
    } else {
        None
    };

    ctx.report(Stage::Anchoring, 0.0);
    let policy = RetryPolicy::default();
    let receipt = tokio::select! {
        receipt = anchor_with_retry(ledger, &digest, &policy) => receipt?,
        _ = ctx.cancellation_token().cancelled() => return Err(VerimarkError::Cancelled),
    };
    ctx.report(Stage::Anchoring, 1.0);

    let proof = BlockchainProof {
        hash: digest.to_prefixed_hex(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        block_number: receipt.block_number,
        transaction_id: receipt.transaction_id,
        perceptual_hash,
    };
    info!(
        hash = %proof.hash,
        block_number = proof.block_number,
        "Generated blockchain proof"
    );
    Ok(proof)
}

/// SHA3-256 over `data` in chunks, honouring cancellation between chunks.
fn digest_with_context(data: &[u8], ctx: &OperationContext) -> Result<ContentDigest> {
    let mut hasher = Sha3_256::new();
    let chunks = data.len().div_ceil(HASH_CHUNK);
    for (i, chunk) in data.chunks(HASH_CHUNK).enumerate() {
        ctx.check_cancelled()?;
        hasher.update(chunk);
        ctx.report(Stage::Hashing, (i + 1) as f32 / chunks as f32);
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Ok(ContentDigest(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::ledger::{InMemoryLedger, LedgerReceipt};

    /// Never answers.
    struct StalledLedger;

    #[async_trait]
    impl Ledger for StalledLedger {
        async fn anchor(&self, _digest: &ContentDigest) -> Result<LedgerReceipt> {
            std::future::pending().await
        }

        fn ledger_id(&self) -> &str {
            "stalled"
        }
    }

    fn text_file(data: &[u8]) -> MediaFile {
        MediaFile::new(Some("notes.txt".into()), "text/plain", data.to_vec())
    }

    #[tokio::test]
    async fn test_same_bytes_same_hash() {
        let ledger = InMemoryLedger::new();
        let a = generate_blockchain_proof(&text_file(b"abc"), &ledger).await.unwrap();
        let b = generate_blockchain_proof(&text_file(b"abc"), &ledger).await.unwrap();
        assert_eq!(a.hash, b.hash);
        assert_ne!(a.block_number, b.block_number);
        assert_ne!(a.transaction_id, b.transaction_id);
    }

    #[tokio::test]
    async fn test_one_byte_change_changes_hash() {
        let ledger = InMemoryLedger::new();
        let a = generate_blockchain_proof(&text_file(b"abc"), &ledger).await.unwrap();
        let b = generate_blockchain_proof(&text_file(b"abd"), &ledger).await.unwrap();
        assert_ne!(a.hash, b.hash);
    }

    #[tokio::test]
    async fn test_chunked_digest_matches_one_shot() {
        let data: Vec<u8> = (0..(HASH_CHUNK * 2 + 17)).map(|i| (i % 251) as u8).collect();
        let chunked = digest_with_context(&data, &OperationContext::default()).unwrap();
        assert_eq!(chunked, ContentDigest::of(&data));
    }

    #[tokio::test]
    async fn test_empty_file_is_accepted() {
        let proof = generate_blockchain_proof(&text_file(b""), &InMemoryLedger::new())
            .await
            .unwrap();
        assert_eq!(
            proof.hash,
            "0xa7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
        assert!(proof.perceptual_hash.is_none());
    }

    #[tokio::test]
    async fn test_timestamp_and_json_shape() {
        let proof = generate_blockchain_proof(&text_file(b"x"), &InMemoryLedger::new())
            .await
            .unwrap();
        assert!(proof.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&proof.timestamp).is_ok());
        // 2024-01-01T00:00:00.000Z
        assert_eq!(proof.timestamp.len(), 24);

        let json = serde_json::to_value(&proof).unwrap();
        assert!(json["blockNumber"].is_u64());
        assert!(json["transactionId"].is_string());
        assert!(json.get("perceptualHash").is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_hashing() {
        let ctx = OperationContext::default();
        ctx.cancellation_token().cancel();
        let err = generate_blockchain_proof_with_context(
            &text_file(b"x"),
            &InMemoryLedger::new(),
            &ctx,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, VerimarkError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_while_anchoring() {
        let ctx = OperationContext::default();
        let token = ctx.cancellation_token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let err = generate_blockchain_proof_with_context(&text_file(b"x"), &StalledLedger, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, VerimarkError::Cancelled));
    }
}
