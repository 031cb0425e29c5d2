//! Registration sessions: the list of files a user has anchored.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::context::OperationContext;
use crate::error::Result;
use crate::fingerprint::PerceptualHash;
use crate::ledger::Ledger;
use crate::media::MediaFile;
use crate::proof::{generate_blockchain_proof_with_context, BlockchainProof};

/// Default file name for exported records.
pub const EXPORT_FILE_NAME: &str = "blockchain_records.json";

/// One registered file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainRecord {
    pub id: String,
    pub file_name: String,
    pub file_type: String,
    pub hash: String,
    pub timestamp: String,
    pub block_number: u64,
    pub transaction_id: String,
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perceptual_hash: Option<PerceptualHash>,
}

impl BlockchainRecord {
    pub fn from_proof(file: &MediaFile, proof: BlockchainProof, is_public: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_name: file.display_name().to_string(),
            file_type: file.mime_type.clone(),
            hash: proof.hash,
            timestamp: proof.timestamp,
            block_number: proof.block_number,
            transaction_id: proof.transaction_id,
            is_public,
            perceptual_hash: proof.perceptual_hash,
        }
    }
}

/// Records registered in one session, newest first.
#[derive(Debug, Clone)]
pub struct RegistrationSession {
    id: Uuid,
    records: Vec<BlockchainRecord>,
}

impl Default for RegistrationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            records: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn records(&self) -> &[BlockchainRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&BlockchainRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Highest block number among the records.
    pub fn latest_block(&self) -> Option<u64> {
        self.records.iter().map(|r| r.block_number).max()
    }

    /// Put `record` at the front of the list.
    pub fn push(&mut self, record: BlockchainRecord) {
        self.records.insert(0, record);
    }

    /// Generate a proof for `file` and record it.
    pub async fn register(
        &mut self,
        file: &MediaFile,
        is_public: bool,
        ledger: &dyn Ledger,
    ) -> Result<BlockchainRecord> {
        self.register_with_context(file, is_public, ledger, &OperationContext::default())
            .await
    }

    pub async fn register_with_context(
        &mut self,
        file: &MediaFile,
        is_public: bool,
        ledger: &dyn Ledger,
        ctx: &OperationContext,
    ) -> Result<BlockchainRecord> {
        let proof = generate_blockchain_proof_with_context(file, ledger, ctx).await?;
        let record = BlockchainRecord::from_proof(file, proof, is_public);
        info!(
            session = %self.id,
            record = %record.id,
            file = %record.file_name,
            "Registered file"
        );
        self.push(record.clone());
        Ok(record)
    }

    /// Records as a pretty-printed JSON array.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    /// Session holding the records of an exported JSON array, in the order
    /// given.
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<BlockchainRecord> = serde_json::from_str(json)?;
        Ok(Self {
            id: Uuid::new_v4(),
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerimarkError;
    use crate::ledger::{InMemoryLedger, DEFAULT_START_BLOCK};

    fn file(name: &str, data: &[u8]) -> MediaFile {
        MediaFile::new(Some(name.into()), "application/pdf", data.to_vec())
    }

    #[tokio::test]
    async fn test_register_newest_first() {
        let ledger = InMemoryLedger::new();
        let mut session = RegistrationSession::new();
        session.register(&file("a.pdf", b"a"), true, &ledger).await.unwrap();
        session.register(&file("b.pdf", b"b"), false, &ledger).await.unwrap();

        let records = session.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].file_name, "b.pdf");
        assert!(!records[0].is_public);
        assert_eq!(records[1].file_name, "a.pdf");
        assert_eq!(records[1].block_number, DEFAULT_START_BLOCK);
        assert_eq!(session.latest_block(), Some(DEFAULT_START_BLOCK + 1));
        assert!(Uuid::parse_str(&records[0].id).is_ok());
    }

    #[tokio::test]
    async fn test_export_roundtrip_keeps_order() {
        let ledger = InMemoryLedger::new();
        let mut session = RegistrationSession::new();
        session.register(&file("a.pdf", b"a"), true, &ledger).await.unwrap();
        session.register(&file("b.pdf", b"b"), true, &ledger).await.unwrap();

        let json = session.export_json().unwrap();
        assert!(json.starts_with("[\n"));
        assert!(json.contains("\"fileName\": \"b.pdf\""));
        assert!(json.contains("\"isPublic\": true"));

        let restored = RegistrationSession::from_json(&json).unwrap();
        assert_eq!(restored.records(), session.records());
        assert_ne!(restored.id(), session.id());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            RegistrationSession::from_json("{not json"),
            Err(VerimarkError::SerializationError(_))
        ));
    }

    #[test]
    fn test_empty_session_exports_empty_array() {
        let session = RegistrationSession::new();
        assert!(session.is_empty());
        assert_eq!(session.export_json().unwrap(), "[]");
        assert!(session.find("nope").is_none());
    }
}
