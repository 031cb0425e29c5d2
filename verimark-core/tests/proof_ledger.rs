//! Proof generation against in-memory and failing ledgers.

use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use verimark_core::{
    generate_blockchain_proof, ContentDigest, InMemoryLedger, Ledger, LedgerReceipt, MediaFile,
    PerceptualHash, RegistrationSession, Result, VerimarkError,
};

/// Times out twice, then delegates.
struct CongestedLedger {
    inner: InMemoryLedger,
    calls: AtomicU32,
}

#[async_trait]
impl Ledger for CongestedLedger {
    async fn anchor(&self, digest: &ContentDigest) -> Result<LedgerReceipt> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < 2 {
            return Err(VerimarkError::ledger_transient("node timed out"));
        }
        self.inner.anchor(digest).await
    }

    fn ledger_id(&self) -> &str {
        "congested"
    }
}

struct RejectingLedger;

#[async_trait]
impl Ledger for RejectingLedger {
    async fn anchor(&self, _digest: &ContentDigest) -> Result<LedgerReceipt> {
        Err(VerimarkError::ledger_permanent("insufficient funds"))
    }

    fn ledger_id(&self) -> &str {
        "rejecting"
    }
}

fn png_bytes() -> Vec<u8> {
    let image = image::RgbImage::from_fn(48, 48, |x, y| image::Rgb([x as u8 * 5, y as u8 * 5, 90]));
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .expect("encoding failed");
    buffer.into_inner()
}

#[tokio::test]
async fn test_two_proofs_of_same_bytes_share_hash() {
    let ledger = InMemoryLedger::new();
    let file = MediaFile::new(Some("contract.pdf".into()), "application/pdf", b"%PDF-1.7".to_vec());
    let first = generate_blockchain_proof(&file, &ledger).await.unwrap();
    let second = generate_blockchain_proof(&file.clone(), &ledger).await.unwrap();

    assert_eq!(first.hash, second.hash);
    assert_eq!(first.hash.len(), 66);
    assert!(first.hash.starts_with("0x"));
    assert_ne!(first.transaction_id, first.hash);
    assert_eq!(second.block_number, first.block_number + 1);
}

#[tokio::test]
async fn test_image_proof_carries_perceptual_hash() {
    let file = MediaFile::new(Some("a.png".into()), "image/png", png_bytes());
    let proof = generate_blockchain_proof(&file, &InMemoryLedger::new())
        .await
        .unwrap();
    let hash = proof.perceptual_hash.expect("image proofs carry a perceptual hash");
    assert_eq!(Some(hash), PerceptualHash::of_image(&file.data));

    let json = serde_json::to_value(&proof).unwrap();
    assert_eq!(json["perceptualHash"].as_str().map(str::len), Some(16));
}

#[tokio::test]
async fn test_transient_ledger_errors_are_retried() {
    let ledger = CongestedLedger {
        inner: InMemoryLedger::starting_at(42),
        calls: AtomicU32::new(0),
    };
    let file = MediaFile::new(None, "text/plain", b"retry me".to_vec());
    let proof = generate_blockchain_proof(&file, &ledger).await.unwrap();
    assert_eq!(proof.block_number, 42);
    assert_eq!(ledger.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_permanent_ledger_error_surfaces() {
    let file = MediaFile::new(None, "text/plain", b"x".to_vec());
    let err = generate_blockchain_proof(&file, &RejectingLedger)
        .await
        .unwrap_err();
    assert!(!err.is_transient());
    assert!(err.to_string().contains("insufficient funds"));
}

#[tokio::test]
async fn test_session_export_and_reload() {
    let ledger = InMemoryLedger::new();
    let mut session = RegistrationSession::new();
    for (name, data) in [("a.txt", b"a".as_slice()), ("b.txt", b"b"), ("c.txt", b"c")] {
        let file = MediaFile::new(Some(name.into()), "text/plain", data.to_vec());
        session.register(&file, name != "b.txt", &ledger).await.unwrap();
    }

    let names: Vec<_> = session.records().iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, ["c.txt", "b.txt", "a.txt"]);
    assert!(!session.records()[1].is_public);

    let reloaded = RegistrationSession::from_json(&session.export_json().unwrap()).unwrap();
    assert_eq!(reloaded.records(), session.records());
    assert_eq!(reloaded.latest_block(), Some(17_000_002));
}
