//! Ledgers that anchor content digests and hand back a block receipt.
//!
//! [`InMemoryLedger`] is a deterministic local chain: block numbers count up
//! from a configurable height and transaction ids are derived from the
//! anchored digest, so receipts are reproducible in tests.
//!
//! Remote ledgers fail in two ways. Transient failures (timeouts, rate
//! limits) are retried by [`anchor_with_retry`] with exponential backoff;
//! permanent failures abort immediately.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, VerimarkError};
use crate::fingerprint::ContentDigest;

/// First block handed out by a fresh [`InMemoryLedger`].
pub const DEFAULT_START_BLOCK: u64 = 17_000_000;

/// Where a digest was anchored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReceipt {
    pub block_number: u64,
    /// `0x`-prefixed hex transaction id.
    pub transaction_id: String,
}

/// A chain that timestamps content digests.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Anchor `digest` and return its receipt.
    ///
    /// Infrastructure failures should be reported with
    /// [`VerimarkError::ledger_transient`] when a retry may succeed.
    async fn anchor(&self, digest: &ContentDigest) -> Result<LedgerReceipt>;

    /// Short identifier for logs.
    fn ledger_id(&self) -> &str;
}

#[derive(Debug)]
struct ChainState {
    next_block: u64,
    sequence: u64,
}

/// Process-local ledger with monotonically increasing block numbers.
#[derive(Debug)]
pub struct InMemoryLedger {
    state: Mutex<ChainState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::starting_at(DEFAULT_START_BLOCK)
    }

    /// Ledger whose first receipt carries block `block`.
    pub fn starting_at(block: u64) -> Self {
        Self {
            state: Mutex::new(ChainState {
                next_block: block,
                sequence: 0,
            }),
        }
    }

    /// Block number the next anchor will receive.
    pub fn next_block(&self) -> Result<u64> {
        let state = self
            .state
            .lock()
            .map_err(|_| VerimarkError::ledger_permanent("ledger state poisoned"))?;
        Ok(state.next_block)
    }

    fn transaction_id(digest: &ContentDigest, block: u64, sequence: u64) -> String {
        let mut hasher = Sha3_256::new();
        hasher.update(b"verimark-ledger-tx");
        hasher.update(digest.0);
        hasher.update(block.to_be_bytes());
        hasher.update(sequence.to_be_bytes());
        format!("0x{}", hex::encode(hasher.finalize()))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn anchor(&self, digest: &ContentDigest) -> Result<LedgerReceipt> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| VerimarkError::ledger_permanent("ledger state poisoned"))?;
        let block_number = state.next_block;
        state.next_block = block_number
            .checked_add(1)
            .ok_or_else(|| VerimarkError::ledger_permanent("block height overflow"))?;
        state.sequence += 1;

        let transaction_id = Self::transaction_id(digest, block_number, state.sequence);
        debug!(block_number, sequence = state.sequence, "Anchored digest");
        Ok(LedgerReceipt {
            block_number,
            transaction_id,
        })
    }

    fn ledger_id(&self) -> &str {
        "in-memory"
    }
}

/// Backoff settings for [`anchor_with_retry`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Give up once this much time has passed since the first attempt.
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(2),
            max_elapsed: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn build_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        }
    }
}

/// Anchor `digest`, retrying transient ledger failures with exponential
/// backoff.
#[instrument(level = "info", skip_all, fields(ledger = ledger.ledger_id()))]
pub async fn anchor_with_retry(
    ledger: &dyn Ledger,
    digest: &ContentDigest,
    policy: &RetryPolicy,
) -> Result<LedgerReceipt> {
    let start = Instant::now();

    let result = retry_notify(
        policy.build_backoff(),
        || async {
            ledger.anchor(digest).await.map_err(|e| {
                if e.is_transient() {
                    backoff::Error::transient(e)
                } else {
                    warn!(error = %e, "Permanent ledger error, aborting");
                    backoff::Error::permanent(e)
                }
            })
        },
        |err: VerimarkError, duration: Duration| {
            warn!(
                error = %err,
                retry_after_ms = duration.as_millis() as u64,
                "Retry scheduled"
            );
        },
    )
    .await;

    let total_latency_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(receipt) => info!(
            block_number = receipt.block_number,
            total_latency_ms, "Digest anchored"
        ),
        Err(e) => warn!(error = %e, total_latency_ms, "Failed to anchor digest after all retries"),
    }
    result
}
