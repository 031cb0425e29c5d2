//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;
use verimark_core::{InMemoryLedger, Ledger, RegistrationSession};

use crate::config::Config;
use crate::validation::DEFAULT_MAX_FILE_SIZE;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Ledger that anchors proof digests
    pub ledger: Arc<dyn Ledger>,
    /// Registration sessions, keyed by session id
    pub sessions: Arc<DashMap<Uuid, RegistrationSession>>,
    /// Maximum upload size in bytes
    pub max_file_size: usize,
}

impl AppState {
    pub fn new(ledger: Arc<dyn Ledger>, max_file_size: usize) -> Self {
        Self {
            ledger,
            sessions: Arc::new(DashMap::new()),
            max_file_size,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let ledger = InMemoryLedger::starting_at(config.ledger_start_block);
        Self::new(Arc::new(ledger), config.max_file_size())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryLedger::new()), DEFAULT_MAX_FILE_SIZE)
    }
}
