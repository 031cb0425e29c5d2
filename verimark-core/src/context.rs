//! Progress reporting and cancellation for long-running codec calls.
//!
//! Every contract operation has a `*_with_context` variant that accepts an
//! [`OperationContext`]. Codec loops report progress through the optional
//! [`ProgressSink`] and stop with [`VerimarkError::Cancelled`] as soon as the
//! context's token is cancelled.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, VerimarkError};

/// Phase of an operation, reported alongside the completed fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Decoding,
    Embedding,
    Extracting,
    Encoding,
    Hashing,
    Anchoring,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Decoding => "decoding",
            Self::Embedding => "embedding",
            Self::Extracting => "extracting",
            Self::Encoding => "encoding",
            Self::Hashing => "hashing",
            Self::Anchoring => "anchoring",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub stage: Stage,
    /// Completed fraction of the stage, in `0.0..=1.0`.
    pub fraction: f32,
}

/// Receiver of progress updates. Implementations must be cheap; they are
/// called from inside codec loops.
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update)
    }
}

/// Per-call context: cancellation token plus optional progress sink.
#[derive(Clone, Default)]
pub struct OperationContext {
    cancel: CancellationToken,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl OperationContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            progress: None,
        }
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with `Cancelled` if the token has fired.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(VerimarkError::Cancelled);
        }
        Ok(())
    }

    pub fn report(&self, stage: Stage, fraction: f32) {
        if let Some(sink) = &self.progress {
            sink.report(ProgressUpdate {
                stage,
                fraction: fraction.clamp(0.0, 1.0),
            });
        }
    }

    /// Report `done / total` for a loop and check for cancellation every
    /// `every` iterations.
    pub(crate) fn tick(&self, stage: Stage, done: usize, total: usize, every: usize) -> Result<()> {
        if every == 0 || done % every != 0 {
            return Ok(());
        }
        self.check_cancelled()?;
        if total > 0 {
            self.report(stage, done as f32 / total as f32);
        }
        Ok(())
    }
}

impl fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("has_progress", &self.progress.is_some())
            .finish()
    }
}
