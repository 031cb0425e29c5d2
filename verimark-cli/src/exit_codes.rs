//! Exit codes following sysexits.h conventions.
//!
//! These codes give scripts a way to tell a missing watermark from a wrong
//! password or an unreadable file without parsing error text.

use verimark_core::VerimarkError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Invalid options (strength, redundancy, quality out of range).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (no watermark, integrity failure, unsupported carrier).
/// Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Ledger unavailable.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: i32 = 69;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Password missing or wrong.
/// Maps to EX_NOPERM from sysexits.h.
pub const PASSWORD_ERROR: i32 = 77;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Typed errors first, then fall back to the context strings the
        // commands attach to file operations.
        let code = if let Some(core) = err.chain().find_map(|e| e.downcast_ref::<VerimarkError>())
        {
            code_for(core)
        } else if message.contains("Failed to read") {
            INPUT_ERROR
        } else if message.contains("Failed to write") || message.contains("serialize") {
            IO_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }
}

fn code_for(err: &VerimarkError) -> i32 {
    match err {
        VerimarkError::InputError(_) => INPUT_ERROR,
        VerimarkError::PasswordError(_) => PASSWORD_ERROR,
        VerimarkError::InvalidOptions(_) => USAGE_ERROR,
        VerimarkError::IntegrityError(_)
        | VerimarkError::UnsupportedType(_)
        | VerimarkError::CapacityExceeded { .. }
        | VerimarkError::ImageError(_)
        | VerimarkError::CryptoError(_) => VERIFICATION_FAILED,
        VerimarkError::LedgerError { .. } => NETWORK_ERROR,
        VerimarkError::SerializationError(_) => IO_ERROR,
        VerimarkError::Cancelled => GENERAL_ERROR,
    }
}
