use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerimarkError {
    /// The operation was invoked without a file (or with an empty one).
    #[error("Input error: {0}")]
    InputError(String),

    /// The file is of a kind the operation cannot carry data in.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A password was required, missing, or wrong.
    #[error("Password error: {0}")]
    PasswordError(String),

    /// Expected embedded data was not found or failed its integrity check.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Carrier too small: payload needs {needed} slots, image provides {available}")]
    CapacityExceeded { needed: usize, available: usize },

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Crypto error: {0}")]
    CryptoError(String),

    #[error("Ledger error: {message}")]
    LedgerError { message: String, transient: bool },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl VerimarkError {
    /// Whether retrying the same call may succeed.
    ///
    /// Only infrastructure failures are transient. Verification-negative
    /// outcomes (wrong password, missing watermark) are final.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::LedgerError { transient: true, .. })
    }

    pub fn ledger_transient(message: impl Into<String>) -> Self {
        Self::LedgerError {
            message: message.into(),
            transient: true,
        }
    }

    pub fn ledger_permanent(message: impl Into<String>) -> Self {
        Self::LedgerError {
            message: message.into(),
            transient: false,
        }
    }
}

impl From<serde_json::Error> for VerimarkError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VerimarkError>;
