//! Error types for settlement

use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] grouptab_ledger_core::Error),

    /// Net positions do not sum to zero
    #[error("Conservation violation: {0}")]
    ConservationViolation(String),

    /// Netting loop ran past n - 1 legs
    #[error("Netting exceeded its iteration bound of {bound} legs")]
    IterationBound {
        /// Maximum legs allowed for the participant count
        bound: usize,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True if the balances fed in are inconsistent and no settlement may be shown
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConservationViolation(_) | Error::IterationBound { .. }
        )
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
