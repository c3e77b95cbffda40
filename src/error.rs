//! Error types for chronodb.

use thiserror::Error;

/// Result type alias for chronodb operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the format core.
///
/// Corruption is the only error this layer produces at runtime: it is
/// raised when a write batch handed to us (e.g. replayed from a log)
/// does not match its declared framing. Precondition failures such as
/// an out-of-range sequence number are programmer errors and panic via
/// assertions instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Data corruption detected.
    #[error("Corruption detected: {0}")]
    Corruption(String),
}

impl Error {
    /// Create a corruption error with the given message.
    pub fn corruption<S: Into<String>>(msg: S) -> Self {
        Error::Corruption(msg.into())
    }

    /// Check if this error indicates corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }

    /// The message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            Error::Corruption(msg) => msg,
        }
    }
}
