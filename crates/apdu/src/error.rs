//! Error types for the chunked APDU codec
//!
//! Transport failures and protocol failures are kept separate: a
//! [`TransportError`] means the channel itself broke (disconnect, timeout,
//! malformed framing), while the remaining [`Error`] variants cover
//! well-framed exchanges the device or codec refused.

use crate::status::StatusWord;

/// Result alias for codec operations
pub type Result<T> = core::result::Result<T, Error>;

/// Failures of the underlying chunk channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the channel to the device
    #[error("failed to connect to device")]
    Connection,

    /// A chunk could not be written or read
    #[error("failed to transmit chunk")]
    Transmission,

    /// The device went away mid-exchange
    #[error("device disconnected")]
    Disconnected,

    /// No chunk arrived within the configured read timeout
    #[error("operation timed out")]
    Timeout,

    /// A received chunk violated the framing rules
    #[error("malformed chunk framing: {0}")]
    MalformedFrame(&'static str),

    /// Other transport error with message
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create a general other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }
}

/// Error type for APDU exchanges
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The device answered with a non-success status word
    #[error("device returned status {status}: {}", .status.description())]
    Status {
        /// Status word carried by the response trailer
        status: StatusWord,
    },

    /// Payload cannot be represented in the chunked command format
    #[error("payload of {0} bytes exceeds the chunked command limit")]
    PayloadTooLarge(usize),

    /// Response bytes did not parse as expected
    #[error("parse error: {0}")]
    Parse(&'static str),

    /// The exchange violated the request/response discipline
    #[error("protocol error: {0}")]
    Protocol(&'static str),
}

impl Error {
    /// Create a new status error
    pub const fn status(status: StatusWord) -> Self {
        Self::Status { status }
    }

    /// Get the status word if this is a status error
    pub const fn status_word(&self) -> Option<StatusWord> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_reports_description() {
        let err = Error::status(StatusWord::new(0x6D, 0x00));
        assert!(err.to_string().contains("not supported"));
        assert_eq!(err.status_word(), Some(StatusWord::new(0x6D, 0x00)));
    }

    #[test]
    fn transport_error_converts() {
        let err: Error = TransportError::Timeout.into();
        assert!(matches!(err, Error::Transport(TransportError::Timeout)));
    }
}
