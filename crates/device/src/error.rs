//! Error types for device sessions

use keyfob_apdu::{StatusWord, TransportError};

use crate::types::AppId;

/// Result type alias for device operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a device session
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The chunk transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The codec layer failed
    #[error(transparent)]
    Protocol(#[from] keyfob_apdu::Error),

    /// The device answered with a non-success status
    #[error("device returned status {status}: {}", .status.description())]
    Device {
        /// Status word from the response trailer
        status: StatusWord,
    },

    /// The user rejected the request on the device screen
    #[error("request rejected on device")]
    UserRejected,

    /// The operation needs test firmware, but the device runs something else
    #[error("operation requires test firmware, device runs {app_id}")]
    TestFirmwareRequired {
        /// Firmware identity the device reported
        app_id: AppId,
    },

    /// A key path was structurally invalid
    #[error("invalid key path: {0}")]
    InvalidPath(&'static str),

    /// A device response did not have the expected shape
    #[error("malformed device response: {0}")]
    Parse(&'static str),
}

impl Error {
    /// Map a non-success status word to the matching error
    pub(crate) fn from_status(status: StatusWord) -> Self {
        if status.is_user_rejection() {
            Self::UserRejected
        } else {
            Self::Device { status }
        }
    }
}
