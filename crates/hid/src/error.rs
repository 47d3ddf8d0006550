//! Error types for HID transport and discovery

use keyfob_apdu::TransportError;

use crate::discovery::CandidateDevice;

/// HID-specific errors
#[derive(Debug, thiserror::Error)]
pub enum HidError {
    /// Error reported by the hidapi backend
    #[error("HID backend error: {0}")]
    Backend(#[from] hidapi::HidError),

    /// No compatible signing device was found
    ///
    /// Carries every HID device that was visible during enumeration so
    /// callers can report what is attached instead.
    #[error("no compatible signing device found ({} candidate devices visible)", candidates.len())]
    NoDeviceFound {
        /// All HID devices visible at enumeration time
        candidates: Vec<CandidateDevice>,
    },

    /// The selected device could not be opened
    #[error("failed to open device at {path}")]
    OpenFailed {
        /// Platform device path
        path: String,
        /// Underlying backend error
        #[source]
        source: hidapi::HidError,
    },
}

impl From<HidError> for TransportError {
    fn from(error: HidError) -> Self {
        match error {
            HidError::NoDeviceFound { .. } => Self::Connection,
            HidError::OpenFailed { .. } => Self::Connection,
            HidError::Backend(e) => Self::Other(e.to_string()),
        }
    }
}
