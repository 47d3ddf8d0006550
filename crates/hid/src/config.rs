//! Configuration for HID transports

use std::time::Duration;

/// Configuration options for a [`crate::HidTransport`]
#[derive(Debug, Clone)]
pub struct HidConfig {
    /// How long a receive waits for an input report before reporting a
    /// timeout.
    ///
    /// This bounds every operation, including the human-timescale wait for
    /// on-device approval of a signing request. Expiry is surfaced as a
    /// timeout and treated as cancellation; the driver never retries on its
    /// own.
    pub read_timeout: Duration,
}

impl HidConfig {
    /// Replace the read timeout
    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            // Generous enough for a user to read the screen and confirm.
            read_timeout: Duration::from_secs(45),
        }
    }
}
