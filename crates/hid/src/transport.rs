//! HID report transport implementation

use std::fmt;

use hidapi::{DeviceInfo, HidApi, HidDevice};
use keyfob_apdu::{Chunk, ChunkTransport, TransportError, CHUNK_SIZE};
use tracing::debug;

use crate::config::HidConfig;
use crate::error::HidError;

/// Chunk transport over a USB HID interface
///
/// Each 64-byte chunk travels as one HID output report (with a leading zero
/// report id on the wire) and is read back as one input report.
pub struct HidTransport {
    device: HidDevice,
    path: String,
    config: HidConfig,
    connected: bool,
}

impl fmt::Debug for HidTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HidTransport")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("connected", &self.connected)
            .finish()
    }
}

impl HidTransport {
    /// Open a transport to the interface described by `info`
    pub(crate) fn open(
        api: &HidApi,
        info: &DeviceInfo,
        config: HidConfig,
    ) -> Result<Self, HidError> {
        let path = info.path().to_string_lossy().into_owned();
        let device = info.open_device(api).map_err(|source| HidError::OpenFailed {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            device,
            path,
            config,
            connected: true,
        })
    }

    /// Platform device path of the open interface
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Transport configuration
    pub const fn config(&self) -> &HidConfig {
        &self.config
    }
}

impl ChunkTransport for HidTransport {
    fn do_send_chunk(&mut self, chunk: &Chunk) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }

        // Report id 0 precedes the chunk on the wire.
        let mut report = [0u8; CHUNK_SIZE + 1];
        report[1..].copy_from_slice(chunk);

        match self.device.write(&report) {
            Ok(written) if written == report.len() || written == CHUNK_SIZE => Ok(()),
            Ok(written) => {
                debug!(written, "short HID write");
                Err(TransportError::Transmission)
            }
            Err(e) => {
                self.connected = false;
                debug!(error = %e, "HID write failed");
                Err(TransportError::Disconnected)
            }
        }
    }

    fn do_recv_chunk(&mut self) -> Result<Chunk, TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }

        let mut chunk = [0u8; CHUNK_SIZE];
        let timeout_ms = i32::try_from(self.config.read_timeout.as_millis()).unwrap_or(i32::MAX);

        match self.device.read_timeout(&mut chunk, timeout_ms) {
            Ok(0) => Err(TransportError::Timeout),
            Ok(n) if n == CHUNK_SIZE => Ok(chunk),
            Ok(n) => {
                debug!(read = n, "short HID read");
                Err(TransportError::MalformedFrame("short HID input report"))
            }
            Err(e) => {
                self.connected = false;
                debug!(error = %e, "HID read failed");
                Err(TransportError::Disconnected)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        // Drain any stale input reports from an interrupted command cycle.
        let mut scratch = [0u8; CHUNK_SIZE];
        while matches!(self.device.read_timeout(&mut scratch, 0), Ok(n) if n > 0) {}
        self.connected = true;
        Ok(())
    }
}
