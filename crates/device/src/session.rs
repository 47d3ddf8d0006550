//! Device session and operations

use bytes::Bytes;
use keyfob_apdu::{codec, ChunkTransport, Command, Response};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::instructions::{self, CLA};
use crate::types::{Curve, DerivationPath, KeySlot, PublicKey, Signature, VersionInfo};

/// A session with one signing device
///
/// Owns the transport for its lifetime; commands run strictly one at a
/// time. The firmware version is fetched once and cached, so the gating
/// checks for test-only operations cost a single extra round trip per
/// session at most.
#[derive(Debug)]
pub struct Session<T: ChunkTransport> {
    transport: T,
    logging: bool,
    version: Option<VersionInfo>,
}

impl<T: ChunkTransport> Session<T> {
    /// Start a session over an open transport
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            logging: false,
            version: None,
        }
    }

    /// Enable hex dumps of command and response payloads at DEBUG level
    ///
    /// Diagnostic only, no protocol effect. Per-session, not global.
    #[must_use]
    pub const fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// Borrow the underlying transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// End the session, returning the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Firmware version and identity, cached after the first query
    pub fn version(&mut self) -> Result<VersionInfo> {
        if let Some(version) = self.version {
            return Ok(version);
        }
        let payload = self.execute(&Command::new(CLA, instructions::GET_VERSION))?;
        let version = VersionInfo::parse(&payload)?;
        info!(%version, "device firmware identified");
        self.version = Some(version);
        Ok(version)
    }

    /// Echo diagnostic, test firmware only
    ///
    /// The device echoes at most one buffer's worth (59 bytes); longer
    /// input comes back truncated.
    pub fn echo(&mut self, data: &[u8]) -> Result<Bytes> {
        self.require_diagnostics()?;
        self.execute(&Command::with_payload(CLA, instructions::ECHO, data.to_vec()))
    }

    /// SHA-256 of `data` computed on the device, test firmware only
    pub fn hash(&mut self, data: &[u8]) -> Result<[u8; 32]> {
        self.require_diagnostics()?;
        let payload = self.execute(&Command::with_payload(
            CLA,
            instructions::HASH,
            data.to_vec(),
        ))?;
        payload
            .as_ref()
            .try_into()
            .map_err(|_| Error::Parse("expected a 32-byte digest"))
    }

    /// Public key of a key slot
    pub fn public_key(&mut self, curve: Curve, slot: &KeySlot) -> Result<PublicKey> {
        debug!(%curve, ?slot, "requesting public key");
        let payload = match slot {
            KeySlot::Derived(path) => self.execute(&Command::with_payload(
                CLA,
                instructions::public_key_ins(curve, false),
                path.encode(),
            ))?,
            KeySlot::Test => {
                self.require_test_slots()?;
                self.execute(&Command::new(CLA, instructions::public_key_ins(curve, true)))?
            }
        };
        PublicKey::from_payload(curve, payload)
    }

    /// Sign `message` with a key slot
    ///
    /// Derived-slot signing sends the encoded path ahead of the message in
    /// its own chunk. The call blocks until the user approves or rejects on
    /// the device (or the transport times out); rejection surfaces as
    /// [`Error::UserRejected`].
    pub fn sign(&mut self, curve: Curve, slot: &KeySlot, message: &[u8]) -> Result<Signature> {
        debug!(%curve, ?slot, message_len = message.len(), "requesting signature");
        let payload = match slot {
            KeySlot::Derived(path) => {
                let command = Command::with_payload(
                    CLA,
                    instructions::sign_ins(curve, false),
                    message.to_vec(),
                );
                self.log_command(&command);
                let response =
                    codec::exchange_with_lead(&mut self.transport, &command, &path.encode())?;
                self.log_response(&response);
                Self::unwrap_response(response)?
            }
            KeySlot::Test => {
                self.require_test_slots()?;
                self.execute(&Command::with_payload(
                    CLA,
                    instructions::sign_ins(curve, true),
                    message.to_vec(),
                ))?
            }
        };
        Signature::from_payload(curve, payload)
    }

    /// Public key derived along `path` on secp256k1
    pub fn public_key_secp256k1(&mut self, path: DerivationPath) -> Result<PublicKey> {
        self.public_key(Curve::Secp256k1, &KeySlot::Derived(path))
    }

    /// Public key derived along `path` on ed25519
    pub fn public_key_ed25519(&mut self, path: DerivationPath) -> Result<PublicKey> {
        self.public_key(Curve::Ed25519, &KeySlot::Derived(path))
    }

    /// ECDSA signature over `message` with the key at `path`
    pub fn sign_secp256k1(&mut self, path: DerivationPath, message: &[u8]) -> Result<Signature> {
        self.sign(Curve::Secp256k1, &KeySlot::Derived(path), message)
    }

    /// Ed25519 signature over `message` with the key at `path`
    pub fn sign_ed25519(&mut self, path: DerivationPath, message: &[u8]) -> Result<Signature> {
        self.sign(Curve::Ed25519, &KeySlot::Derived(path), message)
    }

    fn execute(&mut self, command: &Command) -> Result<Bytes> {
        self.log_command(command);
        let response = codec::exchange(&mut self.transport, command)?;
        self.log_response(&response);
        Self::unwrap_response(response)
    }

    fn log_command(&self, command: &Command) {
        if self.logging {
            debug!(
                ins = command.ins(),
                payload = %hex::encode(command.payload()),
                "command"
            );
        }
    }

    fn log_response(&self, response: &Response) {
        if self.logging {
            debug!(
                status = %response.status(),
                payload = %hex::encode(response.payload()),
                "response"
            );
        }
    }

    fn unwrap_response(response: Response) -> Result<Bytes> {
        if response.is_success() {
            Ok(response.payload().clone())
        } else {
            Err(Error::from_status(response.status()))
        }
    }

    fn require_diagnostics(&mut self) -> Result<()> {
        let version = self.version()?;
        if version.app_id.supports_diagnostics() {
            Ok(())
        } else {
            Err(Error::TestFirmwareRequired {
                app_id: version.app_id,
            })
        }
    }

    fn require_test_slots(&mut self) -> Result<()> {
        let version = self.version()?;
        if version.app_id.supports_test_slots() {
            Ok(())
        } else {
            Err(Error::TestFirmwareRequired {
                app_id: version.app_id,
            })
        }
    }
}
