//! Software emulation of the signing device
//!
//! [`Emulator`] implements [`ChunkTransport`] from the driver's point of
//! view while behaving like the device firmware on the other side: it
//! reassembles command chunks, acknowledges intermediate ones, dispatches
//! the completed command and frames the result. This lets the full driver
//! stack run in tests without hardware attached.
//!
//! Key material is deterministic. Test slots use the fixed firmware test
//! seed; derived slots hash a configurable master seed together with the
//! encoded key path, which keeps distinct paths on distinct keys without
//! a full hierarchical-derivation implementation.

use std::collections::VecDeque;
use std::fmt;

use k256::ecdsa::signature::Signer;
use keyfob_apdu::codec::{frame_response, parse_chunk, CHUNK_CAPACITY};
use keyfob_apdu::status::common;
use keyfob_apdu::{Chunk, ChunkTransport, StatusWord, TransportError};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

/// Command class understood by the firmware
pub const CLA: u8 = 0x55;

/// App identity byte of release firmware
pub const APP_ID_RELEASE: u8 = 0x00;
/// App identity byte of testing firmware
pub const APP_ID_TESTING: u8 = 0xFF;
/// App identity byte of legacy testing firmware
pub const APP_ID_LEGACY: u8 = 0x55;

/// Emulated firmware version
pub const VERSION_MAJOR: u8 = 0;
/// Emulated firmware version
pub const VERSION_MINOR: u8 = 1;
/// Emulated firmware version
pub const VERSION_PATCH: u8 = 0;

/// The fixed test-slot seed baked into testing firmware
pub const TEST_SEED: [u8; 32] = [
    0x75, 0x56, 0x0e, 0x4d, 0xde, 0xa0, 0x63, 0x05, 0xc3, 0x6e, 0x2e, 0xb5, 0xf7, 0x2a, 0xca,
    0x71, 0x2d, 0x13, 0x4c, 0xc2, 0xa0, 0x59, 0xbf, 0xe8, 0x7e, 0x9b, 0x5d, 0x55, 0xbf, 0x81,
    0x3b, 0xd4,
];

mod ins {
    pub(crate) const GET_VERSION: u8 = 0;
    pub(crate) const PUBLIC_KEY_SECP256K1: u8 = 1;
    pub(crate) const PUBLIC_KEY_ED25519: u8 = 2;
    pub(crate) const SIGN_SECP256K1: u8 = 3;
    pub(crate) const SIGN_ED25519: u8 = 4;
    pub(crate) const HASH: u8 = 100;
    pub(crate) const PUBLIC_KEY_SECP256K1_TEST: u8 = 101;
    pub(crate) const PUBLIC_KEY_ED25519_TEST: u8 = 102;
    pub(crate) const SIGN_SECP256K1_TEST: u8 = 103;
    pub(crate) const SIGN_ED25519_TEST: u8 = 104;
    pub(crate) const ECHO: u8 = 200;
}

/// What the emulated user does when a signing prompt appears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovalPolicy {
    /// Approve every signing request
    #[default]
    Approve,
    /// Reject every signing request on the device screen
    Reject,
}

/// Reassembly state for an in-flight multi-chunk command
#[derive(Debug)]
struct PendingCommand {
    cla: u8,
    ins: u8,
    count: u8,
    next_index: u8,
    /// First fragment of a command whose chunk 1 travels separately
    /// (the encoded key path of a signing command)
    lead: Vec<u8>,
    payload: Vec<u8>,
}

/// Emulated signing device
pub struct Emulator {
    app_id: u8,
    approval: ApprovalPolicy,
    master_seed: [u8; 32],
    pending: Option<PendingCommand>,
    outgoing: VecDeque<Chunk>,
}

impl fmt::Debug for Emulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emulator")
            .field("app_id", &self.app_id)
            .field("approval", &self.approval)
            .field("pending", &self.pending.is_some())
            .field("outgoing", &self.outgoing.len())
            .finish_non_exhaustive()
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Emulator {
    /// Create an emulator running testing firmware that approves every
    /// signing request
    pub fn new() -> Self {
        Self {
            app_id: APP_ID_TESTING,
            approval: ApprovalPolicy::Approve,
            master_seed: TEST_SEED,
            pending: None,
            outgoing: VecDeque::new(),
        }
    }

    /// Change the emulated firmware identity
    #[must_use]
    pub const fn with_app_id(mut self, app_id: u8) -> Self {
        self.app_id = app_id;
        self
    }

    /// Change how signing prompts are answered
    #[must_use]
    pub const fn with_approval(mut self, approval: ApprovalPolicy) -> Self {
        self.approval = approval;
        self
    }

    /// Replace the master seed used for derived key slots
    #[must_use]
    pub const fn with_master_seed(mut self, seed: [u8; 32]) -> Self {
        self.master_seed = seed;
        self
    }

    fn reply(&mut self, payload: &[u8], status: StatusWord) -> Result<(), TransportError> {
        let chunks = frame_response(payload, status)
            .map_err(|_| TransportError::MalformedFrame("response too large to frame"))?;
        self.outgoing.extend(chunks);
        Ok(())
    }

    fn reply_status(&mut self, status: StatusWord) -> Result<(), TransportError> {
        self.reply(&[], status)
    }

    /// Whether `ins` carries its key path in a dedicated first chunk
    const fn has_path_lead(ins: u8) -> bool {
        matches!(ins, ins::SIGN_SECP256K1 | ins::SIGN_ED25519)
    }

    /// Whether this firmware build answers `ins` at all
    const fn supports(&self, ins: u8) -> bool {
        match ins {
            ins::GET_VERSION
            | ins::PUBLIC_KEY_SECP256K1
            | ins::PUBLIC_KEY_ED25519
            | ins::SIGN_SECP256K1
            | ins::SIGN_ED25519 => true,
            ins::HASH | ins::ECHO => {
                matches!(self.app_id, APP_ID_TESTING | APP_ID_LEGACY)
            }
            ins::PUBLIC_KEY_SECP256K1_TEST
            | ins::PUBLIC_KEY_ED25519_TEST
            | ins::SIGN_SECP256K1_TEST
            | ins::SIGN_ED25519_TEST => self.app_id == APP_ID_TESTING,
            _ => false,
        }
    }

    fn accept_chunk(&mut self, raw: &Chunk) -> Result<(), TransportError> {
        let chunk = match parse_chunk(raw) {
            Ok(chunk) => chunk,
            Err(_) => {
                self.pending = None;
                return self.reply_status(common::DATA_INVALID);
            }
        };
        trace!(
            ins = chunk.ins,
            index = chunk.index,
            count = chunk.count,
            len = chunk.data.len(),
            "chunk received"
        );

        if chunk.cla != CLA {
            self.pending = None;
            return self.reply_status(common::CLA_NOT_SUPPORTED);
        }
        if !self.supports(chunk.ins) {
            self.pending = None;
            return self.reply_status(common::INS_NOT_SUPPORTED);
        }

        if chunk.index == 1 {
            // A fresh command discards any interrupted predecessor.
            let mut pending = PendingCommand {
                cla: chunk.cla,
                ins: chunk.ins,
                count: chunk.count,
                next_index: 2,
                lead: Vec::new(),
                payload: Vec::new(),
            };
            if Self::has_path_lead(chunk.ins) {
                pending.lead = chunk.data.to_vec();
            } else {
                pending.payload.extend_from_slice(chunk.data);
            }
            self.pending = Some(pending);
        } else {
            let Some(pending) = self.pending.as_mut() else {
                return self.reply_status(common::DATA_INVALID);
            };
            if chunk.ins != pending.ins
                || chunk.count != pending.count
                || chunk.index != pending.next_index
            {
                self.pending = None;
                return self.reply_status(common::DATA_INVALID);
            }
            pending.next_index = pending.next_index.wrapping_add(1);
            pending.payload.extend_from_slice(chunk.data);
        }

        if chunk.is_last() {
            let pending = self
                .pending
                .take()
                .ok_or(TransportError::MalformedFrame("no command in progress"))?;
            self.dispatch(pending)
        } else {
            self.reply_status(common::SUCCESS)
        }
    }

    fn dispatch(&mut self, command: PendingCommand) -> Result<(), TransportError> {
        debug!(ins = command.ins, payload_len = command.payload.len(), "dispatching command");
        match command.ins {
            ins::GET_VERSION => {
                let payload = [self.app_id, VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH];
                self.reply(&payload, common::SUCCESS)
            }
            ins::ECHO => {
                // Firmware echoes only what fits in its single working
                // buffer, the first fragment's worth.
                let truncated = command.payload.len().min(CHUNK_CAPACITY);
                let echoed = command.payload[..truncated].to_vec();
                self.reply(&echoed, common::SUCCESS)
            }
            ins::HASH => {
                let digest = Sha256::digest(&command.payload);
                self.reply(&digest, common::SUCCESS)
            }
            ins::PUBLIC_KEY_SECP256K1 => match self.derived_seed(&command.payload) {
                Some(seed) => self.secp256k1_public_key(&seed),
                None => self.reply_status(common::DATA_INVALID),
            },
            ins::PUBLIC_KEY_ED25519 => match self.derived_seed(&command.payload) {
                Some(seed) => self.ed25519_public_key(&seed),
                None => self.reply_status(common::DATA_INVALID),
            },
            ins::PUBLIC_KEY_SECP256K1_TEST => self.secp256k1_public_key(&TEST_SEED),
            ins::PUBLIC_KEY_ED25519_TEST => self.ed25519_public_key(&TEST_SEED),
            ins::SIGN_SECP256K1 => match self.derived_seed(&command.lead) {
                Some(seed) => self.secp256k1_sign(&seed, &command.payload),
                None => self.reply_status(common::DATA_INVALID),
            },
            ins::SIGN_ED25519 => match self.derived_seed(&command.lead) {
                Some(seed) => self.ed25519_sign(&seed, &command.payload),
                None => self.reply_status(common::DATA_INVALID),
            },
            ins::SIGN_SECP256K1_TEST => self.secp256k1_sign(&TEST_SEED, &command.payload),
            ins::SIGN_ED25519_TEST => self.ed25519_sign(&TEST_SEED, &command.payload),
            _ => self.reply_status(common::INS_NOT_SUPPORTED),
        }
    }

    /// Decode an encoded key path and derive the slot seed for it
    ///
    /// The encoding is one depth byte followed by that many little-endian
    /// u32 components, depth 1 through 10.
    fn derived_seed(&self, encoded_path: &[u8]) -> Option<[u8; 32]> {
        let (&depth, components) = encoded_path.split_first()?;
        if depth == 0 || depth > 10 || components.len() != depth as usize * 4 {
            return None;
        }
        let mut hasher = Sha256::new();
        hasher.update(self.master_seed);
        hasher.update(encoded_path);
        Some(hasher.finalize().into())
    }

    fn approval_granted(&self) -> bool {
        self.approval == ApprovalPolicy::Approve
    }

    fn secp256k1_public_key(&mut self, seed: &[u8; 32]) -> Result<(), TransportError> {
        let Ok(key) = k256::ecdsa::SigningKey::from_bytes(seed.into()) else {
            return self.reply_status(common::EXECUTION_ERROR);
        };
        let point = key.verifying_key().to_encoded_point(false);
        self.reply(point.as_bytes(), common::SUCCESS)
    }

    fn ed25519_public_key(&mut self, seed: &[u8; 32]) -> Result<(), TransportError> {
        let key = ed25519_dalek::SigningKey::from_bytes(seed);
        self.reply(&key.verifying_key().to_bytes(), common::SUCCESS)
    }

    fn secp256k1_sign(&mut self, seed: &[u8; 32], message: &[u8]) -> Result<(), TransportError> {
        if message.is_empty() {
            return self.reply_status(common::EMPTY_BUFFER);
        }
        if !self.approval_granted() {
            return self.reply_status(common::COMMAND_NOT_ALLOWED);
        }
        let Ok(key) = k256::ecdsa::SigningKey::from_bytes(seed.into()) else {
            return self.reply_status(common::EXECUTION_ERROR);
        };
        let signature: k256::ecdsa::Signature = key.sign(message);
        self.reply(signature.to_der().as_bytes(), common::SUCCESS)
    }

    fn ed25519_sign(&mut self, seed: &[u8; 32], message: &[u8]) -> Result<(), TransportError> {
        if message.is_empty() {
            return self.reply_status(common::EMPTY_BUFFER);
        }
        if !self.approval_granted() {
            return self.reply_status(common::COMMAND_NOT_ALLOWED);
        }
        let key = ed25519_dalek::SigningKey::from_bytes(seed);
        let signature = key.sign(message);
        self.reply(&signature.to_bytes(), common::SUCCESS)
    }
}

impl ChunkTransport for Emulator {
    fn do_send_chunk(&mut self, chunk: &Chunk) -> Result<(), TransportError> {
        self.accept_chunk(chunk)
    }

    fn do_recv_chunk(&mut self) -> Result<Chunk, TransportError> {
        self.outgoing.pop_front().ok_or(TransportError::Timeout)
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.pending = None;
        self.outgoing.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keyfob_apdu::codec::exchange;
    use keyfob_apdu::Command;

    use super::*;

    #[test]
    fn version_reports_app_identity() {
        let mut emulator = Emulator::new().with_app_id(APP_ID_LEGACY);
        let resp = exchange(&mut emulator, &Command::new(CLA, ins::GET_VERSION)).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.payload()[0], APP_ID_LEGACY);
        assert_eq!(
            &resp.payload()[1..],
            &[VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH]
        );
    }

    #[test]
    fn unknown_class_and_instruction() {
        let mut emulator = Emulator::new();
        let resp = exchange(&mut emulator, &Command::new(0x80, ins::GET_VERSION)).unwrap();
        assert!(resp.status().is_class_not_supported());

        let resp = exchange(&mut emulator, &Command::new(CLA, 0x7F)).unwrap();
        assert!(resp.status().is_instruction_not_supported());
    }

    #[test]
    fn release_firmware_hides_test_instructions() {
        let mut emulator = Emulator::new().with_app_id(APP_ID_RELEASE);
        for ins in [
            ins::ECHO,
            ins::HASH,
            ins::PUBLIC_KEY_SECP256K1_TEST,
            ins::SIGN_ED25519_TEST,
        ] {
            let resp = exchange(&mut emulator, &Command::new(CLA, ins)).unwrap();
            assert!(resp.status().is_instruction_not_supported(), "ins {ins}");
        }
    }

    #[test]
    fn legacy_firmware_allows_echo_but_not_test_keys() {
        let mut emulator = Emulator::new().with_app_id(APP_ID_LEGACY);
        let resp = exchange(
            &mut emulator,
            &Command::with_payload(CLA, ins::ECHO, vec![1, 2, 3]),
        )
        .unwrap();
        assert!(resp.is_success());

        let resp = exchange(&mut emulator, &Command::new(CLA, ins::PUBLIC_KEY_ED25519_TEST))
            .unwrap();
        assert!(resp.status().is_instruction_not_supported());
    }

    #[test]
    fn echo_truncates_to_one_buffer() {
        let mut emulator = Emulator::new();
        let long = vec![0x42u8; 200];
        let resp = exchange(
            &mut emulator,
            &Command::with_payload(CLA, ins::ECHO, long.clone()),
        )
        .unwrap();
        assert_eq!(resp.payload().as_ref(), &long[..CHUNK_CAPACITY]);
    }

    #[test]
    fn hash_matches_host_sha256() {
        let mut emulator = Emulator::new();
        let message = vec![0xA5u8; 600];
        let resp = exchange(
            &mut emulator,
            &Command::with_payload(CLA, ins::HASH, message.clone()),
        )
        .unwrap();
        assert_eq!(resp.payload().as_ref(), Sha256::digest(&message).as_slice());
    }

    #[test]
    fn test_slot_public_keys_are_the_firmware_constants() {
        let mut emulator = Emulator::new();

        let resp = exchange(&mut emulator, &Command::new(CLA, ins::PUBLIC_KEY_ED25519_TEST))
            .unwrap();
        assert_eq!(
            hex::encode(resp.payload()),
            "6310a04a64842d764dcd1d0af325db65f67e95ad0fb30abd270a0ca0c40b2582"
        );

        let resp = exchange(
            &mut emulator,
            &Command::new(CLA, ins::PUBLIC_KEY_SECP256K1_TEST),
        )
        .unwrap();
        assert_eq!(
            hex::encode(resp.payload()),
            "04bf04526fb497bc22c345f14ff5969a7342d0459b7af1b2b0228e2f6f38f7aedb\
             9e2693e2cc8eeabb85ea71ec609edfd4f1a5b968404e33fdecc4ed244cfa55dc"
        );
    }

    #[test]
    fn distinct_paths_get_distinct_keys() {
        let mut emulator = Emulator::new();
        let mut path_a = vec![2u8];
        path_a.extend_from_slice(&44u32.to_le_bytes());
        path_a.extend_from_slice(&0u32.to_le_bytes());
        let mut path_b = vec![2u8];
        path_b.extend_from_slice(&44u32.to_le_bytes());
        path_b.extend_from_slice(&1u32.to_le_bytes());

        let key_a = exchange(
            &mut emulator,
            &Command::with_payload(CLA, ins::PUBLIC_KEY_ED25519, path_a),
        )
        .unwrap();
        let key_b = exchange(
            &mut emulator,
            &Command::with_payload(CLA, ins::PUBLIC_KEY_ED25519, path_b),
        )
        .unwrap();
        assert_ne!(key_a.payload(), key_b.payload());
    }

    #[test]
    fn malformed_path_rejected() {
        let mut emulator = Emulator::new();
        // Depth byte claims 3 components but only 2 follow.
        let mut path = vec![3u8];
        path.extend_from_slice(&[0u8; 8]);
        let resp = exchange(
            &mut emulator,
            &Command::with_payload(CLA, ins::PUBLIC_KEY_SECP256K1, path),
        )
        .unwrap();
        assert!(resp.status().is_data_invalid());
    }

    #[test]
    fn rejection_policy_answers_signing_with_denial() {
        let mut emulator = Emulator::new().with_approval(ApprovalPolicy::Reject);
        let resp = exchange(
            &mut emulator,
            &Command::with_payload(CLA, ins::SIGN_ED25519_TEST, b"msg".to_vec()),
        )
        .unwrap();
        assert!(resp.status().is_user_rejection());
    }

    #[test]
    fn empty_message_cannot_be_signed() {
        let mut emulator = Emulator::new();
        let resp = exchange(&mut emulator, &Command::new(CLA, ins::SIGN_SECP256K1_TEST)).unwrap();
        assert_eq!(resp.status(), common::EMPTY_BUFFER);
    }

    #[test]
    fn out_of_order_chunk_rejected() {
        use keyfob_apdu::codec::fragment;

        let mut emulator = Emulator::new();
        let cmd = Command::with_payload(CLA, ins::HASH, vec![0u8; 150]);
        let chunks = fragment(&cmd).unwrap();

        emulator.send_chunk(&chunks[0]).unwrap();
        let _ack = emulator.recv_chunk().unwrap();
        // Skip chunk 2, send chunk 3.
        emulator.send_chunk(&chunks[2]).unwrap();
        let resp = keyfob_apdu::codec::read_response(&mut emulator).unwrap();
        assert!(resp.status().is_data_invalid());
    }
}
