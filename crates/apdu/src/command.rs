//! Logical command definition
//!
//! A [`Command`] is the unit the session layer thinks in: class,
//! instruction, and an arbitrary-length payload. How it travels over the
//! 64-byte chunk channel (index/count header, fragment lengths) is entirely
//! the business of [`crate::codec`].

use bytes::Bytes;

/// A logical command before fragmentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    cla: u8,
    ins: u8,
    payload: Bytes,
}

impl Command {
    /// Create a command with an empty payload
    pub const fn new(cla: u8, ins: u8) -> Self {
        Self {
            cla,
            ins,
            payload: Bytes::new(),
        }
    }

    /// Create a command carrying a payload
    pub fn with_payload<T: Into<Bytes>>(cla: u8, ins: u8, payload: T) -> Self {
        Self {
            cla,
            ins,
            payload: payload.into(),
        }
    }

    /// Command class (CLA)
    pub const fn cla(&self) -> u8 {
        self.cla
    }

    /// Instruction code (INS)
    pub const fn ins(&self) -> u8 {
        self.ins
    }

    /// Payload bytes (may be empty)
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_payload_commands() {
        let ping = Command::new(0x55, 200);
        assert_eq!(ping.cla(), 0x55);
        assert_eq!(ping.ins(), 200);
        assert!(ping.payload().is_empty());

        let cmd = Command::with_payload(0x55, 100, Bytes::from_static(b"abc"));
        assert_eq!(cmd.payload(), b"abc");
    }
}
