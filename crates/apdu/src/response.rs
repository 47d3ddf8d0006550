//! Logical response definition
//!
//! A [`Response`] is the reassembled payload plus the 2-byte status
//! trailer. Reassembly from chunks lives in [`crate::codec`]; this type
//! only splits and interprets the trailer.

use bytes::Bytes;

use crate::error::{Error, TransportError};
use crate::status::StatusWord;

/// A reassembled response: payload bytes plus status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Bytes,
    status: StatusWord,
}

impl Response {
    /// Create a response from payload and status
    pub fn new(payload: Bytes, status: impl Into<StatusWord>) -> Self {
        Self {
            payload,
            status: status.into(),
        }
    }

    /// Create a success response
    pub const fn success(payload: Bytes) -> Self {
        Self {
            payload,
            status: StatusWord::new(0x90, 0x00),
        }
    }

    /// Split a reassembled body (payload followed by SW1 SW2) into a response
    pub fn from_body(body: &[u8]) -> Result<Self, Error> {
        if body.len() < 2 {
            return Err(TransportError::MalformedFrame("response shorter than status word").into());
        }
        let (payload, trailer) = body.split_at(body.len() - 2);
        Ok(Self {
            payload: Bytes::copy_from_slice(payload),
            status: StatusWord::new(trailer[0], trailer[1]),
        })
    }

    /// Response payload (without the status trailer)
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Check if the response indicates success
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Convert into the payload, mapping a non-success status to an error
    pub fn into_payload(self) -> Result<Bytes, Error> {
        if self.is_success() {
            Ok(self.payload)
        } else {
            Err(Error::status(self.status))
        }
    }
}
