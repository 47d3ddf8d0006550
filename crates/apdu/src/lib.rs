//! Chunked APDU codec for the keyfob signing device
//!
//! The device speaks a command/response protocol over a fixed-size chunk
//! channel (64-byte USB HID reports in practice). This crate provides the
//! pieces every higher layer builds on:
//!
//! - [`Command`] and [`Response`]: the logical protocol units
//! - [`codec`]: fragmentation of commands into chunks, reassembly of
//!   streamed responses, and the request/response exchange loop
//! - [`ChunkTransport`]: the abstract bidirectional chunk channel
//! - [`StatusWord`]: the 2-byte status trailer on every response
//!
//! The codec owns all framing; transports move opaque 64-byte chunks and
//! nothing else.

pub use bytes::{Bytes, BytesMut};

pub mod codec;
pub mod command;
pub mod response;
pub mod status;
pub mod transport;

mod error;
pub use error::{Error, Result, TransportError};

pub use codec::{exchange, exchange_with_lead, CHUNK_CAPACITY, CHUNK_HEADER_LEN};
pub use command::Command;
pub use response::Response;
pub use status::StatusWord;
pub use transport::{Chunk, ChunkTransport, CHUNK_SIZE};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        codec, Bytes, BytesMut, Chunk, ChunkTransport, Command, Error, Response, Result,
        StatusWord, TransportError, CHUNK_CAPACITY, CHUNK_SIZE,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reexports_are_usable() {
        let cmd = Command::new(0x55, 0x00);
        assert_eq!(cmd.cla(), 0x55);
        assert_eq!(cmd.ins(), 0x00);

        let resp = Response::success(Bytes::from_static(&[0x01, 0x02]));
        assert!(resp.is_success());
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
    }
}
