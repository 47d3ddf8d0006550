//! Transport trait for chunked device communication
//!
//! A transport moves opaque fixed-size chunks in both directions and knows
//! nothing about command structure or framing. Implementations override the
//! `do_*` methods; the provided wrappers add hex tracing uniformly.

use std::fmt;

use tracing::{debug, trace};

use crate::error::TransportError;

/// Fixed chunk size of the transport channel, in bytes
pub const CHUNK_SIZE: usize = 64;

/// One transport chunk
pub type Chunk = [u8; CHUNK_SIZE];

/// Trait for bidirectional fixed-size chunk channels
///
/// No buffering beyond one chunk is required; reassembly belongs to the
/// codec. Exchanges are strictly half-duplex: a chunk is sent, then the
/// response chunks are read before anything else is sent.
pub trait ChunkTransport: Send + fmt::Debug {
    /// Send one chunk to the device
    fn send_chunk(&mut self, chunk: &Chunk) -> Result<(), TransportError> {
        trace!(chunk = %hex::encode(chunk), "sending chunk");
        let result = self.do_send_chunk(chunk);
        if let Err(e) = &result {
            debug!(error = ?e, "transport error while sending");
        }
        result
    }

    /// Receive one chunk from the device
    fn recv_chunk(&mut self) -> Result<Chunk, TransportError> {
        match self.do_recv_chunk() {
            Ok(chunk) => {
                trace!(chunk = %hex::encode(chunk), "received chunk");
                Ok(chunk)
            }
            Err(e) => {
                debug!(error = ?e, "transport error while receiving");
                Err(e)
            }
        }
    }

    /// Internal implementation of `send_chunk`
    fn do_send_chunk(&mut self, chunk: &Chunk) -> Result<(), TransportError>;

    /// Internal implementation of `recv_chunk`
    fn do_recv_chunk(&mut self) -> Result<Chunk, TransportError>;

    /// Check if the transport is connected to a device
    fn is_connected(&self) -> bool;

    /// Reset the transport connection
    fn reset(&mut self) -> Result<(), TransportError>;
}

impl<T: ChunkTransport + ?Sized> ChunkTransport for &mut T {
    fn do_send_chunk(&mut self, chunk: &Chunk) -> Result<(), TransportError> {
        (**self).do_send_chunk(chunk)
    }

    fn do_recv_chunk(&mut self) -> Result<Chunk, TransportError> {
        (**self).do_recv_chunk()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        (**self).reset()
    }
}

#[cfg(test)]
pub(crate) use mock::MockTransport;

#[cfg(test)]
mod mock {
    use super::*;

    /// Scripted transport for codec tests: records sent chunks and plays
    /// back a queue of response chunks.
    #[derive(Debug, Default)]
    pub(crate) struct MockTransport {
        pub sent: Vec<Chunk>,
        pub queued: std::collections::VecDeque<Chunk>,
        pub connected: bool,
    }

    impl MockTransport {
        pub(crate) fn new() -> Self {
            Self {
                sent: Vec::new(),
                queued: std::collections::VecDeque::new(),
                connected: true,
            }
        }

        pub(crate) fn queue_chunks<I: IntoIterator<Item = Chunk>>(&mut self, chunks: I) {
            self.queued.extend(chunks);
        }
    }

    impl ChunkTransport for MockTransport {
        fn do_send_chunk(&mut self, chunk: &Chunk) -> Result<(), TransportError> {
            if !self.connected {
                return Err(TransportError::Disconnected);
            }
            self.sent.push(*chunk);
            Ok(())
        }

        fn do_recv_chunk(&mut self) -> Result<Chunk, TransportError> {
            if !self.connected {
                return Err(TransportError::Disconnected);
            }
            self.queued.pop_front().ok_or(TransportError::Timeout)
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn reset(&mut self) -> Result<(), TransportError> {
            self.sent.clear();
            self.queued.clear();
            self.connected = true;
            Ok(())
        }
    }
}
