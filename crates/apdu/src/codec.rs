//! Fragmentation, reassembly and the exchange loop
//!
//! Command chunks are laid out as:
//!
//! ```text
//! byte 0      CLA
//! byte 1      INS
//! byte 2      chunk index (1-based)
//! byte 3      chunk count
//! byte 4      fragment length (0..=59)
//! byte 5..    fragment bytes, zero padding to 64
//! ```
//!
//! Every chunk elicits a response. Responses are framed with a big-endian
//! u16 total length (payload + status trailer) in the first two bytes of
//! the first chunk; continuation chunks are raw body bytes. Chunks before
//! the last must be acknowledged with an empty success response; the final
//! chunk's response carries the operation result.
//!
//! Invariant: a payload fragmented here and reassembled by the peer (and
//! vice versa) is byte-identical to the original.

use bytes::BytesMut;

use crate::command::Command;
use crate::error::{Error, TransportError};
use crate::response::Response;
use crate::status::StatusWord;
use crate::transport::{Chunk, ChunkTransport, CHUNK_SIZE};

/// Bytes of chunk occupied by the command header
pub const CHUNK_HEADER_LEN: usize = 5;

/// Usable payload bytes per command chunk
pub const CHUNK_CAPACITY: usize = CHUNK_SIZE - CHUNK_HEADER_LEN;

/// Bytes of the first response chunk occupied by the length prefix
pub const RESPONSE_PREFIX_LEN: usize = 2;

/// Maximum number of chunks per command (the count travels in one byte)
pub const MAX_CHUNK_COUNT: usize = u8::MAX as usize;

/// A parsed command chunk, as seen by the device side of the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandChunk<'a> {
    /// Command class
    pub cla: u8,
    /// Instruction code
    pub ins: u8,
    /// 1-based chunk index
    pub index: u8,
    /// Total chunk count
    pub count: u8,
    /// Fragment bytes carried by this chunk
    pub data: &'a [u8],
}

impl CommandChunk<'_> {
    /// Whether this is the final chunk of its command
    pub const fn is_last(&self) -> bool {
        self.index == self.count
    }
}

/// Fragment a command into transport chunks
///
/// An empty payload yields a single chunk with a zero fragment length.
pub fn fragment(command: &Command) -> Result<Vec<Chunk>, Error> {
    build_chunks(command.cla(), command.ins(), None, command.payload())
}

/// Fragment a command whose first chunk carries `lead` on its own
///
/// Used by signing, where the encoded key path travels ahead of the
/// message bytes; the command payload starts at chunk 2.
pub fn fragment_with_lead(command: &Command, lead: &[u8]) -> Result<Vec<Chunk>, Error> {
    if lead.len() > CHUNK_CAPACITY {
        return Err(Error::PayloadTooLarge(lead.len()));
    }
    build_chunks(command.cla(), command.ins(), Some(lead), command.payload())
}

fn build_chunks(cla: u8, ins: u8, lead: Option<&[u8]>, payload: &[u8]) -> Result<Vec<Chunk>, Error> {
    let payload_chunks = payload.len().div_ceil(CHUNK_CAPACITY);
    let count = match lead {
        Some(_) => 1 + payload_chunks,
        None => payload_chunks.max(1),
    };
    if count > MAX_CHUNK_COUNT {
        return Err(Error::PayloadTooLarge(payload.len()));
    }

    let mut chunks = Vec::with_capacity(count);
    let mut index = 1u8;
    if let Some(lead) = lead {
        chunks.push(encode_chunk(cla, ins, index, count as u8, lead));
        index += 1;
    }
    if lead.is_none() && payload.is_empty() {
        chunks.push(encode_chunk(cla, ins, 1, 1, &[]));
        return Ok(chunks);
    }
    for frag in payload.chunks(CHUNK_CAPACITY) {
        chunks.push(encode_chunk(cla, ins, index, count as u8, frag));
        index = index.wrapping_add(1);
    }
    Ok(chunks)
}

fn encode_chunk(cla: u8, ins: u8, index: u8, count: u8, frag: &[u8]) -> Chunk {
    debug_assert!(frag.len() <= CHUNK_CAPACITY);
    let mut chunk = [0u8; CHUNK_SIZE];
    chunk[0] = cla;
    chunk[1] = ins;
    chunk[2] = index;
    chunk[3] = count;
    chunk[4] = frag.len() as u8;
    chunk[CHUNK_HEADER_LEN..CHUNK_HEADER_LEN + frag.len()].copy_from_slice(frag);
    chunk
}

/// Parse one received command chunk (device side)
pub fn parse_chunk(chunk: &Chunk) -> Result<CommandChunk<'_>, Error> {
    let lc = chunk[4] as usize;
    if lc > CHUNK_CAPACITY {
        return Err(TransportError::MalformedFrame("fragment length exceeds chunk capacity").into());
    }
    let (index, count) = (chunk[2], chunk[3]);
    if index == 0 || count == 0 || index > count {
        return Err(TransportError::MalformedFrame("invalid chunk index/count").into());
    }
    Ok(CommandChunk {
        cla: chunk[0],
        ins: chunk[1],
        index,
        count,
        data: &chunk[CHUNK_HEADER_LEN..CHUNK_HEADER_LEN + lc],
    })
}

/// Frame a response body into transport chunks (device side)
pub fn frame_response(payload: &[u8], status: StatusWord) -> Result<Vec<Chunk>, Error> {
    let total = payload.len() + 2;
    if total > u16::MAX as usize {
        return Err(Error::PayloadTooLarge(payload.len()));
    }

    let mut body = Vec::with_capacity(total);
    body.extend_from_slice(payload);
    body.push(status.sw1);
    body.push(status.sw2);

    let mut chunks = Vec::with_capacity(1 + total / CHUNK_SIZE);
    let mut first = [0u8; CHUNK_SIZE];
    first[..RESPONSE_PREFIX_LEN].copy_from_slice(&(total as u16).to_be_bytes());
    let mut taken = total.min(CHUNK_SIZE - RESPONSE_PREFIX_LEN);
    first[RESPONSE_PREFIX_LEN..RESPONSE_PREFIX_LEN + taken].copy_from_slice(&body[..taken]);
    chunks.push(first);

    while taken < total {
        let mut cont = [0u8; CHUNK_SIZE];
        let step = (total - taken).min(CHUNK_SIZE);
        cont[..step].copy_from_slice(&body[taken..taken + step]);
        chunks.push(cont);
        taken += step;
    }
    Ok(chunks)
}

/// Read and reassemble one response from the transport
pub fn read_response<T: ChunkTransport + ?Sized>(transport: &mut T) -> Result<Response, Error> {
    let first = transport.recv_chunk()?;
    let total = u16::from_be_bytes([first[0], first[1]]) as usize;
    if total < 2 {
        return Err(TransportError::MalformedFrame("response shorter than status word").into());
    }

    let mut body = BytesMut::with_capacity(total);
    let take = total.min(CHUNK_SIZE - RESPONSE_PREFIX_LEN);
    body.extend_from_slice(&first[RESPONSE_PREFIX_LEN..RESPONSE_PREFIX_LEN + take]);
    while body.len() < total {
        let cont = transport.recv_chunk()?;
        let step = (total - body.len()).min(CHUNK_SIZE);
        body.extend_from_slice(&cont[..step]);
    }

    Response::from_body(&body)
}

/// Execute one command: send every chunk, check intermediate
/// acknowledgements, and return the final response
///
/// Intermediate chunks must be acknowledged with an empty success response;
/// anything else aborts the exchange. The final response is returned as-is
/// (including a non-success status) so the caller can map it.
pub fn exchange<T: ChunkTransport + ?Sized>(
    transport: &mut T,
    command: &Command,
) -> Result<Response, Error> {
    let chunks = fragment(command)?;
    exchange_chunks(transport, &chunks)
}

/// Execute one command whose first chunk carries `lead` alone
pub fn exchange_with_lead<T: ChunkTransport + ?Sized>(
    transport: &mut T,
    command: &Command,
    lead: &[u8],
) -> Result<Response, Error> {
    let chunks = fragment_with_lead(command, lead)?;
    exchange_chunks(transport, &chunks)
}

fn exchange_chunks<T: ChunkTransport + ?Sized>(
    transport: &mut T,
    chunks: &[Chunk],
) -> Result<Response, Error> {
    let (last, rest) = chunks
        .split_last()
        .ok_or(Error::Protocol("empty chunk sequence"))?;

    for chunk in rest {
        transport.send_chunk(chunk)?;
        let ack = read_response(transport)?;
        if !ack.is_success() {
            return Err(Error::status(ack.status()));
        }
        if !ack.payload().is_empty() {
            return Err(Error::Protocol("unexpected payload before final chunk"));
        }
    }

    transport.send_chunk(last)?;
    read_response(transport)
}
