//! Fixed-schema protocol messages.
//!
//! Every message here has an ordered field list on the wire; decoding is
//! strict about arity and nesting. The Status message lives in
//! [`super::status`] because its payload is self-describing rather than
//! fixed-shape.

use std::fmt;

use bytes::Bytes;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

use lantern_core::{BlockBody, BlockHeader};

use crate::error::{LesResult, ProtocolError};

use super::schema::{decode_fixed, Command};
use super::status::StatusMessage;

/// New chain head announcement.
///
/// `params` mirrors a subset of the Status key space but its values are kept
/// as opaque RLP bytes here.
// TODO: interpret announce params against the status key table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceMessage {
    /// Hash of the announced head block.
    pub head_hash: Vec<u8>,
    /// Number of the announced head block.
    pub head_number: u64,
    /// Total difficulty at the announced head.
    pub head_td: u64,
    /// Blocks removed from the previous chain tip, 0 if none.
    pub reorg_depth: u64,
    /// Raw (key, RLP value) pairs carrying updated status parameters.
    pub params: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Encodable for AnnounceMessage {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(5);
        s.append(&self.head_hash);
        s.append(&self.head_number);
        s.append(&self.head_td);
        s.append(&self.reorg_depth);
        s.begin_list(self.params.len());
        for (key, value) in &self.params {
            s.begin_list(2);
            s.append(key);
            s.append_raw(value, 1);
        }
    }
}

impl Decodable for AnnounceMessage {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 5 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let params_rlp = rlp.at(4)?;
        if !params_rlp.is_list() {
            return Err(DecoderError::RlpExpectedToBeList);
        }
        let mut params = Vec::new();
        for pair in params_rlp.iter() {
            if pair.item_count()? != 2 {
                return Err(DecoderError::RlpIncorrectListLen);
            }
            params.push((pair.val_at(0)?, pair.at(1)?.as_raw().to_vec()));
        }
        Ok(AnnounceMessage {
            head_hash: rlp.val_at(0)?,
            head_number: rlp.val_at(1)?,
            head_td: rlp.val_at(2)?,
            reorg_depth: rlp.val_at(3)?,
            params,
        })
    }
}

/// Query descriptor for a paginated header fetch.
// TODO: allow addressing the start block by hash as well as by number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadersQuery {
    /// Block number to start from.
    pub start: u64,
    /// Maximum number of headers to return.
    pub max_headers: u64,
    /// Number of headers to skip between each returned item.
    pub skip: u64,
    /// Walk toward genesis from `start` when true, toward the head otherwise.
    pub reverse: bool,
}

impl HeadersQuery {
    /// Query walking from `start` toward genesis, no skipping.
    ///
    /// This is the usual shape for a light client backfilling history.
    pub fn descending(start: u64, max_headers: u64) -> Self {
        Self {
            start,
            max_headers,
            skip: 0,
            reverse: true,
        }
    }

    /// Query walking from `start` toward the chain head, no skipping.
    pub fn ascending(start: u64, max_headers: u64) -> Self {
        Self {
            start,
            max_headers,
            skip: 0,
            reverse: false,
        }
    }

    /// Set the number of headers skipped between returned items.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }
}

impl Encodable for HeadersQuery {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.start);
        s.append(&self.max_headers);
        s.append(&self.skip);
        s.append(&u64::from(self.reverse));
    }
}

impl Decodable for HeadersQuery {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 4 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(HeadersQuery {
            start: rlp.val_at(0)?,
            max_headers: rlp.val_at(1)?,
            skip: rlp.val_at(2)?,
            reverse: rlp.val_at::<u64>(3)? != 0,
        })
    }
}

/// Request for block headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetHeadersMessage {
    /// Caller-chosen correlation token, echoed by the response.
    pub request_id: u64,
    /// What to fetch.
    pub query: HeadersQuery,
}

impl Encodable for GetHeadersMessage {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.request_id);
        s.append(&self.query);
    }
}

impl Decodable for GetHeadersMessage {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(GetHeadersMessage {
            request_id: rlp.val_at(0)?,
            query: rlp.val_at(1)?,
        })
    }
}

/// Response carrying block headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadersMessage {
    /// Correlation token of the request being answered.
    pub request_id: u64,
    /// Remaining flow-control credit after serving this request.
    pub buffer_value: u64,
    /// The requested headers, in query order.
    pub headers: Vec<BlockHeader>,
}

impl Encodable for HeadersMessage {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.request_id);
        s.append(&self.buffer_value);
        s.append_list(&self.headers);
    }
}

impl Decodable for HeadersMessage {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 3 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(HeadersMessage {
            request_id: rlp.val_at(0)?,
            buffer_value: rlp.val_at(1)?,
            headers: rlp.list_at(2)?,
        })
    }
}

/// Request for block bodies by hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetBodiesMessage {
    /// Caller-chosen correlation token, echoed by the response.
    pub request_id: u64,
    /// Hashes of the blocks whose bodies are wanted.
    pub block_hashes: Vec<Vec<u8>>,
}

impl Encodable for GetBodiesMessage {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.request_id);
        s.append_list::<Vec<u8>, _>(&self.block_hashes);
    }
}

impl Decodable for GetBodiesMessage {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(GetBodiesMessage {
            request_id: rlp.val_at(0)?,
            block_hashes: rlp.list_at(1)?,
        })
    }
}

/// Response carrying block bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodiesMessage {
    /// Correlation token of the request being answered.
    pub request_id: u64,
    /// Remaining flow-control credit after serving this request.
    pub buffer_value: u64,
    /// The requested bodies, in request order.
    pub bodies: Vec<BlockBody>,
}

impl Encodable for BodiesMessage {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.request_id);
        s.append(&self.buffer_value);
        s.append_list(&self.bodies);
    }
}

impl Decodable for BodiesMessage {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 3 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(BodiesMessage {
            request_id: rlp.val_at(0)?,
            buffer_value: rlp.val_at(1)?,
            bodies: rlp.list_at(2)?,
        })
    }
}

/// All subprotocol messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Capability/status negotiation.
    Status(StatusMessage),
    /// New chain head announcement.
    Announce(AnnounceMessage),
    /// Request for block headers.
    GetHeaders(GetHeadersMessage),
    /// Response with block headers.
    Headers(HeadersMessage),
    /// Request for block bodies.
    GetBodies(GetBodiesMessage),
    /// Response with block bodies.
    Bodies(BodiesMessage),
}

impl Message {
    /// The command this message belongs to.
    pub fn command(&self) -> Command {
        match self {
            Message::Status(_) => Command::Status,
            Message::Announce(_) => Command::Announce,
            Message::GetHeaders(_) => Command::GetHeaders,
            Message::Headers(_) => Command::Headers,
            Message::GetBodies(_) => Command::GetBodies,
            Message::Bodies(_) => Command::Bodies,
        }
    }

    /// Wire code of this message.
    pub fn code(&self) -> u8 {
        self.command().code()
    }

    /// Get a human-readable name for the message type.
    pub fn name(&self) -> &'static str {
        self.command().name()
    }

    /// Encode to (command code, payload bytes).
    pub fn encode(&self) -> (u8, Bytes) {
        let payload = match self {
            Message::Status(m) => m.encode(),
            Message::Announce(m) => rlp::encode(m).freeze(),
            Message::GetHeaders(m) => rlp::encode(m).freeze(),
            Message::Headers(m) => rlp::encode(m).freeze(),
            Message::GetBodies(m) => rlp::encode(m).freeze(),
            Message::Bodies(m) => rlp::encode(m).freeze(),
        };
        (self.code(), payload)
    }

    /// Decode a payload for the given command code.
    pub fn decode(code: u8, payload: &[u8]) -> LesResult<Message> {
        let command = Command::from_code(code).ok_or(ProtocolError::UnsupportedCommand(code))?;
        match command {
            Command::Status => StatusMessage::decode(payload).map(Message::Status),
            Command::Announce => decode_fixed(command, payload).map(Message::Announce),
            Command::GetHeaders => decode_fixed(command, payload).map(Message::GetHeaders),
            Command::Headers => decode_fixed(command, payload).map(Message::Headers),
            Command::GetBodies => decode_fixed(command, payload).map(Message::GetBodies),
            Command::Bodies => decode_fixed(command, payload).map(Message::Bodies),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Status(m) => write!(
                f,
                "Status(network={:?}, head={:?})",
                m.network_id, m.head_num
            ),
            Message::Announce(m) => write!(
                f,
                "Announce(number={}, td={}, reorg_depth={})",
                m.head_number, m.head_td, m.reorg_depth
            ),
            Message::GetHeaders(m) => write!(
                f,
                "GetHeaders(id={}, start={}, max={}, reverse={})",
                m.request_id, m.query.start, m.query.max_headers, m.query.reverse
            ),
            Message::Headers(m) => write!(
                f,
                "Headers(id={}, count={}, buffer={})",
                m.request_id,
                m.headers.len(),
                m.buffer_value
            ),
            Message::GetBodies(m) => write!(
                f,
                "GetBodies(id={}, count={})",
                m.request_id,
                m.block_hashes.len()
            ),
            Message::Bodies(m) => write!(
                f,
                "Bodies(id={}, count={}, buffer={})",
                m.request_id,
                m.bodies.len(),
                m.buffer_value
            ),
        }
    }
}
