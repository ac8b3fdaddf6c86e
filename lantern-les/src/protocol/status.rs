//! The Status (negotiation) message.
//!
//! A Status payload is a list of (key, value) pairs where the type of each
//! value depends on the key. Known keys decode into typed fields; unknown
//! keys are retained as opaque bytes so newer peers can extend the message
//! without breaking older ones. Encoding always serializes the pairs sorted
//! by key, keeping the wire form canonical regardless of construction order.

use bytes::Bytes;
use rlp::{DecoderError, Rlp, RlpStream};

use crate::error::{LesResult, ProtocolError};

/// Value shapes a status key can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Big-endian minimal-length unsigned integer.
    Uint,
    /// Opaque byte string.
    Bytes,
    /// Presence-only flag; any payload bytes are ignored.
    Flag,
    /// List of (command code, base cost, per-unit cost) triples.
    CostTable,
}

/// The known-key table: key name and the codec its value must follow.
const KNOWN_KEYS: &[(&str, KeyKind)] = &[
    ("protocolVersion", KeyKind::Uint),
    ("networkId", KeyKind::Uint),
    ("headTd", KeyKind::Uint),
    ("headHash", KeyKind::Bytes),
    ("headNum", KeyKind::Uint),
    ("genesisHash", KeyKind::Bytes),
    ("serveHeaders", KeyKind::Flag),
    ("serveChainSince", KeyKind::Uint),
    ("serveStateSince", KeyKind::Uint),
    ("txRelay", KeyKind::Flag),
    ("flowControl/BL", KeyKind::Uint),
    ("flowControl/MRC", KeyKind::CostTable),
    ("flowControl/MRR", KeyKind::Uint),
];

/// Look up the declared codec for a key.
fn key_kind(key: &str) -> Option<KeyKind> {
    KNOWN_KEYS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, kind)| *kind)
}

/// One entry of the flow-control cost table (flowControl/MRC).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostEntry {
    /// Command code the costs apply to.
    pub command: u64,
    /// Flat cost charged per request.
    pub base_cost: u64,
    /// Additional cost charged per requested item.
    pub unit_cost: u64,
}

impl rlp::Encodable for CostEntry {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.command);
        s.append(&self.base_cost);
        s.append(&self.unit_cost);
    }
}

impl rlp::Decodable for CostEntry {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 3 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(CostEntry {
            command: rlp.val_at(0)?,
            base_cost: rlp.val_at(1)?,
            unit_cost: rlp.val_at(2)?,
        })
    }
}

/// A dynamically-typed status value, for callers that build raw key/value
/// pairs (announcement params share the status key space).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusValue {
    /// Unsigned integer value.
    Uint(u64),
    /// Opaque byte-string value.
    Bytes(Vec<u8>),
    /// Presence-only flag.
    Flag,
    /// Flow-control cost table.
    CostTable(Vec<CostEntry>),
}

impl StatusValue {
    fn kind(&self) -> KeyKind {
        match self {
            StatusValue::Uint(_) => KeyKind::Uint,
            StatusValue::Bytes(_) => KeyKind::Bytes,
            StatusValue::Flag => KeyKind::Flag,
            StatusValue::CostTable(_) => KeyKind::CostTable,
        }
    }
}

/// Serialize a value to its RLP wire form.
fn encode_value(value: &StatusValue) -> Vec<u8> {
    match value {
        StatusValue::Uint(v) => rlp::encode(v).to_vec(),
        StatusValue::Bytes(b) => rlp::encode(b).to_vec(),
        // A flag's payload carries no meaning; encode an empty byte string.
        StatusValue::Flag => rlp::encode(&Vec::<u8>::new()).to_vec(),
        StatusValue::CostTable(entries) => rlp::encode_list::<CostEntry, _>(entries).to_vec(),
    }
}

/// Encode a single (key, value) pair for the status key space.
///
/// Returns the key bytes and the RLP wire form of the value. Fails with
/// `UnknownKey` for keys absent from the known-key table: a sender must only
/// claim typed capabilities it understands. The value must also match the
/// key's declared codec.
pub fn encode_pair(key: &str, value: &StatusValue) -> LesResult<(Vec<u8>, Vec<u8>)> {
    let kind = key_kind(key).ok_or_else(|| ProtocolError::UnknownKey(key.to_string()))?;
    if value.kind() != kind {
        return Err(ProtocolError::FieldDecode {
            key: key.to_string(),
            source: DecoderError::Custom("value does not match the key's declared codec"),
        });
    }
    Ok((key.as_bytes().to_vec(), encode_value(value)))
}

/// Decoded Status message: typed known fields plus retained unknown pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusMessage {
    /// Subprotocol version of the sender.
    pub protocol_version: Option<u64>,
    /// Chain/network identifier.
    pub network_id: Option<u64>,
    /// Total difficulty of the sender's head.
    pub head_td: Option<u64>,
    /// Sender's head block hash.
    pub head_hash: Option<Vec<u8>>,
    /// Sender's head block number.
    pub head_num: Option<u64>,
    /// Hash of block 0.
    pub genesis_hash: Option<Vec<u8>>,
    /// Sender can serve header requests.
    pub serve_headers: bool,
    /// Earliest block number servable.
    pub serve_chain_since: Option<u64>,
    /// Earliest block number with state servable.
    pub serve_state_since: Option<u64>,
    /// Sender relays transactions.
    pub tx_relay: bool,
    /// Flow-control buffer limit (max credit).
    pub flow_buffer_limit: Option<u64>,
    /// Flow-control per-request-type cost table.
    pub flow_cost_table: Option<Vec<CostEntry>>,
    /// Flow-control credit recharge rate.
    pub flow_recharge_rate: Option<u64>,
    /// Keys outside the known-key table, retained raw (key bytes, RLP value
    /// bytes) for potential re-forwarding. Never interpreted.
    pub unknown: Vec<(Vec<u8>, Vec<u8>)>,
}

impl StatusMessage {
    /// Encode to the canonical wire form.
    ///
    /// Only the typed known fields are serialized, sorted by key. Retained
    /// unknown pairs are not re-encoded.
    pub fn encode(&self) -> Bytes {
        let mut pairs: Vec<(&'static str, Vec<u8>)> = self
            .known_pairs()
            .into_iter()
            .map(|(key, value)| (key, encode_value(&value)))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));

        let mut s = RlpStream::new_list(pairs.len());
        for (key, value) in &pairs {
            s.begin_list(2);
            s.append(&key.as_bytes().to_vec());
            s.append_raw(value, 1);
        }
        s.out().freeze()
    }

    /// Decode from wire bytes.
    ///
    /// Phase 1 reads the outer list of (key, raw value) pairs; a malformed
    /// outer shape is a `SchemaMismatch`. Phase 2 interprets each key against
    /// the known-key table: a known key whose value violates its codec is a
    /// `FieldDecode` error, while unknown keys are retained untouched.
    pub fn decode(payload: &[u8]) -> LesResult<StatusMessage> {
        let schema = |source| ProtocolError::SchemaMismatch {
            message: "Status",
            source,
        };

        let rlp = Rlp::new(payload);
        if !rlp.is_list() {
            return Err(schema(DecoderError::RlpExpectedToBeList));
        }

        let mut message = StatusMessage::default();
        for pair in rlp.iter() {
            if pair.item_count().map_err(schema)? != 2 {
                return Err(schema(DecoderError::RlpIncorrectListLen));
            }
            let key_bytes: Vec<u8> = pair.val_at(0).map_err(schema)?;
            let value = pair.at(1).map_err(schema)?;

            let known = std::str::from_utf8(&key_bytes)
                .ok()
                .filter(|key| key_kind(key).is_some())
                .map(str::to_owned);
            match known {
                Some(key) => message.set_known(&key, &value)?,
                None => message.unknown.push((key_bytes, value.as_raw().to_vec())),
            }
        }
        Ok(message)
    }

    /// Assign a known key's decoded value to its typed field.
    fn set_known(&mut self, key: &str, value: &Rlp) -> LesResult<()> {
        fn field<T>(key: &str, result: Result<T, DecoderError>) -> LesResult<T> {
            result.map_err(|source| ProtocolError::FieldDecode {
                key: key.to_string(),
                source,
            })
        }
        fn bytes(value: &Rlp) -> Result<Vec<u8>, DecoderError> {
            value.data().map(|d| d.to_vec())
        }

        match key {
            "protocolVersion" => self.protocol_version = Some(field(key, value.as_val())?),
            "networkId" => self.network_id = Some(field(key, value.as_val())?),
            "headTd" => self.head_td = Some(field(key, value.as_val())?),
            "headHash" => self.head_hash = Some(field(key, bytes(value))?),
            "headNum" => self.head_num = Some(field(key, value.as_val())?),
            "genesisHash" => self.genesis_hash = Some(field(key, bytes(value))?),
            // Presence alone carries the meaning; payload bytes are ignored.
            "serveHeaders" => self.serve_headers = true,
            "serveChainSince" => self.serve_chain_since = Some(field(key, value.as_val())?),
            "serveStateSince" => self.serve_state_since = Some(field(key, value.as_val())?),
            "txRelay" => self.tx_relay = true,
            "flowControl/BL" => self.flow_buffer_limit = Some(field(key, value.as_val())?),
            "flowControl/MRC" => self.flow_cost_table = Some(field(key, value.as_list())?),
            "flowControl/MRR" => self.flow_recharge_rate = Some(field(key, value.as_val())?),
            _ => {}
        }
        Ok(())
    }

    /// Typed fields that are set, as (key, value) pairs.
    fn known_pairs(&self) -> Vec<(&'static str, StatusValue)> {
        let mut pairs = Vec::new();
        if let Some(v) = self.protocol_version {
            pairs.push(("protocolVersion", StatusValue::Uint(v)));
        }
        if let Some(v) = self.network_id {
            pairs.push(("networkId", StatusValue::Uint(v)));
        }
        if let Some(v) = self.head_td {
            pairs.push(("headTd", StatusValue::Uint(v)));
        }
        if let Some(ref v) = self.head_hash {
            pairs.push(("headHash", StatusValue::Bytes(v.clone())));
        }
        if let Some(v) = self.head_num {
            pairs.push(("headNum", StatusValue::Uint(v)));
        }
        if let Some(ref v) = self.genesis_hash {
            pairs.push(("genesisHash", StatusValue::Bytes(v.clone())));
        }
        if self.serve_headers {
            pairs.push(("serveHeaders", StatusValue::Flag));
        }
        if let Some(v) = self.serve_chain_since {
            pairs.push(("serveChainSince", StatusValue::Uint(v)));
        }
        if let Some(v) = self.serve_state_since {
            pairs.push(("serveStateSince", StatusValue::Uint(v)));
        }
        if self.tx_relay {
            pairs.push(("txRelay", StatusValue::Flag));
        }
        if let Some(v) = self.flow_buffer_limit {
            pairs.push(("flowControl/BL", StatusValue::Uint(v)));
        }
        if let Some(ref v) = self.flow_cost_table {
            pairs.push(("flowControl/MRC", StatusValue::CostTable(v.clone())));
        }
        if let Some(v) = self.flow_recharge_rate {
            pairs.push(("flowControl/MRR", StatusValue::Uint(v)));
        }
        pairs
    }
}
