//! Subprotocol error types.

use rlp::DecoderError;
use thiserror::Error;

use crate::session::DisconnectReason;

/// Errors produced by the light-client subprotocol core.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Wire data does not match the expected shape of a fixed-schema message.
    /// Fatal to the message; callers should drop the connection.
    #[error("malformed {message} payload: {source}")]
    SchemaMismatch {
        message: &'static str,
        #[source]
        source: DecoderError,
    },

    /// A known status key carried a value that violates its declared codec.
    #[error("invalid value for status key \"{key}\": {source}")]
    FieldDecode {
        key: String,
        #[source]
        source: DecoderError,
    },

    /// Attempt to encode a status key absent from the known-key table.
    /// A sender must only claim typed capabilities it understands.
    #[error("unknown status key: \"{0}\"")]
    UnknownKey(String),

    /// Handshake validation failed; the connection is terminated.
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// Request would exceed a configured fetch-size limit.
    /// Rejected before sending; the caller may retry with a smaller request.
    #[error("cannot request more than {max} {what} in a single request (got {requested})")]
    LimitExceeded {
        what: &'static str,
        requested: usize,
        max: usize,
    },

    /// Command code outside the known message set.
    #[error("unsupported command code: {0:#04x}")]
    UnsupportedCommand(u8),

    /// Message arrived in a session state that cannot accept it.
    #[error("unexpected {name} message in {state} state")]
    UnexpectedMessage {
        name: &'static str,
        state: &'static str,
    },

    /// Data request issued on a session that has not completed its handshake.
    #[error("session is not established")]
    NotEstablished,
}

/// Reasons a handshake can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// Remote peer is on a different network.
    #[error("network id mismatch: remote {remote}, local {local}")]
    NetworkMismatch { local: u64, remote: u64 },

    /// Remote peer disagrees on the genesis block.
    #[error("genesis mismatch: remote {remote}, local {local}")]
    GenesisMismatch { local: String, remote: String },

    /// Remote status message lacks a key required for validation.
    #[error("status message missing required key \"{0}\"")]
    MissingKey(&'static str),
}

impl HandshakeError {
    /// Disconnect reason code to relay to the transport.
    ///
    /// All handshake failures map to the subprotocol-specific "other" code,
    /// matching how remote implementations expect to be told off.
    pub fn disconnect_reason(&self) -> DisconnectReason {
        DisconnectReason::Other
    }
}

/// Result type for subprotocol operations.
pub type LesResult<T> = Result<T, ProtocolError>;

/// Helper to encode bytes as hex for error messages.
pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
