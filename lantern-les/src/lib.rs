//! Light-client synchronization subprotocol for the Lantern network.
//!
//! This crate implements the "les" subprotocol core: the message codec and
//! handshake-validation logic that lets a light client exchange chain
//! metadata and on-demand chain data (headers, bodies) with full peers,
//! without maintaining full chain state itself.
//!
//! What lives here:
//!
//! - Canonical RLP codecs for every message kind, including the
//!   self-describing Status negotiation message (forward compatible for
//!   unknown keys, strictly typed for known ones)
//! - Handshake validation (network and genesis agreement) with disconnect
//!   semantics
//! - Request builders for paginated header/body fetches, with fetch limits
//!   and request-id correlation
//! - Flow-control bookkeeping (credit data for caller-side throttling)
//!
//! What deliberately lives elsewhere: the transport that frames and
//! encrypts bytes between peers (consumed via [`session::Transport`]), peer
//! discovery and connection lifecycle, persistent storage, and consensus
//! validation of fetched data.
//!
//! # Usage
//!
//! ```ignore
//! use lantern_les::{HeadSummary, LesConfig, LesSession, LocalIdentity};
//! use lantern_les::protocol::HeadersQuery;
//!
//! let local = LocalIdentity::new(network_id, genesis_hash);
//! let mut session = LesSession::new(transport, local, LesConfig::default());
//!
//! session.send_handshake(&local_head);
//! // ... feed inbound (code, payload) events to session.handle_inbound ...
//! session.request_headers(request_id, HeadersQuery::descending(head, 192))?;
//! ```

pub mod config;
pub mod error;
pub mod head;
pub mod protocol;
pub mod session;

// Re-export main types
pub use config::{
    LesConfig, LocalIdentity, COMMAND_ID_SPACE, MAX_BODIES_FETCH, MAX_HEADERS_FETCH,
    PROTOCOL_NAME, PROTOCOL_VERSION,
};
pub use error::{HandshakeError, LesResult, ProtocolError};
pub use head::HeadSummary;
pub use protocol::{Command, Message, StatusMessage};
pub use session::{DisconnectReason, LesSession, SessionEvent, SessionState, Transport};
