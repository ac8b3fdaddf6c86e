//! Subprotocol session logic.
//!
//! One session exists per peer connection. The session drives the status
//! handshake, shapes outbound data requests against the configured fetch
//! limits, and dispatches inbound messages into [`SessionEvent`]s.
//!
//! Sends are fire-and-forget: the transport owns queuing and backpressure to
//! the socket, and responses arrive later as independent inbound events
//! correlated by request id. The session keeps no per-request state, so an
//! unanswered request leaks nothing.

pub mod flow;

use std::fmt;

use bytes::Bytes;

use crate::config::{LesConfig, LocalIdentity};
use crate::error::{hex_encode, HandshakeError, LesResult, ProtocolError};
use crate::head::HeadSummary;
use crate::protocol::messages::{
    GetBodiesMessage, GetHeadersMessage, HeadersQuery, Message,
};
use crate::protocol::schema::Command;
use crate::protocol::status::StatusMessage;

use flow::FlowControl;

use lantern_core::{BlockBody, BlockHeader};

/// Reason codes relayed to the transport when terminating a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Disconnect was requested locally.
    Requested,
    /// Peer is of no use to us.
    UselessPeer,
    /// Some other reason specific to the subprotocol.
    Other,
}

impl DisconnectReason {
    /// Wire code for this reason.
    pub fn code(self) -> u8 {
        match self {
            DisconnectReason::Requested => 0x00,
            DisconnectReason::UselessPeer => 0x03,
            DisconnectReason::Other => 0x10,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Requested => write!(f, "requested"),
            DisconnectReason::UselessPeer => write!(f, "useless peer"),
            DisconnectReason::Other => write!(f, "other"),
        }
    }
}

/// Interface to the underlying peer-to-peer transport.
///
/// The transport frames, encrypts, and multiplexes raw bytes; this core only
/// hands it encoded payloads and command codes.
pub trait Transport {
    /// Queue an encoded message for sending.
    fn send(&mut self, code: u8, payload: Bytes);

    /// Terminate the underlying connection, relaying the reason to the peer.
    fn disconnect(&mut self, reason: DisconnectReason);
}

/// Handshake state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No valid Status received from the peer yet.
    #[default]
    Unestablished,
    /// Handshake validated; data requests may flow.
    Established,
    /// Handshake failed; the connection is being torn down.
    Terminated,
}

impl SessionState {
    fn name(self) -> &'static str {
        match self {
            SessionState::Unestablished => "unestablished",
            SessionState::Established => "established",
            SessionState::Terminated => "terminated",
        }
    }
}

/// Decoded inbound traffic, handed to the caller for consumption.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The peer's Status validated; the session is now established.
    HandshakeCompleted(HeadSummary),
    /// The peer announced a new chain head.
    HeadAnnounced(HeadSummary),
    /// A header fetch was answered.
    HeadersReceived {
        request_id: u64,
        buffer_value: u64,
        headers: Vec<BlockHeader>,
    },
    /// A body fetch was answered.
    BodiesReceived {
        request_id: u64,
        buffer_value: u64,
        bodies: Vec<BlockBody>,
    },
    /// The peer asked us for headers.
    HeadersRequested {
        request_id: u64,
        query: HeadersQuery,
    },
    /// The peer asked us for bodies.
    BodiesRequested {
        request_id: u64,
        block_hashes: Vec<Vec<u8>>,
    },
}

/// A light-client subprotocol session with a single peer.
pub struct LesSession<T: Transport> {
    /// Transport carrying this session's messages.
    transport: T,
    /// Fetch limits.
    config: LesConfig,
    /// Local chain identity advertised during the handshake.
    local: LocalIdentity,
    /// Handshake state.
    state: SessionState,
    /// The peer's decoded Status, once the handshake validated.
    remote: Option<StatusMessage>,
    /// Latest head reported by the peer (handshake or announcement).
    remote_head: Option<HeadSummary>,
    /// Flow-control bookkeeping for this peer.
    flow: FlowControl,
}

impl<T: Transport> LesSession<T> {
    /// Create a session over the given transport.
    pub fn new(transport: T, local: LocalIdentity, config: LesConfig) -> Self {
        Self {
            transport,
            config,
            local,
            state: SessionState::Unestablished,
            remote: None,
            remote_head: None,
            flow: FlowControl::default(),
        }
    }

    /// Current handshake state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the handshake has completed successfully.
    pub fn is_established(&self) -> bool {
        self.state == SessionState::Established
    }

    /// The peer's negotiated parameters, available once established.
    pub fn negotiated(&self) -> Option<&StatusMessage> {
        self.remote.as_ref()
    }

    /// Latest head reported by the peer.
    pub fn remote_head(&self) -> Option<&HeadSummary> {
        self.remote_head.as_ref()
    }

    /// Flow-control bookkeeping for this peer.
    pub fn flow(&self) -> &FlowControl {
        &self.flow
    }

    /// Access the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send our Status message advertising the given local head.
    ///
    /// No response is awaited here; the peer's Status arrives as a separate
    /// inbound event.
    pub fn send_handshake(&mut self, local_head: &HeadSummary) {
        let status = StatusMessage {
            protocol_version: Some(self.local.protocol_version),
            network_id: Some(self.local.network_id),
            head_td: Some(local_head.total_difficulty),
            head_hash: Some(local_head.block_hash.clone()),
            head_num: Some(local_head.block_number),
            genesis_hash: Some(self.local.genesis_hash.clone()),
            ..StatusMessage::default()
        };
        tracing::debug!(
            network_id = self.local.network_id,
            head_number = local_head.block_number,
            "sending status handshake"
        );
        self.transport.send(Command::Status.code(), status.encode());
    }

    /// Validate the peer's Status message, the first message it sends.
    ///
    /// Checks, in order, that the peer is on our network and shares our
    /// genesis. On mismatch the session relays a disconnect to the transport
    /// and terminates; it never continues past a failed handshake. On success
    /// the decoded Status becomes the session's negotiated parameters and the
    /// peer's advertised head is returned.
    ///
    /// The peer's ability to serve headers is not verified here; callers that
    /// depend on it must check `negotiated().serve_headers` themselves.
    pub fn process_handshake(&mut self, payload: &[u8]) -> LesResult<HeadSummary> {
        if self.state != SessionState::Unestablished {
            return Err(ProtocolError::UnexpectedMessage {
                name: Command::Status.name(),
                state: self.state.name(),
            });
        }

        let status = StatusMessage::decode(payload)?;
        match self.validate_handshake(&status) {
            Ok(head) => {
                tracing::debug!(
                    network_id = self.local.network_id,
                    head_number = head.block_number,
                    total_difficulty = head.total_difficulty,
                    "handshake established"
                );
                self.flow = FlowControl::from_status(&status);
                self.remote = Some(status);
                self.remote_head = Some(head.clone());
                self.state = SessionState::Established;
                Ok(head)
            }
            Err(failure) => {
                let reason = failure.disconnect_reason();
                tracing::debug!(error = %failure, reason = %reason, "handshake rejected, disconnecting");
                self.transport.disconnect(reason);
                self.state = SessionState::Terminated;
                Err(failure.into())
            }
        }
    }

    fn validate_handshake(&self, status: &StatusMessage) -> Result<HeadSummary, HandshakeError> {
        let remote_network = status
            .network_id
            .ok_or(HandshakeError::MissingKey("networkId"))?;
        if remote_network != self.local.network_id {
            return Err(HandshakeError::NetworkMismatch {
                local: self.local.network_id,
                remote: remote_network,
            });
        }

        let remote_genesis = status
            .genesis_hash
            .as_ref()
            .ok_or(HandshakeError::MissingKey("genesisHash"))?;
        if remote_genesis != &self.local.genesis_hash {
            return Err(HandshakeError::GenesisMismatch {
                local: hex_encode(&self.local.genesis_hash),
                remote: hex_encode(remote_genesis),
            });
        }

        Ok(HeadSummary {
            block_number: status.head_num.ok_or(HandshakeError::MissingKey("headNum"))?,
            block_hash: status
                .head_hash
                .clone()
                .ok_or(HandshakeError::MissingKey("headHash"))?,
            total_difficulty: status.head_td.ok_or(HandshakeError::MissingKey("headTd"))?,
            reorg_depth: 0,
        })
    }

    /// Request headers from the peer.
    ///
    /// `request_id` is an opaque correlation token; the caller must keep it
    /// unique among its own outstanding requests on this connection. No
    /// uniqueness check is performed here.
    pub fn request_headers(&mut self, request_id: u64, query: HeadersQuery) -> LesResult<()> {
        self.ensure_established()?;
        if query.max_headers > self.config.max_headers_fetch as u64 {
            return Err(ProtocolError::LimitExceeded {
                what: "block headers",
                requested: query.max_headers as usize,
                max: self.config.max_headers_fetch,
            });
        }

        tracing::debug!(
            request_id,
            start = query.start,
            max_headers = query.max_headers,
            reverse = query.reverse,
            "requesting headers"
        );
        let (code, payload) = Message::GetHeaders(GetHeadersMessage { request_id, query }).encode();
        self.transport.send(code, payload);
        Ok(())
    }

    /// Request block bodies from the peer.
    pub fn request_bodies(&mut self, request_id: u64, block_hashes: Vec<Vec<u8>>) -> LesResult<()> {
        self.ensure_established()?;
        if block_hashes.len() > self.config.max_bodies_fetch {
            return Err(ProtocolError::LimitExceeded {
                what: "block bodies",
                requested: block_hashes.len(),
                max: self.config.max_bodies_fetch,
            });
        }

        tracing::debug!(request_id, count = block_hashes.len(), "requesting bodies");
        let (code, payload) = Message::GetBodies(GetBodiesMessage {
            request_id,
            block_hashes,
        })
        .encode();
        self.transport.send(code, payload);
        Ok(())
    }

    /// Decode and dispatch one inbound message.
    ///
    /// Before establishment only a Status message is acceptable; afterwards a
    /// second Status is an error. Responses surface the remote's reported
    /// flow-control credit alongside the data so callers can throttle.
    pub fn handle_inbound(&mut self, code: u8, payload: &[u8]) -> LesResult<SessionEvent> {
        let command = Command::from_code(code).ok_or(ProtocolError::UnsupportedCommand(code))?;

        match self.state {
            SessionState::Unestablished => {
                if command != Command::Status {
                    return Err(ProtocolError::UnexpectedMessage {
                        name: command.name(),
                        state: self.state.name(),
                    });
                }
                let head = self.process_handshake(payload)?;
                Ok(SessionEvent::HandshakeCompleted(head))
            }
            SessionState::Terminated => Err(ProtocolError::UnexpectedMessage {
                name: command.name(),
                state: self.state.name(),
            }),
            SessionState::Established => match Message::decode(code, payload)? {
                Message::Status(_) => Err(ProtocolError::UnexpectedMessage {
                    name: command.name(),
                    state: self.state.name(),
                }),
                Message::Announce(announce) => {
                    let head = HeadSummary::from(&announce);
                    tracing::debug!(
                        head_number = head.block_number,
                        reorg_depth = head.reorg_depth,
                        "peer announced new head"
                    );
                    self.remote_head = Some(head.clone());
                    Ok(SessionEvent::HeadAnnounced(head))
                }
                Message::Headers(headers) => {
                    self.flow.record_buffer_value(headers.buffer_value);
                    Ok(SessionEvent::HeadersReceived {
                        request_id: headers.request_id,
                        buffer_value: headers.buffer_value,
                        headers: headers.headers,
                    })
                }
                Message::Bodies(bodies) => {
                    self.flow.record_buffer_value(bodies.buffer_value);
                    Ok(SessionEvent::BodiesReceived {
                        request_id: bodies.request_id,
                        buffer_value: bodies.buffer_value,
                        bodies: bodies.bodies,
                    })
                }
                Message::GetHeaders(request) => Ok(SessionEvent::HeadersRequested {
                    request_id: request.request_id,
                    query: request.query,
                }),
                Message::GetBodies(request) => Ok(SessionEvent::BodiesRequested {
                    request_id: request.request_id,
                    block_hashes: request.block_hashes,
                }),
            },
        }
    }

    fn ensure_established(&self) -> LesResult<()> {
        if self.state == SessionState::Established {
            Ok(())
        } else {
            Err(ProtocolError::NotEstablished)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{AnnounceMessage, HeadersMessage};

    #[derive(Default)]
    struct MockTransport {
        sent: Vec<(u8, Bytes)>,
        disconnects: Vec<DisconnectReason>,
    }

    impl Transport for MockTransport {
        fn send(&mut self, code: u8, payload: Bytes) {
            self.sent.push((code, payload));
        }

        fn disconnect(&mut self, reason: DisconnectReason) {
            self.disconnects.push(reason);
        }
    }

    fn local_identity() -> LocalIdentity {
        LocalIdentity::new(1, vec![0xAA; 32])
    }

    fn new_session() -> LesSession<MockTransport> {
        LesSession::new(MockTransport::default(), local_identity(), LesConfig::default())
    }

    fn remote_status() -> StatusMessage {
        StatusMessage {
            protocol_version: Some(1),
            network_id: Some(1),
            head_td: Some(5000),
            head_hash: Some(vec![0xBB; 32]),
            head_num: Some(150),
            genesis_hash: Some(vec![0xAA; 32]),
            ..StatusMessage::default()
        }
    }

    fn established_session() -> LesSession<MockTransport> {
        let mut session = new_session();
        session.process_handshake(&remote_status().encode()).unwrap();
        session
    }

    #[test]
    fn test_send_handshake_carries_core_keys() {
        let mut session = new_session();
        session.send_handshake(&HeadSummary {
            block_number: 100,
            block_hash: vec![0xCC; 32],
            total_difficulty: 2000,
            reorg_depth: 0,
        });

        let (code, payload) = &session.transport().sent[0];
        assert_eq!(*code, Command::Status.code());

        let status = StatusMessage::decode(payload).unwrap();
        assert_eq!(status.protocol_version, Some(1));
        assert_eq!(status.network_id, Some(1));
        assert_eq!(status.head_num, Some(100));
        assert_eq!(status.head_td, Some(2000));
        assert_eq!(status.head_hash, Some(vec![0xCC; 32]));
        assert_eq!(status.genesis_hash, Some(vec![0xAA; 32]));
    }

    #[test]
    fn test_handshake_success() {
        let mut session = new_session();
        let head = session.process_handshake(&remote_status().encode()).unwrap();

        assert!(session.is_established());
        assert_eq!(head.block_number, 150);
        assert_eq!(head.total_difficulty, 5000);
        assert_eq!(head.reorg_depth, 0);
        assert_eq!(session.negotiated().unwrap().network_id, Some(1));
        assert!(session.transport().disconnects.is_empty());
    }

    #[test]
    fn test_handshake_network_mismatch() {
        let mut session = new_session();
        let mut status = remote_status();
        status.network_id = Some(2);

        let result = session.process_handshake(&status.encode());
        assert!(matches!(
            result,
            Err(ProtocolError::Handshake(HandshakeError::NetworkMismatch {
                local: 1,
                remote: 2
            }))
        ));
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.transport().disconnects, vec![DisconnectReason::Other]);
        assert!(session.negotiated().is_none());
    }

    #[test]
    fn test_handshake_genesis_mismatch() {
        let mut session = new_session();
        let mut status = remote_status();
        status.genesis_hash = Some(vec![0xEE; 32]);

        let result = session.process_handshake(&status.encode());
        assert!(matches!(
            result,
            Err(ProtocolError::Handshake(HandshakeError::GenesisMismatch { .. }))
        ));
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.transport().disconnects, vec![DisconnectReason::Other]);
    }

    #[test]
    fn test_handshake_checks_network_before_genesis() {
        let mut session = new_session();
        let mut status = remote_status();
        status.network_id = Some(2);
        status.genesis_hash = Some(vec![0xEE; 32]);

        let result = session.process_handshake(&status.encode());
        assert!(matches!(
            result,
            Err(ProtocolError::Handshake(HandshakeError::NetworkMismatch { .. }))
        ));
    }

    #[test]
    fn test_handshake_missing_key() {
        let mut session = new_session();
        let mut status = remote_status();
        status.network_id = None;

        let result = session.process_handshake(&status.encode());
        assert!(matches!(
            result,
            Err(ProtocolError::Handshake(HandshakeError::MissingKey("networkId")))
        ));
        assert_eq!(session.state(), SessionState::Terminated);
    }

    #[test]
    fn test_second_status_rejected() {
        let mut session = established_session();
        let result = session.process_handshake(&remote_status().encode());
        assert!(matches!(result, Err(ProtocolError::UnexpectedMessage { .. })));
        // Still established; the duplicate is the caller's problem.
        assert!(session.is_established());
    }

    #[test]
    fn test_request_headers_at_limit() {
        let mut session = established_session();
        let limit = LesConfig::default().max_headers_fetch as u64;

        session
            .request_headers(7, HeadersQuery::descending(150, limit))
            .unwrap();

        let (code, payload) = session.transport().sent.last().unwrap();
        let decoded = Message::decode(*code, payload).unwrap();
        match decoded {
            Message::GetHeaders(m) => {
                assert_eq!(m.request_id, 7);
                assert_eq!(m.query.max_headers, limit);
                assert!(m.query.reverse);
                assert_eq!(m.query.skip, 0);
            }
            other => panic!("unexpected message: {}", other),
        }
    }

    #[test]
    fn test_request_headers_over_limit() {
        let mut session = established_session();
        let limit = LesConfig::default().max_headers_fetch as u64;

        let result = session.request_headers(7, HeadersQuery::descending(150, limit + 1));
        assert!(matches!(
            result,
            Err(ProtocolError::LimitExceeded { what: "block headers", .. })
        ));
        // Nothing was sent.
        assert!(session.transport().sent.is_empty());
    }

    #[test]
    fn test_request_bodies_limits() {
        let mut session = established_session();
        let limit = LesConfig::default().max_bodies_fetch;

        session
            .request_bodies(8, vec![vec![0x01; 32]; limit])
            .unwrap();
        assert_eq!(session.transport().sent.len(), 1);

        let result = session.request_bodies(9, vec![vec![0x01; 32]; limit + 1]);
        assert!(matches!(
            result,
            Err(ProtocolError::LimitExceeded { what: "block bodies", .. })
        ));
        assert_eq!(session.transport().sent.len(), 1);
    }

    #[test]
    fn test_requests_rejected_before_handshake() {
        let mut session = new_session();
        let result = session.request_headers(1, HeadersQuery::descending(10, 5));
        assert!(matches!(result, Err(ProtocolError::NotEstablished)));
    }

    #[test]
    fn test_inbound_announce_updates_remote_head() {
        let mut session = established_session();
        let announce = AnnounceMessage {
            head_hash: vec![0xDD; 32],
            head_number: 151,
            head_td: 5100,
            reorg_depth: 1,
            params: Vec::new(),
        };
        let (code, payload) = Message::Announce(announce).encode();

        let event = session.handle_inbound(code, &payload).unwrap();
        match event {
            SessionEvent::HeadAnnounced(head) => {
                assert_eq!(head.block_number, 151);
                assert_eq!(head.reorg_depth, 1);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(session.remote_head().unwrap().block_number, 151);
    }

    #[test]
    fn test_inbound_headers_records_buffer_value() {
        let mut session = established_session();
        let (code, payload) = Message::Headers(HeadersMessage {
            request_id: 7,
            buffer_value: 730,
            headers: Vec::new(),
        })
        .encode();

        let event = session.handle_inbound(code, &payload).unwrap();
        assert!(matches!(
            event,
            SessionEvent::HeadersReceived {
                request_id: 7,
                buffer_value: 730,
                ..
            }
        ));
        assert_eq!(session.flow().last_buffer_value(), Some(730));
    }

    #[test]
    fn test_inbound_data_before_handshake_rejected() {
        let mut session = new_session();
        let (code, payload) = Message::Headers(HeadersMessage {
            request_id: 7,
            buffer_value: 730,
            headers: Vec::new(),
        })
        .encode();

        let result = session.handle_inbound(code, &payload);
        assert!(matches!(
            result,
            Err(ProtocolError::UnexpectedMessage {
                name: "Headers",
                state: "unestablished"
            })
        ));
    }

    #[test]
    fn test_inbound_unknown_code_rejected() {
        let mut session = established_session();
        let result = session.handle_inbound(0x0B, &[]);
        assert!(matches!(result, Err(ProtocolError::UnsupportedCommand(0x0B))));
    }

    #[test]
    fn test_inbound_status_completes_handshake() {
        let mut session = new_session();
        let event = session
            .handle_inbound(Command::Status.code(), &remote_status().encode())
            .unwrap();
        match event {
            SessionEvent::HandshakeCompleted(head) => assert_eq!(head.block_number, 150),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(session.is_established());
    }
}
