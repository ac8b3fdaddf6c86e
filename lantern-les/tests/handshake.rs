//! End-to-end subprotocol scenarios.
//!
//! These drive a session the way a peer connection would: handshake first,
//! then data requests and inbound responses, with a recording transport
//! standing in for the wire.

mod common;

use common::*;

use lantern_core::{BlockBody, BlockHeader, Transaction};
use lantern_les::protocol::{
    AnnounceMessage, BodiesMessage, HeadersMessage, HeadersQuery, Message,
};
use lantern_les::{
    Command, DisconnectReason, HandshakeError, ProtocolError, SessionEvent, StatusMessage,
};

/// Status a healthy remote full node would reply with.
fn remote_status() -> StatusMessage {
    StatusMessage {
        protocol_version: Some(1),
        network_id: Some(NETWORK_ID),
        head_td: Some(5000),
        head_hash: Some(vec![0xBB; 32]),
        head_num: Some(150),
        genesis_hash: Some(genesis_hash()),
        serve_headers: true,
        ..StatusMessage::default()
    }
}

fn test_header(height: u64) -> BlockHeader {
    BlockHeader {
        version: BlockHeader::VERSION,
        height,
        timestamp: 1700000000 + height,
        prev_block_hash: [1u8; 32],
        state_root: [2u8; 32],
        tx_root: [3u8; 32],
        difficulty: 4,
        nonce: height,
    }
}

#[test]
fn handshake_succeeds_and_exposes_negotiated_head() {
    let mut session = test_session();

    // Local side opens with its own status.
    session.send_handshake(&local_head());
    let (code, payload) = &session.transport().sent[0];
    assert_eq!(*code, Command::Status.code());
    let sent = StatusMessage::decode(payload).unwrap();
    assert_eq!(sent.head_num, Some(100));
    assert_eq!(sent.network_id, Some(NETWORK_ID));

    // Remote replies; validation passes and its head becomes visible.
    let event = session
        .handle_inbound(Command::Status.code(), &remote_status().encode())
        .unwrap();

    let SessionEvent::HandshakeCompleted(head) = event else {
        panic!("expected handshake completion");
    };
    assert_eq!(head.block_number, 150);
    assert_eq!(head.total_difficulty, 5000);
    assert_eq!(head.reorg_depth, 0);

    assert!(session.is_established());
    let negotiated = session.negotiated().unwrap();
    assert_eq!(negotiated.head_td, Some(5000));
    assert!(negotiated.serve_headers);
    assert!(session.transport().disconnects.is_empty());
}

#[test]
fn network_mismatch_disconnects_and_blocks_requests() {
    let mut session = test_session();
    session.send_handshake(&local_head());

    let mut status = remote_status();
    status.network_id = Some(2);

    let result = session.handle_inbound(Command::Status.code(), &status.encode());
    assert!(matches!(
        result,
        Err(ProtocolError::Handshake(HandshakeError::NetworkMismatch {
            local: NETWORK_ID,
            remote: 2
        }))
    ));

    // The disconnect reason "other" was relayed to the transport.
    assert_eq!(session.transport().disconnects, vec![DisconnectReason::Other]);
    assert_eq!(DisconnectReason::Other.to_string(), "other");
    assert_eq!(DisconnectReason::Other.code(), 0x10);

    // No data request ever goes out on this session.
    let result = session.request_headers(1, HeadersQuery::descending(150, 10));
    assert!(matches!(result, Err(ProtocolError::NotEstablished)));
    assert_eq!(session.transport().sent.len(), 1); // just our own handshake
}

#[test]
fn genesis_mismatch_disconnects() {
    let mut session = test_session();
    session.send_handshake(&local_head());

    let mut status = remote_status();
    status.genesis_hash = Some(vec![0xEE; 32]);

    let result = session.handle_inbound(Command::Status.code(), &status.encode());
    assert!(matches!(
        result,
        Err(ProtocolError::Handshake(HandshakeError::GenesisMismatch { .. }))
    ));
    assert_eq!(session.transport().disconnects, vec![DisconnectReason::Other]);
}

#[test]
fn header_fetch_cycle() {
    let mut session = test_session();
    session.send_handshake(&local_head());
    session
        .handle_inbound(Command::Status.code(), &remote_status().encode())
        .unwrap();

    // Ask for the remote's recent history, newest first.
    session
        .request_headers(42, HeadersQuery::descending(150, 4))
        .unwrap();

    let (code, payload) = session.transport().sent.last().unwrap();
    let Message::GetHeaders(request) = Message::decode(*code, payload).unwrap() else {
        panic!("expected a GetHeaders message");
    };
    assert_eq!(request.request_id, 42);
    assert_eq!(request.query.start, 150);
    assert!(request.query.reverse);

    // The remote answers with headers and its remaining credit.
    let response = Message::Headers(HeadersMessage {
        request_id: 42,
        buffer_value: 880,
        headers: vec![test_header(150), test_header(149)],
    });
    let (code, payload) = response.encode();
    let event = session.handle_inbound(code, &payload).unwrap();

    let SessionEvent::HeadersReceived {
        request_id,
        buffer_value,
        headers,
    } = event
    else {
        panic!("expected headers");
    };
    assert_eq!(request_id, 42);
    assert_eq!(buffer_value, 880);
    assert_eq!(headers.len(), 2);
    assert_eq!(headers[0].height, 150);

    // The reported credit is retained for throttling decisions.
    assert_eq!(session.flow().last_buffer_value(), Some(880));
}

#[test]
fn body_fetch_cycle() {
    let mut session = test_session();
    session.send_handshake(&local_head());
    session
        .handle_inbound(Command::Status.code(), &remote_status().encode())
        .unwrap();

    let wanted = vec![vec![0x11; 32], vec![0x22; 32]];
    session.request_bodies(43, wanted.clone()).unwrap();

    let (code, payload) = session.transport().sent.last().unwrap();
    let Message::GetBodies(request) = Message::decode(*code, payload).unwrap() else {
        panic!("expected a GetBodies message");
    };
    assert_eq!(request.block_hashes, wanted);

    let body = BlockBody {
        transactions: vec![Transaction {
            nonce: 0,
            recipient: vec![0x55; 20],
            amount: 9,
            payload: Vec::new(),
        }],
        uncles: Vec::new(),
    };
    let (code, payload) = Message::Bodies(BodiesMessage {
        request_id: 43,
        buffer_value: 860,
        bodies: vec![body.clone()],
    })
    .encode();

    let event = session.handle_inbound(code, &payload).unwrap();
    let SessionEvent::BodiesReceived {
        request_id, bodies, ..
    } = event
    else {
        panic!("expected bodies");
    };
    assert_eq!(request_id, 43);
    assert_eq!(bodies, vec![body]);
    assert_eq!(session.flow().last_buffer_value(), Some(860));
}

#[test]
fn announce_moves_the_tracked_head() {
    let mut session = test_session();
    session
        .handle_inbound(Command::Status.code(), &remote_status().encode())
        .unwrap();
    assert_eq!(session.remote_head().unwrap().block_number, 150);

    let (code, payload) = Message::Announce(AnnounceMessage {
        head_hash: vec![0xDD; 32],
        head_number: 152,
        head_td: 5200,
        reorg_depth: 2,
        params: Vec::new(),
    })
    .encode();

    let event = session.handle_inbound(code, &payload).unwrap();
    let SessionEvent::HeadAnnounced(head) = event else {
        panic!("expected announcement");
    };
    assert_eq!(head.block_number, 152);
    assert_eq!(head.reorg_depth, 2);
    assert_eq!(session.remote_head().unwrap().block_number, 152);
}

#[test]
fn forward_compatible_remote_still_negotiates() {
    // A remote from the future sends keys we have never heard of.
    let mut s = rlp::RlpStream::new_list(3);
    s.begin_list(2);
    s.append(&b"genesisHash".to_vec());
    s.append_raw(&rlp::encode(&genesis_hash()), 1);
    s.begin_list(2);
    s.append(&b"networkId".to_vec());
    s.append_raw(&rlp::encode(&NETWORK_ID), 1);
    s.begin_list(2);
    s.append(&b"quantumProofs".to_vec());
    s.append_raw(&rlp::encode(&7u64), 1);
    let payload = s.out();

    let decoded = StatusMessage::decode(&payload).unwrap();
    assert_eq!(decoded.network_id, Some(NETWORK_ID));
    assert_eq!(decoded.unknown.len(), 1);
    assert_eq!(decoded.unknown[0].0, b"quantumProofs".to_vec());

    // The handshake itself still needs the head keys, so validation reports
    // exactly what is missing rather than choking on the unknown key.
    let mut session = test_session();
    let result = session.handle_inbound(Command::Status.code(), &payload);
    assert!(matches!(
        result,
        Err(ProtocolError::Handshake(HandshakeError::MissingKey("headNum")))
    ));
}
