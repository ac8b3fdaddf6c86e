//! Shared helpers for subprotocol integration tests.

use bytes::Bytes;

use lantern_les::{DisconnectReason, HeadSummary, LesConfig, LesSession, LocalIdentity, Transport};

/// Transport double that records everything the session hands it.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Vec<(u8, Bytes)>,
    pub disconnects: Vec<DisconnectReason>,
}

impl Transport for RecordingTransport {
    fn send(&mut self, code: u8, payload: Bytes) {
        self.sent.push((code, payload));
    }

    fn disconnect(&mut self, reason: DisconnectReason) {
        self.disconnects.push(reason);
    }
}

/// Network id shared by the test peers.
pub const NETWORK_ID: u64 = 1;

/// Genesis hash shared by the test peers.
pub fn genesis_hash() -> Vec<u8> {
    vec![0xAA; 32]
}

/// Session for a local peer on the test network.
pub fn test_session() -> LesSession<RecordingTransport> {
    LesSession::new(
        RecordingTransport::default(),
        LocalIdentity::new(NETWORK_ID, genesis_hash()),
        LesConfig::default(),
    )
}

/// The local peer's chain head used across scenarios.
pub fn local_head() -> HeadSummary {
    HeadSummary {
        block_number: 100,
        block_hash: vec![0xCC; 32],
        total_difficulty: 2000,
        reorg_depth: 0,
    }
}
