//! Normalized chain-head summaries.

use std::fmt;

use crate::error::hex_encode;
use crate::protocol::messages::AnnounceMessage;
use crate::protocol::status::StatusMessage;

/// Normalized view of a peer's reported chain head.
///
/// Derived from either a Status or an Announce message; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadSummary {
    /// Head block number.
    pub block_number: u64,
    /// Head block hash, opaque to this layer.
    pub block_hash: Vec<u8>,
    /// Total difficulty at the head.
    pub total_difficulty: u64,
    /// Blocks removed from the previous chain tip, 0 if none.
    pub reorg_depth: u64,
}

impl HeadSummary {
    /// Extract the head advertised by a Status message.
    ///
    /// A handshake cannot express a reorg, so `reorg_depth` is always 0.
    /// Returns `None` when the message does not carry all three head keys.
    pub fn from_status(status: &StatusMessage) -> Option<Self> {
        Some(HeadSummary {
            block_number: status.head_num?,
            block_hash: status.head_hash.clone()?,
            total_difficulty: status.head_td?,
            reorg_depth: 0,
        })
    }
}

impl From<&AnnounceMessage> for HeadSummary {
    fn from(announce: &AnnounceMessage) -> Self {
        HeadSummary {
            block_number: announce.head_number,
            block_hash: announce.head_hash.clone(),
            total_difficulty: announce.head_td,
            reorg_depth: announce.reorg_depth,
        }
    }
}

impl fmt::Display for HeadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Head{{block:{}, hash:{}, td:{}, reorg_depth:{}}}",
            self.block_number,
            hex_encode(&self.block_hash),
            self.total_difficulty,
            self.reorg_depth
        )
    }
}
