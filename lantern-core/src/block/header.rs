//! Block header structure.

use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

use crate::crypto::sha256;

use super::{hash_from_rlp, BlockHash};

/// Block header containing metadata and commitments.
///
/// The block hash is computed from the RLP-encoded header,
/// not including the transaction bodies (which are committed via tx_root).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Protocol version (currently 1).
    pub version: u32,

    /// Block height (0 for genesis).
    pub height: u64,

    /// Unix timestamp in seconds.
    pub timestamp: u64,

    /// Hash of the previous block header.
    /// All zeros for the genesis block.
    pub prev_block_hash: BlockHash,

    /// Merkle root of the state tree after applying all transactions.
    pub state_root: BlockHash,

    /// Merkle root of transaction IDs in this block.
    pub tx_root: BlockHash,

    /// Block difficulty target.
    pub difficulty: u64,

    /// Consensus nonce.
    pub nonce: u64,
}

impl BlockHeader {
    /// Protocol version number.
    pub const VERSION: u32 = 1;

    /// Number of RLP fields in the encoded header.
    const FIELD_COUNT: usize = 8;

    /// Compute the block hash.
    ///
    /// The hash is SHA-256 of the RLP-encoded header.
    pub fn hash(&self) -> BlockHash {
        sha256(&rlp::encode(self))
    }

    /// Check if this is a genesis block.
    #[inline]
    pub fn is_genesis(&self) -> bool {
        self.height == 0 && self.prev_block_hash == [0u8; 32]
    }
}

impl Encodable for BlockHeader {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(Self::FIELD_COUNT);
        s.append(&self.version);
        s.append(&self.height);
        s.append(&self.timestamp);
        s.append(&self.prev_block_hash.to_vec());
        s.append(&self.state_root.to_vec());
        s.append(&self.tx_root.to_vec());
        s.append(&self.difficulty);
        s.append(&self.nonce);
    }
}

impl Decodable for BlockHeader {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != Self::FIELD_COUNT {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(BlockHeader {
            version: rlp.val_at(0)?,
            height: rlp.val_at(1)?,
            timestamp: rlp.val_at(2)?,
            prev_block_hash: hash_from_rlp(rlp, 3)?,
            state_root: hash_from_rlp(rlp, 4)?,
            tx_root: hash_from_rlp(rlp, 5)?,
            difficulty: rlp.val_at(6)?,
            nonce: rlp.val_at(7)?,
        })
    }
}
