//! Block body structure.

use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;

use super::BlockHeader;

/// Block body: the transactions of a block plus the headers of its uncles.
///
/// Bodies are fetched separately from headers during light synchronization,
/// so they do not repeat the header of their own block.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockBody {
    /// Transactions included in the block.
    pub transactions: Vec<Transaction>,

    /// Headers of uncle blocks referenced by the block.
    pub uncles: Vec<BlockHeader>,
}

impl Encodable for BlockBody {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append_list(&self.transactions);
        s.append_list(&self.uncles);
    }
}

impl Decodable for BlockBody {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(BlockBody {
            transactions: rlp.list_at(0)?,
            uncles: rlp.list_at(1)?,
        })
    }
}
