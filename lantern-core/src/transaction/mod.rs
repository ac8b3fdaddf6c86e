//! Transaction structure.

use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

use crate::crypto::sha256;

/// A value transfer recorded on chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender account nonce.
    pub nonce: u64,

    /// Recipient address bytes.
    pub recipient: Vec<u8>,

    /// Amount transferred, in base units.
    pub amount: u64,

    /// Arbitrary payload carried with the transfer.
    pub payload: Vec<u8>,
}

impl Transaction {
    /// Number of RLP fields in the encoded transaction.
    const FIELD_COUNT: usize = 4;

    /// Compute the transaction ID.
    ///
    /// The ID is SHA-256 of the RLP-encoded transaction.
    pub fn id(&self) -> [u8; 32] {
        sha256(&rlp::encode(self))
    }
}

impl Encodable for Transaction {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(Self::FIELD_COUNT);
        s.append(&self.nonce);
        s.append(&self.recipient);
        s.append(&self.amount);
        s.append(&self.payload);
    }
}

impl Decodable for Transaction {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != Self::FIELD_COUNT {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Transaction {
            nonce: rlp.val_at(0)?,
            recipient: rlp.val_at(1)?,
            amount: rlp.val_at(2)?,
            payload: rlp.val_at(3)?,
        })
    }
}
