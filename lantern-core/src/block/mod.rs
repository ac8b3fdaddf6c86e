//! Block structures.

mod body;
mod header;

pub use body::BlockBody;
pub use header::BlockHeader;

/// A 32-byte block hash.
pub type BlockHash = [u8; 32];

/// Decode a 32-byte hash from an RLP byte-string item.
pub(crate) fn hash_from_rlp(
    rlp: &rlp::Rlp,
    index: usize,
) -> Result<BlockHash, rlp::DecoderError> {
    let bytes: Vec<u8> = rlp.val_at(index)?;
    bytes
        .try_into()
        .map_err(|_| rlp::DecoderError::Custom("expected 32-byte hash"))
}
