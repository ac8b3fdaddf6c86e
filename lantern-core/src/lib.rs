//! Core chain data types for the Lantern protocol.
//!
//! This crate defines the chain records exchanged between nodes:
//!
//! - Block headers and block bodies
//! - Transactions
//! - SHA-256 hashing helpers
//!
//! All records carry a canonical RLP wire form (via the `rlp` crate) used by
//! the networking layer, and serde derives for the storage and RPC layers.

pub mod block;
pub mod crypto;
pub mod transaction;

// Re-export main types
pub use block::{BlockBody, BlockHash, BlockHeader};
pub use transaction::Transaction;
