//! Wire protocol layer.
//!
//! This module contains:
//! - The command-code registry shared by both directions of the connection
//! - The self-describing Status (negotiation) message and its key table
//! - Fixed-schema message definitions and their canonical RLP codecs

pub mod messages;
pub mod schema;
pub mod status;

// Re-export main types
pub use messages::{
    AnnounceMessage, BodiesMessage, GetBodiesMessage, GetHeadersMessage, HeadersMessage,
    HeadersQuery, Message,
};
pub use schema::Command;
pub use status::{CostEntry, StatusMessage, StatusValue};
