//! Subprotocol configuration.

/// Name token identifying this subprotocol on the shared transport.
pub const PROTOCOL_NAME: &str = "les";

/// Current subprotocol version.
pub const PROTOCOL_VERSION: u64 = 1;

/// Size of the command-id space claimed by this subprotocol.
///
/// Larger than the number of defined commands to leave room for growth
/// without renegotiating id offsets.
pub const COMMAND_ID_SPACE: u8 = 15;

/// Default maximum number of headers requested in a single fetch.
pub const MAX_HEADERS_FETCH: usize = 192;

/// Default maximum number of block bodies requested in a single fetch.
pub const MAX_BODIES_FETCH: usize = 32;

/// Configuration for a subprotocol session.
#[derive(Debug, Clone)]
pub struct LesConfig {
    /// Maximum number of headers per GetHeaders request.
    pub max_headers_fetch: usize,

    /// Maximum number of bodies per GetBodies request.
    pub max_bodies_fetch: usize,
}

impl Default for LesConfig {
    fn default() -> Self {
        Self {
            max_headers_fetch: MAX_HEADERS_FETCH,
            max_bodies_fetch: MAX_BODIES_FETCH,
        }
    }
}

impl LesConfig {
    /// Create a configuration with the default fetch limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum headers per fetch.
    pub fn with_max_headers_fetch(mut self, max: usize) -> Self {
        self.max_headers_fetch = max;
        self
    }

    /// Set the maximum bodies per fetch.
    pub fn with_max_bodies_fetch(mut self, max: usize) -> Self {
        self.max_bodies_fetch = max;
        self
    }
}

/// Local chain identity advertised during the handshake.
#[derive(Debug, Clone)]
pub struct LocalIdentity {
    /// Chain/network identifier.
    pub network_id: u64,

    /// Hash of block 0.
    pub genesis_hash: Vec<u8>,

    /// Subprotocol version to advertise.
    pub protocol_version: u64,
}

impl LocalIdentity {
    /// Create an identity for the given network and genesis, advertising the
    /// current protocol version.
    pub fn new(network_id: u64, genesis_hash: Vec<u8>) -> Self {
        Self {
            network_id,
            genesis_hash,
            protocol_version: PROTOCOL_VERSION,
        }
    }
}
