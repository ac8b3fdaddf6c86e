//! Command registry and shared decode plumbing.

use std::fmt;

use rlp::Decodable;

use crate::error::{LesResult, ProtocolError};

/// Command codes, as offsets within this subprotocol's id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Capability/status negotiation, the first message on a connection.
    Status,
    /// New chain head announcement.
    Announce,
    /// Paginated header fetch request.
    GetHeaders,
    /// Header fetch response.
    Headers,
    /// Block body fetch request.
    GetBodies,
    /// Block body fetch response.
    Bodies,
}

impl Command {
    /// All defined commands, in code order.
    pub const ALL: [Command; 6] = [
        Command::Status,
        Command::Announce,
        Command::GetHeaders,
        Command::Headers,
        Command::GetBodies,
        Command::Bodies,
    ];

    /// Wire code for this command.
    pub fn code(self) -> u8 {
        match self {
            Command::Status => 0x00,
            Command::Announce => 0x01,
            Command::GetHeaders => 0x02,
            Command::Headers => 0x03,
            Command::GetBodies => 0x04,
            Command::Bodies => 0x05,
        }
    }

    /// Look up a command by its wire code.
    pub fn from_code(code: u8) -> Option<Command> {
        match code {
            0x00 => Some(Command::Status),
            0x01 => Some(Command::Announce),
            0x02 => Some(Command::GetHeaders),
            0x03 => Some(Command::Headers),
            0x04 => Some(Command::GetBodies),
            0x05 => Some(Command::Bodies),
            _ => None,
        }
    }

    /// Get a human-readable name for the command.
    pub fn name(self) -> &'static str {
        match self {
            Command::Status => "Status",
            Command::Announce => "Announce",
            Command::GetHeaders => "GetHeaders",
            Command::Headers => "Headers",
            Command::GetBodies => "GetBodies",
            Command::Bodies => "Bodies",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decode a fixed-schema payload, mapping wire-shape failures onto the
/// protocol error taxonomy with the message name attached.
pub(crate) fn decode_fixed<T: Decodable>(command: Command, payload: &[u8]) -> LesResult<T> {
    rlp::decode(payload).map_err(|source| ProtocolError::SchemaMismatch {
        message: command.name(),
        source,
    })
}
