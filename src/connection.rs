//! Connection state established by the handshake.

use crate::message::ConnId;

/// Which half of the protocol this peer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Server => write!(f, "server"),
        }
    }
}

/// Session parameters, negotiated once inside the client's final ACK.
/// The server uses the received value verbatim for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
    /// Number of request/response rounds the client will drive.
    pub msg_count: u32,
}

/// Established connection. Immutable after the handshake; dropped when the
/// port closes.
#[derive(Debug, Clone)]
pub struct Connection {
    pub connection_id: ConnId,
    pub role: Role,
    pub session_params: SessionParams,
}
