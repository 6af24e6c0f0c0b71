//! Error sum for the link protocol.
//!
//! Every failure the protocol can surface is one variant here; handshake and
//! session loops pattern-match on variants rather than catching broadly.
//! A CRC mismatch is deliberately NOT an error: the frame codec returns the
//! payload together with a `crc_ok` flag so the session engine can count
//! corrupt-but-delivered frames separately from frames that never arrived.

use std::time::Duration;

use thiserror::Error;

use crate::message::MsgType;

/// Malformed typed payload inside a structurally valid frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Encoding {
    /// Frame payload shorter than the `[type][conn_id]` header.
    #[error("payload too short: {len} bytes, need at least 5")]
    TooShort { len: usize },
    /// Type byte is not a recognized message type.
    #[error("invalid message type: 0x{0:02x}")]
    InvalidType(u8),
    /// ACK payload lacks the 4-byte session parameter block.
    #[error("ACK missing session params")]
    BadAck,
}

#[derive(Debug, Error)]
pub enum LinkError {
    /// Port read/write failed or timed out, or a frame arrived truncated.
    #[error("transport: {0}")]
    Transport(String),
    /// Frame decoded but its typed payload is malformed.
    #[error("encoding: {0}")]
    Encoding(#[from] Encoding),
    /// Frame addressed to a different connection id.
    #[error("connection mismatch: expected {expected}, got {got}")]
    ConnectionMismatch { expected: String, got: String },
    /// Valid message of a kind not expected in the current state.
    #[error("unexpected message: {0:?}")]
    UnexpectedMessage(MsgType),
    /// Handshake phase exceeded its time budget.
    #[error("peering timeout after {0:?}")]
    PeeringTimeout(Duration),
    /// No round-trip for message `n` (1-based) within the read timeout.
    #[error("timeout waiting for response to message {0}")]
    SessionTimeout(u32),
    /// Peer sent FIN after `n` completed rounds, before the agreed count.
    #[error("peer sent FIN after {0} messages")]
    PeerFin(u32),
}

impl LinkError {
    /// True for failures absorbed by polling loops as "no frame this tick".
    pub fn is_noise(&self) -> bool {
        matches!(self, LinkError::Transport(_) | LinkError::Encoding(_))
    }
}
