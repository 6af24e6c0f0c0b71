//! Typed messages on top of the frame codec.
//!
//! Every frame payload is `[type:1][conn_id:4][tail:...]`. Control messages
//! carry an empty tail, ACK carries the session parameters, DATA carries an
//! opaque payload.

use rand::Rng;

use crate::config::Config;
use crate::connection::SessionParams;
use crate::error::{Encoding, LinkError};
use crate::frame;
use crate::port::Port;

/// Connection id size in bytes.
pub const CONN_ID_SIZE: usize = 4;

/// `[type][conn_id]` prefix ahead of every tail.
pub const MSG_HEADER_SIZE: usize = 1 + CONN_ID_SIZE;

/// Message types of the peering protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    Syn = 0x01,
    SynAck = 0x02,
    Ack = 0x03,
    Data = 0x10,
    Fin = 0x20,
    FinAck = 0x21,
}

impl MsgType {
    pub fn from_byte(byte: u8) -> Result<Self, Encoding> {
        match byte {
            0x01 => Ok(MsgType::Syn),
            0x02 => Ok(MsgType::SynAck),
            0x03 => Ok(MsgType::Ack),
            0x10 => Ok(MsgType::Data),
            0x20 => Ok(MsgType::Fin),
            0x21 => Ok(MsgType::FinAck),
            other => Err(Encoding::InvalidType(other)),
        }
    }
}

/// Random 4-byte tag disambiguating concurrent or stale sessions.
/// Chosen by the client, echoed by the server; not authenticating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnId(pub [u8; CONN_ID_SIZE]);

impl ConnId {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut id = [0u8; CONN_ID_SIZE];
        rng.fill(&mut id[..]);
        ConnId(id)
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Random DATA payload: length uniform in the configured range, contents
/// uniformly random bytes.
pub fn random_payload<R: Rng>(rng: &mut R, config: &Config) -> Vec<u8> {
    let size = rng.gen_range(config.min_payload..=config.max_payload) as usize;
    let mut payload = vec![0u8; size];
    rng.fill(&mut payload[..]);
    payload
}

/// Encode a control message (SYN / SYN-ACK / ACK / FIN / FIN-ACK), framed
/// and ready for the wire.
pub fn encode_control(msg_type: MsgType, conn_id: ConnId) -> Vec<u8> {
    let mut payload = Vec::with_capacity(MSG_HEADER_SIZE);
    payload.push(msg_type as u8);
    payload.extend_from_slice(&conn_id.0);
    frame::encode(&payload)
}

/// Encode an ACK carrying the session parameters.
pub fn encode_ack_with_params(conn_id: ConnId, params: SessionParams) -> Vec<u8> {
    let mut payload = Vec::with_capacity(MSG_HEADER_SIZE + 4);
    payload.push(MsgType::Ack as u8);
    payload.extend_from_slice(&conn_id.0);
    payload.extend_from_slice(&params.msg_count.to_le_bytes());
    frame::encode(&payload)
}

/// Encode a DATA message.
pub fn encode_data(conn_id: ConnId, data: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(MSG_HEADER_SIZE + data.len());
    payload.push(MsgType::Data as u8);
    payload.extend_from_slice(&conn_id.0);
    payload.extend_from_slice(data);
    frame::encode(&payload)
}

/// Decode the session parameters out of an ACK tail.
pub fn decode_session_params(tail: &[u8]) -> Result<SessionParams, Encoding> {
    if tail.len() < 4 {
        return Err(Encoding::BadAck);
    }
    let msg_count = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
    Ok(SessionParams { msg_count })
}

/// Decode one typed message from the port.
///
/// Returns `(msg_type, conn_id, tail, crc_ok)`; callers decide whether to
/// trust the tail based on `crc_ok`.
pub fn decode_message<P: Port>(
    port: &mut P,
    config: &Config,
) -> Result<(MsgType, ConnId, Vec<u8>, bool), LinkError> {
    let (payload, crc_ok) = frame::decode(port, config)?;

    if payload.len() < MSG_HEADER_SIZE {
        return Err(Encoding::TooShort { len: payload.len() }.into());
    }

    let msg_type = MsgType::from_byte(payload[0])?;
    let conn_id = ConnId([payload[1], payload[2], payload[3], payload[4]]);
    let tail = payload[MSG_HEADER_SIZE..].to_vec();

    Ok((msg_type, conn_id, tail, crc_ok))
}
