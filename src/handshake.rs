//! Three-way handshake: SYN / SYN-ACK / ACK.
//!
//! The client proposes a random connection id in its SYN and retransmits
//! until the server answers SYN-ACK with the same id; the final ACK carries
//! the session parameters and is fire-and-forget. A lost ACK is recovered
//! by the server retransmitting SYN-ACK until something else arrives.
//!
//! Both halves poll the port with short read timeouts and check their phase
//! deadline on every tick. Frames that fail to decode, carry a foreign
//! connection id, or fail CRC are treated as line noise from a stale session
//! and ignored; handshake frames are tiny and cheap to retransmit.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::Rng;

use crate::config::Config;
use crate::connection::{Connection, Role, SessionParams};
use crate::error::LinkError;
use crate::message::{
    decode_message, decode_session_params, encode_ack_with_params, encode_control, ConnId, MsgType,
};
use crate::port::Port;

/// Send SYN every `syn_interval` and wait for a matching SYN-ACK.
pub fn client_send_syn_wait_syn_ack<P: Port>(
    port: &mut P,
    conn_id: ConnId,
    config: &Config,
) -> Result<(), LinkError> {
    let syn = encode_control(MsgType::Syn, conn_id);
    let start = Instant::now();
    let mut last_syn: Option<Instant> = None;

    info!("Client: initiating connection (id={})", conn_id);

    while start.elapsed() < config.handshake_timeout {
        if last_syn.map_or(true, |at| at.elapsed() > config.syn_interval) {
            port.write(&syn)?;
            last_syn = Some(Instant::now());
            debug!("Client: sent SYN");
        }

        match decode_message(port, config) {
            Ok((MsgType::SynAck, recv_id, _, true)) if recv_id == conn_id => {
                info!("Client: received SYN_ACK");
                return Ok(());
            }
            // Wrong type, wrong id or failed CRC: noise from a stale session.
            Ok(_) => continue,
            Err(e) if e.is_noise() => continue,
            Err(e) => return Err(e),
        }
    }

    Err(LinkError::PeeringTimeout(config.handshake_timeout))
}

/// Send the final ACK with session parameters. Fire-and-forget.
pub fn client_send_ack_with_params<P: Port>(
    port: &mut P,
    conn_id: ConnId,
    params: SessionParams,
) -> Result<(), LinkError> {
    port.write(&encode_ack_with_params(conn_id, params))?;
    info!(
        "Client: sent ACK with session params (msg_count={}), connection established (id={})",
        params.msg_count, conn_id
    );
    Ok(())
}

/// Client half of the handshake.
///
/// Drains stale input, proposes a fresh random connection id, then runs
/// SYN → SYN-ACK → ACK. Returns the established [`Connection`] or
/// [`LinkError::PeeringTimeout`].
pub fn client_handshake<P: Port, R: Rng>(
    port: &mut P,
    rng: &mut R,
    config: &Config,
    params: SessionParams,
) -> Result<Connection, LinkError> {
    port.drain_input();

    let conn_id = ConnId::random(rng);

    client_send_syn_wait_syn_ack(port, conn_id, config)?;
    client_send_ack_with_params(port, conn_id, params)?;

    Ok(Connection {
        connection_id: conn_id,
        role: Role::Client,
        session_params: params,
    })
}

/// Wait up to `timeout` for the first CRC-clean SYN and adopt its
/// connection id.
pub fn server_wait_for_syn<P: Port>(
    port: &mut P,
    config: &Config,
    timeout: Duration,
) -> Result<ConnId, LinkError> {
    let start = Instant::now();

    while start.elapsed() < timeout {
        match decode_message(port, config) {
            Ok((MsgType::Syn, recv_id, _, true)) => {
                info!("Server: received SYN (id={})", recv_id);
                return Ok(recv_id);
            }
            Ok(_) => continue,
            Err(e) if e.is_noise() => continue,
            Err(e) => return Err(e),
        }
    }

    Err(LinkError::PeeringTimeout(timeout))
}

/// Send SYN-ACK every `syn_interval` and wait for the ACK carrying session
/// parameters.
///
/// An ACK without decodable parameters is logged and treated as not
/// received; the parameters are mandatory, and the client will not repeat
/// the ACK, so this ends in a timeout. A duplicate SYN means the client
/// missed our SYN-ACK; the next retransmit tick covers it.
pub fn server_send_syn_ack_wait_ack<P: Port>(
    port: &mut P,
    conn_id: ConnId,
    config: &Config,
) -> Result<SessionParams, LinkError> {
    let syn_ack = encode_control(MsgType::SynAck, conn_id);
    let start = Instant::now();
    let mut last_syn_ack: Option<Instant> = None;

    while start.elapsed() < config.ack_timeout {
        if last_syn_ack.map_or(true, |at| at.elapsed() > config.syn_interval) {
            port.write(&syn_ack)?;
            last_syn_ack = Some(Instant::now());
            debug!("Server: sent SYN_ACK");
        }

        match decode_message(port, config) {
            Ok((MsgType::Ack, recv_id, tail, true)) if recv_id == conn_id => {
                match decode_session_params(&tail) {
                    Ok(params) => {
                        info!(
                            "Server: received ACK, connection established (id={})",
                            conn_id
                        );
                        info!("Server: session params: msg_count={}", params.msg_count);
                        return Ok(params);
                    }
                    Err(_) => {
                        warn!("Server: received ACK without session params, ignoring");
                        continue;
                    }
                }
            }
            Ok((MsgType::Syn, recv_id, _, _)) if recv_id == conn_id => {
                debug!("Server: received duplicate SYN, will retransmit SYN_ACK");
                continue;
            }
            Ok(_) => continue,
            Err(e) if e.is_noise() => continue,
            Err(e) => return Err(e),
        }
    }

    Err(LinkError::PeeringTimeout(config.ack_timeout))
}

/// Server half of the handshake.
///
/// `listen_timeout` bounds the wait for the first SYN; persistent servers
/// pass a short window here so a shutdown flag is observed between attempts.
pub fn server_handshake<P: Port>(
    port: &mut P,
    config: &Config,
    listen_timeout: Duration,
) -> Result<Connection, LinkError> {
    port.drain_input();

    let conn_id = server_wait_for_syn(port, config, listen_timeout)?;
    let params = server_send_syn_ack_wait_ack(port, conn_id, config)?;

    Ok(Connection {
        connection_id: conn_id,
        role: Role::Server,
        session_params: params,
    })
}
