//! Session teardown: FIN / FIN-ACK.
//!
//! The client owns the retransmit loop; the server answers once. A lost
//! FIN-ACK is recovered by the client repeating FIN until its timeout.

use std::time::Instant;

use log::{debug, info, warn};

use crate::config::Config;
use crate::connection::Connection;
use crate::message::{decode_message, encode_control, MsgType};
use crate::port::Port;

/// Send FIN until a matching FIN-ACK arrives or the wait times out.
/// Returns whether the teardown was cleanly acknowledged.
pub fn client_shutdown<P: Port>(port: &mut P, conn: &Connection, config: &Config) -> bool {
    info!("Client: initiating shutdown");
    let fin = encode_control(MsgType::Fin, conn.connection_id);
    let start = Instant::now();
    let mut last_fin: Option<Instant> = None;

    while start.elapsed() < config.fin_wait_timeout {
        if last_fin.map_or(true, |at| at.elapsed() > config.fin_interval) {
            if let Err(e) = port.write(&fin) {
                warn!("Client: FIN write failed: {}", e);
                return false;
            }
            last_fin = Some(Instant::now());
            debug!("Client: sent FIN");
        }

        match decode_message(port, config) {
            Ok((MsgType::FinAck, recv_id, _, true)) if recv_id == conn.connection_id => {
                info!("Client: received FIN_ACK, shutdown complete");
                return true;
            }
            // Anything else is stale echo traffic still in flight; ignore.
            _ => continue,
        }
    }

    warn!("Client: FIN_ACK timeout, closing anyway");
    false
}

/// Answer a FIN with a single FIN-ACK.
pub fn server_shutdown<P: Port>(port: &mut P, conn: &Connection) {
    debug!("Server: responding to FIN");
    match port.write(&encode_control(MsgType::FinAck, conn.connection_id)) {
        Ok(_) => info!("Server: sent FIN_ACK, shutdown complete"),
        Err(e) => warn!("Server: FIN_ACK write failed: {}", e),
    }
}
