//! Request/response session engine.
//!
//! After the handshake the client drives `msg_count` rounds: send one random
//! DATA payload, wait for the server's echo, record the round trip. The
//! server mirrors each round. Either side classifies how a session ended
//! (clean, timed out, torn down early) and accumulates the statistics the
//! reports are built from.

use std::time::{Duration, Instant};

use log::{debug, error, info, trace, warn};
use rand::Rng;

use crate::config::Config;
use crate::connection::Connection;
use crate::error::LinkError;
use crate::message::{decode_message, encode_data, random_payload, MsgType};
use crate::port::Port;
use crate::shutdown::{client_shutdown, server_shutdown};

/// What `recv_data` pulled off the wire for this connection.
pub enum Incoming {
    Data { payload: Vec<u8>, crc_ok: bool },
    Fin,
}

/// Send a DATA message for this connection. Returns frame bytes written.
pub fn send_data<P: Port>(
    port: &mut P,
    conn: &Connection,
    payload: &[u8],
) -> Result<usize, LinkError> {
    port.write(&encode_data(conn.connection_id, payload))
}

/// Receive one DATA or FIN for this connection.
///
/// A frame tagged with a foreign connection id fails with
/// [`LinkError::ConnectionMismatch`]; any other message type fails with
/// [`LinkError::UnexpectedMessage`].
pub fn recv_data<P: Port>(
    port: &mut P,
    conn: &Connection,
    config: &Config,
) -> Result<Incoming, LinkError> {
    let (msg_type, recv_id, tail, crc_ok) = decode_message(port, config)?;

    if recv_id != conn.connection_id {
        return Err(LinkError::ConnectionMismatch {
            expected: conn.connection_id.to_string(),
            got: recv_id.to_string(),
        });
    }

    match msg_type {
        MsgType::Data => Ok(Incoming::Data {
            payload: tail,
            crc_ok,
        }),
        MsgType::Fin => Ok(Incoming::Fin),
        other => Err(LinkError::UnexpectedMessage(other)),
    }
}

/// Wait for the peer's FIN. DATA still in flight is ignored here; only the
/// teardown matters once the rounds are done.
pub fn wait_for_fin<P: Port>(port: &mut P, conn: &Connection, config: &Config) -> bool {
    let start = Instant::now();

    while start.elapsed() < config.fin_wait_timeout {
        match decode_message(port, config) {
            Ok((MsgType::Fin, recv_id, _, true)) if recv_id == conn.connection_id => {
                debug!("received FIN from peer");
                return true;
            }
            _ => continue,
        }
    }

    debug!(
        "timeout ({:?}) waiting for FIN",
        config.fin_wait_timeout
    );
    false
}

/// Latency statistics in milliseconds, nearest-rank percentiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyStats {
    pub count: usize,
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

/// Compute latency statistics from RTT samples, or nothing for an empty set.
pub fn compute_latency_stats(rtt_samples: &[Duration]) -> Option<LatencyStats> {
    if rtt_samples.is_empty() {
        return None;
    }

    let mut samples_ms: Vec<f64> = rtt_samples
        .iter()
        .map(|s| s.as_secs_f64() * 1000.0)
        .collect();
    samples_ms.sort_by(f64::total_cmp);

    let percentile = |sorted: &[f64], p: f64| {
        let idx = (p / 100.0 * (sorted.len() - 1) as f64) as usize;
        sorted[idx]
    };

    let count = samples_ms.len();
    Some(LatencyStats {
        count,
        min_ms: samples_ms[0],
        max_ms: samples_ms[count - 1],
        avg_ms: samples_ms.iter().sum::<f64>() / count as f64,
        p50_ms: percentile(&samples_ms, 50.0),
        p95_ms: percentile(&samples_ms, 95.0),
        p99_ms: percentile(&samples_ms, 99.0),
    })
}

/// Accumulated outcome of one session.
///
/// Invariants: `crc_ok + crc_errors <= received`; only CRC-clean responses
/// contribute RTT samples, so `rtt_samples.len() <= crc_ok`.
#[derive(Debug, Default)]
pub struct SessionResult {
    /// True when every expected exchange completed.
    pub success: bool,
    pub sent: u32,
    pub received: u32,
    pub crc_ok: u32,
    pub crc_errors: u32,
    /// Frame bytes written, including framing overhead.
    pub bytes_sent: u64,
    /// Payload bytes read.
    pub bytes_received: u64,
    /// Round-trip times; client side only.
    pub rtt_samples: Vec<Duration>,
    /// Exchange duration, excluding teardown.
    pub elapsed: Duration,
    pub error: Option<LinkError>,
    /// Client: did the teardown get acknowledged?
    pub fin_ack_received: bool,
    /// Server: did the client tear down?
    pub fin_received: bool,
}

impl SessionResult {
    /// CRC pass rate as a percentage of received messages.
    pub fn crc_pass_rate(&self) -> f64 {
        if self.received == 0 {
            return 0.0;
        }
        f64::from(self.crc_ok) / f64::from(self.received) * 100.0
    }

    pub fn latency_stats(&self) -> Option<LatencyStats> {
        compute_latency_stats(&self.rtt_samples)
    }

    /// Throughput in baud: bytes moved per second times the wire bits per
    /// byte (10 for 8N1 once start and stop bits count).
    pub fn throughput_baud(&self, bits_per_byte: u32) -> f64 {
        let elapsed_s = self.elapsed.as_secs_f64();
        if elapsed_s <= 0.0 {
            return 0.0;
        }
        let total_bytes = (self.bytes_sent + self.bytes_received) as f64;
        total_bytes / elapsed_s * f64::from(bits_per_byte)
    }

    /// Throughput in kilobits per second of payload-carrying data.
    pub fn throughput_kbps(&self) -> f64 {
        let elapsed_s = self.elapsed.as_secs_f64();
        if elapsed_s <= 0.0 {
            return 0.0;
        }
        let total_bytes = (self.bytes_sent + self.bytes_received) as f64;
        total_bytes * 8.0 / elapsed_s / 1000.0
    }
}

/// Client side: drive `msg_count` request/response rounds, then tear down.
pub fn client_exchange<P: Port, R: Rng>(
    port: &mut P,
    conn: &Connection,
    config: &Config,
    rng: &mut R,
    msg_count: u32,
) -> SessionResult {
    let mut result = SessionResult::default();
    let start = Instant::now();

    info!("Client: starting session exchange (msg_count={})", msg_count);

    if msg_count == 0 {
        info!("Client: msg_count=0, skipping exchange");
        result.elapsed = start.elapsed();
        result.fin_ack_received = client_shutdown(port, conn, config);
        result.success = true;
        return result;
    }

    for i in 0..msg_count {
        let payload = random_payload(rng, config);

        let rtt_start = Instant::now();
        match send_data(port, conn, &payload) {
            Ok(written) => {
                result.sent += 1;
                result.bytes_sent += written as u64;
                trace!(
                    "Client: sent message {}/{} ({} bytes)",
                    i + 1,
                    msg_count,
                    payload.len()
                );
            }
            Err(e) => {
                result.elapsed = start.elapsed();
                error!("Client: write failed on message {}: {}", i + 1, e);
                result.error = Some(e);
                return result;
            }
        }

        // Wait for the echo. Stray control frames are tolerated and skipped;
        // they should not appear after the handshake.
        let incoming = loop {
            match recv_data(port, conn, config) {
                Err(LinkError::UnexpectedMessage(msg_type)) => {
                    debug!("Client: ignoring unexpected {:?} during exchange", msg_type);
                }
                other => break other,
            }
        };

        match incoming {
            Ok(Incoming::Data { payload, crc_ok }) => {
                result.received += 1;
                result.bytes_received += payload.len() as u64;
                if crc_ok {
                    result.crc_ok += 1;
                    let rtt = rtt_start.elapsed();
                    result.rtt_samples.push(rtt);
                    trace!(
                        "Client: received response {}/{} (RTT={:.2}ms)",
                        i + 1,
                        msg_count,
                        rtt.as_secs_f64() * 1000.0
                    );
                    if (i + 1) % config.log_progress_interval == 0 {
                        debug!(
                            "Client: progress {}/{} (RTT={:.2}ms)",
                            i + 1,
                            msg_count,
                            rtt.as_secs_f64() * 1000.0
                        );
                    }
                } else {
                    result.crc_errors += 1;
                    warn!("Client: CRC error on response {}/{}", i + 1, msg_count);
                }
            }
            Ok(Incoming::Fin) => {
                result.elapsed = start.elapsed();
                warn!("Client: server sent FIN during exchange");
                result.error = Some(LinkError::PeerFin(i));
                break;
            }
            Err(e) => {
                result.elapsed = start.elapsed();
                error!("Client: timeout waiting for response to message {}", i + 1);
                result.error = if matches!(e, LinkError::ConnectionMismatch { .. }) {
                    Some(e)
                } else {
                    Some(LinkError::SessionTimeout(i + 1))
                };
                return result;
            }
        }
    }

    if result.error.is_none() {
        result.elapsed = start.elapsed();
        info!(
            "Client: exchange complete ({} sent, {} received, {} ok, {} errors)",
            result.sent, result.received, result.crc_ok, result.crc_errors
        );
    }

    result.fin_ack_received = client_shutdown(port, conn, config);
    result.success = result.error.is_none();
    result
}

/// Server side: echo `msg_count` rounds, then wait for the teardown.
pub fn server_exchange<P: Port, R: Rng>(
    port: &mut P,
    conn: &Connection,
    config: &Config,
    rng: &mut R,
    msg_count: u32,
) -> SessionResult {
    let mut result = SessionResult::default();
    let start = Instant::now();

    info!("Server: starting session exchange (msg_count={})", msg_count);

    if msg_count == 0 {
        info!("Server: msg_count=0, waiting for FIN");
        result.elapsed = start.elapsed();
        result.fin_received = wait_for_fin(port, conn, config);
        if result.fin_received {
            server_shutdown(port, conn);
        }
        result.success = true;
        return result;
    }

    for i in 0..msg_count {
        match recv_data(port, conn, config) {
            Ok(Incoming::Data { payload, crc_ok }) => {
                result.received += 1;
                result.bytes_received += payload.len() as u64;
                if crc_ok {
                    result.crc_ok += 1;
                    trace!("Server: received message {}/{}", i + 1, msg_count);
                } else {
                    result.crc_errors += 1;
                    warn!("Server: CRC error on message {}/{}", i + 1, msg_count);
                }

                // Echo the payload back; an empty payload gets a fresh random
                // one so the return direction still carries data.
                let echo = if payload.is_empty() {
                    random_payload(rng, config)
                } else {
                    payload
                };
                match send_data(port, conn, &echo) {
                    Ok(written) => {
                        result.sent += 1;
                        result.bytes_sent += written as u64;
                        trace!("Server: sent echo {}/{}", i + 1, msg_count);
                        if (i + 1) % config.log_progress_interval == 0 {
                            debug!("Server: progress {}/{}", i + 1, msg_count);
                        }
                    }
                    Err(e) => {
                        result.elapsed = start.elapsed();
                        error!("Server: echo write failed on message {}: {}", i + 1, e);
                        result.error = Some(e);
                        return result;
                    }
                }
            }
            Ok(Incoming::Fin) => {
                result.elapsed = start.elapsed();
                warn!(
                    "Server: client sent FIN after {} messages",
                    result.received
                );
                server_shutdown(port, conn);
                result.fin_received = true;
                result.error = Some(LinkError::PeerFin(i));
                return result;
            }
            Err(e) => {
                result.elapsed = start.elapsed();
                error!("Server: timeout waiting for message {}", i + 1);
                result.error = if matches!(
                    e,
                    LinkError::ConnectionMismatch { .. } | LinkError::UnexpectedMessage(_)
                ) {
                    Some(e)
                } else {
                    Some(LinkError::SessionTimeout(i + 1))
                };
                return result;
            }
        }
    }

    result.elapsed = start.elapsed();
    info!(
        "Server: exchange complete ({} sent, {} received, {} ok, {} errors)",
        result.sent, result.received, result.crc_ok, result.crc_errors
    );

    info!("Server: waiting for client FIN");
    result.fin_received = wait_for_fin(port, conn, config);
    if result.fin_received {
        server_shutdown(port, conn);
    } else {
        warn!("Server: FIN timeout, closing anyway");
    }

    result.success = true;
    result
}
