//! User-facing reports.
//!
//! Reports are print-only value types built after a phase completes; they
//! never feed back into the protocol. Both peers print a peering report and
//! a session report whether the run succeeded or failed.

use std::time::Duration;

use crate::connection::{Connection, Role};
use crate::error::LinkError;
use crate::message::ConnId;
use crate::session::SessionResult;

/// Below this duration the throughput numbers are flagged as unreliable.
pub const THROUGHPUT_MIN_DURATION: Duration = Duration::from_secs(30);

/// Wire bits per byte for 8N1 (start + 8 data + stop).
pub const BITS_PER_BYTE_8N1: u32 = 10;

pub trait Report {
    /// Print the report to stdout.
    fn print(&self);
    /// Whether the report describes a fully successful outcome.
    fn success(&self) -> bool;
}

/// Outcome of the handshake phase.
#[derive(Debug)]
pub struct PeeringReport {
    connected: bool,
    connection_id: Option<ConnId>,
    role: Option<Role>,
    /// Session params as received; server side only.
    msg_count: Option<u32>,
    error: Option<LinkError>,
}

impl PeeringReport {
    /// Report for an established connection.
    pub fn connected(conn: &Connection) -> Self {
        PeeringReport {
            connected: true,
            connection_id: Some(conn.connection_id),
            role: Some(conn.role),
            msg_count: None,
            error: None,
        }
    }

    /// Report for an established connection, including the negotiated
    /// message count (the server learned it from the peer).
    pub fn connected_with_params(conn: &Connection) -> Self {
        PeeringReport {
            msg_count: Some(conn.session_params.msg_count),
            ..Self::connected(conn)
        }
    }

    /// Report for a failed handshake.
    pub fn failed(error: LinkError) -> Self {
        PeeringReport {
            connected: false,
            connection_id: None,
            role: None,
            msg_count: None,
            error: Some(error),
        }
    }
}

impl Report for PeeringReport {
    fn print(&self) {
        if self.connected {
            if let (Some(id), Some(role)) = (self.connection_id, self.role) {
                println!("Peering: SUCCESS (id={}, role={})", id, role);
            }
            if let Some(msg_count) = self.msg_count {
                println!("Session params: msg_count={}", msg_count);
            }
        } else if let Some(error) = &self.error {
            println!("Peering: FAILED ({})", error);
        }
    }

    fn success(&self) -> bool {
        self.connected
    }
}

/// Outcome of the session phase.
#[derive(Debug)]
pub struct SessionReport {
    pub result: SessionResult,
}

impl SessionReport {
    pub fn new(result: SessionResult) -> Self {
        SessionReport { result }
    }
}

impl Report for SessionReport {
    fn print(&self) {
        let r = &self.result;

        if !r.success {
            match &r.error {
                Some(error) => println!("Session: FAILED ({})", error),
                None => println!("Session: FAILED"),
            }
            if r.sent > 0 || r.received > 0 {
                println!(
                    "         ({} sent, {} received, {} ok, {} errors)",
                    r.sent, r.received, r.crc_ok, r.crc_errors
                );
            }
            // Throughput and latency would be misleading for a broken run.
            return;
        }

        println!(
            "Session: SUCCESS ({} sent, {} received, {} ok, {} errors)",
            r.sent, r.received, r.crc_ok, r.crc_errors
        );

        if !r.elapsed.is_zero() && (r.bytes_sent > 0 || r.bytes_received > 0) {
            println!(
                "Throughput: {:.0} baud ({:.2} Kbps) over {:.1}s",
                r.throughput_baud(BITS_PER_BYTE_8N1),
                r.throughput_kbps(),
                r.elapsed.as_secs_f64()
            );
            if r.elapsed < THROUGHPUT_MIN_DURATION {
                println!("(Note: throughput from short test may not reflect sustained performance)");
            }
        }

        if let Some(latency) = r.latency_stats() {
            println!(
                "Latency: avg={:.2}ms min={:.2}ms max={:.2}ms",
                latency.avg_ms, latency.min_ms, latency.max_ms
            );
            println!(
                "         p50={:.2}ms p95={:.2}ms p99={:.2}ms (n={})",
                latency.p50_ms, latency.p95_ms, latency.p99_ms, latency.count
            );
        }
    }

    fn success(&self) -> bool {
        self.result.success && self.result.crc_pass_rate() == 100.0
    }
}
