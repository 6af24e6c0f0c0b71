//! Protocol tunables.
//!
//! One value type carries every knob the codec and state machines read, so a
//! test can tighten timeouts without touching process-wide state. `Default`
//! holds the wire-compatible values both peers are expected to run with.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Largest payload a frame may declare. Larger lengths trigger resync
    /// instead of allocation.
    pub max_message_length: u32,
    /// Bytes scanned for sync magic before the decoder gives up on the
    /// current read.
    pub max_resync_bytes: u32,
    /// Random DATA payload size range, inclusive.
    pub min_payload: u16,
    pub max_payload: u16,
    /// Log a progress line every this many session rounds.
    pub log_progress_interval: u32,
    /// Client budget for the SYN phase; also the server's listen window.
    pub handshake_timeout: Duration,
    /// Server budget for the ACK after the first SYN-ACK went out.
    pub ack_timeout: Duration,
    /// SYN and SYN-ACK retransmit interval.
    pub syn_interval: Duration,
    /// FIN retransmit interval. Shorter than SYN: teardown should be snappy.
    pub fin_interval: Duration,
    /// Wait for FIN (server) or FIN-ACK (client) before giving up.
    pub fin_wait_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_message_length: 4096,
            max_resync_bytes: 8192,
            min_payload: 16,
            max_payload: 256,
            log_progress_interval: 100,
            handshake_timeout: Duration::from_secs(60),
            ack_timeout: Duration::from_secs(10),
            syn_interval: Duration::from_secs(2),
            fin_interval: Duration::from_millis(500),
            fin_wait_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Config with tight timings for in-memory tests.
    pub fn fast() -> Self {
        Config {
            handshake_timeout: Duration::from_millis(500),
            ack_timeout: Duration::from_millis(500),
            syn_interval: Duration::from_millis(20),
            fin_interval: Duration::from_millis(20),
            fin_wait_timeout: Duration::from_millis(200),
            ..Config::default()
        }
    }
}
