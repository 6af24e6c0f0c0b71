//! Byte-port abstraction.
//!
//! Every core component talks to the link through [`Port`]; the real serial
//! adapter lives in [`crate::serial`], and two in-memory doubles live here so
//! the protocol can be exercised without hardware: [`LoopbackPort`] (one
//! shared buffer, writes read straight back) and [`PairedPort`] (two ports
//! with crossed buffers, one per peer).

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use log::debug;

use crate::error::LinkError;

/// Blocking byte port with short read timeouts.
pub trait Port {
    /// Write the whole buffer within the port's write timeout. Returns the
    /// number of bytes accepted; a timeout is a hard failure.
    fn write(&mut self, data: &[u8]) -> Result<usize, LinkError>;

    /// Read up to `max` bytes. Blocks no longer than the port's read timeout
    /// and may return fewer bytes than requested, including none.
    fn read(&mut self, max: usize) -> Result<Vec<u8>, LinkError>;

    /// Bytes immediately available without blocking.
    fn in_waiting(&self) -> usize;

    /// Consume and discard whatever is currently buffered. Returns the
    /// number of bytes dropped. Used before a handshake so stale frames from
    /// a previous session cannot be mistaken for fresh ones.
    fn drain_input(&mut self) -> usize {
        let count = self.in_waiting();
        if count > 0 {
            let _ = self.read(count);
            debug!("drained {} stale bytes from input buffer", count);
        }
        count
    }
}

/// Single-buffer in-memory port: everything written can be read back.
///
/// Good for codec-level tests; use [`PairedPort`] when the two directions
/// must be independent (timeouts, full exchanges).
#[derive(Default)]
pub struct LoopbackPort {
    buffer: Mutex<VecDeque<u8>>,
}

impl LoopbackPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes as if they had arrived from the peer.
    pub fn inject(&self, data: &[u8]) {
        self.buffer.lock().unwrap().extend(data.iter().copied());
    }
}

impl Port for LoopbackPort {
    fn write(&mut self, data: &[u8]) -> Result<usize, LinkError> {
        self.buffer.lock().unwrap().extend(data.iter().copied());
        Ok(data.len())
    }

    fn read(&mut self, max: usize) -> Result<Vec<u8>, LinkError> {
        let mut buffer = self.buffer.lock().unwrap();
        let n = max.min(buffer.len());
        Ok(buffer.drain(..n).collect())
    }

    fn in_waiting(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }
}

/// One direction of a paired link.
struct Channel {
    queue: Mutex<VecDeque<u8>>,
    ready: Condvar,
}

impl Channel {
    fn new() -> Arc<Self> {
        Arc::new(Channel {
            queue: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        })
    }
}

/// One end of a crossed pair of in-memory ports.
///
/// Writes land in the peer's read buffer and vice versa, like a null-modem
/// cable. Each end can move to its own thread; an empty read blocks up to
/// the read timeout, matching the cadence of a real port.
pub struct PairedPort {
    rx: Arc<Channel>,
    tx: Arc<Channel>,
    read_timeout: Duration,
}

impl PairedPort {
    const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

    /// Build a connected pair.
    pub fn pair() -> (PairedPort, PairedPort) {
        let a_to_b = Channel::new();
        let b_to_a = Channel::new();
        (
            PairedPort {
                rx: Arc::clone(&b_to_a),
                tx: Arc::clone(&a_to_b),
                read_timeout: Self::DEFAULT_READ_TIMEOUT,
            },
            PairedPort {
                rx: a_to_b,
                tx: b_to_a,
                read_timeout: Self::DEFAULT_READ_TIMEOUT,
            },
        )
    }

    /// Append bytes to this end's read buffer as if sent by the peer.
    pub fn inject(&self, data: &[u8]) {
        let mut queue = self.rx.queue.lock().unwrap();
        queue.extend(data.iter().copied());
        self.rx.ready.notify_all();
    }
}

impl Port for PairedPort {
    fn write(&mut self, data: &[u8]) -> Result<usize, LinkError> {
        let mut queue = self.tx.queue.lock().unwrap();
        queue.extend(data.iter().copied());
        self.tx.ready.notify_all();
        Ok(data.len())
    }

    fn read(&mut self, max: usize) -> Result<Vec<u8>, LinkError> {
        let mut queue = self.rx.queue.lock().unwrap();
        if queue.is_empty() && max > 0 {
            let (guard, _) = self
                .rx
                .ready
                .wait_timeout(queue, self.read_timeout)
                .unwrap();
            queue = guard;
        }
        let n = max.min(queue.len());
        Ok(queue.drain(..n).collect())
    }

    fn in_waiting(&self) -> usize {
        self.rx.queue.lock().unwrap().len()
    }
}
