//! Frame codec: `[sync:4][len:4][payload:len][crc32:4]`, little-endian.
//!
//! The sync magic makes frames self-delimiting over a raw byte stream: after
//! buffer corruption or a mid-stream join the decoder scans byte-by-byte for
//! the magic and picks up at the next frame boundary. The length cap keeps a
//! corrupted length field from turning into a huge allocation; an oversized
//! length fails the current decode, and the next call resyncs.

use log::{debug, warn};

use crate::config::Config;
use crate::crc::crc32;
use crate::error::LinkError;
use crate::port::Port;

/// Sync magic, chosen to be unlikely in random data.
pub const SYNC_MAGIC: u32 = 0x5E5A1000;
pub const SYNC_MAGIC_BYTES: [u8; 4] = SYNC_MAGIC.to_le_bytes();

/// Sync + length + CRC bytes around every payload.
pub const FRAME_OVERHEAD: usize = 12;

const UINT32_SIZE: usize = 4;

/// Encode a payload with sync magic, length prefix and CRC-32 suffix.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
    frame.extend_from_slice(&SYNC_MAGIC_BYTES);
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&crc32(payload).to_le_bytes());
    frame
}

/// Read `n` bytes or fail the decode; a short read means the stream stalled
/// inside a frame and the caller should retry on its next tick.
fn read_exact<P: Port>(port: &mut P, n: usize) -> Result<Vec<u8>, LinkError> {
    let data = port.read(n)?;
    if data.len() < n {
        return Err(LinkError::Transport(format!(
            "short read: wanted {}, got {}",
            n,
            data.len()
        )));
    }
    Ok(data)
}

/// Decode one frame, resynchronizing on the sync magic if the stream is
/// misaligned.
///
/// Returns `(payload, crc_ok)`. A CRC mismatch is not an error: the payload
/// is surfaced so upper layers can count corrupt deliveries separately from
/// frames that never arrived.
pub fn decode<P: Port>(port: &mut P, config: &Config) -> Result<(Vec<u8>, bool), LinkError> {
    let first = read_exact(port, UINT32_SIZE)?;
    let mut window = [first[0], first[1], first[2], first[3]];

    let mut bytes_scanned: u32 = 0;
    while window != SYNC_MAGIC_BYTES {
        if bytes_scanned >= config.max_resync_bytes {
            warn!("failed to resync after scanning {} bytes", bytes_scanned);
            return Err(LinkError::Transport(format!(
                "no sync magic within {} bytes",
                bytes_scanned
            )));
        }
        let next = read_exact(port, 1)?;
        window = [window[1], window[2], window[3], next[0]];
        bytes_scanned += 1;
    }
    if bytes_scanned > 0 {
        debug!("resynced after skipping {} bytes", bytes_scanned);
    }

    let length_bytes = read_exact(port, UINT32_SIZE)?;
    let length = u32::from_le_bytes([length_bytes[0], length_bytes[1], length_bytes[2], length_bytes[3]]);

    if length > config.max_message_length {
        warn!(
            "frame length {} exceeds max {}, resyncing",
            length, config.max_message_length
        );
        return Err(LinkError::Transport(format!(
            "declared length {} over cap",
            length
        )));
    }

    let payload = read_exact(port, length as usize)?;
    let crc_bytes = read_exact(port, UINT32_SIZE)?;
    let expected_crc = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

    let crc_ok = expected_crc == crc32(&payload);
    Ok((payload, crc_ok))
}
