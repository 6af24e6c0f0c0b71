//! CRC-32 for frame checksums.
//!
//! The wire format uses the IEEE 802.3 reflected variant: polynomial
//! 0xEDB88320, initial value 0xFFFFFFFF, final xor 0xFFFFFFFF. This is the
//! value produced by the stock CRC-32 routine in most ecosystems, so either
//! end of the link can be replaced by other tooling.

const CRC_POLYNOMIAL_REVERSED: u32 = 0xedb88320;
const CRC_SEED: u32 = 0xffffffff;

/// Streaming CRC-32 context.
pub struct Crc32Context {
    crc: u32,
}

impl Crc32Context {
    pub fn new() -> Self {
        Crc32Context { crc: CRC_SEED }
    }

    /// Feed one byte into the checksum.
    pub fn step(&mut self, byte: u8) {
        self.crc ^= byte as u32;
        for _ in 0..8 {
            if self.crc & 1 == 1 {
                self.crc = (self.crc >> 1) ^ CRC_POLYNOMIAL_REVERSED;
            } else {
                self.crc >>= 1;
            }
        }
    }

    /// Feed a slice of bytes into the checksum.
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.step(byte);
        }
    }

    pub fn finalize(&self) -> u32 {
        !self.crc
    }
}

impl Default for Crc32Context {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot CRC-32 over a byte slice.
pub fn crc32(data: &[u8]) -> u32 {
    let mut ctx = Crc32Context::new();
    ctx.update(data);
    ctx.finalize()
}
