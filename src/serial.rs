//! Real serial port adapter and device setup.
//!
//! Wraps a `serialport` handle behind the [`Port`] trait with the short-poll
//! read semantics the protocol expects: a read gathers up to `max` bytes for
//! at most the read timeout and returns whatever arrived. Also carries the
//! USB-serial housekeeping around opening a device: the FTDI latency timer
//! fix and device identification logging.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::error::LinkError;
use crate::port::Port;

/// Short read timeout so polling loops can check their deadlines.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);
/// Writes get longer; a write timeout is a hard failure.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// FTDI adapters default to a 16 ms latency timer, which batches small
/// frames and wrecks RTT numbers; 1 ms keeps RTS/CTS responsive too.
const FTDI_LATENCY_TIMER_TARGET: u32 = 1;

pub struct SerialAdapter {
    inner: Box<dyn SerialPort>,
}

impl Port for SerialAdapter {
    fn write(&mut self, data: &[u8]) -> Result<usize, LinkError> {
        // serialport has one timeout for both directions; widen it around
        // the write, then restore the short read poll.
        self.inner
            .set_timeout(WRITE_TIMEOUT)
            .map_err(|e| LinkError::Transport(format!("set write timeout: {}", e)))?;
        let outcome = self.inner.write_all(data);
        self.inner
            .set_timeout(READ_TIMEOUT)
            .map_err(|e| LinkError::Transport(format!("restore read timeout: {}", e)))?;

        match outcome {
            Ok(()) => Ok(data.len()),
            Err(e) => Err(LinkError::Transport(format!("write failed: {}", e))),
        }
    }

    fn read(&mut self, max: usize) -> Result<Vec<u8>, LinkError> {
        let mut buf = vec![0u8; max];
        let mut filled = 0;
        let deadline = Instant::now() + READ_TIMEOUT;

        while filled < max {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(LinkError::Transport(format!("read failed: {}", e))),
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }

    fn in_waiting(&self) -> usize {
        self.inner.bytes_to_read().map(|n| n as usize).unwrap_or(0)
    }
}

/// Open and configure a serial port: 8N1, no XON/XOFF, optional RTS/CTS.
pub fn open_serial(device: &str, baudrate: u32, rtscts: bool) -> Result<SerialAdapter, LinkError> {
    log_device_info(device);

    let flow_control = if rtscts {
        FlowControl::Hardware
    } else {
        FlowControl::None
    };

    let inner = serialport::new(device, baudrate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(flow_control)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|e| LinkError::Transport(format!("failed to open {}: {}", device, e)))?;

    if let Err(e) = inner.clear(ClearBuffer::Output) {
        warn!("could not reset output buffer: {}", e);
    }
    debug!("Serial port: baudrate={}, rtscts={}", baudrate, rtscts);

    Ok(SerialAdapter { inner })
}

/// Set the FTDI latency timer to 1 ms via sysfs. Returns whether the timer
/// is known to be at the target afterwards; inapplicable devices and missing
/// permissions degrade to a log line.
pub fn configure_ftdi_latency_timer(device: &str) -> bool {
    let device_name = Path::new(device)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(device);

    if !device_name.starts_with("ttyUSB") {
        debug!("latency fix not applicable to {}", device_name);
        return false;
    }

    let sysfs_path = format!("/sys/bus/usb-serial/devices/{}/latency_timer", device_name);
    if !Path::new(&sysfs_path).exists() {
        warn!("cannot configure latency timer: {} not found", sysfs_path);
        return false;
    }

    let current = match read_latency_timer(&sysfs_path) {
        Some(value) => value,
        None => return false,
    };
    if current == FTDI_LATENCY_TIMER_TARGET {
        debug!("latency timer already set to {}ms", FTDI_LATENCY_TIMER_TARGET);
        return true;
    }

    if let Err(e) = fs::write(&sysfs_path, FTDI_LATENCY_TIMER_TARGET.to_string()) {
        // Typically permission denied; the fix needs root.
        warn!("cannot configure latency timer: {}", e);
        return false;
    }

    match read_latency_timer(&sysfs_path) {
        Some(value) if value == FTDI_LATENCY_TIMER_TARGET => {
            info!(
                "Set FTDI latency timer from {}ms to {}ms for improved RTS/CTS reliability",
                current, FTDI_LATENCY_TIMER_TARGET
            );
            true
        }
        Some(value) => {
            warn!(
                "failed to set latency timer: wrote {}, read {}",
                FTDI_LATENCY_TIMER_TARGET, value
            );
            false
        }
        None => false,
    }
}

fn read_latency_timer(sysfs_path: &str) -> Option<u32> {
    match fs::read_to_string(sysfs_path) {
        Ok(contents) => match contents.trim().parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("unparsable latency timer value: {}", e);
                None
            }
        },
        Err(e) => {
            warn!("failed to read latency timer: {}", e);
            None
        }
    }
}

/// Log what we know about the device before opening it.
pub fn log_device_info(device: &str) {
    let real_path = fs::canonicalize(device)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| device.to_string());
    if real_path.starts_with("/dev/pts/") {
        info!("Device: {} -> {} (pty)", device, real_path);
        return;
    }

    match serialport::available_ports() {
        Ok(ports) => match ports.into_iter().find(|p| p.port_name == device) {
            Some(port_info) => {
                info!("Device: {}", port_info.port_name);
                if let serialport::SerialPortType::UsbPort(usb) = port_info.port_type {
                    if let Some(product) = usb.product {
                        info!("Description: {}", product);
                    }
                    info!("VID:PID: {:04x}:{:04x}", usb.vid, usb.pid);
                }
            }
            None => info!("Device: {} (not in port list)", device),
        },
        Err(e) => debug!("could not enumerate serial ports: {}", e),
    }
}
