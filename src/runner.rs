//! Top-level drivers: one client run, one persistent server loop.
//!
//! The port is opened here and closed on every exit path; the protocol
//! stages below never hold it across an API boundary. The server polls its
//! listen window in short slices so an operator interrupt is observed
//! within about a second.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Config;
use crate::connection::SessionParams;
use crate::error::LinkError;
use crate::handshake::{client_handshake, server_handshake};
use crate::port::Port;
use crate::report::{PeeringReport, Report, SessionReport};
use crate::serial::{configure_ftdi_latency_timer, open_serial};
use crate::session::{client_exchange, server_exchange};

/// Client exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Session complete, every CRC clean.
    Success = 0,
    /// Handshake failed or the session aborted.
    PeeringFailed = 1,
    /// Session ran but nothing came back.
    NoData = 2,
    /// Session complete with CRC failures.
    CrcErrors = 3,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Listen window between shutdown-flag checks in the persistent server loop.
const HANDSHAKE_POLL: Duration = Duration::from_secs(1);

/// Run the client end to end: peering, exchange, reports, exit code.
pub fn run_client(
    device: &str,
    baudrate: u32,
    rtscts: bool,
    handshake_timeout: Duration,
    msg_count: u32,
    no_latency_fix: bool,
) -> ExitCode {
    if !no_latency_fix {
        configure_ftdi_latency_timer(device);
    }

    let mut port = match open_serial(device, baudrate, rtscts) {
        Ok(port) => port,
        Err(e) => {
            error!("Failed to open serial port: {}", e);
            return ExitCode::PeeringFailed;
        }
    };

    let code = client_session(&mut port, handshake_timeout, msg_count);
    drop(port);
    info!("Closed {}", device);
    code
}

fn client_session<P: Port>(port: &mut P, handshake_timeout: Duration, msg_count: u32) -> ExitCode {
    let config = Config {
        handshake_timeout,
        ..Config::default()
    };
    let params = SessionParams { msg_count };
    let mut rng = StdRng::from_entropy();

    info!("Client: connecting to server (msg_count={})...", msg_count);

    let conn = match client_handshake(port, &mut rng, &config, params) {
        Ok(conn) => conn,
        Err(e) => {
            warn!("Peering failed: {}", e);
            PeeringReport::failed(e).print();
            return ExitCode::PeeringFailed;
        }
    };

    info!(
        "Peering successful (id={}, msg_count={})",
        conn.connection_id, msg_count
    );
    PeeringReport::connected(&conn).print();

    let report = SessionReport::new(client_exchange(port, &conn, &config, &mut rng, msg_count));
    report.print();

    let result = &report.result;
    if !result.success {
        ExitCode::PeeringFailed
    } else if result.received == 0 {
        ExitCode::NoData
    } else if result.crc_pass_rate() < 100.0 {
        ExitCode::CrcErrors
    } else {
        ExitCode::Success
    }
}

/// Run the server until the running flag clears. Returns the process exit
/// code: non-zero only when the port cannot be opened.
pub fn run_server(
    device: &str,
    baudrate: u32,
    rtscts: bool,
    no_latency_fix: bool,
    running: Arc<AtomicBool>,
) -> i32 {
    if !no_latency_fix {
        configure_ftdi_latency_timer(device);
    }

    let mut port = match open_serial(device, baudrate, rtscts) {
        Ok(port) => port,
        Err(e) => {
            error!("Failed to open serial port: {}", e);
            return 1;
        }
    };

    info!("Server started on {}, waiting for connections...", device);
    serve_loop(&mut port, &running);

    drop(port);
    info!("Closed {}", device);
    info!("Server shutdown complete");
    0
}

fn serve_loop<P: Port>(port: &mut P, running: &AtomicBool) {
    let config = Config::default();
    let mut rng = StdRng::from_entropy();

    while running.load(Ordering::SeqCst) {
        let conn = match server_handshake(port, &config, HANDSHAKE_POLL) {
            Ok(conn) => conn,
            // Nobody called within the window; check the flag and listen again.
            Err(LinkError::PeeringTimeout(_)) => continue,
            Err(e) => {
                warn!("Peering failed: {}", e);
                continue;
            }
        };

        if !running.load(Ordering::SeqCst) {
            break;
        }

        info!("Connection established (id={})", conn.connection_id);
        PeeringReport::connected_with_params(&conn).print();

        let msg_count = conn.session_params.msg_count;
        let report = SessionReport::new(server_exchange(port, &conn, &config, &mut rng, msg_count));

        if !running.load(Ordering::SeqCst) {
            break;
        }

        report.print();

        // Back to listening regardless of the per-session outcome.
        if report.result.success {
            info!("Session complete, returning to wait for next client");
        } else if let Some(error) = &report.result.error {
            warn!("Session failed: {}", error);
        }
    }
}
