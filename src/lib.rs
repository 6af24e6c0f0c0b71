//! # linktest
//! Reliability tester for point-to-point serial (UART) links.
//!
//! Two peers connect over a raw, potentially lossy byte stream: a client and
//! a server establish a session with a SYN / SYN-ACK / ACK handshake keyed
//! by a random connection id, exchange a configured number of framed,
//! CRC-checked request/response rounds, and tear the session down with
//! FIN / FIN-ACK. Each side reports bytes moved, CRC pass rate, round-trip
//! latency percentiles and throughput.
//!
//! Frames are self-delimiting (`[sync][len][payload][crc32]`), so the
//! decoder recovers from garbage, mid-stream joins and corrupted lengths by
//! scanning for the sync magic. Everything runs single-threaded over one
//! blocking port with short read timeouts; there is no async runtime.
//!
//! ## Example
//!
//! A complete session over an in-memory port pair:
//!
//! ```
//! use std::thread;
//!
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! use linktest::{
//!     client_exchange, client_handshake, server_exchange, server_handshake, Config, PairedPort,
//!     SessionParams,
//! };
//!
//! let (mut client_port, mut server_port) = PairedPort::pair();
//! let config = Config::fast();
//!
//! let server_config = config.clone();
//! let server = thread::spawn(move || {
//!     let mut rng = StdRng::seed_from_u64(7);
//!     let conn = server_handshake(
//!         &mut server_port,
//!         &server_config,
//!         server_config.handshake_timeout,
//!     )
//!     .expect("server handshake");
//!     let msg_count = conn.session_params.msg_count;
//!     server_exchange(&mut server_port, &conn, &server_config, &mut rng, msg_count)
//! });
//!
//! let mut rng = StdRng::seed_from_u64(1);
//! let conn = client_handshake(
//!     &mut client_port,
//!     &mut rng,
//!     &config,
//!     SessionParams { msg_count: 3 },
//! )
//! .expect("client handshake");
//! let result = client_exchange(&mut client_port, &conn, &config, &mut rng, 3);
//!
//! assert!(result.success);
//! assert_eq!(result.crc_ok, 3);
//! assert!(result.fin_ack_received);
//!
//! let server_result = server.join().unwrap();
//! assert!(server_result.success);
//! assert!(server_result.fin_received);
//! ```

pub mod config;
pub mod connection;
pub mod crc;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod message;
pub mod port;
pub mod report;
pub mod runner;
pub mod serial;
pub mod session;
pub mod shutdown;

pub use config::Config;
pub use connection::{Connection, Role, SessionParams};
pub use error::{Encoding, LinkError};
pub use handshake::{client_handshake, server_handshake};
pub use message::{ConnId, MsgType};
pub use port::{LoopbackPort, PairedPort, Port};
pub use report::{PeeringReport, Report, SessionReport};
pub use runner::{run_client, run_server, ExitCode};
pub use session::{
    client_exchange, compute_latency_stats, server_exchange, wait_for_fin, LatencyStats,
    SessionResult,
};
pub use shutdown::{client_shutdown, server_shutdown};
