//! Command-line entry point.

use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use linktest::runner::{run_client, run_server};

/// Exercise a serial link with framed, CRC-checked request/response traffic.
#[derive(Parser, Debug)]
#[command(name = "linktest", version)]
struct Args {
    /// Serial device path (e.g. /dev/ttyUSB0)
    #[arg(short, long)]
    device: String,

    /// Which protocol half to run
    #[arg(short, long, value_enum)]
    role: RoleArg,

    /// Baud rate
    #[arg(short, long, default_value_t = 115200)]
    baudrate: u32,

    /// Request/response rounds to drive (client only)
    #[arg(short = 'n', long, default_value_t = 100)]
    msg_count: u32,

    /// Handshake timeout in seconds (client only)
    #[arg(long, default_value_t = 60)]
    handshake_timeout: u64,

    /// Flow control
    #[arg(short, long, value_enum, default_value_t = FlowControlArg::None)]
    flow_control: FlowControlArg,

    /// Skip the FTDI latency timer fix
    #[arg(long)]
    no_latency_fix: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Client,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FlowControlArg {
    None,
    Rtscts,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let rtscts = args.flow_control == FlowControlArg::Rtscts;

    let code = match args.role {
        RoleArg::Client => run_client(
            &args.device,
            args.baudrate,
            rtscts,
            Duration::from_secs(args.handshake_timeout),
            args.msg_count,
            args.no_latency_fix,
        )
        .code(),
        RoleArg::Server => {
            let running = Arc::new(AtomicBool::new(true));
            let flag = Arc::clone(&running);
            if let Err(e) = ctrlc::set_handler(move || {
                log::info!("Signal received - shutting down");
                flag.store(false, Ordering::SeqCst);
            }) {
                log::warn!("could not install signal handler: {}", e);
            }
            run_server(
                &args.device,
                args.baudrate,
                rtscts,
                args.no_latency_fix,
                running,
            )
        }
    };

    exit(code);
}
