//! OPV modem server.
//!
//! Listens on a UDP port for 134-byte OPV frames, modulates them, and
//! depending on the mode writes the I/Q stream to stdout, loops it
//! through a persistent demodulator child back to the sender, or pumps
//! stdin I/Q into the child and forwards decoded frames over UDP.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::error;

use opv_modem::config::{Mode, ServiceConfig, DEFAULT_LISTEN_PORT};
use opv_modem::server;
use opv_phy::helper::encode_callsign;

/// OPV modem server: UDP frames in, MSK baseband out, optional loopback
#[derive(Parser)]
struct OpvModem {
  /// UDP port to listen on for frames to transmit
  #[arg(short = 'p', long, default_value_t = DEFAULT_LISTEN_PORT)]
  port: u16,

  /// UDP port decoded frames are sent to (loopback replies go to the
  /// sender's port when unset)
  #[arg(short = 'r', long)]
  response_port: Option<u16>,

  /// loopback mode: modulate, demodulate and return frames
  #[arg(short, long, conflicts_with_all = ["tx", "rx"])]
  loopback: bool,

  /// TX mode: write I/Q samples to stdout
  #[arg(short, long, conflicts_with = "rx")]
  tx: bool,

  /// RX mode: read I/Q samples from stdin, forward decoded frames
  #[arg(short = 'R', long)]
  rx: bool,

  /// rewrite the station id of returned frames (loopback repeater)
  #[arg(short, long)]
  callsign: Option<String>,

  /// path to the demodulator binary
  #[arg(short, long, default_value = "./bin/opv-demod")]
  demod: PathBuf,

  /// also save transmitted I/Q samples to a file
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// pass demodulator diagnostics through to stderr
  #[arg(short, long)]
  verbose: bool,

  /// suppress the shutdown summary
  #[arg(short, long)]
  quiet: bool,
}

fn main() -> ExitCode {
  env_logger::init();
  let args = OpvModem::parse();

  let mode = if args.loopback {
    Mode::Loopback
  } else if args.tx {
    Mode::Tx
  } else if args.rx {
    Mode::Rx
  } else {
    Mode::Monitor
  };

  let rewrite_station_id = match args.callsign.as_deref().map(encode_callsign) {
    None => None,
    Some(Ok(id)) => Some(id),
    Some(Err(e)) => {
      error!("invalid rewrite callsign: {:?} (use A-Z, 0-9, -, /, .)", e);
      return ExitCode::FAILURE;
    }
  };

  let config = ServiceConfig {
    mode,
    listen_port: args.port,
    response_port: args.response_port,
    rewrite_station_id,
    demod_path: args.demod,
    iq_save_path: args.output,
    verbose: args.verbose,
  };

  let running = Arc::new(AtomicBool::new(true));
  let flag = running.clone();
  if let Err(e) = ctrlc::set_handler(move || flag.store(false, Ordering::Relaxed)) {
    error!("cannot install signal handler: {}", e);
    return ExitCode::FAILURE;
  }

  match server::run(&config, running) {
    Ok(counters) => {
      if !args.quiet {
        eprintln!(
          "summary: {} frames modulated, {} decoded, {} dropped",
          counters.frames_tx, counters.frames_rx, counters.frames_dropped
        );
      }
      ExitCode::SUCCESS
    }
    Err(e) => {
      error!("modem service failed: {}", e);
      ExitCode::FAILURE
    }
  }
}
