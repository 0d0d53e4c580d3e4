use std::path::PathBuf;

/// default UDP port frames to transmit arrive on
pub const DEFAULT_LISTEN_PORT: u16 = 57372;
/// default UDP port decoded frames are delivered to in RX mode
pub const DEFAULT_RESPONSE_PORT: u16 = 57373;

/// operating mode of the modem service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// UDP in, count and log only
  Monitor,
  /// UDP in, modulate, I/Q to stdout (for piping to an SDR process)
  Tx,
  /// UDP in, modulate, demodulate through the child, frames back out
  Loopback,
  /// I/Q from stdin through the child, decoded frames to UDP
  Rx,
}

/// Runtime configuration of the modem service, assembled by the CLI.
pub struct ServiceConfig {
  pub mode: Mode,
  /// UDP port listened on for frames to transmit
  pub listen_port: u16,
  /// destination port override for decoded frames; loopback replies go
  /// to the last sender's port when unset
  pub response_port: Option<u16>,
  /// pre-encoded station id written over returned frames, when repeating
  pub rewrite_station_id: Option<[u8; 6]>,
  /// path to the demodulator binary
  pub demod_path: PathBuf,
  /// optional capture file for transmitted I/Q
  pub iq_save_path: Option<PathBuf>,
  /// pass the demodulator's diagnostics through to stderr
  pub verbose: bool,
}
