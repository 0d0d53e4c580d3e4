use std::fs::File;
use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, TryRecvError};
use log::{debug, info, warn};

use opv_phy::frame::header::FrameHeader;
use opv_phy::modem::{samples_to_bytes, IqSample, MskModulator};
use opv_phy::numerology::{FRAME_BYTES, SAMPLES_PER_SYMBOL, STATION_ID_BYTES};
use opv_phy::{encode_frame, Frame};

use crate::config::{Mode, ServiceConfig, DEFAULT_RESPONSE_PORT};
use crate::demod_child::DemodChild;

/// the loop's only suspension point: UDP receive timeout
const POLL_TIMEOUT: Duration = Duration::from_millis(100);
/// stdin chunk size in RX mode
const RX_CHUNK: usize = 16384;
/// zero-sample symbols appended to a capture file on shutdown
const CAPTURE_TRAILER_SYMBOLS: usize = 100;

/// frame counters reported in the shutdown summary
#[derive(Debug, Default, Clone, Copy)]
pub struct Counters {
  /// frames received over UDP and modulated
  pub frames_tx: u64,
  /// frames decoded by the demodulator
  pub frames_rx: u64,
  /// malformed datagrams, failed demod feeds and repeater-identity drops
  pub frames_dropped: u64,
}

/// Apply the loopback repeater rewrite.  Frames already carrying the
/// rewrite identity are dropped to break feedback loops; any other frame
/// gets its station id replaced.
pub fn rewrite_frame(mut frame: Frame, rewrite: Option<&[u8; STATION_ID_BYTES]>) -> Option<Frame> {
  match rewrite {
    None => Some(frame),
    Some(id) if frame[..STATION_ID_BYTES] == id[..] => None,
    Some(id) => {
      frame[..STATION_ID_BYTES].copy_from_slice(id);
      Some(frame)
    }
  }
}

/// Run the service until the termination flag clears or the mode's
/// input drains.  Transient I/O errors are counted and logged; only
/// initialization failures and child-pipe breakage propagate.
pub fn run(config: &ServiceConfig, running: Arc<AtomicBool>) -> io::Result<Counters> {
  match config.mode {
    Mode::Rx => run_rx(config, running),
    _ => run_udp(config, running),
  }
}

fn destination(sender: SocketAddr, response_port: Option<u16>) -> SocketAddr {
  let mut dest = sender;
  if let Some(port) = response_port {
    dest.set_port(port);
  }
  dest
}

/// Monitor, TX and loopback modes: a UDP-driven transmit pipeline with
/// an optional demodulator child closing the loop.
fn run_udp(config: &ServiceConfig, running: Arc<AtomicBool>) -> io::Result<Counters> {
  let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, config.listen_port))?;
  socket.set_read_timeout(Some(POLL_TIMEOUT))?;
  info!("listening on UDP port {}", config.listen_port);

  let mut demod = match config.mode {
    Mode::Loopback => Some(DemodChild::spawn(&config.demod_path, config.verbose)?),
    _ => None,
  };
  let mut capture = match &config.iq_save_path {
    Some(path) => Some(File::create(path)?),
    None => None,
  };

  let mut modulator = MskModulator::new();
  let mut stdout = io::stdout().lock();
  let mut counters = Counters::default();
  let mut last_sender: Option<SocketAddr> = None;

  while running.load(Ordering::Relaxed) {
    let mut buf = [0; 2048];
    match socket.recv_from(&mut buf) {
      Ok((len, sender)) if len != FRAME_BYTES => {
        counters.frames_dropped += 1;
        warn!("dropped {}-byte datagram from {} (want {})", len, sender, FRAME_BYTES);
      }
      Ok((_, sender)) => {
        let mut frame: Frame = [0; FRAME_BYTES];
        frame.copy_from_slice(&buf[..FRAME_BYTES]);
        counters.frames_tx += 1;
        last_sender = Some(sender);

        let header = FrameHeader::parse(&frame);
        debug!(
          "TX {}: {} [0x{:06X}] from {}",
          counters.frames_tx,
          header.callsign(),
          header.token,
          sender
        );

        let samples = modulator.modulate_frame(&encode_frame(&frame));
        let bytes = samples_to_bytes(&samples);
        if let Some(file) = capture.as_mut() {
          file.write_all(&bytes)?;
        }
        if config.mode == Mode::Tx {
          stdout.write_all(&bytes)?;
          stdout.flush()?;
        }
        if let Some(child) = demod.as_mut() {
          if let Err(e) = child.write_iq(&samples) {
            counters.frames_dropped += 1;
            warn!("demodulator feed failed, frame dropped: {}", e);
          }
        }
      }
      Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
      Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
      Err(e) => warn!("UDP receive failed: {}", e),
    }

    // return path: drain whatever the demodulator has decoded
    if let Some(child) = demod.as_ref() {
      loop {
        match child.frames().try_recv() {
          Ok(decoded) => {
            counters.frames_rx += 1;
            let station = FrameHeader::parse(&decoded).callsign();
            match rewrite_frame(decoded, config.rewrite_station_id.as_ref()) {
              None => {
                counters.frames_dropped += 1;
                debug!("RX {}: {} already repeated, dropped", counters.frames_rx, station);
              }
              Some(frame) => {
                debug!("RX {}: {}", counters.frames_rx, station);
                if let Some(sender) = last_sender {
                  let dest = destination(sender, config.response_port);
                  if let Err(e) = socket.send_to(&frame, dest) {
                    warn!("UDP send to {} failed: {}", dest, e);
                  }
                }
              }
            }
          }
          Err(TryRecvError::Empty) => break,
          Err(TryRecvError::Disconnected) => {
            info!("demodulator exited, shutting down");
            finish_capture(capture.as_mut())?;
            return Ok(counters);
          }
        }
      }
    }
  }

  finish_capture(capture.as_mut())?;
  Ok(counters)
}

/// RX mode: pump stdin I/Q into the child, forward decoded frames to the
/// response port on localhost.
fn run_rx(config: &ServiceConfig, running: Arc<AtomicBool>) -> io::Result<Counters> {
  let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))?;
  let response_port = config.response_port.unwrap_or(DEFAULT_RESPONSE_PORT);
  let dest = SocketAddr::from((Ipv4Addr::LOCALHOST, response_port));
  info!("forwarding decoded frames to {}", dest);

  let mut child = DemodChild::spawn(&config.demod_path, config.verbose)?;
  let mut counters = Counters::default();
  let mut stdin = io::stdin().lock();
  let mut buf = [0; RX_CHUNK];

  while running.load(Ordering::Relaxed) {
    let n = match stdin.read(&mut buf) {
      Ok(0) => break,
      Ok(n) => n,
      Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
      Err(e) => return Err(e),
    };
    child.write_bytes(&buf[..n])?;
    drain_to_udp(&child, &socket, dest, &mut counters, false);
  }

  // EOF upstream: let the child finish what it has buffered
  child.close_stdin();
  drain_to_udp(&child, &socket, dest, &mut counters, true);
  Ok(counters)
}

/// Forward decoded frames to UDP; with `to_eof` set, keep waiting until
/// the child disconnects.
fn drain_to_udp(child: &DemodChild, socket: &UdpSocket, dest: SocketAddr, counters: &mut Counters, to_eof: bool) {
  loop {
    let frame = if to_eof {
      match child.frames().recv_timeout(POLL_TIMEOUT) {
        Ok(frame) => frame,
        Err(RecvTimeoutError::Timeout) => continue,
        Err(RecvTimeoutError::Disconnected) => return,
      }
    } else {
      match child.frames().try_recv() {
        Ok(frame) => frame,
        Err(_) => return,
      }
    };
    counters.frames_rx += 1;
    debug!("RX {}: {}", counters.frames_rx, FrameHeader::parse(&frame).callsign());
    if let Err(e) = socket.send_to(&frame, dest) {
      warn!("UDP send to {} failed: {}", dest, e);
    }
  }
}

/// append the zero-sample trailer the capture format carries
fn finish_capture(capture: Option<&mut File>) -> io::Result<()> {
  if let Some(file) = capture {
    let zeros = vec![IqSample::default(); CAPTURE_TRAILER_SYMBOLS * SAMPLES_PER_SYMBOL];
    file.write_all(&samples_to_bytes(&zeros))?;
  }
  Ok(())
}
