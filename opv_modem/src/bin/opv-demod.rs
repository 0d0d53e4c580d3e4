//! Streaming OPV MSK demodulator.
//!
//! Reads 16-bit LE interleaved I/Q from stdin, acquires the carrier with
//! the coarse AFC grid, then runs the integrate-and-dump demodulator and
//! sync tracker, decoding each payload window back into a 134-byte
//! frame.  `--raw` writes decoded frames to stdout, which is the wire
//! protocol the modem service's loopback child expects.

use std::io::{self, Read, Write};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use opv_phy::frame::sync::SyncTracker;
use opv_phy::frame::{decode_frame, header::FrameHeader};
use opv_phy::modem::{bytes_to_samples, IqSample, MskDemodulator};
use opv_phy::numerology::SAMPLES_PER_SYMBOL;

/// stdin chunk size in bytes
const READ_CHUNK: usize = 16384;
/// samples buffered before the coarse AFC runs in streaming mode
const ACQUISITION_SAMPLES: usize = MskDemodulator::SEARCH_SYMBOLS * SAMPLES_PER_SYMBOL;

/// OPV MSK demodulator: I/Q samples in on stdin, frames out on stdout
#[derive(Parser)]
struct OpvDemod {
  /// process stdin incrementally instead of buffering to end of input
  #[arg(short, long)]
  stream: bool,

  /// write decoded 134-byte frames to stdout
  #[arg(short, long)]
  raw: bool,

  /// AFC loop gain
  #[arg(short = 'a', long, default_value_t = MskDemodulator::AFC_ALPHA)]
  afc_alpha: f64,

  /// report only the shutdown summary
  #[arg(short, long)]
  quiet: bool,
}

/// receive pipeline state shared by the streaming and buffered paths
struct Receiver {
  demodulator: MskDemodulator,
  tracker: SyncTracker,
  raw: bool,
  quiet: bool,
  decoded: u64,
  perfect: u64,
}

impl Receiver {
  fn new(args: &OpvDemod) -> Self {
    let mut demodulator = MskDemodulator::new();
    demodulator.set_afc_alpha(args.afc_alpha);
    Self {
      demodulator,
      tracker: SyncTracker::new(),
      raw: args.raw,
      quiet: args.quiet,
      decoded: 0,
      perfect: 0,
    }
  }

  /// run the coarse acquisition over whatever has been buffered
  fn acquire(&mut self, samples: &[IqSample]) {
    let complex: Vec<_> = samples.iter().map(|s| s.to_complex()).collect();
    let offset = self.demodulator.estimate_offset(&complex);
    self.demodulator.set_freq_offset(offset);
    info!("carrier offset estimate: {:.1} Hz", offset);
  }

  /// Demodulate every whole symbol in `samples` (the remainder stays for
  /// the next chunk) and decode any payload windows that complete.
  fn process(&mut self, samples: &mut Vec<IqSample>, stdout: &mut impl Write) -> io::Result<()> {
    let whole = samples.len() - samples.len() % SAMPLES_PER_SYMBOL;
    let complex: Vec<_> = samples[..whole].iter().map(|s| s.to_complex()).collect();
    samples.drain(..whole);

    let mut soft = Vec::with_capacity(complex.len() / SAMPLES_PER_SYMBOL);
    self.demodulator.demodulate(&complex, &mut soft);

    for s in soft {
      let window = match self.tracker.on_symbol(s) {
        Some(window) => window,
        None => continue,
      };
      let decoded = match decode_frame(&window) {
        Some(decoded) => decoded,
        None => continue,
      };
      self.decoded += 1;
      if decoded.metric == 0 {
        self.perfect += 1;
      }
      if !self.quiet {
        let header = FrameHeader::parse(&decoded.frame);
        info!(
          "frame {}: {} [0x{:06X}] metric {} sync {:.3}",
          self.decoded,
          header.callsign(),
          header.token,
          decoded.metric,
          self.tracker.last_quality()
        );
      }
      if self.raw {
        stdout.write_all(&decoded.frame)?;
        stdout.flush()?;
      }
    }
    Ok(())
  }
}

fn run(args: &OpvDemod) -> io::Result<u64> {
  let mut receiver = Receiver::new(args);
  let mut stdin = io::stdin().lock();
  let mut stdout = io::stdout().lock();

  let mut buf = [0; READ_CHUNK];
  let mut carry: Vec<u8> = Vec::new();
  let mut samples: Vec<IqSample> = Vec::new();
  let mut acquiring = true;

  loop {
    let n = match stdin.read(&mut buf) {
      Ok(0) => break,
      Ok(n) => n,
      Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
      Err(e) => return Err(e),
    };
    carry.extend_from_slice(&buf[..n]);
    let whole = carry.len() - carry.len() % IqSample::WIRE_BYTES;
    samples.extend(bytes_to_samples(&carry[..whole]));
    carry.drain(..whole);

    if acquiring {
      if !args.stream || samples.len() < ACQUISITION_SAMPLES {
        continue;
      }
      receiver.acquire(&samples);
      acquiring = false;
    }
    receiver.process(&mut samples, &mut stdout)?;
  }

  // end of input: acquire late if the stream was short, then flush the tail
  if acquiring {
    receiver.acquire(&samples);
  }
  receiver.process(&mut samples, &mut stdout)?;

  info!(
    "done: {} frames ({} perfect), final AFC {:.1} Hz",
    receiver.decoded,
    receiver.perfect,
    receiver.demodulator.freq_offset()
  );
  Ok(receiver.decoded)
}

fn main() -> ExitCode {
  env_logger::init();
  let args = OpvDemod::parse();
  match run(&args) {
    Ok(decoded) if decoded > 0 => ExitCode::SUCCESS,
    Ok(_) => ExitCode::FAILURE,
    Err(e) => {
      error!("demodulator failed: {}", e);
      ExitCode::FAILURE
    }
  }
}
