//! OPV test transmitter.
//!
//! Builds frames with a Base-40 station id, a token word and a rolling
//! counter payload, and writes their modulated I/Q stream to stdout for
//! piping into an SDR process or the demodulator.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use opv_phy::encode_frame;
use opv_phy::frame::header::build_frame;
use opv_phy::modem::{samples_to_bytes, IqSample, MskModulator};
use opv_phy::numerology::{FRAME_SYMBOLS, HEADER_BYTES, SAMPLES_PER_SYMBOL};

/// zero-sample symbols appended after the last frame
const TRAILER_SYMBOLS: usize = 100;

fn parse_token(s: &str) -> Result<u32, String> {
  let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
    Some(hex) => u32::from_str_radix(hex, 16),
    None => s.parse(),
  }
  .map_err(|e| e.to_string())?;
  if value > 0xFF_FFFF {
    return Err(String::from("token exceeds 24 bits"));
  }
  Ok(value)
}

/// OPV test transmitter: frames with a counting payload, I/Q on stdout
#[derive(Parser)]
struct OpvMod {
  /// station callsign placed in the frame headers
  #[arg(short = 'S', long)]
  callsign: String,

  /// number of test frames to transmit
  #[arg(short = 'B', long)]
  frames: u32,

  /// 24-bit token word
  #[arg(short, long, value_parser = parse_token, default_value = "0xBBAADD")]
  token: u32,

  /// send one frame's worth of alternating preamble bits first
  #[arg(short, long)]
  preamble: bool,

  /// reset the modulator before every frame
  #[arg(short, long)]
  reset_per_frame: bool,

  /// loop forever instead of stopping after the frame count
  #[arg(short, long)]
  continuous: bool,
}

fn run(args: &OpvMod) -> io::Result<()> {
  // validate the callsign once; every frame reuses the header
  let template = match build_frame(&args.callsign, args.token, &[]) {
    Ok(frame) => frame,
    Err(e) => {
      error!("invalid callsign {:?}: {:?} (use A-Z, 0-9, -, /, .)", args.callsign, e);
      return Err(io::ErrorKind::InvalidInput.into());
    }
  };

  let mut stdout = io::stdout().lock();
  let mut modulator = MskModulator::new();
  let mut frame_num: u32 = 0;

  if args.preamble {
    let samples = modulator.preamble(FRAME_SYMBOLS);
    stdout.write_all(&samples_to_bytes(&samples))?;
  }

  loop {
    modulator.reset();
    for _ in 0..args.frames {
      if args.reset_per_frame {
        modulator.reset();
      }
      let mut frame = template;
      for (i, b) in frame[HEADER_BYTES..].iter_mut().enumerate() {
        *b = (frame_num as usize + i) as u8;
      }
      frame_num = frame_num.wrapping_add(1);

      let samples = modulator.modulate_frame(&encode_frame(&frame));
      stdout.write_all(&samples_to_bytes(&samples))?;
    }
    if !args.continuous {
      break;
    }
  }

  let zeros = vec![IqSample::default(); TRAILER_SYMBOLS * SAMPLES_PER_SYMBOL];
  stdout.write_all(&samples_to_bytes(&zeros))?;
  stdout.flush()?;

  info!("sent {} frames", frame_num);
  Ok(())
}

fn main() -> ExitCode {
  env_logger::init();
  let args = OpvMod::parse();
  match run(&args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(_) => ExitCode::FAILURE,
  }
}
