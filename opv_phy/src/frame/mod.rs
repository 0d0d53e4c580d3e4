/// OPV header parsing, a collaborator the core pipelines never call
pub mod header;

/// sync-word detection state machine over the soft-symbol stream
pub mod sync;

#[cfg(test)]
mod tests;

use crate::fec::{deinterleave_index, encode_frame_bits, interleave, viterbi_decode};
use crate::helper::randomize;
use crate::numerology::{ENCODED_BITS, FRAME_BITS, FRAME_BYTES, SOFT_MAX};

/// one protocol frame, exactly as carried in UDP datagrams
pub type Frame = [u8; FRAME_BYTES];

/// Randomize, convolve and interleave one frame into its 2144-bit on-air
/// stream (sync word excluded).
pub fn encode_frame(frame: &Frame) -> [u8; ENCODED_BITS] {
  let mut randomized = *frame;
  randomize(&mut randomized);
  let mut bits = encode_frame_bits(&randomized);
  interleave(&mut bits);
  bits
}

/// a decoded frame together with its winning Viterbi path metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
  pub frame: Frame,
  pub metric: u32,
}

/// Decode one 2144-soft-symbol payload window back into a frame:
/// scale, quantize, deinterleave, Viterbi, repack in the encoder's
/// reversed byte order, derandomize.
///
/// Returns `None` only when the window carries essentially no energy;
/// a high path metric still yields a frame (downstream may discard on
/// secondary checks).
pub fn decode_frame(soft: &[f64]) -> Option<DecodedFrame> {
  assert_eq!(soft.len(), ENCODED_BITS);

  let scale = soft.iter().map(|s| s.abs()).sum::<f64>() / ENCODED_BITS as f64;
  if scale < 1e-10 {
    return None;
  }

  // negative soft symbols carry bit 1, so the quantizer maps -max to
  // SOFT_MAX and +max to 0
  let mut quantized = [0; ENCODED_BITS];
  for (q, &s) in quantized.iter_mut().zip(soft) {
    let n = (-s / scale) * 3.5 + 3.5;
    *q = ((n + 0.5).floor() as i32).clamp(0, SOFT_MAX);
  }

  let mut deinterleaved = [0; ENCODED_BITS];
  for (i, d) in deinterleaved.iter_mut().enumerate() {
    *d = quantized[deinterleave_index(i)];
  }

  let (bits, metric) = viterbi_decode(&deinterleaved);

  let mut frame = [0; FRAME_BYTES];
  for (i, byte) in frame.iter_mut().enumerate() {
    for j in 0..8 {
      *byte |= bits[FRAME_BITS - 1 - i * 8 - j] << j;
    }
  }
  randomize(&mut frame);
  Some(DecodedFrame { frame, metric })
}
