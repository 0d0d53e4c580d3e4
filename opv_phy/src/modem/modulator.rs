use std::f64::consts::{PI, TAU};

use super::iq::IqSample;
use crate::numerology::{
  ENCODED_BITS, FREQ_DEV, FRAME_SYMBOLS, IQ_FULL_SCALE, SAMPLES_PER_SYMBOL, SAMPLE_RATE, SYNC_BITS, SYNC_WORD,
};

/// wrap a phase accumulator back into (-pi, pi]
fn wrap(mut phase: f64) -> f64 {
  while phase > PI {
    phase -= TAU;
  }
  while phase < -PI {
    phase += TAU;
  }
  phase
}

/// HDL-accurate dual-NCO staggered MSK modulator.
///
/// Two free-running tone NCOs sit at ±13 550 Hz.  Per symbol, a small
/// Mealy machine derives two ternary amplitudes from the input bit, the
/// previous symbol's sign (`prev_sign`) and the odd/even symbol flag
/// (`alt`); exactly one amplitude is non-zero at a time, so the summed
/// output traces a constant-envelope MSK circle.  `prev_sign` is updated
/// only after the amplitudes are derived.
pub struct MskModulator {
  phase_f1: f64,
  phase_f2: f64,
  prev_sign: i8,
  alt: bool,
}

impl MskModulator {
  pub fn new() -> Self {
    Self {
      phase_f1: 0.0,
      phase_f2: 0.0,
      prev_sign: 1,
      alt: true,
    }
  }

  /// back to the start-of-transmission state
  pub fn reset(&mut self) {
    *self = Self::new();
  }

  /// Modulate one bit into its 40 baseband samples.
  pub fn modulate_bit(&mut self, bit: u8) -> [IqSample; SAMPLES_PER_SYMBOL] {
    let d_val: i8 = if bit == 0 { 1 } else { -1 };
    let d_val_xor = d_val * self.prev_sign;

    let d_pos = (d_val + 1) >> 1;
    let d_neg = (d_val - 1) >> 1;
    let d_pos_enc = d_pos;
    let d_neg_enc = if self.alt { -d_neg } else { d_neg };

    // ternary tone amplitudes: s1 rides the lower tone when the positive
    // path is active, s2 the upper tone otherwise, both signed by the
    // prior symbol
    let d_s1 = if d_pos_enc == 1 { self.prev_sign } else { 0 };
    let d_s2 = if d_neg_enc != 0 { self.prev_sign * d_neg_enc } else { 0 };

    let inc_f1 = -TAU * FREQ_DEV / SAMPLE_RATE;
    let inc_f2 = TAU * FREQ_DEV / SAMPLE_RATE;

    let mut out = [IqSample::default(); SAMPLES_PER_SYMBOL];
    for sample in out.iter_mut() {
      let i = d_s1 as f64 * self.phase_f1.sin() + d_s2 as f64 * self.phase_f2.sin();
      let q = d_s1 as f64 * self.phase_f1.cos() + d_s2 as f64 * self.phase_f2.cos();
      *sample = IqSample {
        i: (IQ_FULL_SCALE as f64 * i) as i16,
        q: (IQ_FULL_SCALE as f64 * q) as i16,
      };
      self.phase_f1 = wrap(self.phase_f1 + inc_f1);
      self.phase_f2 = wrap(self.phase_f2 + inc_f2);
    }

    self.prev_sign = d_val_xor;
    self.alt = !self.alt;
    out
  }

  /// Modulate the 24 sync-word bits (MSB first) followed by the 2144
  /// encoded payload bits of one frame.
  pub fn modulate_frame(&mut self, encoded: &[u8; ENCODED_BITS]) -> Vec<IqSample> {
    let mut out = Vec::with_capacity(FRAME_SYMBOLS * SAMPLES_PER_SYMBOL);
    for i in (0..SYNC_BITS).rev() {
      out.extend(self.modulate_bit(((SYNC_WORD >> i) & 1) as u8));
    }
    for &bit in encoded.iter() {
      out.extend(self.modulate_bit(bit));
    }
    out
  }

  /// Modulate `bits` symbols of the alternating 0/1 preamble.
  pub fn preamble(&mut self, bits: usize) -> Vec<IqSample> {
    let mut out = Vec::with_capacity(bits * SAMPLES_PER_SYMBOL);
    for n in 0..bits {
      out.extend(self.modulate_bit((n & 1) as u8));
    }
    out
  }

  /// Dead carrier: hold the current lower-tone phase at zero differential
  /// for `len` samples, keeping the envelope constant between frames.
  pub fn dead_carrier(&self, len: usize) -> Vec<IqSample> {
    let sample = IqSample {
      i: (IQ_FULL_SCALE as f64 * self.phase_f1.cos()) as i16,
      q: (IQ_FULL_SCALE as f64 * self.phase_f1.sin()) as i16,
    };
    vec![sample; len]
  }
}

impl Default for MskModulator {
  fn default() -> Self {
    Self::new()
  }
}
