use crate::numerology::{ENCODED_BITS, INTERLEAVER_COLS, INTERLEAVER_ROWS};

/// Interleaved position of input bit `i`: row-major write / column-major
/// read over the 67x32 block, then the bit is reflected within its byte
/// so the packed stream matches the HDL byte ordering.
fn interleave_index(i: usize) -> usize {
  let raw = (i % INTERLEAVER_COLS) * INTERLEAVER_ROWS + i / INTERLEAVER_COLS;
  (raw / 8) * 8 + (7 - raw % 8)
}

/// Read address into a received stream for deinterleaved position `i`.
/// Scatter on transmit and gather on receive share the index map, which
/// makes the pair an exact inverse.
pub fn deinterleave_index(i: usize) -> usize {
  interleave_index(i)
}

/// Permute the 2144 encoded bits in place for transmission.
pub fn interleave(bits: &mut [u8; ENCODED_BITS]) {
  let mut out = [0; ENCODED_BITS];
  for (i, &b) in bits.iter().enumerate() {
    out[interleave_index(i)] = b;
  }
  *bits = out;
}

/// Inverse of [`interleave`].
pub fn deinterleave(bits: &mut [u8; ENCODED_BITS]) {
  let mut out = [0; ENCODED_BITS];
  for (i, o) in out.iter_mut().enumerate() {
    *o = bits[deinterleave_index(i)];
  }
  *bits = out;
}
