use crate::numerology::{ENCODED_BITS, FRAME_BITS, G1_MASK, G2_MASK, NUM_STATES, SOFT_MAX};

/// metric for an unreachable state
const METRIC_INF: u32 = u32::MAX;

/// expected (g1, g2) outputs for the transition from `prev` on `input`
fn branch_outputs(prev: usize, input: usize) -> (i32, i32) {
  let state = (input << 6) | prev;
  let g1 = (state & G1_MASK as usize).count_ones() & 1;
  let g2 = (state & G2_MASK as usize).count_ones() & 1;
  (g1 as i32, g2 as i32)
}

/// distance of quantized soft value `s` from expected hard bit `e`
fn bit_metric(e: i32, s: i32) -> u32 {
  if e == 1 {
    (SOFT_MAX - s) as u32
  } else {
    s as u32
  }
}

/// Soft-decision Viterbi decoder for the 64-state K=7 code.
///
/// Soft inputs are quantized confidences in 0..=SOFT_MAX, where SOFT_MAX
/// means "certainly 1".  The decoder starts from state 0 (the encoder is
/// never flushed), runs a full traceback from the best end state, and
/// returns the decoded bits together with the winning path metric.
/// Callers emit the frame regardless of the metric.
pub fn viterbi_decode(soft: &[i32; ENCODED_BITS]) -> ([u8; FRAME_BITS], u32) {
  let mut metrics = [METRIC_INF; NUM_STATES];
  metrics[0] = 0;
  let mut decisions = vec![[0u8; NUM_STATES]; FRAME_BITS];

  for (t, pair) in soft.chunks_exact(2).enumerate() {
    let (sg1, sg2) = (pair[0], pair[1]);
    let mut next = [METRIC_INF; NUM_STATES];
    for (state, next_metric) in next.iter_mut().enumerate() {
      // the new state's low bit is the input that produced it; its two
      // possible predecessors differ in their dropped high bit
      let p0 = state >> 1;
      let p1 = p0 + NUM_STATES / 2;
      let input = state & 1;

      let (e1_0, e2_0) = branch_outputs(p0, input);
      let (e1_1, e2_1) = branch_outputs(p1, input);
      let m0 = metrics[p0].saturating_add(bit_metric(e1_0, sg1) + bit_metric(e2_0, sg2));
      let m1 = metrics[p1].saturating_add(bit_metric(e1_1, sg1) + bit_metric(e2_1, sg2));

      if m0 <= m1 {
        *next_metric = m0;
        decisions[t][state] = 0;
      } else {
        *next_metric = m1;
        decisions[t][state] = 1;
      }
    }
    metrics = next;
  }

  let best = (0..NUM_STATES).min_by_key(|&s| metrics[s]).unwrap_or(0);
  let mut bits = [0; FRAME_BITS];
  let mut state = best;
  for t in (0..FRAME_BITS).rev() {
    bits[t] = (state & 1) as u8;
    state = if decisions[t][state] == 0 {
      state >> 1
    } else {
      (state >> 1) + NUM_STATES / 2
    };
  }
  (bits, metrics[best])
}
