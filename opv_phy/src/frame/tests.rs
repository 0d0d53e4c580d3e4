use rand::{Rng, RngCore};

use super::sync::{SyncState, SyncTracker, PAYLOAD_SYMBOLS};
use super::{decode_frame, encode_frame, header, Frame};
use crate::fec::{encode_frame_bits, interleave};
use crate::helper::{encode_callsign, randomize};
use crate::numerology::{ENCODED_BITS, FRAME_BYTES, HEADER_BYTES, SYNC_BITS, SYNC_WORD};

/// promote hard encoded bits to full-confidence soft symbols
/// (bit 1 rides the lower tone and reads negative)
fn bits_to_soft(bits: &[u8; ENCODED_BITS]) -> Vec<f64> {
  bits.iter().map(|&b| if b == 1 { -1000.0 } else { 1000.0 }).collect()
}

/// the test frame of the end-to-end scenarios: ASCII station id,
/// zero token and reserved spans, counting payload
fn test_frame() -> Frame {
  let mut frame = [0; FRAME_BYTES];
  frame[..6].copy_from_slice(b"KB5MU\0");
  for (i, b) in frame[HEADER_BYTES..].iter_mut().enumerate() {
    *b = i as u8;
  }
  frame
}

#[test]
fn roundtrip_no_channel() {
  let frame = test_frame();
  let encoded = encode_frame(&frame);
  let decoded = decode_frame(&bits_to_soft(&encoded)).unwrap();
  assert_eq!(decoded.frame, frame);
  assert_eq!(decoded.metric, 0);
}

#[test]
fn roundtrip_random_frames() {
  let mut rng = rand::thread_rng();
  for _ in 0..20 {
    let mut frame = [0; FRAME_BYTES];
    rng.fill_bytes(&mut frame);
    let decoded = decode_frame(&bits_to_soft(&encode_frame(&frame))).unwrap();
    assert_eq!(decoded.frame, frame);
    assert_eq!(decoded.metric, 0);
  }
}

#[test]
fn roundtrip_zero_frame_perfect_metric() {
  let frame = [0; FRAME_BYTES];
  let decoded = decode_frame(&bits_to_soft(&encode_frame(&frame))).unwrap();
  assert_eq!(decoded.frame, frame);
  assert_eq!(decoded.metric, 0);
}

/// encode with errors injected into the pre-interleave stream
fn encode_with_errors(frame: &Frame, error_positions: &[usize]) -> Vec<f64> {
  let mut randomized = *frame;
  randomize(&mut randomized);
  let mut bits = encode_frame_bits(&randomized);
  for &p in error_positions {
    bits[p] ^= 1;
  }
  interleave(&mut bits);
  bits_to_soft(&bits)
}

#[test]
fn viterbi_recovers_single_bit_error() {
  let frame = test_frame();
  let mut rng = rand::thread_rng();
  for _ in 0..10 {
    let soft = encode_with_errors(&frame, &[rng.gen_range(0..ENCODED_BITS)]);
    let decoded = decode_frame(&soft).unwrap();
    assert_eq!(decoded.frame, frame);
    assert!(decoded.metric > 0);
  }
}

#[test]
fn viterbi_recovers_spaced_errors() {
  let frame = test_frame();
  // 10 isolated errors, 67 bits or more apart in the encoder output
  let positions: Vec<usize> = (0..10).map(|i| 13 + i * 197).collect();
  let decoded = decode_frame(&encode_with_errors(&frame, &positions)).unwrap();
  assert_eq!(decoded.frame, frame);
  assert!(decoded.metric > 0);
}

#[test]
fn decode_is_scale_invariant() {
  let frame = test_frame();
  let soft = bits_to_soft(&encode_frame(&frame));
  for gain in [1e-4, 0.5, 3e7] {
    let scaled: Vec<f64> = soft.iter().map(|s| s * gain).collect();
    let decoded = decode_frame(&scaled).unwrap();
    assert_eq!(decoded.frame, frame);
    assert_eq!(decoded.metric, 0);
  }
}

#[test]
fn decode_rejects_dead_air() {
  assert!(decode_frame(&vec![0.0; ENCODED_BITS]).is_none());
}

#[test]
fn header_parse_build_roundtrip() {
  let payload: Vec<u8> = (0..122).collect();
  let frame = header::build_frame("W5NYV", 0xBBAADD, &payload).unwrap();
  let parsed = header::FrameHeader::parse(&frame);
  assert_eq!(parsed.station_id, encode_callsign("W5NYV").unwrap());
  assert_eq!(parsed.callsign(), "W5NYV");
  assert_eq!(parsed.token, 0xBBAADD);
  assert_eq!(parsed.reserved, [0; 3]);
  assert!(!parsed.last_frame());
  assert!(!parsed.bert_mode());
  assert_eq!(&frame[HEADER_BYTES..], &payload[..]);
}

#[test]
fn header_flags() {
  let frame = header::build_frame("KB5MU", header::FrameHeader::LAST_FRAME | header::FrameHeader::BERT_MODE, &[])
    .unwrap();
  let parsed = header::FrameHeader::parse(&frame);
  assert!(parsed.last_frame());
  assert!(parsed.bert_mode());
}

/// soft symbols of the sync word at the given amplitude
fn sync_soft(amplitude: f64) -> Vec<f64> {
  (0..SYNC_BITS)
    .map(|i| {
      let bit = (SYNC_WORD >> (SYNC_BITS - 1 - i)) & 1;
      if bit == 1 {
        -amplitude
      } else {
        amplitude
      }
    })
    .collect()
}

#[test]
fn sync_correlation_is_unity_on_pattern() {
  for amplitude in [101.0, 500.0, 12345.0] {
    let mut tracker = SyncTracker::new();
    for s in sync_soft(amplitude) {
      tracker.on_symbol(s);
    }
    let (raw, norm) = tracker.correlation();
    assert!(raw > 0.0);
    assert_eq!(norm, 1.0);
  }
}

#[test]
fn sync_correlation_guards_low_energy() {
  let mut tracker = SyncTracker::new();
  for s in sync_soft(1.0) {
    tracker.on_symbol(s);
  }
  let (_, norm) = tracker.correlation();
  assert_eq!(norm, 0.0);
}

#[test]
fn tracker_walks_hunt_verify_lock() {
  let mut tracker = SyncTracker::new();
  assert_eq!(tracker.state(), SyncState::Hunting);

  let mut windows = Vec::new();
  for s in sync_soft(400.0) {
    assert!(tracker.on_symbol(s).is_none());
  }
  assert_eq!(tracker.state(), SyncState::Verifying);

  for _ in 0..PAYLOAD_SYMBOLS {
    if let Some(w) = tracker.on_symbol(500.0) {
      windows.push(w);
    }
  }
  assert_eq!(tracker.state(), SyncState::Locked);
  assert_eq!(windows.len(), 1);
  assert_eq!(windows[0].len(), PAYLOAD_SYMBOLS);
  assert!(windows[0].iter().all(|&s| s == 500.0));
  assert_eq!(tracker.frames_seen(), 1);

  // a second on-cadence frame flows through while locked
  for s in sync_soft(400.0) {
    assert!(tracker.on_symbol(s).is_none());
  }
  assert_eq!(tracker.state(), SyncState::Locked);
  for _ in 0..PAYLOAD_SYMBOLS {
    if let Some(w) = tracker.on_symbol(-500.0) {
      windows.push(w);
    }
  }
  assert_eq!(windows.len(), 2);
  assert!(windows[1].iter().all(|&s| s == -500.0));
  assert_eq!(tracker.frames_seen(), 2);
}

#[test]
fn tracker_flywheel_until_miss_limit() {
  let mut tracker = SyncTracker::new();
  for s in sync_soft(400.0) {
    tracker.on_symbol(s);
  }
  let mut windows = 0;
  for _ in 0..PAYLOAD_SYMBOLS {
    if tracker.on_symbol(500.0).is_some() {
      windows += 1;
    }
  }
  assert_eq!(tracker.state(), SyncState::Locked);

  // sync slots carry the inverted pattern: plenty of energy, no match
  for round in 0..SyncTracker::MISS_LIMIT {
    for s in sync_soft(-400.0) {
      assert!(tracker.on_symbol(s).is_none());
    }
    if round < SyncTracker::MISS_LIMIT - 1 {
      assert_eq!(tracker.state(), SyncState::Locked);
      for _ in 0..PAYLOAD_SYMBOLS {
        if tracker.on_symbol(500.0).is_some() {
          windows += 1;
        }
      }
    }
  }
  // the fifth consecutive miss drops the tracker back to hunting
  assert_eq!(tracker.state(), SyncState::Hunting);
  assert_eq!(windows as u32, SyncTracker::MISS_LIMIT);
}
