//! Whole-chain checks: frames modulated to I/Q, demodulated back to soft
//! symbols, sliced into payload windows and decoded.

use num_complex::Complex64;
use rand::Rng;

use opv_phy::frame::sync::{SyncState, SyncTracker, PAYLOAD_SYMBOLS};
use opv_phy::modem::{MskDemodulator, MskModulator};
use opv_phy::numerology::{FRAME_BYTES, HEADER_BYTES, SAMPLE_RATE, SYNC_BITS, SYNC_WORD};
use opv_phy::{decode_frame, encode_frame, Frame};

fn test_frame(seed: u8) -> Frame {
  let mut frame = [0; FRAME_BYTES];
  frame[..6].copy_from_slice(b"KB5MU\0");
  for (i, b) in frame[HEADER_BYTES..].iter_mut().enumerate() {
    *b = (i as u8).wrapping_add(seed);
  }
  frame
}

/// modulate frames back to back through one persistent modulator
fn modulate_frames(frames: &[Frame]) -> Vec<Complex64> {
  let mut modulator = MskModulator::new();
  let mut samples = Vec::new();
  for frame in frames {
    let encoded = encode_frame(frame);
    samples.extend(modulator.modulate_frame(&encoded).iter().map(|s| s.to_complex()));
  }
  samples
}

/// demodulate and slice the stream into decoded frames
fn receive(samples: &[Complex64], demodulator: &mut MskDemodulator) -> (Vec<Frame>, SyncState) {
  let mut soft = Vec::new();
  demodulator.demodulate(samples, &mut soft);

  let mut tracker = SyncTracker::new();
  let mut frames = Vec::new();
  for &s in &soft {
    if let Some(window) = tracker.on_symbol(s) {
      frames.push(decode_frame(&window).expect("window with energy").frame);
    }
  }
  (frames, tracker.state())
}

#[test]
fn frames_over_the_air() {
  let sent = [test_frame(0), test_frame(7), test_frame(200)];
  let samples = modulate_frames(&sent);

  let (received, state) = receive(&samples, &mut MskDemodulator::new());
  assert_eq!(received.len(), sent.len());
  for (rx, tx) in received.iter().zip(&sent) {
    assert_eq!(rx, tx);
  }
  assert_eq!(state, SyncState::Locked);
}

#[test]
fn frames_survive_mild_noise() {
  let mut rng = rand::thread_rng();
  let sent = [test_frame(3), test_frame(91)];
  let mut samples = modulate_frames(&sent);
  for s in samples.iter_mut() {
    *s += Complex64::new(rng.gen_range(-500.0..500.0), rng.gen_range(-500.0..500.0));
  }

  let (received, _) = receive(&samples, &mut MskDemodulator::new());
  assert_eq!(received.len(), sent.len());
  for (rx, tx) in received.iter().zip(&sent) {
    assert_eq!(rx, tx);
  }
}

#[test]
fn sync_word_and_zero_bits_walk_the_tracker() {
  // one bare on-air frame: the sync word followed by 2144 logical zeros
  let mut modulator = MskModulator::new();
  let mut samples: Vec<Complex64> = Vec::new();
  for i in (0..SYNC_BITS).rev() {
    let bit = ((SYNC_WORD >> i) & 1) as u8;
    samples.extend(modulator.modulate_bit(bit).iter().map(|s| s.to_complex()));
  }
  for _ in 0..PAYLOAD_SYMBOLS {
    samples.extend(modulator.modulate_bit(0).iter().map(|s| s.to_complex()));
  }

  let mut soft = Vec::new();
  MskDemodulator::new().demodulate(&samples, &mut soft);

  let mut tracker = SyncTracker::new();
  let mut windows = Vec::new();
  let mut saw_verifying = false;
  for &s in &soft {
    if let Some(window) = tracker.on_symbol(s) {
      windows.push(window);
    }
    saw_verifying |= tracker.state() == SyncState::Verifying;
  }

  assert!(saw_verifying);
  assert_eq!(tracker.state(), SyncState::Locked);
  assert_eq!(windows.len(), 1);
  assert_eq!(windows[0].len(), PAYLOAD_SYMBOLS);
  // every payload symbol was a logical 0, the upper tone
  assert!(windows[0].iter().all(|&s| s > 0.0));
}

#[test]
fn afc_acquires_and_tracks_carrier_offset() {
  const OFFSET: f64 = 750.0;

  let sent = [test_frame(1), test_frame(2)];
  let mut samples = modulate_frames(&sent);
  for (n, s) in samples.iter_mut().enumerate() {
    let rotation = std::f64::consts::TAU * OFFSET * n as f64 / SAMPLE_RATE;
    *s *= Complex64::new(rotation.cos(), rotation.sin());
  }

  let mut demodulator = MskDemodulator::new();
  let coarse = demodulator.estimate_offset(&samples);
  assert!(
    (coarse - OFFSET).abs() <= 50.0,
    "coarse estimate {} Hz off target",
    coarse
  );

  demodulator.set_freq_offset(coarse);
  let (received, _) = receive(&samples, &mut demodulator);
  assert_eq!(received.len(), sent.len());
  for (rx, tx) in received.iter().zip(&sent) {
    assert_eq!(rx, tx);
  }
  assert!(
    (demodulator.freq_offset() - OFFSET).abs() <= 25.0,
    "fine AFC settled at {} Hz",
    demodulator.freq_offset()
  );
}
