use log::debug;

use crate::numerology::{ENCODED_BITS, FRAME_SYMBOLS, SYNC_BITS, SYNC_WORD};

/// soft symbols collected per emitted payload window
pub const PAYLOAD_SYMBOLS: usize = ENCODED_BITS;

/// data carrier state, as reported by [`SyncTracker::state`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
  Hunting,
  Verifying,
  Locked,
}

/// per-variant tracker data; the in-progress payload window is owned by
/// the variant that is collecting it
enum State {
  Hunting,
  Verifying {
    pending: Vec<f64>,
  },
  Locked {
    pending: Vec<f64>,
    /// symbols elapsed since the last sync event; the next sync word
    /// ends exactly [`FRAME_SYMBOLS`] symbols after the previous one
    since_sync: usize,
    misses: u32,
  },
}

/// Sync-word detection and frame cadence tracker.
///
/// Feed one soft symbol at a time through [`SyncTracker::on_symbol`];
/// whenever a full 2144-symbol payload window is assembled it is handed
/// back for frame decoding.  Detection correlates the 24 newest soft
/// symbols against the ±1 expansion of the sync word; while LOCKED the
/// tracker flywheels over up to [`SyncTracker::MISS_LIMIT`] missed sync
/// checks before hunting again.
pub struct SyncTracker {
  state: State,
  ring: [f64; SYNC_BITS],
  ring_idx: usize,
  pattern: [f64; SYNC_BITS],
  symbols: u64,
  frames: u64,
  quality: f64,
}

impl SyncTracker {
  /// normalized correlation required to leave HUNTING
  pub const HUNT_NORM: f64 = 0.85;
  /// raw correlation required to leave HUNTING (signal-present guard)
  pub const HUNT_RAW: f64 = 5000.0;
  /// normalized correlation that counts as a hit while LOCKED
  pub const LOCK_NORM: f64 = 0.40;
  /// correlation energy floor below which the normalized value is unusable
  pub const ENERGY_MIN: f64 = 100.0;
  /// consecutive missed sync checks tolerated before lock is declared lost
  pub const MISS_LIMIT: u32 = 5;

  pub fn new() -> Self {
    // bit 1 rides the lower tone and yields a negative soft symbol
    let mut pattern = [0.0; SYNC_BITS];
    for (i, p) in pattern.iter_mut().enumerate() {
      let bit = (SYNC_WORD >> (SYNC_BITS - 1 - i)) & 1;
      *p = if bit == 1 { -1.0 } else { 1.0 };
    }
    Self {
      state: State::Hunting,
      ring: [0.0; SYNC_BITS],
      ring_idx: 0,
      pattern,
      symbols: 0,
      frames: 0,
      quality: 0.0,
    }
  }

  /// Consume one soft symbol; returns a complete payload window when one
  /// is assembled.  A window completion on the same symbol as a sync
  /// check is emitted before the check advances the state.
  pub fn on_symbol(&mut self, soft: f64) -> Option<Vec<f64>> {
    self.ring[self.ring_idx] = soft;
    self.ring_idx = (self.ring_idx + 1) % SYNC_BITS;
    self.symbols += 1;

    let (next, window) = match std::mem::replace(&mut self.state, State::Hunting) {
      State::Hunting => self.hunt(),
      State::Verifying { pending } => self.verify(soft, pending),
      State::Locked {
        pending,
        since_sync,
        misses,
      } => self.flywheel(soft, pending, since_sync, misses),
    };
    self.state = next;
    window
  }

  fn hunt(&mut self) -> (State, Option<Vec<f64>>) {
    if self.symbols < SYNC_BITS as u64 {
      return (State::Hunting, None);
    }
    let (raw, norm) = self.correlate();
    if raw >= Self::HUNT_RAW && norm >= Self::HUNT_NORM {
      debug!("[{}] HUNTING -> VERIFYING (corr={:.3}, raw={:.0})", self.symbols, norm, raw);
      self.quality = norm;
      (
        State::Verifying {
          pending: Vec::with_capacity(PAYLOAD_SYMBOLS),
        },
        None,
      )
    } else {
      (State::Hunting, None)
    }
  }

  fn verify(&mut self, soft: f64, mut pending: Vec<f64>) -> (State, Option<Vec<f64>>) {
    pending.push(soft);
    if pending.len() < PAYLOAD_SYMBOLS {
      return (State::Verifying { pending }, None);
    }
    self.frames += 1;
    debug!("[{}] VERIFYING -> LOCKED (frame {})", self.symbols, self.frames);
    (
      State::Locked {
        pending: Vec::with_capacity(PAYLOAD_SYMBOLS),
        since_sync: PAYLOAD_SYMBOLS,
        misses: 0,
      },
      Some(pending),
    )
  }

  fn flywheel(&mut self, soft: f64, mut pending: Vec<f64>, since_sync: usize, misses: u32) -> (State, Option<Vec<f64>>) {
    let since_sync = since_sync + 1;

    // symbols 1..=2144 after a sync event are payload; the remaining 24
    // are the next frame's sync word, left to the correlation ring
    let mut window = None;
    if since_sync <= PAYLOAD_SYMBOLS {
      pending.push(soft);
      if pending.len() == PAYLOAD_SYMBOLS {
        self.frames += 1;
        window = Some(std::mem::replace(&mut pending, Vec::with_capacity(PAYLOAD_SYMBOLS)));
      }
    }

    if since_sync < FRAME_SYMBOLS {
      return (
        State::Locked {
          pending,
          since_sync,
          misses,
        },
        window,
      );
    }

    let (_, norm) = self.correlate();
    if norm >= Self::LOCK_NORM {
      debug!("[{}] LOCKED: sync OK (corr={:.3})", self.symbols, norm);
      self.quality = norm;
      return (
        State::Locked {
          pending,
          since_sync: 0,
          misses: 0,
        },
        window,
      );
    }

    let misses = misses + 1;
    debug!("[{}] LOCKED: sync MISS #{} (corr={:.3})", self.symbols, misses, norm);
    if misses >= Self::MISS_LIMIT {
      // partial pending data is dropped on the way out
      debug!("[{}] LOCKED -> HUNTING (lost lock)", self.symbols);
      return (State::Hunting, window);
    }
    self.quality = norm;
    (
      State::Locked {
        pending,
        since_sync: 0,
        misses,
      },
      window,
    )
  }

  /// raw and normalized correlation of the 24 newest soft symbols,
  /// oldest first, against the sync pattern
  fn correlate(&self) -> (f64, f64) {
    let mut sum = 0.0;
    let mut energy = 0.0;
    for (i, &expected) in self.pattern.iter().enumerate() {
      let soft = self.ring[(self.ring_idx + i) % SYNC_BITS];
      sum += soft * expected;
      energy += soft.abs();
    }
    let norm = if energy < Self::ENERGY_MIN { 0.0 } else { sum / energy };
    (sum, norm)
  }

  /// raw and normalized sync correlation over the 24 newest soft
  /// symbols, for diagnostics
  pub fn correlation(&self) -> (f64, f64) {
    self.correlate()
  }

  /// current carrier-detect state
  pub fn state(&self) -> SyncState {
    match self.state {
      State::Hunting => SyncState::Hunting,
      State::Verifying { .. } => SyncState::Verifying,
      State::Locked { .. } => SyncState::Locked,
    }
  }

  /// normalized correlation of the most recent accepted sync
  pub fn last_quality(&self) -> f64 {
    self.quality
  }

  /// payload windows emitted so far
  pub fn frames_seen(&self) -> u64 {
    self.frames
  }
}

impl Default for SyncTracker {
  fn default() -> Self {
    Self::new()
  }
}
