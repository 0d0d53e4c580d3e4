use num_complex::Complex64;

/// one baseband sample in the 16-bit interleaved wire format, I then Q,
/// both little-endian
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IqSample {
  pub i: i16,
  pub q: i16,
}

impl IqSample {
  /// bytes per sample on the wire
  pub const WIRE_BYTES: usize = 4;

  pub fn to_le_bytes(self) -> [u8; 4] {
    let [i0, i1] = self.i.to_le_bytes();
    let [q0, q1] = self.q.to_le_bytes();
    [i0, i1, q0, q1]
  }

  pub fn from_le_bytes(bytes: [u8; 4]) -> Self {
    Self {
      i: i16::from_le_bytes([bytes[0], bytes[1]]),
      q: i16::from_le_bytes([bytes[2], bytes[3]]),
    }
  }

  /// complex view used by the demodulator
  pub fn to_complex(self) -> Complex64 {
    Complex64::new(self.i as f64, self.q as f64)
  }
}

/// pack samples into the interleaved little-endian wire layout
pub fn samples_to_bytes(samples: &[IqSample]) -> Vec<u8> {
  let mut bytes = Vec::with_capacity(samples.len() * IqSample::WIRE_BYTES);
  samples.iter().for_each(|s| bytes.extend(s.to_le_bytes()));
  bytes
}

/// the reverse process of [`samples_to_bytes`].
/// Panic if the byte count is not whole samples.
pub fn bytes_to_samples(bytes: &[u8]) -> Vec<IqSample> {
  assert_eq!(bytes.len() % IqSample::WIRE_BYTES, 0);
  bytes
    .chunks_exact(IqSample::WIRE_BYTES)
    .map(|c| IqSample::from_le_bytes([c[0], c[1], c[2], c[3]]))
    .collect()
}
