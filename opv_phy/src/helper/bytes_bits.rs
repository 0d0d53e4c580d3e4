/// bytes to unpacked bits, MSB of each byte first (the on-air order).
pub fn bytes_to_bits_msb(bytes: &[u8]) -> Vec<u8> {
  let mut bits = Vec::with_capacity(bytes.len() * 8);
  bytes
    .iter()
    .for_each(|byte| (0..8).rev().for_each(|i| bits.push((byte >> i) & 1)));
  bits
}

/// the reverse process of [`bytes_to_bits_msb`].
/// Panic if the bit count is not a multiple of 8.
pub fn bits_to_bytes_msb(bits: &[u8]) -> Vec<u8> {
  assert_eq!(bits.len() % 8, 0);
  let mut bytes = Vec::with_capacity(bits.len() / 8);
  bits
    .chunks_exact(8)
    .for_each(|bits| bytes.push(bits.iter().fold(0, |s, bit| (s << 1) | bit)));
  bytes
}
