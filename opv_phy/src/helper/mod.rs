mod bytes_bits;
pub use bytes_bits::{bits_to_bytes_msb, bytes_to_bits_msb};

mod base40;
pub use base40::{decode_callsign, encode_callsign, Base40Error};

mod lfsr;
pub use lfsr::{randomize, Lfsr};
