//! Protocol constants matching the FPGA reference implementation.
//! Everything on the air or on the wire derives from these values.

/// bytes in one protocol frame before FEC (header + payload)
pub const FRAME_BYTES: usize = 134;
/// unpacked bits in one frame
pub const FRAME_BITS: usize = FRAME_BYTES * 8;
/// bits after rate-1/2 convolutional encoding
pub const ENCODED_BITS: usize = FRAME_BITS * 2;

/// frame header bytes: station id, token, reserved
pub const HEADER_BYTES: usize = 12;
/// opaque payload bytes following the header
pub const PAYLOAD_BYTES: usize = 122;
/// Base-40 station id bytes at the start of the header
pub const STATION_ID_BYTES: usize = 6;

/// 24-bit sync word, transmitted MSB first
pub const SYNC_WORD: u32 = 0x02B8DB;
/// bits in the sync word
pub const SYNC_BITS: usize = 24;
/// symbols in one on-air frame: sync word plus encoded payload
pub const FRAME_SYMBOLS: usize = SYNC_BITS + ENCODED_BITS;

/// row count of the block interleaver
pub const INTERLEAVER_ROWS: usize = 67;
/// column count of the block interleaver
pub const INTERLEAVER_COLS: usize = 32;

/// I/Q samples per MSK symbol
pub const SAMPLES_PER_SYMBOL: usize = 40;
/// baseband sample rate in samples per second
pub const SAMPLE_RATE: f64 = 2_168_000.0;
/// symbol rate in symbols per second
pub const SYMBOL_RATE: f64 = SAMPLE_RATE / SAMPLES_PER_SYMBOL as f64;
/// MSK tone deviation in Hz: the lower tone carries bit 1, the upper bit 0
pub const FREQ_DEV: f64 = 13_550.0;

/// nominal full-scale amplitude of the 16-bit I/Q wire format
pub const IQ_FULL_SCALE: i16 = 16383;

/// convolutional generator G1 (171 octal under the HDL bit indexing)
pub const G1_MASK: u8 = 0x4F;
/// convolutional generator G2 (133 octal under the HDL bit indexing)
pub const G2_MASK: u8 = 0x6D;
/// trellis states of the K=7 code
pub const NUM_STATES: usize = 64;
/// ceiling of the Viterbi soft-symbol quantizer
pub const SOFT_MAX: i32 = 7;

const _: () = assert!(INTERLEAVER_ROWS * INTERLEAVER_COLS == ENCODED_BITS);
const _: () = assert!(HEADER_BYTES + PAYLOAD_BYTES == FRAME_BYTES);
const _: () = assert!(STATION_ID_BYTES < HEADER_BYTES);
