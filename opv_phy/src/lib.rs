/// HDL-aligned protocol constants shared by every stage of the pipeline
pub mod numerology;

/// common helpers: bit packing, Base-40 callsigns, the CCSDS whitener
pub mod helper;

/// forward error correction: convolutional code, interleaver, Viterbi
pub mod fec;

/// frame pipelines: on-air encode, soft-symbol decode, sync tracking
pub mod frame;

/// MSK modulator/demodulator and the 16-bit I/Q wire codec
pub mod modem;

pub use frame::{decode_frame, encode_frame, DecodedFrame, Frame};
