mod iq;
pub use iq::{bytes_to_samples, samples_to_bytes, IqSample};

mod modulator;
pub use modulator::MskModulator;

mod demodulator;
pub use demodulator::{hard_bit, MskDemodulator};
