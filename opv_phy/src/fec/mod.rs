mod conv;
pub use conv::{encode_frame_bits, ConvEncoder};

mod interleave;
pub use interleave::{deinterleave, deinterleave_index, interleave};

mod viterbi;
pub use viterbi::viterbi_decode;
