/// service configuration and operating modes
pub mod config;

/// the persistent demodulator child process
pub mod demod_child;

/// the modem service loops
pub mod server;

pub use config::{Mode, ServiceConfig};
pub use demod_child::DemodChild;
pub use server::{rewrite_frame, Counters};
