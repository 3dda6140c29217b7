//! Realtime DSP primitives.
//!
//! Nothing here allocates, locks or logs on the per-sample path. Banks
//! allocate their full capacity up front.

/// Two-pole resonant filter with staged/committed parameters.
pub mod resonator;
/// Fixed-capacity collection of resonators rendered and summed.
pub mod bank;

pub use bank::{BankOptions, ResonatorBank};
pub use resonator::{Resonator, ResonatorParam, ResonatorParams};
