//! Modal synthesis with banks of two-pole resonators.
//!
//! A [`model::Model`] describes a sound source as a set of decaying modes. A
//! [`dsp::bank::ResonatorBank`] renders those modes, one
//! [`dsp::resonator::Resonator`] per mode. [`synth::Resonators`] manages several
//! independent voices, each a model playing through its own bank, and takes
//! JSON control messages to reconfigure them.

pub mod config;
pub mod dsp;
pub mod error;
pub mod io;
pub mod model;
pub mod synth;

pub use config::ResonatorsConfig;
pub use error::{Error, Result};
pub use synth::Resonators;
#[cfg(feature = "rtrb")]
pub use synth::{ResonatorsControl, ResonatorsRenderer};

/// Hard ceiling on resonators per bank. Bounds the inline payload of a
/// [`synth::command::BankCommand`].
pub const MAX_BANK_SIZE: usize = 128;

/// Impulse amounts at or above this are ignored.
pub const IMPULSE_THRESHOLD: f32 = 0.1;
