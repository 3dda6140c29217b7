use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dsp::bank::BankOptions;
use crate::dsp::resonator::Timing;
use crate::error::{Error, Result};

/// Setup for a [`crate::synth::Resonators`] instance.
///
/// ```json
/// {
///   "voices": 4,
///   "sample_rate": 44100,
///   "block_size": 16,
///   "bank": { "total": 40, "max_size": 64, "resonator": { "out_gain": 100.0 } }
/// }
/// ```
///
/// Every field is optional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResonatorsConfig {
    pub voices: usize,
    pub sample_rate: f32,
    pub block_size: usize,
    pub bank: BankOptions,
    /// Slots in the control → render command queue.
    pub queue_capacity: usize,
}

impl Default for ResonatorsConfig {
    fn default() -> Self {
        Self {
            voices: 1,
            sample_rate: 48_000.0,
            block_size: 128,
            bank: BankOptions::default(),
            queue_capacity: 64,
        }
    }
}

impl ResonatorsConfig {
    pub fn new(voices: usize, sample_rate: f32, block_size: usize) -> Self {
        Self {
            voices,
            sample_rate,
            block_size,
            ..Default::default()
        }
    }

    pub fn timing(&self) -> Timing {
        Timing::new(self.sample_rate, self.block_size)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}
