use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::IMPULSE_THRESHOLD;

/*
Two-Pole Resonator
==================

One resonator models one vibrational mode of a physical object: a decaying
sinusoid at a fixed frequency. A bank of them, summed, reconstructs the sound
of a struck bar, membrane or plate.

Vocabulary
----------

  freq        Mode frequency in Hz.

  gain        How strongly the excitation drives the mode.

  decay       Exponential damping rate (per second). Larger = shorter ring.

  staged      Parameters written by the control side. Never read by render.

  committed   Coefficients computed from the staged parameters by `commit()`.

  active      The coefficient snapshot the recurrence actually uses. It is
              refreshed from `committed` after every rendered sample.


The Recurrence
--------------

    y[n] = b1 * y[n-1] + b2 * y[n-2] + a1 * x[n]

with

    w  = 2π * freq / sample_rate          pole angle
    r  = exp(-decay / sample_rate)        pole radius (decay factor)
    q  = gain * sin(w)

    a1 = q * (1 - r)
    b1 = 2 * r * cos(w)
    b2 = -r²
    a1' = q / b2                          used by `impulse()`

The poles sit at r·e^(±jw). With 0 < r ≤ 1 they are inside (or on) the unit
circle and the filter rings at `freq`, losing a factor r of amplitude per
sample.


Stability Guard
---------------

    0 < freq < nyquist_guard * sample_rate / 2
    0 < r ≤ 1

If either condition fails (or the parameters are not finite) every coefficient
is forced to zero. The resonator goes silent rather than blowing up.


Stage / Commit
--------------

    set_parameters()  ──→  staged
    commit()          ──→  committed = f(staged)
    render()          ──→  uses active, then active = committed

A commit therefore reaches the recurrence one sample late. Parameter jumps
are smoothed by that one-sample overlap instead of landing mid-computation.
The very first commit of a fresh resonator has no previous generation to
overlap with, so it becomes active immediately.


Parameter Units
---------------

  Normalized (default)  gain and decay are 0..1 controller values, mapped
                        affinely onto `ParameterRanges` at commit time
                        (gain → 0..0.3, decay → 0.05..50) and clamped.

  Physical              gain and decay are used as given.

Frequency is always in Hz.
*/

/// One mode: frequency (Hz), gain and decay.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResonatorParams {
    pub freq: f32,
    pub gain: f32,
    pub decay: f32,
}

impl ResonatorParams {
    pub const fn new(freq: f32, gain: f32, decay: f32) -> Self {
        Self { freq, gain, decay }
    }

    pub fn get(&self, param: ResonatorParam) -> f32 {
        match param {
            ResonatorParam::Frequency => self.freq,
            ResonatorParam::Gain => self.gain,
            ResonatorParam::Decay => self.decay,
        }
    }

    pub fn set(&mut self, param: ResonatorParam, value: f32) {
        match param {
            ResonatorParam::Frequency => self.freq = value,
            ResonatorParam::Gain => self.gain = value,
            ResonatorParam::Decay => self.decay = value,
        }
    }
}

/// Selector for a single resonator parameter.
///
/// Wire-level indices are 0 = frequency, 1 = gain, 2 = decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResonatorParam {
    Frequency,
    Gain,
    Decay,
}

impl ResonatorParam {
    pub const ALL: [ResonatorParam; 3] = [
        ResonatorParam::Frequency,
        ResonatorParam::Gain,
        ResonatorParam::Decay,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for ResonatorParam {
    type Error = Error;

    fn try_from(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(Error::InvalidParameterIndex(index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamUnits {
    #[default]
    Normalized,
    Physical,
}

/// Physical ranges that normalized 0..1 gain and decay map onto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterRanges {
    pub gain_min: f32,
    pub gain_max: f32,
    pub decay_min: f32,
    pub decay_max: f32,
}

impl Default for ParameterRanges {
    fn default() -> Self {
        Self {
            gain_min: 0.0,
            gain_max: 0.3,
            decay_min: 0.05,
            decay_max: 50.0,
        }
    }
}

impl ParameterRanges {
    pub fn map_gain(&self, gain: f32) -> f32 {
        map_clamped(gain, self.gain_min, self.gain_max)
    }

    pub fn map_decay(&self, decay: f32) -> f32 {
        map_clamped(decay, self.decay_min, self.decay_max)
    }
}

#[inline]
fn map_clamped(x: f32, min: f32, max: f32) -> f32 {
    let y = min + x * (max - min);
    if y < min {
        min
    } else if y > max {
        max
    } else {
        y
    }
}

/// Settings shared by every resonator in a bank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResonatorOptions {
    /// Fixed gain applied to every rendered sample.
    pub out_gain: f32,
    /// Output ceiling; samples are clamped to ±hard_limit.
    pub hard_limit: f32,
    /// Fraction of Nyquist above which a resonator is silenced.
    pub nyquist_guard: f32,
    pub units: ParamUnits,
    pub ranges: ParameterRanges,
}

impl Default for ResonatorOptions {
    fn default() -> Self {
        Self {
            out_gain: 100.0,
            hard_limit: 0.999,
            nyquist_guard: 0.955,
            units: ParamUnits::Normalized,
            ranges: ParameterRanges::default(),
        }
    }
}

impl ResonatorOptions {
    /// Staged parameters expressed in physical units.
    pub fn to_physical(&self, params: ResonatorParams) -> ResonatorParams {
        match self.units {
            ParamUnits::Physical => params,
            ParamUnits::Normalized => ResonatorParams {
                freq: params.freq,
                gain: self.ranges.map_gain(params.gain),
                decay: self.ranges.map_decay(params.decay),
            },
        }
    }
}

/// Timing constants fixed at setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub sample_rate: f32,
    pub sample_interval: f32,
    pub block_size: usize,
}

impl Timing {
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        Self {
            sample_rate,
            sample_interval: 1.0 / sample_rate,
            block_size,
        }
    }

    pub fn nyquist_limit(&self, guard: f32) -> f32 {
        guard * self.sample_rate * 0.5
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new(48_000.0, 128)
    }
}

/// Filter coefficients derived from physical parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coefficients {
    pub a1: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1_prime: f32,
}

impl Coefficients {
    pub const SILENT: Coefficients = Coefficients {
        a1: 0.0,
        b1: 0.0,
        b2: 0.0,
        a1_prime: 0.0,
    };

    /// Derive coefficients, falling back to [`Coefficients::SILENT`] outside
    /// the stable region.
    pub fn compute(params: ResonatorParams, timing: &Timing, nyquist_guard: f32) -> Self {
        let nyquist_limit = timing.nyquist_limit(nyquist_guard);
        let r = (-params.decay * timing.sample_interval).exp();
        let b2 = -r * r;

        let stable = params.freq > 0.0
            && params.freq < nyquist_limit
            && r > 0.0
            && r <= 1.0
            && b2 != 0.0
            && params.gain.is_finite();
        if !stable {
            return Self::SILENT;
        }

        let w = TAU * params.freq * timing.sample_interval;
        let q = params.gain * w.sin();

        Self {
            a1: q * (1.0 - r),
            b1: 2.0 * r * w.cos(),
            b2,
            a1_prime: q / b2,
        }
    }

    pub fn is_silent(&self) -> bool {
        *self == Self::SILENT
    }
}

pub struct Resonator {
    options: ResonatorOptions,
    timing: Timing,

    staged: ResonatorParams,
    committed: Coefficients,
    active: Coefficients,
    primed: bool,

    y1: f32, // y[n-1]
    y2: f32, // y[n-2]
}

impl Resonator {
    pub fn new(options: ResonatorOptions, timing: Timing) -> Self {
        Self {
            options,
            timing,
            staged: ResonatorParams::default(),
            committed: Coefficients::SILENT,
            active: Coefficients::SILENT,
            primed: false,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Stage and commit in one step.
    pub fn with_params(options: ResonatorOptions, timing: Timing, params: ResonatorParams) -> Self {
        let mut resonator = Self::new(options, timing);
        resonator.set_parameters(params);
        resonator.commit();
        resonator
    }

    pub fn options(&self) -> &ResonatorOptions {
        &self.options
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn set_parameters(&mut self, params: ResonatorParams) {
        self.staged = params;
    }

    pub fn parameters(&self) -> ResonatorParams {
        self.staged
    }

    pub fn set_parameter(&mut self, param: ResonatorParam, value: f32) {
        self.staged.set(param, value);
    }

    pub fn parameter(&self, param: ResonatorParam) -> f32 {
        self.staged.get(param)
    }

    /// Index-based setter for wire-level selectors. An unknown index is
    /// logged and leaves the resonator untouched.
    pub fn set_parameter_index(&mut self, index: usize, value: f32) -> Result<()> {
        let param = ResonatorParam::try_from(index).inspect_err(|_| {
            warn!(index, "set_parameter: invalid parameter requested");
        })?;
        self.set_parameter(param, value);
        Ok(())
    }

    pub fn parameter_index(&self, index: usize) -> Result<f32> {
        let param = ResonatorParam::try_from(index).inspect_err(|_| {
            warn!(index, "parameter: invalid parameter requested");
        })?;
        Ok(self.parameter(param))
    }

    /// Recompute coefficients from the staged parameters.
    pub fn commit(&mut self) {
        let physical = self.options.to_physical(self.staged);
        self.committed = Coefficients::compute(physical, &self.timing, self.options.nyquist_guard);

        if !self.primed {
            self.active = self.committed;
            self.primed = true;
        }
    }

    /// Most recently committed coefficients.
    pub fn coefficients(&self) -> Coefficients {
        self.committed
    }

    /// Coefficients the next `render()` call will use.
    pub fn active_coefficients(&self) -> Coefficients {
        self.active
    }

    #[inline]
    pub fn render(&mut self, excitation: f32) -> f32 {
        let c = self.active;
        let y = c.b1 * self.y1 + c.b2 * self.y2 + c.a1 * excitation;

        self.y2 = self.y1;
        self.y1 = y;
        self.active = self.committed;

        hard_limit(y * self.options.out_gain, self.options.hard_limit)
    }

    /// Strike the resonator by writing energy straight into filter memory.
    /// Amounts at or above [`IMPULSE_THRESHOLD`] are ignored.
    #[inline]
    pub fn impulse(&mut self, amount: f32) {
        if amount < IMPULSE_THRESHOLD {
            self.y2 += self.committed.a1_prime * amount;
        }
    }

    /// Zero the filter memory.
    pub fn clear(&mut self) {
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

#[inline]
pub(crate) fn hard_limit(x: f32, ceiling: f32) -> f32 {
    x.max(-ceiling).min(ceiling)
}
