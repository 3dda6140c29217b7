use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dsp::resonator::{
    hard_limit, Resonator, ResonatorOptions, ResonatorParam, ResonatorParams, Timing,
};
use crate::error::{check_index, Error, IndexKind, Result};
use crate::MAX_BANK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankOptions {
    /// Resonators rendered after setup.
    pub total: usize,
    /// Capacity allocated up front; `total` can never exceed it.
    pub max_size: usize,
    pub resonator: ResonatorOptions,
}

impl Default for BankOptions {
    fn default() -> Self {
        Self {
            total: 40,
            max_size: 40,
            resonator: ResonatorOptions::default(),
        }
    }
}

/// A bank's parameters split into one column per parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BankColumns {
    pub freqs: Vec<f32>,
    pub gains: Vec<f32>,
    pub decays: Vec<f32>,
}

/// Fixed-capacity set of resonators driven by one excitation and summed.
///
/// All `max_size` resonators are allocated at setup, so `resize` never
/// allocates. Indices are checked against `total`, not capacity.
pub struct ResonatorBank {
    options: BankOptions,
    timing: Timing,
    resonators: Vec<Resonator>,
    total: usize,
}

impl ResonatorBank {
    pub fn new(options: BankOptions, timing: Timing) -> Self {
        let mut bank = Self {
            options,
            timing,
            resonators: Vec::new(),
            total: 0,
        };
        bank.configure(options, timing);
        bank
    }

    /// (Re)allocate the bank. Discards all staged parameters and filter state.
    pub fn configure(&mut self, mut options: BankOptions, timing: Timing) {
        if options.max_size > MAX_BANK_SIZE {
            warn!(
                requested = options.max_size,
                limit = MAX_BANK_SIZE,
                "bank max_size capped"
            );
            options.max_size = MAX_BANK_SIZE;
        }
        options.total = options.total.min(options.max_size);

        debug!(total = options.total, max_size = options.max_size, "initialising resonator bank");

        self.resonators = (0..options.max_size)
            .map(|_| Resonator::new(options.resonator, timing))
            .collect();
        self.total = options.total;
        self.options = options;
        self.timing = timing;
    }

    pub fn options(&self) -> &BankOptions {
        &self.options
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn max_size(&self) -> usize {
        self.options.max_size
    }

    /// Change how many resonators are active. Requests above `max_size`
    /// are ignored; returns whether the new size was accepted.
    pub fn resize(&mut self, total: usize) -> bool {
        if total > self.options.max_size {
            debug!(total, max_size = self.options.max_size, "resize rejected");
            return false;
        }
        self.total = total;
        self.options.total = total;
        true
    }

    fn slot(&self, index: usize) -> Result<&Resonator> {
        check_index(IndexKind::Resonator, index, self.total).map(|i| &self.resonators[i])
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut Resonator> {
        check_index(IndexKind::Resonator, index, self.total).map(|i| &mut self.resonators[i])
    }

    pub fn get(&self, index: usize) -> Option<&Resonator> {
        self.slot(index).ok()
    }

    pub fn set_resonator(&mut self, index: usize, params: ResonatorParams) -> Result<()> {
        self.slot_mut(index)?.set_parameters(params);
        Ok(())
    }

    pub fn resonator(&self, index: usize) -> Result<ResonatorParams> {
        Ok(self.slot(index)?.parameters())
    }

    pub fn set_resonator_parameter(
        &mut self,
        index: usize,
        param: ResonatorParam,
        value: f32,
    ) -> Result<()> {
        self.slot_mut(index)?.set_parameter(param, value);
        Ok(())
    }

    pub fn resonator_parameter(&self, index: usize, param: ResonatorParam) -> Result<f32> {
        Ok(self.slot(index)?.parameter(param))
    }

    /// Wire-level variant taking a raw parameter selector.
    pub fn set_resonator_parameter_index(
        &mut self,
        index: usize,
        param_index: usize,
        value: f32,
    ) -> Result<()> {
        self.slot_mut(index)?.set_parameter_index(param_index, value)
    }

    /// Stage an arbitrary group of slots. Nothing is written unless every
    /// index is valid.
    pub fn set_resonators(&mut self, indices: &[usize], params: &[ResonatorParams]) -> Result<()> {
        if indices.len() != params.len() {
            return Err(Error::BankSizeMismatch {
                expected: indices.len(),
                actual: params.len(),
            });
        }
        for &index in indices {
            check_index(IndexKind::Resonator, index, self.total)?;
        }
        for (&index, &p) in indices.iter().zip(params) {
            self.resonators[index].set_parameters(p);
        }
        Ok(())
    }

    /// Read a group of slots. Fails on the first invalid index.
    pub fn resonators_at(&self, indices: &[usize]) -> Result<Vec<ResonatorParams>> {
        indices.iter().map(|&i| self.resonator(i)).collect()
    }

    /// Stage every active slot in index order.
    pub fn set_bank(&mut self, params: &[ResonatorParams]) -> Result<()> {
        if params.len() != self.total {
            return Err(Error::BankSizeMismatch {
                expected: self.total,
                actual: params.len(),
            });
        }
        for (res, &p) in self.resonators.iter_mut().zip(params) {
            res.set_parameters(p);
        }
        Ok(())
    }

    pub fn bank(&self) -> Vec<ResonatorParams> {
        self.active().iter().map(Resonator::parameters).collect()
    }

    pub fn frequencies(&self) -> Vec<f32> {
        self.column(ResonatorParam::Frequency)
    }

    pub fn gains(&self) -> Vec<f32> {
        self.column(ResonatorParam::Gain)
    }

    pub fn decays(&self) -> Vec<f32> {
        self.column(ResonatorParam::Decay)
    }

    pub fn columns(&self) -> BankColumns {
        BankColumns {
            freqs: self.frequencies(),
            gains: self.gains(),
            decays: self.decays(),
        }
    }

    fn column(&self, param: ResonatorParam) -> Vec<f32> {
        self.active().iter().map(|r| r.parameter(param)).collect()
    }

    fn active(&self) -> &[Resonator] {
        &self.resonators[..self.total]
    }

    /// Commit every active resonator, in index order.
    pub fn commit(&mut self) {
        for res in &mut self.resonators[..self.total] {
            res.commit();
        }
    }

    #[inline]
    pub fn render(&mut self, excitation: f32) -> f32 {
        let mut out = 0.0;
        for res in &mut self.resonators[..self.total] {
            out += res.render(excitation);
        }
        hard_limit(out, self.options.resonator.hard_limit)
    }

    pub fn render_resonator(&mut self, index: usize, excitation: f32) -> Result<f32> {
        Ok(self.slot_mut(index)?.render(excitation))
    }

    /// Strike every active resonator.
    pub fn impulse(&mut self, amount: f32) {
        for res in &mut self.resonators[..self.total] {
            res.impulse(amount);
        }
    }

    pub fn clear(&mut self) {
        for res in &mut self.resonators {
            res.clear();
        }
    }
}
