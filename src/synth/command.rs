//! Prepared bank updates.
//!
//! A [`BankCommand`] is built on the control side (where loading, parsing and
//! transposition happen) and applied on the render side. Payloads live
//! inline in fixed-capacity arrays, so moving a command through a ring
//! buffer and applying it never touches the allocator.

use arrayvec::ArrayVec;

use crate::dsp::bank::ResonatorBank;
use crate::dsp::resonator::{ResonatorParam, ResonatorParams};
use crate::error::{Error, Result};
use crate::MAX_BANK_SIZE;

pub type ParamBlock = ArrayVec<ResonatorParams, MAX_BANK_SIZE>;
pub type IndexBlock = ArrayVec<usize, MAX_BANK_SIZE>;

#[derive(Debug, Clone, PartialEq)]
pub enum BankCommand {
    /// Resize the bank to `params.len()`, stage every slot, commit.
    Stage { voice: usize, params: ParamBlock },
    /// Stage a group of slots, commit.
    SetResonators {
        voice: usize,
        indices: IndexBlock,
        params: ParamBlock,
    },
    /// Stage one parameter of one slot, commit.
    SetParameter {
        voice: usize,
        resonator: usize,
        param: ResonatorParam,
        value: f32,
    },
    Commit { voice: usize },
    Impulse { voice: usize, amount: f32 },
    Clear { voice: usize },
}

impl BankCommand {
    /// Stage command for the first `limit` entries of `params`.
    pub fn stage(voice: usize, params: &[ResonatorParams], limit: usize) -> Self {
        let n = params.len().min(limit).min(MAX_BANK_SIZE);
        BankCommand::Stage {
            voice,
            params: params[..n].iter().copied().collect(),
        }
    }

    pub fn set_resonators(
        voice: usize,
        indices: &[usize],
        params: &[ResonatorParams],
    ) -> Result<Self> {
        if indices.len() != params.len() {
            return Err(Error::BankSizeMismatch {
                expected: indices.len(),
                actual: params.len(),
            });
        }
        if indices.len() > MAX_BANK_SIZE {
            return Err(Error::BankSizeMismatch {
                expected: MAX_BANK_SIZE,
                actual: indices.len(),
            });
        }
        Ok(BankCommand::SetResonators {
            voice,
            indices: indices.iter().copied().collect(),
            params: params.iter().copied().collect(),
        })
    }

    pub fn voice(&self) -> usize {
        match *self {
            BankCommand::Stage { voice, .. }
            | BankCommand::SetResonators { voice, .. }
            | BankCommand::SetParameter { voice, .. }
            | BankCommand::Commit { voice }
            | BankCommand::Impulse { voice, .. }
            | BankCommand::Clear { voice } => voice,
        }
    }

    /// Apply to the bank owned by `self.voice()`.
    pub fn apply(&self, bank: &mut ResonatorBank) -> Result<()> {
        match self {
            BankCommand::Stage { params, .. } => {
                if !bank.resize(params.len()) {
                    return Err(Error::BankSizeMismatch {
                        expected: bank.max_size(),
                        actual: params.len(),
                    });
                }
                bank.set_bank(params)?;
                bank.commit();
            }
            BankCommand::SetResonators {
                indices, params, ..
            } => {
                bank.set_resonators(indices, params)?;
                bank.commit();
            }
            BankCommand::SetParameter {
                resonator,
                param,
                value,
                ..
            } => {
                bank.set_resonator_parameter(*resonator, *param, *value)?;
                bank.commit();
            }
            BankCommand::Commit { .. } => bank.commit(),
            BankCommand::Impulse { amount, .. } => bank.impulse(*amount),
            BankCommand::Clear { .. } => bank.clear(),
        }
        Ok(())
    }
}
