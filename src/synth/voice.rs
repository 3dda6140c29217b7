use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dsp::bank::{BankOptions, ResonatorBank};
use crate::dsp::resonator::{ResonatorParams, Timing};
use crate::error::{check_index, IndexKind, Result};
use crate::model::pitch::Pitch;
use crate::model::{Model, ModelSource};
use crate::synth::command::BankCommand;

/// Control-side half of a voice: where its model came from, the model
/// itself and the pitch it should sound at.
///
/// The stored model keeps its own fundamental. A pitch only changes the
/// parameters that get materialized into the bank.
#[derive(Debug, Clone)]
pub struct VoiceModel {
    index: usize,
    source: Option<PathBuf>,
    model: Option<Model>,
    pitch: Option<Pitch>,
    max_size: usize,
    total: usize,
}

impl VoiceModel {
    pub fn new(index: usize, options: &BankOptions) -> Self {
        let max_size = options.max_size.min(crate::MAX_BANK_SIZE);
        Self {
            index,
            source: None,
            model: None,
            pitch: None,
            max_size,
            total: options.total.min(max_size),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn pitch(&self) -> Option<&Pitch> {
        self.pitch.as_ref()
    }

    /// Resonators the bank holds after the last materialization.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub(crate) fn check_resonator(&self, resonator: usize) -> Result<usize> {
        check_index(IndexKind::Resonator, resonator, self.total)
    }

    /// Load a model and prepare the bank update for it. Nothing changes if
    /// loading or transposing fails.
    pub fn load(&mut self, source: ModelSource) -> Result<BankCommand> {
        let path = source.path().map(Path::to_path_buf);
        let model = source.resolve()?;
        let params = Self::materialize(&model, self.pitch.as_ref())?;

        if model.len() > self.max_size {
            warn!(
                voice = self.index,
                model = %model.name(),
                resonators = model.len(),
                max_size = self.max_size,
                "model larger than bank, extra resonators dropped"
            );
        }
        info!(
            voice = self.index,
            model = %model.name(),
            resonators = model.len(),
            "loaded model at voice"
        );

        let cmd = self.stage(&params);
        self.model = Some(model);
        self.source = path;
        Ok(cmd)
    }

    /// Remember `pitch` and, if a model is loaded, prepare the transposed
    /// bank update.
    pub fn set_pitch(&mut self, pitch: Pitch) -> Result<Option<BankCommand>> {
        let cmd = match &self.model {
            Some(model) => {
                let params = Self::materialize(model, Some(&pitch))?;
                Some(self.stage(&params))
            }
            None => {
                pitch.frequency()?;
                None
            }
        };
        debug!(voice = self.index, pitch = %pitch, "set pitch");
        self.pitch = Some(pitch);
        Ok(cmd)
    }

    fn materialize(model: &Model, pitch: Option<&Pitch>) -> Result<Vec<ResonatorParams>> {
        match pitch {
            Some(pitch) => model.shifted_to_pitch(pitch),
            None => Ok(model.params().to_vec()),
        }
    }

    fn stage(&mut self, params: &[ResonatorParams]) -> BankCommand {
        let cmd = BankCommand::stage(self.index, params, self.max_size);
        if let BankCommand::Stage { params, .. } = &cmd {
            self.total = params.len();
        }
        cmd
    }
}

/// Render-side half of every voice: one bank per voice.
///
/// Commands that fail to apply are counted, never logged. The count is shared
/// with the control side through [`VoiceBanks::drop_counter`].
pub struct VoiceBanks {
    banks: Vec<ResonatorBank>,
    dropped: Arc<AtomicUsize>,
}

impl VoiceBanks {
    pub fn new(voices: usize, options: BankOptions, timing: Timing) -> Self {
        Self {
            banks: (0..voices)
                .map(|_| ResonatorBank::new(options, timing))
                .collect(),
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    pub fn bank(&self, voice: usize) -> Result<&ResonatorBank> {
        check_index(IndexKind::Voice, voice, self.banks.len()).map(|i| &self.banks[i])
    }

    pub fn bank_mut(&mut self, voice: usize) -> Result<&mut ResonatorBank> {
        check_index(IndexKind::Voice, voice, self.banks.len()).map(|i| &mut self.banks[i])
    }

    pub fn drop_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.dropped)
    }

    /// Commands dropped by [`VoiceBanks::drain`] and not yet reported.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn apply(&mut self, cmd: &BankCommand) -> Result<()> {
        cmd.apply(self.bank_mut(cmd.voice())?)
    }

    /// Apply every queued command. Failures are counted and skipped.
    pub fn drain<R>(&mut self, rx: &mut R) -> usize
    where
        R: crate::synth::message::MessageReceiver<BankCommand>,
    {
        let mut applied = 0;
        while let Some(cmd) = rx.pop() {
            match self.apply(&cmd) {
                Ok(()) => applied += 1,
                Err(_) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        applied
    }

    pub fn commit(&mut self) {
        for bank in &mut self.banks {
            bank.commit();
        }
    }

    #[inline]
    pub fn render_voice(&mut self, voice: usize, excitation: f32) -> Result<f32> {
        Ok(self.bank_mut(voice)?.render(excitation))
    }

    /// Render each voice with its own excitation, index-aligned. Only the
    /// common prefix of `inputs`, `outputs` and the voices is processed.
    #[inline]
    pub fn render_into(&mut self, inputs: &[f32], outputs: &mut [f32]) {
        for ((bank, &x), y) in self.banks.iter_mut().zip(inputs).zip(outputs.iter_mut()) {
            *y = bank.render(x);
        }
    }

    /// Drive every voice with the same excitation and sum.
    #[inline]
    pub fn render_summed(&mut self, excitation: f32) -> f32 {
        self.banks.iter_mut().map(|b| b.render(excitation)).sum()
    }
}
