//! Multi-voice orchestration.
//!
//! ```text
//!    control thread                         audio thread
//!   ┌──────────────────────┐   BankCommand  ┌──────────────────────┐
//!   │ Orchestrator          │ ─────────────▶ │ VoiceBanks            │
//!   │  VoiceModel × N       │   (rtrb SPSC)  │  ResonatorBank × N    │
//!   │  load / pitch / parse │                │  drain → render       │
//!   └──────────────────────┘                └──────────────────────┘
//! ```
//!
//! All I/O, JSON parsing and transposition happen in the [`Orchestrator`].
//! What reaches a bank is a [`BankCommand`] holding finished parameters.
//!
//! [`Resonators`] is the single-threaded form: the orchestrator owns the banks
//! and applies each command immediately. [`Resonators::split`] moves the banks
//! into a [`ResonatorsRenderer`] and leaves a [`ResonatorsControl`] that sends
//! commands through a ring buffer. The renderer drains that buffer at the
//! start of every block, so a bank is never observed half-staged.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ResonatorsConfig;
use crate::dsp::bank::ResonatorBank;
use crate::dsp::resonator::{ResonatorParam, ResonatorParams};
use crate::error::{check_index, Error, IndexKind, Result};
use crate::io::control::{self, ControlMessage, CONNECTION_REPLY};
use crate::model::pitch::Pitch;
use crate::model::{Model, ModelSource};
use crate::synth::command::BankCommand;
use crate::synth::message::MessageSender;
use crate::synth::voice::{VoiceBanks, VoiceModel};

/// Where an orchestrator sends prepared bank updates.
pub trait CommandSink {
    fn submit(&mut self, cmd: BankCommand) -> Result<()>;
}

impl CommandSink for VoiceBanks {
    fn submit(&mut self, cmd: BankCommand) -> Result<()> {
        self.apply(&cmd)
    }
}

impl CommandSink for VecDeque<BankCommand> {
    fn submit(&mut self, cmd: BankCommand) -> Result<()> {
        MessageSender::push(self, cmd)
    }
}

#[cfg(feature = "rtrb")]
impl CommandSink for rtrb::Producer<BankCommand> {
    fn submit(&mut self, cmd: BankCommand) -> Result<()> {
        MessageSender::push(self, cmd)
    }
}

pub struct Orchestrator<S> {
    config: ResonatorsConfig,
    voices: Vec<VoiceModel>,
    sink: S,
    connected: bool,
    dropped: Arc<AtomicUsize>,
}

/// Single-threaded orchestrator that owns its banks.
pub type Resonators = Orchestrator<VoiceBanks>;

#[cfg(feature = "rtrb")]
pub type ResonatorsControl = Orchestrator<rtrb::Producer<BankCommand>>;

impl<S: CommandSink> Orchestrator<S> {
    /// Orchestrator for `config.voices` empty voices feeding `sink`.
    pub fn with_sink(config: ResonatorsConfig, sink: S) -> Self {
        let voices = (0..config.voices)
            .map(|i| VoiceModel::new(i, &config.bank))
            .collect();
        Self {
            config,
            voices,
            sink,
            connected: false,
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &ResonatorsConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn voices(&self) -> usize {
        self.voices.len()
    }

    pub fn voice(&self, index: usize) -> Result<&VoiceModel> {
        check_index(IndexKind::Voice, index, self.voices.len()).map(|i| &self.voices[i])
    }

    /// The model loaded at `index`, untransposed.
    pub fn model(&self, index: usize) -> Result<&Model> {
        self.voice(index)?
            .model()
            .ok_or(Error::NoModel { voice: index })
    }

    pub fn pitch(&self, index: usize) -> Result<Option<&Pitch>> {
        Ok(self.voice(index)?.pitch())
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Log and reset the number of commands the renderer could not apply
    /// since the last call.
    pub fn report_dropped(&self) -> usize {
        let dropped = self.dropped.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            warn!(dropped, "renderer dropped bank commands");
        }
        dropped
    }

    /// Load a model into voice `index` and restage its bank at the voice's
    /// pitch. On failure the voice keeps its previous model.
    pub fn load_voice(&mut self, index: usize, source: impl Into<ModelSource>) -> Result<()> {
        let mut next = self.voice(index)?.clone();
        let cmd = next.load(source.into())?;
        self.sink.submit(cmd)?;
        self.voices[index] = next;
        Ok(())
    }

    /// Retune voice `index`. The stored model is not modified.
    pub fn set_pitch(&mut self, index: usize, pitch: impl Into<Pitch>) -> Result<()> {
        let pitch = pitch.into();
        let mut next = self.voice(index)?.clone();
        let cmd = next.set_pitch(pitch).inspect_err(|e| {
            warn!(voice = index, error = %e, "could not set pitch");
        })?;
        if let Some(cmd) = cmd {
            self.sink.submit(cmd)?;
        }
        self.voices[index] = next;
        Ok(())
    }

    /// Replace one resonator of voice `index` and commit.
    ///
    /// Edits go to the bank only. Reloading the model or changing the pitch
    /// restages the bank from the model and discards them.
    pub fn set_resonator(
        &mut self,
        index: usize,
        resonator: usize,
        params: ResonatorParams,
    ) -> Result<()> {
        self.voice(index)?.check_resonator(resonator)?;
        debug!(
            voice = index,
            resonator,
            freq = params.freq,
            gain = params.gain,
            decay = params.decay,
            "set resonator"
        );
        self.sink
            .submit(BankCommand::set_resonators(index, &[resonator], &[params])?)
    }

    /// Set one parameter of one resonator. `param` is the raw selector:
    /// 0 frequency, 1 gain, 2 decay.
    pub fn set_resonator_parameter(
        &mut self,
        index: usize,
        resonator: usize,
        param: usize,
        value: f32,
    ) -> Result<()> {
        let voice = self.voice(index)?;
        let param = ResonatorParam::try_from(param).inspect_err(|e| {
            warn!(voice = index, resonator, error = %e, "parameter ignored");
        })?;
        voice.check_resonator(resonator)?;
        debug!(voice = index, resonator, ?param, value, "set resonator parameter");
        self.sink.submit(BankCommand::SetParameter {
            voice: index,
            resonator,
            param,
            value,
        })
    }

    /// Replace a group of resonators of voice `index` and commit once.
    pub fn set_resonators(
        &mut self,
        index: usize,
        indices: &[usize],
        params: &[ResonatorParams],
    ) -> Result<()> {
        let voice = self.voice(index)?;
        for &resonator in indices {
            voice.check_resonator(resonator)?;
        }
        self.sink
            .submit(BankCommand::set_resonators(index, indices, params)?)
    }

    /// Commit every voice.
    pub fn update(&mut self) -> Result<()> {
        for voice in 0..self.voices.len() {
            self.sink.submit(BankCommand::Commit { voice })?;
        }
        Ok(())
    }

    pub fn update_voice(&mut self, index: usize) -> Result<()> {
        self.voice(index)?;
        self.sink.submit(BankCommand::Commit { voice: index })
    }

    /// Excite voice `index` directly. Only amounts below
    /// [`crate::IMPULSE_THRESHOLD`] have an effect.
    pub fn strike(&mut self, index: usize, amount: f32) -> Result<()> {
        self.voice(index)?;
        self.sink.submit(BankCommand::Impulse {
            voice: index,
            amount,
        })
    }

    /// Silence voice `index` by clearing its filter memory.
    pub fn clear_voice(&mut self, index: usize) -> Result<()> {
        self.voice(index)?;
        self.sink.submit(BankCommand::Clear { voice: index })
    }

    pub fn dispatch(&mut self, msg: ControlMessage) -> Result<()> {
        match msg {
            ControlMessage::LoadModel { index, source } => self.load_voice(index, source),
            ControlMessage::SetPitch { index, pitch } => self.set_pitch(index, pitch),
            ControlMessage::SetResonator {
                index,
                resonator,
                params,
            } => self.set_resonator(index, resonator, params),
            ControlMessage::SetResonatorParameter {
                index,
                resonator,
                parameter,
                value,
            } => self.set_resonator_parameter(index, resonator, parameter, value),
            ControlMessage::Event(event) => {
                if event == CONNECTION_REPLY {
                    self.connected = true;
                    info!("control connection established");
                } else {
                    warn!(%event, "unknown control event, ignored");
                }
                Ok(())
            }
        }
    }

    /// Parse and dispatch one JSON control message.
    pub fn handle_control(&mut self, json: &str) -> Result<()> {
        self.report_dropped();
        let result = match control::parse(json) {
            Ok(Some(msg)) => self.dispatch(msg),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };
        result.inspect_err(|e| warn!(error = %e, "control message failed"))
    }
}

impl Resonators {
    pub fn new(config: ResonatorsConfig) -> Self {
        let banks = VoiceBanks::new(config.voices, config.bank, config.timing());
        let dropped = banks.drop_counter();
        Self {
            dropped,
            ..Self::with_sink(config, banks)
        }
    }

    /// Drop every voice and build `voices` fresh ones.
    pub fn configure(&mut self, voices: usize, sample_rate: f32, block_size: usize) {
        let config = ResonatorsConfig {
            voices,
            sample_rate,
            block_size,
            ..self.config
        };
        debug!(voices, sample_rate, block_size, "configure resonators");
        *self = Self::new(config);
    }

    pub fn bank(&self, index: usize) -> Result<&ResonatorBank> {
        self.sink.bank(index)
    }

    /// Current resonator parameters of voice `index`.
    pub fn resonators(&self, index: usize) -> Result<Vec<ResonatorParams>> {
        Ok(self.bank(index)?.bank())
    }

    /// Parameters of selected resonators of voice `index`.
    pub fn resonators_at(&self, index: usize, indices: &[usize]) -> Result<Vec<ResonatorParams>> {
        self.bank(index)?.resonators_at(indices)
    }

    #[inline]
    pub fn render_voice(&mut self, index: usize, excitation: f32) -> Result<f32> {
        self.sink.render_voice(index, excitation)
    }

    /// One sample per voice, index-aligned with `excitation`.
    pub fn render(&mut self, excitation: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0; excitation.len().min(self.sink.len())];
        self.sink.render_into(excitation, &mut out);
        out
    }

    #[inline]
    pub fn render_into(&mut self, excitation: &[f32], out: &mut [f32]) {
        self.sink.render_into(excitation, out);
    }

    #[inline]
    pub fn render_summed(&mut self, excitation: f32) -> f32 {
        self.sink.render_summed(excitation)
    }

    /// Move the banks to a renderer for the audio thread.
    #[cfg(feature = "rtrb")]
    pub fn split(self) -> (ResonatorsControl, ResonatorsRenderer) {
        let (tx, rx) = rtrb::RingBuffer::new(self.config.queue_capacity.max(1));
        let control = Orchestrator {
            config: self.config,
            voices: self.voices,
            sink: tx,
            connected: self.connected,
            dropped: self.dropped,
        };
        let renderer = ResonatorsRenderer {
            banks: self.sink,
            rx,
        };
        (control, renderer)
    }
}

impl Default for Resonators {
    fn default() -> Self {
        Self::new(ResonatorsConfig::default())
    }
}

/// Audio-thread half of a split [`Resonators`].
#[cfg(feature = "rtrb")]
pub struct ResonatorsRenderer {
    banks: VoiceBanks,
    rx: rtrb::Consumer<BankCommand>,
}

#[cfg(feature = "rtrb")]
impl ResonatorsRenderer {
    pub fn voices(&self) -> usize {
        self.banks.len()
    }

    pub fn bank(&self, index: usize) -> Result<&ResonatorBank> {
        self.banks.bank(index)
    }

    /// Apply pending commands. Call at block boundaries.
    pub fn drain(&mut self) -> usize {
        self.banks.drain(&mut self.rx)
    }

    #[inline]
    pub fn render_voice(&mut self, index: usize, excitation: f32) -> Result<f32> {
        self.banks.render_voice(index, excitation)
    }

    #[inline]
    pub fn render_into(&mut self, excitation: &[f32], out: &mut [f32]) {
        self.banks.render_into(excitation, out);
    }

    #[inline]
    pub fn render_summed(&mut self, excitation: f32) -> f32 {
        self.banks.render_summed(excitation)
    }

    /// Drain pending commands, then render one block with every voice
    /// driven by `excitation` and summed into `out`.
    pub fn process_block(&mut self, excitation: &[f32], out: &mut [f32]) {
        self.drain();
        for (y, &x) in out.iter_mut().zip(excitation) {
            *y = self.banks.render_summed(x);
        }
    }
}
