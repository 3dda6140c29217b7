//! Models: named sets of resonator parameters with a reference fundamental.
//!
//! A model describes one physical sound source. Transposing it scales every
//! mode frequency by the same ratio, so inharmonic relationships between
//! modes survive the pitch change.
//!
//! Two families of transposition exist:
//! - `shift_*` rewrites the model in place (and its fundamental).
//! - `shifted_*` returns transposed parameters and leaves the model alone.
//!
//! Both families reduce to a single target frequency first, then apply
//! `target / fundamental` to every mode.

pub mod pitch;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dsp::resonator::ResonatorParams;
use crate::error::{Error, Result};

use self::pitch::{frequency_to_midi, frequency_to_note_name, midi_to_frequency, Pitch};

/// Accepted value ranges for model files. Out-of-range values are clamped.
pub const FREQ_RANGE: (f32, f32) = (1.0, 20_000.0);
pub const GAIN_RANGE: (f32, f32) = (0.0001, 0.9999);
pub const DECAY_RANGE: (f32, f32) = (0.0001, 0.9999);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    pub fundamental: f32,
    pub resonators: usize,
}

/// On-disk model format.
///
/// ```json
/// {
///   "metadata": { "name": "marimba", "fundamental": 220, "resonators": 2 },
///   "resonators": [
///     { "freq": 220, "gain": 0.8, "decay": 0.3 },
///     { "freq": 880, "gain": 0.4, "decay": 0.6 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    pub metadata: ModelMetadata,
    pub resonators: Vec<ResonatorParams>,
}

impl ModelDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub(crate) fn constrain(p: ResonatorParams) -> ResonatorParams {
    ResonatorParams {
        freq: p.freq.clamp(FREQ_RANGE.0, FREQ_RANGE.1),
        gain: p.gain.clamp(GAIN_RANGE.0, GAIN_RANGE.1),
        decay: p.decay.clamp(DECAY_RANGE.0, DECAY_RANGE.1),
    }
}

/// Where a model comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    Path(PathBuf),
    Document(ModelDocument),
    Model(Model),
}

impl ModelSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ModelSource::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Read and parse the source. Performs I/O for file sources.
    pub fn resolve(self) -> Result<Model> {
        match self {
            ModelSource::Path(path) => Model::from_path(&path).inspect_err(|e| {
                warn!(path = %path.display(), error = %e, "could not load model");
            }),
            ModelSource::Document(doc) => Ok(Model::from_document(doc)),
            ModelSource::Model(model) => Ok(model),
        }
    }
}

impl From<PathBuf> for ModelSource {
    fn from(path: PathBuf) -> Self {
        ModelSource::Path(path)
    }
}

impl From<&Path> for ModelSource {
    fn from(path: &Path) -> Self {
        ModelSource::Path(path.to_path_buf())
    }
}

impl From<&str> for ModelSource {
    fn from(path: &str) -> Self {
        ModelSource::Path(PathBuf::from(path))
    }
}

impl From<ModelDocument> for ModelSource {
    fn from(doc: ModelDocument) -> Self {
        ModelSource::Document(doc)
    }
}

impl From<Model> for ModelSource {
    fn from(model: Model) -> Self {
        ModelSource::Model(model)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    name: String,
    fundamental: f32,
    params: Vec<ResonatorParams>,
}

impl Model {
    pub fn new(name: impl Into<String>, fundamental: f32, params: Vec<ResonatorParams>) -> Self {
        Self {
            name: name.into(),
            fundamental,
            params,
        }
    }

    /// Build a model from a parsed document, clamping every value into the
    /// accepted ranges.
    pub fn from_document(doc: ModelDocument) -> Self {
        if doc.metadata.resonators != doc.resonators.len() {
            warn!(
                name = %doc.metadata.name,
                declared = doc.metadata.resonators,
                found = doc.resonators.len(),
                "resonator count mismatch, using resonator list"
            );
        }
        Self {
            name: doc.metadata.name,
            fundamental: doc.metadata.fundamental,
            params: doc.resonators.into_iter().map(constrain).collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        ModelDocument::from_json(json).map(Self::from_document)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        ModelDocument::from_path(path).map(Self::from_document)
    }

    /// Replace this model with the one stored at `path`. On failure the
    /// model is left as it was.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let model = Self::from_path(path).inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "could not load model");
        })?;
        self.replace(model);
        Ok(())
    }

    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let model = Self::from_json(json)?;
        self.replace(model);
        Ok(())
    }

    pub fn load_document(&mut self, doc: ModelDocument) {
        self.replace(Self::from_document(doc));
    }

    fn replace(&mut self, model: Model) {
        *self = model;
        info!(
            name = %self.name,
            fundamental = self.fundamental,
            resonators = self.params.len(),
            "loaded model"
        );
        debug!("\n{}", self);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fundamental(&self) -> f32 {
        self.fundamental
    }

    /// Synonym for [`Model::fundamental`].
    pub fn f0(&self) -> f32 {
        self.fundamental
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> &[ResonatorParams] {
        &self.params
    }

    pub fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            name: self.name.clone(),
            fundamental: self.fundamental,
            resonators: self.params.len(),
        }
    }

    pub fn to_document(&self) -> ModelDocument {
        ModelDocument {
            metadata: self.metadata(),
            resonators: self.params.clone(),
        }
    }

    fn ratio_to(&self, target: f32) -> Result<f32> {
        if !(target > 0.0 && target.is_finite()) {
            return Err(Error::InvalidFrequency(target));
        }
        if !(self.fundamental > 0.0 && self.fundamental.is_finite()) {
            return Err(Error::InvalidFrequency(self.fundamental));
        }
        Ok(target / self.fundamental)
    }

    fn log_target(&self, target: f32, in_place: bool) {
        debug!(
            model = %self.name,
            note = frequency_to_note_name(target).unwrap_or("-"),
            midi = frequency_to_midi(target),
            freq = target,
            in_place,
            "transposing model"
        );
    }

    // ---- in place ----

    pub fn shift_to_frequency(&mut self, target: f32) -> Result<()> {
        let ratio = self.ratio_to(target)?;
        self.log_target(target, true);
        for p in &mut self.params {
            p.freq *= ratio;
        }
        self.fundamental = target;
        Ok(())
    }

    /// Move the fundamental by `delta` Hz (may be negative).
    pub fn shift_by_frequency(&mut self, delta: f32) -> Result<()> {
        self.shift_to_frequency(self.fundamental + delta)
    }

    pub fn shift_to_midi_note(&mut self, note: f32) -> Result<()> {
        self.shift_to_frequency(midi_to_frequency(note))
    }

    /// Move the fundamental by a (possibly fractional) number of semitones.
    ///
    /// The shift is equal-tempered: the fundamental is multiplied by
    /// `2^(semitones / 12)`. It is not offset by the frequency of MIDI note
    /// `semitones`, which would make the interval depend on the starting
    /// pitch.
    pub fn shift_by_midi_notes(&mut self, semitones: f32) -> Result<()> {
        self.shift_to_frequency(self.fundamental * semitone_ratio(semitones))
    }

    pub fn shift_to_note_name(&mut self, name: &str) -> Result<()> {
        self.shift_to_frequency(pitch::note_name_to_frequency(name)?)
    }

    /// Move the fundamental by the MIDI number of `name`, in semitones
    /// (equal-tempered, see [`Model::shift_by_midi_notes`]).
    pub fn shift_by_note_name(&mut self, name: &str) -> Result<()> {
        let semitones = pitch::note_name_to_midi(name)? as f32;
        self.shift_by_midi_notes(semitones)
    }

    pub fn shift_to_pitch(&mut self, pitch: &Pitch) -> Result<()> {
        self.shift_to_frequency(pitch.frequency()?)
    }

    // ---- copies ----

    pub fn shifted_to_frequency(&self, target: f32) -> Result<Vec<ResonatorParams>> {
        let ratio = self.ratio_to(target)?;
        self.log_target(target, false);
        Ok(self
            .params
            .iter()
            .map(|p| ResonatorParams {
                freq: p.freq * ratio,
                ..*p
            })
            .collect())
    }

    pub fn shifted_by_frequency(&self, delta: f32) -> Result<Vec<ResonatorParams>> {
        self.shifted_to_frequency(self.fundamental + delta)
    }

    pub fn shifted_to_midi_note(&self, note: f32) -> Result<Vec<ResonatorParams>> {
        self.shifted_to_frequency(midi_to_frequency(note))
    }

    /// Copying form of [`Model::shift_by_midi_notes`].
    pub fn shifted_by_midi_notes(&self, semitones: f32) -> Result<Vec<ResonatorParams>> {
        self.shifted_to_frequency(self.fundamental * semitone_ratio(semitones))
    }

    pub fn shifted_to_note_name(&self, name: &str) -> Result<Vec<ResonatorParams>> {
        self.shifted_to_frequency(pitch::note_name_to_frequency(name)?)
    }

    /// Copying form of [`Model::shift_by_note_name`].
    pub fn shifted_by_note_name(&self, name: &str) -> Result<Vec<ResonatorParams>> {
        let semitones = pitch::note_name_to_midi(name)? as f32;
        self.shifted_by_midi_notes(semitones)
    }

    pub fn shifted_to_pitch(&self, pitch: &Pitch) -> Result<Vec<ResonatorParams>> {
        self.shifted_to_frequency(pitch.frequency()?)
    }
}

#[inline]
fn semitone_ratio(semitones: f32) -> f32 {
    2.0_f32.powf(semitones / 12.0)
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    Name:        {}", self.name)?;
        writeln!(f, "    Fundamental: {:.2}", self.fundamental)?;
        writeln!(f, "    Resonators:  {}", self.params.len())?;
        writeln!(f)?;
        writeln!(f, "     # |   Freq   |  Gain  |  Decay")?;
        writeln!(f, "   ---------------------------------")?;
        for (i, p) in self.params.iter().enumerate() {
            writeln!(
                f,
                "  {:>4} | {:>8.2} | {:.4} | {:.4}",
                i, p.freq, p.gain, p.decay
            )?;
        }
        write!(f, "   ---------------------------------")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bar() -> Model {
        Model::new(
            "bar",
            220.0,
            vec![
                ResonatorParams::new(220.0, 0.5, 5.0),
                ResonatorParams::new(330.0, 0.5, 5.0),
                ResonatorParams::new(440.0, 0.5, 5.0),
            ],
        )
    }

    fn freqs(params: &[ResonatorParams]) -> Vec<f32> {
        params.iter().map(|p| p.freq).collect()
    }

    const DOC: &str = r#"{
        "metadata": { "name": "glass", "fundamental": 500, "resonators": 3 },
        "resonators": [
            { "freq": 500, "gain": 0.5, "decay": 0.2 },
            { "freq": 0.2, "gain": 1.7, "decay": -1 },
            { "freq": 99999, "gain": 0.3, "decay": 0.5 }
        ]
    }"#;

    #[test]
    fn document_values_are_clamped() {
        let model = Model::from_json(DOC).unwrap();
        assert_eq!(model.name(), "glass");
        assert_eq!(model.fundamental(), 500.0);
        assert_eq!(model.len(), 3);
        assert_eq!(model.params()[1], ResonatorParams::new(1.0, 0.9999, 0.0001));
        assert_eq!(model.params()[2].freq, 20_000.0);
    }

    #[test]
    fn count_follows_resonator_list() {
        let json = r#"{
            "metadata": { "name": "short", "fundamental": 100, "resonators": 8 },
            "resonators": [ { "freq": 100, "gain": 0.5, "decay": 0.5 } ]
        }"#;
        let model = Model::from_json(json).unwrap();
        assert_eq!(model.len(), 1);
        assert_eq!(model.metadata().resonators, 1);
    }

    #[test]
    fn failed_load_leaves_model_unchanged() {
        let mut model = bar();
        assert!(model.load_json("{ not json").is_err());
        assert!(model.load_json(r#"{"metadata": {}}"#).is_err());

        let err = model.load("/definitely/not/here.json").unwrap_err();
        assert!(err.is_config_load_failure());
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(model, bar());
    }

    #[test]
    fn load_replaces_model() {
        let mut model = bar();
        model.load_json(DOC).unwrap();
        assert_eq!(model.name(), "glass");
    }

    #[test]
    fn shifted_copy_preserves_ratios() {
        let model = bar();
        for target in [55.0, 110.0, 261.63, 1000.0] {
            let shifted = model.shifted_to_frequency(target).unwrap();
            for (orig, new) in model.params().iter().zip(&shifted) {
                assert_relative_eq!(new.freq, orig.freq * (target / 220.0), max_relative = 1e-4);
                assert_eq!(new.gain, orig.gain);
                assert_eq!(new.decay, orig.decay);
            }
        }
        assert_eq!(model, bar());
    }

    #[test]
    fn shift_to_note_name_a4_doubles() {
        let mut model = bar();
        model.shift_to_note_name("a4").unwrap();
        assert_relative_eq!(model.fundamental(), 440.0, max_relative = 1e-5);
        let f = freqs(model.params());
        assert_relative_eq!(f[0], 440.0, max_relative = 1e-5);
        assert_relative_eq!(f[1], 660.0, max_relative = 1e-5);
        assert_relative_eq!(f[2], 880.0, max_relative = 1e-5);
    }

    #[test]
    fn relative_shifts() {
        let mut model = bar();
        model.shift_by_frequency(-110.0).unwrap();
        assert_relative_eq!(model.fundamental(), 110.0);
        assert_relative_eq!(model.params()[2].freq, 220.0, max_relative = 1e-5);

        model.shift_by_midi_notes(12.0).unwrap();
        assert_relative_eq!(model.fundamental(), 220.0, max_relative = 1e-5);

        model.shift_to_midi_note(45.0).unwrap();
        assert_relative_eq!(model.fundamental(), 110.0, max_relative = 1e-5);

        let down = bar().shifted_by_midi_notes(-12.0).unwrap();
        assert_relative_eq!(down[1].freq, 165.0, max_relative = 1e-5);

        let by_name = bar().shifted_by_note_name("c1").unwrap(); // 24 semitones
        assert_relative_eq!(by_name[0].freq, 880.0, max_relative = 1e-4);
    }

    #[test]
    fn relative_shifts_are_equal_tempered() {
        let model = bar();
        let fifth = model.shifted_by_midi_notes(7.0).unwrap();
        assert_relative_eq!(fifth[0].freq, 220.0 * 2f32.powf(7.0 / 12.0), max_relative = 1e-5);

        // not 220 + midi_to_frequency(12)
        let octave = model.shifted_by_midi_notes(12.0).unwrap();
        assert_relative_eq!(octave[0].freq, 440.0, max_relative = 1e-5);
        assert!((octave[0].freq - (220.0 + midi_to_frequency(12.0))).abs() > 1.0);

        // a0 is MIDI 21
        let by_name = model.shifted_by_note_name("a0").unwrap();
        assert_relative_eq!(by_name[0].freq, 220.0 * 2f32.powf(21.0 / 12.0), max_relative = 1e-4);
    }

    #[test]
    fn invalid_targets_are_rejected() {
        let mut model = bar();
        assert!(matches!(
            model.shift_by_frequency(-500.0),
            Err(Error::InvalidFrequency(_))
        ));
        assert!(matches!(
            model.shift_to_note_name("x9"),
            Err(Error::UnknownNoteName(_))
        ));
        assert_eq!(model, bar());

        let empty = Model::default();
        assert!(empty.shifted_to_frequency(440.0).is_err());
    }

    #[test]
    fn document_round_trips_through_json() {
        let model = bar();
        let json = model.to_document().to_json_pretty().unwrap();
        let back = Model::from_json(&json).unwrap();
        assert_eq!(back.name(), "bar");
        assert_eq!(back.len(), 3);
    }

    #[test]
    fn display_lists_every_resonator() {
        let text = bar().to_string();
        println!("{}", text);
        assert!(text.contains("bar"));
        assert!(text.contains("330.00"));
        assert_eq!(text.lines().filter(|l| l.contains('|')).count(), 4);
    }
}
