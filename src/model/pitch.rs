use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/*
Pitch Conversions
=================

Equal temperament anchored at A0:

    frequency = 27.5 * 2^((midi - 21) / 12)
    midi      = (12 / ln 2) * ln(frequency / 27.5) + 21

Note names are lowercase pitch class + octave, sharps spelled with an `s`:

    a as b c cs d ds e f fs g gs

Octave numbers change at C, so "b0" (23) is followed by "c1" (24). Middle C
is "c4" (60) and "a4" (69) is 440 Hz. The table covers a0 (21) to g9 (127).
*/

pub const LOWEST_NOTE: u8 = 21;
pub const HIGHEST_NOTE: u8 = 127;

const REFERENCE_NOTE: f32 = 21.0;
const REFERENCE_FREQ: f32 = 27.5;

const PITCH_CLASSES: [&str; 12] = [
    "c", "cs", "d", "ds", "e", "f", "fs", "g", "gs", "a", "as", "b",
];

/// Immutable bidirectional note-name ↔ MIDI mapping.
pub struct NoteTable {
    by_name: HashMap<String, u8>,
    by_note: Vec<String>,
}

impl NoteTable {
    fn build() -> Self {
        let by_note: Vec<String> = (LOWEST_NOTE..=HIGHEST_NOTE)
            .map(|note| {
                let class = PITCH_CLASSES[note as usize % 12];
                let octave = note as i32 / 12 - 1;
                format!("{}{}", class, octave)
            })
            .collect();

        let by_name = by_note
            .iter()
            .zip(LOWEST_NOTE..=HIGHEST_NOTE)
            .map(|(name, note)| (name.clone(), note))
            .collect();

        Self { by_name, by_note }
    }

    pub fn midi(&self, name: &str) -> Option<u8> {
        self.by_name.get(name.trim().to_ascii_lowercase().as_str()).copied()
    }

    pub fn name(&self, note: u8) -> Option<&str> {
        let offset = note.checked_sub(LOWEST_NOTE)? as usize;
        self.by_note.get(offset).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_note.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_note.is_empty()
    }
}

pub static NOTES: Lazy<NoteTable> = Lazy::new(NoteTable::build);

#[inline]
pub fn midi_to_frequency(note: f32) -> f32 {
    REFERENCE_FREQ * 2.0_f32.powf((note - REFERENCE_NOTE) / 12.0)
}

#[inline]
pub fn frequency_to_midi(freq: f32) -> f32 {
    (12.0 / std::f32::consts::LN_2) * (freq / REFERENCE_FREQ).ln() + REFERENCE_NOTE
}

pub fn note_name_to_midi(name: &str) -> Result<u8> {
    NOTES.midi(name).ok_or_else(|| {
        warn!(name, "note not found");
        Error::UnknownNoteName(name.to_string())
    })
}

pub fn midi_to_note_name(note: u8) -> Option<&'static str> {
    NOTES.name(note)
}

pub fn note_name_to_frequency(name: &str) -> Result<f32> {
    note_name_to_midi(name).map(|note| midi_to_frequency(note as f32))
}

/// Nearest note name, if the frequency falls inside the table.
pub fn frequency_to_note_name(freq: f32) -> Option<&'static str> {
    let note = frequency_to_midi(freq).round();
    if note.is_finite() && note >= LOWEST_NOTE as f32 && note <= HIGHEST_NOTE as f32 {
        midi_to_note_name(note as u8)
    } else {
        None
    }
}

/// Target pitch for a voice: a note name ("c4") or an absolute frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pitch {
    Note(String),
    Frequency(f32),
}

impl Pitch {
    pub fn frequency(&self) -> Result<f32> {
        match self {
            Pitch::Note(name) => note_name_to_frequency(name),
            Pitch::Frequency(freq) if *freq > 0.0 && freq.is_finite() => Ok(*freq),
            Pitch::Frequency(freq) => Err(Error::InvalidFrequency(*freq)),
        }
    }
}

impl From<&str> for Pitch {
    fn from(name: &str) -> Self {
        Pitch::Note(name.to_string())
    }
}

impl From<f32> for Pitch {
    fn from(freq: f32) -> Self {
        Pitch::Frequency(freq)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pitch::Note(name) => write!(f, "{}", name),
            Pitch::Frequency(freq) => write!(f, "{:.2} Hz", freq),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reference_pitches() {
        assert_relative_eq!(midi_to_frequency(21.0), 27.5);
        assert_relative_eq!(midi_to_frequency(69.0), 440.0, max_relative = 1e-6);
        assert_relative_eq!(midi_to_frequency(57.0), 220.0, max_relative = 1e-6);
        assert_relative_eq!(frequency_to_midi(440.0), 69.0, max_relative = 1e-6);
    }

    #[test]
    fn table_spans_a0_to_g9() {
        assert_eq!(NOTES.len(), 107);
        assert_eq!(note_name_to_midi("a0").unwrap(), 21);
        assert_eq!(note_name_to_midi("b0").unwrap(), 23);
        assert_eq!(note_name_to_midi("c1").unwrap(), 24);
        assert_eq!(note_name_to_midi("c4").unwrap(), 60);
        assert_eq!(note_name_to_midi("a4").unwrap(), 69);
        assert_eq!(note_name_to_midi("ds9").unwrap(), 123);
        assert_eq!(note_name_to_midi("g9").unwrap(), 127);
        assert_eq!(midi_to_note_name(70), Some("as4"));
        assert_eq!(midi_to_note_name(20), None);
    }

    #[test]
    fn every_name_round_trips() {
        for note in LOWEST_NOTE..=HIGHEST_NOTE {
            let name = midi_to_note_name(note).unwrap();
            assert_eq!(note_name_to_midi(name).unwrap(), note);
        }
    }

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        assert_eq!(note_name_to_midi(" Cs4 ").unwrap(), 61);
    }

    #[test]
    fn unknown_note_name_is_reported() {
        assert!(matches!(
            note_name_to_midi("h2"),
            Err(Error::UnknownNoteName(name)) if name == "h2"
        ));
        assert!(note_name_to_midi("gs9").is_err());
    }

    #[test]
    fn nearest_note_name() {
        assert_eq!(frequency_to_note_name(440.0), Some("a4"));
        assert_eq!(frequency_to_note_name(261.0), Some("c4"));
        assert_eq!(frequency_to_note_name(5.0), None);
        assert_eq!(frequency_to_note_name(0.0), None);
    }

    #[test]
    fn pitch_resolves_to_frequency() {
        assert_relative_eq!(Pitch::from("a4").frequency().unwrap(), 440.0, max_relative = 1e-6);
        assert_eq!(Pitch::from(123.0).frequency().unwrap(), 123.0);
        assert!(Pitch::from(-1.0).frequency().is_err());
        assert!(Pitch::from("zz").frequency().is_err());

        let parsed: Pitch = serde_json::from_str("\"c4\"").unwrap();
        assert_eq!(parsed, Pitch::Note("c4".into()));
        let parsed: Pitch = serde_json::from_str("261.5").unwrap();
        assert_eq!(parsed, Pitch::Frequency(261.5));
    }
}
