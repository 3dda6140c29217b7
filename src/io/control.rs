//! Control messages.
//!
//! Two JSON shapes arrive on the control channel:
//!
//! ```json
//! { "command": "set-pitch-at-voice", "args": { "index": 0, "pitch": "c4" } }
//! { "event": "connection-reply" }
//! ```
//!
//! | command                            | args                                        |
//! |------------------------------------|---------------------------------------------|
//! | `load-model-at-voice`              | `index`, `path` or `model` (model document) |
//! | `set-pitch-at-voice`               | `index`, `pitch` (note name or Hz)          |
//! | `set-resonator-at-voice`           | `index`, `resonator`, `freq`, `gain`, `decay` |
//! | `set-resonator-parameter-at-voice` | `index`, `resonator`, `parameter`, `value`  |
//!
//! `bankIndex`, `resIndex` and `paramIndex` are accepted as aliases.
//! Unknown commands parse to `None`.

use std::path::PathBuf;

use serde::de::Error as _;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::dsp::resonator::ResonatorParams;
use crate::error::Result;
use crate::model::pitch::Pitch;
use crate::model::{constrain, ModelDocument, ModelSource};

pub const LOAD_MODEL: &str = "load-model-at-voice";
pub const SET_PITCH: &str = "set-pitch-at-voice";
pub const SET_RESONATOR: &str = "set-resonator-at-voice";
pub const SET_RESONATOR_PARAMETER: &str = "set-resonator-parameter-at-voice";

pub const CONNECTION_REPLY: &str = "connection-reply";

#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    LoadModel {
        index: usize,
        source: ModelSource,
    },
    SetPitch {
        index: usize,
        pitch: Pitch,
    },
    SetResonator {
        index: usize,
        resonator: usize,
        params: ResonatorParams,
    },
    SetResonatorParameter {
        index: usize,
        resonator: usize,
        /// Raw selector, validated by the receiver.
        parameter: usize,
        value: f32,
    },
    Event(String),
}

impl ControlMessage {
    /// Voice a command addresses. `None` for lifecycle events.
    pub fn voice(&self) -> Option<usize> {
        match self {
            ControlMessage::LoadModel { index, .. }
            | ControlMessage::SetPitch { index, .. }
            | ControlMessage::SetResonator { index, .. }
            | ControlMessage::SetResonatorParameter { index, .. } => Some(*index),
            ControlMessage::Event(_) => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope {
    Command {
        command: String,
        #[serde(default)]
        args: serde_json::Value,
    },
    Event {
        event: String,
    },
}

#[derive(Deserialize)]
struct LoadArgs {
    #[serde(alias = "bankIndex")]
    index: usize,
    path: Option<PathBuf>,
    model: Option<ModelDocument>,
}

#[derive(Deserialize)]
struct PitchArgs {
    #[serde(alias = "bankIndex")]
    index: usize,
    pitch: Pitch,
}

#[derive(Deserialize)]
struct ResonatorArgs {
    #[serde(alias = "bankIndex")]
    index: usize,
    #[serde(alias = "resIndex")]
    resonator: usize,
    #[serde(flatten)]
    params: ResonatorParams,
}

#[derive(Deserialize)]
struct ParameterArgs {
    #[serde(alias = "bankIndex")]
    index: usize,
    #[serde(alias = "resIndex")]
    resonator: usize,
    #[serde(alias = "paramIndex")]
    parameter: usize,
    value: f32,
}

/// Parse one control message.
///
/// Malformed JSON and malformed arguments are errors. A well-formed message
/// with an unknown command name is logged and yields `Ok(None)`.
pub fn parse(json: &str) -> Result<Option<ControlMessage>> {
    let (command, args) = match serde_json::from_str(json)? {
        Envelope::Event { event } => return Ok(Some(ControlMessage::Event(event))),
        Envelope::Command { command, args } => (command, args),
    };
    debug!(%command, "control message");

    let msg = match command.as_str() {
        LOAD_MODEL => {
            let LoadArgs { index, path, model } = serde_json::from_value(args)?;
            let source = match (model, path) {
                (Some(doc), _) => ModelSource::Document(doc),
                (None, Some(path)) => ModelSource::Path(path),
                (None, None) => {
                    return Err(serde_json::Error::custom(format!(
                        "{}: expected `path` or `model`",
                        LOAD_MODEL
                    ))
                    .into())
                }
            };
            ControlMessage::LoadModel { index, source }
        }
        SET_PITCH => {
            let PitchArgs { index, pitch } = serde_json::from_value(args)?;
            ControlMessage::SetPitch { index, pitch }
        }
        SET_RESONATOR => {
            let ResonatorArgs {
                index,
                resonator,
                params,
            } = serde_json::from_value(args)?;
            ControlMessage::SetResonator {
                index,
                resonator,
                params: constrain(params),
            }
        }
        SET_RESONATOR_PARAMETER => {
            let ParameterArgs {
                index,
                resonator,
                parameter,
                value,
            } = serde_json::from_value(args)?;
            ControlMessage::SetResonatorParameter {
                index,
                resonator,
                parameter,
                value,
            }
        }
        other => {
            warn!(command = other, "unknown control command, ignored");
            return Ok(None);
        }
    };
    Ok(Some(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn set_pitch_with_note_or_frequency() {
        let msg = parse(r#"{"command":"set-pitch-at-voice","args":{"index":0,"pitch":"c4"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            msg,
            ControlMessage::SetPitch {
                index: 0,
                pitch: Pitch::from("c4")
            }
        );

        let msg = parse(r#"{"command":"set-pitch-at-voice","args":{"bankIndex":2,"pitch":330.5}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            msg,
            ControlMessage::SetPitch {
                index: 2,
                pitch: Pitch::Frequency(330.5)
            }
        );
        assert_eq!(msg.voice(), Some(2));
    }

    #[test]
    fn load_model_from_path_or_inline_document() {
        let msg = parse(r#"{"command":"load-model-at-voice","args":{"index":1,"path":"models/bar.json"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            msg,
            ControlMessage::LoadModel {
                index: 1,
                source: ModelSource::from("models/bar.json")
            }
        );

        let json = r#"{
            "command": "load-model-at-voice",
            "args": {
                "index": 0,
                "model": {
                    "metadata": { "name": "bar", "fundamental": 100, "resonators": 1 },
                    "resonators": [ { "freq": 100, "gain": 0.5, "decay": 0.5 } ]
                }
            }
        }"#;
        match parse(json).unwrap().unwrap() {
            ControlMessage::LoadModel {
                index: 0,
                source: ModelSource::Document(doc),
            } => assert_eq!(doc.metadata.name, "bar"),
            other => panic!("unexpected {:?}", other),
        }

        let err = parse(r#"{"command":"load-model-at-voice","args":{"index":0}}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn set_resonator_is_clamped() {
        let msg = parse(
            r#"{"command":"set-resonator-at-voice",
                "args":{"bankIndex":0,"resIndex":3,"freq":30000,"gain":2.0,"decay":0.5}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            msg,
            ControlMessage::SetResonator {
                index: 0,
                resonator: 3,
                params: ResonatorParams::new(20_000.0, 0.9999, 0.5)
            }
        );
    }

    #[test]
    fn set_resonator_parameter_keeps_raw_selector() {
        let msg = parse(
            r#"{"command":"set-resonator-parameter-at-voice",
                "args":{"index":0,"resIndex":1,"paramIndex":7,"value":0.2}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            msg,
            ControlMessage::SetResonatorParameter {
                index: 0,
                resonator: 1,
                parameter: 7,
                value: 0.2
            }
        );
    }

    #[test]
    fn events_and_unknown_commands() {
        assert_eq!(
            parse(r#"{"event":"connection-reply"}"#).unwrap(),
            Some(ControlMessage::Event(CONNECTION_REPLY.to_string()))
        );
        assert_eq!(parse(r#"{"command":"explode","args":{}}"#).unwrap(), None);
        assert!(parse("not json").is_err());
        assert!(parse(r#"{"something":"else"}"#).is_err());
    }
}
