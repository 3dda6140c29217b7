// Purpose: Voice management and the control/render handoff
// This layer sits above the banks and owns models, pitches and commands

pub mod command;
pub mod message;
pub mod resonators;
pub mod voice;

pub use command::BankCommand;
pub use resonators::{CommandSink, Orchestrator, Resonators};
#[cfg(feature = "rtrb")]
pub use resonators::{ResonatorsControl, ResonatorsRenderer};
pub use voice::{VoiceBanks, VoiceModel};
