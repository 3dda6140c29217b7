// Purpose - external interfaces: control messages

pub mod control;

pub use control::{parse, ControlMessage};
