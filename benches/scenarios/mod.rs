//! Real-world scenario benchmarks.
//!
//! These render several model voices at once, the way the demo host does.

mod voices;

pub use voices::{bench_control, bench_voices};
