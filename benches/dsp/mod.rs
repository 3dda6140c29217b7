//! Benchmarks for low-level DSP primitives.

mod bank;
mod resonator;

pub use bank::bench_bank;
pub use resonator::bench_resonator;
