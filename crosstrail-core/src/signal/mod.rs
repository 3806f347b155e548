//! Signal detection.

pub mod crossover;

pub use crossover::{detect, detect_snapshot, Signal};
