//! The per-bar decision loop and the venue seam it talks through.

pub mod driver;
pub mod venue;

pub use driver::{BarReport, CrossoverStrategy, SkipReason, StrategyError};
pub use venue::{ExecutionVenue, RecordingVenue};
