//! Crosstrail Core: the decision engine of a single-asset crossover strategy.
//!
//! This crate turns a stream of bars and order-status notifications into
//! buy/sell/stop decisions:
//! - Incremental fast/slow simple moving averages
//! - Golden-cross / death-cross detection
//! - Fixed fractional-risk position sizing
//! - Order lifecycle tracker (one working entry/exit order at a time)
//! - Trailing-stop manager (one protective stop per open position)
//! - Strategy driver tying the above together, one decision per bar
//!
//! Fills, commission, and matching belong to the execution venue
//! (`strategy::ExecutionVenue`). This crate performs no I/O.

pub mod config;
pub mod domain;
pub mod indicators;
pub mod orders;
pub mod signal;
pub mod sizing;
pub mod strategy;

pub use config::{ConfigError, RiskConfig};
pub use signal::Signal;
pub use strategy::{BarReport, CrossoverStrategy, ExecutionVenue, SkipReason, StrategyError};
