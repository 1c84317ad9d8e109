//! Statistics for the relay subsystem

pub mod counters;

pub use counters::{CountersSnapshot, RelayCounters};
