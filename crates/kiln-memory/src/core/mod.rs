//! Core abstractions shared across the crate

pub mod traits;

pub use traits::{BasicMemoryUsage, MemoryUsage, Resettable, StatisticsProvider};
