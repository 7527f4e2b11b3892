//! # gs-translate
//!
//! Wire-format adapters for GeoStat.
//!
//! Converts estimation summaries into the fixed-schema reward message
//! consumed by the downstream scoring/reward service.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod reward;

pub use reward::{ConfidenceInterval, ExperimentResult, Reward};
