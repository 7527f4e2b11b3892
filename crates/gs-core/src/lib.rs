//! # gs-core
//!
//! Shared foundation for GeoStat: the error taxonomy and the summary
//! types that cross crate boundaries (estimation -> wire adapter).
//!
//! This crate carries no statistics. Estimators live in `gs-inference`,
//! and the reward-message adapter in `gs-translate`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::LiftSummary;
