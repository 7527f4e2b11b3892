//! # gs-inference
//!
//! Estimation for GeoStat.
//!
//! This crate provides:
//! - Synthetic control estimation for geo-targeted interventions
//!   ([`synth`]): panel reshaping, pre-period standardization,
//!   expanding-window strength selection, non-negative ridge/lasso
//!   weights, counterfactual projection, and lift.
//! - CUPED variance-reduced before/after adjustment ([`cuped`]).
//! - Two-level factorial design matrices ([`design`]).
//! - Seeded dataset simulators ([`simulate`]).
//!
//! Everything here is synchronous, single-threaded, in-memory
//! computation; the only randomness lives in the simulators and is
//! seeded explicitly per call.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// CUPED variance-reduced treatment-effect estimation.
pub mod cuped;
/// Two-level factorial design matrices.
pub mod design;
/// Seeded synthetic dataset generators.
pub mod simulate;
/// Synthetic control estimation pipeline.
pub mod synth;

pub use cuped::{cuped_adjust, CupedResult};
pub use design::ff_design;
pub use simulate::{
    simulate_customer_dataset, simulate_geo_panel, CustomerDataset, CustomerDatasetConfig,
    GeoPanelConfig,
};
pub use synth::{
    build_synthetic_control, compute_lift, LongTable, Method, ResultRow, SyntheticControlConfig,
    SyntheticControlFit, SyntheticControlModel,
};
