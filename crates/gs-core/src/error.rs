//! Error types for GeoStat.
//!
//! The taxonomy is deliberately small. Bad caller input (unknown method
//! strings, absent columns, a treated unit missing from the pre-period,
//! too few pre-period rows) is `Validation`; numeric failures inside a
//! solver are `Computation`. Degenerate analytic outcomes -- a
//! zero-variance control column, a zero counterfactual denominator --
//! are handled values in the estimators, not errors.

use thiserror::Error;

/// GeoStat error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input: bad arguments, missing entities, insufficient data.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Numeric failure during estimation.
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
