//! Common summary types for GeoStat.

use serde::{Deserialize, Serialize};

/// Summary of a lift estimate, in the shape the downstream scoring
/// service expects: every field is a plain JSON-serializable number,
/// string, or boolean.
///
/// Produced by the estimators in `gs-inference`; consumed by the reward
/// adapter in `gs-translate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiftSummary {
    /// Name of the outcome metric (e.g. "spend").
    pub metric: String,

    /// Estimated lift, in percent (e.g. 12.5 for +12.5%).
    pub lift_percentage: f64,

    /// Lower bound of the 95% confidence interval, in percent.
    pub ci_lower: f64,

    /// Upper bound of the 95% confidence interval, in percent.
    pub ci_upper: f64,

    /// Two-sided p-value for the null of zero effect.
    pub p_value: f64,

    /// Whether the effect is significant at the 5% level.
    pub is_significant: bool,

    /// Total number of observations behind the estimate.
    pub sample_size: u64,

    /// Variance reduction achieved by the adjustment, in percent.
    /// `None` when the estimator has no adjustment stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance_reduction_percentage: Option<f64>,
}

impl LiftSummary {
    /// Lift as a fraction (0.125 for +12.5%).
    pub fn lift_fraction(&self) -> f64 {
        self.lift_percentage / 100.0
    }
}
