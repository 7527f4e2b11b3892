//! CUPED variance-reduced before/after treatment-effect estimation.
//!
//! Controlled-experiment Using Pre-Experiment Data: regress the
//! post-period outcome on the pre-period outcome over the *control*
//! group, use the slope `theta` to strip pre-period variation out of
//! every observation, then compare adjusted group means. The adjustment
//! leaves the treatment effect unbiased while shrinking its variance by
//! roughly the squared pre/post correlation.
//!
//! # References
//!
//! - Deng, Xu, Kohavi & Walker (2013), "Improving the sensitivity of
//!   online controlled experiments by utilizing pre-experiment data."
//!   *WSDM*.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use gs_core::types::LiftSummary;
use gs_core::{Error, Result};

/// Two-sided tail probability of the standard normal.
fn normal_two_sided_p(t: f64) -> f64 {
    statrs::function::erf::erfc(t.abs() / std::f64::consts::SQRT_2)
}

/// Result of a CUPED-adjusted treatment-effect estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CupedResult {
    /// OLS slope of post on pre over the control group.
    pub theta: f64,
    /// R-squared of that control-group regression.
    pub r_squared: f64,
    /// Unadjusted difference of post-period group means.
    pub naive_effect: f64,
    /// CUPED-adjusted difference of group means.
    pub adjusted_effect: f64,
    /// Standard error of the naive effect.
    pub naive_se: f64,
    /// Standard error of the adjusted effect.
    pub adjusted_se: f64,
    /// `1 - adjusted_se^2 / naive_se^2`.
    pub variance_reduction: f64,
    /// Adjusted effect relative to the control post-period mean, in percent.
    pub lift_percentage: f64,
    /// 95% CI lower bound on the lift, in percent.
    pub ci_lower: f64,
    /// 95% CI upper bound on the lift, in percent.
    pub ci_upper: f64,
    /// Two-sided p-value for the adjusted effect (normal approximation).
    pub p_value: f64,
    /// Significance at the 5% level.
    pub is_significant: bool,
    /// Number of treated observations.
    pub n_treated: usize,
    /// Number of control observations.
    pub n_control: usize,
}

impl CupedResult {
    /// Package the estimate for the downstream scoring service.
    pub fn into_summary(self, metric: impl Into<String>) -> LiftSummary {
        LiftSummary {
            metric: metric.into(),
            lift_percentage: self.lift_percentage,
            ci_lower: self.ci_lower,
            ci_upper: self.ci_upper,
            p_value: self.p_value,
            is_significant: self.is_significant,
            sample_size: (self.n_treated + self.n_control) as u64,
            variance_reduction_percentage: Some(self.variance_reduction * 100.0),
        }
    }
}

/// CUPED-adjusted treatment-effect estimate.
///
/// # Arguments
///
/// - `treatment` -- assignment indicator: 1 = treated, 0 = control (length n).
/// - `pre` -- pre-experiment outcome (length n).
/// - `post` -- post-experiment outcome (length n).
pub fn cuped_adjust(treatment: &[u8], pre: &[f64], post: &[f64]) -> Result<CupedResult> {
    let n = treatment.len();
    if n == 0 {
        return Err(Error::Validation("treatment must be non-empty".into()));
    }
    if pre.len() != n || post.len() != n {
        return Err(Error::Validation("pre and post must have same length as treatment".into()));
    }
    if treatment.iter().any(|&t| t > 1) {
        return Err(Error::Validation("treatment must be 0 or 1".into()));
    }
    if pre.iter().chain(post.iter()).any(|v| !v.is_finite()) {
        return Err(Error::Validation("pre and post must contain only finite values".into()));
    }

    let control: Vec<usize> = (0..n).filter(|&i| treatment[i] == 0).collect();
    let treated: Vec<usize> = (0..n).filter(|&i| treatment[i] == 1).collect();
    if control.is_empty() || treated.is_empty() {
        return Err(Error::Validation("both treatment and control groups must be non-empty".into()));
    }

    // theta from OLS of post on pre over the control rows:
    // columns [intercept, pre].
    let nc = control.len();
    let mut x_data = Vec::with_capacity(nc * 2);
    let mut y_data = Vec::with_capacity(nc);
    for &i in &control {
        x_data.push(1.0);
        x_data.push(pre[i]);
        y_data.push(post[i]);
    }
    let x_mat = DMatrix::from_row_slice(nc, 2, &x_data);
    let y_vec = DVector::from_vec(y_data);
    let xtx = x_mat.transpose() * &x_mat;
    let xty = x_mat.transpose() * &y_vec;
    let beta = xtx.lu().solve(&xty).ok_or_else(|| {
        Error::Computation("control pre-period outcomes have zero variance".into())
    })?;
    let theta = beta[1];

    // R² of the control regression.
    let y_hat = &x_mat * &beta;
    let resid = &y_vec - &y_hat;
    let rss: f64 = resid.iter().map(|r| r * r).sum();
    let y_mean = y_vec.iter().sum::<f64>() / nc as f64;
    let tss: f64 = y_vec.iter().map(|y| (y - y_mean) * (y - y_mean)).sum();
    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { 0.0 };

    // Adjusted outcome: post - theta * (pre - mean(pre)), centering on
    // the whole-sample pre mean so the adjustment is mean-preserving.
    let pre_mean = pre.iter().sum::<f64>() / n as f64;
    let adjusted: Vec<f64> =
        (0..n).map(|i| post[i] - theta * (pre[i] - pre_mean)).collect();

    let mean_over = |idx: &[usize], v: &[f64]| idx.iter().map(|&i| v[i]).sum::<f64>() / idx.len() as f64;
    // Sample variance (ddof = 1); zero for singleton groups.
    let var_over = |idx: &[usize], v: &[f64]| {
        if idx.len() < 2 {
            return 0.0;
        }
        let m = mean_over(idx, v);
        idx.iter().map(|&i| (v[i] - m) * (v[i] - m)).sum::<f64>() / (idx.len() - 1) as f64
    };

    let naive_effect = mean_over(&treated, post) - mean_over(&control, post);
    let adjusted_effect = mean_over(&treated, &adjusted) - mean_over(&control, &adjusted);

    let nt = treated.len();
    let naive_se =
        (var_over(&treated, post) / nt as f64 + var_over(&control, post) / nc as f64).sqrt();
    let adjusted_se = (var_over(&treated, &adjusted) / nt as f64
        + var_over(&control, &adjusted) / nc as f64)
        .sqrt();

    let variance_reduction = if naive_se > 0.0 {
        1.0 - (adjusted_se * adjusted_se) / (naive_se * naive_se)
    } else {
        0.0
    };

    let control_post_mean = mean_over(&control, post);
    if control_post_mean == 0.0 {
        return Err(Error::Computation(
            "control post-period mean is zero; relative lift is undefined".into(),
        ));
    }
    let lift_percentage = adjusted_effect / control_post_mean * 100.0;
    let ci_lower = (adjusted_effect - 1.96 * adjusted_se) / control_post_mean * 100.0;
    let ci_upper = (adjusted_effect + 1.96 * adjusted_se) / control_post_mean * 100.0;

    let (p_value, is_significant) = if adjusted_se > 0.0 {
        let p = normal_two_sided_p(adjusted_effect / adjusted_se);
        (p, p < 0.05)
    } else {
        (f64::NAN, false)
    };

    Ok(CupedResult {
        theta,
        r_squared,
        naive_effect,
        adjusted_effect,
        naive_se,
        adjusted_se,
        variance_reduction,
        lift_percentage,
        ci_lower,
        ci_upper,
        p_value,
        is_significant,
        n_treated: nt,
        n_control: nc,
    })
}
