//! Synthetic control estimation for geo-targeted interventions.
//!
//! Builds a counterfactual trajectory for a treated geo as a
//! non-negative weighted combination of control-geo trajectories, fit
//! on the pre-intervention period only, then compares observed and
//! counterfactual post-period averages to estimate lift.
//!
//! Pipeline (each stage consumes the previous stage's output):
//!
//! 1. [`panel`] -- long records to a time-by-unit matrix, split at the
//!    pre/post boundary.
//! 2. [`scaling`] -- per-control standardization, fit on the pre-period
//!    and reused verbatim on the full timeline.
//! 3. [`selection`] -- strength grid search under expanding-window CV
//!    (skipped entirely when the caller supplies a strength).
//! 4. [`solver`] -- non-negative ridge/lasso weights with intercept.
//! 5. Projection of the fitted model across the full timeline and the
//!    post-period lift ratio.
//!
//! One control ordering -- first appearance in the pre-period records --
//! is fixed during reshaping and shared by the scaler parameters, the
//! weight vector, and every matrix column selection.
//!
//! # References
//!
//! - Abadie, Diamond & Hainmueller (2010), "Synthetic control methods
//!   for comparative case studies." *JASA*.

pub mod panel;
pub mod scaling;
pub mod selection;
pub mod solver;

use serde::{Deserialize, Serialize};

use gs_core::{Error, Result};

use panel::{median_time, pivot_mean};
use selection::{default_alpha_grid, select_alpha};
use solver::{fit_nonneg, mean_squared_error};

pub use panel::{Column, LongTable, PivotedPanel};
pub use scaling::StandardScaler;
pub use selection::SelectionResult;
pub use solver::{ConstrainedFit, Method};

/// Configuration for a synthetic control run.
#[derive(Debug, Clone)]
pub struct SyntheticControlConfig {
    /// Label of the treated unit.
    pub treated_unit: String,
    /// Name of the outcome column in the long table.
    pub outcome_col: String,
    /// Name of the time column.
    pub time_col: String,
    /// Name of the unit column.
    pub unit_col: String,
    /// Pre/post boundary; rows with `time <= boundary` are pre.
    /// Defaults to the median of the observed time values.
    pub boundary: Option<f64>,
    /// Penalty family. Defaults to ridge.
    pub method: Method,
    /// Explicit regularization strength. When set, the grid search is
    /// bypassed entirely and this exact value is used.
    pub alpha: Option<f64>,
}

impl SyntheticControlConfig {
    /// Configuration with defaults: median boundary, ridge penalty,
    /// strength selected by cross-validation.
    pub fn new(
        treated_unit: impl Into<String>,
        outcome_col: impl Into<String>,
        time_col: impl Into<String>,
        unit_col: impl Into<String>,
    ) -> Self {
        Self {
            treated_unit: treated_unit.into(),
            outcome_col: outcome_col.into(),
            time_col: time_col.into(),
            unit_col: unit_col.into(),
            boundary: None,
            method: Method::Ridge,
            alpha: None,
        }
    }
}

/// Fitted model artifact: everything needed to reproduce the
/// counterfactual, owned by a single estimation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticControlModel {
    /// Penalty family used.
    pub method: Method,
    /// Regularization strength (selected or caller-supplied).
    pub alpha: f64,
    /// Unpenalized intercept.
    pub intercept: f64,
    /// Non-negative weights, aligned with the control-unit list.
    pub weights: Vec<f64>,
    /// Training MSE on the complete pre-period rows.
    pub pre_mse: f64,
    /// Whether the coordinate-descent solver converged.
    pub converged: bool,
}

/// One row of the result table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    /// Time value.
    pub time: f64,
    /// Observed outcome for the treated unit (`NAN` when missing).
    pub actual: f64,
    /// Counterfactual outcome (`NAN` when a control is missing).
    pub counterfactual: f64,
    /// True for rows with `time > boundary`.
    pub is_post: bool,
}

/// Output bundle of a synthetic control run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticControlFit {
    /// Fitted model artifact.
    pub model: SyntheticControlModel,
    /// Control units, in the pipeline's fixed order.
    pub control_units: Vec<String>,
    /// One row per unique time value across the full timeline.
    pub results: Vec<ResultRow>,
    /// Post-period lift: mean(actual)/mean(counterfactual) - 1.
    /// `None` when there are no post rows, no finite post values, or
    /// the counterfactual mean is exactly zero.
    pub lift: Option<f64>,
    /// Number of pre-period rows in the result table.
    pub n_pre_rows: usize,
    /// Number of post-period rows in the result table.
    pub n_post_rows: usize,
}

impl SyntheticControlFit {
    /// Weight of a control unit, if it is one.
    pub fn weight_of(&self, unit: &str) -> Option<f64> {
        self.control_units
            .iter()
            .position(|u| u == unit)
            .map(|j| self.model.weights[j])
    }

    /// (unit, weight) pairs in the pipeline's fixed order.
    pub fn weight_map(&self) -> Vec<(String, f64)> {
        self.control_units
            .iter()
            .cloned()
            .zip(self.model.weights.iter().copied())
            .collect()
    }
}

/// Post-period lift from a result table: partition by the post flag,
/// average actual and counterfactual over post rows (skipping
/// non-finite values independently, the way the source tables treat
/// missing cells), and take the ratio minus one.
///
/// An undefined ratio -- no post rows, no finite values, or a
/// counterfactual mean of exactly zero -- is a valid analytic outcome,
/// reported as `None` rather than an error.
pub fn compute_lift(results: &[ResultRow]) -> Option<f64> {
    let mut actual_sum = 0.0;
    let mut actual_n = 0usize;
    let mut cf_sum = 0.0;
    let mut cf_n = 0usize;
    for row in results.iter().filter(|r| r.is_post) {
        if row.actual.is_finite() {
            actual_sum += row.actual;
            actual_n += 1;
        }
        if row.counterfactual.is_finite() {
            cf_sum += row.counterfactual;
            cf_n += 1;
        }
    }
    if actual_n == 0 || cf_n == 0 {
        return None;
    }
    let cf_mean = cf_sum / cf_n as f64;
    if cf_mean == 0.0 {
        return None;
    }
    Some((actual_sum / actual_n as f64) / cf_mean - 1.0)
}

/// Build a synthetic control model and lift estimate from long-format
/// panel records.
///
/// Fails with a validation error when the treated unit has no
/// pre-period observations (checked before any fitting), when the
/// column names do not resolve, when an explicit strength is not a
/// finite non-negative number, or when there are too few complete
/// pre-period rows to fit (or, without an explicit strength, to
/// cross-validate).
pub fn build_synthetic_control(
    table: &LongTable,
    config: &SyntheticControlConfig,
) -> Result<SyntheticControlFit> {
    let times = table.float(&config.time_col)?;
    let units = table.label(&config.unit_col)?;
    table.float(&config.outcome_col)?;

    if let Some(alpha) = config.alpha {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(Error::Validation(format!(
                "regularization strength must be finite and >= 0, got {}",
                alpha
            )));
        }
    }

    let boundary = match config.boundary {
        Some(b) if !b.is_finite() => {
            return Err(Error::Validation(format!("boundary must be finite, got {}", b)));
        }
        Some(b) => b,
        None => median_time(times)?,
    };

    // Control ordering: first appearance in the pre-period records,
    // treated unit excluded. Fixed here, reused by every later stage.
    let mut treated_seen = false;
    let mut controls: Vec<String> = Vec::new();
    for (row, unit) in units.iter().enumerate() {
        if times[row] > boundary {
            continue;
        }
        if *unit == config.treated_unit {
            treated_seen = true;
        } else if !controls.iter().any(|u| u == unit) {
            controls.push(unit.clone());
        }
    }
    if !treated_seen {
        return Err(Error::Validation(format!(
            "treated unit '{}' not found in pre-period data",
            config.treated_unit
        )));
    }
    if controls.is_empty() {
        return Err(Error::Validation(
            "no control units observed in the pre-period".to_string(),
        ));
    }

    let full = pivot_mean(table, &config.time_col, &config.unit_col, &config.outcome_col)?;
    let pre = full.pre_slice(boundary);

    let n_pre = pre.n_times();
    let p = controls.len();
    let y_pre = pre.column_of(&config.treated_unit)?;
    let x_pre = pre.gather(&controls)?;

    // One complete-row mask governs the scaler fit, the CV folds, and
    // the final fit: a row is usable only when the treated outcome and
    // every control outcome are observed.
    let mask: Vec<bool> = (0..n_pre)
        .map(|i| {
            y_pre[i].is_finite() && (0..p).all(|j| x_pre[i * p + j].is_finite())
        })
        .collect();
    let n_complete = mask.iter().filter(|&&m| m).count();
    if n_complete < 2 {
        return Err(Error::Validation(format!(
            "only {} complete pre-period rows; at least 2 are required to fit",
            n_complete
        )));
    }

    let scaler = StandardScaler::fit(&x_pre, n_pre, p, &mask)?;

    // Compact the masked rows, preserving time order.
    let mut x_fit = Vec::with_capacity(n_complete * p);
    let mut y_fit = Vec::with_capacity(n_complete);
    for i in 0..n_pre {
        if !mask[i] {
            continue;
        }
        x_fit.extend_from_slice(&x_pre[i * p..(i + 1) * p]);
        y_fit.push(y_pre[i]);
    }
    let x_fit = scaler.transform(&x_fit, n_complete)?;

    let alpha = match config.alpha {
        Some(a) => a,
        None => {
            if n_complete < 3 {
                return Err(Error::Validation(format!(
                    "only {} complete pre-period rows; at least 3 are required to \
                     cross-validate a regularization strength",
                    n_complete
                )));
            }
            let k = 3.min(n_complete - 1);
            select_alpha(config.method, &default_alpha_grid(), &x_fit, &y_fit, n_complete, p, k)?
                .alpha
        }
    };

    let fit = fit_nonneg(config.method, alpha, &x_fit, &y_fit, n_complete, p)?;
    let pre_pred = fit.predict(&x_fit, n_complete)?;
    let pre_mse = mean_squared_error(&y_fit, &pre_pred)?;

    // Project across the full timeline with the same transform and the
    // same weights; the model is never retrained past the boundary.
    let n_full = full.n_times();
    let x_full = scaler.transform(&full.gather(&controls)?, n_full)?;
    let counterfactual = fit.predict(&x_full, n_full)?;
    let actual = full.column_of(&config.treated_unit)?;

    let results: Vec<ResultRow> = (0..n_full)
        .map(|i| ResultRow {
            time: full.times()[i],
            actual: actual[i],
            counterfactual: counterfactual[i],
            is_post: full.times()[i] > boundary,
        })
        .collect();

    let lift = compute_lift(&results);
    let n_post_rows = results.iter().filter(|r| r.is_post).count();
    let n_pre_rows = n_full - n_post_rows;

    Ok(SyntheticControlFit {
        model: SyntheticControlModel {
            method: config.method,
            alpha,
            intercept: fit.intercept,
            weights: fit.coefficients,
            pre_mse,
            converged: fit.converged,
        },
        control_units: controls,
        results,
        lift,
        n_pre_rows,
        n_post_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Panel where the treated geo "A" is an exact positive combination
    /// of the controls pre-boundary and is scaled up by `effect` after.
    fn combo_table(n_days: usize, boundary: f64, effect: f64) -> LongTable {
        let mut time = Vec::new();
        let mut geo = Vec::new();
        let mut spend = Vec::new();
        for d in 0..n_days {
            let t = d as f64;
            let b = 100.0 + 10.0 * (t / 30.0).sin();
            let c = 80.0 + 8.0 * (t / 20.0).cos();
            let dd = 120.0 + 5.0 * (t / 15.0).sin();
            let mut a = 0.5 * b + 0.3 * c + 0.2 * dd;
            if t > boundary {
                a *= 1.0 + effect;
            }
            for (g, v) in [("A", a), ("B", b), ("C", c), ("D", dd)] {
                time.push(t);
                geo.push(g.to_string());
                spend.push(v);
            }
        }
        let mut table = LongTable::new();
        table.push_float("date", time).unwrap();
        table.push_label("geo", geo).unwrap();
        table.push_float("spend", spend).unwrap();
        table
    }

    fn base_config() -> SyntheticControlConfig {
        SyntheticControlConfig::new("A", "spend", "date", "geo")
    }

    #[test]
    fn test_weights_are_nonnegative() {
        for method in [Method::Ridge, Method::Lasso] {
            let table = combo_table(40, 19.0, 0.2);
            let config = SyntheticControlConfig { method, boundary: Some(19.0), ..base_config() };
            let fit = build_synthetic_control(&table, &config).unwrap();
            for (unit, w) in fit.weight_map() {
                assert!(w >= 0.0, "{:?} weight for {} is negative: {}", method, unit, w);
            }
        }
    }

    #[test]
    fn test_result_table_shape_and_post_flags() {
        let table = combo_table(30, 14.0, 0.1);
        let config = SyntheticControlConfig { boundary: Some(14.0), ..base_config() };
        let fit = build_synthetic_control(&table, &config).unwrap();
        assert_eq!(fit.results.len(), 30);
        assert_eq!(fit.n_pre_rows, 15);
        assert_eq!(fit.n_post_rows, 15);
        for row in &fit.results {
            assert_eq!(row.is_post, row.time > 14.0, "time {}", row.time);
        }
        // Exactly one row per unique time, ascending.
        for w in fit.results.windows(2) {
            assert!(w[0].time < w[1].time);
        }
    }

    #[test]
    fn test_projection_matches_pre_only_path_bitwise() {
        // The standardization parameters used for projection are the
        // ones fit on the pre-period: predicting the pre rows through
        // the full-timeline path must agree bit-for-bit with a direct
        // pre-period prediction.
        let table = combo_table(36, 17.0, 0.25);
        let config = SyntheticControlConfig { boundary: Some(17.0), ..base_config() };
        let fit = build_synthetic_control(&table, &config).unwrap();

        let full = pivot_mean(&table, "date", "geo", "spend").unwrap();
        let pre = full.pre_slice(17.0);
        let scaler = StandardScaler::fit(
            &pre.gather(&fit.control_units).unwrap(),
            pre.n_times(),
            fit.control_units.len(),
            &vec![true; pre.n_times()],
        )
        .unwrap();
        let x_scaled =
            scaler.transform(&pre.gather(&fit.control_units).unwrap(), pre.n_times()).unwrap();
        let solver_fit = solver::ConstrainedFit {
            coefficients: fit.model.weights.clone(),
            intercept: fit.model.intercept,
            n_iterations: 0,
            converged: true,
        };
        let direct = solver_fit.predict(&x_scaled, pre.n_times()).unwrap();
        for (row, d) in fit.results.iter().take(pre.n_times()).zip(&direct) {
            assert_eq!(row.counterfactual.to_bits(), d.to_bits());
        }
    }

    #[test]
    fn test_lift_recovers_known_effect() {
        let table = combo_table(90, 44.0, 0.2);
        let config = SyntheticControlConfig { boundary: Some(44.0), ..base_config() };
        let fit = build_synthetic_control(&table, &config).unwrap();
        let lift = fit.lift.expect("lift should be defined");
        assert!((lift - 0.2).abs() < 0.03, "lift={}", lift);
        assert!(fit.model.pre_mse < 1e-6, "pre MSE={}", fit.model.pre_mse);
    }

    #[test]
    fn test_explicit_alpha_bypasses_selection() {
        let table = combo_table(30, 14.0, 0.2);
        // 7.5 is not on the default grid, so equality proves bypass.
        let config =
            SyntheticControlConfig { boundary: Some(14.0), alpha: Some(7.5), ..base_config() };
        let fit = build_synthetic_control(&table, &config).unwrap();
        assert_eq!(fit.model.alpha, 7.5);
    }

    #[test]
    fn test_invalid_alpha_rejected() {
        let table = combo_table(30, 14.0, 0.2);
        for bad in [f64::NAN, f64::INFINITY, -0.5] {
            let config =
                SyntheticControlConfig { boundary: Some(14.0), alpha: Some(bad), ..base_config() };
            assert!(build_synthetic_control(&table, &config).is_err(), "alpha={}", bad);
        }
    }

    #[test]
    fn test_missing_treated_unit_fails_before_fit() {
        let table = combo_table(30, 14.0, 0.2);
        let config = SyntheticControlConfig {
            treated_unit: "Z".to_string(),
            boundary: Some(14.0),
            ..base_config()
        };
        let err = build_synthetic_control(&table, &config).unwrap_err();
        assert!(err.to_string().contains("'Z' not found in pre-period"), "{}", err);
    }

    #[test]
    fn test_unit_only_in_post_period_is_not_a_control() {
        let mut table = combo_table(20, 9.0, 0.0);
        // "E" appears only after the boundary.
        table = {
            let time = table.float("date").unwrap().to_vec();
            let geo = table.label("geo").unwrap().to_vec();
            let spend = table.float("spend").unwrap().to_vec();
            let mut t2 = LongTable::new();
            let mut time2 = time;
            let mut geo2 = geo;
            let mut spend2 = spend;
            time2.push(15.0);
            geo2.push("E".to_string());
            spend2.push(50.0);
            t2.push_float("date", time2).unwrap();
            t2.push_label("geo", geo2).unwrap();
            t2.push_float("spend", spend2).unwrap();
            t2
        };
        let config = SyntheticControlConfig { boundary: Some(9.0), ..base_config() };
        let fit = build_synthetic_control(&table, &config).unwrap();
        assert!(!fit.control_units.iter().any(|u| u == "E"));
        assert_eq!(fit.control_units.len(), 3);
    }

    #[test]
    fn test_default_boundary_is_median_time_value() {
        // Unevenly spaced times: 0, 1, 2, 10, 100 for each of two geos.
        // The median time value is 2, so three rows are pre.
        let mut table = LongTable::new();
        let days = [0.0, 1.0, 2.0, 10.0, 100.0];
        let mut time = Vec::new();
        let mut geo = Vec::new();
        let mut spend = Vec::new();
        for &d in &days {
            for g in ["A", "B"] {
                time.push(d);
                geo.push(g.to_string());
                spend.push(if g == "A" { 2.0 * d + 1.0 } else { d });
            }
        }
        table.push_float("date", time).unwrap();
        table.push_label("geo", geo).unwrap();
        table.push_float("spend", spend).unwrap();

        let config =
            SyntheticControlConfig { alpha: Some(0.001), ..base_config() };
        let fit = build_synthetic_control(&table, &config).unwrap();
        assert_eq!(fit.n_pre_rows, 3);
        assert_eq!(fit.n_post_rows, 2);
    }

    #[test]
    fn test_zero_variance_control_is_harmless() {
        let mut table = LongTable::new();
        let mut time = Vec::new();
        let mut geo = Vec::new();
        let mut spend = Vec::new();
        for d in 0..20 {
            let t = d as f64;
            for (g, v) in [("A", 10.0 + t), ("B", 5.0 + t), ("C", 42.0)] {
                time.push(t);
                geo.push(g.to_string());
                spend.push(v);
            }
        }
        table.push_float("date", time).unwrap();
        table.push_label("geo", geo).unwrap();
        table.push_float("spend", spend).unwrap();

        let config = SyntheticControlConfig { boundary: Some(9.0), ..base_config() };
        let fit = build_synthetic_control(&table, &config).unwrap();
        assert!(fit.results.iter().all(|r| r.counterfactual.is_finite()));
        assert_eq!(fit.weight_of("C"), Some(0.0));
        assert!(fit.lift.is_some());
    }

    #[test]
    fn test_missing_cells_are_excluded_consistently() {
        let mut table = combo_table(20, 9.0, 0.2);
        // Knock out control B at one pre time and one post time.
        {
            let time = table.float("date").unwrap().to_vec();
            let geo = table.label("geo").unwrap().to_vec();
            let mut spend = table.float("spend").unwrap().to_vec();
            for i in 0..time.len() {
                if geo[i] == "B" && (time[i] == 3.0 || time[i] == 15.0) {
                    spend[i] = f64::NAN;
                }
            }
            let mut t2 = LongTable::new();
            t2.push_float("date", time).unwrap();
            t2.push_label("geo", geo).unwrap();
            t2.push_float("spend", spend).unwrap();
            table = t2;
        }
        let config = SyntheticControlConfig { boundary: Some(9.0), ..base_config() };
        let fit = build_synthetic_control(&table, &config).unwrap();
        // Fit still clean despite the missing pre row.
        assert!(fit.model.pre_mse.is_finite());
        assert!(fit.model.weights.iter().all(|w| w.is_finite()));
        // The post row with the missing control propagates NAN...
        let bad = fit.results.iter().find(|r| r.time == 15.0).unwrap();
        assert!(bad.counterfactual.is_nan());
        // ...and the lift skips it rather than turning NAN.
        let lift = fit.lift.expect("lift defined");
        assert!((lift - 0.2).abs() < 0.05, "lift={}", lift);
    }

    #[test]
    fn test_lift_undefined_cases() {
        // No post rows at all.
        let rows = vec![ResultRow { time: 0.0, actual: 1.0, counterfactual: 1.0, is_post: false }];
        assert!(compute_lift(&rows).is_none());

        // Counterfactual post mean exactly zero.
        let rows = vec![
            ResultRow { time: 1.0, actual: 5.0, counterfactual: 1.0, is_post: true },
            ResultRow { time: 2.0, actual: 5.0, counterfactual: -1.0, is_post: true },
        ];
        assert!(compute_lift(&rows).is_none());

        // All post values missing.
        let rows = vec![ResultRow {
            time: 1.0,
            actual: f64::NAN,
            counterfactual: f64::NAN,
            is_post: true,
        }];
        assert!(compute_lift(&rows).is_none());

        // Well-defined case for contrast.
        let rows = vec![
            ResultRow { time: 1.0, actual: 6.0, counterfactual: 5.0, is_post: true },
            ResultRow { time: 2.0, actual: 6.0, counterfactual: 5.0, is_post: true },
        ];
        let lift = compute_lift(&rows).unwrap();
        assert!((lift - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_fit_bundle_is_json_serializable() {
        let table = combo_table(30, 14.0, 0.2);
        let config =
            SyntheticControlConfig { boundary: Some(14.0), alpha: Some(0.1), ..base_config() };
        let fit = build_synthetic_control(&table, &config).unwrap();
        let json = serde_json::to_string(&fit).unwrap();
        assert!(json.contains("\"method\":\"ridge\""), "{}", json);
        let back: SyntheticControlFit = serde_json::from_str(&json).unwrap();
        assert_eq!(back.control_units, fit.control_units);
        assert_eq!(back.results.len(), fit.results.len());

        // An undefined lift crosses the wire as null, not NaN.
        let rows = vec![ResultRow { time: 0.0, actual: 1.0, counterfactual: 1.0, is_post: false }];
        let undefined = SyntheticControlFit { lift: compute_lift(&rows), results: rows, ..fit };
        let json = serde_json::to_string(&undefined).unwrap();
        assert!(json.contains("\"lift\":null"), "{}", json);
    }

    #[test]
    fn test_insufficient_pre_rows() {
        // Two pre rows: enough for a direct fit, not for CV.
        let table = combo_table(6, 1.0, 0.0);
        let config = SyntheticControlConfig { boundary: Some(1.0), ..base_config() };
        let err = build_synthetic_control(&table, &config).unwrap_err();
        assert!(err.to_string().contains("cross-validate"), "{}", err);

        let config =
            SyntheticControlConfig { boundary: Some(1.0), alpha: Some(0.1), ..base_config() };
        assert!(build_synthetic_control(&table, &config).is_ok());

        // One pre row: nothing can be fit.
        let config = SyntheticControlConfig { boundary: Some(0.0), alpha: Some(0.1), ..base_config() };
        assert!(build_synthetic_control(&table, &config).is_err());
    }
}
