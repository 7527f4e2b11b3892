//! Regularization-strength selection via expanding-window cross-validation.
//!
//! The pre-period rows are already in time order, so fold construction
//! is purely positional: fold `i` trains on a prefix of the rows and
//! validates on the block immediately after it. Training rows always
//! precede validation rows -- validating on the past would leak the
//! intervention-free future into the fit and is treated as a
//! correctness bug, not a style choice.

use gs_core::{Error, Result};

use super::solver::{fit_nonneg, mean_squared_error, Method};

/// Default strength grid: 7 logarithmically spaced points spanning
/// `1e-3 ..= 1e3`.
pub fn default_alpha_grid() -> Vec<f64> {
    (0..7).map(|i| 10f64.powi(i - 3)).collect()
}

/// One expanding-window fold over `n` time-ordered rows.
///
/// Training rows are `0 .. train_end`; validation rows are
/// `train_end .. test_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fold {
    /// Exclusive end of the training prefix.
    pub train_end: usize,
    /// Exclusive end of the validation block.
    pub test_end: usize,
}

/// Build `k` expanding-window folds over `n` time-ordered rows.
///
/// The validation block size is `n / (k + 1)` (integer division); the
/// validation blocks tile the tail of the rows and the first training
/// prefix absorbs the remainder. Requires `2 <= k < n` so every fold
/// has at least one training and one validation row.
pub fn expanding_window_folds(n: usize, k: usize) -> Result<Vec<Fold>> {
    if k < 2 {
        return Err(Error::Validation(format!(
            "expanding-window CV needs at least 2 folds, got {}",
            k
        )));
    }
    if n < k + 1 {
        return Err(Error::Validation(format!(
            "{} rows are too few for {} expanding-window folds",
            n, k
        )));
    }
    let test_size = n / (k + 1);
    let mut folds = Vec::with_capacity(k);
    for i in 0..k {
        let train_end = n - (k - i) * test_size;
        folds.push(Fold { train_end, test_end: train_end + test_size });
    }
    Ok(folds)
}

/// Outcome of a grid search.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Selected regularization strength.
    pub alpha: f64,
    /// Average validation MSE at the selected strength.
    pub cv_mse: f64,
}

/// Select the strength with the lowest average validation MSE over the
/// expanding-window folds.
///
/// `x` is the standardized pre-period control matrix (row-major
/// `n x p`, complete rows only, time order); `y` the treated unit's
/// pre-period outcomes. Ties prefer the smaller strength: the grid is
/// scanned in ascending order and only a strictly lower score replaces
/// the incumbent.
pub fn select_alpha(
    method: Method,
    grid: &[f64],
    x: &[f64],
    y: &[f64],
    n: usize,
    p: usize,
    k: usize,
) -> Result<SelectionResult> {
    if grid.is_empty() {
        return Err(Error::Validation("strength grid must be non-empty".to_string()));
    }
    let folds = expanding_window_folds(n, k)?;

    let mut best: Option<SelectionResult> = None;
    for &alpha in grid {
        let mut total = 0.0;
        for fold in &folds {
            let train_x = &x[..fold.train_end * p];
            let train_y = &y[..fold.train_end];
            let fit = fit_nonneg(method, alpha, train_x, train_y, fold.train_end, p)?;

            let val_x = &x[fold.train_end * p..fold.test_end * p];
            let val_y = &y[fold.train_end..fold.test_end];
            let pred = fit.predict(val_x, fold.test_end - fold.train_end)?;
            total += mean_squared_error(val_y, &pred)?;
        }
        let score = total / folds.len() as f64;
        let better = match &best {
            None => true,
            Some(b) => score < b.cv_mse,
        };
        if better {
            best = Some(SelectionResult { alpha, cv_mse: score });
        }
    }

    // Grid is non-empty, so a best candidate always exists.
    best.ok_or_else(|| Error::Computation("grid search produced no candidate".to_string()))
}
