//! Per-column standardization fit on the pre-period only.
//!
//! The transform is fit once, on the complete pre-period rows of the
//! control matrix, and then reused verbatim wherever control outcomes
//! feed the model -- including the projection across the full timeline.
//! Refitting on post-period or full-timeline data would leak
//! post-intervention information into the counterfactual.

use gs_core::{Error, Result};

/// Per-column affine transform `(x - mean) / scale`.
///
/// Scales are population standard deviations; a column with zero
/// variance gets scale 1.0 so it maps to a constant zero instead of
/// dividing by zero. The column stays in the model and the regularizer
/// decides its weight.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit means and scales over the rows of a row-major `n x p` matrix
    /// selected by `row_mask`.
    pub fn fit(x: &[f64], n_rows: usize, n_cols: usize, row_mask: &[bool]) -> Result<Self> {
        if n_cols == 0 {
            return Err(Error::Validation("scaler needs at least one column".to_string()));
        }
        if x.len() != n_rows * n_cols {
            return Err(Error::Validation(format!(
                "matrix has length {}, expected {}x{}",
                x.len(),
                n_rows,
                n_cols
            )));
        }
        if row_mask.len() != n_rows {
            return Err(Error::Validation(format!(
                "row mask has length {}, expected {}",
                row_mask.len(),
                n_rows
            )));
        }
        let n_used = row_mask.iter().filter(|&&m| m).count();
        if n_used == 0 {
            return Err(Error::Validation("no complete rows to fit the scaler on".to_string()));
        }

        let mut means = vec![0.0_f64; n_cols];
        for i in 0..n_rows {
            if !row_mask[i] {
                continue;
            }
            for j in 0..n_cols {
                means[j] += x[i * n_cols + j];
            }
        }
        for m in means.iter_mut() {
            *m /= n_used as f64;
        }

        let mut scales = vec![0.0_f64; n_cols];
        for i in 0..n_rows {
            if !row_mask[i] {
                continue;
            }
            for j in 0..n_cols {
                let d = x[i * n_cols + j] - means[j];
                scales[j] += d * d;
            }
        }
        for s in scales.iter_mut() {
            let sd = (*s / n_used as f64).sqrt();
            *s = if sd > 0.0 { sd } else { 1.0 };
        }

        Ok(Self { means, scales })
    }

    /// Number of columns this scaler was fit on.
    pub fn n_cols(&self) -> usize {
        self.means.len()
    }

    /// Fitted per-column means.
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Fitted per-column scales.
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// Apply `(x - mean) / scale` to a row-major matrix with the same
    /// column layout. `NAN` cells propagate.
    pub fn transform(&self, x: &[f64], n_rows: usize) -> Result<Vec<f64>> {
        let p = self.n_cols();
        if x.len() != n_rows * p {
            return Err(Error::Validation(format!(
                "matrix has length {}, expected {}x{}",
                x.len(),
                n_rows,
                p
            )));
        }
        let mut out = Vec::with_capacity(x.len());
        for i in 0..n_rows {
            for j in 0..p {
                out.push((x[i * p + j] - self.means[j]) / self.scales[j]);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_and_transform() {
        // Two columns: [1,2,3] and [10,10,10].
        let x = vec![1.0, 10.0, 2.0, 10.0, 3.0, 10.0];
        let mask = vec![true, true, true];
        let s = StandardScaler::fit(&x, 3, 2, &mask).unwrap();
        assert!((s.means()[0] - 2.0).abs() < 1e-12);
        assert!((s.scales()[0] - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
        // Zero-variance column floors to scale 1.0.
        assert_eq!(s.scales()[1], 1.0);

        let t = s.transform(&x, 3).unwrap();
        // Constant column becomes exactly zero.
        assert_eq!(t[1], 0.0);
        assert_eq!(t[3], 0.0);
        assert_eq!(t[5], 0.0);
        // Standardized column has mean 0.
        let mean0 = (t[0] + t[2] + t[4]) / 3.0;
        assert!(mean0.abs() < 1e-12);
    }

    #[test]
    fn test_masked_rows_excluded_from_fit() {
        let x = vec![1.0, 2.0, 1000.0];
        let s = StandardScaler::fit(&x, 3, 1, &[true, true, false]).unwrap();
        assert!((s.means()[0] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_nan_propagates_through_transform() {
        let x = vec![1.0, 2.0, 3.0];
        let s = StandardScaler::fit(&x, 3, 1, &[true, true, true]).unwrap();
        let t = s.transform(&[f64::NAN, 2.0], 2).unwrap();
        assert!(t[0].is_nan());
        assert!(t[1].is_finite());
    }

    #[test]
    fn test_fit_validation() {
        assert!(StandardScaler::fit(&[1.0], 1, 1, &[false]).is_err());
        assert!(StandardScaler::fit(&[1.0, 2.0], 1, 1, &[true]).is_err());
        assert!(StandardScaler::fit(&[], 0, 0, &[]).is_err());
    }
}
