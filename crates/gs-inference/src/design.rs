//! Two-level factorial design matrices for experiment planning.
//!
//! Full factorial designs for 2..=4 binary factors, and 16-run
//! fractional designs of resolution IV or better for 5 and 6 factors,
//! so main effects are never confounded with two-factor interactions.
//!
//! # References
//!
//! - Box, Hunter & Hunter, *Statistics for Experimenters*, Ch. 12.

use nalgebra::DMatrix;

use gs_core::{Error, Result};

/// Generate a two-level design matrix for `n_factors` binary factors.
///
/// Entries are -1.0 / +1.0, one run per row, one factor per column:
///
/// - 2..=4 factors: full factorial, `2^k` runs, columns from the binary
///   representation of the run index.
/// - 5 factors: half fraction `2^(5-1)` (16 runs), generator E = ABCD.
/// - 6 factors: quarter fraction `2^(6-2)` (16 runs), generators
///   E = ABC and F = ABD.
///
/// Factor counts outside 2..=6 are rejected.
pub fn ff_design(n_factors: usize) -> Result<DMatrix<f64>> {
    if !(2..=6).contains(&n_factors) {
        return Err(Error::Validation(format!(
            "number of factors must be between 2 and 6, got {}",
            n_factors
        )));
    }

    if n_factors <= 4 {
        let runs = 1usize << n_factors;
        let mut design = DMatrix::zeros(runs, n_factors);
        for i in 0..runs {
            for j in 0..n_factors {
                design[(i, j)] = (2 * ((i >> j) & 1)) as f64 - 1.0;
            }
        }
        return Ok(design);
    }

    let base = ff_design(4)?;
    let runs = base.nrows();
    let mut design = DMatrix::zeros(runs, n_factors);
    design.view_mut((0, 0), (runs, 4)).copy_from(&base);

    if n_factors == 5 {
        for i in 0..runs {
            design[(i, 4)] = base[(i, 0)] * base[(i, 1)] * base[(i, 2)] * base[(i, 3)];
        }
    } else {
        for i in 0..runs {
            design[(i, 4)] = base[(i, 0)] * base[(i, 1)] * base[(i, 2)];
            design[(i, 5)] = base[(i, 0)] * base[(i, 1)] * base[(i, 3)];
        }
    }
    Ok(design)
}
