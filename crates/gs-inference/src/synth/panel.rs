//! Long-format panel tables and time-by-unit pivoting.
//!
//! The raw input is a long table: one row per (time, unit, outcome)
//! observation, addressed by column name. Reshaping turns it into a
//! [`PivotedPanel`] -- an explicit row-major 2D array with an ordered
//! time index (rows) and an ordered unit index (columns). Label lookups
//! resolve to column offsets once here; later pipeline stages work with
//! offsets only.

use std::collections::HashMap;

use gs_core::{Error, Result};

/// A single column of a [`LongTable`].
#[derive(Debug, Clone)]
pub enum Column {
    /// Numeric column (time values, outcomes). `NAN` marks a missing value.
    Float(Vec<f64>),
    /// Categorical label column (unit identifiers).
    Label(Vec<String>),
}

impl Column {
    fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Label(v) => v.len(),
        }
    }
}

/// Minimal column-oriented long-format table.
///
/// All columns share one length; names are unique. This is input
/// plumbing, not a dataframe: just enough structure to select the
/// time/unit/outcome columns by name and fail loudly when a caller
/// names a column that does not exist or has the wrong type.
#[derive(Debug, Clone, Default)]
pub struct LongTable {
    n_rows: usize,
    columns: Vec<(String, Column)>,
}

impl LongTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// True when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Add a numeric column. Fails on a duplicate name or a length
    /// mismatch with existing columns.
    pub fn push_float(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        self.push_column(name.into(), Column::Float(values))
    }

    /// Add a label column. Fails on a duplicate name or a length
    /// mismatch with existing columns.
    pub fn push_label(&mut self, name: impl Into<String>, values: Vec<String>) -> Result<()> {
        self.push_column(name.into(), Column::Label(values))
    }

    fn push_column(&mut self, name: String, column: Column) -> Result<()> {
        if self.columns.iter().any(|(n, _)| *n == name) {
            return Err(Error::Validation(format!("duplicate column name '{}'", name)));
        }
        if self.columns.is_empty() {
            self.n_rows = column.len();
        } else if column.len() != self.n_rows {
            return Err(Error::Validation(format!(
                "column '{}' has {} rows, expected {}",
                name,
                column.len(),
                self.n_rows
            )));
        }
        self.columns.push((name, column));
        Ok(())
    }

    /// Numeric column by name.
    pub fn float(&self, name: &str) -> Result<&[f64]> {
        match self.find(name)? {
            Column::Float(v) => Ok(v),
            Column::Label(_) => {
                Err(Error::Validation(format!("column '{}' is not numeric", name)))
            }
        }
    }

    /// Label column by name.
    pub fn label(&self, name: &str) -> Result<&[String]> {
        match self.find(name)? {
            Column::Label(v) => Ok(v),
            Column::Float(_) => {
                Err(Error::Validation(format!("column '{}' is not a label column", name)))
            }
        }
    }

    fn find(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
            .ok_or_else(|| Error::Validation(format!("column '{}' not found", name)))
    }
}

/// Time-by-unit matrix produced by [`pivot_mean`].
///
/// Row-major storage; `times` is the ordered row index (unique,
/// ascending), `units` the ordered column index. Cells with no
/// supporting observations are `NAN`.
#[derive(Debug, Clone)]
pub struct PivotedPanel {
    times: Vec<f64>,
    units: Vec<String>,
    values: Vec<f64>,
}

impl PivotedPanel {
    /// Ordered row index (unique time values, ascending).
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Ordered column index (unit labels).
    pub fn units(&self) -> &[String] {
        &self.units
    }

    /// Number of time rows.
    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// Number of unit columns.
    pub fn n_units(&self) -> usize {
        self.units.len()
    }

    /// Cell value at (row, column).
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.units.len() + col]
    }

    /// Column offset of a unit label, if present.
    pub fn column_index(&self, unit: &str) -> Option<usize> {
        self.units.iter().position(|u| u == unit)
    }

    /// Copy of one unit's column, in time order.
    pub fn column_of(&self, unit: &str) -> Result<Vec<f64>> {
        let j = self
            .column_index(unit)
            .ok_or_else(|| Error::Validation(format!("unit '{}' not found in pivot", unit)))?;
        Ok((0..self.n_times()).map(|i| self.value(i, j)).collect())
    }

    /// Gather the named unit columns into a row-major `n_times x units.len()`
    /// matrix, preserving the given unit order.
    pub fn gather(&self, units: &[String]) -> Result<Vec<f64>> {
        let cols: Vec<usize> = units
            .iter()
            .map(|u| {
                self.column_index(u)
                    .ok_or_else(|| Error::Validation(format!("unit '{}' not found in pivot", u)))
            })
            .collect::<Result<_>>()?;
        let mut out = Vec::with_capacity(self.n_times() * cols.len());
        for i in 0..self.n_times() {
            for &j in &cols {
                out.push(self.value(i, j));
            }
        }
        Ok(out)
    }

    /// Rows with `time <= boundary`, all columns kept.
    ///
    /// Because `times` is sorted, the result's rows are a strict prefix
    /// of this panel's rows.
    pub fn pre_slice(&self, boundary: f64) -> PivotedPanel {
        let n_pre = self.times.iter().take_while(|&&t| t <= boundary).count();
        PivotedPanel {
            times: self.times[..n_pre].to_vec(),
            units: self.units.clone(),
            values: self.values[..n_pre * self.units.len()].to_vec(),
        }
    }
}

/// Pivot a long table into a time-by-unit matrix, averaging duplicate
/// (time, unit) observations.
///
/// Every time value of the source appears exactly once as a row and
/// every unit exactly once as a column. Non-finite outcome values are
/// treated as missing; a cell whose observations are all missing stays
/// `NAN`. Unit columns are sorted lexicographically.
pub fn pivot_mean(
    table: &LongTable,
    time_col: &str,
    unit_col: &str,
    outcome_col: &str,
) -> Result<PivotedPanel> {
    let times_raw = table.float(time_col)?;
    let units_raw = table.label(unit_col)?;
    let outcomes = table.float(outcome_col)?;

    if table.is_empty() {
        return Err(Error::Validation("panel table has no rows".to_string()));
    }
    if times_raw.iter().any(|t| !t.is_finite()) {
        return Err(Error::Validation(format!(
            "time column '{}' contains non-finite values",
            time_col
        )));
    }

    let mut times: Vec<f64> = times_raw.to_vec();
    times.sort_by(|a, b| a.partial_cmp(b).expect("finite times"));
    times.dedup();

    let mut units: Vec<String> = units_raw.to_vec();
    units.sort();
    units.dedup();

    let unit_index: HashMap<&str, usize> =
        units.iter().enumerate().map(|(j, u)| (u.as_str(), j)).collect();

    let n_cells = times.len() * units.len();
    let mut sums = vec![0.0_f64; n_cells];
    let mut counts = vec![0usize; n_cells];

    for row in 0..table.n_rows() {
        let v = outcomes[row];
        if !v.is_finite() {
            continue;
        }
        let t = times_raw[row];
        let i = times
            .binary_search_by(|probe| probe.partial_cmp(&t).expect("finite times"))
            .expect("time present in sorted index");
        let j = unit_index[units_raw[row].as_str()];
        sums[i * units.len() + j] += v;
        counts[i * units.len() + j] += 1;
    }

    let values: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { f64::NAN })
        .collect();

    Ok(PivotedPanel { times, units, values })
}

/// Median of a slice of time values (mean of the two middle order
/// statistics for even counts).
///
/// This is the median of the *values*, duplicates included -- for
/// unevenly spaced or unbalanced panels it does not correspond to a
/// median row of the pivot, and that is intentional.
pub fn median_time(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::Validation("cannot take the median of no time values".to_string()));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(Error::Validation("time values must be finite".to_string()));
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite times"));
    let n = sorted.len();
    if n % 2 == 1 {
        Ok(sorted[n / 2])
    } else {
        Ok(0.5 * (sorted[n / 2 - 1] + sorted[n / 2]))
    }
}
