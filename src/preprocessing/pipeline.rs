//! Raw table -> model-ready matrix

use super::encoder::LabelEncoder;
use super::table::{Column, ColumnData, Table};
use super::temporal;
use crate::error::{InsightError, Result};
use ndarray::{Array1, Array2};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Name of the derived calendar feature
pub const MONTH_FEATURE: &str = "month";

/// Substring that marks a temporal column
pub const DATE_MARKER: &str = "date";

/// Output of [`Preprocessor::prepare`]
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Feature matrix, one row per surviving record
    pub x: Array2<f64>,
    /// Target vector aligned with `x`
    pub y: Array1<f64>,
    /// Feature names in column order
    pub feature_names: Vec<String>,
    pub target_column: String,
    /// Temporal column that produced the month feature
    pub date_column: Option<String>,
    pub rows_in: usize,
    pub rows_out: usize,
}

impl PreparedData {
    /// Index of the derived month feature, if a temporal column was found
    pub fn month_index(&self) -> Option<usize> {
        self.date_column.as_ref()?;
        self.feature_names.iter().position(|n| n == MONTH_FEATURE)
    }
}

/// Normalizes a table into numeric features and a target vector
#[derive(Debug, Clone)]
pub struct Preprocessor {
    /// Downsampling cap; `None` keeps every row
    max_rows: Option<usize>,
    random_state: u64,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    pub fn new() -> Self {
        Self { max_rows: None, random_state: 42 }
    }

    /// Downsample tables larger than `max_rows` before any other step
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Run the fixed preprocessing sequence:
    /// sample, drop missing targets, derive month, encode text, drop incomplete rows.
    ///
    /// Missing text is encoded as a category, so only numeric gaps and
    /// unparseable dates reach the final row drop.
    pub fn prepare(&self, table: &Table, target: &str) -> Result<PreparedData> {
        if table.column(target).is_none() {
            return Err(InsightError::DataError(format!("target column '{}' not in table", target)));
        }
        let rows_in = table.height();

        let mut work = self.downsample(table);

        let target_data = &work
            .column(target)
            .ok_or_else(|| InsightError::DataError(format!("target column '{}' not in table", target)))?
            .data;
        let keep: Vec<bool> = (0..work.height()).map(|i| !target_data.is_missing(i)).collect();
        work = work.filter_rows(|i| keep[i]);
        if work.height() == 0 {
            return Err(InsightError::EmptyDataset { stage: "dropping rows with missing target".to_string() });
        }

        let date_column = self.derive_month(&mut work, target)?;

        LabelEncoder::new().fit_transform(&mut work)?;

        let complete: Vec<bool> = (0..work.height())
            .map(|i| work.columns().iter().all(|c| !c.data.is_missing(i)))
            .collect();
        work = work.filter_rows(|i| complete[i]);
        if work.height() == 0 {
            return Err(InsightError::EmptyDataset { stage: "dropping rows with missing values".to_string() });
        }

        let (x, y, feature_names) = to_arrays(&work, target)?;
        info!(
            rows_in,
            rows_out = x.nrows(),
            n_features = feature_names.len(),
            date_column = ?date_column,
            "Preprocessing complete"
        );

        Ok(PreparedData {
            rows_out: x.nrows(),
            x,
            y,
            feature_names,
            target_column: target.to_string(),
            date_column,
            rows_in,
        })
    }

    /// Seeded sample of exactly `max_rows` rows when the table is larger
    fn downsample(&self, table: &Table) -> Table {
        match self.max_rows {
            Some(max_rows) if table.height() > max_rows => {
                let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
                let rows = index::sample(&mut rng, table.height(), max_rows).into_vec();
                debug!(from = table.height(), to = max_rows, "Downsampling table");
                table.take_rows(&rows)
            }
            _ => table.clone(),
        }
    }

    /// Replace the first date-like column by a `month` feature
    fn derive_month(&self, table: &mut Table, target: &str) -> Result<Option<String>> {
        let Some(date_col) = table
            .columns()
            .iter()
            .find(|c| c.name != target && c.name.contains(DATE_MARKER))
            .map(|c| c.name.clone())
        else {
            return Ok(None);
        };

        let Some(source) = table.remove(&date_col) else {
            return Ok(None);
        };
        let months = temporal::months(&source.data);
        debug!(
            column = %date_col,
            unparsed = months.iter().filter(|m| m.is_none()).count(),
            "Derived month feature"
        );
        table.upsert(Column::numeric(MONTH_FEATURE, months))?;
        Ok(Some(date_col))
    }
}

fn to_arrays(table: &Table, target: &str) -> Result<(Array2<f64>, Array1<f64>, Vec<String>)> {
    let n_rows = table.height();
    let mut features: Vec<&[Option<f64>]> = Vec::new();
    let mut names = Vec::new();
    let mut target_values: Option<&[Option<f64>]> = None;

    for column in table.columns() {
        let ColumnData::Numeric(values) = &column.data else {
            return Err(InsightError::DataError(format!("column '{}' was not encoded", column.name)));
        };
        if column.name == target {
            target_values = Some(values.as_slice());
        } else {
            features.push(values.as_slice());
            names.push(column.name.clone());
        }
    }

    let target_values = target_values
        .ok_or_else(|| InsightError::DataError(format!("target column '{}' not in table", target)))?;

    let x = Array2::from_shape_fn((n_rows, features.len()), |(r, c)| features[c][r].unwrap_or(f64::NAN));
    let y: Array1<f64> = target_values.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
    Ok((x, y, names))
}
