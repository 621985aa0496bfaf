//! Normalized in-memory table

use crate::error::{InsightError, Result};
use polars::prelude::*;
use std::collections::HashSet;

/// Values of one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Numeric values, `None` for missing (NaN counts as missing)
    Numeric(Vec<Option<f64>>),
    /// Everything else, rendered as text
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Numeric(_))
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(v) => v[row].is_none(),
            ColumnData::Text(v) => v[row].is_none(),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_missing(i)).count()
    }

    /// Distinct non-missing values
    pub fn n_unique(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v
                .iter()
                .flatten()
                .map(|x| x.to_bits())
                .collect::<HashSet<_>>()
                .len(),
            ColumnData::Text(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
        }
    }

    /// Dtype label implied by the values alone
    pub fn dtype_name(&self) -> &'static str {
        match self {
            ColumnData::Numeric(_) => "float64",
            ColumnData::Text(_) => "object",
        }
    }

    fn take(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
    /// Dtype of the frame column this was converted from
    pub source_dtype: Option<&'static str>,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self { name: name.into(), data: ColumnData::Numeric(values), source_dtype: None }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self { name: name.into(), data: ColumnData::Text(values), source_dtype: None }
    }

    /// Source dtype when known, else the label implied by the values
    pub fn dtype_label(&self) -> &'static str {
        self.source_dtype.unwrap_or_else(|| self.data.dtype_name())
    }
}

/// Summary label for a polars dtype, in the naming data-frame users expect
fn dtype_label(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Int32 => "int32",
        DataType::Int64 => "int64",
        DataType::UInt32 => "uint32",
        DataType::UInt64 => "uint64",
        DataType::Float32 => "float32",
        DataType::Float64 => "float64",
        DataType::Boolean => "bool",
        DataType::Date | DataType::Datetime(_, _) => "datetime64[ns]",
        _ => "object",
    }
}

/// Ordered collection of equal-length, uniquely named columns.
///
/// Names are lower-cased and trimmed on construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table, normalizing names and checking lengths and uniqueness
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(columns.len());

        for mut column in columns {
            column.name = normalize_name(&column.name);
            if column.data.len() != n_rows {
                return Err(InsightError::ShapeError {
                    expected: format!("{} rows in column '{}'", n_rows, column.name),
                    actual: format!("{} rows", column.data.len()),
                });
            }
            if !seen.insert(column.name.clone()) {
                return Err(InsightError::DataError(format!(
                    "duplicate column name after normalization: '{}'",
                    column.name
                )));
            }
            normalized.push(column);
        }

        Ok(Self { columns: normalized, n_rows })
    }

    /// Convert a polars frame. Numeric and boolean columns become
    /// [`ColumnData::Numeric`]; every other dtype (strings, dates, datetimes)
    /// is rendered as text.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let mut columns = Vec::with_capacity(df.width());

        for column in df.get_columns() {
            let name = column.name().as_str().to_string();
            let series = column.as_materialized_series();
            let dtype = series.dtype();

            let data = if dtype.is_integer() || dtype.is_float() || matches!(dtype, DataType::Boolean) {
                let casted = series.cast(&DataType::Float64)?;
                let values = casted
                    .f64()?
                    .into_iter()
                    .map(|v| v.filter(|x| !x.is_nan()))
                    .collect();
                ColumnData::Numeric(values)
            } else {
                let casted = series.cast(&DataType::String)?;
                let values = casted
                    .str()?
                    .into_iter()
                    .map(|v| v.map(str::to_string))
                    .collect();
                ColumnData::Text(values)
            };

            columns.push(Column { name, data, source_dtype: Some(dtype_label(dtype)) });
        }

        Self::new(columns)
    }

    pub fn height(&self) -> usize {
        self.n_rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Remove a column, returning it
    pub fn remove(&mut self, name: &str) -> Option<Column> {
        let idx = self.position(name)?;
        Some(self.columns.remove(idx))
    }

    /// Replace a column with the same name in place, or append it
    pub fn upsert(&mut self, column: Column) -> Result<()> {
        if column.data.len() != self.n_rows && !self.columns.is_empty() {
            return Err(InsightError::ShapeError {
                expected: format!("{} rows", self.n_rows),
                actual: format!("{} rows", column.data.len()),
            });
        }
        if self.columns.is_empty() {
            self.n_rows = column.data.len();
        }
        match self.position(&column.name) {
            Some(idx) => self.columns[idx] = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Keep only the given rows, in the given order
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column { name: c.name.clone(), data: c.data.take(rows), source_dtype: c.source_dtype })
                .collect(),
            n_rows: rows.len(),
        }
    }

    /// Keep rows for which `keep` returns true
    pub fn filter_rows<F: Fn(usize) -> bool>(&self, keep: F) -> Table {
        let rows: Vec<usize> = (0..self.n_rows).filter(|&i| keep(i)).collect();
        self.take_rows(&rows)
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> Table {
        let rows: Vec<usize> = (0..self.n_rows.min(n)).collect();
        self.take_rows(&rows)
    }
}

/// Lower-case and trim a column name
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_normalized() {
        let table = Table::new(vec![
            Column::numeric("  Revenue ", vec![Some(1.0)]),
            Column::text("Region", vec![Some("north".into())]),
        ])
        .unwrap();

        assert_eq!(table.names(), vec!["revenue", "region"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = Table::new(vec![
            Column::numeric("Sales", vec![Some(1.0)]),
            Column::numeric("sales ", vec![Some(2.0)]),
        ]);
        assert!(matches!(result, Err(InsightError::DataError(_))));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = Table::new(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0)]),
            Column::numeric("b", vec![Some(1.0)]),
        ]);
        assert!(matches!(result, Err(InsightError::ShapeError { .. })));
    }

    #[test]
    fn test_from_dataframe() {
        let df = df!(
            "Feature1" => &[1i64, 2, 3],
            "name" => &[Some("a"), None, Some("c")],
            "Target" => &[Some(1.5), Some(f64::NAN), None]
        )
        .unwrap();

        let table = Table::from_dataframe(&df).unwrap();
        assert_eq!(table.shape(), (3, 3));
        assert_eq!(table.names(), vec!["feature1", "name", "target"]);
        assert!(table.column("feature1").unwrap().data.is_numeric());
        assert!(!table.column("name").unwrap().data.is_numeric());
        assert_eq!(table.column("name").unwrap().data.null_count(), 1);
        assert_eq!(table.column("target").unwrap().data.null_count(), 2);
    }

    #[test]
    fn test_source_dtype_labels() {
        let df = df!(
            "units" => &[1i64, 2],
            "small" => &[1i32, 2],
            "flag" => &[true, false],
            "price" => &[1.5, 2.5],
            "name" => &["a", "b"]
        )
        .unwrap();

        let table = Table::from_dataframe(&df).unwrap();
        let labels: Vec<&str> = table.columns().iter().map(Column::dtype_label).collect();
        assert_eq!(labels, vec!["int64", "int32", "bool", "float64", "object"]);

        // Row selection keeps the label
        let taken = table.take_rows(&[1]);
        assert_eq!(taken.column("flag").unwrap().dtype_label(), "bool");

        // Columns built in memory fall back to the value kind
        assert_eq!(Column::numeric("m", vec![Some(1.0)]).dtype_label(), "float64");
    }

    #[test]
    fn test_upsert_and_take() {
        let mut table = Table::new(vec![Column::numeric("a", vec![Some(1.0), Some(2.0), Some(3.0)])]).unwrap();
        table.upsert(Column::numeric("b", vec![Some(4.0), Some(5.0), Some(6.0)])).unwrap();
        table.upsert(Column::numeric("a", vec![Some(7.0), Some(8.0), Some(9.0)])).unwrap();

        assert_eq!(table.names(), vec!["a", "b"]);

        let taken = table.take_rows(&[2, 0]);
        assert_eq!(
            taken.column("a").unwrap().data,
            ColumnData::Numeric(vec![Some(9.0), Some(7.0)])
        );
    }
}
