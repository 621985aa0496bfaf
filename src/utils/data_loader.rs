//! Data loading utilities

use crate::error::{InsightError, Result};
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Loads tabular files into polars data frames
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows scanned for schema inference
    infer_schema_length: Option<usize>,
    delimiter: u8,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(100),
            delimiter: b',',
        }
    }

    /// Set number of rows used for schema inference (`None` scans everything)
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Set field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| InsightError::DataError(format!("{}: {}", path.display(), e)))?;

        let df = self.csv_options().into_reader_with_file_handle(file).finish()?;
        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Loaded CSV");
        Ok(df)
    }

    /// Parse CSV content already held in memory (e.g. an uploaded file)
    pub fn load_csv_bytes(&self, bytes: Vec<u8>) -> Result<DataFrame> {
        let df = self
            .csv_options()
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;
        Ok(df)
    }

    /// Load a line-delimited JSON file
    pub fn load_json(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| InsightError::DataError(format!("{}: {}", path.display(), e)))?;

        JsonReader::new(file)
            .with_json_format(JsonFormat::JsonLines)
            .finish()
            .map_err(|e| InsightError::DataError(e.to_string()))
    }

    /// Detect file format from extension and load
    pub fn load_auto(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let lower = path.to_string_lossy().to_lowercase();

        if lower.ends_with(".tsv") {
            self.clone().with_delimiter(b'\t').load_csv(path)
        } else if lower.ends_with(".json") || lower.ends_with(".jsonl") {
            self.load_json(path)
        } else {
            self.load_csv(path)
        }
    }

    /// Name, size and shape of a file, without keeping the data around
    pub fn file_info(&self, path: impl AsRef<Path>) -> Result<FileInfo> {
        let path = path.as_ref();
        let file_size = std::fs::metadata(path)?.len();
        let df = self.load_auto(path)?;

        Ok(FileInfo {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            file_size,
            n_rows: df.height(),
            n_cols: df.width(),
        })
    }

    fn csv_options(&self) -> CsvReadOptions {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(CsvParseOptions::default().with_separator(self.delimiter))
    }
}

/// File information
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub file_name: String,
    pub file_size: u64,
    pub n_rows: usize,
    pub n_cols: usize,
}

impl FileInfo {
    /// Shape description stored alongside results, e.g. "5 rows, 3 columns"
    pub fn shape_label(&self) -> String {
        format!("{} rows, {} columns", self.n_rows, self.n_cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_csv() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "feature1,target").unwrap();
        writeln!(file, "1,3").unwrap();
        writeln!(file, "2,5").unwrap();

        let df = DataLoader::new().load_auto(file.path()).unwrap();
        assert_eq!(df.shape(), (2, 2));
    }

    #[test]
    fn test_load_csv_bytes() {
        let df = DataLoader::new()
            .load_csv_bytes(b"a,b\n1,x\n2,y\n".to_vec())
            .unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = DataLoader::new().load_csv("/nonexistent/data.csv").unwrap_err();
        assert!(matches!(err, InsightError::DataError(_)));
    }

    #[test]
    fn test_file_info() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "x,y,revenue").unwrap();
        writeln!(file, "1,2,3").unwrap();

        let info = DataLoader::new().file_info(file.path()).unwrap();
        assert_eq!(info.shape_label(), "1 rows, 3 columns");
    }
}
