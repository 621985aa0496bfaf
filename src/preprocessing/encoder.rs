//! Per-call label encoding of text columns

use super::table::{ColumnData, Table};
use std::collections::BTreeMap;

/// Category -> code mapping for one column
pub type Mapping = BTreeMap<String, usize>;

/// Category that missing text values are encoded as
pub const MISSING_CATEGORY: &str = "nan";

/// Label encoder. Codes follow the sorted order of distinct values so the
/// same input always encodes the same way. Missing values become the
/// [`MISSING_CATEGORY`] category, so they never drop a row. An encoder lives
/// for a single preprocessing call and is never persisted.
#[derive(Debug, Clone, Default)]
pub struct LabelEncoder {
    mappings: Vec<(String, Mapping)>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode every text column of `table` in place, returning the mappings
    pub fn fit_transform(mut self, table: &mut Table) -> crate::error::Result<Self> {
        let text_columns: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| !c.data.is_numeric())
            .map(|c| c.name.clone())
            .collect();

        for name in text_columns {
            let Some(column) = table.column(&name) else { continue };
            let ColumnData::Text(values) = &column.data else { continue };

            let mapping = build_mapping(values);
            let encoded: Vec<Option<f64>> = values
                .iter()
                .map(|v| mapping.get(v.as_deref().unwrap_or(MISSING_CATEGORY)).map(|&code| code as f64))
                .collect();

            table.upsert(super::table::Column::numeric(name.clone(), encoded))?;
            self.mappings.push((name, mapping));
        }

        Ok(self)
    }

    /// Mapping used for a column, if it was encoded
    pub fn mapping(&self, column: &str) -> Option<&Mapping> {
        self.mappings.iter().find(|(name, _)| name == column).map(|(_, m)| m)
    }

    pub fn encoded_columns(&self) -> Vec<&str> {
        self.mappings.iter().map(|(name, _)| name.as_str()).collect()
    }
}

fn build_mapping(values: &[Option<String>]) -> Mapping {
    let mut mapping: Mapping = values
        .iter()
        .map(|v| (v.clone().unwrap_or_else(|| MISSING_CATEGORY.to_string()), 0))
        .collect();
    for (code, slot) in mapping.values_mut().enumerate() {
        *slot = code;
    }
    mapping
}
