//! Data preprocessing module
//!
//! Turns an uploaded table into a numeric feature matrix:
//! - Column name normalization and target inference
//! - Month derivation from date-like columns
//! - Deterministic label encoding of text columns
//! - Missing value removal and seeded downsampling

mod encoder;
mod pipeline;
pub mod table;
pub mod target;
pub mod temporal;

pub use encoder::{LabelEncoder, Mapping, MISSING_CATEGORY};
pub use pipeline::{PreparedData, Preprocessor, DATE_MARKER, MONTH_FEATURE};
pub use table::{Column, ColumnData, Table};
pub use target::{TargetInferer, TARGET_KEYWORDS};
