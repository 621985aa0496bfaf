//! tabular-insight - automated EDA and regression training for tabular data
//!
//! A table goes in; a sanitized JSON-ready result comes out:
//! - Target inference from column names
//! - Preprocessing: month derivation, label encoding, missing-row removal
//! - Six in-crate regression backends selected by model id
//! - Held-out RMSE / R², diagnostic charts and a month-ahead forecast
//!
//! # Modules
//!
//! ## Core
//! - [`preprocessing`] - Table normalization, target inference, encoding
//! - [`training`] - Regression backends and data splitting
//! - [`evaluation`] - Metrics, learning curves, attribution, diagnostics
//! - [`forecast`] - Month-ahead projection
//! - [`sanitize`] - JSON-safe output normalization
//! - [`pipeline`] - End-to-end training run
//!
//! ## Supporting
//! - [`eda`] - Exploratory summary
//! - [`store`] - Saved results keyed by owner and file
//! - [`visualization`] - Base64 PNG charts
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use tabular_insight::prelude::*;
//!
//! let df = DataLoader::new().load_csv("sales.csv")?;
//! let result = TrainingPipeline::new(PipelineConfig::default())
//!     .run_dataframe(&df, None, "xgboost")?;
//! println!("{}", result.to_json());
//! # Ok::<(), tabular_insight::InsightError>(())
//! ```

pub mod error;
pub mod config;

// Core
pub mod preprocessing;
pub mod training;
pub mod evaluation;
pub mod forecast;
pub mod sanitize;
pub mod pipeline;

// Supporting
pub mod eda;
pub mod store;
pub mod visualization;
pub mod utils;
pub mod cli;

pub use error::{InsightError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{PipelineConfig, RuntimeConfig};
    pub use crate::eda::{summarize, ChartGenerator, EdaReport, NoCharts, TopValueCharts};
    pub use crate::error::{InsightError, Result};
    pub use crate::evaluation::{Diagnostics, RegressionMetrics};
    pub use crate::forecast::{Forecast, ForecastEngine};
    pub use crate::pipeline::{EvaluationResult, TrainingPipeline};
    pub use crate::preprocessing::{Column, ColumnData, PreparedData, Preprocessor, Table, TargetInferer};
    pub use crate::sanitize::{sanitize, RawValue};
    pub use crate::store::{InMemoryResultStore, ResultStore, SavedResult};
    pub use crate::training::{ModelKind, Regressor, TrainedModel};
    pub use crate::utils::DataLoader;
}
