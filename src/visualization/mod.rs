//! Visualization module: static charts returned as base64-encoded PNG.

pub mod chart;
pub use chart::{ChartRenderer, Histogram};
