//! Evaluation module
//!
//! Held-out metrics plus the diagnostic artifacts attached to a run:
//! residual plots, learning curves and sampled Shapley attributions.

pub mod attribution;
pub mod diagnostics;
pub mod learning_curve;
pub mod metrics;

pub use attribution::{FeatureContribution, LocalExplainer, LocalExplanation, ShapSummary};
pub use diagnostics::{DiagnosticInputs, Diagnostics, DiagnosticsGenerator};
pub use learning_curve::{learning_curve, LearningCurve, LearningCurveConfig};
pub use metrics::{rmse, RegressionMetrics};
