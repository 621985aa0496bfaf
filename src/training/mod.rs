//! Model training module
//!
//! Regression backends behind a single [`Regressor`] trait:
//! - Ordinary least squares
//! - Decision tree and random forest
//! - XGBoost-style and LightGBM-style gradient boosting
//! - Feed-forward neural network (hand-written Adam loop)

mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod lightgbm;
pub mod linear_models;
pub mod neural_network;
pub mod random_forest;
pub mod xgboost;

pub use cross_validation::{train_test_split, CVSplit, KFold};
pub use decision_tree::{DecisionTree, TreeNode};
pub use lightgbm::{LightGBMConfig, LightGBMRegressor};
pub use linear_models::LinearRegression;
pub use models::{ModelKind, Regressor, TrainedModel};
pub use neural_network::{MLPConfig, MLPRegressor};
pub use random_forest::{MaxFeatures, RandomForest};
pub use xgboost::{XGBoostConfig, XGBoostRegressor};

use crate::error::{InsightError, Result};
use ndarray::{Array1, Array2, Axis};
use tracing::{info, warn};

/// Build the backend for `model_id` and fit it. Unknown ids train the
/// random forest default.
pub fn train(model_id: &str, x: &Array2<f64>, y: &Array1<f64>, seed: u64) -> Result<TrainedModel> {
    let kind = ModelKind::from_id(model_id);
    if ModelKind::is_fallback(model_id) {
        warn!(model_id, fallback = %kind, "Unrecognized model id, using default backend");
    }

    let mut model = TrainedModel::build(kind, seed);
    model.fit(x, y).map_err(|e| InsightError::TrainingBackend {
        backend: kind.id().to_string(),
        reason: e.to_string(),
    })?;

    info!(backend = %kind, n_samples = x.nrows(), n_features = x.ncols(), "Model trained");
    Ok(model)
}

/// Gather rows of `x` and `y` by index
pub fn select_rows(x: &Array2<f64>, y: &Array1<f64>, rows: &[usize]) -> (Array2<f64>, Array1<f64>) {
    (x.select(Axis(0), rows), y.select(Axis(0), rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_train_unknown_id() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];
        let model = train("gradient_magic", &x, &y, 42).unwrap();
        assert_eq!(model.kind(), ModelKind::RandomForest);
    }

    #[test]
    fn test_train_reports_backend_failure() {
        let x = array![[1.0], [f64::NAN]];
        let y = array![1.0, 2.0];
        let err = train("linear_regression", &x, &y, 42).unwrap_err();
        assert!(matches!(err, InsightError::TrainingBackend { ref backend, .. } if backend == "linear_regression"));
    }
}
