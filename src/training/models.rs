//! Regressor trait and the model registry

use super::decision_tree::DecisionTree;
use super::lightgbm::LightGBMRegressor;
use super::linear_models::LinearRegression;
use super::neural_network::MLPRegressor;
use super::random_forest::RandomForest;
use super::xgboost::XGBoostRegressor;
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trait for regression backends
pub trait Regressor: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Per-feature importances, if the backend exposes them
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }

    /// Canonical model id
    fn name(&self) -> &'static str;

    /// Whether attribution summaries are attempted for this backend
    fn supports_attribution(&self) -> bool {
        false
    }
}

/// Recognized regression backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    LinearRegression,
    DecisionTree,
    XGBoost,
    LightGBM,
    NeuralNetwork,
    /// Default for any unrecognized id
    RandomForest,
}

impl ModelKind {
    /// Every kind, in display order
    pub const ALL: [ModelKind; 6] = [
        ModelKind::LinearRegression,
        ModelKind::DecisionTree,
        ModelKind::XGBoost,
        ModelKind::LightGBM,
        ModelKind::NeuralNetwork,
        ModelKind::RandomForest,
    ];

    /// Resolve a model id. Unknown ids resolve to [`ModelKind::RandomForest`].
    pub fn from_id(id: &str) -> Self {
        match id {
            "linear_regression" => ModelKind::LinearRegression,
            "decision_tree" => ModelKind::DecisionTree,
            "xgboost" => ModelKind::XGBoost,
            "lightgbm" => ModelKind::LightGBM,
            "pytorch_nn" => ModelKind::NeuralNetwork,
            _ => ModelKind::RandomForest,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            ModelKind::LinearRegression => "linear_regression",
            ModelKind::DecisionTree => "decision_tree",
            ModelKind::XGBoost => "xgboost",
            ModelKind::LightGBM => "lightgbm",
            ModelKind::NeuralNetwork => "pytorch_nn",
            ModelKind::RandomForest => "random_forest",
        }
    }

    /// True when `id` is unrecognized and resolves to the default backend
    pub fn is_fallback(id: &str) -> bool {
        !Self::ALL.iter().any(|k| k.id() == id)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ModelKind::LinearRegression => "ordinary least squares",
            ModelKind::DecisionTree => "single regression tree",
            ModelKind::XGBoost => "gradient-boosted trees, second-order, depth-wise",
            ModelKind::LightGBM => "gradient-boosted trees, leaf-wise",
            ModelKind::NeuralNetwork => "feed-forward network 64-32-1, Adam",
            ModelKind::RandomForest => "random forest ensemble (default)",
        }
    }

    pub fn is_neural(&self) -> bool {
        matches!(self, ModelKind::NeuralNetwork)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A regressor built by the registry
#[derive(Debug, Clone)]
pub enum TrainedModel {
    LinearRegression(LinearRegression),
    DecisionTree(DecisionTree),
    XGBoost(XGBoostRegressor),
    LightGBM(LightGBMRegressor),
    NeuralNetwork(MLPRegressor),
    RandomForest(RandomForest),
}

impl TrainedModel {
    /// Construct an unfitted backend with its fixed hyperparameters
    pub fn build(kind: ModelKind, seed: u64) -> Self {
        match kind {
            ModelKind::LinearRegression => TrainedModel::LinearRegression(LinearRegression::new()),
            ModelKind::DecisionTree => TrainedModel::DecisionTree(DecisionTree::new().with_random_state(seed)),
            ModelKind::XGBoost => TrainedModel::XGBoost(XGBoostRegressor::new().with_random_state(seed)),
            ModelKind::LightGBM => TrainedModel::LightGBM(LightGBMRegressor::new().with_random_state(seed)),
            ModelKind::NeuralNetwork => TrainedModel::NeuralNetwork(MLPRegressor::new().with_random_state(seed)),
            ModelKind::RandomForest => TrainedModel::RandomForest(RandomForest::new().with_random_state(seed)),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            TrainedModel::LinearRegression(_) => ModelKind::LinearRegression,
            TrainedModel::DecisionTree(_) => ModelKind::DecisionTree,
            TrainedModel::XGBoost(_) => ModelKind::XGBoost,
            TrainedModel::LightGBM(_) => ModelKind::LightGBM,
            TrainedModel::NeuralNetwork(_) => ModelKind::NeuralNetwork,
            TrainedModel::RandomForest(_) => ModelKind::RandomForest,
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            TrainedModel::LinearRegression(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::XGBoost(m) => m,
            TrainedModel::LightGBM(m) => m,
            TrainedModel::NeuralNetwork(m) => m,
            TrainedModel::RandomForest(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Regressor {
        match self {
            TrainedModel::LinearRegression(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::XGBoost(m) => m,
            TrainedModel::LightGBM(m) => m,
            TrainedModel::NeuralNetwork(m) => m,
            TrainedModel::RandomForest(m) => m,
        }
    }
}

impl Regressor for TrainedModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.inner().feature_importances()
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn supports_attribution(&self) -> bool {
        self.inner().supports_attribution()
    }
}

/// Shared input validation for backends
pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    use crate::error::InsightError;

    if x.nrows() != y.len() {
        return Err(InsightError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(InsightError::ValidationError("cannot fit on zero rows".to_string()));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(InsightError::ValidationError("training data contains non-finite values".to_string()));
    }
    Ok(())
}

pub(crate) fn check_predict_input(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(crate::error::InsightError::ShapeError {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_known_ids_round_trip() {
        for kind in ModelKind::ALL {
            assert_eq!(ModelKind::from_id(kind.id()), kind);
            assert!(!ModelKind::is_fallback(kind.id()));
        }
    }

    #[test]
    fn test_unknown_id_falls_back() {
        assert_eq!(ModelKind::from_id("no_such_model"), ModelKind::RandomForest);
        assert_eq!(ModelKind::from_id(""), ModelKind::RandomForest);
        assert!(ModelKind::is_fallback("no_such_model"));
        assert!(!ModelKind::is_fallback("random_forest"));
    }

    #[test]
    fn test_build_dispatch() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![2.0, 4.0, 6.0, 8.0, 10.0, 12.0];

        for kind in ModelKind::ALL {
            let mut model = TrainedModel::build(kind, 42);
            assert_eq!(model.kind(), kind);
            assert_eq!(model.name(), kind.id());
            model.fit(&x, &y).unwrap();
            let preds = model.predict(&x).unwrap();
            assert_eq!(preds.len(), 6);
            assert!(preds.iter().all(|p| p.is_finite()));
        }
    }

    #[test]
    fn test_importance_availability() {
        let x = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0], [5.0, 0.0], [6.0, 1.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

        for kind in ModelKind::ALL {
            let mut model = TrainedModel::build(kind, 42);
            model.fit(&x, &y).unwrap();
            let has_importances = model.feature_importances().is_some();
            let expected = !matches!(kind, ModelKind::LinearRegression | ModelKind::NeuralNetwork);
            assert_eq!(has_importances, expected, "{}", kind);
            assert_eq!(model.supports_attribution(), expected, "{}", kind);
        }
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        assert!(check_fit_input(&x, &y).is_err());
    }
}
