//! Integration test: model registry and backends

use ndarray::{Array1, Array2};
use tabular_insight::evaluation::RegressionMetrics;
use tabular_insight::training::{self, train_test_split, ModelKind, Regressor, TrainedModel};
use tabular_insight::InsightError;

fn nonlinear_data(n: usize) -> (Array2<f64>, Array1<f64>) {
    let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
        0 => (i % 17) as f64,
        1 => ((i * 5) % 13) as f64,
        _ => (i % 2) as f64,
    });
    let y = Array1::from_shape_fn(n, |i| {
        let a = x[[i, 0]];
        let b = x[[i, 1]];
        if x[[i, 2]] > 0.5 {
            2.0 * a + b
        } else {
            a - 0.5 * b + 10.0
        }
    });
    (x, y)
}

#[test]
fn test_registry_ids() {
    for kind in ModelKind::ALL {
        assert_eq!(ModelKind::from_id(kind.id()), kind);
        assert!(!ModelKind::is_fallback(kind.id()));
    }
    assert_eq!(ModelKind::from_id("pytorch_nn"), ModelKind::NeuralNetwork);
    assert_eq!(ModelKind::from_id("svm"), ModelKind::from_id("random_forest"));
    assert!(ModelKind::is_fallback("svm"));
}

#[test]
fn test_backends_beat_the_mean() {
    let (x, y) = nonlinear_data(200);
    let split = train_test_split(x.nrows(), 0.2, 42).unwrap();
    let (x_train, y_train) = training::select_rows(&x, &y, &split.train_indices);
    let (x_test, y_test) = training::select_rows(&x, &y, &split.test_indices);

    for kind in [ModelKind::DecisionTree, ModelKind::RandomForest, ModelKind::XGBoost, ModelKind::LightGBM] {
        let model = training::train(kind.id(), &x_train, &y_train, 42).unwrap();
        let metrics = RegressionMetrics::compute(&y_test, &model.predict(&x_test).unwrap()).unwrap();
        assert!(metrics.r2 > 0.5, "{} r2 = {}", kind, metrics.r2);
    }
}

#[test]
fn test_importance_and_attribution_support() {
    let (x, y) = nonlinear_data(80);
    for kind in ModelKind::ALL {
        let model = training::train(kind.id(), &x, &y, 42).unwrap();
        let tree_like = !matches!(kind, ModelKind::LinearRegression | ModelKind::NeuralNetwork);

        assert_eq!(model.feature_importances().is_some(), tree_like, "{}", kind);
        assert_eq!(model.supports_attribution(), tree_like, "{}", kind);
        if let Some(importances) = model.feature_importances() {
            assert_eq!(importances.len(), 3);
        }
    }
}

#[test]
fn test_neural_network_learns() {
    let (x, y) = nonlinear_data(120);
    let model = training::train("pytorch_nn", &x, &y, 42).unwrap();

    let preds = model.predict(&x).unwrap();
    let metrics = RegressionMetrics::compute(&y, &preds).unwrap();
    let baseline = RegressionMetrics::compute(&y, &Array1::from_elem(y.len(), y.mean().unwrap())).unwrap();
    assert!(metrics.rmse < baseline.rmse);
}

#[test]
fn test_predict_before_fit() {
    let model = TrainedModel::build(ModelKind::XGBoost, 42);
    let err = model.predict(&Array2::zeros((2, 3))).unwrap_err();
    assert!(matches!(err, InsightError::ModelNotFitted));
}

#[test]
fn test_predict_width_mismatch() {
    let (x, y) = nonlinear_data(40);
    let model = training::train("decision_tree", &x, &y, 42).unwrap();
    assert!(model.predict(&Array2::zeros((2, 5))).is_err());
}

#[test]
fn test_same_seed_same_model() {
    let (x, y) = nonlinear_data(100);
    for kind in ModelKind::ALL {
        let a = training::train(kind.id(), &x, &y, 7).unwrap().predict(&x).unwrap();
        let b = training::train(kind.id(), &x, &y, 7).unwrap().predict(&x).unwrap();
        assert_eq!(a, b, "{} is not deterministic", kind);
    }
}
