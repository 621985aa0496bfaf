//! K-fold learning curve

use super::metrics::rmse;
use crate::error::{InsightError, Result};
use crate::training::{select_rows, KFold, ModelKind, Regressor, TrainedModel};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Mean train and validation RMSE per training-set size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningCurve {
    pub train_sizes: Vec<usize>,
    pub train_rmse: Vec<f64>,
    pub validation_rmse: Vec<f64>,
}

impl LearningCurve {
    /// Train and validation series as (size, rmse) points
    pub fn series(&self) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
        let points = |scores: &[f64]| {
            self.train_sizes
                .iter()
                .zip(scores)
                .map(|(&n, &s)| (n as f64, s))
                .collect::<Vec<_>>()
        };
        (points(&self.train_rmse), points(&self.validation_rmse))
    }
}

/// Learning curve settings
#[derive(Debug, Clone)]
pub struct LearningCurveConfig {
    pub folds: usize,
    /// Fractions of the smallest training fold
    pub fractions: Vec<f64>,
    pub random_state: u64,
}

impl Default for LearningCurveConfig {
    fn default() -> Self {
        Self { folds: 3, fractions: vec![0.1, 0.55, 1.0], random_state: 42 }
    }
}

/// Refit a fresh `kind` backend for every (fold, size) pair.
///
/// Sizes are `floor(fraction * smallest_train_fold)`, at least one row; the
/// first rows of each shuffled training fold are used.
pub fn learning_curve(
    kind: ModelKind,
    x: &Array2<f64>,
    y: &Array1<f64>,
    config: &LearningCurveConfig,
) -> Result<LearningCurve> {
    if config.fractions.is_empty() {
        return Err(InsightError::ValidationError("no training sizes requested".to_string()));
    }
    if config.fractions.iter().any(|f| !(*f > 0.0 && *f <= 1.0)) {
        return Err(InsightError::ValidationError(format!(
            "training size fractions must be in (0, 1], got {:?}",
            config.fractions
        )));
    }

    let splits = KFold::new(config.folds).with_random_state(config.random_state).split(x.nrows())?;
    let max_train = splits.iter().map(|s| s.train_indices.len()).min().unwrap_or(0);

    let train_sizes: Vec<usize> = config
        .fractions
        .iter()
        .map(|f| ((f * max_train as f64).floor() as usize).clamp(1, max_train.max(1)))
        .collect();

    let mut train_rmse = vec![0.0; train_sizes.len()];
    let mut validation_rmse = vec![0.0; train_sizes.len()];

    for split in &splits {
        let (x_val, y_val) = select_rows(x, y, &split.test_indices);
        for (i, &size) in train_sizes.iter().enumerate() {
            let (x_tr, y_tr) = select_rows(x, y, &split.train_indices[..size]);
            let mut model = TrainedModel::build(kind, config.random_state);
            model.fit(&x_tr, &y_tr)?;

            train_rmse[i] += rmse(&y_tr, &model.predict(&x_tr)?)?;
            validation_rmse[i] += rmse(&y_val, &model.predict(&x_val)?)?;
        }
    }

    let k = splits.len() as f64;
    train_rmse.iter_mut().for_each(|v| *v /= k);
    validation_rmse.iter_mut().for_each(|v| *v /= k);

    Ok(LearningCurve { train_sizes, train_rmse, validation_rmse })
}
