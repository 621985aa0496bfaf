//! Regression metrics

use crate::error::{InsightError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Metrics for a held-out evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Root Mean Squared Error
    pub rmse: f64,
    /// R-squared, 0.0 when undefined
    pub r2: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compute regression metrics.
    ///
    /// R² is coerced to `0.0` when it is undefined: fewer than two samples,
    /// zero variance in `y_true`, or a non-finite result.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(InsightError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(InsightError::ValidationError("cannot evaluate zero samples".to_string()));
        }

        let n = y_true.len() as f64;
        let errors: Vec<f64> = y_true.iter().zip(y_pred.iter()).map(|(t, p)| t - p).collect();

        let ss_res: f64 = errors.iter().map(|e| e * e).sum();
        let mse = ss_res / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let y_mean = y_true.sum() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let r2 = if y_true.len() < 2 || ss_tot <= 0.0 {
            0.0
        } else {
            let r2 = 1.0 - ss_res / ss_tot;
            if r2.is_finite() {
                r2
            } else {
                0.0
            }
        };

        Ok(Self { rmse: mse.sqrt(), r2, mae, mse, n_samples: y_true.len() })
    }
}

/// Root mean squared error
pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    RegressionMetrics::compute(y_true, y_pred).map(|m| m.rmse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regression_metrics() {
        let y_true = array![3.0, -0.5, 2.0, 7.0];
        let y_pred = array![2.5, 0.0, 2.0, 8.0];

        let m = RegressionMetrics::compute(&y_true, &y_pred).unwrap();
        assert!((m.mse - 0.375).abs() < 1e-12);
        assert!((m.rmse - 0.375f64.sqrt()).abs() < 1e-12);
        assert!((m.mae - 0.5).abs() < 1e-12);
        assert!((m.r2 - 0.948_608_137_044_967_9).abs() < 1e-9);
    }

    #[test]
    fn test_perfect_fit() {
        let y = array![1.0, 2.0, 3.0];
        let m = RegressionMetrics::compute(&y, &y).unwrap();
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.r2, 1.0);
    }

    #[test]
    fn test_r2_undefined_is_zero() {
        let m = RegressionMetrics::compute(&array![5.0], &array![4.0]).unwrap();
        assert_eq!(m.r2, 0.0);
        assert_eq!(m.rmse, 1.0);

        let m = RegressionMetrics::compute(&array![2.0, 2.0], &array![2.0, 3.0]).unwrap();
        assert_eq!(m.r2, 0.0);
    }

    #[test]
    fn test_invalid_input() {
        assert!(RegressionMetrics::compute(&array![1.0], &array![1.0, 2.0]).is_err());
        assert!(RegressionMetrics::compute(&Array1::zeros(0), &Array1::zeros(0)).is_err());
    }
}
