//! Ordinary least squares

use super::models::{check_fit_input, check_predict_input, Regressor};
use crate::error::{InsightError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Relative pivot tolerance below which a column counts as redundant
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Solve the normal equations `A w = b` by Gauss-Jordan elimination with
/// partial pivoting. Columns whose pivot vanishes (collinear or constant
/// features) get a zero coefficient instead of failing the solve.
fn solve_normal_equations(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let scale = a.diag().iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let tol = PIVOT_TOLERANCE * scale.max(1.0);

    let mut aug = Array2::zeros((n, n + 1));
    aug.slice_mut(ndarray::s![.., ..n]).assign(a);
    aug.column_mut(n).assign(b);

    let mut pivots: Vec<(usize, usize)> = Vec::with_capacity(n);
    let mut row = 0;

    for col in 0..n {
        if row >= n {
            break;
        }
        let pivot_row = (row..n).max_by(|&i, &j| aug[[i, col]].abs().total_cmp(&aug[[j, col]].abs()))?;
        if aug[[pivot_row, col]].abs() < tol {
            continue;
        }

        if pivot_row != row {
            for j in 0..=n {
                aug.swap([row, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[row, col]];
        for j in 0..=n {
            aug[[row, j]] /= pivot;
        }
        for i in 0..n {
            if i != row {
                let factor = aug[[i, col]];
                if factor != 0.0 {
                    for j in 0..=n {
                        aug[[i, j]] -= factor * aug[[row, j]];
                    }
                }
            }
        }

        pivots.push((row, col));
        row += 1;
    }

    let mut w = Array1::zeros(n);
    for (r, c) in pivots {
        w[c] = aug[[r, n]];
    }
    Some(w)
}

/// Linear regression with intercept (OLS)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Intercept
    pub intercept: f64,
    is_fitted: bool,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;

        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| InsightError::ComputationError("empty feature matrix".to_string()))?;
        let y_mean = y.mean().unwrap_or(0.0);

        let x_centered = x - &x_mean;
        let y_centered = y - y_mean;

        let xtx = x_centered.t().dot(&x_centered);
        let xty = x_centered.t().dot(&y_centered);

        let coefficients = solve_normal_equations(&xtx, &xty)
            .ok_or_else(|| InsightError::ComputationError("normal equations could not be solved".to_string()))?;

        self.intercept = y_mean - x_mean.dot(&coefficients);
        self.coefficients = Some(coefficients);
        self.is_fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(InsightError::ModelNotFitted)?;
        check_predict_input(x, coefficients.len())?;
        Ok(x.dot(coefficients) + self.intercept)
    }

    fn name(&self) -> &'static str {
        "linear_regression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_linear_regression() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 4.0], [4.0, 3.0], [5.0, 6.0]];
        // y = 1 + x1 + 3 * x2
        let y = array![8.0, 6.0, 16.0, 14.0, 24.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        for (p, t) in preds.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-6, "{} vs {}", p, t);
        }
    }

    #[test]
    fn test_collinear_columns() {
        let x = array![[1.0, 2.0], [2.0, 3.0], [3.0, 4.0], [4.0, 5.0]];
        let y = array![3.0, 5.0, 7.0, 9.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&array![[5.0, 6.0]]).unwrap();
        assert!((preds[0] - 11.0).abs() < 1e-9);
        assert!(model.coefficients.as_ref().unwrap().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_constant_feature() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0]];
        let y = array![2.0, 4.0, 6.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-9);
        assert_eq!(coef[1], 0.0);
        assert!(model.intercept.abs() < 1e-9);
    }

    #[test]
    fn test_no_importances() {
        let mut model = LinearRegression::new();
        model.fit(&array![[1.0], [2.0]], &array![1.0, 2.0]).unwrap();
        assert!(model.feature_importances().is_none());
    }
}
