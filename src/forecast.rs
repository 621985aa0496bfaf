//! Month-ahead projection from a trained model

use crate::error::{InsightError, Result};
use crate::training::{Regressor, TrainedModel};
use crate::utils::median;
use crate::visualization::ChartRenderer;
use ndarray::{Array1, Array2};
use serde::Serialize;
use tracing::debug;

/// Predictions for months `1..=horizon` and their line chart
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub months: Vec<u32>,
    pub predictions: Vec<f64>,
    pub plot_base64: String,
}

/// Projects future months, holding every other feature at its training median
#[derive(Debug, Clone, Copy)]
pub struct ForecastEngine {
    horizon: usize,
    renderer: ChartRenderer,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ForecastEngine {
    pub fn new(horizon: usize) -> Self {
        Self { horizon, renderer: ChartRenderer::default() }
    }

    pub fn with_renderer(mut self, renderer: ChartRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Rows for months `1..=horizon`; column `month_index` carries the month
    pub fn future_rows(&self, x_train: &Array2<f64>, month_index: usize) -> Result<Array2<f64>> {
        if month_index >= x_train.ncols() {
            return Err(InsightError::ShapeError {
                expected: format!("month column below {}", x_train.ncols()),
                actual: month_index.to_string(),
            });
        }

        let medians: Vec<f64> = x_train
            .columns()
            .into_iter()
            .map(|col| {
                median(&col.to_vec())
                    .ok_or_else(|| InsightError::ComputationError("no training rows to take a median from".to_string()))
            })
            .collect::<Result<_>>()?;

        let mut rows = Array2::zeros((self.horizon, x_train.ncols()));
        for (i, mut row) in rows.rows_mut().into_iter().enumerate() {
            row.assign(&Array1::from(medians.clone()));
            row[month_index] = (i + 1) as f64;
        }
        Ok(rows)
    }

    /// `None` when the features carry no month column
    pub fn forecast(&self, model: &TrainedModel, x_train: &Array2<f64>, month_index: Option<usize>) -> Result<Option<Forecast>> {
        let Some(month_index) = month_index else {
            debug!("No month feature, skipping forecast");
            return Ok(None);
        };
        if self.horizon == 0 {
            return Ok(None);
        }

        let rows = self.future_rows(x_train, month_index)?;
        let predictions = model.predict(&rows)?.to_vec();
        let months: Vec<u32> = (1..=self.horizon as u32).collect();

        let points: Vec<(f64, f64)> = months.iter().map(|&m| m as f64).zip(predictions.iter().copied()).collect();
        let plot_base64 = self.renderer.line(&points)?;

        debug!(horizon = self.horizon, "Forecast rendered");
        Ok(Some(Forecast { months, predictions, plot_base64 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::ModelKind;
    use ndarray::array;

    #[test]
    fn test_future_rows_use_medians() {
        let x = array![[1.0, 10.0], [3.0, 20.0], [2.0, 90.0]];
        let rows = ForecastEngine::new(5).future_rows(&x, 1).unwrap();

        assert_eq!(rows.dim(), (5, 2));
        assert!(rows.column(0).iter().all(|&v| v == 2.0));
        assert_eq!(rows.column(1).to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_forecast_follows_month_trend() {
        let x = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0], [4.0, 5.0], [5.0, 5.0], [6.0, 5.0]];
        let y = array![10.0, 20.0, 30.0, 40.0, 50.0, 60.0];
        let mut model = TrainedModel::build(ModelKind::LinearRegression, 42);
        model.fit(&x, &y).unwrap();

        let forecast = ForecastEngine::default().forecast(&model, &x, Some(0)).unwrap().unwrap();
        assert_eq!(forecast.months, vec![1, 2, 3, 4, 5]);
        assert!((forecast.predictions[4] - 50.0).abs() < 1e-6);
        assert!(!forecast.plot_base64.is_empty());
    }

    #[test]
    fn test_no_month_no_forecast() {
        let x = array![[1.0], [2.0]];
        let mut model = TrainedModel::build(ModelKind::LinearRegression, 42);
        model.fit(&x, &array![1.0, 2.0]).unwrap();
        assert!(ForecastEngine::default().forecast(&model, &x, None).unwrap().is_none());
    }
}
