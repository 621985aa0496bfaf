//! End-to-end training run: table in, sanitized evaluation result out

use crate::config::PipelineConfig;
use crate::error::{InsightError, Result};
use crate::evaluation::{DiagnosticInputs, Diagnostics, DiagnosticsGenerator, RegressionMetrics};
use crate::forecast::{Forecast, ForecastEngine};
use crate::preprocessing::{table::normalize_name, Preprocessor, Table, TargetInferer};
use crate::sanitize::{sanitize, RawValue};
use crate::training::{self, select_rows, train_test_split, ModelKind, Regressor};
use crate::utils::{round_to, Timer};
use crate::visualization::ChartRenderer;
use polars::prelude::DataFrame;
use serde_json::Value;
use tracing::{debug, info};

/// Outcome of one training run
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub target_column: String,
    pub features_used: Vec<String>,
    /// Backend that actually trained (after fallback)
    pub model: ModelKind,
    pub metrics: RegressionMetrics,
    /// First held-out predictions, in split order
    pub sample_predictions: Vec<f64>,
    pub forecast: Option<Forecast>,
    /// Present only for the diagnostics variant
    pub diagnostics: Option<Diagnostics>,
    pub rows_used: usize,
}

impl EvaluationResult {
    /// RMSE rounded to 2 decimals
    pub fn rmse(&self) -> f64 {
        round_to(self.metrics.rmse, 2)
    }

    /// R² rounded to 3 decimals
    pub fn r2_score(&self) -> f64 {
        round_to(self.metrics.r2, 3)
    }

    pub fn forecast_plot_base64(&self) -> Option<&str> {
        self.forecast.as_ref().map(|f| f.plot_base64.as_str())
    }

    /// Result payload before sanitization
    pub fn to_raw(&self) -> RawValue {
        let mut entries = vec![
            ("target_column".to_string(), RawValue::from(self.target_column.clone())),
            ("features_used".to_string(), RawValue::from(self.features_used.clone())),
            ("rmse".to_string(), RawValue::from(self.rmse())),
            ("r2_score".to_string(), RawValue::from(self.r2_score())),
            ("sample_predictions".to_string(), RawValue::from(self.sample_predictions.clone())),
            (
                "forecast_plot_base64".to_string(),
                RawValue::from(self.forecast_plot_base64().map(str::to_string)),
            ),
        ];
        if let Some(diagnostics) = &self.diagnostics {
            let graphs = diagnostics
                .graphs
                .iter()
                .map(|(name, encoded)| (name.clone(), RawValue::from(encoded.clone())))
                .collect();
            entries.push(("diagnostic_graphs".to_string(), RawValue::Map(graphs)));
        }
        RawValue::Map(entries)
    }

    /// Sanitized JSON payload
    pub fn to_json(&self) -> Value {
        sanitize(self.to_raw())
    }
}

/// Orchestrates preprocessing, training, evaluation, diagnostics and forecasting
#[derive(Debug, Clone, Default)]
pub struct TrainingPipeline {
    config: PipelineConfig,
    inferer: TargetInferer,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config, inferer: TargetInferer::default() }
    }

    /// Replace the target keyword heuristic
    pub fn with_inferer(mut self, inferer: TargetInferer) -> Self {
        self.inferer = inferer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Convert a polars frame and run on it
    pub fn run_dataframe(&self, df: &DataFrame, target: Option<&str>, model_id: &str) -> Result<EvaluationResult> {
        let table = Table::from_dataframe(df).map_err(|e| e.in_stage("loading"))?;
        self.run(&table, target, model_id)
    }

    /// Train `model_id` against `target` (inferred when `None`).
    ///
    /// Fails with `TargetNotFound` when no target can be resolved; any other
    /// required-stage failure comes back as `InsightError::Pipeline`.
    /// Diagnostic artifacts never fail the run.
    pub fn run(&self, table: &Table, target: Option<&str>, model_id: &str) -> Result<EvaluationResult> {
        let timer = Timer::start();
        self.config.validate().map_err(|e| e.in_stage("configuration"))?;

        let target = self.resolve_target(table, target)?;
        info!(target = %target, model_id, rows = table.height(), "Starting training run");

        let mut preprocessor = Preprocessor::new().with_random_state(self.config.random_state);
        if self.config.diagnostics {
            preprocessor = preprocessor.with_max_rows(self.config.max_rows);
        }
        let prepared = preprocessor.prepare(table, &target).map_err(|e| e.in_stage("preprocessing"))?;

        let split = train_test_split(prepared.x.nrows(), self.config.test_size, self.config.random_state)
            .map_err(|e| e.in_stage("splitting"))?;
        let (x_train, y_train) = select_rows(&prepared.x, &prepared.y, &split.train_indices);
        let (x_test, y_test) = select_rows(&prepared.x, &prepared.y, &split.test_indices);
        debug!(train = x_train.nrows(), test = x_test.nrows(), "Split data");

        let model = training::train(model_id, &x_train, &y_train, self.config.random_state)
            .map_err(|e| e.in_stage("training"))?;
        let y_pred = model
            .predict(&x_test)
            .map_err(|e| InsightError::TrainingBackend { backend: model.kind().id().to_string(), reason: e.to_string() })
            .map_err(|e| e.in_stage("prediction"))?;

        let metrics = RegressionMetrics::compute(&y_test, &y_pred).map_err(|e| e.in_stage("evaluation"))?;
        info!(rmse = metrics.rmse, r2 = metrics.r2, n_test = metrics.n_samples, "Evaluated held-out split");

        let renderer = ChartRenderer::new(self.config.chart_width, self.config.chart_height);

        let diagnostics = self.config.diagnostics.then(|| {
            DiagnosticsGenerator::from_config(&self.config).generate(&DiagnosticInputs {
                model: &model,
                x_train: &x_train,
                y_train: &y_train,
                x_test: &x_test,
                y_test: &y_test,
                y_pred: &y_pred,
                feature_names: &prepared.feature_names,
            })
        });

        let forecast = ForecastEngine::new(self.config.forecast_horizon)
            .with_renderer(renderer)
            .forecast(&model, &x_train, prepared.month_index())
            .map_err(|e| e.in_stage("forecast"))?;

        let sample_predictions = y_pred.iter().take(self.config.sample_predictions).copied().collect();

        info!(
            backend = %model.kind(),
            elapsed_ms = timer.elapsed_ms(),
            diagnostics = diagnostics.as_ref().map(|d| d.graphs.len()).unwrap_or(0),
            forecast = forecast.is_some(),
            "Training run complete"
        );

        Ok(EvaluationResult {
            target_column: prepared.target_column,
            features_used: prepared.feature_names,
            model: model.kind(),
            metrics,
            sample_predictions,
            forecast,
            diagnostics,
            rows_used: prepared.rows_out,
        })
    }

    fn resolve_target(&self, table: &Table, explicit: Option<&str>) -> Result<String> {
        match explicit {
            Some(name) => {
                let name = normalize_name(name);
                if table.column(&name).is_some() {
                    Ok(name)
                } else {
                    Err(InsightError::DataError(format!("target column '{}' not in table", name)).in_stage("target resolution"))
                }
            }
            None => self
                .inferer
                .infer(&table.names())
                .map(str::to_string)
                .ok_or_else(|| InsightError::TargetNotFound { keywords: self.inferer.keywords().to_vec() }),
        }
    }
}
