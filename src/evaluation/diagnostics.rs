//! Best-effort diagnostic charts for a trained model

use super::attribution::{LocalExplainer, ShapSummary};
use super::learning_curve::{learning_curve, LearningCurve, LearningCurveConfig};
use crate::config::PipelineConfig;
use crate::error::{InsightError, Result};
use crate::training::{Regressor, TrainedModel};
use crate::visualization::{ChartRenderer, Histogram};
use ndarray::{Array1, Array2, Axis};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, warn};

pub const RESIDUALS_PLOT: &str = "residuals_plot";
pub const ACTUAL_VS_PREDICTED: &str = "actual_vs_predicted";
pub const FEATURE_IMPORTANCE: &str = "feature_importance";
pub const RESIDUAL_HISTOGRAM: &str = "residual_histogram";
pub const LEARNING_CURVE: &str = "learning_curve";
pub const SHAP_SUMMARY: &str = "shap_summary";

/// Rows drawn from the training split as the attribution background
const BACKGROUND_ROWS: usize = 50;

/// Everything the diagnostics need, borrowed from one pipeline run
pub struct DiagnosticInputs<'a> {
    pub model: &'a TrainedModel,
    pub x_train: &'a Array2<f64>,
    pub y_train: &'a Array1<f64>,
    pub x_test: &'a Array2<f64>,
    pub y_test: &'a Array1<f64>,
    pub y_pred: &'a Array1<f64>,
    pub feature_names: &'a [String],
}

/// Named base64 charts in generation order, plus the numbers behind some of them
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub graphs: Vec<(String, String)>,
    /// (feature, importance), descending
    pub feature_importances: Option<Vec<(String, f64)>>,
    pub learning_curve: Option<LearningCurve>,
    pub shap_summary: Option<ShapSummary>,
}

impl Diagnostics {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.graphs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> Vec<&str> {
        self.graphs.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

/// Produces the diagnostic artifacts. A failing artifact is logged and
/// left out; it never fails the run.
pub struct DiagnosticsGenerator {
    renderer: ChartRenderer,
    histogram_bins: usize,
    curve: LearningCurveConfig,
    shap_samples: usize,
    shap_max_rows: usize,
    random_state: u64,
}

impl DiagnosticsGenerator {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            renderer: ChartRenderer::new(config.chart_width, config.chart_height),
            histogram_bins: config.histogram_bins,
            curve: LearningCurveConfig {
                folds: config.learning_curve_folds,
                fractions: config.learning_curve_sizes.clone(),
                random_state: config.random_state,
            },
            shap_samples: config.shap_samples,
            shap_max_rows: config.shap_max_rows,
            random_state: config.random_state,
        }
    }

    pub fn generate(&self, inputs: &DiagnosticInputs) -> Diagnostics {
        let mut out = Diagnostics::default();
        let residuals: Vec<f64> = inputs.y_test.iter().zip(inputs.y_pred.iter()).map(|(t, p)| t - p).collect();

        let points: Vec<(f64, f64)> = inputs.y_pred.iter().copied().zip(residuals.iter().copied()).collect();
        self.record(&mut out, RESIDUALS_PLOT, || self.renderer.scatter(&points, false, true));

        let points: Vec<(f64, f64)> = inputs.y_test.iter().copied().zip(inputs.y_pred.iter().copied()).collect();
        self.record(&mut out, ACTUAL_VS_PREDICTED, || self.renderer.scatter(&points, true, false));

        match inputs.model.feature_importances() {
            Some(importances) => {
                let ranked = rank(inputs.feature_names, importances.iter().copied());
                let values: Vec<f64> = ranked.iter().map(|(_, v)| *v).collect();
                self.record(&mut out, FEATURE_IMPORTANCE, || self.renderer.bar(&values));
                out.feature_importances = Some(ranked);
            }
            None => debug!(backend = inputs.model.name(), "Backend exposes no feature importances"),
        }

        self.record(&mut out, RESIDUAL_HISTOGRAM, || {
            let hist = Histogram::from_values(&residuals, self.histogram_bins)?;
            self.renderer.histogram(&hist)
        });

        if inputs.model.kind().is_neural() {
            debug!("Skipping learning curve for neural network backend");
        } else {
            let mut curve = None;
            self.record(&mut out, LEARNING_CURVE, || {
                let computed = learning_curve(inputs.model.kind(), inputs.x_train, inputs.y_train, &self.curve)?;
                let (train, val) = computed.series();
                let encoded = self.renderer.lines(&[train, val])?;
                curve = Some(computed);
                Ok(encoded)
            });
            out.learning_curve = curve;
        }

        if inputs.model.supports_attribution() {
            let mut summary = None;
            self.record(&mut out, SHAP_SUMMARY, || {
                let computed = self.attribution(inputs)?;
                let values: Vec<f64> = computed.feature_ranking().into_iter().map(|(_, v)| v).collect();
                let encoded = self.renderer.bar(&values)?;
                summary = Some(computed);
                Ok(encoded)
            });
            out.shap_summary = summary;
        }

        out
    }

    fn attribution(&self, inputs: &DiagnosticInputs) -> Result<ShapSummary> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let background = sample_rows(inputs.x_train, BACKGROUND_ROWS, &mut rng);
        let instances = sample_rows(inputs.x_test, self.shap_max_rows, &mut rng);

        let model = inputs.model;
        let explainer = LocalExplainer::new(|x: &Array2<f64>| model.predict(x), background)
            .with_n_samples(self.shap_samples)
            .with_seed(self.random_state);
        let explanations = explainer.explain_batch(&instances)?;
        Ok(ShapSummary::from_explanations(&explanations, inputs.feature_names))
    }

    fn record<F>(&self, out: &mut Diagnostics, artifact: &str, produce: F)
    where
        F: FnOnce() -> Result<String>,
    {
        match produce() {
            Ok(encoded) => out.graphs.push((artifact.to_string(), encoded)),
            Err(e) => {
                let err = InsightError::Diagnostic { artifact: artifact.to_string(), reason: e.to_string() };
                warn!(artifact, error = %err, "Diagnostic artifact omitted");
            }
        }
    }
}

/// Pair names with values, sorted by value descending (ties keep feature order)
fn rank(names: &[String], values: impl Iterator<Item = f64>) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = names.iter().cloned().zip(values).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

fn sample_rows(x: &Array2<f64>, max_rows: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
    if x.nrows() <= max_rows {
        return x.to_owned();
    }
    let mut rows = index::sample(rng, x.nrows(), max_rows).into_vec();
    rows.sort_unstable();
    x.select(Axis(0), &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::ModelKind;

    fn fitted(kind: ModelKind) -> (TrainedModel, Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 3) as f64 });
        let y = x.column(0).mapv(|v| 1.5 * v) + x.column(1);
        let mut model = TrainedModel::build(kind, 42);
        model.fit(&x, &y).unwrap();
        (model, x, y)
    }

    fn run(kind: ModelKind) -> Diagnostics {
        let (model, x, y) = fitted(kind);
        let y_pred = model.predict(&x).unwrap();
        let names = vec!["a".to_string(), "b".to_string()];
        let config = PipelineConfig::default();
        let generator = DiagnosticsGenerator::from_config(&config);
        generator.generate(&DiagnosticInputs {
            model: &model,
            x_train: &x,
            y_train: &y,
            x_test: &x,
            y_test: &y,
            y_pred: &y_pred,
            feature_names: &names,
        })
    }

    #[test]
    fn test_tree_backend_gets_every_artifact() {
        let diagnostics = run(ModelKind::DecisionTree);
        assert_eq!(
            diagnostics.names(),
            vec![RESIDUALS_PLOT, ACTUAL_VS_PREDICTED, FEATURE_IMPORTANCE, RESIDUAL_HISTOGRAM, LEARNING_CURVE, SHAP_SUMMARY]
        );
        assert_eq!(diagnostics.feature_importances.as_ref().unwrap()[0].0, "a");
        assert!(diagnostics.learning_curve.is_some());
        assert!(diagnostics.shap_summary.is_some());
    }

    #[test]
    fn test_linear_backend_skips_importance_and_attribution() {
        let diagnostics = run(ModelKind::LinearRegression);
        assert!(diagnostics.get(FEATURE_IMPORTANCE).is_none());
        assert!(diagnostics.get(SHAP_SUMMARY).is_none());
        assert!(diagnostics.get(LEARNING_CURVE).is_some());
        assert!(diagnostics.get(RESIDUALS_PLOT).is_some());
    }

    #[test]
    fn test_learning_curve_failure_is_not_fatal() {
        let (model, x, y) = fitted(ModelKind::DecisionTree);
        let x_small = x.select(Axis(0), &[0, 1]);
        let y_small = y.select(Axis(0), &[0, 1]);
        let y_pred = model.predict(&x).unwrap();
        let names = vec!["a".to_string(), "b".to_string()];

        let generator = DiagnosticsGenerator::from_config(&PipelineConfig::default());
        let diagnostics = generator.generate(&DiagnosticInputs {
            model: &model,
            x_train: &x_small,
            y_train: &y_small,
            x_test: &x,
            y_test: &y,
            y_pred: &y_pred,
            feature_names: &names,
        });

        assert!(diagnostics.get(LEARNING_CURVE).is_none());
        assert!(diagnostics.get(RESIDUALS_PLOT).is_some());
        assert!(diagnostics.get(SHAP_SUMMARY).is_some());
    }
}
