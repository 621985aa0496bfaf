//! Sampling-based Shapley feature attribution

use crate::error::{InsightError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Feature contribution to a prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature_index: usize,
    /// Feature value for this instance
    pub feature_value: f64,
    /// Estimated Shapley value
    pub contribution: f64,
}

/// Local explanation for a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalExplanation {
    pub instance_index: usize,
    /// Expected prediction over the background set
    pub base_value: f64,
    pub prediction: f64,
    pub contributions: Vec<FeatureContribution>,
}

impl LocalExplanation {
    pub fn sum_contributions(&self) -> f64 {
        self.contributions.iter().map(|c| c.contribution).sum()
    }
}

/// Permutation-sampling explainer.
///
/// For each sample a random feature order and a random background row are
/// drawn; features are switched from the background to the instance one at
/// a time and each switch's change in prediction is credited to that
/// feature. All coalitions of one sample are predicted in a single batch.
pub struct LocalExplainer<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>>,
{
    predict_fn: F,
    background: Array2<f64>,
    n_samples: usize,
    seed: u64,
}

impl<F> LocalExplainer<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>>,
{
    pub fn new(predict_fn: F, background: Array2<f64>) -> Self {
        Self { predict_fn, background, n_samples: 20, seed: 42 }
    }

    /// Set number of permutation samples per instance
    pub fn with_n_samples(mut self, n: usize) -> Self {
        self.n_samples = n.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Explain every row of `instances`
    pub fn explain_batch(&self, instances: &Array2<f64>) -> Result<Vec<LocalExplanation>> {
        if self.background.nrows() == 0 {
            return Err(InsightError::ValidationError("attribution needs a non-empty background".to_string()));
        }
        if self.background.ncols() != instances.ncols() {
            return Err(InsightError::ShapeError {
                expected: format!("{} features", self.background.ncols()),
                actual: format!("{} features", instances.ncols()),
            });
        }

        let base_value = (self.predict_fn)(&self.background)?.mean().unwrap_or(0.0);
        instances
            .rows()
            .into_iter()
            .enumerate()
            .map(|(idx, row)| self.explain_instance(&row.to_owned(), idx, base_value))
            .collect()
    }

    fn explain_instance(&self, instance: &Array1<f64>, instance_index: usize, base_value: f64) -> Result<LocalExplanation> {
        let n_features = instance.len();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(instance_index as u64));
        let mut contributions = vec![0.0; n_features];

        for _ in 0..self.n_samples {
            let mut perm: Vec<usize> = (0..n_features).collect();
            perm.shuffle(&mut rng);
            let bg_idx = rng.gen_range(0..self.background.nrows());

            // Row k holds the coalition after the first k features of `perm` switched
            let mut path = Array2::zeros((n_features + 1, n_features));
            let mut current = self.background.row(bg_idx).to_owned();
            path.row_mut(0).assign(&current);
            for (step, &feature) in perm.iter().enumerate() {
                current[feature] = instance[feature];
                path.row_mut(step + 1).assign(&current);
            }

            let preds = (self.predict_fn)(&path)?;
            for (step, &feature) in perm.iter().enumerate() {
                contributions[feature] += preds[step + 1] - preds[step];
            }
        }

        let prediction = (self.predict_fn)(&instance.view().insert_axis(Axis(0)).to_owned())?[0];
        let n = self.n_samples as f64;

        Ok(LocalExplanation {
            instance_index,
            base_value,
            prediction,
            contributions: contributions
                .into_iter()
                .enumerate()
                .map(|(feature_index, c)| FeatureContribution {
                    feature_index,
                    feature_value: instance[feature_index],
                    contribution: c / n,
                })
                .collect(),
        })
    }
}

/// Summary of attributions across many instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapSummary {
    pub feature_names: Vec<String>,
    /// Mean absolute contribution per feature
    pub mean_abs_shap: Vec<f64>,
    /// Mean signed contribution per feature
    pub mean_shap: Vec<f64>,
}

impl ShapSummary {
    pub fn from_explanations(explanations: &[LocalExplanation], feature_names: &[String]) -> Self {
        let n_features = feature_names.len();
        let mut mean_abs = vec![0.0; n_features];
        let mut mean = vec![0.0; n_features];

        for exp in explanations {
            for c in exp.contributions.iter().filter(|c| c.feature_index < n_features) {
                mean_abs[c.feature_index] += c.contribution.abs();
                mean[c.feature_index] += c.contribution;
            }
        }

        if !explanations.is_empty() {
            let n = explanations.len() as f64;
            mean_abs.iter_mut().for_each(|v| *v /= n);
            mean.iter_mut().for_each(|v| *v /= n);
        }

        Self { feature_names: feature_names.to_vec(), mean_abs_shap: mean_abs, mean_shap: mean }
    }

    /// Feature indices by mean absolute contribution, descending
    pub fn feature_ranking(&self) -> Vec<(usize, f64)> {
        let mut indexed: Vec<(usize, f64)> = self.mean_abs_shap.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        indexed
    }
}
