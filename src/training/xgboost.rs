//! XGBoost-style gradient boosting with second-order approximation
//!
//! - Uses both gradient and hessian of the squared-error loss
//! - Regularized leaf weights: w* = -G / (H + lambda)
//! - Gain-based split scoring: Gain = 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)] - γ
//! - Level-wise growth to a fixed depth

use super::models::{check_fit_input, check_predict_input, Regressor};
use crate::error::{InsightError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// XGBoost configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// Minimum loss reduction to make a split (gamma)
    pub gamma: f64,
    pub subsample: f64,
    pub random_state: u64,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            gamma: 0.0,
            subsample: 1.0,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum XGBNode {
    Leaf { weight: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<XGBNode>,
        right: Box<XGBNode>,
    },
}

impl XGBNode {
    fn predict(&self, sample: &ArrayView1<f64>) -> f64 {
        match self {
            XGBNode::Leaf { weight } => *weight,
            XGBNode::Split { feature, threshold, left, right } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    fn count_splits(&self, counts: &mut [f64]) {
        if let XGBNode::Split { feature, left, right, .. } = self {
            counts[*feature] += 1.0;
            left.count_splits(counts);
            right.count_splits(counts);
        }
    }
}

struct GradStats<'a> {
    grad: &'a [f64],
    hess: &'a [f64],
}

fn build_xgb_tree(x: &Array2<f64>, stats: &GradStats, indices: &[usize], depth: usize, config: &XGBoostConfig) -> XGBNode {
    let g_sum: f64 = indices.iter().map(|&i| stats.grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| stats.hess[i]).sum();
    let leaf = XGBNode::Leaf { weight: -g_sum / (h_sum + config.reg_lambda) };

    if depth >= config.max_depth || indices.len() < 2 || h_sum < 2.0 * config.min_child_weight {
        return leaf;
    }

    let best = (0..x.ncols())
        .into_par_iter()
        .filter_map(|f| find_best_split_for_feature(x, stats, indices, f, g_sum, h_sum, config))
        .collect::<Vec<_>>()
        .into_iter()
        .fold(None, |acc: Option<(usize, f64, f64)>, cand| match acc {
            Some(a) if a.2 >= cand.2 => Some(a),
            _ => Some(cand),
        });

    match best {
        Some((feature, threshold, gain)) if gain > config.gamma => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
                indices.iter().partition(|&&i| x[[i, feature]] <= threshold);
            if left_idx.is_empty() || right_idx.is_empty() {
                return leaf;
            }
            XGBNode::Split {
                feature,
                threshold,
                left: Box::new(build_xgb_tree(x, stats, &left_idx, depth + 1, config)),
                right: Box::new(build_xgb_tree(x, stats, &right_idx, depth + 1, config)),
            }
        }
        _ => leaf,
    }
}

/// Exact greedy split for one feature: (feature, threshold, gain)
fn find_best_split_for_feature(
    x: &Array2<f64>,
    stats: &GradStats,
    indices: &[usize],
    feature: usize,
    g_total: f64,
    h_total: f64,
    config: &XGBoostConfig,
) -> Option<(usize, f64, f64)> {
    let mut sorted = indices.to_vec();
    sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

    let lambda = config.reg_lambda;
    let parent_score = g_total * g_total / (h_total + lambda);
    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<(usize, f64, f64)> = None;

    for pos in 0..sorted.len() - 1 {
        let idx = sorted[pos];
        g_left += stats.grad[idx];
        h_left += stats.hess[idx];

        let here = x[[idx, feature]];
        let next = x[[sorted[pos + 1], feature]];
        if next - here <= 1e-12 {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;
        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5 * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda) - parent_score);
        if best.map_or(true, |b| gain > b.2) {
            best = Some((feature, (here + next) / 2.0, gain));
        }
    }
    best
}

/// XGBoost Regressor (squared error loss)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostRegressor {
    pub config: XGBoostConfig,
    trees: Vec<XGBNode>,
    base_score: f64,
    n_features: usize,
}

impl Default for XGBoostRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl XGBoostRegressor {
    pub fn new() -> Self {
        Self::with_config(XGBoostConfig::default())
    }

    pub fn with_config(config: XGBoostConfig) -> Self {
        Self { config, trees: Vec::new(), base_score: 0.0, n_features: 0 }
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.config.random_state = seed;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for XGBoostRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n_samples = x.nrows();
        self.n_features = x.ncols();
        self.base_score = y.mean().unwrap_or(0.0);
        self.trees.clear();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut preds = Array1::from_elem(n_samples, self.base_score);
        let hess = vec![1.0; n_samples];
        let all_rows: Vec<usize> = (0..n_samples).collect();

        for _ in 0..self.config.n_estimators {
            // Squared error: grad = pred - y, hess = 1
            let grad: Vec<f64> = preds.iter().zip(y.iter()).map(|(p, t)| p - t).collect();

            let rows = if self.config.subsample < 1.0 {
                let k = ((n_samples as f64 * self.config.subsample).ceil() as usize).max(1);
                let mut rows = all_rows.clone();
                rows.shuffle(&mut rng);
                rows.truncate(k);
                rows
            } else {
                all_rows.clone()
            };

            let stats = GradStats { grad: &grad, hess: &hess };
            let tree = build_xgb_tree(x, &stats, &rows, 0, &self.config);

            for (i, row) in x.rows().into_iter().enumerate() {
                preds[i] += self.config.learning_rate * tree.predict(&row);
            }
            self.trees.push(tree);
        }

        debug!(trees = self.trees.len(), "XGBoost training complete");
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(InsightError::ModelNotFitted);
        }
        check_predict_input(x, self.n_features)?;
        let eta = self.config.learning_rate;
        Ok(x
            .rows()
            .into_iter()
            .map(|row| self.base_score + self.trees.iter().map(|t| eta * t.predict(&row)).sum::<f64>())
            .collect())
    }

    /// Split-count importances, normalized to sum to one
    fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        let mut counts = vec![0.0; self.n_features];
        for tree in &self.trees {
            tree.count_splits(&mut counts);
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            counts.iter_mut().for_each(|c| *c /= total);
        }
        Some(Array1::from_vec(counts))
    }

    fn name(&self) -> &'static str {
        "xgboost"
    }

    fn supports_attribution(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_regression_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((60, 2), |(i, j)| if j == 0 { i as f64 / 10.0 } else { (i % 5) as f64 });
        let y = x.column(0).mapv(|v| v * v) + x.column(1).mapv(|v| 0.5 * v);
        (x, y)
    }

    #[test]
    fn test_fits_nonlinear_target() {
        let (x, y) = make_regression_data();
        let mut model = XGBoostRegressor::new();
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        let mse = preds.iter().zip(y.iter()).map(|(p, t)| (p - t).powi(2)).sum::<f64>() / y.len() as f64;
        assert!(mse < 0.5, "MSE too high: {}", mse);
        assert_eq!(model.n_trees(), 100);
    }

    #[test]
    fn test_importances_normalized() {
        let (x, y) = make_regression_data();
        let mut model = XGBoostRegressor::new();
        model.fit(&x, &y).unwrap();

        let imp = model.feature_importances().unwrap();
        assert_eq!(imp.len(), 2);
        assert!((imp.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_subsample_is_seeded() {
        let (x, y) = make_regression_data();
        let config = XGBoostConfig { subsample: 0.5, n_estimators: 10, ..Default::default() };
        let mut a = XGBoostRegressor::with_config(config.clone());
        let mut b = XGBoostRegressor::with_config(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }
}
