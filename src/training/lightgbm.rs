//! LightGBM-style gradient boosting with leaf-wise tree growth
//!
//! Differs from the XGBoost-style booster in how trees grow: the leaf with
//! the largest gain is split next (best-first) until `max_leaves` is reached.

use super::models::{check_fit_input, check_predict_input, Regressor};
use crate::error::{InsightError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightGBMConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_leaves: usize,
    pub max_depth: Option<usize>,
    pub min_child_samples: usize,
    pub reg_lambda: f64,
    /// Fraction of features drawn per tree
    pub colsample_bytree: f64,
    pub random_state: u64,
}

impl Default for LightGBMConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_leaves: 31,
            max_depth: None,
            min_child_samples: 20,
            reg_lambda: 0.0,
            colsample_bytree: 1.0,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum LGBNode {
    Leaf { value: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<LGBNode>,
        right: Box<LGBNode>,
    },
}

impl LGBNode {
    fn predict(&self, sample: &ArrayView1<f64>) -> f64 {
        match self {
            LGBNode::Leaf { value } => *value,
            LGBNode::Split { feature, threshold, left, right } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    fn count_splits(&self, counts: &mut [f64]) {
        if let LGBNode::Split { feature, left, right, .. } = self {
            counts[*feature] += 1.0;
            left.count_splits(counts);
            right.count_splits(counts);
        }
    }
}

fn score(g: f64, h: f64, lambda: f64) -> f64 {
    if h + lambda <= 0.0 {
        0.0
    } else {
        g * g / (h + lambda)
    }
}

struct PendingSplit {
    gain: f64,
    node_id: usize,
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

impl PartialEq for PendingSplit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingSplit {}

impl PartialOrd for PendingSplit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingSplit {
    // Equal gains pop the older node first
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain.total_cmp(&other.gain).then_with(|| other.node_id.cmp(&self.node_id))
    }
}

enum NodeSlot {
    Leaf(Vec<usize>),
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    grad: &'a [f64],
    config: &'a LightGBMConfig,
    features: Vec<usize>,
}

impl TreeBuilder<'_> {
    /// Best split of a leaf's rows across the sampled features
    fn best_split(&self, node_id: usize, indices: &[usize]) -> Option<PendingSplit> {
        if indices.len() < 2 * self.config.min_child_samples.max(1) {
            return None;
        }
        self.features
            .par_iter()
            .filter_map(|&feature| self.split_feature(node_id, indices, feature))
            .collect::<Vec<_>>()
            .into_iter()
            .fold(None, |acc: Option<PendingSplit>, cand| match acc {
                Some(a) if a.gain >= cand.gain => Some(a),
                _ => Some(cand),
            })
    }

    fn split_feature(&self, node_id: usize, indices: &[usize], feature: usize) -> Option<PendingSplit> {
        let x = self.x;
        let lambda = self.config.reg_lambda;
        let min_child = self.config.min_child_samples.max(1);

        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        // Squared error has unit hessians, so H equals the row count
        let total_g: f64 = sorted.iter().map(|&i| self.grad[i]).sum();
        let total_h = sorted.len() as f64;
        let parent = score(total_g, total_h, lambda);

        let mut left_g = 0.0;
        let mut best: Option<(f64, f64, usize)> = None;
        for pos in 0..sorted.len() - 1 {
            left_g += self.grad[sorted[pos]];
            let n_left = pos + 1;
            if n_left < min_child || sorted.len() - n_left < min_child {
                continue;
            }
            let here = x[[sorted[pos], feature]];
            let next = x[[sorted[pos + 1], feature]];
            if next - here <= 1e-12 {
                continue;
            }

            let gain = score(left_g, n_left as f64, lambda) + score(total_g - left_g, total_h - n_left as f64, lambda) - parent;
            if gain > 1e-12 && best.map_or(true, |b| gain > b.0) {
                best = Some((gain, (here + next) / 2.0, n_left));
            }
        }

        let (gain, threshold, split_at) = best?;
        Some(PendingSplit {
            gain,
            node_id,
            feature,
            threshold,
            left: sorted[..split_at].to_vec(),
            right: sorted[split_at..].to_vec(),
        })
    }

    fn build(&self, indices: Vec<usize>) -> LGBNode {
        let max_depth = self.config.max_depth.unwrap_or(usize::MAX);
        let mut heap = BinaryHeap::new();
        if let Some(split) = self.best_split(0, &indices) {
            heap.push(split);
        }
        let mut nodes = vec![NodeSlot::Leaf(indices)];
        let mut depths = vec![0usize];
        let mut n_leaves = 1;

        while n_leaves < self.config.max_leaves {
            let Some(split) = heap.pop() else { break };
            let depth = depths[split.node_id];
            if depth >= max_depth {
                continue;
            }

            let left_id = nodes.len();
            let right_id = left_id + 1;
            for (child_id, rows) in [(left_id, &split.left), (right_id, &split.right)] {
                if depth + 1 < max_depth {
                    if let Some(child) = self.best_split(child_id, rows) {
                        heap.push(child);
                    }
                }
            }

            nodes.push(NodeSlot::Leaf(split.left));
            nodes.push(NodeSlot::Leaf(split.right));
            depths.push(depth + 1);
            depths.push(depth + 1);
            nodes[split.node_id] = NodeSlot::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: left_id,
                right: right_id,
            };
            n_leaves += 1;
        }

        self.to_node(&nodes, 0)
    }

    fn to_node(&self, nodes: &[NodeSlot], idx: usize) -> LGBNode {
        match &nodes[idx] {
            NodeSlot::Leaf(rows) => {
                let g: f64 = rows.iter().map(|&i| self.grad[i]).sum();
                let h = rows.len() as f64 + self.config.reg_lambda;
                LGBNode::Leaf { value: if h > 0.0 { -g / h } else { 0.0 } }
            }
            NodeSlot::Split { feature, threshold, left, right } => LGBNode::Split {
                feature: *feature,
                threshold: *threshold,
                left: Box::new(self.to_node(nodes, *left)),
                right: Box::new(self.to_node(nodes, *right)),
            },
        }
    }
}

/// LightGBM Regressor (squared error loss)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightGBMRegressor {
    pub config: LightGBMConfig,
    trees: Vec<LGBNode>,
    base_prediction: f64,
    n_features: usize,
}

impl Default for LightGBMRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl LightGBMRegressor {
    pub fn new() -> Self {
        Self::with_config(LightGBMConfig::default())
    }

    pub fn with_config(config: LightGBMConfig) -> Self {
        Self { config, trees: Vec::new(), base_prediction: 0.0, n_features: 0 }
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.config.random_state = seed;
        self
    }
}

impl Regressor for LightGBMRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n = x.nrows();
        self.n_features = x.ncols();
        self.base_prediction = y.mean().unwrap_or(0.0);
        self.trees.clear();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut predictions = Array1::from_elem(n, self.base_prediction);
        let n_cols = ((self.n_features as f64 * self.config.colsample_bytree).ceil() as usize).clamp(1, self.n_features.max(1));

        for _ in 0..self.config.n_estimators {
            let grad: Vec<f64> = predictions.iter().zip(y.iter()).map(|(&p, &t)| p - t).collect();

            let mut features: Vec<usize> = (0..self.n_features).collect();
            if n_cols < self.n_features {
                features.shuffle(&mut rng);
                features.truncate(n_cols);
                features.sort_unstable();
            }

            let builder = TreeBuilder { x, grad: &grad, config: &self.config, features };
            let tree = builder.build((0..n).collect());

            for (i, row) in x.rows().into_iter().enumerate() {
                predictions[i] += self.config.learning_rate * tree.predict(&row);
            }
            self.trees.push(tree);
        }

        debug!(trees = self.trees.len(), "LightGBM training complete");
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(InsightError::ModelNotFitted);
        }
        check_predict_input(x, self.n_features)?;
        let lr = self.config.learning_rate;
        Ok(x
            .rows()
            .into_iter()
            .map(|row| self.base_prediction + self.trees.iter().map(|t| lr * t.predict(&row)).sum::<f64>())
            .collect())
    }

    /// Split-count importances, normalized to sum to one when any split exists
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
        "lightgbm"
    }

    fn supports_attribution(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_regression_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((200, 3), |(i, j)| match j {
            0 => i as f64 / 20.0,
            1 => ((i * 7) % 11) as f64,
            _ => 1.0,
        });
        let y = x.column(0).mapv(|v| 2.0 * v) + x.column(1).mapv(|v| 0.1 * v);
        (x, y)
    }

    #[test]
    fn test_regressor() {
        let (x, y) = make_regression_data();
        let mut model = LightGBMRegressor::new();
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        let mse = preds.iter().zip(y.iter()).map(|(p, t)| (p - t).powi(2)).sum::<f64>() / y.len() as f64;
        let var = y.var(0.0);
        assert!(mse < 0.1 * var, "MSE {} vs variance {}", mse, var);
    }

    #[test]
    fn test_constant_feature_never_split() {
        let (x, y) = make_regression_data();
        let mut model = LightGBMRegressor::new();
        model.fit(&x, &y).unwrap();

        let imp = model.feature_importances().unwrap();
        assert_eq!(imp[2], 0.0);
        assert!(imp[0] > 0.0);
    }

    #[test]
    fn test_small_data_predicts_mean() {
        let x = Array2::from_shape_fn((5, 1), |(i, _)| i as f64);
        let y = Array1::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut model = LightGBMRegressor::new();
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        assert!(preds.iter().all(|p| (p - 3.0).abs() < 1e-9));
        assert_eq!(model.feature_importances().unwrap().sum(), 0.0);
    }
}
