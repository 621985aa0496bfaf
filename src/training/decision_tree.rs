//! CART regression tree

use super::models::{check_fit_input, check_predict_input, Regressor};
use crate::error::{InsightError, Result};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

impl TreeNode {
    fn predict(&self, sample: &[f64]) -> f64 {
        match self {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                if sample[*feature_idx] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// Best split candidate: (feature, threshold, variance reduction)
type SplitCandidate = (usize, f64, f64);

/// Regression tree grown on squared error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn per node; `None` considers all of them
    pub max_features: Option<usize>,
    pub random_state: u64,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: 42,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit on a subset of rows (with repetition allowed, as in a bootstrap)
    pub fn fit_rows(&mut self, x: &Array2<f64>, y: &Array1<f64>, rows: &[usize]) -> Result<()> {
        if rows.is_empty() {
            return Err(InsightError::ValidationError("cannot fit a tree on zero rows".to_string()));
        }
        self.n_features = x.ncols();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.random_state);
        let mut importances = vec![0.0; self.n_features];
        self.root = Some(self.build_tree(x, y, rows, 0, &mut importances, &mut rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|imp| *imp /= total);
        }
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(())
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut Xoshiro256PlusPlus,
    ) -> TreeNode {
        let n_samples = indices.len();
        let leaf = || TreeNode::Leaf { value: mean_of(y, indices), n_samples };

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure(y, indices);
        if should_stop {
            return leaf();
        }

        let features = self.candidate_features(rng);
        let Some((feature, threshold, gain)) = self.find_best_split(x, y, indices, &features) else {
            return leaf();
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, feature]] <= threshold);
        if left_idx.len() < self.min_samples_leaf || right_idx.len() < self.min_samples_leaf {
            return leaf();
        }

        importances[feature] += gain * n_samples as f64;

        let left = Box::new(self.build_tree(x, y, &left_idx, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_idx, depth + 1, importances, rng));

        TreeNode::Split { feature_idx: feature, threshold, left, right, n_samples }
    }

    fn candidate_features(&self, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        match self.max_features {
            Some(k) if k < self.n_features => {
                features.shuffle(rng);
                features.truncate(k);
                features.sort_unstable();
                features
            }
            _ => features,
        }
    }

    /// Exact greedy search; each feature is scanned once in sorted order
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        features: &[usize],
    ) -> Option<SplitCandidate> {
        let n = indices.len() as f64;
        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let parent_impurity = total_sq / n - (total_sum / n).powi(2);

        features
            .par_iter()
            .filter_map(|&feature| {
                let mut sorted = indices.to_vec();
                sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

                let mut left_sum = 0.0;
                let mut left_sq = 0.0;
                let mut best: Option<SplitCandidate> = None;

                for pos in 0..sorted.len() - 1 {
                    let yi = y[sorted[pos]];
                    left_sum += yi;
                    left_sq += yi * yi;

                    let here = x[[sorted[pos], feature]];
                    let next = x[[sorted[pos + 1], feature]];
                    if next - here <= 1e-12 {
                        continue;
                    }

                    let left_n = (pos + 1) as f64;
                    let right_n = n - left_n;
                    if (pos + 1) < self.min_samples_leaf || (sorted.len() - pos - 1) < self.min_samples_leaf {
                        continue;
                    }

                    let right_sum = total_sum - left_sum;
                    let right_sq = total_sq - left_sq;
                    let left_imp = left_sq / left_n - (left_sum / left_n).powi(2);
                    let right_imp = right_sq / right_n - (right_sum / right_n).powi(2);
                    let gain = parent_impurity - (left_n * left_imp + right_n * right_imp) / n;

                    if gain > 1e-12 && best.map_or(true, |b| gain > b.2) {
                        best = Some((feature, (here + next) / 2.0, gain));
                    }
                }
                best
            })
            .collect::<Vec<_>>()
            .into_iter()
            // Ties resolve to the lowest feature index so results never depend on thread timing
            .fold(None, |acc: Option<SplitCandidate>, cand| match acc {
                Some(a) if a.2 >= cand.2 => Some(a),
                _ => Some(cand),
            })
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::n_leaves)
    }

    pub(crate) fn predict_row(&self, sample: &[f64]) -> Result<f64> {
        let root = self.root.as_ref().ok_or(InsightError::ModelNotFitted)?;
        Ok(root.predict(sample))
    }

    pub(crate) fn importances_ref(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }
}

impl Regressor for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let rows: Vec<usize> = (0..x.nrows()).collect();
        self.fit_rows(x, y, &rows)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(InsightError::ModelNotFitted)?;
        check_predict_input(x, self.n_features)?;
        Ok(x.rows().into_iter().map(|row| root.predict(&row.to_vec())).collect())
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }

    fn name(&self) -> &'static str {
        "decision_tree"
    }

    fn supports_attribution(&self) -> bool {
        true
    }
}

fn mean_of(y: &Array1<f64>, indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

fn is_pure(y: &Array1<f64>, indices: &[usize]) -> bool {
    let Some(&first) = indices.first() else { return true };
    indices.iter().all(|&i| (y[i] - y[first]).abs() < 1e-10)
}
