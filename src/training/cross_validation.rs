//! Hold-out and K-fold splitting

use crate::error::{InsightError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A single train/test split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Shuffled hold-out split. The test part has `ceil(n * test_size)` rows and
/// both parts must be non-empty.
pub fn train_test_split(n_samples: usize, test_size: f64, seed: u64) -> Result<CVSplit> {
    if !(0.0..1.0).contains(&test_size) || test_size == 0.0 {
        return Err(InsightError::ValidationError(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n_test = (n_samples as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(InsightError::ValidationError(format!(
            "cannot split {} rows into train and test with test_size {}",
            n_samples, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train_indices = indices.split_off(n_test);
    Ok(CVSplit { train_indices, test_indices: indices, fold_idx: 0 })
}

/// K-fold splitter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub random_state: u64,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits, shuffle: true, random_state: 42 }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Generate train/test splits; the first `n % k` folds get one extra row
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        if self.n_splits < 2 {
            return Err(InsightError::ValidationError("n_splits must be at least 2".to_string()));
        }
        if n_samples < self.n_splits {
            return Err(InsightError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
            indices.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;
        let mut splits = Vec::with_capacity(self.n_splits);
        let mut current = 0;

        for fold_idx in 0..self.n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices = indices[current..current + fold_size].to_vec();
            let train_indices = indices[..current]
                .iter()
                .chain(&indices[current + fold_size..])
                .copied()
                .collect();

            splits.push(CVSplit { train_indices, test_indices, fold_idx });
            current += fold_size;
        }

        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let split = train_test_split(5, 0.2, 42).unwrap();
        assert_eq!(split.test_indices.len(), 1);
        assert_eq!(split.train_indices.len(), 4);

        let split = train_test_split(11, 0.2, 42).unwrap();
        assert_eq!(split.test_indices.len(), 3);
        assert_eq!(split.train_indices.len(), 8);
    }

    #[test]
    fn test_split_is_partition_and_seeded() {
        let a = train_test_split(50, 0.2, 42).unwrap();
        let b = train_test_split(50, 0.2, 42).unwrap();
        assert_eq!(a, b);

        let mut all: Vec<usize> = a.train_indices.iter().chain(&a.test_indices).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_too_small() {
        assert!(train_test_split(1, 0.2, 42).is_err());
        assert!(train_test_split(0, 0.2, 42).is_err());
        assert!(train_test_split(10, 1.5, 42).is_err());
    }

    #[test]
    fn test_kfold() {
        let splits = KFold::new(3).split(10).unwrap();
        assert_eq!(splits.len(), 3);
        assert_eq!(splits.iter().map(|s| s.test_indices.len()).collect::<Vec<_>>(), vec![4, 3, 3]);

        let mut tested: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        tested.sort_unstable();
        assert_eq!(tested, (0..10).collect::<Vec<_>>());
        for s in &splits {
            assert_eq!(s.train_indices.len() + s.test_indices.len(), 10);
        }
    }

    #[test]
    fn test_kfold_without_shuffle_is_contiguous() {
        let splits = KFold::new(2).with_shuffle(false).split(5).unwrap();
        assert_eq!(splits[0].test_indices, vec![0, 1, 2]);
        assert_eq!(splits[1].test_indices, vec![3, 4]);
        assert_eq!(splits[1].train_indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_kfold_errors() {
        assert!(KFold::new(1).split(10).is_err());
        assert!(KFold::new(3).split(2).is_err());
    }
}
