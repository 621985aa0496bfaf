//! Feed-forward network regressor trained with mini-batch Adam
//!
//! The training loop (forward pass, backpropagation, Adam update) is written
//! out here rather than delegated to a library.

use super::models::{check_fit_input, check_predict_input, Regressor};
use crate::error::{InsightError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MLPConfig {
    /// Hidden layer sizes, each followed by ReLU
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    /// Passes over the shuffled training data
    pub epochs: usize,
    pub batch_size: usize,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    pub random_state: u64,
}

impl Default for MLPConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64, 32],
            learning_rate: 0.01,
            epochs: 50,
            batch_size: 16,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            random_state: 42,
        }
    }
}

/// First and second moment estimates for one parameter tensor
#[derive(Debug, Clone)]
struct AdamState<D: ndarray::Dimension> {
    m: ndarray::Array<f64, D>,
    v: ndarray::Array<f64, D>,
}

impl<D: ndarray::Dimension> AdamState<D> {
    fn zeros_like(param: &ndarray::Array<f64, D>) -> Self {
        Self {
            m: ndarray::Array::zeros(param.raw_dim()),
            v: ndarray::Array::zeros(param.raw_dim()),
        }
    }

    fn step(&mut self, param: &mut ndarray::Array<f64, D>, grad: &ndarray::Array<f64, D>, config: &MLPConfig, t: i32) {
        let (b1, b2) = (config.beta1, config.beta2);
        self.m.zip_mut_with(grad, |m, &g| *m = b1 * *m + (1.0 - b1) * g);
        self.v.zip_mut_with(grad, |v, &g| *v = b2 * *v + (1.0 - b2) * g * g);

        let bias1 = 1.0 - b1.powi(t);
        let bias2 = 1.0 - b2.powi(t);
        let step = config.learning_rate / bias1;
        let eps = config.epsilon;

        ndarray::Zip::from(param)
            .and(&self.m)
            .and(&self.v)
            .for_each(|p, &m, &v| *p -= step * m / ((v / bias2).sqrt() + eps));
    }
}

/// Multi-layer perceptron regressor: input -> 64 -> ReLU -> 32 -> ReLU -> 1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MLPRegressor {
    config: MLPConfig,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    n_features: usize,
    is_fitted: bool,
    /// Mean training loss of the last epoch
    final_loss: Option<f64>,
}

impl Default for MLPRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl MLPRegressor {
    pub fn new() -> Self {
        Self::with_config(MLPConfig::default())
    }

    pub fn with_config(config: MLPConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            biases: Vec::new(),
            n_features: 0,
            is_fitted: false,
            final_loss: None,
        }
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.config.random_state = seed;
        self
    }

    pub fn config(&self) -> &MLPConfig {
        &self.config
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.final_loss
    }

    /// Uniform(-1/sqrt(fan_in), 1/sqrt(fan_in)) for weights and biases
    fn initialize_weights(&mut self, rng: &mut Xoshiro256PlusPlus) {
        self.weights.clear();
        self.biases.clear();

        let mut layer_sizes = vec![self.n_features];
        layer_sizes.extend(&self.config.hidden_layers);
        layer_sizes.push(1);

        for pair in layer_sizes.windows(2) {
            let (n_in, n_out) = (pair[0], pair[1]);
            let bound = 1.0 / (n_in.max(1) as f64).sqrt();
            let w = Array2::from_shape_simple_fn((n_in, n_out), || rng.gen_range(-bound..=bound));
            let b = Array1::from_shape_simple_fn(n_out, || rng.gen_range(-bound..=bound));
            self.weights.push(w);
            self.biases.push(b);
        }
    }

    /// Returns layer inputs (activations) and pre-activations
    fn forward(&self, x: Array2<f64>) -> (Vec<Array2<f64>>, Vec<Array2<f64>>) {
        let n_layers = self.weights.len();
        let mut activations = Vec::with_capacity(n_layers + 1);
        let mut z_values = Vec::with_capacity(n_layers);
        activations.push(x);

        for (i, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let z = activations[i].dot(w) + b;
            let a = if i + 1 < n_layers { z.mapv(|v| v.max(0.0)) } else { z.clone() };
            z_values.push(z);
            activations.push(a);
        }

        (activations, z_values)
    }

    /// Gradients of the batch-mean squared error
    fn backward(&self, y: &Array1<f64>, activations: &[Array2<f64>], z_values: &[Array2<f64>]) -> Vec<(Array2<f64>, Array1<f64>)> {
        let n = y.len() as f64;
        let mut gradients = Vec::with_capacity(self.weights.len());

        let y_2d = y.view().insert_axis(Axis(1));
        let output = &activations[activations.len() - 1];
        let mut delta = (output - &y_2d) * (2.0 / n);

        for i in (0..self.weights.len()).rev() {
            let grad_w = activations[i].t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));
            gradients.push((grad_w, grad_b));

            if i > 0 {
                let relu_grad = z_values[i - 1].mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
                delta = delta.dot(&self.weights[i].t()) * relu_grad;
            }
        }

        gradients.reverse();
        gradients
    }

    fn is_finite(&self) -> bool {
        self.weights.iter().all(|w| w.iter().all(|v| v.is_finite()))
            && self.biases.iter().all(|b| b.iter().all(|v| v.is_finite()))
    }
}

impl Regressor for MLPRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        if self.config.batch_size == 0 {
            return Err(InsightError::ValidationError("batch size must be positive".to_string()));
        }
        let n_samples = x.nrows();
        self.n_features = x.ncols();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        self.initialize_weights(&mut rng);

        let mut adam_w: Vec<AdamState<ndarray::Ix2>> = self.weights.iter().map(AdamState::zeros_like).collect();
        let mut adam_b: Vec<AdamState<ndarray::Ix1>> = self.biases.iter().map(AdamState::zeros_like).collect();
        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut t = 0i32;
        let mut epoch_loss = 0.0;

        for _epoch in 0..self.config.epochs {
            indices.shuffle(&mut rng);
            epoch_loss = 0.0;

            for batch in indices.chunks(self.config.batch_size) {
                let x_batch = x.select(Axis(0), batch);
                let y_batch = y.select(Axis(0), batch);

                let (activations, z_values) = self.forward(x_batch);
                let output = activations[activations.len() - 1].column(0);
                epoch_loss += output.iter().zip(y_batch.iter()).map(|(p, t)| (p - t).powi(2)).sum::<f64>();

                let gradients = self.backward(&y_batch, &activations, &z_values);
                t = t.saturating_add(1);
                for (i, (grad_w, grad_b)) in gradients.iter().enumerate() {
                    adam_w[i].step(&mut self.weights[i], grad_w, &self.config, t);
                    adam_b[i].step(&mut self.biases[i], grad_b, &self.config, t);
                }
            }
        }

        if !self.is_finite() {
            return Err(InsightError::ComputationError("network weights diverged to non-finite values".to_string()));
        }

        self.final_loss = Some(epoch_loss / n_samples as f64);
        self.is_fitted = true;
        debug!(epochs = self.config.epochs, steps = t, final_loss = ?self.final_loss, "MLP training complete");
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(InsightError::ModelNotFitted);
        }
        check_predict_input(x, self.n_features)?;
        let (activations, _) = self.forward(x.to_owned());
        Ok(activations[activations.len() - 1].column(0).to_owned())
    }

    fn name(&self) -> &'static str {
        "pytorch_nn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_regression_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((64, 2), |(i, j)| if j == 0 { (i as f64) / 32.0 - 1.0 } else { ((i % 8) as f64) / 8.0 });
        let y = x.column(0).mapv(|v| 2.0 * v) + x.column(1).mapv(|v| -v) + 0.5;
        (x, y)
    }

    #[test]
    fn test_default_architecture() {
        let (x, y) = create_regression_data();
        let mut model = MLPRegressor::new();
        model.fit(&x, &y).unwrap();

        let shapes: Vec<_> = model.weights.iter().map(|w| w.dim()).collect();
        assert_eq!(shapes, vec![(2, 64), (64, 32), (32, 1)]);
        assert_eq!(model.config().batch_size, 16);
        assert_eq!(model.config().epochs, 50);
    }

    #[test]
    fn test_mlp_regressor_learns() {
        let (x, y) = create_regression_data();
        let mut model = MLPRegressor::new();
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        let mse = preds.iter().zip(y.iter()).map(|(p, t)| (p - t).powi(2)).sum::<f64>() / y.len() as f64;
        let var = y.var(0.0);
        assert!(mse < 0.2 * var, "MSE {} vs variance {}", mse, var);
    }

    #[test]
    fn test_seeded_training_is_reproducible() {
        let (x, y) = create_regression_data();
        let mut a = MLPRegressor::new().with_random_state(3);
        let mut b = MLPRegressor::new().with_random_state(3);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_predict_before_fit() {
        let model = MLPRegressor::new();
        assert!(matches!(model.predict(&Array2::zeros((1, 2))), Err(InsightError::ModelNotFitted)));
    }
}
