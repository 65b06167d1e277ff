//! Single-hidden-layer feedforward classifier trained by online backpropagation.
use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use crate::layers::{DenseLayer, Matrix, UpdateRule};
use crate::loss::output_error;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;

/// Activations of the most recent `forward` call, consumed by `backward`.
#[derive(Debug, Clone)]
struct ForwardCache {
    input: Vec<f64>,
    hidden: Vec<f64>,
    output: Vec<f64>,
}

/// Network
#[derive(Debug, Clone)]
pub struct Network {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    /// Input → hidden transition (`W1` is `[input][hidden]`).
    hidden: DenseLayer,
    /// Hidden → output transition (`W2` is `[hidden][output]`).
    output: DenseLayer,
    config: NetworkConfig,
    cache: Option<ForwardCache>,
}

impl Network {
    /// Create a network with the default configuration (sigmoid on both layers).
    pub fn new(input_size: usize, hidden_size: usize, output_size: usize) -> Result<Self> {
        Self::with_config(input_size, hidden_size, output_size, &NetworkConfig::default())
    }

    pub fn with_config(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        config: &NetworkConfig,
    ) -> Result<Self> {
        if input_size == 0 || hidden_size == 0 || output_size == 0 {
            return Err(Error::range(format!(
                "layer sizes must be positive, got [{}, {}, {}]",
                input_size, hidden_size, output_size
            )));
        }
        if !config.hidden_activation.is_elementwise() {
            return Err(Error::range(format!(
                "{} is only valid on the output layer",
                config.hidden_activation
            )));
        }
        if !(config.init_range.is_finite() && config.init_range > 0.0) {
            return Err(Error::range(format!(
                "init_range must be finite and positive, got {}",
                config.init_range
            )));
        }
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let hidden = DenseLayer::new(
            input_size,
            hidden_size,
            config.hidden_activation,
            config.init_range,
            &mut rng,
        );
        let output = DenseLayer::new(
            hidden_size,
            output_size,
            config.output_activation,
            config.init_range,
            &mut rng,
        );
        Ok(Self {
            input_size,
            hidden_size,
            output_size,
            hidden,
            output,
            config: config.clone(),
            cache: None,
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Input → hidden weights, `[input][hidden]`.
    pub fn hidden_weights(&self) -> &Matrix {
        &self.hidden.weights
    }

    pub fn hidden_bias(&self) -> &[f64] {
        &self.hidden.bias
    }

    /// Hidden → output weights, `[hidden][output]`.
    pub fn output_weights(&self) -> &Matrix {
        &self.output.weights
    }

    pub fn output_bias(&self) -> &[f64] {
        &self.output.bias
    }

    /// Total number of weights and biases.
    pub fn num_weights(&self) -> usize {
        self.input_size * self.hidden_size
            + self.hidden_size
            + self.hidden_size * self.output_size
            + self.output_size
    }

    /// Forward pass, caching the activations for the next `backward` call.
    pub fn forward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        let (hidden, output) = self.activations(input)?;
        self.cache = Some(ForwardCache {
            input: input.to_vec(),
            hidden,
            output: output.clone(),
        });
        Ok(output)
    }

    /// Forward pass that leaves the cache untouched.
    pub fn predict(&self, input: &[f64]) -> Result<Vec<f64>> {
        self.activations(input).map(|(_, output)| output)
    }

    fn activations(&self, input: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
        if input.len() != self.input_size {
            return Err(Error::range(format!(
                "expected {} inputs, got {}",
                self.input_size,
                input.len()
            )));
        }
        let hidden = self.hidden.forward(input);
        let output = self.output.forward(&hidden);
        Ok((hidden, output))
    }

    /// Backpropagate the error of the cached forward pass against `target`
    /// and apply one gradient descent step.
    pub fn backward(&mut self, target: &[f64], learning_rate: f64) -> Result<()> {
        if target.len() != self.output_size {
            return Err(Error::range(format!(
                "expected {} targets, got {}",
                self.output_size,
                target.len()
            )));
        }
        let cache = self
            .cache
            .take()
            .ok_or_else(|| Error::state("backward called without a preceding forward pass"))?;

        // Both deltas are computed before either layer moves.
        let output_delta = self
            .output
            .local_gradient(&cache.output, &output_error(&cache.output, target));
        let hidden_delta = self
            .hidden
            .local_gradient(&cache.hidden, &self.output.propagate(&output_delta));

        let rule = UpdateRule {
            learning_rate,
            momentum: self.config.momentum,
            weight_decay: self.config.weight_decay,
        };
        self.hidden.update(&cache.input, &hidden_delta, rule);
        self.output.update(&cache.hidden, &output_delta, rule);
        Ok(())
    }

    /// Flat copy of all parameters in `W1, b1, W2, b2` order.
    pub fn weights(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.num_weights());
        flat.extend(self.hidden.weights.iter().flatten());
        flat.extend(&self.hidden.bias);
        flat.extend(self.output.weights.iter().flatten());
        flat.extend(&self.output.bias);
        flat
    }

    /// Replace all parameters from a flat `W1, b1, W2, b2` slice.
    ///
    /// Momentum state and any cached forward pass are reset.
    pub fn set_weights(&mut self, flat: &[f64]) -> Result<()> {
        if flat.len() != self.num_weights() {
            return Err(Error::format(format!(
                "expected {} weights for a [{}, {}, {}] network, got {}",
                self.num_weights(),
                self.input_size,
                self.hidden_size,
                self.output_size,
                flat.len()
            )));
        }
        let mut values = flat.iter().copied();
        let mut take_matrix = |rows: usize, cols: usize| -> Matrix {
            (0..rows)
                .map(|_| values.by_ref().take(cols).collect())
                .collect()
        };
        let w1 = take_matrix(self.input_size, self.hidden_size);
        let b1 = take_matrix(1, self.hidden_size).remove(0);
        let w2 = take_matrix(self.hidden_size, self.output_size);
        let b2 = take_matrix(1, self.output_size).remove(0);

        self.hidden = DenseLayer::from_parts(w1, b1, self.config.hidden_activation);
        self.output = DenseLayer::from_parts(w2, b2, self.config.output_activation);
        self.cache = None;
        Ok(())
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Network: [{}, {}, {}] ({} -> {})",
            self.input_size,
            self.hidden_size,
            self.output_size,
            self.config.hidden_activation,
            self.config.output_activation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activations::ActivationKind;
    use approx::assert_abs_diff_eq;

    fn seeded(seed: u64) -> NetworkConfig {
        NetworkConfig {
            seed: Some(seed),
            ..NetworkConfig::default()
        }
    }

    #[test]
    fn test_rejects_zero_sizes() {
        assert!(matches!(Network::new(0, 4, 3), Err(Error::Range(_))));
        assert!(matches!(Network::new(4, 0, 3), Err(Error::Range(_))));
        assert!(matches!(Network::new(4, 4, 0), Err(Error::Range(_))));
    }

    #[test]
    fn test_rejects_softmax_hidden() {
        let cfg = NetworkConfig {
            hidden_activation: ActivationKind::Softmax,
            ..NetworkConfig::default()
        };
        assert!(matches!(Network::with_config(2, 2, 2, &cfg), Err(Error::Range(_))));
    }

    #[test]
    fn test_shapes_and_weight_count() {
        let net = Network::new(4, 5, 3).unwrap();
        assert_eq!(net.hidden_weights().len(), 4);
        assert_eq!(net.hidden_weights()[0].len(), 5);
        assert_eq!(net.output_weights().len(), 5);
        assert_eq!(net.output_weights()[0].len(), 3);
        assert_eq!(net.num_weights(), 4 * 5 + 5 + 5 * 3 + 3);
        assert_eq!(net.weights().len(), net.num_weights());
        assert!(net.weights().iter().all(|w| w.abs() <= 0.5));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = Network::with_config(3, 4, 2, &seeded(9)).unwrap();
        let b = Network::with_config(3, 4, 2, &seeded(9)).unwrap();
        assert_eq!(a.weights(), b.weights());
    }

    #[test]
    fn test_forward_outputs_in_unit_interval() {
        let mut net = Network::with_config(3, 4, 2, &seeded(1)).unwrap();
        let y = net.forward(&[0.1, 0.5, 0.9]).unwrap();
        assert_eq!(y.len(), 2);
        assert!(y.iter().all(|&v| v > 0.0 && v < 1.0));
        assert_eq!(net.predict(&[0.1, 0.5, 0.9]).unwrap(), y);
        assert!(matches!(net.forward(&[0.1]), Err(Error::Range(_))));
    }

    #[test]
    fn test_backward_requires_forward() {
        let mut net = Network::with_config(2, 2, 2, &seeded(2)).unwrap();
        assert!(matches!(net.backward(&[1.0, 0.0], 0.1), Err(Error::State(_))));
        net.forward(&[0.2, 0.8]).unwrap();
        net.backward(&[1.0, 0.0], 0.1).unwrap();
        // The cache is consumed by the first backward call.
        assert!(matches!(net.backward(&[1.0, 0.0], 0.1), Err(Error::State(_))));
    }

    #[test]
    fn test_predict_does_not_arm_backward() {
        let mut net = Network::with_config(2, 2, 2, &seeded(2)).unwrap();
        net.predict(&[0.2, 0.8]).unwrap();
        assert!(matches!(net.backward(&[1.0, 0.0], 0.1), Err(Error::State(_))));
    }

    #[test]
    fn test_backward_reduces_error_on_single_record() {
        let mut net = Network::with_config(2, 3, 2, &seeded(4)).unwrap();
        let x = [0.3, 0.7];
        let t = [1.0, 0.0];
        let before = net.predict(&x).unwrap();
        for _ in 0..50 {
            net.forward(&x).unwrap();
            net.backward(&t, 0.5).unwrap();
        }
        let after = net.predict(&x).unwrap();
        let err = |y: &[f64]| crate::loss::squared_error(y, &t);
        assert!(err(&after) < err(&before));
    }

    #[test]
    fn test_set_weights_round_trip() {
        let a = Network::with_config(3, 2, 2, &seeded(5)).unwrap();
        let mut b = Network::with_config(3, 2, 2, &seeded(6)).unwrap();
        b.set_weights(&a.weights()).unwrap();
        let x = [0.4, 0.1, 0.9];
        let ya = a.predict(&x).unwrap();
        let yb = b.predict(&x).unwrap();
        for (p, q) in ya.iter().zip(&yb) {
            assert_abs_diff_eq!(p, q);
        }
        assert!(matches!(b.set_weights(&[0.0; 3]), Err(Error::Format(_))));
    }

    #[test]
    fn test_display() {
        let net = Network::new(4, 5, 3).unwrap();
        assert_eq!(net.to_string(), "Network: [4, 5, 3] (sigmoid -> sigmoid)");
    }
}
