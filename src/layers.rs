//! Dense layer implementation with weights, bias, activation and momentum state.
use crate::activations::ActivationKind;
use rand::Rng;

/// Matrix type
pub type Matrix = Vec<Vec<f64>>;

/// Update rule coefficients shared by every layer of a network.
#[derive(Debug, Clone, Copy)]
pub struct UpdateRule {
    pub learning_rate: f64,
    pub momentum: f64,
    pub weight_decay: f64,
}

/// A fully-connected (dense) layer.
///
/// `weights[i][j]` connects input `i` to output `j`, so the matrix has shape
/// `[fan_in][fan_out]`.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    pub weights: Matrix,
    pub bias: Vec<f64>,
    pub activation: ActivationKind,
    prev_weight_delta: Matrix,
    prev_bias_delta: Vec<f64>,
}

impl DenseLayer {
    /// Create a new dense layer with every weight and bias drawn from
    /// `U(-init_range, init_range)`.
    pub fn new<R: Rng + ?Sized>(
        fan_in: usize,
        fan_out: usize,
        activation: ActivationKind,
        init_range: f64,
        rng: &mut R,
    ) -> Self {
        let weights: Matrix = (0..fan_in)
            .map(|_| (0..fan_out).map(|_| rng.gen_range(-init_range..init_range)).collect())
            .collect();
        let bias = (0..fan_out).map(|_| rng.gen_range(-init_range..init_range)).collect();
        Self::from_parts(weights, bias, activation)
    }

    /// Build a layer from known parameters. Momentum state starts at zero.
    pub fn from_parts(weights: Matrix, bias: Vec<f64>, activation: ActivationKind) -> Self {
        let prev_weight_delta = weights.iter().map(|row| vec![0.0; row.len()]).collect();
        let prev_bias_delta = vec![0.0; bias.len()];
        Self {
            weights,
            bias,
            activation,
            prev_weight_delta,
            prev_bias_delta,
        }
    }

    pub fn fan_in(&self) -> usize {
        self.weights.len()
    }

    pub fn fan_out(&self) -> usize {
        self.bias.len()
    }

    /// Forward pass: `a = act(Wᵀ·x + b)`.
    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut z = self.bias.clone();
        for (row, &x) in self.weights.iter().zip(input) {
            for (zj, &w) in z.iter_mut().zip(row) {
                *zj += w * x;
            }
        }
        self.activation.function().apply_vec(&z)
    }

    /// Local gradient: `dz = upstream * act'(y)` for the cached outputs `y`.
    pub fn local_gradient(&self, outputs: &[f64], upstream: &[f64]) -> Vec<f64> {
        let act = self.activation.function();
        outputs
            .iter()
            .zip(upstream)
            .map(|(&y, &u)| u * act.derivative(y))
            .collect()
    }

    /// Error sent to the previous layer: `W·dz`.
    pub fn propagate(&self, dz: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .map(|row| row.iter().zip(dz).map(|(&w, &d)| w * d).sum())
            .collect()
    }

    /// Gradient descent step on `W` and `b` with optional momentum and weight decay.
    pub fn update(&mut self, input: &[f64], dz: &[f64], rule: UpdateRule) {
        for (i, (row, prev_row)) in self
            .weights
            .iter_mut()
            .zip(self.prev_weight_delta.iter_mut())
            .enumerate()
        {
            for (j, (w, prev)) in row.iter_mut().zip(prev_row.iter_mut()).enumerate() {
                let delta = -rule.learning_rate * dz[j] * input[i];
                *w = step(*w, delta, *prev, rule);
                *prev = delta;
            }
        }
        for ((b, prev), &d) in self
            .bias
            .iter_mut()
            .zip(self.prev_bias_delta.iter_mut())
            .zip(dz)
        {
            let delta = -rule.learning_rate * d;
            *b = step(*b, delta, *prev, rule);
            *prev = delta;
        }
    }
}

fn step(value: f64, delta: f64, prev_delta: f64, rule: UpdateRule) -> f64 {
    let mut v = value + delta;
    if rule.momentum > 0.0 {
        v += rule.momentum * prev_delta;
    }
    if rule.weight_decay > 0.0 {
        v -= rule.weight_decay * v;
    }
    v
}
