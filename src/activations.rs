use serde::{Deserialize, Serialize};
use std::fmt;

/// Trait for activation functions.
///
/// Derivatives are expressed through the activation's own output `y`, which is
/// what the backward pass has cached.
pub trait Activation: fmt::Debug + Send + Sync {
    fn apply_vec(&self, z: &[f64]) -> Vec<f64>;
    fn derivative(&self, y: f64) -> f64;
}

/// Sigmoid: 1 / (1 + exp(-x))
#[derive(Debug, Clone, Copy, Default)]
pub struct Sigmoid;

impl Sigmoid {
    pub fn apply(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }
}

impl Activation for Sigmoid {
    fn apply_vec(&self, z: &[f64]) -> Vec<f64> {
        z.iter().map(|&x| Self::apply(x)).collect()
    }
    fn derivative(&self, y: f64) -> f64 {
        y * (1.0 - y)
    }
}

/// Tanh, clamped to ±1 outside ±20 where the float result saturates anyway.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tanh;

impl Tanh {
    pub fn apply(x: f64) -> f64 {
        if x < -20.0 {
            -1.0
        } else if x > 20.0 {
            1.0
        } else {
            x.tanh()
        }
    }
}

impl Activation for Tanh {
    fn apply_vec(&self, z: &[f64]) -> Vec<f64> {
        z.iter().map(|&x| Self::apply(x)).collect()
    }
    fn derivative(&self, y: f64) -> f64 {
        (1.0 - y) * (1.0 + y)
    }
}

/// Softmax (vector-only, output layer only)
#[derive(Debug, Clone, Copy, Default)]
pub struct Softmax;

impl Activation for Softmax {
    fn apply_vec(&self, z: &[f64]) -> Vec<f64> {
        if z.is_empty() {
            return Vec::new();
        }
        let max = z.iter().fold(f64::MIN, |a, &b| a.max(b));
        let exps: Vec<f64> = z.iter().map(|&zi| (zi - max).exp()).collect();
        let sum: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / sum).collect()
    }
    // Diagonal of the softmax Jacobian; off-diagonal terms are ignored by the
    // squared-error update rule.
    fn derivative(&self, y: f64) -> f64 {
        y * (1.0 - y)
    }
}

/// Serializable activation kinds for configuration and snapshots
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivationKind {
    #[default]
    Sigmoid,
    Tanh,
    Softmax,
}

impl ActivationKind {
    pub fn function(&self) -> &'static dyn Activation {
        match self {
            ActivationKind::Sigmoid => &Sigmoid,
            ActivationKind::Tanh => &Tanh,
            ActivationKind::Softmax => &Softmax,
        }
    }

    /// Whether the activation can be applied element-wise (i.e. on a hidden layer).
    pub fn is_elementwise(&self) -> bool {
        !matches!(self, ActivationKind::Softmax)
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivationKind::Sigmoid => "sigmoid",
            ActivationKind::Tanh => "tanh",
            ActivationKind::Softmax => "softmax",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sigmoid_range_and_midpoint() {
        let y = Sigmoid.apply_vec(&[-50.0, 0.0, 50.0]);
        assert_abs_diff_eq!(y[1], 0.5);
        assert!(y.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_abs_diff_eq!(Sigmoid.derivative(0.5), 0.25);
    }

    #[test]
    fn test_tanh_saturates() {
        assert_eq!(Tanh::apply(25.0), 1.0);
        assert_eq!(Tanh::apply(-25.0), -1.0);
        assert_abs_diff_eq!(Tanh.derivative(0.0), 1.0);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let y = Softmax.apply_vec(&[1.0, 2.0, 3.0]);
        assert_abs_diff_eq!(y.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(y[2] > y[1] && y[1] > y[0]);
        assert!(Softmax.apply_vec(&[]).is_empty());
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&ActivationKind::Tanh).unwrap();
        assert_eq!(json, "\"tanh\"");
        assert!(!ActivationKind::Softmax.is_elementwise());
        assert_eq!(ActivationKind::default(), ActivationKind::Sigmoid);
    }
}
