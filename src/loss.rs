//! Squared-error loss used by the backpropagation update and the training log.

/// Sum of squared differences between `pred` and `target`.
pub fn squared_error(pred: &[f64], target: &[f64]) -> f64 {
    pred.iter()
        .zip(target)
        .map(|(&p, &t)| (p - t).powi(2))
        .sum()
}

/// Output error `pred - target`, the gradient of half the squared error.
pub fn output_error(pred: &[f64], target: &[f64]) -> Vec<f64> {
    pred.iter().zip(target).map(|(&p, &t)| p - t).collect()
}
