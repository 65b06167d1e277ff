//! Accuracy, confusion matrices and mean squared error for a trained network.
use crate::dataset::{argmax, Dataset};
use crate::error::{Error, Result};
use crate::loss::squared_error;
use crate::network::Network;
use serde::Serialize;
use std::fmt;

/// Confusion matrix: `matrix[true][predicted]` counts records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(n_classes: usize) -> Self {
        Self {
            matrix: vec![vec![0; n_classes]; n_classes],
        }
    }

    pub fn record(&mut self, true_class: usize, predicted: usize) {
        self.matrix[true_class][predicted] += 1;
    }

    pub fn matrix(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    pub fn n_classes(&self) -> usize {
        self.matrix.len()
    }

    pub fn get(&self, true_class: usize, predicted: usize) -> usize {
        self.matrix[true_class][predicted]
    }

    /// Number of records whose true class is `class`.
    pub fn support(&self, class: usize) -> usize {
        self.matrix[class].iter().sum()
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.n_classes()).map(|i| self.matrix[i][i]).sum()
    }

    pub fn accuracy(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.correct() as f64 / total as f64,
        }
    }
}

/// Rows are true classes, columns predicted classes.
impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.n_classes();
        let divider = "-".repeat(n * 7);
        for (i, row) in self.matrix.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|c| format!("{:>4} ", c)).collect();
            writeln!(f, "{}", cells.join("| "))?;
            if i + 1 < n {
                writeln!(f, "{}", divider)?;
            }
        }
        Ok(())
    }
}

/// Result of evaluating a network against one subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Fraction of records classified correctly, in `[0, 1]`.
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
}

/// Check that every record is `input_size + output_size` wide.
pub(crate) fn check_width(network: &Network, subset: &Dataset) -> Result<()> {
    let expected = network.input_size() + network.output_size();
    if !subset.is_empty() && subset.columns() != expected {
        return Err(Error::range(format!(
            "records have {} columns, network expects {} inputs + {} targets",
            subset.columns(),
            network.input_size(),
            network.output_size()
        )));
    }
    Ok(())
}

/// Winner-takes-all accuracy and confusion matrix for `subset`.
///
/// The predicted class is the argmax of the network output; the true class is
/// the argmax of the target suffix. Ties go to the lowest index.
pub fn evaluate(network: &Network, subset: &Dataset) -> Result<Evaluation> {
    check_width(network, subset)?;
    let n_in = network.input_size();
    let mut confusion = ConfusionMatrix::new(network.output_size());
    for row in subset.rows() {
        let output = network.predict(&row[..n_in])?;
        confusion.record(argmax(&row[n_in..]), argmax(&output));
    }
    Ok(Evaluation {
        accuracy: confusion.accuracy(),
        confusion,
    })
}

/// Accuracy
pub fn accuracy(network: &Network, subset: &Dataset) -> Result<f64> {
    evaluate(network, subset).map(|e| e.accuracy)
}

/// Average over records of the summed squared output error.
pub fn mean_squared_error(network: &Network, subset: &Dataset) -> Result<f64> {
    check_width(network, subset)?;
    if subset.is_empty() {
        return Ok(0.0);
    }
    let n_in = network.input_size();
    let mut sum = 0.0;
    for row in subset.rows() {
        let output = network.predict(&row[..n_in])?;
        sum += squared_error(&output, &row[n_in..]);
    }
    Ok(sum / subset.len() as f64)
}

/// Keeps the confusion matrix of the most recent accuracy call, for callers
/// that ask for accuracy and confusion separately.
#[derive(Debug, Default)]
pub struct Evaluator {
    last: Option<ConfusionMatrix>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accuracy(&mut self, network: &Network, subset: &Dataset) -> Result<f64> {
        let Evaluation { accuracy, confusion } = evaluate(network, subset)?;
        self.last = Some(confusion);
        Ok(accuracy)
    }

    /// Confusion matrix from the most recent [`Evaluator::accuracy`] call.
    pub fn confusion(&self) -> Result<&ConfusionMatrix> {
        self.last
            .as_ref()
            .ok_or_else(|| Error::state("confusion requested before any accuracy evaluation"))
    }
}
