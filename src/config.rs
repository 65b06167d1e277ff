//! Typed configuration for network construction, training, persistence and
//! exemplar encoding.
use crate::activations::ActivationKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Network construction options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Activation on the hidden layer (element-wise kinds only).
    pub hidden_activation: ActivationKind,
    /// Activation on the output layer.
    pub output_activation: ActivationKind,
    /// Initial weights and biases are drawn uniformly from `[-init_range, init_range)`.
    pub init_range: f64,
    /// Fraction of the previous update added to the current one.
    pub momentum: f64,
    /// Fraction of each weight removed after every update.
    pub weight_decay: f64,
    /// Seed for weight initialization; `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hidden_activation: ActivationKind::Sigmoid,
            output_activation: ActivationKind::Sigmoid,
            init_range: 0.5,
            momentum: 0.0,
            weight_decay: 0.0,
            seed: None,
        }
    }
}

/// Options for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// Per-epoch log file; parent directories are created.
    pub log_path: Option<PathBuf>,
    /// When set, training records are visited in a fresh seeded order each epoch.
    pub shuffle_seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: 0.1,
            log_path: None,
            shuffle_seed: None,
        }
    }
}

/// Weight file output options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Annotate values with layer labels and brackets.
    pub verbose: bool,
    /// Decimal places written for every value.
    pub precision: usize,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            precision: 4,
        }
    }
}

/// How the trailing label column(s) of each record become a one-hot target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExemplarOptions {
    pub input_columns: usize,
    pub class_count: usize,
    #[serde(default = "default_label_width")]
    pub label_width: usize,
    /// Value of the first class label (1 for files labelled 1..=n).
    #[serde(default)]
    pub label_offset: i64,
}

fn default_label_width() -> usize {
    1
}

impl ExemplarOptions {
    pub fn new(input_columns: usize, class_count: usize, label_width: usize) -> Self {
        Self {
            input_columns,
            class_count,
            label_width,
            label_offset: 0,
        }
    }

    pub fn with_label_offset(mut self, label_offset: i64) -> Self {
        self.label_offset = label_offset;
        self
    }
}
