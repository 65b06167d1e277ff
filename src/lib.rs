//! A small experimentation engine for feedforward classifiers: dataset
//! preparation, a single-hidden-layer network trained by online
//! backpropagation, evaluation, and weight persistence.
//!
//! - Delimited numeric tables with min-max normalization and one-hot exemplars
//! - Deterministic even / by-amount / by-percentage splits
//! - Sigmoid (or tanh/softmax) network with optional momentum and weight decay
//! - Per-epoch accuracy history and log file
//! - Accuracy and confusion matrices per subset
//! - Plain and verbose text weight files, plus gzipped JSON snapshots

pub mod activations;
pub mod config;
pub mod dataset;
pub mod error;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod network;
mod partition;
pub mod persistence;
pub mod trainer;
pub mod utils;

pub use activations::ActivationKind;
pub use config::{ExemplarOptions, NetworkConfig, SaveOptions, TrainingConfig};
pub use dataset::{ColumnScale, Dataset};
pub use error::{Error, Result};
pub use metrics::{accuracy, evaluate, mean_squared_error, ConfusionMatrix, Evaluation, Evaluator};
pub use network::Network;
pub use trainer::{train, EpochHistory, EpochRecord};
pub use utils::{generate_synthetic_data, model_summary, summary_table};
