//! Epoch-driven online training with per-epoch accuracy history and log file.
use crate::config::TrainingConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::metrics::{check_width, evaluate, mean_squared_error};
use crate::network::Network;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, instrument};

/// Per-epoch accuracy (in `[0, 1]`) and mean squared error on the training and
/// testing subsets, in epoch order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochHistory {
    training_accuracy: Vec<f64>,
    testing_accuracy: Vec<f64>,
    training_mse: Vec<f64>,
    testing_mse: Vec<f64>,
}

/// Metrics recorded at the end of one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochRecord {
    /// 1-based epoch number.
    pub epoch: usize,
    pub training_accuracy: f64,
    pub testing_accuracy: f64,
    pub training_mse: f64,
    pub testing_mse: f64,
}

impl EpochRecord {
    /// Log line: epoch, both MSEs, both accuracies as percentages.
    pub fn log_line(&self) -> String {
        format!(
            "{} {:.6} {:.6} {:.2}% {:.2}%",
            self.epoch,
            self.training_mse,
            self.testing_mse,
            self.training_accuracy * 100.0,
            self.testing_accuracy * 100.0
        )
    }
}

impl EpochHistory {
    fn push(&mut self, record: &EpochRecord) {
        self.training_accuracy.push(record.training_accuracy);
        self.testing_accuracy.push(record.testing_accuracy);
        self.training_mse.push(record.training_mse);
        self.testing_mse.push(record.testing_mse);
    }

    pub fn training_accuracy(&self) -> &[f64] {
        &self.training_accuracy
    }

    pub fn testing_accuracy(&self) -> &[f64] {
        &self.testing_accuracy
    }

    pub fn training_mse(&self) -> &[f64] {
        &self.training_mse
    }

    pub fn testing_mse(&self) -> &[f64] {
        &self.testing_mse
    }

    pub fn len(&self) -> usize {
        self.training_accuracy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.training_accuracy.is_empty()
    }

    pub fn last(&self) -> Option<EpochRecord> {
        let i = self.len().checked_sub(1)?;
        Some(EpochRecord {
            epoch: i + 1,
            training_accuracy: self.training_accuracy[i],
            testing_accuracy: self.testing_accuracy[i],
            training_mse: self.training_mse[i],
            testing_mse: self.testing_mse[i],
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn open_log(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Train `network` for `config.epochs` epochs of online backpropagation over
/// `training`, evaluating both subsets after every epoch.
///
/// Records are visited in dataset order unless `config.shuffle_seed` is set.
/// Diverging weights are not detected; they show up as degenerate accuracy.
#[instrument(skip_all, fields(epochs = config.epochs, learning_rate = config.learning_rate))]
pub fn train(
    network: &mut Network,
    training: &Dataset,
    testing: &Dataset,
    config: &TrainingConfig,
) -> Result<EpochHistory> {
    check_width(network, training)?;
    check_width(network, testing)?;
    // Opened before the first update so a bad path leaves the weights untouched.
    let mut log = config.log_path.as_deref().map(open_log).transpose()?;

    let n_in = network.input_size();
    let mut rng = config.shuffle_seed.map(StdRng::seed_from_u64);
    let mut order: Vec<usize> = (0..training.len()).collect();
    let mut history = EpochHistory::default();

    for epoch in 1..=config.epochs {
        if let Some(rng) = rng.as_mut() {
            order.shuffle(rng);
        }
        for &idx in &order {
            let row = &training.rows()[idx];
            network.forward(&row[..n_in])?;
            network.backward(&row[n_in..], config.learning_rate)?;
        }

        let record = EpochRecord {
            epoch,
            training_accuracy: evaluate(network, training)?.accuracy,
            testing_accuracy: evaluate(network, testing)?.accuracy,
            training_mse: mean_squared_error(network, training)?,
            testing_mse: mean_squared_error(network, testing)?,
        };
        history.push(&record);
        if let Some(log) = log.as_mut() {
            writeln!(log, "{}", record.log_line())?;
        }
        info!(
            epoch,
            train_acc = record.training_accuracy,
            test_acc = record.testing_accuracy,
            train_mse = record.training_mse,
            "epoch complete"
        );
    }

    if let Some(mut log) = log {
        log.flush()?;
    }
    Ok(history)
}
