//! Helpers for demos and reports: synthetic data and text summaries.
use crate::dataset::Dataset;
use crate::network::Network;
use crate::trainer::EpochHistory;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate `n_samples` labelled records around one random centre per class.
///
/// Each row holds `input_size` features followed by an integer class label in
/// `[0, class_count)`, i.e. the raw layout `make_exemplar` expects. Classes
/// are assigned round-robin so every class is represented.
pub fn generate_synthetic_data(
    n_samples: usize,
    input_size: usize,
    class_count: usize,
    seed: u64,
) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let classes = class_count.max(1);
    let centres: Vec<Vec<f64>> = (0..classes)
        .map(|_| (0..input_size).map(|_| rng.gen_range(-5.0..5.0)).collect())
        .collect();
    let rows = (0..n_samples)
        .map(|i| {
            let class = i % classes;
            let mut row: Vec<f64> = centres[class]
                .iter()
                .map(|&c| c + rng.gen_range(-1.0..1.0))
                .collect();
            row.push(class as f64);
            row
        })
        .collect();
    // Every row has input_size + 1 fields, so construction cannot fail.
    Dataset::from_rows(rows).unwrap_or_default()
}

/// Model summary
pub fn model_summary(network: &Network) -> String {
    format!(
        "Model Summary:\n{}\nParameters: {}",
        network,
        network.num_weights()
    )
}

/// Simple table of first, best and final accuracies.
pub fn summary_table(history: &EpochHistory) -> String {
    let mut out = String::new();
    out.push_str("+-------------+----------+----------+\n");
    out.push_str("| Epoch       | Training | Testing  |\n");
    out.push_str("+-------------+----------+----------+\n");
    let train = history.training_accuracy();
    let test = history.testing_accuracy();
    if !history.is_empty() {
        let best = (0..test.len()).fold(0, |b, i| if test[i] > test[b] { i } else { b });
        let last = history.len() - 1;
        for (label, i) in [("First", 0), ("Best", best), ("Final", last)] {
            out.push_str(&format!(
                "| {:<5} {:>5} | {:>7.2}% | {:>7.2}% |\n",
                label,
                i + 1,
                train[i] * 100.0,
                test[i] * 100.0
            ));
        }
    }
    out.push_str("+-------------+----------+----------+\n");
    out
}
