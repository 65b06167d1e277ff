use ann_lab::{
    generate_synthetic_data, model_summary, persistence, summary_table, train, ActivationKind,
    Dataset, EpochHistory, Evaluator, ExemplarOptions, Network, NetworkConfig, SaveOptions,
    TrainingConfig,
};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Samples drawn when an experiment has no data file.
const SYNTHETIC_SAMPLES: usize = 150;

/// One end-to-end run: load, prepare, split, train, evaluate, save.
/// Also defines the JSON config file format (omitted fields take defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub name: String,
    /// Delimited data file; `None` generates clustered synthetic data.
    #[serde(default)]
    pub data: Option<PathBuf>,
    /// Inclusive column range to min-max normalize.
    #[serde(default)]
    pub normalize: Option<[usize; 2]>,
    pub exemplar: ExemplarOptions,
    /// Seed for shuffling records before splitting; `None` keeps file order.
    #[serde(default)]
    pub split_seed: Option<u64>,
    /// Number of even subsets: training, testing, then validation.
    #[serde(default = "default_subsets")]
    pub subsets: usize,
    pub hidden: usize,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default = "default_save")]
    pub save: SaveOptions,
    /// Directory for the log, weights and history files.
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
}

fn default_subsets() -> usize {
    3
}

fn default_save() -> SaveOptions {
    SaveOptions {
        verbose: false,
        precision: 8,
    }
}

pub const PRESETS: [&str; 4] = ["iris", "cancer", "wine", "synthetic"];

impl ExperimentConfig {
    pub fn preset(name: &str) -> Result<Self> {
        // Iris, Cancer and Wine files label their classes from 1.
        let (data, last_feature, classes, hidden, epochs, learning_rate) = match name {
            "iris" => (Some("data/iris.dat"), 3, 3, 5, 100, 0.1),
            "cancer" => (Some("data/cancer.dat"), 8, 2, 3, 14, 0.03),
            "wine" => (Some("data/wine.dat"), 12, 3, 5, 70, 0.05),
            "synthetic" => (None, 3, 3, 5, 50, 0.1),
            other => bail!("unknown preset {:?}, expected one of {:?}", other, PRESETS),
        };
        let offset = if data.is_some() { 1 } else { 0 };
        Ok(Self {
            name: name.to_string(),
            data: data.map(PathBuf::from),
            normalize: Some([0, last_feature]),
            exemplar: ExemplarOptions::new(last_feature + 1, classes, 1).with_label_offset(offset),
            split_seed: Some(0),
            subsets: default_subsets(),
            hidden,
            network: NetworkConfig::default(),
            training: TrainingConfig {
                epochs,
                learning_rate,
                ..TrainingConfig::default()
            },
            save: default_save(),
            out_dir: None,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading experiment config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing experiment config {}", path.display()))
    }

    fn out_dir(&self) -> PathBuf {
        self.out_dir
            .clone()
            .unwrap_or_else(|| Path::new("logs").join(&self.name))
    }
}

/// Command-line overrides applied on top of a preset or config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub data: Option<PathBuf>,
    pub epochs: Option<usize>,
    pub learning_rate: Option<f64>,
    pub hidden: Option<usize>,
    pub seed: Option<u64>,
    pub momentum: Option<f64>,
    pub weight_decay: Option<f64>,
    pub tanh_softmax: bool,
    pub out_dir: Option<PathBuf>,
    pub verbose_weights: bool,
}

impl ExperimentConfig {
    // merge overrides where the second overwrites the first
    pub fn merge(mut self, o: Overrides) -> Self {
        self.data = o.data.or(self.data);
        self.training.epochs = o.epochs.unwrap_or(self.training.epochs);
        self.training.learning_rate = o.learning_rate.unwrap_or(self.training.learning_rate);
        self.hidden = o.hidden.unwrap_or(self.hidden);
        if let Some(seed) = o.seed {
            self.split_seed = Some(seed);
            self.network.seed = Some(seed);
        }
        self.network.momentum = o.momentum.unwrap_or(self.network.momentum);
        self.network.weight_decay = o.weight_decay.unwrap_or(self.network.weight_decay);
        if o.tanh_softmax {
            self.network.hidden_activation = ActivationKind::Tanh;
            self.network.output_activation = ActivationKind::Softmax;
        }
        self.out_dir = o.out_dir.or(self.out_dir);
        self.save.verbose |= o.verbose_weights;
        self
    }
}

/// Outcome of a run, printed by the caller.
pub struct Report {
    pub network: Network,
    pub history: EpochHistory,
    pub results: String,
    pub out_dir: PathBuf,
}

fn prepare(config: &ExperimentConfig) -> Result<Dataset> {
    let mut data = match &config.data {
        Some(path) => {
            Dataset::load(path).with_context(|| format!("loading dataset {}", path.display()))?
        }
        None => generate_synthetic_data(
            SYNTHETIC_SAMPLES,
            config.exemplar.input_columns,
            config.exemplar.class_count,
            config.split_seed.unwrap_or(0),
        ),
    };
    if let Some([start, end]) = config.normalize {
        data.normalize(start, end).context("normalizing")?;
    }
    data.make_exemplar_with(&config.exemplar)
        .context("encoding exemplars")?;
    if let Some(seed) = config.split_seed {
        data.shuffle(seed);
    }
    Ok(data)
}

pub fn run(config: &ExperimentConfig) -> Result<Report> {
    if config.subsets < 2 {
        bail!("need at least a training and a testing subset, got {}", config.subsets);
    }
    let data = prepare(config)?;
    let sets = data.split_evenly(config.subsets)?;
    info!(
        experiment = %config.name,
        sizes = ?sets.iter().map(Dataset::len).collect::<Vec<_>>(),
        "prepared subsets"
    );

    let mut network = Network::with_config(
        config.exemplar.input_columns,
        config.hidden,
        config.exemplar.class_count,
        &config.network,
    )?;
    println!("{}", model_summary(&network));

    let out_dir = config.out_dir();
    let training = TrainingConfig {
        log_path: Some(out_dir.join("neural-network.log")),
        ..config.training.clone()
    };
    println!(
        "Epochs: {}\nLearning constant: {}\n",
        training.epochs, training.learning_rate
    );
    let history = train(&mut network, &sets[0], &sets[1], &training)?;
    println!("Training has ended after {} epochs.\n", history.len());

    let names = ["Training", "Testing", "Validation"];
    let mut evaluator = Evaluator::new();
    let mut accuracies = String::new();
    let mut matrices = String::new();
    for (i, set) in sets.iter().enumerate() {
        let name = names
            .get(i)
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("Subset {}", i + 1));
        let acc = evaluator.accuracy(&network, set)?;
        accuracies.push_str(&format!("{:<21}{:.2}%\n", format!("{} accuracy:", name), acc * 100.0));
        matrices.push_str(&format!(
            "{} Confusion Matrix:\n\n{}\n",
            name,
            evaluator.confusion()?
        ));
    }

    persistence::save(&network, out_dir.join("weights.dat"), &config.save)?;
    fs::write(out_dir.join("history.json"), history.to_json()?)
        .with_context(|| format!("writing history to {}", out_dir.display()))?;

    Ok(Report {
        network,
        results: format!("{}\n{}\n{}", accuracies, matrices, summary_table(&history)),
        history,
        out_dir,
    })
}
