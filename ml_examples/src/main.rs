// ml_examples/src/main.rs
mod experiment;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use experiment::{ExperimentConfig, Overrides, PRESETS};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ml_examples", about = "Train and evaluate ann_lab classifiers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an experiment from a preset or a JSON config file
    Run(RunArgs),
    /// List the built-in presets
    Presets,
}

#[derive(Args)]
struct RunArgs {
    /// Built-in experiment (iris, cancer, wine, synthetic)
    #[arg(long, conflicts_with = "config")]
    preset: Option<String>,
    /// JSON experiment config
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Data file, overriding the preset's
    #[arg(long, value_name = "PATH")]
    data: Option<PathBuf>,
    #[arg(long)]
    epochs: Option<usize>,
    #[arg(long)]
    learning_rate: Option<f64>,
    /// Hidden layer size
    #[arg(long)]
    hidden: Option<usize>,
    /// Seed for the split shuffle and weight initialization
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    momentum: Option<f64>,
    #[arg(long)]
    weight_decay: Option<f64>,
    /// Use tanh hidden units and a softmax output layer
    #[arg(long)]
    tanh_softmax: bool,
    /// Output directory for the log, weights and history
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,
    /// Write the annotated weight file layout
    #[arg(long)]
    verbose_weights: bool,
}

impl RunArgs {
    fn into_config(self) -> Result<ExperimentConfig> {
        let base = match (&self.config, &self.preset) {
            (Some(path), _) => ExperimentConfig::from_file(path)?,
            (None, Some(name)) => ExperimentConfig::preset(name)?,
            (None, None) => ExperimentConfig::preset("iris")?,
        };
        Ok(base.merge(Overrides {
            data: self.data,
            epochs: self.epochs,
            learning_rate: self.learning_rate,
            hidden: self.hidden,
            seed: self.seed,
            momentum: self.momentum,
            weight_decay: self.weight_decay,
            tanh_softmax: self.tanh_softmax,
            out_dir: self.out,
            verbose_weights: self.verbose_weights,
        }))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ann_lab=info,ml_examples=info".into()),
        )
        .init();

    match Cli::parse().command {
        Command::Presets => {
            for name in PRESETS {
                let cfg = ExperimentConfig::preset(name)?;
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            }
        }
        Command::Run(args) => {
            let config = args.into_config()?;
            println!("=== {} ===", config.name);
            let report = experiment::run(&config)?;
            println!("{}", report.results);
            println!(
                "Final weights for {} saved to {}",
                report.network,
                report.out_dir.display()
            );
        }
    }
    Ok(())
}
