//! CLI options.

use std::path::PathBuf;

use clap::{crate_version, Args, Parser};

use crate::trainer::learning_rate::LearningRates;
use crate::trainer::Hyperparameters;

pub mod parsers;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Opts {
    /// JSON-encoded dataset: bit-packed entries and the per-user index
    #[arg(short, long, env = "RATING_RBM_DATASET")]
    pub dataset: PathBuf,

    /// Where to write the trained parameters, residuals and epoch history (standard output by default)
    #[arg(short, long, env = "RATING_RBM_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pub pretty: bool,

    #[command(flatten)]
    pub hyperparameters: HyperparameterOpts,
}

#[derive(Args, Clone)]
pub struct HyperparameterOpts {
    /// Number of hidden units, must have a learning-rate preset
    #[arg(long, default_value = "100", value_parser = parsers::non_zero_usize)]
    pub n_hidden: usize,

    /// Users per mini-batch
    #[arg(long, default_value = "100", value_parser = parsers::non_zero_usize)]
    pub batch_size: usize,

    /// Initial weight learning rate
    #[arg(long, default_value = "0.001", value_parser = parsers::non_negative_f64)]
    pub weight_learning_rate: f64,

    /// Initial visible bias learning rate
    #[arg(long, default_value = "0.008", value_parser = parsers::non_negative_f64)]
    pub visible_bias_learning_rate: f64,

    /// Initial hidden bias learning rate
    #[arg(long, default_value = "0.0006", value_parser = parsers::non_negative_f64)]
    pub hidden_bias_learning_rate: f64,

    /// L2 weight decay
    #[arg(long, default_value = "0.0001", value_parser = parsers::non_negative_f64)]
    pub weight_cost: f64,

    /// Momentum for the first epochs
    #[arg(long, default_value = "0.8", value_parser = parsers::momentum)]
    pub initial_momentum: f64,

    /// Momentum for the remaining epochs
    #[arg(long, default_value = "0.9", value_parser = parsers::momentum)]
    pub final_momentum: f64,

    /// Number of epochs trained with the initial momentum
    #[arg(long, default_value = "5")]
    pub n_initial_momentum_epochs: usize,

    /// Minimal training RMSE improvement to keep going
    #[arg(long, default_value = "0.00002", value_parser = parsers::non_negative_f64)]
    pub convergence_threshold: f64,

    /// Number of epochs to train regardless of the improvement
    #[arg(long, default_value = "14")]
    pub min_epochs: usize,

    /// Hard cap on the number of epochs
    #[arg(long, default_value = "80", value_parser = parsers::non_zero_usize)]
    pub max_epochs: usize,

    /// Random generator seed
    #[arg(long, default_value = "0", env = "RATING_RBM_SEED")]
    pub seed: u64,
}

impl From<HyperparameterOpts> for Hyperparameters {
    fn from(opts: HyperparameterOpts) -> Self {
        Self {
            n_hidden: opts.n_hidden,
            learning_rates: LearningRates {
                weights: opts.weight_learning_rate,
                visible_biases: opts.visible_bias_learning_rate,
                hidden_biases: opts.hidden_bias_learning_rate,
            },
            weight_cost: opts.weight_cost,
            initial_momentum: opts.initial_momentum,
            final_momentum: opts.final_momentum,
            n_initial_momentum_epochs: opts.n_initial_momentum_epochs,
            batch_size: opts.batch_size,
            convergence_threshold: opts.convergence_threshold,
            min_epochs: opts.min_epochs,
            max_epochs: opts.max_epochs,
            seed: opts.seed,
        }
    }
}

#[must_use]
pub fn version() -> &'static str {
    crate_version!()
}
