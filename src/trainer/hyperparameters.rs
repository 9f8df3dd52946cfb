use serde::{Deserialize, Serialize};

use crate::prelude::*;
use crate::trainer::learning_rate::LearningRates;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub n_hidden: usize,
    pub learning_rates: LearningRates,

    /// Weight decay, applied to the weights only.
    pub weight_cost: f64,

    pub initial_momentum: f64,
    pub final_momentum: f64,

    /// Number of leading epochs trained with `initial_momentum`.
    pub n_initial_momentum_epochs: usize,

    /// Users per mini-batch.
    pub batch_size: usize,

    /// Minimal training RMSE improvement to keep going after `min_epochs`.
    pub convergence_threshold: f64,

    pub min_epochs: usize,

    /// Hard cap on the number of epochs.
    pub max_epochs: usize,

    pub seed: u64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            n_hidden: 100,
            learning_rates: LearningRates::default(),
            weight_cost: 0.0001,
            initial_momentum: 0.8,
            final_momentum: 0.9,
            n_initial_momentum_epochs: 5,
            batch_size: 100,
            convergence_threshold: 0.00002,
            min_epochs: 14,
            max_epochs: 80,
            seed: 0,
        }
    }
}

impl Hyperparameters {
    pub fn validate(&self) -> EngineResult {
        let invalid = |message: &str| Err(Error::InvalidConfiguration(message.to_string()));
        if self.batch_size == 0 {
            return invalid("batch size must be positive");
        }
        if self.max_epochs == 0 {
            return invalid("maximum number of epochs must be positive");
        }
        if !self.learning_rates.is_valid() {
            return invalid("learning rates must be finite and non-negative");
        }
        if !(self.weight_cost.is_finite() && self.weight_cost >= 0.0) {
            return invalid("weight cost must be finite and non-negative");
        }
        for momentum in [self.initial_momentum, self.final_momentum] {
            if !(0.0..1.0).contains(&momentum) {
                return invalid("momentum must be within [0, 1)");
            }
        }
        if !self.convergence_threshold.is_finite() {
            return invalid("convergence threshold must be finite");
        }
        Ok(())
    }
}
