//! Per-epoch sampling depth, momentum and learning rates, plus the stopping rule.

use serde::Serialize;

use crate::trainer::learning_rate::{LearningRates, Preset};

/// Number of Gibbs steps for the 0-based epoch.
#[must_use]
pub const fn sampling_depth(epoch: usize) -> usize {
    if epoch < 10 {
        1
    } else {
        3 + (epoch - 10) / 5
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct EpochSettings {
    /// 0-based epoch index.
    pub epoch: usize,

    pub n_steps: usize,
    pub momentum: f64,
    pub learning_rates: LearningRates,
}

/// Endless sequence of epoch settings.
/// Learning rates decay after each epoch according to the preset.
pub struct Schedule {
    epoch: usize,
    learning_rates: LearningRates,
    preset: &'static Preset,
    initial_momentum: f64,
    final_momentum: f64,

    /// Number of leading epochs trained with the initial momentum.
    n_initial_momentum_epochs: usize,
}

impl Schedule {
    #[must_use]
    pub const fn new(
        preset: &'static Preset,
        learning_rates: LearningRates,
        initial_momentum: f64,
        final_momentum: f64,
        n_initial_momentum_epochs: usize,
    ) -> Self {
        Self {
            epoch: 0,
            learning_rates,
            preset,
            initial_momentum,
            final_momentum,
            n_initial_momentum_epochs,
        }
    }
}

impl Iterator for Schedule {
    type Item = EpochSettings;

    fn next(&mut self) -> Option<Self::Item> {
        let settings = EpochSettings {
            epoch: self.epoch,
            n_steps: sampling_depth(self.epoch),
            momentum: if self.epoch < self.n_initial_momentum_epochs {
                self.initial_momentum
            } else {
                self.final_momentum
            },
            learning_rates: self.learning_rates,
        };
        self.epoch += 1;
        if let Some(factor) = self.preset.decay_factor(self.epoch) {
            self.learning_rates.decay(factor);
        }
        Some(settings)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Training RMSE stopped improving.
    Converged,

    HardCapReached,
}

/// Keeps training while the training RMSE improves by more than `threshold`,
/// or until `min_epochs` have passed. The hard cap always wins.
#[derive(Debug, Copy, Clone)]
pub struct StoppingRule {
    pub threshold: f64,
    pub min_epochs: usize,
    pub max_epochs: usize,
}

impl StoppingRule {
    /// Checks the rule after `n_epochs` completed epochs.
    /// Returns `None` while training should go on.
    #[must_use]
    pub fn check(&self, n_epochs: usize, rmse: f64, last_rmse: f64) -> Option<StopReason> {
        if n_epochs >= self.max_epochs {
            Some(StopReason::HardCapReached)
        } else if rmse < last_rmse - self.threshold || n_epochs < self.min_epochs {
            None
        } else {
            Some(StopReason::Converged)
        }
    }
}
