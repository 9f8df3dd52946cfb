use serde::{Deserialize, Serialize};

use crate::prelude::*;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRates {
    pub weights: f64,
    pub visible_biases: f64,
    pub hidden_biases: f64,
}

impl Default for LearningRates {
    fn default() -> Self {
        Self {
            weights: 0.001,
            visible_biases: 0.008,
            hidden_biases: 0.0006,
        }
    }
}

impl LearningRates {
    pub fn decay(&mut self, factor: f64) {
        self.weights *= factor;
        self.visible_biases *= factor;
        self.hidden_biases *= factor;
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.weights, self.visible_biases, self.hidden_biases]
            .iter()
            .all(|rate| rate.is_finite() && *rate >= 0.0)
    }
}

/// Multiplies the learning rates by `factor` after every epoch number above `after_epoch`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Decay {
    pub after_epoch: usize,
    pub factor: f64,
}

/// Per hidden unit count learning-rate decay table.
#[derive(Debug, PartialEq)]
pub struct Preset {
    pub n_hidden: usize,

    /// Checked in order, the first matching row wins.
    pub decay: &'static [Decay],

    /// Probe RMSE this configuration is known to reach.
    pub target_probe_rmse: f64,
}

pub static PRESETS: &[Preset] = &[
    Preset {
        n_hidden: 100,
        decay: &[
            Decay { after_epoch: 8, factor: 0.92 },
            Decay { after_epoch: 6, factor: 0.90 },
            Decay { after_epoch: 2, factor: 0.78 },
        ],
        target_probe_rmse: 0.918197,
    },
    Preset {
        n_hidden: 200,
        decay: &[
            Decay { after_epoch: 6, factor: 0.90 },
            Decay { after_epoch: 5, factor: 0.50 },
            Decay { after_epoch: 2, factor: 0.70 },
        ],
        target_probe_rmse: 0.916576,
    },
];

impl Preset {
    pub fn find(n_hidden: usize) -> Result<&'static Self, Error> {
        PRESETS
            .iter()
            .find(|preset| preset.n_hidden == n_hidden)
            .ok_or_else(|| Error::ConfigurationMismatch {
                n_hidden,
                supported: PRESETS.iter().map(|preset| preset.n_hidden).collect(),
            })
    }

    /// Decay to apply once the 1-based epoch number `n_epoch` has completed.
    #[must_use]
    pub fn decay_factor(&self, n_epoch: usize) -> Option<f64> {
        self.decay
            .iter()
            .find(|decay| n_epoch > decay.after_epoch)
            .map(|decay| decay.factor)
    }
}
