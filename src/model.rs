//! Parameter store: the weight tensor and both bias layers.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub use self::weights::Weights;
use crate::dataset::{ItemId, N_CATEGORIES};
use crate::prelude::*;
use crate::statistics::ItemStatistics;

mod weights;

/// Initial weights are drawn from `[-WEIGHT_SCALE, +WEIGHT_SCALE)`.
pub const WEIGHT_SCALE: f64 = 0.01;

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub weights: Weights,
    pub visible_biases: Vec<[f64; N_CATEGORIES]>,
    pub hidden_biases: Vec<f64>,
}

impl Parameters {
    #[must_use]
    pub fn zeros(n_items: usize, n_hidden: usize) -> Self {
        Self {
            weights: Weights::zeros(n_items, n_hidden),
            visible_biases: vec![[0.0; N_CATEGORIES]; n_items],
            hidden_biases: vec![0.0; n_hidden],
        }
    }

    /// Small uniform noise for the weights, zero hidden biases,
    /// and visible biases set to the log empirical marginals.
    ///
    /// Items no rating refers to keep zero visible biases. Any other item must have training
    /// observations in every category, otherwise this fails with [`Error::DataDegenerate`].
    #[instrument(level = "debug", skip(statistics, rng))]
    pub fn initialize<R: Rng>(
        n_hidden: usize,
        statistics: &ItemStatistics,
        rng: &mut R,
    ) -> EngineResult<Self> {
        let n_items = statistics.n_items();
        let mut parameters = Self::zeros(n_items, n_hidden);

        for item in 0..n_items as ItemId {
            for hidden in 0..n_hidden {
                for category in 0..N_CATEGORIES {
                    parameters.weights.row_mut(item, category)[hidden] =
                        2.0 * WEIGHT_SCALE * rng.gen::<f64>() - WEIGHT_SCALE;
                }
            }
        }

        for (item, biases) in parameters.visible_biases.iter_mut().enumerate() {
            let item = item as ItemId;
            if !statistics.is_referenced(item) {
                continue;
            }
            for (category, bias) in biases.iter_mut().enumerate() {
                *bias = statistics.log_marginal(item, category)?;
            }
        }

        Ok(parameters)
    }

    #[must_use]
    pub fn n_items(&self) -> usize {
        self.weights.n_items
    }

    #[must_use]
    pub fn n_hidden(&self) -> usize {
        self.weights.n_hidden
    }

    /// Fails on the first tensor holding a `NaN` or an infinity.
    pub fn ensure_finite(&self) -> EngineResult {
        if let Some(position) = self.weights.data.iter().position(|x| !x.is_finite()) {
            let n_row = N_CATEGORIES * self.n_hidden();
            return Err(Error::NumericInstability(format!(
                "weight of item #{} is {}",
                position / n_row,
                self.weights.data[position],
            )));
        }
        if let Some(item) = self
            .visible_biases
            .iter()
            .position(|biases| biases.iter().any(|x| !x.is_finite()))
        {
            return Err(Error::NumericInstability(format!(
                "visible biases of item #{} are {:?}",
                item, self.visible_biases[item],
            )));
        }
        if let Some(hidden) = self.hidden_biases.iter().position(|x| !x.is_finite()) {
            return Err(Error::NumericInstability(format!(
                "bias of hidden unit #{} is {}",
                hidden, self.hidden_biases[hidden],
            )));
        }
        Ok(())
    }
}
