//! Contrastive divergence statistics of a mini-batch and the momentum update they drive.

use crate::dataset::{ItemId, Rating, N_CATEGORIES};
use crate::model::{Parameters, Weights};
use crate::prelude::*;
use crate::trainer::learning_rate::LearningRates;

/// Statistics accumulated over the users of the current mini-batch.
pub struct Gradients {
    /// Data-driven co-occurrences of visible categories and active hidden units.
    positive: Weights,

    /// Model-driven co-occurrences after the Gibbs chain.
    negative: Weights,

    positive_visible: Vec<[f64; N_CATEGORIES]>,
    negative_visible: Vec<[f64; N_CATEGORIES]>,
    positive_hidden: Vec<f64>,
    negative_hidden: Vec<f64>,

    /// Training observations per item within the batch.
    item_counts: Vec<u32>,

    n_users: usize,
}

/// Previous increments of every parameter. Lives across batches and epochs.
pub struct Momentum {
    weights: Weights,
    visible_biases: Vec<[f64; N_CATEGORIES]>,
    hidden_biases: Vec<f64>,
}

impl Momentum {
    #[must_use]
    pub fn zeros(n_items: usize, n_hidden: usize) -> Self {
        Self {
            weights: Weights::zeros(n_items, n_hidden),
            visible_biases: vec![[0.0; N_CATEGORIES]; n_items],
            hidden_biases: vec![0.0; n_hidden],
        }
    }

    #[must_use]
    pub fn weights(&self) -> &Weights {
        &self.weights
    }
}

/// Step sizes of one batch update.
#[derive(Debug, Copy, Clone)]
pub struct UpdateRates {
    pub learning_rates: LearningRates,
    pub momentum: f64,
    pub weight_cost: f64,
}

impl Gradients {
    #[must_use]
    pub fn zeros(n_items: usize, n_hidden: usize) -> Self {
        Self {
            positive: Weights::zeros(n_items, n_hidden),
            negative: Weights::zeros(n_items, n_hidden),
            positive_visible: vec![[0.0; N_CATEGORIES]; n_items],
            negative_visible: vec![[0.0; N_CATEGORIES]; n_items],
            positive_hidden: vec![0.0; n_hidden],
            negative_hidden: vec![0.0; n_hidden],
            item_counts: vec![0; n_items],
            n_users: 0,
        }
    }

    #[must_use]
    pub const fn n_users(&self) -> usize {
        self.n_users
    }

    #[must_use]
    pub fn item_count(&self, item: ItemId) -> u32 {
        self.item_counts[item as usize]
    }

    #[must_use]
    pub fn positive(&self) -> &Weights {
        &self.positive
    }

    #[must_use]
    pub fn negative(&self) -> &Weights {
        &self.negative
    }

    /// Folds one user's phases into the batch.
    ///
    /// `negative_categories` are the categories sampled at the last Gibbs step for the training
    /// ratings, in the same order.
    pub fn accumulate(
        &mut self,
        training: &[Rating],
        positive_states: &[bool],
        negative_categories: &[u8],
        negative_states: &[bool],
    ) {
        debug_assert_eq!(training.len(), negative_categories.len());

        self.n_users += 1;
        for (hidden, (positive, negative)) in positive_states.iter().zip(negative_states).enumerate() {
            if *positive {
                self.positive_hidden[hidden] += 1.0;
            }
            if *negative {
                self.negative_hidden[hidden] += 1.0;
            }
        }

        for (rating, negative_category) in training.iter().zip(negative_categories) {
            let item = rating.item;
            let category = rating.category_index();
            let negative_category = *negative_category as usize;

            self.item_counts[rating.item_index()] += 1;
            self.positive_visible[rating.item_index()][category] += 1.0;
            self.negative_visible[rating.item_index()][negative_category] += 1.0;

            for (statistic, state) in self.positive.row_mut(item, category).iter_mut().zip(positive_states) {
                if *state {
                    *statistic += 1.0;
                }
            }
            for (statistic, state) in self
                .negative
                .row_mut(item, negative_category)
                .iter_mut()
                .zip(negative_states)
            {
                *statistic += f64::from(u8::from(*state));
            }
        }
    }

    /// Applies the momentum update to every item seen in the batch, then resets the batch.
    ///
    /// Weight decay applies to the weights only. A parameter whose positive and negative statistics
    /// are both zero keeps both its value and its previous increment.
    pub fn apply(
        &mut self,
        parameters: &mut Parameters,
        momentum: &mut Momentum,
        rates: &UpdateRates,
    ) -> EngineResult {
        let UpdateRates {
            learning_rates,
            momentum: momentum_factor,
            weight_cost,
        } = *rates;

        for item in 0..self.item_counts.len() {
            let count = self.item_counts[item];
            if count == 0 {
                continue;
            }
            let count = f64::from(count);
            let item_id = item as ItemId;

            for category in 0..N_CATEGORIES {
                let positive = self.positive.row(item_id, category);
                let negative = self.negative.row(item_id, category);
                let increments = momentum.weights.row_mut(item_id, category);
                let weights = parameters.weights.row_mut(item_id, category);
                for hidden in 0..positive.len() {
                    if positive[hidden] == 0.0 && negative[hidden] == 0.0 {
                        continue;
                    }
                    let gradient = (positive[hidden] / count - negative[hidden] / count)
                        - weight_cost * weights[hidden];
                    increments[hidden] =
                        momentum_factor * increments[hidden] + learning_rates.weights * gradient;
                    weights[hidden] += increments[hidden];
                    ensure_finite(weights[hidden], || {
                        format!("weight of item #{}, category {}, hidden unit #{}", item, category, hidden)
                    })?;
                }

                let positive = self.positive_visible[item][category];
                let negative = self.negative_visible[item][category];
                if positive != 0.0 || negative != 0.0 {
                    let increment = &mut momentum.visible_biases[item][category];
                    *increment = momentum_factor * *increment
                        + learning_rates.visible_biases * (positive / count - negative / count);
                    let bias = &mut parameters.visible_biases[item][category];
                    *bias += *increment;
                    ensure_finite(*bias, || {
                        format!("visible bias of item #{}, category {}", item, category)
                    })?;
                }
            }
        }

        let n_users = self.n_users.max(1) as f64;
        for hidden in 0..self.positive_hidden.len() {
            let positive = self.positive_hidden[hidden];
            let negative = self.negative_hidden[hidden];
            if positive == 0.0 && negative == 0.0 {
                continue;
            }
            let increment = &mut momentum.hidden_biases[hidden];
            *increment = momentum_factor * *increment
                + learning_rates.hidden_biases * (positive / n_users - negative / n_users);
            parameters.hidden_biases[hidden] += *increment;
            ensure_finite(parameters.hidden_biases[hidden], || {
                format!("bias of hidden unit #{}", hidden)
            })?;
        }

        self.reset();
        Ok(())
    }

    /// Zeroes the statistics of every item touched in the batch.
    pub fn reset(&mut self) {
        for item in 0..self.item_counts.len() {
            if self.item_counts[item] == 0 {
                continue;
            }
            let item_id = item as ItemId;
            for category in 0..N_CATEGORIES {
                self.positive.row_mut(item_id, category).fill(0.0);
                self.negative.row_mut(item_id, category).fill(0.0);
            }
            self.positive_visible[item] = [0.0; N_CATEGORIES];
            self.negative_visible[item] = [0.0; N_CATEGORIES];
            self.item_counts[item] = 0;
        }
        self.positive_hidden.fill(0.0);
        self.negative_hidden.fill(0.0);
        self.n_users = 0;
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.n_users == 0
            && self.positive.is_zero()
            && self.negative.is_zero()
            && self.item_counts.iter().all(|count| *count == 0)
            && self
                .positive_visible
                .iter()
                .chain(&self.negative_visible)
                .flatten()
                .all(|x| *x == 0.0)
            && self
                .positive_hidden
                .iter()
                .chain(&self.negative_hidden)
                .all(|x| *x == 0.0)
    }
}

fn ensure_finite(value: f64, describe: impl FnOnce() -> String) -> EngineResult {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::NumericInstability(format!("{} is {}", describe(), value)))
    }
}
