use thiserror::Error;

use crate::dataset::ItemId;

/// Conditions that abort a training run.
///
/// None of them is retried: fix the configuration or the data and rerun with the same seed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// An item lacks training observations for a category, so its visible bias would be `ln(0)`.
    #[error("item #{item} has {count} of {total} training observations in category {category}")]
    DataDegenerate {
        item: ItemId,
        category: usize,
        count: u32,
        total: u32,
    },

    #[error("numeric instability: {0}")]
    NumericInstability(String),

    /// The hidden unit count has no learning-rate decay preset.
    #[error("no preset for {n_hidden} hidden units (supported: {supported:?})")]
    ConfigurationMismatch {
        n_hidden: usize,
        supported: Vec<usize>,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
