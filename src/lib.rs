//! Restricted Boltzmann machine with softmax visible units for collaborative filtering,
//! trained with persistent contrastive divergence over mini-batches of users.

pub mod dataset;
pub mod error;
pub mod helpers;
pub mod math;
pub mod metrics;
pub mod model;
pub mod opts;
pub mod prelude;
pub mod statistics;
pub mod trainer;

pub use self::dataset::Dataset;
pub use self::error::Error;
pub use self::model::Parameters;
pub use self::trainer::{Hyperparameters, Trainer, TrainingOutcome};
