//! Trains the categorical RBM with contrastive divergence over mini-batches of users.
//!
//! https://www.cs.toronto.edu/~hinton/absps/netflixICML.pdf

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use self::gradient::{Gradients, Momentum, UpdateRates};
pub use self::hyperparameters::Hyperparameters;
use self::learning_rate::Preset;
use self::loss::LossPair;
use self::phase::{NegativePhase, PositivePhase};
pub use self::report::{EpochReport, Reporter, TracingReporter};
pub use self::schedule::{EpochSettings, Schedule, StopReason, StoppingRule};
use crate::dataset::Dataset;
use crate::metrics::Stopwatch;
use crate::model::Parameters;
use crate::prelude::*;
use crate::statistics::ItemStatistics;

pub mod gradient;
pub mod hyperparameters;
pub mod learning_rate;
pub mod loss;
pub mod phase;
pub mod report;
pub mod schedule;

/// Training RMSE the first epoch is compared against.
const INITIAL_RMSE: f64 = 2.0;

#[derive(Serialize)]
pub struct TrainingOutcome {
    pub parameters: Parameters,

    /// One residual per dataset rating, in dataset order.
    pub residuals: Vec<f64>,

    pub history: Vec<EpochReport>,
    pub stop_reason: StopReason,
}

pub struct Trainer<'a> {
    dataset: &'a Dataset,
    hyperparameters: Hyperparameters,
    preset: &'static Preset,
    parameters: Parameters,
    gradients: Gradients,
    momentum: Momentum,
    rng: StdRng,
}

impl<'a> Trainer<'a> {
    /// Validates the configuration and initializes the parameters from the empirical statistics.
    #[instrument(skip_all, fields(n_hidden = hyperparameters.n_hidden, seed = hyperparameters.seed))]
    pub fn new(dataset: &'a Dataset, hyperparameters: Hyperparameters) -> EngineResult<Self> {
        let _stopwatch = Stopwatch::new("initialized");

        hyperparameters.validate()?;
        let preset = Preset::find(hyperparameters.n_hidden)?;

        let statistics = ItemStatistics::collect(dataset);
        let mut rng = StdRng::seed_from_u64(hyperparameters.seed);
        let parameters = Parameters::initialize(hyperparameters.n_hidden, &statistics, &mut rng)?;

        info!(
            n_users = dataset.n_users(),
            n_items = dataset.n_items(),
            n_hidden = hyperparameters.n_hidden,
            batch_size = hyperparameters.batch_size,
            "initialized",
        );
        Ok(Self {
            dataset,
            preset,
            gradients: Gradients::zeros(dataset.n_items(), hyperparameters.n_hidden),
            momentum: Momentum::zeros(dataset.n_items(), hyperparameters.n_hidden),
            parameters,
            hyperparameters,
            rng,
        })
    }

    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[must_use]
    pub fn gradients(&self) -> &Gradients {
        &self.gradients
    }

    #[must_use]
    pub fn preset(&self) -> &'static Preset {
        self.preset
    }

    #[must_use]
    pub fn schedule(&self) -> Schedule {
        Schedule::new(
            self.preset,
            self.hyperparameters.learning_rates,
            self.hyperparameters.initial_momentum,
            self.hyperparameters.final_momentum,
            self.hyperparameters.n_initial_momentum_epochs,
        )
    }

    #[must_use]
    pub fn stopping_rule(&self) -> StoppingRule {
        StoppingRule {
            threshold: self.hyperparameters.convergence_threshold,
            min_epochs: self.hyperparameters.min_epochs,
            max_epochs: self.hyperparameters.max_epochs,
        }
    }

    /// Runs one pass over all users, updating the parameters after every mini-batch.
    #[instrument(level = "debug", skip_all, fields(epoch = settings.epoch, n_steps = settings.n_steps))]
    pub fn run_epoch(&mut self, settings: &EpochSettings) -> EngineResult<EpochReport> {
        let start_instant = Instant::now();
        let dataset = self.dataset;
        let n_users = dataset.n_users();
        let batch_size = self.hyperparameters.batch_size;
        let rates = UpdateRates {
            learning_rates: settings.learning_rates,
            momentum: settings.momentum,
            weight_cost: self.hyperparameters.weight_cost,
        };
        let mut loss = LossPair::builder();

        debug_assert!(self.gradients.is_zero());
        for (index, user) in dataset.iter_users().enumerate() {
            let positive = PositivePhase::infer(&self.parameters, user.training(), &mut self.rng);
            let negative =
                NegativePhase::run(&self.parameters, &user, &positive, settings.n_steps, &mut self.rng);
            negative.evaluate(&user, &mut loss);
            self.gradients.accumulate(
                user.training(),
                &positive.states,
                negative.training_categories(user.index.n_training),
                &negative.states,
            );

            if (index + 1) % batch_size == 0 || index + 1 == n_users {
                self.gradients
                    .apply(&mut self.parameters, &mut self.momentum, &rates)?;
            }
        }

        let loss = loss.finalise();
        if !loss.is_finite() {
            return Err(Error::NumericInstability(format!(
                "epoch #{} finished with RMSE {:?}",
                settings.epoch + 1,
                loss,
            )));
        }
        Ok(EpochReport {
            epoch: settings.epoch,
            loss,
            elapsed: start_instant.elapsed(),
            n_steps: settings.n_steps,
            momentum: settings.momentum,
            learning_rates: settings.learning_rates,
        })
    }

    /// Trains until the training RMSE converges or the epoch cap is hit,
    /// then computes the residuals of the final model.
    ///
    /// The probe RMSE is reported but never stops the training.
    #[instrument(skip_all)]
    pub fn train(mut self, reporter: &mut impl Reporter) -> EngineResult<TrainingOutcome> {
        let stopping_rule = self.stopping_rule();
        let mut history: Vec<EpochReport> = Vec::new();
        let mut last_rmse = INITIAL_RMSE;
        let mut stop_reason = StopReason::HardCapReached;

        for settings in self.schedule().take(stopping_rule.max_epochs) {
            let report = self.run_epoch(&settings)?;
            reporter.epoch(&report);
            let rmse = report.loss.train;
            history.push(report);

            if let Some(reason) = stopping_rule.check(history.len(), rmse, last_rmse) {
                stop_reason = reason;
                break;
            }
            last_rmse = rmse;
        }
        info!(?stop_reason, n_epochs = history.len(), "stopped");
        if let Some(report) = history.last() {
            info!(
                train_rmse = report.loss.train,
                probe_rmse = report.loss.probe,
                target_probe_rmse = self.preset.target_probe_rmse,
            );
        }

        let residuals = self.finalize();
        Ok(TrainingOutcome {
            parameters: self.parameters,
            residuals,
            history,
            stop_reason,
        })
    }

    /// Residual of every dataset rating against the expectation reconstruction.
    /// Makes no parameter updates and no random draws.
    #[instrument(skip_all)]
    #[must_use]
    pub fn finalize(&self) -> Vec<f64> {
        let _stopwatch = Stopwatch::new("finalized").threshold(StdDuration::from_secs(60));
        let mut residuals = vec![0.0; self.dataset.n_ratings()];
        for user in self.dataset.iter_users() {
            let base = user.index.base;
            residuals[base..base + user.index.len()]
                .copy_from_slice(&phase::residuals(&self.parameters, &user));
        }
        residuals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Rating, UserIndex, N_CATEGORIES};

    const N_ITEMS: u32 = 5;

    /// Every item gets every category in the training segment.
    fn synthetic(n_users: u32) -> Dataset {
        let mut ratings = Vec::new();
        let mut users = Vec::new();
        for user in 0..n_users {
            let base = ratings.len();
            let probe_item = user % N_ITEMS;
            for item in (0..N_ITEMS).filter(|item| *item != probe_item) {
                let category = (user + item + user / N_ITEMS) % N_CATEGORIES as u32;
                ratings.push(Rating::new(item, category as u8));
            }
            ratings.push(Rating::new(probe_item, ((user + 2) % 5) as u8));
            let n_qualifying = if user % 3 == 0 {
                ratings.push(Rating::new((user + 1) % N_ITEMS, 0));
                1
            } else {
                0
            };
            users.push(UserIndex {
                base,
                n_training: N_ITEMS as usize - 1,
                n_probe: 1,
                n_qualifying,
            });
        }
        Dataset::new(N_ITEMS as usize, ratings, users).unwrap()
    }

    fn hyperparameters() -> Hyperparameters {
        Hyperparameters {
            batch_size: 4,
            seed: 17,
            ..Default::default()
        }
    }

    #[test]
    fn unknown_hidden_count_fails() {
        let dataset = synthetic(20);
        let hyperparameters = Hyperparameters { n_hidden: 64, ..hyperparameters() };
        assert!(matches!(
            Trainer::new(&dataset, hyperparameters),
            Err(Error::ConfigurationMismatch { n_hidden: 64, .. }),
        ));
    }

    #[test]
    fn degenerate_item_fails() {
        // A single user cannot cover every category of every item.
        let dataset = synthetic(1);
        assert!(matches!(
            Trainer::new(&dataset, hyperparameters()),
            Err(Error::DataDegenerate { .. }),
        ));
    }

    #[test]
    fn epoch_is_reproducible() {
        let dataset = synthetic(20);
        let run = || {
            let mut trainer = Trainer::new(&dataset, hyperparameters()).unwrap();
            let settings = trainer.schedule().next().unwrap();
            let report = trainer.run_epoch(&settings).unwrap();
            (trainer.parameters().clone(), report.loss)
        };
        let (left_parameters, left_loss) = run();
        let (right_parameters, right_loss) = run();
        assert!(left_parameters == right_parameters);
        assert_eq!(left_loss, right_loss);
    }

    #[test]
    fn seed_changes_parameters() {
        let dataset = synthetic(20);
        let left = Trainer::new(&dataset, hyperparameters()).unwrap();
        let right = Trainer::new(&dataset, Hyperparameters { seed: 18, ..hyperparameters() }).unwrap();
        assert!(left.parameters() != right.parameters());
    }

    #[test]
    fn epoch_updates_parameters_and_resets_gradients() {
        let dataset = synthetic(10);
        let mut trainer = Trainer::new(&dataset, hyperparameters()).unwrap();
        let initial = trainer.parameters().clone();
        let mut schedule = trainer.schedule();
        for _ in 0..2 {
            let settings = schedule.next().unwrap();
            let report = trainer.run_epoch(&settings).unwrap();
            assert!(trainer.gradients().is_zero());
            assert!(report.loss.is_finite());
            assert!(report.loss.train > 0.0);
            assert!(report.loss.probe > 0.0);
        }
        assert!(trainer.parameters().weights != initial.weights);
        assert!(trainer.parameters().hidden_biases != initial.hidden_biases);
        assert!(trainer.parameters().ensure_finite().is_ok());
    }

    #[test]
    fn hard_cap_reached() {
        let dataset = synthetic(10);
        let hyperparameters = Hyperparameters { max_epochs: 3, ..hyperparameters() };
        let mut reports: Vec<EpochReport> = Vec::new();
        let outcome = Trainer::new(&dataset, hyperparameters)
            .unwrap()
            .train(&mut reports)
            .unwrap();
        assert_eq!(outcome.stop_reason, StopReason::HardCapReached);
        assert_eq!(outcome.history.len(), 3);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[2].epoch, 2);
    }

    #[test]
    fn first_epoch_is_compared_against_initial_rmse() {
        let dataset = synthetic(10);
        let hyperparameters = Hyperparameters {
            min_epochs: 0,
            convergence_threshold: INITIAL_RMSE,
            ..hyperparameters()
        };
        let outcome = Trainer::new(&dataset, hyperparameters)
            .unwrap()
            .train(&mut ())
            .unwrap();
        assert_eq!(outcome.stop_reason, StopReason::Converged);
        assert_eq!(outcome.history.len(), 1);
    }

    #[test]
    fn train_terminates() {
        let dataset = synthetic(20);
        let outcome = Trainer::new(&dataset, hyperparameters())
            .unwrap()
            .train(&mut ())
            .unwrap();
        assert!(outcome.history.len() >= 14);
        assert!(outcome.history.len() <= 80);
        if outcome.stop_reason == StopReason::HardCapReached {
            assert_eq!(outcome.history.len(), 80);
        }
        assert_eq!(
            outcome.history.last().unwrap().n_steps,
            schedule::sampling_depth(outcome.history.len() - 1),
        );
        assert_eq!(outcome.residuals.len(), dataset.n_ratings());
        assert!(outcome.residuals.iter().all(|residual| residual.is_finite()));
    }

    #[test]
    fn finalize_is_deterministic() {
        let dataset = synthetic(10);
        let trainer = Trainer::new(&dataset, hyperparameters()).unwrap();
        let residuals = trainer.finalize();
        assert_eq!(residuals, trainer.finalize());

        let user = dataset.user(3);
        let expected = phase::residuals(trainer.parameters(), &user);
        assert_eq!(&residuals[user.index.base..user.index.base + user.index.len()], expected.as_slice());
        assert!(residuals.iter().all(|residual| residual.abs() <= (N_CATEGORIES - 1) as f64));
    }
}
