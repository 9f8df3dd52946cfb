use serde::Serialize;

use crate::helpers::tracing::format_duration;
use crate::prelude::*;
use crate::trainer::learning_rate::LearningRates;
use crate::trainer::loss::LossPair;

#[derive(Debug, Clone, Serialize)]
pub struct EpochReport {
    pub epoch: usize,
    pub loss: LossPair,
    pub elapsed: StdDuration,
    pub n_steps: usize,
    pub momentum: f64,
    pub learning_rates: LearningRates,
}

/// Receives the outcome of every epoch.
pub trait Reporter {
    fn epoch(&mut self, report: &EpochReport);
}

impl Reporter for () {
    fn epoch(&mut self, _report: &EpochReport) {}
}

impl Reporter for Vec<EpochReport> {
    fn epoch(&mut self, report: &EpochReport) {
        self.push(report.clone());
    }
}

/// Logs the epochs.
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn epoch(&mut self, report: &EpochReport) {
        info!(
            epoch = report.epoch + 1,
            n_steps = report.n_steps,
            train_rmse = report.loss.train,
            probe_rmse = report.loss.probe,
            elapsed = %format_duration(report.elapsed),
            "epoch finished",
        );
        debug!(
            momentum = report.momentum,
            lr_weights = report.learning_rates.weights,
            lr_visible = report.learning_rates.visible_biases,
            lr_hidden = report.learning_rates.hidden_biases,
        );
    }
}
