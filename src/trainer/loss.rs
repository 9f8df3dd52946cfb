use serde::Serialize;

/// Root-mean-square error accumulator.
#[derive(Default, Copy, Clone)]
pub struct Rmse {
    error: f64,
    count: usize,
}

impl Rmse {
    #[inline]
    pub fn push(&mut self, residual_error: f64) {
        self.error += residual_error * residual_error;
        self.count += 1;
    }

    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn finalise(&self) -> f64 {
        (self.error / self.count.max(1) as f64).sqrt()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct LossPair {
    pub train: f64,
    pub probe: f64,
}

impl LossPair {
    #[must_use]
    pub fn builder() -> LossPairBuilder {
        LossPairBuilder::default()
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.train.is_finite() && self.probe.is_finite()
    }
}

#[derive(Default)]
pub struct LossPairBuilder {
    pub train: Rmse,
    pub probe: Rmse,
}

impl LossPairBuilder {
    #[must_use]
    pub fn finalise(self) -> LossPair {
        LossPair {
            train: self.train.finalise(),
            probe: self.probe.finalise(),
        }
    }
}
