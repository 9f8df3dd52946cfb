//! Positive phase, the Gibbs chain of the negative phase, and the visible reconstructions.
//!
//! Random draws follow a fixed order: one per hidden unit in the positive phase, then for every
//! Gibbs step one per observed rating followed by one per hidden unit.

use rand::Rng;

use crate::dataset::{ItemId, Rating, UserRatings, N_CATEGORIES};
use crate::math::{expected_rating, logistic, normalize, sample_category};
use crate::model::Parameters;
use crate::trainer::loss::LossPairBuilder;

/// Sums the weight rows of the given `(item, category)` pairs per hidden unit.
pub fn weighted_sums(
    parameters: &Parameters,
    visible: impl IntoIterator<Item = (ItemId, usize)>,
) -> Vec<f64> {
    let mut sums = vec![0.0; parameters.n_hidden()];
    for (item, category) in visible {
        for (sum, weight) in sums.iter_mut().zip(parameters.weights.row(item, category)) {
            *sum += weight;
        }
    }
    sums
}

#[must_use]
pub fn hidden_probabilities(parameters: &Parameters, weighted_sums: &[f64]) -> Vec<f64> {
    weighted_sums
        .iter()
        .zip(&parameters.hidden_biases)
        .map(|(sum, bias)| logistic(sum + bias))
        .collect()
}

/// Bernoulli draw per hidden unit, in ascending unit order.
pub fn sample_hidden<R: Rng>(probabilities: &[f64], rng: &mut R) -> Vec<bool> {
    probabilities
        .iter()
        .map(|probability| *probability > rng.gen::<f64>())
        .collect()
}

/// Category probabilities of the item given binary hidden states.
#[must_use]
pub fn reconstruct_sampled(
    parameters: &Parameters,
    hidden_states: &[bool],
    item: ItemId,
) -> [f64; N_CATEGORIES] {
    let mut probabilities = [0.0; N_CATEGORIES];
    for (category, probability) in probabilities.iter_mut().enumerate() {
        let activation = parameters
            .weights
            .row(item, category)
            .iter()
            .zip(hidden_states)
            .filter(|(_, state)| **state)
            .fold(0.0, |sum, (weight, _)| sum + weight);
        *probability = logistic(activation + parameters.visible_biases[item as usize][category]);
    }
    normalize(&mut probabilities);
    probabilities
}

/// Category probabilities of the item given hidden probabilities instead of sampled states.
///
/// Only used to measure the fit, never to train.
#[must_use]
pub fn reconstruct_expectation(
    parameters: &Parameters,
    hidden_probabilities: &[f64],
    item: ItemId,
) -> [f64; N_CATEGORIES] {
    let mut probabilities = [0.0; N_CATEGORIES];
    for (category, probability) in probabilities.iter_mut().enumerate() {
        let activation = parameters
            .weights
            .row(item, category)
            .iter()
            .zip(hidden_probabilities)
            .fold(0.0, |sum, (weight, hidden)| sum + hidden * weight);
        *probability = logistic(activation + parameters.visible_biases[item as usize][category]);
    }
    normalize(&mut probabilities);
    probabilities
}

/// Hidden layer driven by the user's training ratings.
pub struct PositivePhase {
    pub weighted_sums: Vec<f64>,
    pub probabilities: Vec<f64>,
    pub states: Vec<bool>,
}

impl PositivePhase {
    pub fn infer<R: Rng>(parameters: &Parameters, training: &[Rating], rng: &mut R) -> Self {
        let weighted_sums = weighted_sums(
            parameters,
            training.iter().map(|rating| (rating.item, rating.category_index())),
        );
        let probabilities = hidden_probabilities(parameters, &weighted_sums);
        let states = sample_hidden(&probabilities, rng);
        Self {
            weighted_sums,
            probabilities,
            states,
        }
    }
}

/// Final state of the Gibbs chain for one user.
pub struct NegativePhase {
    /// Sampled category per observed rating (training followed by probe).
    pub categories: Vec<u8>,

    /// Hidden states sampled at the last step.
    pub states: Vec<bool>,

    /// Expectation reconstruction per observed rating, taken at the first step.
    pub expectation: Vec<[f64; N_CATEGORIES]>,
}

impl NegativePhase {
    /// Runs `n_steps` Gibbs steps starting from the positive hidden states.
    ///
    /// Probe ratings are reconstructed and sampled too, but only the training ratings drive the
    /// hidden layer.
    pub fn run<R: Rng>(
        parameters: &Parameters,
        user: &UserRatings<'_>,
        positive: &PositivePhase,
        n_steps: usize,
        rng: &mut R,
    ) -> Self {
        let observed = user.observed();
        let training = user.training();

        let expectation = observed
            .iter()
            .map(|rating| reconstruct_expectation(parameters, &positive.probabilities, rating.item))
            .collect();

        let mut categories = vec![0_u8; observed.len()];
        let mut states = positive.states.clone();
        for _ in 0..n_steps.max(1) {
            for (rating, category) in observed.iter().zip(categories.iter_mut()) {
                let probabilities = reconstruct_sampled(parameters, &states, rating.item);
                *category = sample_category(&probabilities, rng.gen()) as u8;
            }
            let weighted_sums = weighted_sums(
                parameters,
                training
                    .iter()
                    .zip(&categories)
                    .map(|(rating, category)| (rating.item, *category as usize)),
            );
            states = sample_hidden(&hidden_probabilities(parameters, &weighted_sums), rng);
        }

        Self {
            categories,
            states,
            expectation,
        }
    }

    /// Sampled categories of the training ratings.
    #[must_use]
    pub fn training_categories(&self, n_training: usize) -> &[u8] {
        &self.categories[..n_training]
    }

    /// Pushes the squared residuals of the expectation reconstruction into the loss.
    pub fn evaluate(&self, user: &UserRatings<'_>, loss: &mut LossPairBuilder) {
        let n_training = user.index.n_training;
        for (position, (rating, probabilities)) in
            user.observed().iter().zip(&self.expectation).enumerate()
        {
            let residual_error = rating.category as f64 - expected_rating(probabilities);
            if position < n_training {
                loss.train.push(residual_error);
            } else {
                loss.probe.push(residual_error);
            }
        }
    }
}

/// Residual of every rating of the user, including the qualifying ones.
/// Uses hidden probabilities only, so no random draws are made.
pub fn residuals(parameters: &Parameters, user: &UserRatings<'_>) -> Vec<f64> {
    let weighted_sums = weighted_sums(
        parameters,
        user.training()
            .iter()
            .map(|rating| (rating.item, rating.category_index())),
    );
    let probabilities = hidden_probabilities(parameters, &weighted_sums);
    user.all()
        .iter()
        .map(|rating| {
            let reconstruction = reconstruct_expectation(parameters, &probabilities, rating.item);
            rating.category as f64 - expected_rating(&reconstruction)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::dataset::tests::dataset;
    use crate::model::Weights;

    /// Parameters with distinct, easily traceable weights.
    fn parameters(n_items: usize, n_hidden: usize) -> Parameters {
        let mut parameters = Parameters::zeros(n_items, n_hidden);
        parameters.weights = Weights {
            n_items,
            n_hidden,
            data: (0..n_items * N_CATEGORIES * n_hidden)
                .map(|i| ((i * 7919) % 101) as f64 / 101.0 - 0.5)
                .collect(),
        };
        parameters.hidden_biases = (0..n_hidden).map(|h| h as f64 * 0.1 - 0.2).collect();
        for (item, biases) in parameters.visible_biases.iter_mut().enumerate() {
            for (category, bias) in biases.iter_mut().enumerate() {
                *bias = -((item + category + 1) as f64).ln();
            }
        }
        parameters
    }

    #[test]
    fn weighted_sums_only_use_rated_items() {
        let parameters = parameters(2, 3);
        let dataset = dataset(2, &[(&[(0, 2), (1, 0)], &[], &[])]);
        let positive = PositivePhase::infer(
            &parameters,
            dataset.user(0).training(),
            &mut StdRng::seed_from_u64(1),
        );
        for h in 0..3 {
            let expected = parameters.weights.row(0, 2)[h] + parameters.weights.row(1, 0)[h];
            assert_eq!(positive.weighted_sums[h], expected);
        }
    }

    #[test]
    fn hidden_probabilities_are_bounded() {
        let mut parameters = parameters(3, 8);
        parameters.hidden_biases[0] = 1e9;
        parameters.hidden_biases[1] = -1e9;
        let dataset = dataset(3, &[(&[(0, 4), (1, 1), (2, 3)], &[], &[])]);
        let positive = PositivePhase::infer(
            &parameters,
            dataset.user(0).training(),
            &mut StdRng::seed_from_u64(7),
        );
        assert!(positive
            .probabilities
            .iter()
            .all(|probability| (0.0..=1.0).contains(probability)));
        assert!(positive.states[0]);
        assert!(!positive.states[1]);
    }

    #[test]
    fn empty_training_segment_ok() {
        let parameters = parameters(2, 4);
        let dataset = dataset(2, &[(&[], &[(1, 3)], &[])]);
        let user = dataset.user(0);
        let mut rng = StdRng::seed_from_u64(3);
        let positive = PositivePhase::infer(&parameters, user.training(), &mut rng);
        assert_eq!(positive.weighted_sums, vec![0.0; 4]);
        let negative = NegativePhase::run(&parameters, &user, &positive, 2, &mut rng);
        assert_eq!(negative.categories.len(), 1);
        assert!(negative.training_categories(0).is_empty());
    }

    #[test]
    fn reconstructions_are_normalized() {
        let parameters = parameters(4, 6);
        let states = [true, false, true, true, false, true];
        let probabilities = [0.1, 0.9, 0.5, 0.3, 0.0, 1.0];
        for item in 0..4 {
            for reconstruction in [
                reconstruct_sampled(&parameters, &states, item),
                reconstruct_expectation(&parameters, &probabilities, item),
            ] {
                assert!((reconstruction.iter().sum::<f64>() - 1.0).abs() <= 1e-9);
                assert!(reconstruction.iter().all(|p| (0.0..=1.0).contains(p)));
            }
        }
    }

    #[test]
    fn saturated_reconstruction_is_normalized() {
        let mut parameters = parameters(1, 2);
        parameters.visible_biases[0] = [-1e9; N_CATEGORIES];
        let reconstruction = reconstruct_sampled(&parameters, &[true, true], 0);
        assert!((reconstruction.iter().sum::<f64>() - 1.0).abs() <= 1e-9);
    }

    #[test]
    fn sampled_reconstruction_ignores_inactive_units() {
        let mut parameters = Parameters::zeros(1, 2);
        parameters.weights.row_mut(0, 0)[1] = 1e9;
        let off = reconstruct_sampled(&parameters, &[true, false], 0);
        let on = reconstruct_sampled(&parameters, &[true, true], 0);
        assert!(off.iter().all(|p| (p - 0.2).abs() < 1e-12));
        assert!((on[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((on[4] - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn chain_is_reproducible() {
        let parameters = parameters(3, 5);
        let dataset = dataset(3, &[(&[(0, 1), (2, 4)], &[(1, 2)], &[])]);
        let user = dataset.user(0);
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let positive = PositivePhase::infer(&parameters, user.training(), &mut rng);
            let negative = NegativePhase::run(&parameters, &user, &positive, 3, &mut rng);
            (positive.states, negative.categories, negative.states)
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn chain_draw_order() {
        let parameters = parameters(3, 5);
        let dataset = dataset(3, &[(&[(0, 1), (2, 4)], &[(1, 2)], &[])]);
        let user = dataset.user(0);

        let mut rng = StdRng::seed_from_u64(5);
        let positive = PositivePhase::infer(&parameters, user.training(), &mut rng);
        let _ = NegativePhase::run(&parameters, &user, &positive, 2, &mut rng);
        let next = rng.gen::<f64>();

        // 5 positive draws, then 2 steps of 3 ratings and 5 hidden units each.
        let mut expected = StdRng::seed_from_u64(5);
        for _ in 0..5 + 2 * (3 + 5) {
            let _ = expected.gen::<f64>();
        }
        assert_eq!(next, expected.gen::<f64>());
    }

    #[test]
    fn expectation_uses_probabilities() {
        let parameters = parameters(2, 4);
        let dataset = dataset(2, &[(&[(0, 3)], &[(1, 1)], &[])]);
        let user = dataset.user(0);
        let mut rng = StdRng::seed_from_u64(9);
        let positive = PositivePhase::infer(&parameters, user.training(), &mut rng);
        let negative = NegativePhase::run(&parameters, &user, &positive, 1, &mut rng);
        assert_eq!(
            negative.expectation[1],
            reconstruct_expectation(&parameters, &positive.probabilities, 1),
        );
    }

    #[test]
    fn evaluate_splits_segments() {
        let parameters = parameters(2, 4);
        let dataset = dataset(2, &[(&[(0, 3), (1, 0)], &[(1, 1)], &[])]);
        let user = dataset.user(0);
        let mut rng = StdRng::seed_from_u64(9);
        let positive = PositivePhase::infer(&parameters, user.training(), &mut rng);
        let negative = NegativePhase::run(&parameters, &user, &positive, 1, &mut rng);
        let mut loss = LossPairBuilder::default();
        negative.evaluate(&user, &mut loss);
        assert_eq!(loss.train.count(), 2);
        assert_eq!(loss.probe.count(), 1);
        let probe_residual = 1.0 - expected_rating(&negative.expectation[2]);
        assert!((loss.finalise().probe - probe_residual.abs()).abs() < 1e-12);
    }

    #[test]
    fn residuals_cover_all_segments() {
        let parameters = parameters(3, 4);
        let dataset = dataset(3, &[(&[(0, 3)], &[(1, 1)], &[(2, 0)])]);
        let user = dataset.user(0);
        let residuals = residuals(&parameters, &user);
        assert_eq!(residuals.len(), 3);

        let probabilities = hidden_probabilities(
            &parameters,
            &weighted_sums(&parameters, [(0, 3)]),
        );
        let expected = 0.0 - expected_rating(&reconstruct_expectation(&parameters, &probabilities, 2));
        assert_eq!(residuals[2], expected);
    }
}
