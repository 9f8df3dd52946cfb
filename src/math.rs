//! Scalar helpers shared by the sampling phases.

use crate::dataset::N_CATEGORIES;

/// `exp` overflows just above 709, so logistic inputs are clamped well inside that.
pub const MAX_EXPONENT: f64 = 700.0;

/// Logistic sigmoid with the input clamped to `±MAX_EXPONENT`.
#[must_use]
#[inline]
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x.clamp(-MAX_EXPONENT, MAX_EXPONENT)).exp())
}

/// Normalizes the category probabilities in place.
/// An all-zero vector is left untouched.
#[inline]
pub fn normalize(probabilities: &mut [f64; N_CATEGORIES]) {
    let sum: f64 = probabilities.iter().sum();
    if sum != 0.0 {
        for probability in probabilities.iter_mut() {
            *probability /= sum;
        }
    }
}

/// Walks the cumulative distribution and returns the first category that covers the draw.
#[must_use]
#[inline]
pub fn sample_category(probabilities: &[f64; N_CATEGORIES], mut draw: f64) -> usize {
    for (category, probability) in probabilities[..N_CATEGORIES - 1].iter().enumerate() {
        draw -= probability;
        if draw <= 0.0 {
            return category;
        }
    }
    N_CATEGORIES - 1
}

/// Rating expectation on the 0-based category scale.
#[must_use]
#[inline]
pub fn expected_rating(probabilities: &[f64; N_CATEGORIES]) -> f64 {
    probabilities
        .iter()
        .enumerate()
        .skip(1)
        .fold(0.0, |expectation, (category, probability)| {
            expectation + category as f64 * probability
        })
}
