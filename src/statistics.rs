//! Empirical per-item rating marginals of the training segment.

use crate::dataset::{Dataset, ItemId, N_CATEGORIES};
use crate::prelude::*;

pub struct ItemStatistics {
    counts: Vec<[u32; N_CATEGORIES]>,

    /// Whether any rating of any segment refers to the item.
    referenced: Vec<bool>,
}

impl ItemStatistics {
    #[instrument(level = "debug", skip_all)]
    #[must_use]
    pub fn collect(dataset: &Dataset) -> Self {
        let mut counts = vec![[0; N_CATEGORIES]; dataset.n_items()];
        let mut referenced = vec![false; dataset.n_items()];
        for user in dataset.iter_users() {
            for rating in user.training() {
                counts[rating.item_index()][rating.category_index()] += 1;
            }
            for rating in user.all() {
                referenced[rating.item_index()] = true;
            }
        }
        Self { counts, referenced }
    }

    /// Treats every item as referenced.
    #[must_use]
    pub fn from_counts(counts: Vec<[u32; N_CATEGORIES]>) -> Self {
        let referenced = vec![true; counts.len()];
        Self { counts, referenced }
    }

    #[must_use]
    pub fn n_items(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn counts(&self, item: ItemId) -> [u32; N_CATEGORIES] {
        self.counts[item as usize]
    }

    #[must_use]
    pub fn is_referenced(&self, item: ItemId) -> bool {
        self.referenced[item as usize]
    }

    #[must_use]
    pub fn total(&self, item: ItemId) -> u32 {
        self.counts[item as usize].iter().sum()
    }

    /// `ln(count / total)` for the item and category.
    pub fn log_marginal(&self, item: ItemId, category: usize) -> EngineResult<f64> {
        let count = self.counts[item as usize][category];
        let total = self.total(item);
        if count == 0 {
            return Err(Error::DataDegenerate { item, category, count, total });
        }
        Ok((f64::from(count) / f64::from(total)).ln())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::dataset;

    #[test]
    fn collect_ignores_probe_and_qualifying() {
        let dataset = dataset(2, &[(&[(0, 1), (1, 4)], &[(0, 2)], &[(1, 0)]), (&[(0, 1)], &[], &[])]);
        let statistics = ItemStatistics::collect(&dataset);
        assert_eq!(statistics.counts(0), [0, 2, 0, 0, 0]);
        assert_eq!(statistics.counts(1), [0, 0, 0, 0, 1]);
        assert_eq!(statistics.total(0), 2);
    }

    #[test]
    fn collect_marks_referenced_items() {
        let dataset = dataset(4, &[(&[(0, 1)], &[(1, 2)], &[(2, 0)])]);
        let statistics = ItemStatistics::collect(&dataset);
        assert!(statistics.is_referenced(0));
        assert!(statistics.is_referenced(1));
        assert!(statistics.is_referenced(2));
        assert!(!statistics.is_referenced(3));
        assert_eq!(statistics.total(1), 0);
    }

    #[test]
    fn log_marginal_ok() {
        let statistics = ItemStatistics::from_counts(vec![[1, 2, 3, 4, 10]]);
        let bias = statistics.log_marginal(0, 1).unwrap();
        assert!((bias - (0.1_f64).ln()).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_category_count_is_degenerate() {
        let statistics = ItemStatistics::from_counts(vec![[1, 2, 3, 4, 0]]);
        assert!(statistics.log_marginal(0, 3).is_ok());
        assert_eq!(
            statistics.log_marginal(0, 4),
            Err(Error::DataDegenerate { item: 0, category: 4, count: 0, total: 10 }),
        );
    }

    #[test]
    fn unobserved_item_is_degenerate() {
        let statistics = ItemStatistics::from_counts(vec![[0; N_CATEGORIES]]);
        assert!(matches!(
            statistics.log_marginal(0, 0),
            Err(Error::DataDegenerate { total: 0, .. }),
        ));
    }
}
