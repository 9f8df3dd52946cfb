use serde::{Deserialize, Serialize};

use crate::dataset::{ItemId, N_CATEGORIES};

/// Dense `item × category × hidden` tensor with the hidden axis contiguous.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub n_items: usize,
    pub n_hidden: usize,
    pub data: Vec<f64>,
}

impl Weights {
    #[must_use]
    pub fn zeros(n_items: usize, n_hidden: usize) -> Self {
        Self {
            n_items,
            n_hidden,
            data: vec![0.0; n_items * N_CATEGORIES * n_hidden],
        }
    }

    #[inline]
    fn offset(&self, item: ItemId, category: usize) -> usize {
        debug_assert!(category < N_CATEGORIES);
        (item as usize * N_CATEGORIES + category) * self.n_hidden
    }

    #[must_use]
    #[inline]
    pub fn row(&self, item: ItemId, category: usize) -> &[f64] {
        let offset = self.offset(item, category);
        &self.data[offset..offset + self.n_hidden]
    }

    #[must_use]
    #[inline]
    pub fn row_mut(&mut self, item: ItemId, category: usize) -> &mut [f64] {
        let offset = self.offset(item, category);
        &mut self.data[offset..offset + self.n_hidden]
    }

    /// All category rows of the item, `N_CATEGORIES × n_hidden`.
    #[must_use]
    #[inline]
    pub fn item(&self, item: ItemId) -> &[f64] {
        let offset = self.offset(item, 0);
        &self.data[offset..offset + N_CATEGORIES * self.n_hidden]
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|x| *x == 0.0)
    }
}
