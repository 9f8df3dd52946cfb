use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Number of rating categories (1 to 5 stars, stored as 0 to 4).
pub const N_CATEGORIES: usize = 5;

pub type ItemId = u32;

/// Bit layout of an encoded dataset entry: item id in the low bits, category in the next 3.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLayout {
    pub item_bits: u32,
}

impl Default for EntryLayout {
    fn default() -> Self {
        Self { item_bits: 15 }
    }
}

impl EntryLayout {
    const CATEGORY_MASK: u32 = 0b111;

    /// Widest item id that still leaves room for the 3 category bits in a `u32`.
    pub const MAX_ITEM_BITS: u32 = u32::BITS - 3;

    pub fn validate(self) -> Result {
        if (1..=Self::MAX_ITEM_BITS).contains(&self.item_bits) {
            Ok(())
        } else {
            Err(anyhow!(
                "item bits must be within 1..={}, got {}",
                Self::MAX_ITEM_BITS,
                self.item_bits,
            ))
        }
    }

    #[must_use]
    pub const fn item_mask(self) -> u32 {
        (1 << self.item_bits) - 1
    }
}

/// One observed rating of a user.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub item: ItemId,
    pub category: u8,
}

impl Rating {
    #[must_use]
    pub const fn new(item: ItemId, category: u8) -> Self {
        Self { item, category }
    }

    #[must_use]
    pub const fn unpack(entry: u32, layout: EntryLayout) -> Self {
        Self {
            item: entry & layout.item_mask(),
            category: ((entry >> layout.item_bits) & EntryLayout::CATEGORY_MASK) as u8,
        }
    }

    #[must_use]
    pub const fn pack(self, layout: EntryLayout) -> u32 {
        self.item | ((self.category as u32) << layout.item_bits)
    }

    #[must_use]
    #[inline]
    pub const fn item_index(self) -> usize {
        self.item as usize
    }

    #[must_use]
    #[inline]
    pub const fn category_index(self) -> usize {
        self.category as usize
    }
}
