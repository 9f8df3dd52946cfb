//! Per-user rating tables, unpacked once at the boundary.
//!
//! Every user owns a contiguous run of ratings split into the training, probe and qualifying
//! segments, in that order.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use human_repr::HumanCount;
use serde::{Deserialize, Serialize};

pub use self::rating::*;
use crate::prelude::*;

mod rating;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIndex {
    /// Offset of the user's first rating.
    pub base: usize,

    pub n_training: usize,
    pub n_probe: usize,
    pub n_qualifying: usize,
}

impl UserIndex {
    /// Saturates instead of overflowing, so an unvalidated index never panics.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.n_training
            .saturating_add(self.n_probe)
            .saturating_add(self.n_qualifying)
    }

    /// Offset past the user's last rating, `None` on overflow.
    #[must_use]
    pub const fn end(&self) -> Option<usize> {
        match self.n_training.checked_add(self.n_probe) {
            Some(len) => match len.checked_add(self.n_qualifying) {
                Some(len) => self.base.checked_add(len),
                None => None,
            },
            None => None,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Segment {
    Training,
    Probe,
    Qualifying,
}

/// On-disk form of the dataset: bit-packed entries plus the user index.
#[derive(Deserialize)]
struct EncodedDataset {
    n_items: usize,

    #[serde(default)]
    item_bits: Option<u32>,

    entries: Vec<u32>,
    users: Vec<UserIndex>,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    n_items: usize,
    ratings: Vec<Rating>,
    users: Vec<UserIndex>,
}

impl Dataset {
    /// Builds the dataset from already unpacked ratings.
    pub fn new(n_items: usize, ratings: Vec<Rating>, users: Vec<UserIndex>) -> Result<Self> {
        for (position, rating) in ratings.iter().enumerate() {
            if rating.item_index() >= n_items {
                return Err(anyhow!(
                    "rating #{} refers to item #{}, but there are only {} items",
                    position,
                    rating.item,
                    n_items,
                ));
            }
            if rating.category_index() >= N_CATEGORIES {
                return Err(anyhow!(
                    "rating #{} has category {}, expected below {}",
                    position,
                    rating.category,
                    N_CATEGORIES,
                ));
            }
        }
        for (user, index) in users.iter().enumerate() {
            match index.end() {
                Some(end) if end <= ratings.len() => {}
                end => {
                    return Err(anyhow!(
                        "user #{} spans {}..{}, but there are only {} ratings",
                        user,
                        index.base,
                        end.map_or_else(|| "overflow".to_string(), |end| end.to_string()),
                        ratings.len(),
                    ));
                }
            }
        }
        Ok(Self { n_items, ratings, users })
    }

    pub fn from_encoded(
        n_items: usize,
        layout: EntryLayout,
        entries: &[u32],
        users: Vec<UserIndex>,
    ) -> Result<Self> {
        layout.validate()?;
        let ratings = entries
            .iter()
            .map(|entry| Rating::unpack(*entry, layout))
            .collect();
        Self::new(n_items, ratings, users)
    }

    /// Reads the JSON-encoded dataset.
    #[instrument(skip_all, fields(path = ?path.as_ref()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
        let encoded: EncodedDataset = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse `{}`", path.display()))?;
        let layout = encoded
            .item_bits
            .map_or_else(EntryLayout::default, |item_bits| EntryLayout { item_bits });
        let dataset = Self::from_encoded(encoded.n_items, layout, &encoded.entries, encoded.users)?;
        info!(
            n_items = dataset.n_items,
            n_users = dataset.n_users(),
            n_ratings = %dataset.ratings.len().human_count_bare(),
            "loaded",
        );
        Ok(dataset)
    }

    #[must_use]
    pub const fn n_items(&self) -> usize {
        self.n_items
    }

    #[must_use]
    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn n_ratings(&self) -> usize {
        self.ratings.len()
    }

    #[must_use]
    pub fn user(&self, user: usize) -> UserRatings<'_> {
        let index = self.users[user];
        UserRatings {
            index,
            ratings: &self.ratings[index.base..index.base + index.len()],
        }
    }

    pub fn iter_users(&self) -> impl Iterator<Item = UserRatings<'_>> {
        (0..self.n_users()).map(|user| self.user(user))
    }

    #[must_use]
    pub fn n_records(&self, segment: Segment) -> usize {
        self.users
            .iter()
            .map(|index| match segment {
                Segment::Training => index.n_training,
                Segment::Probe => index.n_probe,
                Segment::Qualifying => index.n_qualifying,
            })
            .sum()
    }
}

/// Borrowed view of one user's ratings.
#[derive(Copy, Clone)]
pub struct UserRatings<'a> {
    pub index: UserIndex,
    ratings: &'a [Rating],
}

impl<'a> UserRatings<'a> {
    #[must_use]
    pub fn training(&self) -> &'a [Rating] {
        &self.ratings[..self.index.n_training]
    }

    #[must_use]
    pub fn probe(&self) -> &'a [Rating] {
        &self.ratings[self.index.n_training..self.index.n_training + self.index.n_probe]
    }

    #[must_use]
    pub fn qualifying(&self) -> &'a [Rating] {
        &self.ratings[self.index.n_training + self.index.n_probe..]
    }

    /// Training followed by probe: the ratings that take part in the reconstruction.
    #[must_use]
    pub fn observed(&self) -> &'a [Rating] {
        &self.ratings[..self.index.n_training + self.index.n_probe]
    }

    #[must_use]
    pub const fn all(&self) -> &'a [Rating] {
        self.ratings
    }
}
