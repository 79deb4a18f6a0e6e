//! Capacity accounting shared by every selector.

use std::{collections::HashSet, fmt, num::NonZeroU64};

use serde::{Deserialize, Serialize};

use crate::item::{Item, ItemId};

/// Consensus block-weight limit used when no capacity is given.
pub const MAX_BLOCK_WEIGHT: u64 = 4_000_000;

/// Maximum total weight of a [Block].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
#[serde(try_from = "u64", into = "u64")]
pub struct Capacity(NonZeroU64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("block capacity must be greater than 0")]
pub struct InvalidCapacity;

impl Capacity {
    /// [MAX_BLOCK_WEIGHT] units.
    pub const DEFAULT: Capacity = match NonZeroU64::new(MAX_BLOCK_WEIGHT) {
        Some(units) => Capacity(units),
        None => panic!("MAX_BLOCK_WEIGHT is 0"),
    };

    /// Returns [InvalidCapacity] if `units` is 0.
    pub fn new(units: u64) -> Result<Self, InvalidCapacity> {
        NonZeroU64::new(units).map(Capacity).ok_or(InvalidCapacity)
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u64> for Capacity {
    type Error = InvalidCapacity;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Capacity::new(value)
    }
}

impl From<Capacity> for u64 {
    fn from(value: Capacity) -> Self {
        value.get()
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns true iff adding `delta` units to a block already weighing `total`
/// would exceed `capacity`. Overflow counts as exceeding.
#[inline]
pub fn would_exceed(total: u64, delta: u64, capacity: Capacity) -> bool {
    total
        .checked_add(delta)
        .map_or(true, |weight| weight > capacity.get())
}

/// A finished block: mined item IDs in dependency-respecting order, plus
/// aggregate totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub ids: Vec<ItemId>,
    pub total_fee: u64,
    pub total_weight: u64,
    pub capacity: Capacity,
}

impl Block {
    /// Creates an empty block with the given capacity.
    pub fn empty(capacity: Capacity) -> Self {
        Block {
            ids: vec![],
            total_fee: 0,
            total_weight: 0,
            capacity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Share of the capacity used by this block, between 0.0 and 1.0.
    pub fn fill_ratio(&self) -> f64 {
        self.total_weight as f64 / self.capacity.get() as f64
    }

    /// Position of `id` within the block, if it was mined.
    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.ids.iter().position(|mined| mined == id)
    }
}

/// Accumulates mined items while enforcing the capacity of the block under
/// construction. Both selectors mine through this type so they are compared
/// under exactly the same constraint.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    capacity: Capacity,
    ids: Vec<ItemId>,
    mined: HashSet<ItemId>,
    total_fee: u64,
    total_weight: u64,
}

impl BlockBuilder {
    pub fn new(capacity: Capacity) -> Self {
        BlockBuilder {
            capacity,
            ids: vec![],
            mined: HashSet::new(),
            total_fee: 0,
            total_weight: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    #[inline]
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    #[inline]
    pub fn total_fee(&self) -> u64 {
        self.total_fee
    }

    /// Capacity units still available.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.capacity.get() - self.total_weight
    }

    /// Returns true iff `weight` more units fit into the block.
    #[inline]
    pub fn fits(&self, weight: u64) -> bool {
        !would_exceed(self.total_weight, weight, self.capacity)
    }

    /// Returns true iff the item with the given ID has been mined.
    #[inline]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.mined.contains(id)
    }

    /// Appends an item to the block. Returns false and leaves the block
    /// untouched if the item does not fit, or if its fee would overflow the
    /// fee total.
    pub fn push(&mut self, id: ItemId, weight: u64, fee: u64) -> bool {
        let Some(total_fee) = self.total_fee.checked_add(fee) else {
            return false;
        };
        if !self.fits(weight) {
            return false;
        }

        self.total_weight += weight;
        self.total_fee = total_fee;
        self.mined.insert(id.clone());
        self.ids.push(id);

        true
    }

    /// Equivalent to [`BlockBuilder::push`] for a whole [Item].
    #[inline]
    pub fn push_item(&mut self, item: &Item) -> bool {
        self.push(item.id.clone(), item.weight, item.fee)
    }

    pub fn finish(self) -> Block {
        let BlockBuilder {
            capacity,
            ids,
            total_fee,
            total_weight,
            ..
        } = self;

        Block {
            ids,
            total_fee,
            total_weight,
            capacity,
        }
    }
}
