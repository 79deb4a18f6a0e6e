//! Running several selectors over the same pool and comparing their blocks.

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    block::{Block, Capacity, InvalidCapacity, MAX_BLOCK_WEIGHT},
    item::Item,
    mempool::filter_dust,
    selector::{GreedySelector, PackageSelector, SelectionError, Selector},
    tie_breaker::TieBreaker,
};

/// Builds a [Battle].
#[derive(Debug, Default)]
pub struct BattleBuilder {
    capacity: Option<u64>,
    dust_threshold: Option<f64>,
    tie_breaker: TieBreaker,
    selectors: Vec<Box<dyn Selector>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BattleBuildError {
    #[error(transparent)]
    InvalidCapacity(#[from] InvalidCapacity),
    #[error("dust threshold {0} is not a non-negative number")]
    BadDustThreshold(f64),
}

impl BattleBuilder {
    /// Creates a new [BattleBuilder].
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `selector` to the battle. If no selector is added,
    /// [GreedySelector] and [PackageSelector] are used.
    pub fn add_selector<S: Selector + 'static>(mut self, selector: S) -> Self {
        self.selectors.push(Box::new(selector));

        self
    }

    /// Sets the weight limit of every block (default
    /// [MAX_BLOCK_WEIGHT]).
    pub fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = Some(capacity);

        self
    }

    /// Items with a fee rate below `threshold` are left out of the pool
    /// before any selector runs.
    pub fn dust_threshold(mut self, threshold: f64) -> Self {
        self.dust_threshold = Some(threshold);

        self
    }

    /// Tie-breaker of the default selectors. Has no effect on selectors
    /// added with [BattleBuilder::add_selector].
    pub fn tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = tie_breaker;

        self
    }

    /// Creates a [Battle] from the specified parameters.
    pub fn build(self) -> Result<Battle, BattleBuildError> {
        use BattleBuildError::*;

        let BattleBuilder {
            capacity,
            dust_threshold,
            tie_breaker,
            mut selectors,
        } = self;

        let capacity = Capacity::new(capacity.unwrap_or(MAX_BLOCK_WEIGHT))?;

        if let Some(threshold) = dust_threshold {
            if threshold.is_nan() || threshold < 0.0 {
                return Err(BadDustThreshold(threshold));
            }
        }

        if selectors.is_empty() {
            selectors.push(Box::new(GreedySelector::with_tie_breaker(
                tie_breaker,
            )));
            selectors.push(Box::new(PackageSelector::with_tie_breaker(
                tie_breaker,
            )));
        }

        Ok(Battle {
            capacity,
            dust_threshold,
            selectors,
        })
    }
}

/// A set of selectors which are run against the same pool and capacity.
#[derive(Debug, Clone)]
pub struct Battle {
    capacity: Capacity,
    dust_threshold: Option<f64>,
    selectors: Vec<Box<dyn Selector>>,
}

/// The block one selector built during a [Battle].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub selector: String,
    pub block: Block,
}

/// Contains the output data from [Battle::run].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleOutput {
    pub capacity: Capacity,
    /// Number of items left after filtering dust.
    pub pool_size: usize,
    pub pool_weight: u64,
    pub pool_fees: u64,
    /// One entry per selector, in the order the selectors were added.
    pub entries: Vec<Entry>,
}

impl Battle {
    pub fn builder() -> BattleBuilder {
        BattleBuilder::new()
    }

    #[inline]
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Runs every selector over `items`. Selectors run in parallel when the
    /// `rayon` feature is enabled; the output does not depend on it.
    pub fn run(&self, items: &[Item]) -> Result<BattleOutput, SelectionError> {
        let pool = match self.dust_threshold {
            Some(threshold) => filter_dust(items, threshold),
            None => items.to_vec(),
        };

        let pool_fees = pool
            .iter()
            .try_fold(0u64, |total, item| total.checked_add(item.fee))
            .ok_or(SelectionError::FeeOverflow)?;
        let pool_weight = pool
            .iter()
            .try_fold(0u64, |total, item| total.checked_add(item.weight))
            .ok_or(SelectionError::WeightOverflow)?;

        let run = |selector: &Box<dyn Selector>| {
            selector.select(&pool, self.capacity).map(|block| Entry {
                selector: selector.name(),
                block,
            })
        };

        #[cfg(feature = "rayon")]
        let entries: Result<Vec<_>, _> = self.selectors.par_iter().map(run).collect();
        #[cfg(not(feature = "rayon"))]
        let entries: Result<Vec<_>, _> = self.selectors.iter().map(run).collect();

        let output = BattleOutput {
            capacity: self.capacity,
            pool_size: pool.len(),
            pool_weight,
            pool_fees,
            entries: entries?,
        };

        for entry in output.entries.iter() {
            info!(
                selector = %entry.selector,
                total_fee = entry.block.total_fee,
                total_weight = entry.block.total_weight,
                mined = entry.block.len(),
                "battle entry"
            );
        }

        Ok(output)
    }
}

impl BattleOutput {
    /// Returns the entry of the selector with the given name.
    pub fn entry(&self, selector: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.selector == selector)
    }

    /// Fees collected by `challenger` minus fees collected by `baseline`.
    pub fn fee_delta(&self, baseline: &str, challenger: &str) -> Option<i128> {
        let baseline = self.entry(baseline)?.block.total_fee as i128;
        let challenger = self.entry(challenger)?.block.total_fee as i128;

        Some(challenger - baseline)
    }
}
