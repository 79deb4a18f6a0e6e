//! Block construction strategies.

pub mod greedy;
pub mod package;

pub use greedy::GreedySelector;
pub use package::{Cluster, PackageSelection, PackageSelector};

use std::fmt::Debug;

use dyn_clone::DynClone;
use thiserror::Error;

use crate::{
    block::{Block, Capacity, InvalidCapacity},
    graph::GraphError,
    item::{Item, ItemError, ItemId},
};

/// Reasons a selection run fails. A run either returns a complete [Block] or
/// exactly one of these errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("invalid item: {0}")]
    InvalidItem(#[from] ItemError),
    #[error(transparent)]
    InvalidCapacity(#[from] InvalidCapacity),
    #[error("dependency cycle detected at item {0}")]
    CycleDetected(ItemId),
    #[error("item {0} appears more than once")]
    DuplicateItem(ItemId),
    #[error("item {0} is not in the dependency graph")]
    UnknownItem(ItemId),
    #[error("total fee of the pool exceeds {}", u64::MAX)]
    FeeOverflow,
    #[error("total weight of the pool exceeds {}", u64::MAX)]
    WeightOverflow,
}

impl From<GraphError> for SelectionError {
    fn from(value: GraphError) -> Self {
        match value {
            GraphError::CycleDetected(id) => Self::CycleDetected(id),
            GraphError::DuplicateItem(id) => Self::DuplicateItem(id),
            GraphError::UnknownItem(id) => Self::UnknownItem(id),
            GraphError::FeeOverflow => Self::FeeOverflow,
            GraphError::WeightOverflow => Self::WeightOverflow,
        }
    }
}

/// A strategy for filling a capacity-bounded block from a pool of items.
///
/// Implementations must be deterministic: the same items and capacity always
/// produce the same [Block]. The caller's items are never modified.
pub trait Selector: Debug + DynClone + Send + Sync {
    /// Returns the name of the selection strategy.
    fn name(&self) -> String;

    /// Selects items from `items` into a block of at most `capacity` weight.
    fn select(
        &self,
        items: &[Item],
        capacity: Capacity,
    ) -> Result<Block, SelectionError>;
}

dyn_clone::clone_trait_object!(Selector);

/// Checks every item before any graph is built.
pub(crate) fn validate(items: &[Item]) -> Result<(), SelectionError> {
    for item in items {
        item.validate()?;
    }

    Ok(())
}
