//! Implementation of ancestor-package (child-pays-for-parent) selection via
//! the [Selector] trait.
//!
//! Each round prices every remaining item together with its unmined
//! ancestors, mines the best-paying package that still fits, and removes the
//! package from the working graph. A child's fee can only be collected along
//! with its parents, so the whole chain is what gets compared.
//!
//! This is a greedy heuristic, not an exact solver. Once the best-rate
//! feasible package is mined the next round starts over; there is no search
//! for combinations of packages which would pay more in total.

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
};

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    block::{Block, BlockBuilder, Capacity},
    graph::{DependencyGraph, GraphError, Package},
    item::{Item, ItemId},
    tie_breaker::{Candidate, TieBreaker},
};

use super::{validate, SelectionError, Selector};

/// Mines whole ancestor packages, best effective fee rate first.
#[derive(Debug, Clone, Default)]
pub struct PackageSelector {
    tie_breaker: TieBreaker,
}

/// Output of [PackageSelector::select_packages].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSelection {
    pub block: Block,
    /// Input records of all mined items, in input order.
    pub items: Vec<Item>,
}

/// Family an item is grouped under when presenting a block: the smallest ID
/// among its parents, or [Cluster::Independent] when it has none.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Cluster {
    Independent,
    Family(ItemId),
}

impl Cluster {
    pub fn of(item: &Item) -> Self {
        match item.parents.first() {
            Some(parent) => Cluster::Family(parent.clone()),
            None => Cluster::Independent,
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Independent => write!(f, "independent"),
            Self::Family(parent) => write!(f, "{}", parent),
        }
    }
}

impl PackageSelection {
    /// Groups the mined items by [Cluster].
    pub fn clusters(&self) -> BTreeMap<Cluster, Vec<&Item>> {
        let mut clusters: BTreeMap<Cluster, Vec<&Item>> = BTreeMap::new();
        for item in self.items.iter() {
            clusters.entry(Cluster::of(item)).or_default().push(item);
        }

        clusters
    }
}

impl PackageSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ties between packages with equal rates are broken by applying
    /// `tie_breaker` to each package's anchor, with the package's weight.
    pub fn with_tie_breaker(tie_breaker: TieBreaker) -> Self {
        PackageSelector { tie_breaker }
    }

    /// Runs package selection, also returning the mined item records.
    #[tracing::instrument(
        name = "package",
        skip_all,
        fields(items = items.len(), capacity = capacity.get())
    )]
    pub fn select_packages(
        &self,
        items: &[Item],
        capacity: Capacity,
    ) -> Result<PackageSelection, SelectionError> {
        validate(items)?;

        let mut graph = DependencyGraph::build(items)?;
        graph.verify_acyclic()?;

        let mut block = BlockBuilder::new(capacity);
        let mut round = 0usize;
        while !graph.is_empty() {
            let Some(package) = self.best_package(&graph, &block)? else {
                debug!(
                    round,
                    remaining = graph.len(),
                    spare = block.remaining(),
                    "no feasible package"
                );
                break;
            };

            debug!(
                round,
                anchor = %package.anchor,
                members = package.members.len(),
                fee = package.fee,
                weight = package.weight,
                "mining package"
            );

            for id in graph.topological_order(package.members.iter())? {
                let node = graph
                    .remove(&id)
                    .ok_or_else(|| GraphError::UnknownItem(id.clone()))?;
                let pushed = block.push(id, node.weight, node.fee);
                debug_assert!(pushed, "package was checked against capacity");
            }

            round += 1;
        }

        let block = block.finish();
        info!(
            rounds = round,
            mined = block.len(),
            total_fee = block.total_fee,
            total_weight = block.total_weight,
            "package selection complete"
        );

        let mined: HashSet<&ItemId> = block.ids.iter().collect();
        let items = items
            .iter()
            .filter(|item| mined.contains(&item.id))
            .cloned()
            .collect();

        Ok(PackageSelection { block, items })
    }

    /// Returns the highest-rate package which fits into `block`, if any.
    fn best_package(
        &self,
        graph: &DependencyGraph,
        block: &BlockBuilder,
    ) -> Result<Option<Package>, GraphError> {
        let evaluate = |id: &ItemId| -> Result<Option<Package>, GraphError> {
            let package = graph.package(id)?;

            Ok(block.fits(package.weight).then_some(package))
        };

        let ids: Vec<&ItemId> = graph.ids().collect();

        #[cfg(feature = "rayon")]
        let packages: Vec<_> = ids
            .into_par_iter()
            .map(evaluate)
            .collect::<Result<_, _>>()?;
        #[cfg(not(feature = "rayon"))]
        let packages: Vec<_> = ids
            .into_iter()
            .map(evaluate)
            .collect::<Result<_, _>>()?;

        Ok(packages.into_iter().flatten().min_by(|a, b| {
            self.tie_breaker.order(&candidate(a), &candidate(b))
        }))
    }
}

fn candidate(package: &Package) -> Candidate {
    Candidate {
        id: &package.anchor,
        rate: package.fee_rate(),
        weight: package.weight,
        index: package.anchor_index,
    }
}

impl Selector for PackageSelector {
    fn name(&self) -> String {
        "Package (CPFP)".into()
    }

    fn select(
        &self,
        items: &[Item],
        capacity: Capacity,
    ) -> Result<Block, SelectionError> {
        self.select_packages(items, capacity)
            .map(|selection| selection.block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(units: u64) -> Capacity {
        Capacity::new(units).unwrap()
    }

    fn ids(ids: &[&str]) -> Vec<ItemId> {
        ids.iter().copied().map(ItemId::from).collect()
    }

    #[test]
    fn child_pays_for_parent() {
        let items = vec![
            Item::new("P", 500, 500),
            Item::new("C", 500, 25_000).with_parents(["P"]),
        ];

        let selection = PackageSelector::new()
            .select_packages(&items, cap(1200))
            .unwrap();

        assert_eq!(selection.block.ids, ids(&["P", "C"]));
        assert_eq!(selection.block.total_fee, 25_500);
        assert_eq!(selection.block.total_weight, 1000);
        assert_eq!(selection.items, items);
    }

    #[test]
    fn packages_shrink_as_ancestors_are_mined() {
        // Round 1: {b} at 40. Round 2: {a, c} at 25 beats {a} at 10.
        let items = vec![
            Item::new("a", 100, 1_000),
            Item::new("b", 100, 4_000),
            Item::new("c", 100, 4_000).with_parents(["a"]),
        ];

        let block = PackageSelector::new().select(&items, cap(1000)).unwrap();

        assert_eq!(block.ids, ids(&["b", "a", "c"]));
        assert_eq!(block.total_fee, 9_000);
    }

    #[test]
    fn stops_when_best_packages_do_not_fit() {
        // After X, {P, C} no longer fits. P alone still does, and once it is
        // mined C cannot follow.
        let items = vec![
            Item::new("X", 600, 60_000),
            Item::new("P", 300, 300),
            Item::new("C", 300, 30_000).with_parents(["P"]),
        ];

        let block = PackageSelector::new().select(&items, cap(1000)).unwrap();

        assert_eq!(block.ids, ids(&["X", "P"]));
        assert_eq!(block.total_weight, 900);
    }

    #[test]
    fn nothing_fits() {
        let items = vec![Item::new("huge", 2_000, 1)];

        let selection = PackageSelector::new()
            .select_packages(&items, cap(1999))
            .unwrap();

        assert!(selection.block.is_empty());
        assert!(selection.items.is_empty());
    }

    #[test]
    fn capacity_boundary() {
        let items = vec![Item::new("exact", 1200, 1)];

        let block = PackageSelector::new().select(&items, cap(1200)).unwrap();
        assert_eq!(block.total_weight, 1200);

        let block = PackageSelector::new().select(&items, cap(1199)).unwrap();
        assert!(block.is_empty());
    }

    #[test]
    fn missing_parent_is_satisfied() {
        let items = vec![Item::new("orphan", 10, 10).with_parents(["unknown-id"])];

        let block = PackageSelector::new().select(&items, cap(10)).unwrap();

        assert_eq!(block.ids, ids(&["orphan"]));
    }

    #[test]
    fn clusters_group_by_first_parent() {
        let items = vec![
            Item::new("p", 10, 10),
            Item::new("c1", 10, 100).with_parents(["p"]),
            Item::new("c2", 10, 100).with_parents(["p", "z"]),
            Item::new("solo", 10, 50),
        ];

        let selection = PackageSelector::new()
            .select_packages(&items, cap(1000))
            .unwrap();
        let clusters = selection.clusters();

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[&Cluster::Independent].len(), 2);
        assert_eq!(clusters[&Cluster::Family("p".into())].len(), 2);
        assert_eq!(Cluster::Family("p".into()).to_string(), "p");
    }

    #[test]
    fn cycles_are_rejected() {
        let items = vec![
            Item::new("x", 1, 1).with_parents(["y"]),
            Item::new("y", 1, 1).with_parents(["x"]),
            Item::new("ok", 1, 1),
        ];

        assert!(matches!(
            PackageSelector::new().select(&items, cap(10)),
            Err(SelectionError::CycleDetected(_))
        ));
    }

    #[test]
    fn duplicates_are_rejected() {
        let items = vec![Item::new("x", 1, 1), Item::new("x", 1, 1)];

        assert_eq!(
            PackageSelector::new().select(&items, cap(10)),
            Err(SelectionError::DuplicateItem("x".into()))
        );
    }
}
