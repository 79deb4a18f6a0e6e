//! Implementation of naive fee-rate ordering via the [Selector] trait.

use tracing::{info, trace};

use crate::{
    block::{Block, BlockBuilder, Capacity},
    graph::DependencyGraph,
    item::Item,
    tie_breaker::{Candidate, TieBreaker},
};

use super::{validate, SelectionError, Selector};

/// Mines items in a single pass over the pool sorted by individual fee rate.
///
/// An item whose in-pool parents are not yet mined when it is reached is
/// dropped for good, even if those parents are mined later in the same pass.
/// A high-rate child of a low-rate parent is therefore always lost, which is
/// the weakness [PackageSelector](super::PackageSelector) fixes.
#[derive(Debug, Clone, Default)]
pub struct GreedySelector {
    tie_breaker: TieBreaker,
}

impl GreedySelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tie_breaker(tie_breaker: TieBreaker) -> Self {
        GreedySelector { tie_breaker }
    }
}

impl Selector for GreedySelector {
    fn name(&self) -> String {
        "Naive Greedy".into()
    }

    #[tracing::instrument(
        name = "greedy",
        skip_all,
        fields(items = items.len(), capacity = capacity.get())
    )]
    fn select(
        &self,
        items: &[Item],
        capacity: Capacity,
    ) -> Result<Block, SelectionError> {
        validate(items)?;

        // Only read for parent lookups
        let graph = DependencyGraph::build(items)?;
        graph.verify_acyclic()?;

        let mut order: Vec<_> = items
            .iter()
            .enumerate()
            .map(|(index, item)| Candidate {
                id: &item.id,
                rate: item.fee_rate(),
                weight: item.weight,
                index,
            })
            .collect();
        order.sort_by(|a, b| self.tie_breaker.order(a, b));

        let mut block = BlockBuilder::new(capacity);
        for candidate in order {
            let item = &items[candidate.index];

            if !block.fits(item.weight) {
                trace!(id = %item.id, weight = item.weight, "does not fit");
                continue;
            }

            let ready = graph
                .parents_of(&item.id)
                .map_or(true, |parents| parents.iter().all(|p| block.contains(p)));

            if ready {
                block.push_item(item);
            } else {
                trace!(id = %item.id, "parents not mined yet, skipping");
            }
        }

        let block = block.finish();
        info!(
            mined = block.len(),
            total_fee = block.total_fee,
            total_weight = block.total_weight,
            "greedy selection complete"
        );

        Ok(block)
    }
}
