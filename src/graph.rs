//! Dependency graph over a pool of [Items](Item).
//!
//! Nodes are kept in an arena keyed by [ItemId], and every node stores its
//! adjacency in both directions. Removing a node is therefore proportional to
//! its degree, and traversals never see references to removed nodes.

use std::collections::{btree_set, BTreeMap, BTreeSet, HashMap};

use thiserror::Error;

use crate::item::{FeeRate, Item, ItemId};

/// An item as held within a [DependencyGraph].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Position of the item in the collection the graph was built from.
    pub index: usize,
    pub weight: u64,
    pub fee: u64,
    /// Parents which are still present in the graph.
    pub parents: BTreeSet<ItemId>,
    /// Children which are still present in the graph.
    pub children: BTreeSet<ItemId>,
}

/// Directed graph with an edge from every item to each of its dependents.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<ItemId, Node>,
}

/// An item together with all of its ancestors still in the graph, priced as a
/// single unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// The item whose ancestor closure this package is.
    pub anchor: ItemId,
    /// Input position of the anchor.
    pub anchor_index: usize,
    /// The anchor and all of its ancestors.
    pub members: BTreeSet<ItemId>,
    pub fee: u64,
    pub weight: u64,
}

impl Package {
    #[inline]
    pub fn fee_rate(&self) -> FeeRate {
        FeeRate::new(self.fee, self.weight)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("item {0} appears more than once")]
    DuplicateItem(ItemId),
    #[error("item {0} is not in the dependency graph")]
    UnknownItem(ItemId),
    #[error("dependency cycle detected at item {0}")]
    CycleDetected(ItemId),
    #[error("total fee of the pool exceeds {}", u64::MAX)]
    FeeOverflow,
    #[error("total weight of the pool exceeds {}", u64::MAX)]
    WeightOverflow,
}

/// Traversal state of a node during depth-first search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

impl DependencyGraph {
    /// Builds the graph over `items`. Parent references to IDs which are not
    /// among `items` do not create edges.
    ///
    /// The fees and the weights of all items must each sum to at most
    /// [u64::MAX], so that no block or package total built from the graph
    /// can overflow.
    pub fn build(items: &[Item]) -> Result<Self, GraphError> {
        let mut nodes = BTreeMap::new();
        let (mut fee, mut weight) = (0u64, 0u64);

        for (index, item) in items.iter().enumerate() {
            fee = fee.checked_add(item.fee).ok_or(GraphError::FeeOverflow)?;
            weight = weight
                .checked_add(item.weight)
                .ok_or(GraphError::WeightOverflow)?;

            let node = Node {
                index,
                weight: item.weight,
                fee: item.fee,
                parents: BTreeSet::new(),
                children: BTreeSet::new(),
            };

            if nodes.insert(item.id.clone(), node).is_some() {
                return Err(GraphError::DuplicateItem(item.id.clone()));
            }
        }

        for item in items {
            // Parents outside the pool count as already mined
            for parent in item.parents.iter() {
                let Some(node) = nodes.get_mut(parent) else {
                    continue;
                };
                node.children.insert(item.id.clone());

                if let Some(node) = nodes.get_mut(&item.id) {
                    node.parents.insert(parent.clone());
                }
            }
        }

        Ok(DependencyGraph { nodes })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.nodes.contains_key(id)
    }

    #[inline]
    pub fn get(&self, id: &ItemId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// IDs of all nodes in the graph, in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &ItemId> + '_ {
        self.nodes.keys()
    }

    /// Parents of `id` which are present in the graph.
    pub fn parents_of(&self, id: &ItemId) -> Option<&BTreeSet<ItemId>> {
        self.nodes.get(id).map(|node| &node.parents)
    }

    /// Children of `id` which are present in the graph.
    pub fn children_of(&self, id: &ItemId) -> Option<&BTreeSet<ItemId>> {
        self.nodes.get(id).map(|node| &node.children)
    }

    fn node(&self, id: &ItemId) -> Result<&Node, GraphError> {
        self.nodes
            .get(id)
            .ok_or_else(|| GraphError::UnknownItem(id.clone()))
    }

    /// Returns every node reachable from `id` by following edges backwards,
    /// excluding `id` itself.
    ///
    /// Fails with [GraphError::CycleDetected] if the search runs into a node
    /// which is still on the search path.
    pub fn ancestors(&self, id: &ItemId) -> Result<BTreeSet<ItemId>, GraphError> {
        let start = self.node(id)?;

        let mut visits: HashMap<&ItemId, Visit> =
            HashMap::from([(id, Visit::InProgress)]);
        let mut stack: Vec<(&ItemId, btree_set::Iter<ItemId>)> =
            vec![(id, start.parents.iter())];

        while let Some((current, parents)) = stack.last_mut() {
            let current = *current;

            match parents.next() {
                Some(parent) => match visits.get(parent) {
                    Some(Visit::InProgress) => {
                        return Err(GraphError::CycleDetected(parent.clone()))
                    }
                    Some(Visit::Done) => (),
                    None => {
                        let node = self.node(parent)?;
                        visits.insert(parent, Visit::InProgress);
                        stack.push((parent, node.parents.iter()));
                    }
                },
                None => {
                    visits.insert(current, Visit::Done);
                    stack.pop();
                }
            }
        }

        visits.remove(id);
        Ok(visits.into_keys().cloned().collect())
    }

    /// Returns the package anchored at `id`: the node and all of its
    /// ancestors currently in the graph.
    pub fn package(&self, id: &ItemId) -> Result<Package, GraphError> {
        let mut members = self.ancestors(id)?;
        members.insert(id.clone());

        let (mut fee, mut weight) = (0u64, 0u64);
        for member in members.iter() {
            let node = self.node(member)?;
            fee = fee.checked_add(node.fee).ok_or(GraphError::FeeOverflow)?;
            weight = weight
                .checked_add(node.weight)
                .ok_or(GraphError::WeightOverflow)?;
        }

        Ok(Package {
            anchor: id.clone(),
            anchor_index: self.node(id)?.index,
            members,
            fee,
            weight,
        })
    }

    /// Orders `subset` so that every node comes after all of its parents
    /// within `subset`. Among nodes which are ready at the same time, the
    /// smallest ID goes first.
    pub fn topological_order<'a, I>(
        &self,
        subset: I,
    ) -> Result<Vec<ItemId>, GraphError>
    where
        I: IntoIterator<Item = &'a ItemId>,
    {
        let subset: BTreeSet<&ItemId> = subset.into_iter().collect();

        let mut in_degree: HashMap<&ItemId, usize> =
            HashMap::with_capacity(subset.len());
        for &id in subset.iter() {
            let node = self.node(id)?;
            let degree =
                node.parents.iter().filter(|p| subset.contains(p)).count();
            in_degree.insert(id, degree);
        }

        let mut ready: BTreeSet<&ItemId> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut sorted = Vec::with_capacity(subset.len());
        while let Some(id) = ready.pop_first() {
            for child in self.node(id)?.children.iter() {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(child);
                    }
                }
            }
            sorted.push(id.clone());
        }

        if sorted.len() < subset.len() {
            let stuck = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(id, _)| id)
                .min();

            return Err(match stuck {
                Some(id) => GraphError::CycleDetected(id.clone()),
                None => unreachable!("unsorted nodes must have parents left"),
            });
        }

        Ok(sorted)
    }

    /// Fails with [GraphError::CycleDetected] if the graph contains a cycle.
    pub fn verify_acyclic(&self) -> Result<(), GraphError> {
        self.topological_order(self.nodes.keys()).map(|_| ())
    }

    /// Removes `id` and every edge touching it. Descendants stay in the
    /// graph.
    pub fn remove(&mut self, id: &ItemId) -> Option<Node> {
        let node = self.nodes.remove(id)?;

        for parent in node.parents.iter() {
            if let Some(parent) = self.nodes.get_mut(parent) {
                parent.children.remove(id);
            }
        }
        for child in node.children.iter() {
            if let Some(child) = self.nodes.get_mut(child) {
                child.parents.remove(id);
            }
        }

        Some(node)
    }
}
