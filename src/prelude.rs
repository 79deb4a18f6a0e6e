/*!
Re-export of common values and datatypes used for building and comparing
blocks. Must be imported manually.

```
use blockcraft::prelude::*;
```
*/

use crate::{
    battle, block, graph, item, mempool, results, selector, tie_breaker,
};

pub use battle::{Battle, BattleBuildError, BattleBuilder, BattleOutput, Entry};

pub use block::{
    would_exceed, Block, BlockBuilder, Capacity, InvalidCapacity,
    MAX_BLOCK_WEIGHT,
};

pub use graph::{DependencyGraph, GraphError, Package};

pub use item::{FeeRate, Item, ItemError, ItemId};

pub use mempool::{
    filter_dust, inject_whale, Mempool, MempoolBuildError, MempoolBuilder,
};

pub use results::{Format, ResultsTable};

pub use selector::{
    Cluster, GreedySelector, PackageSelection, PackageSelector,
    SelectionError, Selector,
};

pub use tie_breaker::TieBreaker;
