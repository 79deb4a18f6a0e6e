/*!
Dependency-aware block construction.

A block producer fills a block of limited weight from a pool of pending items,
some of which depend on others. This crate compares two ways of doing so:

- [`GreedySelector`](selector::GreedySelector) sorts items by fee rate and
  makes a single pass, dropping any item whose parents are not mined yet.
- [`PackageSelector`](selector::PackageSelector) prices every item together
  with its unmined ancestors and repeatedly mines the best-paying package
  (child-pays-for-parent).

```
use blockcraft::prelude::*;

let items = vec![
    Item::new("parent", 500, 500),
    Item::new("child", 500, 25_000).with_parents(["parent"]),
];
let capacity = Capacity::new(1200).unwrap();

let greedy = GreedySelector::new().select(&items, capacity).unwrap();
let package = PackageSelector::new().select(&items, capacity).unwrap();

assert_eq!(greedy.total_fee, 500);
assert_eq!(package.total_fee, 25_500);
```
*/

pub mod battle;
pub mod block;
pub mod graph;
pub mod item;
pub mod mempool;
pub mod prelude;
pub mod results;
pub mod selector;
pub mod tie_breaker;
