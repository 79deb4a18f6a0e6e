use std::collections::HashSet;

use blockcraft::prelude::*;
use proptest::{prelude::*, sample::Index};
use rand::{rngs::StdRng, SeedableRng};

/// Pools of up to 40 items where every parent reference points at an earlier
/// item or at an ID outside the pool.
fn pool() -> impl Strategy<Value = Vec<Item>> {
    prop::collection::vec(
        (
            1u64..5_000,
            0u64..200_000,
            prop::collection::vec(any::<Index>(), 0..3),
            any::<bool>(),
        ),
        0..40,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (weight, fee, parents, dangling))| {
                let mut item = Item::new(format!("tx{:03}", i), weight, fee);
                if i > 0 {
                    item = item.with_parents(
                        parents.iter().map(|p| format!("tx{:03}", p.index(i))),
                    );
                }
                if dangling {
                    item = item.with_parents(["not-in-pool"]);
                }

                item
            })
            .collect()
    })
}

fn selectors() -> Vec<Box<dyn Selector>> {
    vec![
        Box::new(GreedySelector::new()),
        Box::new(GreedySelector::with_tie_breaker(TieBreaker::InputOrder)),
        Box::new(PackageSelector::new()),
        Box::new(PackageSelector::with_tie_breaker(TieBreaker::SmallestWeight)),
    ]
}

fn assert_parents_first(items: &[Item], block: &Block) {
    let pool: HashSet<&ItemId> = items.iter().map(|item| &item.id).collect();

    for (position, id) in block.ids.iter().enumerate() {
        let item = items.iter().find(|item| &item.id == id).unwrap();
        for parent in item.parents.iter().filter(|p| pool.contains(p)) {
            let parent_position = block.position(parent);
            assert!(
                parent_position.is_some_and(|p| p < position),
                "{} mined at {} before its parent {}",
                id,
                position,
                parent
            );
        }
    }
}

proptest! {
    #[test]
    fn blocks_respect_capacity(items in pool(), capacity in 1u64..50_000) {
        let capacity = Capacity::new(capacity).unwrap();

        for selector in selectors() {
            let block = selector.select(&items, capacity).unwrap();

            prop_assert!(block.total_weight <= capacity.get());
            prop_assert_eq!(
                block.total_weight,
                block.ids.iter()
                    .map(|id| items.iter().find(|i| &i.id == id).unwrap().weight)
                    .sum::<u64>()
            );
        }
    }

    #[test]
    fn parents_are_mined_first(items in pool(), capacity in 1u64..50_000) {
        let capacity = Capacity::new(capacity).unwrap();

        for selector in selectors() {
            let block = selector.select(&items, capacity).unwrap();
            assert_parents_first(&items, &block);
        }
    }

    #[test]
    fn selection_is_deterministic(items in pool(), capacity in 1u64..50_000) {
        let capacity = Capacity::new(capacity).unwrap();
        let before = items.clone();

        for selector in selectors() {
            let first = selector.select(&items, capacity).unwrap();
            let second = selector.select(&items, capacity).unwrap();

            prop_assert_eq!(first, second);
        }
        prop_assert_eq!(items, before);
    }

    #[test]
    fn no_item_is_mined_twice(items in pool(), capacity in 1u64..50_000) {
        let capacity = Capacity::new(capacity).unwrap();

        for selector in selectors() {
            let block = selector.select(&items, capacity).unwrap();
            let unique: HashSet<_> = block.ids.iter().collect();

            prop_assert_eq!(unique.len(), block.len());
        }
    }

    #[test]
    fn package_items_match_block(items in pool(), capacity in 1u64..50_000) {
        let capacity = Capacity::new(capacity).unwrap();
        let selection = PackageSelector::new()
            .select_packages(&items, capacity)
            .unwrap();

        let mined: HashSet<_> = selection.block.ids.iter().collect();
        let records: HashSet<_> = selection.items.iter().map(|i| &i.id).collect();
        prop_assert_eq!(mined, records);
        prop_assert_eq!(
            selection.items.iter().map(|i| i.fee).sum::<u64>(),
            selection.block.total_fee
        );
    }
}

#[test]
fn child_pays_for_parent_beats_greedy() {
    let items = vec![
        Item::new("P", 500, 500),
        Item::new("C", 500, 25_000).with_parents(["P"]),
    ];
    let capacity = Capacity::new(1200).unwrap();

    let greedy = GreedySelector::new().select(&items, capacity).unwrap();
    let package = PackageSelector::new().select(&items, capacity).unwrap();

    assert_eq!(greedy.ids, vec![ItemId::from("P")]);
    assert_eq!(greedy.total_fee, 500);
    assert_eq!(package.ids, vec![ItemId::from("P"), ItemId::from("C")]);
    assert_eq!(package.total_fee, 25_500);
    assert!(package.total_fee > greedy.total_fee);
}

#[test]
fn empty_pool() {
    for selector in selectors() {
        let block = selector.select(&[], Capacity::default()).unwrap();

        assert_eq!(block, Block::empty(Capacity::default()));
    }
}

#[test]
fn dangling_parent_is_minable() {
    let items = vec![Item::new("lonely", 100, 100).with_parents(["unknown-id"])];

    for selector in selectors() {
        let block = selector.select(&items, Capacity::new(100).unwrap()).unwrap();

        assert_eq!(block.ids, vec![ItemId::from("lonely")]);
    }
}

#[test]
fn capacity_boundary() {
    let items = vec![Item::new("a", 700, 7_000), Item::new("b", 500, 500)];

    for selector in selectors() {
        let block = selector.select(&items, Capacity::new(1200).unwrap()).unwrap();
        assert_eq!(block.total_weight, 1200);

        let block = selector.select(&items, Capacity::new(1199).unwrap()).unwrap();
        assert_eq!(block.ids, vec![ItemId::from("a")]);
    }
}

#[test]
fn whale_battle_on_generated_pool() {
    let mempool = Mempool::builder().size(1000).seed(2024).build().unwrap();
    let mut items = mempool.generate();
    let whale = inject_whale(&mut items, &mut StdRng::seed_from_u64(9)).unwrap();

    let output = Battle::builder()
        .capacity(200_000)
        .build()
        .unwrap()
        .run(&items)
        .unwrap();

    let greedy = &output.entries[0].block;
    let package = &output.entries[1].block;

    assert!(package.position(&whale).is_some());
    assert!(greedy.total_weight <= 200_000);
    assert!(package.total_weight <= 200_000);
    assert_parents_first(&items, greedy);
    assert_parents_first(&items, package);
}

#[test]
fn fee_totals_past_u64_fail_the_run() {
    let items = vec![Item::new("a", 1, u64::MAX), Item::new("b", 1, 5)];

    for selector in selectors() {
        assert_eq!(
            selector.select(&items, Capacity::new(10).unwrap()),
            Err(SelectionError::FeeOverflow)
        );
    }
}
