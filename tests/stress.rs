//! Concurrent scenarios hammering the removal paths.
//!
//! The most delicate part of the tree is unlinking a leaf whose parent is a routing node, which
//! takes the routing node out too. These tests build shapes full of routing nodes and then remove
//! their children from several threads at once.

use std::collections::VecDeque;
use std::sync::Barrier;

use contree::{ConTreeMap, ConTreeSet};
use crossbeam_utils::thread;
use rand::prelude::*;

const THREADS: usize = 8;
const KEYS: usize = 1000;

/// Keys `0..size` level by level, so inserting them in this order makes a balanced tree.
///
/// With `size` one less than a power of two, the second half are exactly the leaves.
fn balanced_order(size: u32) -> Vec<u32> {
    let mut order = Vec::with_capacity(size as usize);
    let mut ranges = VecDeque::new();
    ranges.push_back((0, size));
    while let Some((low, high)) = ranges.pop_front() {
        if low < high {
            let mid = low + (high - low) / 2;
            order.push(mid);
            ranges.push_back((low, mid));
            ranges.push_back((mid + 1, high));
        }
    }
    order
}

#[test]
fn fill_and_drain_from_many_threads() {
    for _ in 0..10 {
        let mut rng = thread_rng();
        let mut keys = Vec::with_capacity(KEYS);
        while keys.len() < KEYS {
            let key: u64 = rng.gen();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        let mut set = ConTreeSet::new();

        thread::scope(|s| {
            for part in keys.chunks(KEYS / THREADS) {
                let set = &set;
                s.spawn(move |_| {
                    for key in part {
                        assert!(set.insert(*key));
                    }
                });
            }
        })
        .unwrap();
        assert_eq!(KEYS, set.len());
        set.verify().unwrap();

        keys.shuffle(&mut rng);
        thread::scope(|s| {
            for part in keys.chunks(KEYS / THREADS) {
                let set = &set;
                s.spawn(move |_| {
                    for key in part {
                        assert!(set.remove(key));
                    }
                });
            }
        })
        .unwrap();

        assert_eq!(0, set.len());
        assert_eq!(0, set.num_nodes());
        assert!(set.is_empty());
        set.verify().unwrap();
    }
}

#[test]
fn racing_removal_of_inner_node() {
    for _ in 0..100 {
        let mut map = ConTreeMap::new();
        for k in &[5, 3, 8] {
            map.put_if_absent(*k, k * 10);
        }
        let barrier = Barrier::new(2);
        let results = thread::scope(|s| {
            let handles = (0..2)
                .map(|_| {
                    let map = &map;
                    let barrier = &barrier;
                    s.spawn(move |_| {
                        barrier.wait();
                        map.remove(&5)
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        })
        .unwrap();

        let won = results.into_iter().flatten().collect::<Vec<_>>();
        assert_eq!(vec![50], won);
        let census = map.census();
        assert_eq!(2, census.data);
        assert_eq!(1, census.routing);
        map.verify().unwrap();
    }
}

/// Makes most of the inner nodes routing, then removes the leaves concurrently. Every removal of
/// a leaf under a routing node collapses the routing node, and the neighbours do the same thing
/// one level up or down at the same time.
#[test]
fn collapse_chains() {
    let order = balanced_order((1 << 10) - 1);

    for _ in 0..10 {
        let mut map = ConTreeMap::new();
        for k in &order {
            assert!(map.put_if_absent(*k, *k).is_none());
        }
        let (inner, leaves) = order.split_at(order.len() / 2);
        for k in inner {
            assert_eq!(Some(*k), map.remove(k));
        }
        assert_eq!(leaves.len(), map.len());
        map.verify().unwrap();

        let mut leaves = leaves.to_vec();
        leaves.shuffle(&mut thread_rng());
        thread::scope(|s| {
            for part in leaves.chunks(leaves.len() / THREADS) {
                let map = &map;
                s.spawn(move |_| {
                    for k in part {
                        assert_eq!(Some(*k), map.remove(k));
                    }
                });
            }
        })
        .unwrap();

        assert_eq!(0, map.num_nodes());
        map.verify().unwrap();
    }
}

/// Removals and insertions of the same keys race, so the routing nodes get revived while their
/// children are being unlinked.
#[test]
fn revive_while_collapsing() {
    let order = balanced_order((1 << 8) - 1);

    let mut map = ConTreeMap::new();
    for k in &order {
        map.put_if_absent(*k, *k);
    }

    thread::scope(|s| {
        for t in 0..THREADS {
            let map = &map;
            let order = &order;
            s.spawn(move |_| {
                let mut rng = thread_rng();
                for _ in 0..20_000 {
                    let key = *order.choose(&mut rng).unwrap();
                    if t % 2 == 0 {
                        if let Some(value) = map.remove(&key) {
                            assert_eq!(key, value);
                        }
                    } else if let Some(value) = map.put_if_absent(key, key) {
                        assert_eq!(key, value);
                    }
                }
            });
        }
    })
    .unwrap();

    map.verify().unwrap();
    let present = order.iter().filter(|k| map.get(*k).is_some()).count();
    assert_eq!(present, map.len());
    // Every routing node is there for a reason.
    let census = map.census();
    assert!(census.routing <= census.data);
}

/// Lookups running next to the modifications always see either nothing or the right value.
#[test]
fn readers_during_churn() {
    const SIZE: u64 = 512;
    let map = ConTreeMap::new();
    thread::scope(|s| {
        for t in 0..THREADS {
            let map = &map;
            s.spawn(move |_| {
                let mut rng = thread_rng();
                for _ in 0..20_000 {
                    let key = rng.gen_range(0..SIZE);
                    match t % 4 {
                        0 => {
                            map.put_if_absent(key, key.to_string());
                        }
                        1 => {
                            map.remove(&key);
                        }
                        _ => {
                            if let Some(value) = map.get(&key) {
                                assert_eq!(key.to_string(), value);
                            }
                        }
                    }
                }
            });
        }
    })
    .unwrap();
}
