// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pivot_hashtree::{HashTree, HashTreeSet};

fn collect_keys<V>(tree: &HashTree<u64, V>) -> Vec<u64> {
    let mut keys = Vec::new();
    tree.for_each(|k, _| {
        keys.push(*k);
        false
    });
    keys.sort();
    keys
}

#[test]
fn test_intersection() {
    let mut a = HashTreeSet::new();
    for key in &[1u64, 3, 5, 7, 9] {
        assert!(a.insert_key(*key));
    }
    let mut b = HashTreeSet::new();
    for key in &[2u64, 3, 6, 7] {
        assert!(b.insert_key(*key));
    }

    let found = a.find_common(&b).expect("3 and 7 are shared");
    assert!(*found.key() == 3 || *found.key() == 7);
    let found = b.find_common(&a).expect("3 and 7 are shared");
    assert!(*found.key() == 3 || *found.key() == 7);

    let mut c = HashTreeSet::new();
    for key in &[4u64, 8, 100] {
        assert!(c.insert_key(*key));
    }
    assert!(a.find_common(&c).is_none());
    assert!(c.find_common(&a).is_none());
}

#[test]
fn test_copy_independence() {
    let mut a: HashTree<u64, u64> = HashTree::new();
    for key in 0..100u64 {
        assert!(a.insert(key, key * key));
    }
    let b = a.clone();
    assert_eq!(a, b);

    for key in (0..100u64).filter(|k| k % 2 == 0) {
        assert!(a.remove(&key));
    }
    assert_eq!(collect_keys(&a).len(), 50);
    // The clone is untouched by mutation of the source.
    assert_eq!(collect_keys(&b).len(), 100);
    for key in 0..100u64 {
        assert_eq!(b.get(&key), Some(&(key * key)));
    }
}

#[test]
fn test_insert_then_erase_restores_content() {
    let mut tree: HashTree<u64, u64> = HashTree::new();
    for key in 0..40u64 {
        tree.insert(key, key);
    }
    let before = collect_keys(&tree);

    assert!(tree.insert(555, 0));
    assert!(tree.remove(&555));
    assert_eq!(collect_keys(&tree), before);
}

#[test]
fn test_duplicate_insert_keeps_first_value() {
    let mut tree: HashTree<String, u32> = HashTree::new();
    assert!(tree.insert("x1".to_string(), 1));
    assert!(!tree.insert("x1".to_string(), 2));
    assert_eq!(tree.get(&"x1".to_string()), Some(&1));
    assert!(tree.contains(&"x1".to_string()));
    assert!(!tree.contains(&"x2".to_string()));
}

#[test]
fn test_erase_absent_is_noop() {
    let mut tree: HashTree<u64, u64> = HashTree::new();
    for key in 0..20u64 {
        tree.insert(key, key);
    }
    let snapshot = tree.clone();
    assert!(!tree.remove(&999));
    assert_eq!(tree, snapshot);
}

#[test]
fn test_for_each_early_stop() {
    let mut tree: HashTreeSet<u64> = HashTreeSet::new();
    for key in 0..50u64 {
        tree.insert_key(key);
    }

    let mut visited = 0usize;
    let stopped = tree.for_each(|_, _| {
        visited += 1;
        visited == 10
    });
    assert!(stopped);
    assert_eq!(visited, 10);

    let mut visited = 0usize;
    let stopped = tree.for_each(|_, _| {
        visited += 1;
        false
    });
    assert!(!stopped);
    assert_eq!(visited, 50);
}

#[test]
fn test_clear_and_move() {
    let mut tree: HashTree<u64, u64> = HashTree::new();
    assert!(tree.is_empty());
    for key in 0..64u64 {
        tree.insert(key, key);
    }
    assert!(!tree.is_empty());

    // Moving out through `take` leaves an empty tree behind.
    let moved = std::mem::take(&mut tree);
    assert!(tree.is_empty());
    assert_eq!(collect_keys(&moved).len(), 64);

    let mut moved = moved;
    moved.clear();
    assert!(moved.is_empty());
    assert!(moved.find_common(&tree).is_none());
}

#[test]
fn test_pair_keys() {
    // Composite keys of the (row, column) kind.
    let mut tree: HashTree<(u32, u32), f64> = HashTree::new();
    for row in 0..12u32 {
        for col in 0..12u32 {
            assert!(tree.insert((row, col), f64::from(row * col)));
        }
    }
    assert_eq!(tree.get(&(3, 4)), Some(&12.0));
    assert_eq!(tree.get(&(4, 3)), Some(&12.0));
    assert!(tree.remove(&(3, 4)));
    assert!(tree.get(&(3, 4)).is_none());
    assert_eq!(tree.get(&(4, 3)), Some(&12.0));
}

#[test]
fn test_random_against_mirror() {
    let mut rng = StdRng::seed_from_u64(0xFEED);
    let mut tree: HashTreeSet<u64> = HashTreeSet::new();
    let mut mirror: BTreeSet<u64> = BTreeSet::new();

    for _ in 0..2000 {
        let key = u64::from(rng.gen_range(0u32, 500));
        if rng.gen_range(0, 3) < 2 {
            assert_eq!(tree.insert_key(key), mirror.insert(key));
        } else {
            assert_eq!(tree.remove(&key), mirror.remove(&key));
        }
    }

    let keys = collect_keys(&tree);
    let expected: Vec<u64> = mirror.iter().cloned().collect();
    assert_eq!(keys, expected);
    for key in 0..500u64 {
        assert_eq!(tree.contains(&key), mirror.contains(&key));
    }
}
