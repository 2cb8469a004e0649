// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use pivot_hashing::HashKey;

use crate::node::Entry;
use crate::pointer::NodePtr;

/// A hash-array-mapped trie keyed by 6-bit chunks of a 64-bit key digest.
///
/// The tree owns every node reachable from its root; moving it transfers the
/// root and cloning it clones the whole structure. A single thread must hold
/// exclusive access for any mutation; a tree that is not being mutated can be
/// read from any number of threads.
#[derive(Clone, Debug, PartialEq)]
pub struct HashTree<K, V = ()> {
    root: NodePtr<K, V>,
}

impl<K, V> Default for HashTree<K, V> {
    fn default() -> Self {
        HashTree {
            root: NodePtr::Empty,
        }
    }
}

impl<K: HashKey + Ord, V> HashTree<K, V> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a key-value pair.
    ///
    /// Returns `true` when the key was not present before; an existing entry
    /// is left untouched and `false` is returned.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let hash = key.hash_key();
        self.root.insert_entry(hash, 0, Entry::new(key, value))
    }

    /// Removes the entry for `key` if present. Removing an absent key is a
    /// no-op. Returns `true` when an entry was removed.
    pub fn remove(&mut self, key: &K) -> bool {
        self.root.remove_entry(key.hash_key(), 0, key)
    }

    /// Returns the value stored for `key`, if any.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.root
            .find_entry(key.hash_key(), 0, key)
            .map(|entry| entry.value())
    }

    /// Check if `key` is stored.
    pub fn contains(&self, key: &K) -> bool {
        self.root.find_entry(key.hash_key(), 0, key).is_some()
    }

    /// Returns an entry of `self` whose key is also stored in `other`, or
    /// `None` when the two trees share no key.
    ///
    /// Both trees descend in lockstep, intersecting occupation masks to skip
    /// whole subtrees that cannot overlap.
    pub fn find_common<'a>(&'a self, other: &Self) -> Option<&'a Entry<K, V>> {
        self.root.common_entry(&other.root, 0)
    }

    /// Check if the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Drops every entry and resets the root.
    pub fn clear(&mut self) {
        self.root = NodePtr::Empty;
    }

    /// Invokes `f` on each entry in unspecified order until it returns
    /// `true`. Returns `true` when the walk was stopped by the callback.
    pub fn for_each<F>(&self, mut f: F) -> bool
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut visit = |entry: &Entry<K, V>| f(entry.key(), entry.value());
        self.root.for_each_entry(&mut visit)
    }
}

/// A set-flavored tree storing bare keys.
pub type HashTreeSet<K> = HashTree<K, ()>;

impl<K: HashKey + Ord> HashTree<K, ()> {
    /// Inserts a key. Returns `true` when it was not present before.
    pub fn insert_key(&mut self, key: K) -> bool {
        self.insert(key, ())
    }
}
