// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use std::cmp::Ordering;

use pivot_hashing::HashKey;

use crate::bitfield::Occupation;
use crate::hash_bits::chunk;
use crate::pointer::NodePtr;

/// A stored key-value pair.
///
/// Set-flavored trees store `V = ()`. Entries compare by key only; the key
/// is immutable once stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry<K, V> {
    key: K,
    value: V,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(key: K, value: V) -> Self {
        Entry { key, value }
    }

    /// Returns the key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns the value.
    pub fn value(&self) -> &V {
        &self.value
    }
}

/// Number of inner-leaf size classes.
pub(crate) const LEAF_SIZE_CLASSES: u8 = 4;

/// Entry total at which a subtree stops fitting into a single inner leaf.
pub(crate) const LEAF_BURST_THRESHOLD: usize = 30;

/// Capacity of inner-leaf size class `class` (1-based).
pub(crate) fn leaf_capacity(class: u8) -> usize {
    debug_assert!(class >= 1 && class <= LEAF_SIZE_CLASSES);
    6 + (class as usize - 1) * 8
}

/// Smallest size class whose capacity holds `size` entries.
pub(crate) fn leaf_class_for(size: usize) -> u8 {
    debug_assert!(size <= leaf_capacity(LEAF_SIZE_CLASSES));
    match size {
        0..=6 => 1,
        7..=14 => 2,
        15..=22 => 3,
        _ => 4,
    }
}

/// A sorted bucket of entries together with the chunk values they occupy at
/// the bucket's depth.
///
/// The entry array is kept sorted by key and scanned linearly; at these
/// sizes the scan beats a binary search and the sortedness feeds the
/// two-pointer intersection walk.
#[derive(Debug, PartialEq)]
pub(crate) struct InnerLeaf<K, V> {
    pub(crate) occupation: Occupation,
    pub(crate) entries: Vec<Entry<K, V>>,
}

// A clone must keep the size-class capacity of the backing buffer, which a
// derived `Vec` clone would shrink to the length.
impl<K: Clone, V: Clone> Clone for InnerLeaf<K, V> {
    fn clone(&self) -> Self {
        let mut entries = Vec::with_capacity(self.entries.capacity());
        entries.extend(self.entries.iter().cloned());
        InnerLeaf {
            occupation: self.occupation,
            entries,
        }
    }
}

impl<K: HashKey + Ord, V> InnerLeaf<K, V> {
    /// An empty leaf with the capacity of `class`.
    pub fn with_class(class: u8) -> Self {
        InnerLeaf {
            occupation: Occupation::default(),
            entries: Vec::with_capacity(leaf_capacity(class)),
        }
    }

    /// A class-1 leaf holding one entry.
    pub fn single(hash: u64, depth: u8, entry: Entry<K, V>) -> Self {
        let mut leaf = Self::with_class(1);
        leaf.occupation.set(chunk(hash, depth));
        leaf.entries.push(entry);
        leaf
    }

    /// Moves the entries into a leaf of `class`, reallocating the backing
    /// buffer to the new capacity.
    pub fn resized(self, class: u8) -> Self {
        debug_assert!(self.entries.len() <= leaf_capacity(class));
        let mut entries = Vec::with_capacity(leaf_capacity(class));
        entries.extend(self.entries);
        InnerLeaf {
            occupation: self.occupation,
            entries,
        }
    }

    /// Inserts an entry, keeping the array sorted. Returns `false` when the
    /// key is already present. The caller must have left room.
    pub fn insert(&mut self, hash: u64, depth: u8, entry: Entry<K, V>) -> bool {
        debug_assert!(self.entries.len() < self.entries.capacity());
        let mut at = self.entries.len();
        for (i, e) in self.entries.iter().enumerate() {
            match e.key.cmp(&entry.key) {
                Ordering::Less => {}
                Ordering::Equal => return false,
                Ordering::Greater => {
                    at = i;
                    break;
                }
            }
        }
        self.occupation.set(chunk(hash, depth));
        self.entries.insert(at, entry);
        true
    }

    /// Looks an entry up by key, failing fast on an unoccupied chunk.
    pub fn find(&self, hash: u64, depth: u8, key: &K) -> Option<&Entry<K, V>> {
        if !self.occupation.test(chunk(hash, depth)) {
            return None;
        }
        for e in &self.entries {
            match e.key.cmp(key) {
                Ordering::Less => {}
                Ordering::Equal => return Some(e),
                Ordering::Greater => break,
            }
        }
        None
    }

    /// Removes the entry for `key` if present.
    ///
    /// The chunk bit is cleared only when no other entry occupies the same
    /// chunk; entry digests are recomputed from their keys on the fly.
    pub fn erase(&mut self, hash: u64, depth: u8, key: &K) -> bool {
        let h = chunk(hash, depth);
        if !self.occupation.test(h) {
            return false;
        }
        let mut found = None;
        let mut chunk_shared = false;
        for (i, e) in self.entries.iter().enumerate() {
            if chunk(e.key.hash_key(), depth) != h {
                continue;
            }
            if e.key == *key {
                found = Some(i);
            } else {
                chunk_shared = true;
            }
        }
        match found {
            Some(i) => {
                self.entries.remove(i);
                if !chunk_shared {
                    self.occupation.flip(h);
                }
                true
            }
            None => false,
        }
    }

    /// Returns an entry whose key occurs in both leaves, if any.
    ///
    /// Both leaves must sit at the same depth, so a shared key implies a
    /// shared chunk: an empty mask intersection rules the pair out, and the
    /// sorted arrays give a key-range cutoff and a two-pointer merge.
    pub fn common_entry<'a>(a: &'a Self, b: &Self) -> Option<&'a Entry<K, V>> {
        if (a.occupation & b.occupation).is_empty() {
            return None;
        }
        if a.entries[a.entries.len() - 1].key < b.entries[0].key
            || b.entries[b.entries.len() - 1].key < a.entries[0].key
        {
            return None;
        }
        let (mut i, mut j) = (0, 0);
        while i < a.entries.len() && j < b.entries.len() {
            match a.entries[i].key.cmp(&b.entries[j].key) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => return Some(&a.entries[i]),
            }
        }
        None
    }
}

/// A plain bucket chaining entries whose full digests collide.
///
/// Only legal at the depth where digest chunks are exhausted.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ListLeaf<K, V> {
    pub(crate) entries: Vec<Entry<K, V>>,
}

impl<K: Ord, V> ListLeaf<K, V> {
    /// A bucket holding one entry.
    pub fn single(entry: Entry<K, V>) -> Self {
        ListLeaf {
            entries: vec![entry],
        }
    }

    /// Appends an entry unless its key is already chained.
    pub fn insert(&mut self, entry: Entry<K, V>) -> bool {
        if self.entries.iter().any(|e| e.key == entry.key) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn find(&self, key: &K) -> Option<&Entry<K, V>> {
        self.entries.iter().find(|e| e.key == *key)
    }

    /// Unlinks the entry for `key` if present.
    pub fn erase(&mut self, key: &K) -> bool {
        match self.entries.iter().position(|e| e.key == *key) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }
}

/// Child slots are reserved in steps of eight pointers (64 bytes), so
/// neighbouring population counts share an allocation size and most child
/// additions and removals avoid reallocating.
const SLOTS_PER_ALLOC: usize = 8;

fn slot_budget(children: usize) -> usize {
    (children + SLOTS_PER_ALLOC - 1) / SLOTS_PER_ALLOC * SLOTS_PER_ALLOC
}

/// An interior node: an occupation mask and one child per set bit, packed
/// densely in descending bit order.
#[derive(Debug, PartialEq)]
pub(crate) struct BranchNode<K, V> {
    pub(crate) occupation: Occupation,
    pub(crate) children: Vec<NodePtr<K, V>>,
}

// Like the leaves, a cloned branch keeps its allocation size.
impl<K: Clone, V: Clone> Clone for BranchNode<K, V> {
    fn clone(&self) -> Self {
        let mut children = Vec::with_capacity(self.children.capacity());
        children.extend(self.children.iter().cloned());
        BranchNode {
            occupation: self.occupation,
            children,
        }
    }
}

impl<K, V> BranchNode<K, V> {
    /// A branch with one empty child slot per set bit of `occupation`.
    ///
    /// The caller must fill every slot before the node becomes reachable.
    pub fn with_occupation(occupation: Occupation) -> Self {
        let population = occupation.num_set();
        let mut children = Vec::with_capacity(slot_budget(population));
        children.resize_with(population, NodePtr::default);
        BranchNode {
            occupation,
            children,
        }
    }

    /// Packed index of the child for chunk `pos`; the bit must be set.
    pub fn child_index(&self, pos: u8) -> usize {
        debug_assert!(self.occupation.test(pos));
        self.occupation.num_set_until(pos) - 1
    }

    pub fn child(&self, pos: u8) -> &NodePtr<K, V> {
        &self.children[self.child_index(pos)]
    }

    pub fn child_mut(&mut self, pos: u8) -> &mut NodePtr<K, V> {
        let at = self.child_index(pos);
        &mut self.children[at]
    }

    /// Opens an empty child slot for chunk `pos`; the bit must be unset.
    pub fn add_child(&mut self, pos: u8) -> &mut NodePtr<K, V> {
        debug_assert!(!self.occupation.test(pos));
        if self.children.len() == self.children.capacity() {
            let grown = slot_budget(self.children.len() + 1);
            self.children.reserve_exact(grown - self.children.len());
        }
        self.occupation.set(pos);
        let at = self.child_index(pos);
        self.children.insert(at, NodePtr::default());
        &mut self.children[at]
    }

    /// Drops the child slot for chunk `pos` and clears its bit.
    pub fn remove_child(&mut self, pos: u8) {
        let at = self.occupation.num_set() - self.occupation.num_set_after(pos);
        debug_assert_eq!(at, self.child_index(pos));
        self.occupation.flip(pos);
        self.children.remove(at);
        self.children.shrink_to(slot_budget(self.children.len()));
    }
}
