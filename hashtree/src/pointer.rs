// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use std::mem;

use pivot_hashing::HashKey;

use crate::bitfield::Occupation;
use crate::hash_bits::{chunk, MAX_DEPTH};
use crate::node::{
    leaf_capacity, leaf_class_for, BranchNode, Entry, InnerLeaf, ListLeaf, LEAF_BURST_THRESHOLD,
    LEAF_SIZE_CLASSES,
};

/// A reference to a subtree, discriminating the node kind it points at.
///
/// The four inner-leaf variants carry the size class of their leaf, so the
/// class never needs to be stored inside the node itself.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum NodePtr<K, V> {
    Empty,
    ListLeaf(Box<ListLeaf<K, V>>),
    Leaf1(Box<InnerLeaf<K, V>>),
    Leaf2(Box<InnerLeaf<K, V>>),
    Leaf3(Box<InnerLeaf<K, V>>),
    Leaf4(Box<InnerLeaf<K, V>>),
    Branch(Box<BranchNode<K, V>>),
}

impl<K, V> Default for NodePtr<K, V> {
    fn default() -> Self {
        NodePtr::Empty
    }
}

impl<K, V> NodePtr<K, V> {
    pub fn is_empty(&self) -> bool {
        matches!(self, NodePtr::Empty)
    }

    /// Size class of the pointed-at inner leaf, if it is one.
    pub fn size_class(&self) -> Option<u8> {
        match self {
            NodePtr::Leaf1(_) => Some(1),
            NodePtr::Leaf2(_) => Some(2),
            NodePtr::Leaf3(_) => Some(3),
            NodePtr::Leaf4(_) => Some(4),
            _ => None,
        }
    }

    fn from_inner_leaf(class: u8, leaf: InnerLeaf<K, V>) -> Self {
        let leaf = Box::new(leaf);
        match class {
            1 => NodePtr::Leaf1(leaf),
            2 => NodePtr::Leaf2(leaf),
            3 => NodePtr::Leaf3(leaf),
            4 => NodePtr::Leaf4(leaf),
            _ => unreachable!(),
        }
    }

    /// Entries stored directly in the pointed-at leaf, if it is one.
    pub fn leaf_entries(&self) -> Option<&[Entry<K, V>]> {
        match self {
            NodePtr::ListLeaf(list) => Some(&list.entries),
            NodePtr::Leaf1(leaf)
            | NodePtr::Leaf2(leaf)
            | NodePtr::Leaf3(leaf)
            | NodePtr::Leaf4(leaf) => Some(&leaf.entries),
            _ => None,
        }
    }

    /// Number of entries below this pointer; `None` for a branch, whose
    /// subtree is known to be too large for the callers that ask.
    pub fn entry_count(&self) -> Option<usize> {
        match self {
            NodePtr::Empty => Some(0),
            NodePtr::ListLeaf(list) => Some(list.entries.len()),
            NodePtr::Leaf1(leaf)
            | NodePtr::Leaf2(leaf)
            | NodePtr::Leaf3(leaf)
            | NodePtr::Leaf4(leaf) => Some(leaf.entries.len()),
            NodePtr::Branch(_) => None,
        }
    }

    /// Visits every entry below this pointer; returns `true` when the
    /// callback stopped the walk.
    pub fn for_each_entry<F>(&self, f: &mut F) -> bool
    where
        F: FnMut(&Entry<K, V>) -> bool,
    {
        match self {
            NodePtr::Empty => false,
            NodePtr::ListLeaf(list) => list.entries.iter().any(|e| f(e)),
            NodePtr::Leaf1(leaf)
            | NodePtr::Leaf2(leaf)
            | NodePtr::Leaf3(leaf)
            | NodePtr::Leaf4(leaf) => leaf.entries.iter().any(|e| f(e)),
            NodePtr::Branch(branch) => branch.children.iter().any(|child| child.for_each_entry(f)),
        }
    }
}

impl<K: HashKey + Ord, V> NodePtr<K, V> {
    /// Inserts an entry below this pointer. Returns `true` when the key was
    /// not present before.
    pub fn insert_entry(&mut self, hash: u64, depth: u8, entry: Entry<K, V>) -> bool {
        match self {
            NodePtr::Empty => {
                *self = if depth == MAX_DEPTH {
                    NodePtr::ListLeaf(Box::new(ListLeaf::single(entry)))
                } else {
                    NodePtr::Leaf1(Box::new(InnerLeaf::single(hash, depth, entry)))
                };
                true
            }
            NodePtr::ListLeaf(list) => {
                debug_assert_eq!(depth, MAX_DEPTH);
                list.insert(entry)
            }
            NodePtr::Leaf1(_) | NodePtr::Leaf2(_) | NodePtr::Leaf3(_) | NodePtr::Leaf4(_) => {
                self.insert_into_inner_leaf(hash, depth, entry)
            }
            NodePtr::Branch(branch) => {
                let h = chunk(hash, depth);
                let child = if branch.occupation.test(h) {
                    branch.child_mut(h)
                } else {
                    branch.add_child(h)
                };
                child.insert_entry(hash, depth + 1, entry)
            }
        }
    }

    fn insert_into_inner_leaf(&mut self, hash: u64, depth: u8, entry: Entry<K, V>) -> bool {
        let class = match self.size_class() {
            Some(class) => class,
            None => unreachable!(),
        };
        {
            let leaf = match self {
                NodePtr::Leaf1(leaf)
                | NodePtr::Leaf2(leaf)
                | NodePtr::Leaf3(leaf)
                | NodePtr::Leaf4(leaf) => leaf,
                _ => unreachable!(),
            };
            if leaf.entries.len() < leaf_capacity(class) {
                return leaf.insert(hash, depth, entry);
            }
            if leaf.find(hash, depth, entry.key()).is_some() {
                return false;
            }
        }
        // The leaf is full and the key is new: grow a size class, or burst.
        let leaf = match mem::take(self) {
            NodePtr::Leaf1(leaf)
            | NodePtr::Leaf2(leaf)
            | NodePtr::Leaf3(leaf)
            | NodePtr::Leaf4(leaf) => *leaf,
            _ => unreachable!(),
        };
        *self = if class < LEAF_SIZE_CLASSES {
            let mut bigger = leaf.resized(class + 1);
            let inserted = bigger.insert(hash, depth, entry);
            debug_assert!(inserted);
            NodePtr::from_inner_leaf(class + 1, bigger)
        } else {
            Self::burst_leaf(leaf, hash, depth, entry)
        };
        true
    }

    /// Splits a full class-4 leaf into a branch over smaller leaves and adds
    /// the incoming entry, which is known not to collide with a stored key.
    fn burst_leaf(leaf: InnerLeaf<K, V>, hash: u64, depth: u8, entry: Entry<K, V>) -> Self {
        if depth == MAX_DEPTH {
            // The digest is exhausted; chain the collisions.
            let mut list = ListLeaf {
                entries: leaf.entries,
            };
            let inserted = list.insert(entry);
            debug_assert!(inserted);
            return NodePtr::ListLeaf(Box::new(list));
        }
        let old_size = leaf.entries.len();
        let mut occupation = Occupation::default();
        for e in &leaf.entries {
            occupation.set(chunk(e.key().hash_key(), depth));
        }
        let new_chunk = chunk(hash, depth);
        occupation.set(new_chunk);
        let branch_size = occupation.num_set();

        if branch_size == 1 {
            // Every key collides on this chunk too; push the whole leaf one
            // level down and split it there.
            let mut branch = BranchNode::with_occupation(occupation);
            *branch.child_mut(new_chunk) = Self::burst_leaf(leaf, hash, depth + 1, entry);
            return NodePtr::Branch(Box::new(branch));
        }

        let mut branch = BranchNode::with_occupation(occupation);
        if depth + 1 == MAX_DEPTH {
            // The children sit where chunks are exhausted, so each one is a
            // collision bucket.
            for e in leaf.entries.into_iter().chain(std::iter::once(entry)) {
                let slot = branch.child_mut(chunk(e.key().hash_key(), depth));
                match slot {
                    NodePtr::Empty => *slot = NodePtr::ListLeaf(Box::new(ListLeaf::single(e))),
                    // Keys under one leaf are distinct, no need to re-check.
                    NodePtr::ListLeaf(list) => list.entries.push(e),
                    _ => unreachable!(),
                }
            }
            return NodePtr::Branch(Box::new(branch));
        }

        let max_entries_per_child = 2 + old_size - branch_size;
        if max_entries_per_child <= leaf_capacity(1) {
            for slot in branch.children.iter_mut() {
                *slot = NodePtr::Leaf1(Box::new(InnerLeaf::with_class(1)));
            }
        } else {
            // Exact per-child counts pick the smallest fitting class.
            let mut counts = [0usize; 64];
            for e in &leaf.entries {
                counts[chunk(e.key().hash_key(), depth) as usize] += 1;
            }
            counts[new_chunk as usize] += 1;
            for h in 0..64u8 {
                let count = counts[h as usize];
                if count == 0 {
                    continue;
                }
                let class = leaf_class_for(count);
                *branch.child_mut(h) = NodePtr::from_inner_leaf(class, InnerLeaf::with_class(class));
            }
        }
        // Old entries arrive in sorted order, so they append cheaply.
        for e in leaf.entries.into_iter().chain(std::iter::once(entry)) {
            let hash = e.key().hash_key();
            let inserted = branch
                .child_mut(chunk(hash, depth))
                .insert_entry(hash, depth + 1, e);
            debug_assert!(inserted);
        }
        NodePtr::Branch(Box::new(branch))
    }

    /// Removes the entry for `key` below this pointer. Absent keys are a
    /// no-op. Returns `true` when an entry was removed.
    pub fn remove_entry(&mut self, hash: u64, depth: u8, key: &K) -> bool {
        match self {
            NodePtr::Empty => false,
            NodePtr::ListLeaf(list) => {
                let removed = list.erase(key);
                if removed && list.entries.is_empty() {
                    *self = NodePtr::Empty;
                }
                removed
            }
            NodePtr::Leaf1(_) | NodePtr::Leaf2(_) | NodePtr::Leaf3(_) | NodePtr::Leaf4(_) => {
                self.remove_from_inner_leaf(hash, depth, key)
            }
            NodePtr::Branch(_) => self.remove_from_branch(hash, depth, key),
        }
    }

    fn remove_from_inner_leaf(&mut self, hash: u64, depth: u8, key: &K) -> bool {
        let class = match self.size_class() {
            Some(class) => class,
            None => unreachable!(),
        };
        let leaf = match self {
            NodePtr::Leaf1(leaf)
            | NodePtr::Leaf2(leaf)
            | NodePtr::Leaf3(leaf)
            | NodePtr::Leaf4(leaf) => leaf,
            _ => unreachable!(),
        };
        if !leaf.erase(hash, depth, key) {
            return false;
        }
        let size = leaf.entries.len();
        if size == 0 {
            *self = NodePtr::Empty;
        } else if class > 1 && size <= leaf_capacity(class - 1) {
            let leaf = match mem::take(self) {
                NodePtr::Leaf1(leaf)
                | NodePtr::Leaf2(leaf)
                | NodePtr::Leaf3(leaf)
                | NodePtr::Leaf4(leaf) => *leaf,
                _ => unreachable!(),
            };
            *self = NodePtr::from_inner_leaf(class - 1, leaf.resized(class - 1));
        }
        true
    }

    fn remove_from_branch(&mut self, hash: u64, depth: u8, key: &K) -> bool {
        let branch = match self {
            NodePtr::Branch(branch) => branch,
            _ => unreachable!(),
        };
        let h = chunk(hash, depth);
        if !branch.occupation.test(h) {
            return false;
        }
        if !branch.child_mut(h).remove_entry(hash, depth + 1, key) {
            return false;
        }
        if branch.child(h).is_empty() {
            branch.remove_child(h);
        }
        if branch.occupation.num_set() == 0 {
            *self = NodePtr::Empty;
        } else {
            self.try_merge_into_leaf(depth);
        }
        true
    }

    /// Collapses the branch back into a single inner leaf when the entries
    /// remaining below it fit one.
    fn try_merge_into_leaf(&mut self, depth: u8) {
        let branch = match self {
            NodePtr::Branch(branch) => branch,
            _ => unreachable!(),
        };
        let mut total = 0usize;
        for child in &branch.children {
            match child.entry_count() {
                Some(count) => total += count,
                // A surviving branch child holds a full leaf's worth at
                // least; it would have collapsed itself otherwise.
                None => return,
            }
            if total >= LEAF_BURST_THRESHOLD {
                return;
            }
        }
        let branch = match mem::take(self) {
            NodePtr::Branch(branch) => *branch,
            _ => unreachable!(),
        };
        let class = leaf_class_for(total);
        let mut leaf = InnerLeaf::with_class(class);
        for child in branch.children {
            let entries = match child {
                NodePtr::ListLeaf(list) => list.entries,
                NodePtr::Leaf1(node)
                | NodePtr::Leaf2(node)
                | NodePtr::Leaf3(node)
                | NodePtr::Leaf4(node) => node.entries,
                _ => unreachable!(),
            };
            for e in entries {
                let hash = e.key().hash_key();
                let inserted = leaf.insert(hash, depth, e);
                debug_assert!(inserted);
            }
        }
        *self = NodePtr::from_inner_leaf(class, leaf);
    }

    /// Looks up the entry for `key`, failing fast on any level whose chunk
    /// bit is unset.
    pub fn find_entry(&self, hash: u64, depth: u8, key: &K) -> Option<&Entry<K, V>> {
        match self {
            NodePtr::Empty => None,
            NodePtr::ListLeaf(list) => list.find(key),
            NodePtr::Leaf1(leaf)
            | NodePtr::Leaf2(leaf)
            | NodePtr::Leaf3(leaf)
            | NodePtr::Leaf4(leaf) => leaf.find(hash, depth, key),
            NodePtr::Branch(branch) => {
                let h = chunk(hash, depth);
                if !branch.occupation.test(h) {
                    return None;
                }
                branch.child(h).find_entry(hash, depth + 1, key)
            }
        }
    }

    /// Returns an entry of `self` whose key also occurs below `other`, if
    /// any. Both pointers must sit at the same depth.
    pub fn common_entry<'a>(&'a self, other: &Self, depth: u8) -> Option<&'a Entry<K, V>> {
        match (self, other) {
            (NodePtr::Empty, _) | (_, NodePtr::Empty) => None,
            (
                NodePtr::Leaf1(a) | NodePtr::Leaf2(a) | NodePtr::Leaf3(a) | NodePtr::Leaf4(a),
                NodePtr::Leaf1(b) | NodePtr::Leaf2(b) | NodePtr::Leaf3(b) | NodePtr::Leaf4(b),
            ) => InnerLeaf::common_entry(a, b),
            (NodePtr::Branch(a), NodePtr::Branch(b)) => {
                let mut common = a.occupation & b.occupation;
                while !common.is_empty() {
                    let h = common.highest_set();
                    if let Some(found) = a.child(h).common_entry(b.child(h), depth + 1) {
                        return Some(found);
                    }
                    common.flip(h);
                }
                None
            }
            _ => {
                // One side is a leaf where the other is not; probe the leaf
                // entries against the other subtree.
                if let Some(entries) = self.leaf_entries() {
                    for e in entries {
                        if other
                            .find_entry(e.key().hash_key(), depth, e.key())
                            .is_some()
                        {
                            return Some(e);
                        }
                    }
                    None
                } else {
                    let entries = match other.leaf_entries() {
                        Some(entries) => entries,
                        None => unreachable!(),
                    };
                    for e in entries {
                        if let Some(found) = self.find_entry(e.key().hash_key(), depth, e.key()) {
                            return Some(found);
                        }
                    }
                    None
                }
            }
        }
    }
}
