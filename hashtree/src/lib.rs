// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! # Hash tree
//!
//! An in-memory [hash array mapped trie (HAMT)] with size-classed leaf
//! buckets, used as the associative container for hash-keyed sets and maps
//! (symbol dictionaries, cut pools, nogood tables and the like).
//!
//! [hash array mapped trie (HAMT)]: https://en.wikipedia.org/wiki/Hash_array_mapped_trie
//!
//! ## Summary
//!
//! Keys are digested to 64 bits (see `pivot-hashing`) and the digest is
//! consumed six bits at a time, one chunk per tree level. A chunk indexes one
//! of 64 logical slots of a branch node, so a sufficiently randomizing digest
//! yields a fresh index at every level and eleven levels exhaust the digest.
//!
//! Branch nodes do not allocate all 64 slots. Each branch carries a 64-bit
//! occupation mask with one bit per possible chunk value and stores only the
//! children whose bit is set, packed densely in descending bit order. The
//! packed index of a child is a population count over the mask, so membership
//! of a chunk is a single bit test and the child array never holds holes.
//! Child storage is reserved in 64-byte steps, which lets neighbouring
//! population counts share an allocation size.
//!
//! Entries live in leaves. An inner leaf is a small array of entries sorted
//! by key, scanned linearly, in one of four capacities (6, 14, 22 and 30
//! entries); it also tracks which chunk values its entries occupy at its
//! depth, so most failed lookups die on one bit test. A leaf grows through
//! the capacities as entries arrive and, when the largest capacity overflows,
//! bursts into a branch over fresh leaves one level down. When every entry of
//! the bursting leaf shares the next chunk as well, the leaf is pushed down a
//! level and split there instead; if that descent exhausts the digest, the
//! entries are genuine collisions and are chained in a bucket that only key
//! comparison can tell apart.
//!
//! Erasure reverses the shape: leaves shrink back through the capacities,
//! emptied nodes disappear, and a branch whose remaining descendants fit a
//! single leaf is folded back into one. The tree therefore stays compact
//! under any insert/erase mix.
//!
//! Set intersection (`find_common`) walks two trees in lockstep, intersecting
//! occupation masks to discard non-overlapping subtrees wholesale and merging
//! sorted leaf arrays when both sides bottom out.
//!
//! A tree is a strictly single-threaded object: mutation needs exclusive
//! access, while a tree nobody mutates can be read concurrently.

#![deny(missing_docs)]

mod bitfield;
pub mod hash_bits;
mod node;
mod pointer;
mod tree;

pub use self::node::Entry;
pub use self::tree::{HashTree, HashTreeSet};
