//! ordered-dict: a single-threaded ordered map with value semantics and
//! stable position handles.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a map that keeps an explicit, caller-editable order, is cheap to
//!   copy, and hands out positions that stay valid across unrelated edits.
//! - Layers:
//!   - LinkedList<T>: arena-backed doubly linked list. Nodes live in a
//!     slotmap; a `ListIndex` is a generational slot key tagged with the
//!     identity of the list that issued it, or the universal end sentinel.
//!   - OrderedHashMap<K, V, S>: hash index over a `LinkedList<K>`. The
//!     table stores `(hash, value, position)`; the list stores keys in
//!     order. Both are updated together by every operation.
//!   - OrderedDict<K, V, S>: `Rc`-shared `OrderedHashMap` with
//!     copy-on-write. Mutators on a shared map rebuild a private copy and
//!     remap the positions taking part in the call.
//!
//! Constraints
//! - Single-threaded: `OrderedDict` is `!Send`/`!Sync` (it holds an `Rc`).
//! - O(1) average lookup, insert, remove and reposition by key.
//! - Positions never alias: a removed node's slot key is never reissued,
//!   and a position from another map is rejected.
//!
//! Failure model
//! - Programming errors panic: dereferencing the end position, using a
//!   removed position, mixing positions of two maps, comparing node
//!   positions of two lists, inserting after a missing key, and building
//!   from "unique" pairs that repeat a key.
//! - Errors from caller closures (`try_merge`, `try_from_pairs_with`,
//!   `try_map_values`) are returned unchanged. Pairs merged before the
//!   failure stay applied.
//!
//! Complexity
//! - `compare` scans forward from one position to the other, so it is
//!   O(distance). Copy-on-write clones, equality and hashing are O(n).
//!
//! Hasher and rehashing invariants
//! - Each entry stores its precomputed `u64` hash and rehashing always uses
//!   it; `K: Hash` only runs when a key is looked up or first inserted.
//! - Probing calls `K: Eq`. In debug builds, reentering the same map from
//!   `K: Eq`/`K: Hash` panics.
//!
//! Serialization
//! - With the `serde` feature both map types encode as a map in iteration
//!   order and decode by appending in encoded order.

pub mod linked_list;
mod ordered_dict;
pub mod ordered_hash_map;
mod ordered_hash_map_proptest;
mod reentrancy;
#[cfg(feature = "serde")]
mod serde_impls;

// Public surface
pub use linked_list::{LinkedList, ListIndex};
pub use ordered_dict::OrderedDict;
pub use ordered_hash_map::{InsertError, OrderedHashMap, Position};
