//! OrderedHashMap: hash index layered over a `LinkedList` of keys.
//!
//! Keys live in list order inside a [`LinkedList`]; a `HashTable` maps each
//! key to its value and the list position holding the key. Entries cache
//! their hash, and key equality during probing resolves through the list
//! node the entry points at, so the table never stores a second copy of `K`.
//! Every public operation leaves the table and the list in bijection.

use crate::linked_list::{self, LinkedList, ListIndex};
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::convert::Infallible;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use core::iter::FusedIterator;
use core::mem;
use hashbrown::HashTable;
use std::collections::hash_map::RandomState;

/// Position of an entry in an [`OrderedHashMap`], or its end position.
///
/// Positions survive inserts and removals of *other* entries. Using a
/// position after its entry was removed, or with a map that did not issue
/// it, panics.
///
/// Equality (and so use as a `HashSet`/`HashMap` key) is only defined between
/// positions of one map; comparing node positions of two maps panics.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Position(ListIndex);

impl Position {
    pub fn is_end(&self) -> bool {
        self.0.is_end()
    }
}

/// Error returned when building a map from pairs that must have unique keys.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum InsertError {
    #[error("duplicate key")]
    DuplicateKey,
}

struct Entry<V> {
    hash: u64,
    value: V,
    position: ListIndex,
}

pub type Keys<'a, K> = linked_list::Iter<'a, K>;

pub struct OrderedHashMap<K, V, S = RandomState> {
    hasher: S,
    index: HashTable<Entry<V>>,
    keys: LinkedList<K>,
    reentrancy: DebugReentrancy,
}

#[inline]
fn key_matches<K, Q>(key: &K, q: &Q) -> bool
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
{
    <K as Borrow<Q>>::borrow(key) == q
}

impl<K, V> OrderedHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V, S> OrderedHashMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::with_capacity(capacity),
            keys: LinkedList::with_capacity(capacity),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in order.
    pub fn keys(&self) -> Keys<'_, K> {
        self.keys.iter()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.keys = LinkedList::new();
    }

    pub fn start_key(&self) -> Option<&K> {
        self.key_at(self.keys.start_index())
    }

    /// The end sentinel at key level; always `None`.
    pub fn end_key(&self) -> Option<&K> {
        None
    }

    fn key_at(&self, at: ListIndex) -> Option<&K> {
        if at.is_end() {
            None
        } else {
            Some(self.keys.get(at))
        }
    }

    pub fn start_index(&self) -> Position {
        Position(self.keys.start_index())
    }

    pub fn end_index(&self) -> Position {
        Position(self.keys.end_index())
    }

    pub fn index_after(&self, position: Position) -> Position {
        Position(self.keys.index_after(position.0))
    }

    pub fn index_before(&self, position: Position) -> Position {
        Position(self.keys.index_before(position.0))
    }

    /// Order two positions of this map. O(distance); see [`LinkedList::compare`].
    pub fn compare(&self, a: Position, b: Position) -> Ordering {
        self.keys.compare(a.0, b.0)
    }

    /// Key stored at `position`, or `None` at the end position.
    pub fn key_at_position(&self, position: Position) -> Option<&K> {
        self.key_at(position.0)
    }
}

impl<K, V, S> OrderedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    fn find<Q>(&self, q: &Q) -> Option<&Entry<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("find");
        let hash = self.make_hash(q);
        let keys = &self.keys;
        self.index
            .find(hash, |e| key_matches(keys.get(e.position), q))
    }

    fn find_mut<Q>(&mut self, q: &Q) -> Option<&mut Entry<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("find_mut");
        let hash = self.make_hash(q);
        let keys = &self.keys;
        self.index
            .find_mut(hash, |e| key_matches(keys.get(e.position), q))
    }

    /// Unlink the table entry for `q`; the caller must remove its list node.
    fn take_entry<Q>(&mut self, q: &Q) -> Option<Entry<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("remove");
        let hash = self.make_hash(q);
        let keys = &self.keys;
        let occupied = self
            .index
            .find_entry(hash, |e| key_matches(keys.get(e.position), q))
            .ok()?;
        Some(occupied.remove().0)
    }

    /// Unlink the table entry whose key sits at `position`.
    fn take_entry_at(&mut self, position: ListIndex) -> Entry<V> {
        let _g = self.reentrancy.enter("remove_at");
        let hash = self.make_hash(self.keys.get(position));
        match self.index.find_entry(hash, |e| e.position == position) {
            Ok(occupied) => occupied.remove().0,
            Err(_) => panic!("listed key has no index entry"),
        }
    }

    fn entry_at(&self, position: ListIndex) -> &Entry<V> {
        let _g = self.reentrancy.enter("get_at");
        let hash = self.make_hash(self.keys.get(position));
        self.index
            .find(hash, |e| e.position == position)
            .expect("listed key must have an index entry")
    }

    fn entry_at_mut(&mut self, position: ListIndex) -> &mut Entry<V> {
        let _g = self.reentrancy.enter("value_at_mut");
        let hash = self.make_hash(self.keys.get(position));
        self.index
            .find_mut(hash, |e| e.position == position)
            .expect("listed key must have an index entry")
    }

    /// Link a key that is not yet present immediately before `right`.
    fn link(&mut self, key: K, value: V, right: ListIndex) -> ListIndex {
        let _g = self.reentrancy.enter("insert");
        let hash = self.make_hash(&key);
        let position = self.keys.insert(key, right);
        let _ = self.index.insert_unique(
            hash,
            Entry {
                hash,
                value,
                position,
            },
            |e| e.hash,
        );
        position
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).map(|e| &e.value)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let entry = self.find(q)?;
        Some((self.keys.get(entry.position), &entry.value))
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find_mut(q).map(|e| &mut e.value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    pub fn position_of<Q>(&self, q: &Q) -> Option<Position>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).map(|e| Position(e.position))
    }

    /// Update the value of an existing key in place, or append a new key at
    /// the end. Returns the previous value, if any.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        if let Some(entry) = self.find_mut(&key) {
            return Some(mem::replace(&mut entry.value, value));
        }
        self.link(key, value, ListIndex::END);
        None
    }

    /// `Some(v)` behaves like [`set`](Self::set); `None` removes the key.
    pub fn assign(&mut self, key: K, value: Option<V>) -> Option<V> {
        match value {
            Some(value) => self.set(key, value),
            None => self.remove(&key),
        }
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let entry = self.take_entry(q)?;
        let key = self.keys.remove(entry.position);
        Some((key, entry.value))
    }

    /// Remove `key` if present, then place it immediately before the entry
    /// for `before`, or at the end when `before` is `None` or no longer
    /// present. Anchoring a key on itself therefore moves it to the end.
    pub fn insert_before(&mut self, key: K, value: V, before: Option<&K>) -> Position {
        let right = before
            .and_then(|anchor| self.find(anchor))
            .map_or(ListIndex::END, |e| e.position);
        Position(self.reposition(key, value, right))
    }

    /// Same as `insert_before(key, value, key_after(Some(after)))`. An existing
    /// `key` is moved; if `key` already followed `after` it becomes the anchor
    /// and so ends up last.
    ///
    /// Panics if `after` is not present.
    pub fn insert_after(&mut self, key: K, value: V, after: &K) -> Position {
        let left = match self.find(after) {
            Some(e) => e.position,
            None => panic!("no entry for the key to insert after"),
        };
        let right = self.keys.index_after(left);
        Position(self.reposition(key, value, right))
    }

    /// Remove `key` if present, then link it before `right`. When `right` was
    /// the node just removed the anchor is gone and the key goes to the end.
    fn reposition(&mut self, key: K, value: V, mut right: ListIndex) -> ListIndex {
        if let Some(old) = self.take_entry(&key) {
            if old.position == right {
                right = ListIndex::END;
            }
            self.keys.remove(old.position);
        }
        self.link(key, value, right)
    }

    pub fn key_after(&self, key: Option<&K>) -> Option<&K> {
        let at = self.list_index_of(key);
        self.key_at(self.keys.index_after(at))
    }

    pub fn key_before(&self, key: Option<&K>) -> Option<&K> {
        let at = self.list_index_of(key);
        self.key_at(self.keys.index_before(at))
    }

    fn list_index_of(&self, key: Option<&K>) -> ListIndex {
        key.and_then(|k| self.find(k))
            .map_or(ListIndex::END, |e| e.position)
    }

    /// Merge `pairs` in order. A present key gets `combine(&old, new)`, an
    /// absent key is appended. The first error from `combine` stops the
    /// merge; pairs merged before it stay applied.
    pub fn try_merge<I, F, E>(&mut self, pairs: I, mut combine: F) -> Result<(), E>
    where
        I: IntoIterator<Item = (K, V)>,
        F: FnMut(&V, V) -> Result<V, E>,
    {
        for (key, value) in pairs {
            match self.get_mut(&key) {
                Some(slot) => {
                    let merged = combine(&*slot, value)?;
                    *slot = merged;
                }
                None => {
                    self.link(key, value, ListIndex::END);
                }
            }
        }
        Ok(())
    }

    pub fn merge<I, F>(&mut self, pairs: I, mut combine: F)
    where
        I: IntoIterator<Item = (K, V)>,
        F: FnMut(&V, V) -> V,
    {
        match self.try_merge(pairs, |old, new| Ok::<V, Infallible>(combine(old, new))) {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Entry at `position`. Panics at the end position.
    pub fn get_at(&self, position: Position) -> (&K, &V) {
        let key = self.keys.get(position.0);
        (key, &self.entry_at(position.0).value)
    }

    pub fn value_at_mut(&mut self, position: Position) -> &mut V {
        &mut self.entry_at_mut(position.0).value
    }

    pub fn remove_at(&mut self, position: Position) -> (K, V) {
        let entry = self.take_entry_at(position.0);
        let key = self.keys.remove(entry.position);
        (key, entry.value)
    }

    pub fn iter(&self) -> Iter<'_, K, V, S> {
        Iter {
            map: self,
            keys: self.keys.indexed(),
        }
    }

    pub fn values(&self) -> Values<'_, K, V, S> {
        Values { inner: self.iter() }
    }
}

impl<K, V, S> OrderedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    /// Build from pairs whose keys must be unique.
    ///
    /// Panics on a duplicate key; see [`try_from_unique_pairs`](Self::try_from_unique_pairs).
    pub fn from_unique_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        match Self::try_from_unique_pairs(pairs) {
            Ok(map) => map,
            Err(e) => panic!("{e} in pairs that must have unique keys"),
        }
    }

    pub fn try_from_unique_pairs<I>(pairs: I) -> Result<Self, InsertError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Self::try_from_pairs_with(pairs, |_, _| Err(InsertError::DuplicateKey))
    }

    pub fn from_pairs_with<I, F>(pairs: I, combine: F) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        F: FnMut(&V, V) -> V,
    {
        let mut map = Self::with_hasher(S::default());
        map.merge(pairs, combine);
        map
    }

    pub fn try_from_pairs_with<I, F, E>(pairs: I, combine: F) -> Result<Self, E>
    where
        I: IntoIterator<Item = (K, V)>,
        F: FnMut(&V, V) -> Result<V, E>,
    {
        let mut map = Self::with_hasher(S::default());
        map.try_merge(pairs, combine)?;
        Ok(map)
    }
}

impl<K, V, S> OrderedHashMap<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher + Clone,
{
    pub fn map_values<T, F>(&self, mut transform: F) -> OrderedHashMap<K, T, S>
    where
        F: FnMut(&V) -> T,
    {
        match self.try_map_values(|v| Ok::<T, Infallible>(transform(v))) {
            Ok(map) => map,
            Err(never) => match never {},
        }
    }

    /// Transform every value, keeping keys and order. Stops at the first error.
    pub fn try_map_values<T, E, F>(&self, mut transform: F) -> Result<OrderedHashMap<K, T, S>, E>
    where
        F: FnMut(&V) -> Result<T, E>,
    {
        let mut out = OrderedHashMap::with_capacity_and_hasher(self.len(), self.hasher.clone());
        for (key, value) in self.iter() {
            let mapped = transform(value)?;
            out.link(key.clone(), mapped, ListIndex::END);
        }
        Ok(out)
    }
}

impl<K, V, S> OrderedHashMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Rebuild an independent map with the same entries and translate each
    /// of `positions` (end included) into it by key.
    ///
    /// Panics if a position does not belong to this map or its entry was removed.
    pub fn copy_translating(&self, positions: &[Position]) -> (Self, Vec<Position>) {
        let mut copy = Self::with_capacity_and_hasher(self.len(), self.hasher.clone());
        for (key, value) in self.iter() {
            copy.set(key.clone(), value.clone());
        }
        let translated = positions
            .iter()
            .map(|p| match self.key_at(p.0) {
                None => copy.end_index(),
                Some(key) => match copy.position_of(key) {
                    Some(position) => position,
                    None => panic!("position could not be translated into the copy"),
                },
            })
            .collect();
        log::trace!(
            "rebuilt ordered map: {} entries, {} positions translated",
            copy.len(),
            positions.len()
        );
        (copy, translated)
    }
}

impl<K, V, S> Clone for OrderedHashMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        self.copy_translating(&[]).0
    }
}

impl<K, V, S> Default for OrderedHashMap<K, V, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> PartialEq for OrderedHashMap<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K, V, S> Eq for OrderedHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> Hash for OrderedHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Hash,
    S: BuildHasher,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for (key, value) in self.iter() {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl<K, V, S> fmt::Debug for OrderedHashMap<K, V, S>
where
    K: Eq + Hash + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for OrderedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

/// Later values win; each key keeps the position of its first occurrence.
impl<K, V, S> FromIterator<(K, V)> for OrderedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<K, Q, V, S> core::ops::Index<&Q> for OrderedHashMap<K, V, S>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not present in OrderedHashMap")
    }
}

impl<'a, K, V, S> IntoIterator for &'a OrderedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, S>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> IntoIterator for OrderedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, S>;
    fn into_iter(self) -> Self::IntoIter {
        IntoIter { map: self }
    }
}

/// Iterator over `(&K, &V)` in order.
pub struct Iter<'a, K, V, S> {
    map: &'a OrderedHashMap<K, V, S>,
    keys: linked_list::Indexed<'a, K>,
}

impl<'a, K, V, S> Iterator for Iter<'a, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let map = self.map;
        self.keys
            .next()
            .map(|(position, key)| (key, &map.entry_at(position).value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl<K, V, S> DoubleEndedIterator for Iter<'_, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        let map = self.map;
        self.keys
            .next_back()
            .map(|(position, key)| (key, &map.entry_at(position).value))
    }
}

impl<K: Eq + Hash, V, S: BuildHasher> ExactSizeIterator for Iter<'_, K, V, S> {}
impl<K: Eq + Hash, V, S: BuildHasher> FusedIterator for Iter<'_, K, V, S> {}

pub struct Values<'a, K, V, S> {
    inner: Iter<'a, K, V, S>,
}

impl<'a, K, V, S> Iterator for Values<'a, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = &'a V;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Eq + Hash, V, S: BuildHasher> DoubleEndedIterator for Values<'_, K, V, S> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K: Eq + Hash, V, S: BuildHasher> ExactSizeIterator for Values<'_, K, V, S> {}

/// Owning iterator; drains entries from the front or the back.
pub struct IntoIter<K, V, S> {
    map: OrderedHashMap<K, V, S>,
}

impl<K: Eq + Hash, V, S: BuildHasher> Iterator for IntoIter<K, V, S> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.map.is_empty() {
            return None;
        }
        let front = self.map.start_index();
        Some(self.map.remove_at(front))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.map.len(), Some(self.map.len()))
    }
}

impl<K: Eq + Hash, V, S: BuildHasher> DoubleEndedIterator for IntoIter<K, V, S> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.map.is_empty() {
            return None;
        }
        let back = self.map.index_before(self.map.end_index());
        Some(self.map.remove_at(back))
    }
}

impl<K: Eq + Hash, V, S: BuildHasher> ExactSizeIterator for IntoIter<K, V, S> {}
impl<K: Eq + Hash, V, S: BuildHasher> FusedIterator for IntoIter<K, V, S> {}
