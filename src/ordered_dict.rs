//! OrderedDict: value-semantics wrapper over a shared `OrderedHashMap`.
//!
//! Cloning an `OrderedDict` only bumps a reference count. The first mutation
//! through a clone that shares its core rebuilds a private core and rewrites
//! the positions taking part in that call, so they keep denoting the same
//! entries. Reads never clone.

use crate::ordered_hash_map::{self, InsertError, Iter, Keys, OrderedHashMap, Position, Values};
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use core::mem;
use core::slice;
use std::collections::hash_map::RandomState;
use std::rc::Rc;

pub struct OrderedDict<K, V, S = RandomState> {
    core: Rc<OrderedHashMap<K, V, S>>,
}

impl<K, V> OrderedDict<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::from(OrderedHashMap::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from(OrderedHashMap::with_capacity(capacity))
    }
}

impl<K, V, S> OrderedDict<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::from(OrderedHashMap::with_hasher(hasher))
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self::from(OrderedHashMap::with_capacity_and_hasher(capacity, hasher))
    }

    /// Read-only view of the backing map.
    pub fn as_map(&self) -> &OrderedHashMap<K, V, S> {
        &self.core
    }

    /// True if `self` and `other` currently share one backing map.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    pub fn hasher(&self) -> &S {
        self.core.hasher()
    }

    pub fn len(&self) -> usize {
        self.core.len()
    }
    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    pub fn keys(&self) -> Keys<'_, K> {
        self.core.keys()
    }

    pub fn start_key(&self) -> Option<&K> {
        self.core.start_key()
    }

    pub fn end_key(&self) -> Option<&K> {
        self.core.end_key()
    }

    pub fn start_index(&self) -> Position {
        self.core.start_index()
    }

    pub fn end_index(&self) -> Position {
        self.core.end_index()
    }

    pub fn index_after(&self, position: Position) -> Position {
        self.core.index_after(position)
    }

    pub fn index_before(&self, position: Position) -> Position {
        self.core.index_before(position)
    }

    pub fn compare(&self, a: Position, b: Position) -> Ordering {
        self.core.compare(a, b)
    }

    pub fn key_at_position(&self, position: Position) -> Option<&K> {
        self.core.key_at_position(position)
    }
}

impl<K, V, S> OrderedDict<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.get(q)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.get_key_value(q)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.contains_key(q)
    }

    pub fn position_of<Q>(&self, q: &Q) -> Option<Position>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.position_of(q)
    }

    pub fn key_after(&self, key: Option<&K>) -> Option<&K> {
        self.core.key_after(key)
    }

    pub fn key_before(&self, key: Option<&K>) -> Option<&K> {
        self.core.key_before(key)
    }

    pub fn get_at(&self, position: Position) -> (&K, &V) {
        self.core.get_at(position)
    }

    pub fn iter(&self) -> Iter<'_, K, V, S> {
        self.core.iter()
    }

    pub fn values(&self) -> Values<'_, K, V, S> {
        self.core.values()
    }
}

impl<K, V, S> OrderedDict<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    /// Panics on a duplicate key.
    pub fn from_unique_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Self::from(OrderedHashMap::from_unique_pairs(pairs))
    }

    pub fn try_from_unique_pairs<I>(pairs: I) -> Result<Self, InsertError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        OrderedHashMap::try_from_unique_pairs(pairs).map(Self::from)
    }

    pub fn from_pairs_with<I, F>(pairs: I, combine: F) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        F: FnMut(&V, V) -> V,
    {
        Self::from(OrderedHashMap::from_pairs_with(pairs, combine))
    }

    pub fn try_from_pairs_with<I, F, E>(pairs: I, combine: F) -> Result<Self, E>
    where
        I: IntoIterator<Item = (K, V)>,
        F: FnMut(&V, V) -> Result<V, E>,
    {
        OrderedHashMap::try_from_pairs_with(pairs, combine).map(Self::from)
    }
}

impl<K, V, S> OrderedDict<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Exclusive access to the backing map, cloning it first if it is shared.
    ///
    /// `positions` are rewritten in place to denote the same entries in the
    /// map that is returned.
    pub fn make_unique(&mut self, positions: &mut [Position]) -> &mut OrderedHashMap<K, V, S> {
        if Rc::get_mut(&mut self.core).is_none() {
            let (copy, translated) = self.core.copy_translating(positions);
            positions.copy_from_slice(&translated);
            log::trace!(
                "copy-on-write: cloned shared ordered map ({} entries, {} positions remapped)",
                copy.len(),
                positions.len()
            );
            self.core = Rc::new(copy);
        }
        Rc::get_mut(&mut self.core).expect("core is uniquely owned after copy-on-write")
    }

    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        self.make_unique(&mut []).set(key, value)
    }

    /// `Some(v)` sets, `None` deletes.
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
        if !self.core.contains_key(q) {
            return None;
        }
        self.make_unique(&mut []).remove_entry(q)
    }

    pub fn insert_before(&mut self, key: K, value: V, before: Option<&K>) -> Position {
        self.make_unique(&mut []).insert_before(key, value, before)
    }

    /// Panics if `after` is not present.
    pub fn insert_after(&mut self, key: K, value: V, after: &K) -> Position {
        self.make_unique(&mut []).insert_after(key, value, after)
    }

    pub fn merge<I, F>(&mut self, pairs: I, combine: F)
    where
        I: IntoIterator<Item = (K, V)>,
        F: FnMut(&V, V) -> V,
    {
        self.make_unique(&mut []).merge(pairs, combine)
    }

    pub fn try_merge<I, F, E>(&mut self, pairs: I, combine: F) -> Result<(), E>
    where
        I: IntoIterator<Item = (K, V)>,
        F: FnMut(&V, V) -> Result<V, E>,
    {
        self.make_unique(&mut []).try_merge(pairs, combine)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if !self.core.contains_key(q) {
            return None;
        }
        self.make_unique(&mut []).get_mut(q)
    }

    /// Mutable access through a position. The position is remapped if the
    /// backing map had to be cloned.
    pub fn value_at_mut(&mut self, position: &mut Position) -> &mut V {
        let core = self.make_unique(slice::from_mut(position));
        core.value_at_mut(*position)
    }

    pub fn set_value_at(&mut self, position: &mut Position, value: V) -> V {
        mem::replace(self.value_at_mut(position), value)
    }

    pub fn remove_at(&mut self, position: Position) -> (K, V) {
        let mut at = [position];
        self.make_unique(&mut at).remove_at(at[0])
    }

    pub fn clear(&mut self) {
        match Rc::get_mut(&mut self.core) {
            Some(core) => core.clear(),
            None => {
                let hasher = self.core.hasher().clone();
                self.core = Rc::new(OrderedHashMap::with_hasher(hasher));
            }
        }
    }

    /// Unwrap the backing map, cloning it if it is still shared.
    pub fn into_core(self) -> OrderedHashMap<K, V, S> {
        Rc::try_unwrap(self.core).unwrap_or_else(|shared| (*shared).clone())
    }
}

impl<K, V, S> OrderedDict<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher + Clone,
{
    pub fn map_values<T, F>(&self, transform: F) -> OrderedDict<K, T, S>
    where
        F: FnMut(&V) -> T,
    {
        OrderedDict::from(self.core.map_values(transform))
    }

    pub fn try_map_values<T, E, F>(&self, transform: F) -> Result<OrderedDict<K, T, S>, E>
    where
        F: FnMut(&V) -> Result<T, E>,
    {
        self.core.try_map_values(transform).map(OrderedDict::from)
    }
}

impl<K, V, S> Clone for OrderedDict<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<K, V, S> From<OrderedHashMap<K, V, S>> for OrderedDict<K, V, S> {
    fn from(core: OrderedHashMap<K, V, S>) -> Self {
        Self {
            core: Rc::new(core),
        }
    }
}

impl<K, V, S> Default for OrderedDict<K, V, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::from(OrderedHashMap::default())
    }
}

impl<K, V, S> PartialEq for OrderedDict<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        *self.core == *other.core
    }
}

impl<K, V, S> Eq for OrderedDict<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> Hash for OrderedDict<K, V, S>
where
    K: Eq + Hash,
    V: Hash,
    S: BuildHasher,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.core.hash(state)
    }
}

impl<K, V, S> fmt::Debug for OrderedDict<K, V, S>
where
    K: Eq + Hash + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.core, f)
    }
}

impl<K, V, S> FromIterator<(K, V)> for OrderedDict<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from(OrderedHashMap::from_iter(iter))
    }
}

impl<K, V, S> Extend<(K, V)> for OrderedDict<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.make_unique(&mut []).extend(iter)
    }
}

impl<K, Q, V, S> core::ops::Index<&Q> for OrderedDict<K, V, S>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        &self.core[key]
    }
}

impl<'a, K, V, S> IntoIterator for &'a OrderedDict<K, V, S>
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

impl<K, V, S> IntoIterator for OrderedDict<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    type Item = (K, V);
    type IntoIter = ordered_hash_map::IntoIter<K, V, S>;
    fn into_iter(self) -> Self::IntoIter {
        self.into_core().into_iter()
    }
}
