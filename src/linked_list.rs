//! LinkedList: arena-backed doubly linked list with stable, generational indices.
//!
//! Nodes live in a `SlotMap`; an index is the node's generational slot key
//! tagged with the identity of the list that issued it. The end position is a
//! universal sentinel carrying no node. Removing a node bumps its slot
//! generation, so an index to it can never alias a later node.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use slotmap::{DefaultKey, SlotMap};

/// Process-unique identity of one list instance.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
struct ListId(u64);

impl ListId {
    fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ListId(NEXT.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
struct NodeRef {
    list: ListId,
    key: DefaultKey,
}

/// Position in a [`LinkedList`]: either a node or the end sentinel.
///
/// Indices are only meaningful for the list that issued them. Comparing two
/// node indices from different lists panics; the end sentinel equals every
/// other end sentinel.
#[derive(Copy, Clone, Debug)]
pub struct ListIndex {
    node: Option<NodeRef>,
}

impl ListIndex {
    /// The "one past the last element" position of every list.
    pub const END: ListIndex = ListIndex { node: None };

    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }
}

impl PartialEq for ListIndex {
    fn eq(&self, other: &Self) -> bool {
        match (self.node, other.node) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                assert!(a.list == b.list, "uncomparable index pair");
                a.key == b.key
            }
            _ => false,
        }
    }
}

impl Eq for ListIndex {}

impl Hash for ListIndex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.hash(state);
    }
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

pub struct LinkedList<T> {
    id: ListId,
    nodes: SlotMap<DefaultKey, Node<T>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl<T> LinkedList<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id: ListId::fresh(),
            nodes: SlotMap::with_capacity_and_key(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn start_index(&self) -> ListIndex {
        self.index_for(self.head)
    }

    pub fn end_index(&self) -> ListIndex {
        ListIndex::END
    }

    fn index_for(&self, key: Option<DefaultKey>) -> ListIndex {
        ListIndex {
            node: key.map(|key| NodeRef { list: self.id, key }),
        }
    }

    /// Validate `index` against this list and return its slot key, or `None`
    /// for the end sentinel.
    fn slot_of(&self, index: ListIndex) -> Option<DefaultKey> {
        let node = index.node?;
        assert!(node.list == self.id, "index for other LinkedList");
        assert!(
            self.nodes.contains_key(node.key),
            "index refers to a removed node"
        );
        Some(node.key)
    }

    fn node(&self, key: DefaultKey) -> &Node<T> {
        self.nodes
            .get(key)
            .expect("linked node must be live while reachable from the list")
    }

    fn node_mut(&mut self, key: DefaultKey) -> &mut Node<T> {
        self.nodes
            .get_mut(key)
            .expect("linked node must be live while reachable from the list")
    }

    pub fn get(&self, index: ListIndex) -> &T {
        match self.slot_of(index) {
            Some(key) => &self.node(key).value,
            None => panic!("index out of range: end index has no element"),
        }
    }

    pub fn get_mut(&mut self, index: ListIndex) -> &mut T {
        match self.slot_of(index) {
            Some(key) => &mut self.node_mut(key).value,
            None => panic!("index out of range: end index has no element"),
        }
    }

    pub fn index_after(&self, index: ListIndex) -> ListIndex {
        match self.slot_of(index) {
            Some(key) => self.index_for(self.node(key).next),
            None => panic!("can't advance past end index"),
        }
    }

    pub fn index_before(&self, index: ListIndex) -> ListIndex {
        let prev = match self.slot_of(index) {
            Some(key) => self.node(key).prev,
            None => self.tail,
        };
        match prev {
            Some(_) => self.index_for(prev),
            None => panic!("can't advance before start index"),
        }
    }

    pub fn push_back(&mut self, value: T) -> ListIndex {
        self.insert(value, ListIndex::END)
    }

    /// Insert `value` immediately before `at`; inserting before the end index
    /// appends. Returns the index of the new node.
    pub fn insert(&mut self, value: T, at: ListIndex) -> ListIndex {
        let right = self.slot_of(at);
        let left = match right {
            Some(r) => self.node(r).prev,
            None => self.tail,
        };
        let key = self.nodes.insert(Node {
            value,
            prev: left,
            next: right,
        });
        match left {
            Some(l) => self.node_mut(l).next = Some(key),
            None => self.head = Some(key),
        }
        match right {
            Some(r) => self.node_mut(r).prev = Some(key),
            None => self.tail = Some(key),
        }
        self.index_for(Some(key))
    }

    /// Unlink the node at `at` and return its value. The index (and every copy
    /// of it) is permanently invalid afterwards.
    pub fn remove(&mut self, at: ListIndex) -> T {
        let Some(key) = self.slot_of(at) else {
            panic!("can't remove at end index");
        };
        let node = self
            .nodes
            .remove(key)
            .expect("validated node must be removable");
        match node.prev {
            Some(l) => self.node_mut(l).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(r) => self.node_mut(r).prev = node.prev,
            None => self.tail = node.prev,
        }
        node.value
    }

    /// Order two indices of this list by scanning forward from `a`.
    ///
    /// Runs in O(distance between the two nodes); a linked list has no
    /// cheaper way to answer ordered-position queries.
    pub fn compare(&self, a: ListIndex, b: ListIndex) -> Ordering {
        let a_key = self.slot_of(a);
        let b_key = self.slot_of(b);
        if a_key == b_key {
            return Ordering::Equal;
        }
        let Some(mut cur) = a_key else {
            // `a` is end and `b` is a node.
            return Ordering::Greater;
        };
        loop {
            let next = self.node(cur).next;
            if next == b_key {
                return Ordering::Less;
            }
            match next {
                Some(n) => cur = n,
                None => return Ordering::Greater,
            }
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.indexed(),
        }
    }

    /// Iterate `(index, value)` pairs in list order.
    pub fn indexed(&self) -> Indexed<'_, T> {
        Indexed {
            list: self,
            front: self.head,
            back: self.tail,
            remaining: self.len(),
        }
    }
}

impl<T: Clone> LinkedList<T> {
    /// Produce an independent list holding the same sequence and translate
    /// each of `indices` (end sentinels included) into the new list.
    ///
    /// Panics if any index does not belong to this list or refers to a
    /// removed node.
    pub fn copy_translating(&self, indices: &[ListIndex]) -> (Self, Vec<ListIndex>) {
        let wanted: Vec<Option<DefaultKey>> = indices.iter().map(|&i| self.slot_of(i)).collect();
        let mut translated: Vec<Option<ListIndex>> = wanted
            .iter()
            .map(|w| w.is_none().then_some(ListIndex::END))
            .collect();

        let mut copy = LinkedList::with_capacity(self.len());
        let mut cur = self.head;
        while let Some(key) = cur {
            let node = self.node(key);
            let new_index = copy.push_back(node.value.clone());
            for (slot, w) in translated.iter_mut().zip(&wanted) {
                if *w == Some(key) {
                    *slot = Some(new_index);
                }
            }
            cur = node.next;
        }

        let translated = translated
            .into_iter()
            .map(|t| match t {
                Some(index) => index,
                None => panic!("invalid indices passed to copy_translating"),
            })
            .collect();
        (copy, translated)
    }
}

impl<T> Default for LinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for LinkedList<T> {
    fn clone(&self) -> Self {
        self.copy_translating(&[]).0
    }
}

impl<T: fmt::Debug> fmt::Debug for LinkedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> FromIterator<T> for LinkedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = LinkedList::new();
        for value in iter {
            list.push_back(value);
        }
        list
    }
}

impl<'a, T> IntoIterator for &'a LinkedList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over `(ListIndex, &T)` in list order.
pub struct Indexed<'a, T> {
    list: &'a LinkedList<T>,
    front: Option<DefaultKey>,
    back: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, T> Iterator for Indexed<'a, T> {
    type Item = (ListIndex, &'a T);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let key = self.front?;
        let node = self.list.node(key);
        self.front = node.next;
        self.remaining -= 1;
        Some((self.list.index_for(Some(key)), &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Indexed<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let key = self.back?;
        let node = self.list.node(key);
        self.back = node.prev;
        self.remaining -= 1;
        Some((self.list.index_for(Some(key)), &node.value))
    }
}

impl<T> ExactSizeIterator for Indexed<'_, T> {}
impl<T> FusedIterator for Indexed<'_, T> {}

/// Iterator over list values in order.
pub struct Iter<'a, T> {
    inner: Indexed<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::rc::Rc;

    fn assert_list(list: &LinkedList<i32>, expected: &[i32]) {
        let forward: Vec<i32> = list.iter().copied().collect();
        assert_eq!(forward, expected);
        let backward: Vec<i32> = list.iter().rev().copied().collect();
        let mut reversed = expected.to_vec();
        reversed.reverse();
        assert_eq!(backward, reversed);
        assert_eq!(list.len(), expected.len());
    }

    /// Invariant: `push_back` appends in order; forward and backward traversal agree.
    #[test]
    fn append_keeps_order() {
        let mut l = LinkedList::new();
        assert_list(&l, &[]);
        l.push_back(1);
        assert_list(&l, &[1]);
        l.push_back(2);
        l.push_back(3);
        assert_list(&l, &[1, 2, 3]);
    }

    /// Invariant: inserting at start makes a new head, at end a new tail, and
    /// elsewhere splices immediately before the given index.
    #[test]
    fn insert_at_positions() {
        let mut l = LinkedList::new();
        l.insert(1, l.start_index());
        assert_list(&l, &[1]);
        l.insert(2, l.start_index());
        assert_list(&l, &[2, 1]);
        l.insert(3, l.index_after(l.start_index()));
        assert_list(&l, &[2, 3, 1]);
        l.insert(4, l.end_index());
        assert_list(&l, &[2, 3, 1, 4]);
        l.insert(5, l.index_before(l.end_index()));
        assert_list(&l, &[2, 3, 1, 5, 4]);
        let third = l.index_after(l.index_after(l.start_index()));
        l.insert(6, third);
        assert_list(&l, &[2, 3, 6, 1, 5, 4]);
    }

    /// Invariant: removal reconnects neighbours and updates head/tail.
    #[test]
    fn remove_relinks_neighbours() {
        let mut l: LinkedList<i32> = [1, 2, 3, 4].into_iter().collect();
        assert_eq!(l.remove(l.start_index()), 1);
        assert_list(&l, &[2, 3, 4]);
        assert_eq!(l.remove(l.index_after(l.start_index())), 3);
        assert_list(&l, &[2, 4]);
        assert_eq!(l.remove(l.index_before(l.end_index())), 4);
        assert_list(&l, &[2]);
        assert_eq!(l.remove(l.start_index()), 2);
        assert_list(&l, &[]);
        assert!(l.start_index().is_end());
        l.push_back(5);
        assert_list(&l, &[5]);
    }

    /// Invariant: values can be replaced in place through an index.
    #[test]
    fn get_mut_replaces_in_place() {
        let mut l: LinkedList<i32> = [1, 2, 3, 4].into_iter().collect();
        *l.get_mut(l.start_index()) = 5;
        let second = l.index_after(l.start_index());
        *l.get_mut(second) = 6;
        let last = l.index_before(l.end_index());
        *l.get_mut(last) = 7;
        assert_list(&l, &[5, 6, 3, 7]);
    }

    /// Invariant: an index stays valid and keeps denoting its node while other
    /// nodes are inserted and removed around it.
    #[test]
    fn index_stable_under_unrelated_edits() {
        let mut l: LinkedList<i32> = [1, 2, 3].into_iter().collect();
        let two = l.index_after(l.start_index());
        l.push_back(4);
        l.insert(0, l.start_index());
        let three = l.index_after(two);
        l.remove(three);
        assert_eq!(*l.get(two), 2);
        assert_list(&l, &[0, 1, 2, 4]);
    }

    /// Invariant: ordering follows list order; end sorts after every node.
    #[test]
    fn compare_scans_forward() {
        let l: LinkedList<i32> = [1, 2, 3].into_iter().collect();
        let a = l.start_index();
        let b = l.index_after(a);
        let c = l.index_after(b);
        let end = l.end_index();
        assert_eq!(l.compare(a, c), Ordering::Less);
        assert_eq!(l.compare(c, a), Ordering::Greater);
        assert_eq!(l.compare(b, b), Ordering::Equal);
        assert_eq!(l.compare(c, end), Ordering::Less);
        assert_eq!(l.compare(end, a), Ordering::Greater);
        assert_eq!(l.compare(end, end), Ordering::Equal);
    }

    /// Invariant: end sentinels from different lists are equal.
    #[test]
    fn end_indices_compare_across_lists() {
        let a: LinkedList<i32> = LinkedList::new();
        let b: LinkedList<i32> = [1].into_iter().collect();
        assert_eq!(a.end_index(), b.end_index());
        assert_ne!(b.start_index(), b.end_index());
    }

    /// Invariant: comparing node indices from two lists is a programming error.
    #[test]
    #[should_panic(expected = "uncomparable index pair")]
    fn equality_across_lists_panics() {
        let a: LinkedList<i32> = [1].into_iter().collect();
        let b: LinkedList<i32> = [1].into_iter().collect();
        let _ = a.start_index() == b.start_index();
    }

    /// Invariant: using an index with a list that did not issue it panics.
    #[test]
    #[should_panic(expected = "index for other LinkedList")]
    fn foreign_index_panics() {
        let a: LinkedList<i32> = [1].into_iter().collect();
        let b: LinkedList<i32> = [1].into_iter().collect();
        let _ = b.get(a.start_index());
    }

    /// Invariant: an index to a removed node never resolves, even when the
    /// slot is reused by a later insert.
    #[test]
    fn removed_index_panics_instead_of_aliasing() {
        let mut l: LinkedList<i32> = [1, 2].into_iter().collect();
        let first = l.start_index();
        l.remove(first);
        let fresh = l.push_back(3);
        assert_ne!(first, fresh);
        let res = catch_unwind(AssertUnwindSafe(|| {
            let _ = l.get(first);
        }));
        assert!(res.is_err(), "stale index must not read a value");
    }

    /// Invariant: traversal past either end and removal at end are fatal.
    #[test]
    fn boundary_violations_panic() {
        let mut l: LinkedList<i32> = [1].into_iter().collect();
        let end = l.end_index();
        let start = l.start_index();
        assert!(catch_unwind(AssertUnwindSafe(|| l.index_after(end))).is_err());
        assert!(catch_unwind(AssertUnwindSafe(|| l.index_before(start))).is_err());
        assert!(catch_unwind(AssertUnwindSafe(|| l.remove(end))).is_err());
        assert!(catch_unwind(AssertUnwindSafe(|| {
            let _ = l.get(end);
        }))
        .is_err());
    }

    /// Invariant: `copy_translating` maps every index (end included) onto the
    /// node holding the same element in an independent list.
    #[test]
    fn copy_translates_indices() {
        let mut l: LinkedList<i32> = [10, 20, 30].into_iter().collect();
        let mid = l.index_after(l.start_index());
        let (mut copy, translated) = l.copy_translating(&[mid, l.end_index(), l.start_index()]);
        assert_eq!(*copy.get(translated[0]), 20);
        assert!(translated[1].is_end());
        assert_eq!(*copy.get(translated[2]), 10);

        copy.remove(translated[0]);
        assert_eq!(l.iter().copied().collect::<Vec<_>>(), [10, 20, 30]);
        assert_eq!(copy.iter().copied().collect::<Vec<_>>(), [10, 30]);
        l.push_back(40);
        assert_eq!(copy.len(), 2);
    }

    /// Invariant: a cloned list issues its own indices.
    #[test]
    fn clone_has_fresh_identity() {
        let l: LinkedList<i32> = [1, 2].into_iter().collect();
        let c = l.clone();
        let res = catch_unwind(AssertUnwindSafe(|| {
            let _ = c.get(l.start_index());
        }));
        assert!(res.is_err());
        assert_eq!(c.iter().copied().collect::<Vec<_>>(), [1, 2]);
    }

    /// Invariant: dropping the list drops every element exactly once.
    #[test]
    fn drop_releases_elements() {
        struct Tracked(Rc<Cell<usize>>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }
        let drops = Rc::new(Cell::new(0));
        {
            let mut l = LinkedList::new();
            l.push_back(Tracked(drops.clone()));
            l.push_back(Tracked(drops.clone()));
            let first = l.start_index();
            drop(l.remove(first));
            assert_eq!(drops.get(), 1);
        }
        assert_eq!(drops.get(), 2);
    }

    /// Invariant: mixed forward/backward iteration yields each element once.
    #[test]
    fn double_ended_iteration_meets_in_middle() {
        let l: LinkedList<i32> = [1, 2, 3, 4].into_iter().collect();
        let mut it = l.iter();
        assert_eq!(it.len(), 4);
        assert_eq!(it.next(), Some(&1));
        assert_eq!(it.next_back(), Some(&4));
        assert_eq!(it.next(), Some(&2));
        assert_eq!(it.next_back(), Some(&3));
        assert_eq!(it.next(), None);
        assert_eq!(it.next_back(), None);
    }
}
