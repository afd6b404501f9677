#![cfg(test)]

// Property tests for OrderedHashMap kept inside the crate so they can reach
// positions and internals without feature gates.

use crate::ordered_hash_map::{OrderedHashMap, Position};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking walks towards earlier keys and
// shorter op lists.
#[derive(Clone, Debug)]
enum OpI {
    Set(usize, i32),
    Remove(usize),
    InsertBefore(usize, i32, Option<usize>),
    InsertAfter(usize, i32, usize),
    Merge(Vec<(usize, i32)>),
    Get(usize),
    Contains(String),
    MutateAt(usize, i32),
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Set(i, v)),
            1 => idx.clone().prop_map(OpI::Remove),
            2 => (idx.clone(), any::<i32>(), proptest::option::of(idx.clone()))
                .prop_map(|(i, v, b)| OpI::InsertBefore(i, v, b)),
            2 => (idx.clone(), any::<i32>(), idx.clone())
                .prop_map(|(i, v, a)| OpI::InsertAfter(i, v, a)),
            1 => proptest::collection::vec((idx.clone(), any::<i32>()), 0..4).prop_map(OpI::Merge),
            1 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,4}"].prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::MutateAt(i, d)),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Order-aware reference model: a plain vector of pairs.
#[derive(Default)]
struct Model {
    pairs: Vec<(Key, i32)>,
}

impl Model {
    fn find(&self, k: &Key) -> Option<usize> {
        self.pairs.iter().position(|(mk, _)| mk == k)
    }

    fn set(&mut self, k: Key, v: i32) {
        match self.find(&k) {
            Some(i) => self.pairs[i].1 = v,
            None => self.pairs.push((k, v)),
        }
    }

    fn remove(&mut self, k: &Key) -> Option<i32> {
        let i = self.find(k)?;
        Some(self.pairs.remove(i).1)
    }

    fn key_after(&self, k: &Key) -> Option<Key> {
        let i = self.find(k)?;
        self.pairs.get(i + 1).map(|(k, _)| k.clone())
    }

    // Remove `k`, then place it before `right`, or at the end when `right` is
    // gone (including when it was `k`).
    fn reposition(&mut self, k: Key, v: i32, right: Option<Key>) {
        self.remove(&k);
        let at = right
            .and_then(|r| self.find(&r))
            .unwrap_or(self.pairs.len());
        self.pairs.insert(at, (k, v));
    }
}

fn run_scenario<S>(
    mut sut: OrderedHashMap<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    S: BuildHasher,
{
    let mut model = Model::default();
    let mut live: HashMap<Key, Position> = HashMap::new();

    for op in ops {
        match op {
            OpI::Set(i, v) => {
                let k = key_from(pool, i);
                let prev = sut.set(k.clone(), v);
                prop_assert_eq!(prev, model.find(&k).map(|j| model.pairs[j].1));
                model.set(k.clone(), v);
                if prev.is_none() {
                    live.insert(k.clone(), sut.position_of(&k).expect("just inserted"));
                }
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
                live.remove(&k);
            }
            OpI::InsertBefore(i, v, b) => {
                let k = key_from(pool, i);
                let anchor = b.map(|j| key_from(pool, j));
                let right = anchor.clone().filter(|a| model.find(a).is_some());
                let p = sut.insert_before(k.clone(), v, anchor.as_ref());
                model.reposition(k.clone(), v, right);
                live.insert(k, p);
            }
            OpI::InsertAfter(i, v, a) => {
                let k = key_from(pool, i);
                let anchor = key_from(pool, a);
                if model.find(&anchor).is_none() {
                    // Fatal by contract; covered by unit tests.
                    continue;
                }
                let right = model.key_after(&anchor);
                let p = sut.insert_after(k.clone(), v, &anchor);
                model.reposition(k.clone(), v, right);
                live.insert(k, p);
            }
            OpI::Merge(items) => {
                let incoming: Vec<(Key, i32)> =
                    items.iter().map(|&(j, v)| (key_from(pool, j), v)).collect();
                sut.merge(incoming.clone(), |old, new| old.wrapping_add(new));
                for (k, v) in incoming {
                    let merged = match model.find(&k) {
                        Some(j) => model.pairs[j].1.wrapping_add(v),
                        None => v,
                    };
                    model.set(k.clone(), merged);
                    if !live.contains_key(&k) {
                        live.insert(k.clone(), sut.position_of(&k).expect("merged key present"));
                    }
                }
            }
            OpI::Get(i) => {
                let k = key_from(pool, i);
                let expected = model.find(&k).map(|j| model.pairs[j].1);
                prop_assert_eq!(sut.get(&k).copied(), expected);
                prop_assert_eq!(sut.position_of(&k), live.get(&k).copied());
            }
            OpI::Contains(s) => {
                let has_model = model.pairs.iter().any(|(k, _)| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::MutateAt(i, d) => {
                let k = key_from(pool, i);
                if let Some(&p) = live.get(&k) {
                    let slot = sut.value_at_mut(p);
                    *slot = slot.wrapping_add(d);
                    let j = model.find(&k).expect("live key tracked by model");
                    model.pairs[j].1 = model.pairs[j].1.wrapping_add(d);
                }
            }
            OpI::Iterate => {
                let rev: Vec<(Key, i32)> =
                    sut.iter().rev().map(|(k, v)| (k.clone(), *v)).collect();
                let mut expected = model.pairs.clone();
                expected.reverse();
                prop_assert_eq!(rev, expected);
            }
        }

        // Post-conditions after each op
        // 1) Order and content match the model
        let got: Vec<(Key, i32)> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(&got, &model.pairs);
        // 2) Every tracked position still denotes its key
        for (k, &p) in &live {
            prop_assert_eq!(sut.get_at(p).0, k);
        }
        // 3) Size parity
        prop_assert_eq!(sut.len(), model.pairs.len());
        prop_assert_eq!(live.len(), model.pairs.len());
    }
    Ok(())
}

// Property: state-machine equivalence against an ordered Vec model.
// Invariants exercised across random operation sequences:
// - set appends new keys and updates existing ones in place.
// - insert_before/insert_after move an existing key and splice at the anchor.
// - merge combines present keys and appends absent ones in input order.
// - positions returned by inserts stay valid across unrelated edits.
// - forward and reverse iteration match the model after every op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(OrderedHashMap::new(), &pool, ops)?;
    }
}

// Constant hasher: every key collides, so lookups rely on equality alone.
// Shared with the unit tests in `ordered_hash_map`.
#[derive(Clone, Default)]
pub(crate) struct ConstBuildHasher;
pub(crate) struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: same state-machine invariants under worst-case collisions.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(OrderedHashMap::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}
