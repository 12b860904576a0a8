#![cfg(test)]

// Property tests for HashTable kept inside the crate so they can check the
// internal bucket invariants after every step.

use crate::error::ContainerError;
use crate::hash_table::HashTable;
use hashbrown::HashMap;
use proptest::prelude::*;
use std::collections::BTreeSet;
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

// Pool-indexed operations so shrinking moves towards earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Put(usize, i32),
    Get(usize),
    Remove(usize),
    Contains(String),
    ContainsValue(i32),
    Mutate(usize, i32),
    Iterate,
    CursorSweep(i32),
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => (idx.clone(), -50i32..50).prop_map(|(i, v)| Op::Put(i, v)),
            2 => idx.clone().prop_map(Op::Get),
            3 => idx.clone().prop_map(Op::Remove),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(Op::Contains),
            1 => (-50i32..50).prop_map(Op::ContainsValue),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => Just(Op::Iterate),
            1 => (-50i32..50).prop_map(Op::CursorSweep),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_scenario<S: BuildHasher>(
    mut sut: HashTable<Key, i32, S>,
    pool: Vec<String>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();

    for op in ops {
        match op {
            Op::Put(i, v) => {
                let k = key_from(&pool, i);
                let buckets_before = sut.bucket_count();
                let existed = model.contains_key(&k);
                let prev = sut.insert(k.clone(), v);
                prop_assert_eq!(prev, model.insert(k, v));
                if existed {
                    // Updates never resize.
                    prop_assert_eq!(sut.bucket_count(), buckets_before);
                }
            }
            Op::Get(i) => {
                let k = key_from(&pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
                prop_assert_eq!(sut.contains_key(&k), model.contains_key(&k));
            }
            Op::Remove(i) => {
                let k = key_from(&pool, i);
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
            }
            Op::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            Op::ContainsValue(v) => {
                let has_model = model.values().any(|mv| *mv == v);
                prop_assert_eq!(sut.contains_value(&v), has_model);
            }
            Op::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.saturating_add(d);
                    let mv = model.get_mut(&k).expect("model has key present in table");
                    *mv = mv.saturating_add(d);
                } else {
                    prop_assert!(!model.contains_key(&k));
                }
            }
            Op::Iterate => {
                let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                prop_assert_eq!(sut.iter().count(), model.len());
            }
            // Remove every entry whose value is below `limit` through a cursor.
            Op::CursorSweep(limit) => {
                let mut cursor = sut.entries_cursor();
                let mut visited = 0usize;
                let expected_visits = sut.len();
                loop {
                    let below = match cursor.next(&sut) {
                        Ok(Some((_, v))) => *v < limit,
                        Ok(None) => break,
                        Err(e) => return Err(TestCaseError::fail(format!("cursor failed: {}", e))),
                    };
                    visited += 1;
                    if below {
                        let (k, _) = cursor
                            .remove(&mut sut)
                            .map_err(|e| TestCaseError::fail(e.to_string()))?;
                        model.remove(&k);
                    }
                }
                prop_assert_eq!(visited, expected_visits);
                prop_assert!(model.values().all(|v| *v >= limit));
            }
            Op::Clear => {
                let buckets = sut.bucket_count();
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.bucket_count(), buckets);
            }
        }

        sut.check_invariants();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }

    for (k, v) in model.iter() {
        prop_assert_eq!(sut.get(k), Some(v));
    }
    Ok(())
}

// Property: state-machine equivalence against hashbrown's HashMap.
// - `insert` returns the previous value exactly when the model does.
// - `get`/`contains_key`/`contains_value` agree with the model.
// - Cursor sweeps visit every entry once and remove exactly what they yield.
// - Bucket invariants and `len` parity hold after every step.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(
        (pool, ops) in arb_scenario(),
        buckets in 1usize..8,
        lf in 0.25f64..=1.0,
    ) {
        let sut = HashTable::with_capacity_and_load_factor(buckets, lf).unwrap();
        run_scenario(sut, pool, ops)?;
    }
}

// Collision variant using a constant hasher: every key shares one chain.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
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

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut =
            HashTable::with_capacity_load_factor_and_hasher(2, 0.75, ConstBuildHasher).unwrap();
        run_scenario(sut, pool, ops)?;
    }
}

// Property: any structural change between two cursor steps is reported,
// and a pure value update never is.
proptest! {
    #[test]
    fn prop_cursor_detects_structural_change(
        n in 1u32..40,
        steps in 0usize..40,
        update_only in any::<bool>(),
    ) {
        let mut t: HashTable<u32, u32> = (0..n).map(|i| (i, i)).collect();
        let mut cursor = t.entries_cursor();
        for _ in 0..steps.min(n as usize) {
            prop_assert!(cursor.next(&t).unwrap().is_some());
        }
        if update_only {
            t.insert(0, 1000);
            prop_assert!(cursor.next(&t).is_ok());
        } else {
            t.insert(n, n);
            prop_assert_eq!(cursor.next(&t), Err(ContainerError::ConcurrentModification));
        }
    }
}

// Keys with distinct hashes still agree with a model after many doublings.
#[test]
fn many_keys_survive_repeated_growth() {
    let mut t: HashTable<Key, i32> = HashTable::with_capacity(1).unwrap();
    let mut model: HashMap<Key, i32> = HashMap::new();
    for i in 0..2000 {
        let k = Key(format!("key-{}", i));
        t.insert(k.clone(), i);
        model.insert(k, i);
    }
    t.check_invariants();
    for (k, v) in &model {
        assert_eq!(t.get(k), Some(v));
    }
    assert_eq!(t.len(), model.len());
}
