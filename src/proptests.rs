use crate::{ArrayIntMap, DenseDualKeyMap, DualKeyMap, DualKeySet, Error, RadixTrie};

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{BTreeMap, HashMap, HashSet};

// =============================================================================
// Radix trie and array map against BTreeMap
// =============================================================================

#[derive(Clone, Debug)]
enum IntOp {
    Insert(i32, u64),
    Remove(i32),
    Get(i32),
}

fn int_key_strategy() -> impl Strategy<Value = i32> + Clone {
    // Mix clustered keys, which share long prefixes, with keys from the whole domain.
    prop_oneof![
        3 => -64i32..64,
        1 => any::<i32>(),
        1 => prop::sample::select(vec![i32::MIN, -1, 0, 31, 32, 1023, 1024, i32::MAX]),
    ]
}

fn int_ops_strategy(key: impl Strategy<Value = i32> + Clone) -> impl Strategy<Value = Vec<IntOp>> {
    let op = prop_oneof![
        50 => (key.clone(), any::<u64>()).prop_map(|(k, v)| IntOp::Insert(k, v)),
        30 => key.clone().prop_map(IntOp::Remove),
        20 => key.prop_map(IntOp::Get),
    ];
    prop::collection::vec(op, 0..=1000)
}

// =============================================================================
// Dual-key containers against HashMap / HashSet
// =============================================================================

#[derive(Clone, Debug, Arbitrary)]
enum MapOp {
    #[proptest(weight = 5)]
    Insert(
        #[proptest(strategy = "0u8..12")] u8,
        #[proptest(strategy = "0u8..24")] u8,
        u32,
    ),
    #[proptest(weight = 3)]
    Remove(
        #[proptest(strategy = "0u8..12")] u8,
        #[proptest(strategy = "0u8..24")] u8,
    ),
    #[proptest(weight = 2)]
    Merge(
        #[proptest(strategy = "0u8..12")] u8,
        #[proptest(strategy = "0u8..24")] u8,
        #[proptest(strategy = "0u32..4")] u32,
    ),
    Get(
        #[proptest(strategy = "0u8..12")] u8,
        #[proptest(strategy = "0u8..24")] u8,
    ),
    Clear,
}

#[derive(Clone, Debug, Arbitrary)]
enum SetOp {
    #[proptest(weight = 3)]
    Insert(
        #[proptest(strategy = "0u8..8")] u8,
        #[proptest(strategy = "0u16..160")] u16,
    ),
    #[proptest(weight = 2)]
    Remove(
        #[proptest(strategy = "0u8..8")] u8,
        #[proptest(strategy = "0u16..160")] u16,
    ),
    Contains(
        #[proptest(strategy = "0u8..8")] u8,
        #[proptest(strategy = "0u16..160")] u16,
    ),
}

/// Merge that drops the entry when the incoming value is zero.
fn merge_or_drop(old: &u32, new: u32) -> Option<u32> {
    (new != 0).then(|| old.wrapping_add(new))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_trie_equivalence(ops in int_ops_strategy(int_key_strategy())) {
        let mut t: RadixTrie<u64> = RadixTrie::new();
        let mut m: BTreeMap<i32, u64> = BTreeMap::new();

        for op in ops {
            match op {
                IntOp::Insert(key, value) => {
                    prop_assert_eq!(t.insert(key, value), m.insert(key, value));
                }
                IntOp::Remove(key) => {
                    prop_assert_eq!(t.remove(key), m.remove(&key));
                }
                IntOp::Get(key) => {
                    prop_assert_eq!(t.get(key), m.get(&key));
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        t.validate();
        let got: Vec<(i32, u64)> = t.iter().map(|(k, v)| (k, *v)).collect();
        let expected: Vec<(i32, u64)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got, expected);
        prop_assert_eq!(t.first_key_value().map(|(k, _)| k), m.keys().next().copied());
        prop_assert_eq!(t.last_key_value().map(|(k, _)| k), m.keys().next_back().copied());
    }

    #[test]
    fn prop_array_map_equivalence(ops in int_ops_strategy(-8i32..300)) {
        let mut a: ArrayIntMap<u64> = ArrayIntMap::new();
        let mut m: BTreeMap<i32, u64> = BTreeMap::new();

        for op in ops {
            match op {
                IntOp::Insert(key, value) => {
                    if key < 0 {
                        prop_assert_eq!(a.insert(key, value), Err(Error::NegativeKey(key)));
                    } else {
                        prop_assert_eq!(a.insert(key, value), Ok(m.insert(key, value)));
                    }
                }
                IntOp::Remove(key) => {
                    prop_assert_eq!(a.remove(key), m.remove(&key));
                }
                IntOp::Get(key) => {
                    prop_assert_eq!(a.get(key), m.get(&key));
                }
            }
            prop_assert_eq!(a.len(), m.len());
        }

        let got: Vec<(i32, u64)> = a.iter().map(|(k, v)| (k, *v)).collect();
        let expected: Vec<(i32, u64)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_map_equivalence(ops in prop::collection::vec(any::<MapOp>(), 0..=600)) {
        let mut trie: DualKeyMap<u8, u8, u32> = DualKeyMap::new();
        let mut dense: DenseDualKeyMap<u8, u8, u32> = DualKeyMap::new();
        let mut m: HashMap<(u8, u8), u32> = HashMap::new();

        for op in ops {
            match op {
                MapOp::Insert(r, c, v) => {
                    let expected = m.insert((r, c), v);
                    prop_assert_eq!(trie.insert(r, c, v), Ok(expected));
                    prop_assert_eq!(dense.insert(r, c, v), Ok(expected));
                }
                MapOp::Remove(r, c) => {
                    let expected = m.remove(&(r, c));
                    prop_assert_eq!(trie.remove(&r, &c), expected);
                    prop_assert_eq!(dense.remove(&r, &c), expected);
                }
                MapOp::Merge(r, c, v) => {
                    let next = match m.get(&(r, c)) {
                        Some(old) => merge_or_drop(old, v),
                        None => Some(v),
                    };
                    match next {
                        Some(next) => m.insert((r, c), next),
                        None => m.remove(&(r, c)),
                    };
                    prop_assert_eq!(trie.merge(r, c, v, merge_or_drop).unwrap().copied(), next);
                    prop_assert_eq!(dense.merge(r, c, v, merge_or_drop).unwrap().copied(), next);
                }
                MapOp::Get(r, c) => {
                    prop_assert_eq!(trie.get(&r, &c), m.get(&(r, c)));
                    prop_assert_eq!(dense.get(&r, &c), m.get(&(r, c)));
                }
                MapOp::Clear => {
                    m.clear();
                    trie.clear();
                    dense.clear();
                }
            }
            prop_assert_eq!(trie.len(), m.len());
            prop_assert_eq!(dense.len(), m.len());
        }

        trie.validate();
        dense.validate();
        prop_assert!(trie == dense);

        let got: HashMap<(u8, u8), u32> = trie.iter().map(|(r, c, v)| ((*r, *c), *v)).collect();
        prop_assert_eq!(&got, &m);

        let rows: HashSet<u8> = m.keys().map(|(r, _)| *r).collect();
        let columns: HashSet<u8> = m.keys().map(|(_, c)| *c).collect();
        prop_assert_eq!(trie.row_keys().copied().collect::<HashSet<_>>(), rows);
        prop_assert_eq!(dense.column_keys().copied().collect::<HashSet<_>>(), columns);
    }

    #[test]
    fn prop_set_equivalence(ops in prop::collection::vec(any::<SetOp>(), 0..=800)) {
        let mut s: DualKeySet<u8, u16> = DualKeySet::new();
        let mut m: HashSet<(u8, u16)> = HashSet::new();

        for op in ops {
            match op {
                SetOp::Insert(r, c) => {
                    prop_assert_eq!(s.insert(r, c), Ok(m.insert((r, c))));
                }
                SetOp::Remove(r, c) => {
                    prop_assert_eq!(s.remove(&r, &c), m.remove(&(r, c)));
                }
                SetOp::Contains(r, c) => {
                    prop_assert_eq!(s.contains(&r, &c), m.contains(&(r, c)));
                }
            }
            prop_assert_eq!(s.len(), m.len());
        }

        let got: HashSet<(u8, u16)> = s.iter().map(|(r, c)| (*r, *c)).collect();
        prop_assert_eq!(&got, &m);
        let columns: HashSet<u16> = m.iter().map(|(_, c)| *c).collect();
        prop_assert_eq!(s.column_count(), columns.len());
        for r in 0..8u8 {
            let row_len = m.iter().filter(|(mr, _)| *mr == r).count();
            prop_assert_eq!(s.row_len(&r), row_len);
            prop_assert_eq!(s.contains_row(&r), row_len > 0);
        }
    }
}

// =============================================================================
// Exhaustive orderings over a small key set
// =============================================================================

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

const SMALL_KEYS: [i32; 7] = [i32::MIN, -1, 0, 31, 32, 1024, i32::MAX];

#[test]
fn exhaustive_insert_order_small_set() {
    let mut expected_depth = None;
    for_each_permutation(&SMALL_KEYS, |perm| {
        let mut t: RadixTrie<u64> = RadixTrie::new();
        let mut m: BTreeMap<i32, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            assert_eq!(t.insert(k, v), m.insert(k, v));
        }

        t.validate();
        let got: Vec<i32> = t.keys().collect();
        let expected: Vec<i32> = m.keys().copied().collect();
        assert_eq!(got, expected);

        // The shape depends only on the key set, never on insertion order.
        let depth = *expected_depth.get_or_insert(t.depth());
        assert_eq!(t.depth(), depth);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let mut base_trie: RadixTrie<u64> = RadixTrie::new();
    let mut base_map: BTreeMap<i32, u64> = BTreeMap::new();
    for (i, k) in SMALL_KEYS.iter().enumerate() {
        let v = i as u64;
        assert_eq!(base_trie.insert(*k, v), base_map.insert(*k, v));
    }

    for_each_permutation(&SMALL_KEYS, |perm| {
        let mut t = base_trie.clone();
        let mut m = base_map.clone();

        for k in perm {
            assert_eq!(t.remove(k), m.remove(&k));
            assert_eq!(t.len(), m.len());
            t.validate();
        }
        assert!(t.is_empty());
        assert_eq!(t.depth(), 0);
    });
}
