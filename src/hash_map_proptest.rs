#![cfg(all(test, feature = "std"))]

// Model-based property tests: random operation sequences are applied to
// `HashMap` and to `std::collections::HashMap`, and every observable result
// is compared after each step.

use std::collections::BTreeSet;
use std::collections::HashMap as ModelMap;
use std::hash::BuildHasher;
use std::hash::Hasher;
use std::vec::Vec;

use proptest::prelude::*;

use crate::Error;
use crate::HashMap;

// Folds keys onto a handful of hashes so probe chains overlap, wrap around
// and get repaired by removals.
#[derive(Clone, Default)]
struct ClusteringBuildHasher;

struct ClusteringHasher(u64);

impl BuildHasher for ClusteringBuildHasher {
    type Hasher = ClusteringHasher;

    fn build_hasher(&self) -> Self::Hasher {
        ClusteringHasher(0)
    }
}

impl Hasher for ClusteringHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 = self.0.wrapping_mul(31).wrapping_add(u64::from(byte));
        }
    }

    fn write_u16(&mut self, n: u16) {
        self.0 = u64::from(n % 7);
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, i32),
    InsertOrAssign(u16, i32),
    Emplace(u16, i32),
    FindOrInsert(u16),
    Remove(u16),
    EraseAt(u16),
    Get(u16),
    Retain(u16),
    Reserve(usize),
    ShrinkToFit,
    Rehash,
    Clear,
    Iterate,
}

fn arb_op() -> impl Strategy<Value = Op> {
    let key = 0u16..64;
    prop_oneof![
        6 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        4 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::InsertOrAssign(k, v)),
        2 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Emplace(k, v)),
        2 => key.clone().prop_map(Op::FindOrInsert),
        4 => key.clone().prop_map(Op::Remove),
        2 => key.clone().prop_map(Op::EraseAt),
        3 => key.clone().prop_map(Op::Get),
        1 => (1u16..5).prop_map(Op::Retain),
        1 => (0usize..300).prop_map(Op::Reserve),
        1 => Just(Op::ShrinkToFit),
        1 => Just(Op::Rehash),
        1 => Just(Op::Clear),
        1 => Just(Op::Iterate),
    ]
}

fn run_ops<S>(ops: Vec<Op>) -> Result<(), TestCaseError>
where
    S: BuildHasher + Default + Clone,
{
    let mut sut: HashMap<u16, i32, S> = HashMap::new();
    let mut model: ModelMap<u16, i32> = ModelMap::new();

    for op in ops {
        let len_before = sut.len();
        match op {
            Op::Insert(k, v) => {
                let (handle, inserted) = sut.insert(k, v);
                prop_assert_eq!(inserted, !model.contains_key(&k));
                model.entry(k).or_insert(v);
                prop_assert_eq!(sut.get_at(handle), Ok((&k, &model[&k])));
            }
            Op::InsertOrAssign(k, v) => {
                let (handle, inserted) = sut.insert_or_assign(k, v);
                prop_assert_eq!(inserted, model.insert(k, v).is_none());
                prop_assert_eq!(sut.get_at(handle), Ok((&k, &v)));
            }
            Op::Emplace(k, v) => {
                let mut built = false;
                let (_, inserted) = sut.emplace(k, || {
                    built = true;
                    v
                });
                prop_assert_eq!(built, inserted);
                prop_assert_eq!(inserted, !model.contains_key(&k));
                model.entry(k).or_insert(v);
            }
            Op::FindOrInsert(k) => {
                let value = *sut.find_or_insert(k);
                prop_assert_eq!(value, *model.entry(k).or_default());
            }
            Op::Remove(k) => {
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
            }
            Op::EraseAt(k) => match sut.find(&k) {
                Some(handle) => {
                    let ((key, value), _) = sut.erase_at(handle).map_err(|e| {
                        TestCaseError::fail(std::format!("erase_at failed: {e}"))
                    })?;
                    prop_assert_eq!(key, k);
                    prop_assert_eq!(Some(value), model.remove(&k));
                }
                None => prop_assert!(!model.contains_key(&k)),
            },
            Op::Get(k) => {
                prop_assert_eq!(sut.get(&k), model.get(&k));
                prop_assert_eq!(sut.at(&k).ok(), model.get(&k));
                if !model.contains_key(&k) {
                    prop_assert_eq!(sut.at(&k), Err(Error::NotFound));
                }
            }
            Op::Retain(m) => {
                let mut visited = BTreeSet::new();
                sut.retain(|&k, _| {
                    assert!(visited.insert(k), "retain visited {k} twice");
                    k % m != 0
                });
                prop_assert_eq!(visited.len(), len_before);
                model.retain(|&k, _| k % m != 0);
            }
            Op::Reserve(n) => {
                sut.reserve(n);
                prop_assert!(sut.capacity() >= n);
            }
            Op::ShrinkToFit => {
                sut.shrink_to_fit();
                let expected = if model.is_empty() {
                    0
                } else {
                    model.len().next_power_of_two()
                };
                prop_assert_eq!(sut.capacity(), expected);
            }
            Op::Rehash => {
                let capacity = sut.capacity();
                sut.rehash(0);
                prop_assert_eq!(sut.capacity(), capacity);
            }
            Op::Clear => {
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.capacity(), 0);
            }
            Op::Iterate => {
                let keys: BTreeSet<_> = sut.keys().copied().collect();
                let expected: BTreeSet<_> = model.keys().copied().collect();
                prop_assert_eq!(keys, expected);
                prop_assert_eq!(sut.iter().count(), model.len());
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert!(sut.capacity() == 0 || sut.capacity().is_power_of_two());
        prop_assert!(sut.len() <= sut.capacity());
        if sut.len() > len_before {
            prop_assert!(sut.load_factor() <= 0.75);
        }

        for (k, v) in &model {
            prop_assert_eq!(sut.get(k), Some(v), "lost key {}", k);
        }
        for k in 0u16..64 {
            if !model.contains_key(&k) {
                prop_assert!(!sut.contains_key(&k), "phantom key {}", k);
            }
        }
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_matches_std_model(ops in proptest::collection::vec(arb_op(), 1..200)) {
        run_ops::<std::hash::RandomState>(ops)?;
    }

    #[test]
    fn prop_matches_std_model_with_collisions(ops in proptest::collection::vec(arb_op(), 1..200)) {
        run_ops::<ClusteringBuildHasher>(ops)?;
    }

    #[test]
    fn prop_from_iter_keeps_last_value(pairs in proptest::collection::vec((0u16..32, any::<i32>()), 0..100)) {
        let sut: HashMap<u16, i32, ClusteringBuildHasher> = pairs.iter().copied().collect();
        let model: ModelMap<u16, i32> = pairs.iter().copied().collect();

        prop_assert_eq!(sut.len(), model.len());
        for (k, v) in &model {
            prop_assert_eq!(sut.get(k), Some(v));
        }
    }

    #[test]
    fn prop_swap_twice_is_identity(
        a in proptest::collection::vec((0u16..64, any::<i32>()), 0..50),
        b in proptest::collection::vec((0u16..64, any::<i32>()), 0..50),
    ) {
        let mut x: HashMap<u16, i32, ClusteringBuildHasher> = a.into_iter().collect();
        let mut y: HashMap<u16, i32, ClusteringBuildHasher> = b.into_iter().collect();
        let (x0, y0) = (x.clone(), y.clone());

        x.swap(&mut y);
        prop_assert_eq!(&x, &y0);
        prop_assert_eq!(&y, &x0);

        x.swap(&mut y);
        prop_assert_eq!(&x, &x0);
        prop_assert_eq!(&y, &y0);
    }
}
