use fixedmap::{ByteKeys, BytesMap, IndexStrategy, Indexer, KeyHasher, SyncBytesMap};
use hashbrown::HashMap;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Clone, Debug)]
enum Op {
    Set(Vec<u8>, u64),
    Delete(Vec<u8>),
    Get(Vec<u8>),
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // Short keys over a small alphabet so operations collide often.
    prop::collection::vec(0u8..4, 0..=3)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        50 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Set(k, v)),
        25 => key.clone().prop_map(Op::Delete),
        25 => key.prop_map(Op::Get),
    ];
    prop::collection::vec(op, 0..=500)
}

fn capacity_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![Just(1usize), Just(2), 3usize..40, Just(64)]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_sequential_matches_model(ops in ops_strategy(), capacity in capacity_strategy()) {
        let mut map = BytesMap::with_keys(
            capacity,
            ByteKeys::new(KeyHasher::with_seeds(1, 2, 3, 4)),
            IndexStrategy::Auto,
        )
        .unwrap();
        let mut model: HashMap<Vec<u8>, u64> = HashMap::new();

        for op in ops {
            match op {
                Op::Set(key, value) => {
                    let old_model = model.insert(key.clone(), value);
                    prop_assert_eq!(map.set(key, value), old_model);
                }
                Op::Delete(key) => {
                    prop_assert_eq!(map.delete(&key), model.remove(&key));
                }
                Op::Get(key) => {
                    prop_assert_eq!(map.get(&key), model.get(&key));
                }
            }
            prop_assert_eq!(map.len(), model.len());
        }

        let mut visited = 0;
        map.range(|key, value| {
            visited += 1;
            model.get(key) == Some(value)
        });
        prop_assert_eq!(visited, model.len());
    }

    #[test]
    fn prop_concurrent_map_matches_model(ops in ops_strategy(), capacity in capacity_strategy()) {
        let map = SyncBytesMap::with_keys(
            capacity,
            ByteKeys::new(KeyHasher::with_seeds(1, 2, 3, 4)),
            IndexStrategy::Modulo,
        )
        .unwrap();
        let mut model: HashMap<Vec<u8>, u64> = HashMap::new();

        for op in ops {
            match op {
                Op::Set(key, value) => {
                    let old_model = model.insert(key.clone(), value);
                    prop_assert_eq!(map.set(key, value).map(|v| *v), old_model);
                }
                Op::Delete(key) => {
                    prop_assert_eq!(map.delete(&key).map(|v| *v), model.remove(&key));
                }
                Op::Get(key) => {
                    let got = map.get(&key);
                    prop_assert_eq!(got.as_deref(), model.get(&key));
                }
            }
            prop_assert_eq!(map.len(), model.len());
        }

        let mut snapshot: Vec<_> = map.iter_snapshot().map(|(k, v)| (k, *v)).collect();
        let mut expected: Vec<_> = model.into_iter().collect();
        snapshot.sort();
        expected.sort();
        prop_assert_eq!(snapshot, expected);
    }

    #[test]
    fn prop_mask_equals_modulo(shift in 0u32..30, digest in any::<u64>()) {
        let len = 1usize << shift;
        let mask = Indexer::mask(len).unwrap();
        prop_assert_eq!(mask.index(digest), Indexer::modulo(len).index(digest));
    }

    #[test]
    fn prop_index_in_range(len in 1usize..100_000, digest in any::<u64>()) {
        prop_assert!(Indexer::for_len(len).index(digest) < len);
    }
}

#[test]
fn test_seeded_random_ops_both_maps_agree() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut seq = BytesMap::with_capacity(13);
    let sync = SyncBytesMap::with_capacity(13);

    for _ in 0..20_000 {
        let key: Vec<u8> = (0..rng.gen_range(0..4)).map(|_| rng.gen_range(0..6)).collect();
        match rng.gen_range(0..3) {
            0 => {
                let value: u32 = rng.gen();
                assert_eq!(seq.set(key.clone(), value), sync.set(key, value).map(|v| *v));
            }
            1 => assert_eq!(seq.delete(&key), sync.delete(&key).map(|v| *v)),
            _ => assert_eq!(seq.get(&key), sync.get(&key).as_deref()),
        }
        assert_eq!(seq.len(), sync.len());
    }
}
