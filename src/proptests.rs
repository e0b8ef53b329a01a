use super::*;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use proptest_derive::Arbitrary;
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, Arbitrary)]
enum Width {
    W7,
    W8,
    W15,
    W16,
}

impl Width {
    fn code_width(self) -> CodeWidth {
        match self {
            Width::W7 => CodeWidth::W7,
            Width::W8 => CodeWidth::W8,
            Width::W15 => CodeWidth::W15,
            Width::W16 => CodeWidth::W16,
        }
    }
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A narrow alphabet most of the time so keys share prefixes, with the
    // occasional arbitrary byte (including 0x00 and 0xFF).
    let byte = prop_oneof![
        8 => b'a'..=b'e',
        1 => any::<u8>(),
    ];
    prop::collection::vec(byte, 0..=12)
}

fn keys_strategy() -> impl Strategy<Value = BTreeSet<Vec<u8>>> {
    prop::collection::btree_set(key_strategy(), 0..=200)
}

/// Fits `keys` to the width's alphabet.
fn fit(width: CodeWidth, keys: &BTreeSet<Vec<u8>>) -> BTreeSet<Vec<u8>> {
    let max = width.max_byte();
    keys.iter()
        .map(|k| k.iter().map(|&b| b.min(max)).collect())
        .collect()
}

fn validate_dict<D: AsRef<[u8]>, U: CodeUnit>(
    dict: &Dictionary<D, U>,
    model: &BTreeSet<Vec<u8>>,
    queries: &[Vec<u8>],
) -> std::result::Result<(), TestCaseError> {
    prop_assert_eq!(dict.num_keys(), model.len());
    prop_assert!(dict.num_nodes() <= dict.num_units());
    prop_assert_eq!(
        dict.max_length(),
        model.iter().map(Vec::len).max().unwrap_or(0)
    );

    // Enumeration is the sorted key set and ids form a permutation of 0..n.
    let all: Vec<(Vec<u8>, u64)> = dict.enumerate().collect();
    let keys: Vec<&Vec<u8>> = all.iter().map(|(k, _)| k).collect();
    prop_assert_eq!(keys, model.iter().collect::<Vec<_>>());
    let mut ids: Vec<u64> = all.iter().map(|&(_, id)| id).collect();
    ids.sort_unstable();
    prop_assert_eq!(ids, (0..model.len() as u64).collect::<Vec<_>>());

    for (key, id) in &all {
        prop_assert_eq!(dict.lookup(key), Some(*id));
        prop_assert_eq!(dict.decode(*id), Some(key.clone()));
    }
    prop_assert_eq!(dict.decode(model.len() as u64), None);

    for q in queries {
        prop_assert_eq!(dict.lookup(q).is_some(), model.contains(q));

        let got: Vec<Vec<u8>> = dict.prefix_iter(q).map(|(k, _)| k).collect();
        let expected: Vec<Vec<u8>> = (0..=q.len())
            .map(|n| q[..n].to_vec())
            .filter(|p| model.contains(p))
            .collect();
        prop_assert_eq!(got, expected);

        let got: Vec<Vec<u8>> = dict.predictive_iter(q).map(|(k, _)| k).collect();
        let expected: Vec<Vec<u8>> = model
            .range(q.clone()..)
            .take_while(|k| k.starts_with(q))
            .cloned()
            .collect();
        prop_assert_eq!(got, expected);
    }
    Ok(())
}

fn check_width<U: CodeUnit>(
    model: &BTreeSet<Vec<u8>>,
    queries: &[Vec<u8>],
) -> std::result::Result<(), TestCaseError> {
    let dict = Dictionary::<Vec<u8>, U>::build(model).map_err(|e| TestCaseError::fail(e.to_string()))?;
    validate_dict(&dict, model, queries)?;

    // Projection and a rebuilt copy answer from identical bytes.
    let view = Dictionary::<&[u8], U>::new(dict.as_bytes())
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
    validate_dict(&view, model, queries)?;
    let again = Dictionary::<Vec<u8>, U>::build(model).map_err(|e| TestCaseError::fail(e.to_string()))?;
    prop_assert_eq!(again.as_bytes(), dict.as_bytes());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_matches_model(
        width in any::<Width>(),
        keys in keys_strategy(),
        extra in prop::collection::vec(key_strategy(), 0..=32),
    ) {
        let width = width.code_width();
        let model = fit(width, &keys);
        let mut queries = fit(width, &extra.into_iter().collect()).into_iter().collect::<Vec<_>>();
        queries.extend(model.iter().take(16).cloned());
        queries.push(Vec::new());

        match width {
            CodeWidth::W7 => check_width::<Unit7>(&model, &queries)?,
            CodeWidth::W8 => check_width::<Unit8>(&model, &queries)?,
            CodeWidth::W15 => check_width::<Unit15>(&model, &queries)?,
            CodeWidth::W16 => check_width::<Unit16>(&model, &queries)?,
        }
    }

    #[test]
    fn prop_rejects_bad_order(keys in prop::collection::btree_set(key_strategy(), 2..=50)) {
        let mut reversed: Vec<Vec<u8>> = keys.iter().cloned().collect();
        reversed.reverse();
        let err = Dictionary8::build(&reversed).unwrap_err();
        prop_assert!(matches!(err, CdatError::Unsorted { index: 1 }), "unexpected error: {:?}", err);

        let mut doubled: Vec<Vec<u8>> = keys.iter().cloned().collect();
        let last = doubled[doubled.len() - 1].clone();
        doubled.push(last);
        let err = Dictionary8::build(&doubled).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let dup_index = keys.len();
        prop_assert!(matches!(err, CdatError::Duplicate { index } if index == dup_index), "unexpected error: {:?}", err);
    }

    #[test]
    fn prop_build_is_deterministic(width in any::<Width>(), keys in keys_strategy()) {
        let config = BuildConfig::new(width.code_width());
        let model = fit(config.width, &keys);
        let a = AnyDictionary::build(&model, &config).unwrap();
        let b = AnyDictionary::build(model.iter().cloned().collect::<Vec<_>>(), &config).unwrap();
        prop_assert_eq!(a.as_bytes(), b.as_bytes());
    }
}

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

#[test]
fn exhaustive_order_small_set() {
    let keys: Vec<Vec<u8>> = vec![
        b"a".to_vec(),
        b"b".to_vec(),
        b"aa".to_vec(),
        b"ab".to_vec(),
        b"ba".to_vec(),
    ];
    let sorted: BTreeSet<Vec<u8>> = keys.iter().cloned().collect();

    // Exactly one order is accepted; every other permutation is rejected whole.
    let mut accepted = 0;
    for_each_permutation(&keys, |perm| match Dictionary8::build(&perm) {
        Ok(dict) => {
            accepted += 1;
            assert_eq!(perm, sorted.iter().cloned().collect::<Vec<_>>());
            assert_eq!(dict.num_keys(), keys.len());
        }
        Err(err) => assert!(matches!(err, CdatError::Unsorted { .. })),
    });
    assert_eq!(accepted, 1);
}

#[test]
fn exhaustive_all_subsets_small_universe() {
    // Every string over {a, b} up to length 3, including the empty string.
    let mut universe: Vec<Vec<u8>> = vec![Vec::new()];
    for len in 1..=3u32 {
        for bits in 0..(1u32 << len) {
            universe.push(
                (0..len)
                    .rev()
                    .map(|i| if bits >> i & 1 == 0 { b'a' } else { b'b' })
                    .collect(),
            );
        }
    }
    assert_eq!(universe.len(), 15);

    // Subsets drawn by stepping through masks keeps the run short while still
    // covering empty, full and every single-key set.
    let full = (1u32 << universe.len()) - 1;
    let mut masks: Vec<u32> = (0..=full).step_by(97).collect();
    masks.push(full);
    masks.extend((0..universe.len()).map(|i| 1u32 << i));

    for mask in masks {
        let model: BTreeSet<Vec<u8>> = universe
            .iter()
            .enumerate()
            .filter(|(i, _)| mask >> i & 1 == 1)
            .map(|(_, k)| k.clone())
            .collect();
        if let Err(e) = check_width::<Unit8>(&model, &universe) {
            panic!("mask {:#x}: {}", mask, e);
        }
        if let Err(e) = check_width::<Unit7>(&model, &universe) {
            panic!("mask {:#x}: {}", mask, e);
        }
    }
}
