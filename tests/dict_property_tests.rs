//! Property-based tests для словаря.
//!
//! Генерируются случайные последовательности операций, результат
//! сверяется с эталонным `std::collections::HashMap`, попутно
//! проверяются счётчики и полнота обхода.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use zdict::{Dict, DictError, SipDict, SipHashType};

/// Базовая настройка proptest: количество итераций.
const PROPTEST_CASES: u32 = 256;

#[derive(Debug, Clone)]
enum Op {
    Add(u8, u16),
    Replace(u8, u16),
    Delete(u8),
    Find(u8),
    Rehash(u8),
    Resize,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<u8>(), any::<u16>()).prop_map(|(k, v)| Op::Add(k, v)),
        (any::<u8>(), any::<u16>()).prop_map(|(k, v)| Op::Replace(k, v)),
        any::<u8>().prop_map(Op::Delete),
        any::<u8>().prop_map(Op::Find),
        (1..8u8).prop_map(Op::Rehash),
        Just(Op::Resize),
    ]
}

fn dict() -> SipDict<u8, u16> {
    Dict::with_type(SipHashType::with_seed([13; 16]))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: PROPTEST_CASES,
        .. ProptestConfig::default()
    })]

    /// Словарь ведёт себя как эталонный HashMap на любой
    /// последовательности операций.
    #[test]
    fn behaves_like_std_hashmap(ops in prop::collection::vec(op_strategy(), 1..300)) {
        let mut d = dict();
        let mut model: HashMap<u8, u16> = HashMap::new();

        for op in ops {
            match op {
                Op::Add(k, v) => {
                    let expected_err = model.contains_key(&k);
                    match d.add(k, v) {
                        Ok(()) => {
                            prop_assert!(!expected_err);
                            model.insert(k, v);
                        }
                        Err(err) => {
                            prop_assert_eq!(err, DictError::KeyExists);
                            prop_assert!(expected_err);
                        }
                    }
                }
                Op::Replace(k, v) => {
                    let added = d.replace(k, v);
                    prop_assert_eq!(added, !model.contains_key(&k));
                    model.insert(k, v);
                }
                Op::Delete(k) => {
                    prop_assert_eq!(d.delete(&k).is_ok(), model.remove(&k).is_some());
                }
                Op::Find(k) => {
                    prop_assert_eq!(d.fetch_value(&k), model.get(&k));
                }
                Op::Rehash(n) => {
                    d.rehash(n as usize);
                }
                Op::Resize => {
                    // Законные отказы: миграция уже идёт или размер
                    // уже минимален.
                    let _ = d.resize();
                }
            }

            prop_assert_eq!(d.len(), model.len());
        }

        // Финальная сверка содержимого через обычный итератор.
        let mut walked = 0;
        for e in d.iter() {
            prop_assert_eq!(e.value(), model.get(e.key()));
            walked += 1;
        }
        prop_assert_eq!(walked, model.len());
    }

    /// После любой последовательности вставок обход scan покрывает все
    /// присутствующие ключи.
    #[test]
    fn scan_superset_of_keys(keys in prop::collection::hash_set(any::<u16>(), 1..500)) {
        let mut d: SipDict<u16, ()> = Dict::with_type(SipHashType::with_seed([17; 16]));
        for &k in &keys {
            d.add(k, ()).unwrap();
        }

        let mut seen = HashSet::new();
        let mut cursor = 0;
        loop {
            cursor = d.scan(cursor, |e| {
                seen.insert(*e.key());
            });
            if cursor == 0 {
                break;
            }
        }

        prop_assert!(seen.is_superset(&keys));
    }

    /// Миграция всегда завершается и не теряет элементов.
    #[test]
    fn rehash_terminates_and_preserves_entries(n in 1..2000u64) {
        let mut d = Dict::with_type(SipHashType::with_seed([19; 16]));
        for i in 0..n {
            d.add(i, i).unwrap();
        }

        let mut guard = 0;
        while d.rehash(1) {
            guard += 1;
            prop_assert!(guard < 100_000);
        }

        prop_assert!(!d.is_rehashing());
        prop_assert_eq!(d.len(), n as usize);

        let stats = d.stats();
        prop_assert_eq!(stats.main.used, n as usize);
        prop_assert!(stats.main.size.is_power_of_two());
        // После завершения миграции load factor не выше единицы.
        prop_assert!(stats.main.used <= stats.main.size);
    }

    /// Счётчик used согласован с фактически достижимыми узлами:
    /// гистограмма статистики считается обходом цепочек.
    #[test]
    fn used_matches_reachable_entries(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let mut d = dict();
        for op in ops {
            match op {
                Op::Add(k, v) => { let _ = d.add(k, v); }
                Op::Replace(k, v) => { d.replace(k, v); }
                Op::Delete(k) => { let _ = d.delete(&k); }
                Op::Find(k) => { d.fetch_value(&k); }
                Op::Rehash(n) => { d.rehash(n as usize); }
                Op::Resize => { let _ = d.resize(); }
            }

            let walked = d.iter().count();
            prop_assert_eq!(walked, d.len());
        }

        let stats = d.stats();
        let mut reachable: usize = stats
            .main
            .clvector
            .iter()
            .enumerate()
            .map(|(len, &b)| len * b)
            .sum();
        if let Some(rehashing) = &stats.rehashing {
            reachable += rehashing
                .clvector
                .iter()
                .enumerate()
                .map(|(len, &b)| len * b)
                .sum::<usize>();
        }
        prop_assert_eq!(reachable, d.len());
    }
}
