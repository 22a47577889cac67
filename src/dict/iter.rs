//! Iterators over the dictionary.
//!
//! Two flavors: a plain borrowed iterator (`Iter`, the usual Rust view)
//! and a stateful `DictIterator` that holds no borrow of the dictionary.
//! The stateful one comes in two modes. A *safe* iterator suspends
//! background rehashing for its lifetime, so the caller may mutate the
//! dictionary between `next` calls, including deleting the entry just
//! returned. An *unsafe* iterator records a structural fingerprint
//! instead and verifies it on release: any table mutation in between is
//! a programmer error and aborts.

use super::{
    dict_base::Dict,
    entry::{chain_len, chain_nth, Entry},
    table::SubTable,
    types::DictType,
};

/// Итератор по словарю с отсоединённым состоянием: хранит только
/// координаты обхода, словарь передаётся в каждый вызов.
///
/// Позиция продолжения хранится как расстояние от хвоста цепочки:
/// вставка в голову и удаление уже выданного узла его не смещают.
pub struct DictIterator {
    table: usize,
    index: isize,
    safe: bool,
    tail_dist: usize,
    fingerprint: u64,
}

/// Обычный заимствующий итератор по обеим таблицам.
pub struct Iter<'a, K, V> {
    tables: [&'a SubTable<K, V>; 2],
    table_idx: usize,
    bucket_idx: usize,
    current: Option<&'a Entry<K, V>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl DictIterator {
    fn new(safe: bool) -> Self {
        DictIterator {
            table: 0,
            index: -1,
            safe,
            tail_dist: 0,
            fingerprint: 0,
        }
    }

    #[inline]
    fn started(&self) -> bool {
        !(self.index == -1 && self.table == 0)
    }

    /// Возвращает следующий узел или `None` в конце обхода.
    ///
    /// Первый вызов регистрирует итератор: безопасный приостанавливает
    /// фоновое рехеширование, небезопасный снимает отпечаток структуры.
    pub fn next<'a, K, V, T>(
        &mut self,
        d: &'a Dict<K, V, T>,
    ) -> Option<&'a Entry<K, V>>
    where
        T: DictType<K, V>,
    {
        loop {
            if self.tail_dist == 0 {
                // Цепочка исчерпана, переходим к следующему бакету.
                if !self.started() {
                    if self.safe {
                        d.pause_rehash();
                    } else {
                        self.fingerprint = d.fingerprint();
                    }
                }

                self.index += 1;
                if self.index as usize >= d.ht[self.table].size() {
                    if d.is_rehashing() && self.table == 0 {
                        self.table = 1;
                        self.index = 0;
                    } else {
                        return None;
                    }
                }

                let head = bucket_head(d, self.table, self.index as usize);
                self.tail_dist = chain_len(head);
            } else {
                let head = bucket_head(d, self.table, self.index as usize);
                let len = chain_len(head);

                // Вызвавший мог удалить узлы цепочки между вызовами:
                // расстояние от хвоста не может превышать её длину.
                let dist = self.tail_dist.min(len);
                if dist == 0 {
                    self.tail_dist = 0;
                    continue;
                }

                self.tail_dist = dist - 1;
                return chain_nth(head, len - dist);
            }
        }
    }

    /// Завершает обход. Безопасный итератор снимает приостановку
    /// рехеширования; небезопасный сверяет отпечаток и паникует при любом
    /// структурном изменении словаря за время обхода.
    pub fn release<K, V, T>(
        self,
        d: &Dict<K, V, T>,
    ) where
        T: DictType<K, V>,
    {
        if !self.started() {
            return;
        }

        if self.safe {
            d.resume_rehash();
        } else {
            assert_eq!(
                self.fingerprint,
                d.fingerprint(),
                "dictionary was structurally modified under an unsafe iterator"
            );
        }
    }
}

#[inline]
fn bucket_head<'a, K, V, T>(
    d: &'a Dict<K, V, T>,
    table: usize,
    index: usize,
) -> Option<&'a Entry<K, V>>
where
    T: DictType<K, V>,
{
    d.ht[table].buckets.get(index).and_then(|b| b.as_deref())
}

impl<K, V, T> Dict<K, V, T>
where
    T: DictType<K, V>,
{
    /// Небезопасный итератор: между `next` допустим только сам `next`,
    /// любое изменение словаря обнаруживается при `release`.
    pub fn iterator(&self) -> DictIterator {
        DictIterator::new(false)
    }

    /// Безопасный итератор: словарь можно изменять между вызовами `next`,
    /// фоновое рехеширование приостановлено до `release`.
    pub fn safe_iterator(&self) -> DictIterator {
        DictIterator::new(true)
    }

    /// Обычный заимствующий итератор по всем узлам.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            tables: [&self.ht[0], &self.ht[1]],
            table_idx: 0,
            bucket_idx: 0,
            current: None,
        }
    }

    /// Отпечаток структурного состояния словаря: указатели, размеры и
    /// заполненность обеих таблиц, прогнанные через целочисленный хеш.
    /// Меняется при любом структурном изменении; замена значения в
    /// существующем узле отпечаток не меняет.
    pub(crate) fn fingerprint(&self) -> u64 {
        let integers = [
            self.ht[0].buckets.as_ptr() as u64,
            self.ht[0].size() as u64,
            self.ht[0].used as u64,
            self.ht[1].buckets.as_ptr() as u64,
            self.ht[1].size() as u64,
            self.ht[1].used as u64,
        ];

        // Свёртка: hash = mix(hash + int) для каждого слагаемого, чтобы
        // перестановка слагаемых меняла результат.
        let mut hash: u64 = 0;
        for v in integers {
            hash = wang_mix64(hash.wrapping_add(v));
        }
        hash
    }
}

/// 64-битный целочисленный хеш Томаса Ванга.
fn wang_mix64(mut h: u64) -> u64 {
    h = (!h).wrapping_add(h << 21);
    h ^= h >> 24;
    h = h.wrapping_add(h << 3).wrapping_add(h << 8);
    h ^= h >> 14;
    h = h.wrapping_add(h << 2).wrapping_add(h << 4);
    h ^= h >> 28;
    h = h.wrapping_add(h << 31);
    h
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = &'a Entry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Отдаём текущий элемент цепочки, если он есть.
            if let Some(entry) = self.current.take() {
                self.current = entry.next.as_deref();
                return Some(entry);
            }

            // Бакеты текущей таблицы исчерпаны.
            if self.bucket_idx >= self.tables[self.table_idx].size() {
                // Переходим к ht[1], если она непуста (идёт рехеширование).
                if self.table_idx == 0 && self.tables[1].size() != 0 {
                    self.table_idx = 1;
                    self.bucket_idx = 0;
                    continue;
                }
                return None;
            }

            self.current = self.tables[self.table_idx].buckets[self.bucket_idx].as_deref();
            self.bucket_idx += 1;
        }
    }
}

impl<'a, K, V, T> IntoIterator for &'a Dict<K, V, T>
where
    T: DictType<K, V>,
{
    type Item = &'a Entry<K, V>;
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use crate::dict::{dict_base::SipDict, types::SipHashType, Dict};

    fn dict(n: u64) -> SipDict<u64, u64> {
        let mut d = Dict::with_type(SipHashType::with_seed([3; 16]));
        for i in 0..n {
            d.add(i, i * 2).unwrap();
        }
        d
    }

    /// Обычный итератор обходит все узлы обеих таблиц.
    #[test]
    fn plain_iter_visits_everything() {
        let d = dict(100);
        let mut keys: Vec<u64> = d.iter().map(|e| *e.key()).collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..100).collect::<Vec<_>>());
    }

    /// Итератор по пустому словарю не возвращает элементов.
    #[test]
    fn empty_iterators() {
        let d = dict(0);
        assert!(d.iter().next().is_none());

        let mut it = d.iterator();
        assert!(it.next(&d).is_none());
        it.release(&d);
    }

    /// Пошаговый итератор обходит все узлы во время рехеширования.
    #[test]
    fn stateful_iterator_covers_rehashing_dict() {
        let mut d = dict(64);
        while d.rehash(10) {}
        d.expand(512).unwrap();
        assert!(d.is_rehashing());

        let mut it = d.iterator();
        let mut keys = Vec::new();
        while let Some(e) = it.next(&d) {
            keys.push(*e.key());
        }
        it.release(&d);

        keys.sort_unstable();
        assert_eq!(keys, (0..64).collect::<Vec<_>>());
    }

    /// Отпечаток не меняется от замены значения, меняется от вставки.
    #[test]
    fn fingerprint_tracks_structure_only() {
        let mut d = dict(10);
        while d.rehash(10) {}

        let before = d.fingerprint();
        d.replace(3, 999);
        assert_eq!(before, d.fingerprint());

        d.add(100, 1).unwrap();
        assert_ne!(before, d.fingerprint());
    }

    /// Безопасный итератор позволяет удалять выданный узел, не теряя
    /// остальных.
    #[test]
    fn safe_iterator_supports_deleting_current() {
        let mut d = dict(50);

        let mut it = d.safe_iterator();
        let mut visited = 0;
        while let Some(e) = it.next(&d) {
            let k = *e.key();
            visited += 1;
            d.delete(&k).unwrap();
        }
        it.release(&d);

        assert_eq!(visited, 50);
        assert!(d.is_empty());
        d.check_invariants();
    }
}
