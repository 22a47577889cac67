//! Stateless cursor scan.
//!
//! `scan` walks the dictionary in bucket-sized portions. The whole
//! iteration state is one integer cursor: call with 0 to start, feed the
//! returned cursor back in, stop when it returns 0. Every entry present
//! for the whole duration of the scan is emitted at least once, even if
//! the table grows or shrinks between calls; duplicates are possible.
//!
//! The cursor is advanced by incrementing it from the high-order bit of
//! the mask downward: set the bits above the mask, reverse the bits, add
//! one, reverse back. Bucket indices are `hash & (size - 1)` with sizes
//! a power of two, so when a table doubles, bucket `b` splits into `b`
//! and `b + size`: both differ from `b` only above the old mask, and the
//! reversed counter enumerates all such extensions before moving to a new
//! low-bit pattern. That is what makes the walk resize-tolerant. While
//! rehashing, the bucket of the smaller table is emitted first, then all
//! of its expansions in the larger table.

use super::{dict_base::Dict, entry::Entry, types::DictType};

/// Шаг обратно-двоичного счётчика: биты выше маски должны быть
/// установлены вызывающим кодом.
#[inline]
fn rev_next(v: u64) -> u64 {
    v.reverse_bits().wrapping_add(1).reverse_bits()
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<K, V, T> Dict<K, V, T>
where
    T: DictType<K, V>,
{
    /// Один шаг сканирования: выдаёт все узлы очередного бакета (во время
    /// рехеширования - группы бакетов) и возвращает следующий курсор.
    /// Начало с курсора 0; возврат 0 означает конец обхода.
    pub fn scan<F>(
        &self,
        cursor: u64,
        mut entry_fn: F,
    ) -> u64
    where
        F: FnMut(&Entry<K, V>),
    {
        self.scan_with(cursor, &mut entry_fn, |_| ())
    }

    /// То же, что `scan`, но дополнительно вызывает `bucket_fn` для головы
    /// каждого посещаемого бакета (в том числе пустого).
    pub fn scan_with<F, B>(
        &self,
        mut v: u64,
        mut entry_fn: F,
        mut bucket_fn: B,
    ) -> u64
    where
        F: FnMut(&Entry<K, V>),
        B: FnMut(Option<&Entry<K, V>>),
    {
        if self.len() == 0 {
            return 0;
        }

        // Колбэк может выполнять поиск по словарю; шаг рехеширования под
        // сканированием сместил бы бакеты между таблицами.
        self.pause_rehash();

        if !self.is_rehashing() {
            let t0 = &self.ht[0];
            let m0 = t0.size_mask as u64;

            let head = t0.buckets[(v & m0) as usize].as_deref();
            bucket_fn(head);
            let mut de = head;
            while let Some(e) = de {
                entry_fn(e);
                de = e.next.as_deref();
            }

            v |= !m0;
            v = rev_next(v);
        } else {
            // t0 всегда меньшая таблица, t1 большая.
            let (t0, t1) = if self.ht[0].size() <= self.ht[1].size() {
                (&self.ht[0], &self.ht[1])
            } else {
                (&self.ht[1], &self.ht[0])
            };

            let m0 = t0.size_mask as u64;
            let m1 = t1.size_mask as u64;

            let head = t0.buckets[(v & m0) as usize].as_deref();
            bucket_fn(head);
            let mut de = head;
            while let Some(e) = de {
                entry_fn(e);
                de = e.next.as_deref();
            }

            // Все индексы большой таблицы, чьи младшие биты совпадают с
            // курсором малой: расширения текущего бакета.
            loop {
                let head = t1.buckets[(v & m1) as usize].as_deref();
                bucket_fn(head);
                let mut de = head;
                while let Some(e) = de {
                    entry_fn(e);
                    de = e.next.as_deref();
                }

                v |= !m1;
                v = rev_next(v);

                // Пока старшие биты (разница масок) не обнулились, мы всё
                // ещё перебираем расширения того же малого бакета.
                if v & (m0 ^ m1) == 0 {
                    break;
                }
            }
        }

        self.resume_rehash();

        v
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
