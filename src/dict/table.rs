use super::entry::Entry;

/// Начальный размер таблицы (степень двойки).
pub(crate) const INITIAL_SIZE: usize = 4;

/// Одна хеш-таблица: вектор бакетов, маска размера и количество занятых
/// элементов. Словарь держит две такие таблицы ради инкрементального
/// рехеширования.
pub(crate) struct SubTable<K, V> {
    pub(crate) buckets: Vec<Option<Box<Entry<K, V>>>>,
    pub(crate) size_mask: usize,
    pub(crate) used: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<K, V> SubTable<K, V> {
    /// Создаёт таблицу ёмкостью `cap` бакетов (степень двойки, не меньше
    /// `INITIAL_SIZE`). `cap == 0` даёт неинициализированную таблицу.
    pub(crate) fn with_capacity(cap: usize) -> Self {
        if cap == 0 {
            return SubTable {
                buckets: Vec::new(),
                size_mask: 0,
                used: 0,
            };
        }

        let sz = cap.next_power_of_two().max(INITIAL_SIZE);
        let mut buckets = Vec::with_capacity(sz);
        buckets.resize_with(sz, || None);

        SubTable {
            buckets,
            size_mask: sz - 1,
            used: 0,
        }
    }

    /// Количество бакетов. 0 означает неинициализированную таблицу.
    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.buckets.len()
    }

    /// Сбрасывает поля в пустое состояние. Бакеты должны быть уже
    /// опустошены.
    pub(crate) fn reset(&mut self) {
        debug_assert!(self.used == 0);
        self.buckets = Vec::new();
        self.size_mask = 0;
        self.used = 0;
    }
}

impl<K, V> Drop for SubTable<K, V> {
    fn drop(&mut self) {
        // Цепочки разбираются итеративно: рекурсивный drop вложенных Box
        // переполнил бы стек на длинной цепочке.
        for slot in &mut self.buckets {
            let mut e = slot.take();
            while let Some(mut boxed) = e {
                e = boxed.next.take();
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
