//! Hash table (Dict) with incremental rehashing.
//!
//! The dictionary owns two chained hash tables. Resizing allocates the
//! second table and migrates buckets one at a time, piggy-backed on
//! ordinary operations, so a million-entry table grows without a pause.
//! Collisions are chained, inserts go to the head of the chain.

use std::{
    cell::Cell,
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use rand::Rng;

use crate::error::{DictError, DictResult};

use super::{
    entry::{chain_len, chain_nth, chain_nth_mut, Entry},
    table::{SubTable, INITIAL_SIZE},
    types::{DictType, SipHashType},
};

/// Порог принудительного расширения: если `used / size` превышает это
/// значение, таблица растёт даже при выключенном resize.
const FORCE_RESIZE_RATIO: usize = 5;

/// Размер пула для `fair_random_key`.
const GETFAIR_NUM_ENTRIES: usize = 15;

/// Глобальный флаг: разрешено ли оппортунистическое изменение размера.
/// Выключается хостом на время copy-on-write снапшотов, чтобы не трогать
/// лишнюю память. Принудительный порог `FORCE_RESIZE_RATIO` действует
/// даже при выключенном флаге.
static DICT_CAN_RESIZE: AtomicBool = AtomicBool::new(true);

/// Разрешает оппортунистическое изменение размера таблиц.
pub fn enable_resize() {
    DICT_CAN_RESIZE.store(true, Ordering::Relaxed);
}

/// Запрещает оппортунистическое изменение размера таблиц.
pub fn disable_resize() {
    DICT_CAN_RESIZE.store(false, Ordering::Relaxed);
}

#[inline]
fn resize_allowed() -> bool {
    DICT_CAN_RESIZE.load(Ordering::Relaxed)
}

/// Следующая степень двойки, не меньше `INITIAL_SIZE`.
#[inline]
fn next_power(size: usize) -> usize {
    size.next_power_of_two().max(INITIAL_SIZE)
}

/// Словарь с инкрементальным рехешированием.
///
/// **ИНВАРИАНТЫ:**
///
/// - Если `rehash_idx == -1`:
///     - ht[1] не инициализирована
///     - все элементы находятся в ht[0]
///
/// - Если `rehash_idx >= 0`:
///     - рехеширование в процессе
///     - бакеты ht[0] с индексами `< rehash_idx` пусты
///     - вставки идут в ht[1], поиск и удаление смотрят в обе таблицы
///
/// - Общее количество элементов всегда равно `ht[0].used + ht[1].used`.
///
/// Рехеширование продвигается на один бакет при каждой операции вставки,
/// поиска или удаления, если нет живых итераторов (`iterators == 0`).
/// Явные вызовы `rehash()` и `expand()` счётчиком итераторов не
/// блокируются.
pub struct Dict<K, V, T: DictType<K, V>> {
    pub(crate) ty: T,
    pub(crate) ht: [SubTable<K, V>; 2],
    pub(crate) rehash_idx: isize,
    pub(crate) iterators: Cell<usize>,
}

/// Словарь с дескриптором по умолчанию.
pub type SipDict<K, V> = Dict<K, V, SipHashType>;

/// Результат низкоуровневой вставки `add_raw`.
pub enum RawAdd<'a, K, V> {
    /// Ключ отсутствовал: создан новый узел с пустой ячейкой значения.
    Created(&'a mut Entry<K, V>),
    /// Ключ уже есть: существующий узел и непоглощённый ключ вызывающего.
    Found {
        entry: &'a mut Entry<K, V>,
        key: K,
    },
}

/// Позиция узла: (таблица, бакет, смещение в цепочке).
type EntryPos = (usize, usize, usize);

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<K, V, T> Dict<K, V, T>
where
    T: DictType<K, V> + Default,
{
    /// Создаёт новый пустой словарь с дескриптором по умолчанию.
    pub fn new() -> Self {
        Self::with_type(T::default())
    }
}

impl<K, V, T> Default for Dict<K, V, T>
where
    T: DictType<K, V> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, T> Dict<K, V, T>
where
    T: DictType<K, V>,
{
    /// Создаёт новый пустой словарь с заданным дескриптором.
    pub fn with_type(ty: T) -> Self {
        Dict {
            ty,
            ht: [SubTable::with_capacity(0), SubTable::with_capacity(0)],
            rehash_idx: -1,
            iterators: Cell::new(0),
        }
    }

    /// Возвращает общее количество элементов во всех таблицах.
    #[inline]
    pub fn len(&self) -> usize {
        self.ht[0].used + self.ht[1].used
    }

    /// Возвращает `true`, если словарь пуст.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Суммарное количество бакетов в обеих таблицах.
    #[inline]
    pub fn slots(&self) -> usize {
        self.ht[0].size() + self.ht[1].size()
    }

    /// Возвращает `true`, если рехеширование в процессе.
    #[inline]
    pub fn is_rehashing(&self) -> bool {
        self.rehash_idx != -1
    }

    /// Хеш ключа по дескриптору словаря.
    #[inline]
    pub fn get_hash(
        &self,
        key: &K,
    ) -> u64 {
        self.ty.hash(key)
    }

    // ------------------------------------------------------------------
    // Изменение размера
    // ------------------------------------------------------------------

    /// Сжимает таблицу до минимального размера, вмещающего все элементы
    /// (load factor около 1).
    pub fn resize(&mut self) -> DictResult<()> {
        if !resize_allowed() {
            return Err(DictError::ResizeDisabled);
        }
        if self.is_rehashing() {
            return Err(DictError::RehashInProgress);
        }

        let minimal = self.ht[0].used.max(INITIAL_SIZE);
        self.expand(minimal)
    }

    /// Начинает рехеширование в таблицу размером не меньше `size`
    /// (округляется вверх до степени двойки).
    ///
    /// Ошибки: рехеширование уже идёт; `size` меньше текущего числа
    /// элементов; целевой размер совпадает с текущим (такое рехеширование
    /// бесполезно и отклоняется).
    pub fn expand(
        &mut self,
        size: usize,
    ) -> DictResult<()> {
        if self.is_rehashing() {
            return Err(DictError::RehashInProgress);
        }
        if self.ht[0].used > size {
            return Err(DictError::TargetTooSmall {
                requested: size,
                used: self.ht[0].used,
            });
        }
        if next_power(size) == self.ht[0].size() {
            return Err(DictError::SameSize(self.ht[0].size()));
        }

        self.grow(size);
        Ok(())
    }

    /// Выделяет новую таблицу. Первое выделение идёт сразу в ht[0],
    /// последующие в ht[1] с запуском рехеширования.
    fn grow(
        &mut self,
        size: usize,
    ) {
        let realsize = next_power(size);
        let table = SubTable::with_capacity(realsize);

        if self.ht[0].size() == 0 {
            self.ht[0] = table;
            return;
        }

        tracing::debug!(
            from = self.ht[0].size(),
            to = realsize,
            used = self.ht[0].used,
            "starting incremental rehash"
        );
        self.ht[1] = table;
        self.rehash_idx = 0;
    }

    /// Запускает расширение, если таблица переполнена: load factor достиг
    /// 1 и resize разрешён, либо превысил принудительный порог.
    fn expand_if_needed(&mut self) {
        if self.is_rehashing() {
            return;
        }

        if self.ht[0].size() == 0 {
            self.grow(INITIAL_SIZE);
            return;
        }

        let used = self.ht[0].used;
        let size = self.ht[0].size();

        if used >= size && (resize_allowed() || used / size > FORCE_RESIZE_RATIO) {
            self.grow(used * 2);
        }
    }

    // ------------------------------------------------------------------
    // Рехеширование
    // ------------------------------------------------------------------

    /// Переносит не более `n` непустых бакетов из ht[0] в ht[1].
    ///
    /// Чтобы ограничить работу на разреженной таблице, вызов прерывается
    /// после `10 * n` просмотренных пустых бакетов. Возвращает `true`,
    /// пока остаётся что переносить, и `false` по завершении.
    pub fn rehash(
        &mut self,
        n: usize,
    ) -> bool {
        let mut empty_visits = n * 10;
        if !self.is_rehashing() {
            return false;
        }

        let Dict {
            ty, ht, rehash_idx, ..
        } = self;

        let mut n = n;
        while n > 0 && ht[0].used != 0 {
            n -= 1;
            debug_assert!((*rehash_idx as usize) < ht[0].size());

            // Пропускаем пустые бакеты в пределах бюджета.
            while ht[0].buckets[*rehash_idx as usize].is_none() {
                *rehash_idx += 1;
                empty_visits -= 1;
                if empty_visits == 0 {
                    return true;
                }
            }

            // Переносим всю цепочку бакета в новую таблицу. Порядок узлов
            // внутри цепочки не сохраняется: каждый встаёт в голову своего
            // нового бакета.
            let mut e = ht[0].buckets[*rehash_idx as usize].take();
            while let Some(mut node) = e {
                e = node.next.take();

                let idx = (ty.hash(&node.key) as usize) & ht[1].size_mask;
                node.next = ht[1].buckets[idx].take();
                ht[1].buckets[idx] = Some(node);
                ht[0].used -= 1;
                ht[1].used += 1;
            }

            *rehash_idx += 1;
        }

        // Всё перенесено: новая таблица занимает место старой.
        if ht[0].used == 0 {
            ht[0] = std::mem::replace(&mut ht[1], SubTable::with_capacity(0));
            *rehash_idx = -1;
            tracing::debug!(size = ht[0].size(), "incremental rehash complete");
            return false;
        }

        true
    }

    /// Гоняет `rehash(100)` до исчерпания бюджета времени `ms`.
    /// Возвращает количество выполненных шагов. Отказывается работать при
    /// живых итераторах.
    pub fn rehash_milliseconds(
        &mut self,
        ms: u64,
    ) -> usize {
        if self.iterators.get() > 0 {
            return 0;
        }

        let start = Instant::now();
        let budget = Duration::from_millis(ms);
        let mut rehashes = 0;

        while self.rehash(100) {
            rehashes += 100;
            if start.elapsed() > budget {
                break;
            }
        }

        rehashes
    }

    /// Один фоновый шаг рехеширования. Выполняется в начале каждой
    /// операции, но только если нет живых итераторов: перенос бакетов под
    /// итератором привёл бы к пропуску или дублированию элементов.
    fn rehash_step(&mut self) {
        if self.iterators.get() == 0 {
            self.rehash(1);
        }
    }

    /// Приостанавливает фоновое рехеширование (живой итератор).
    #[inline]
    pub(crate) fn pause_rehash(&self) {
        self.iterators.set(self.iterators.get() + 1);
    }

    /// Снимает одну приостановку фонового рехеширования.
    #[inline]
    pub(crate) fn resume_rehash(&self) {
        self.iterators.set(self.iterators.get().saturating_sub(1));
    }

    // ------------------------------------------------------------------
    // Вставка
    // ------------------------------------------------------------------

    /// Вставляет пару `(key, val)`. Если ключ уже есть, возвращает
    /// `DictError::KeyExists`, не трогая существующий узел.
    pub fn add(
        &mut self,
        key: K,
        val: V,
    ) -> DictResult<()> {
        match self.raw_add(key) {
            Ok((table, idx)) => {
                let Dict { ty, ht, .. } = self;
                if let Some(e) = ht[table].buckets[idx].as_deref_mut() {
                    e.val = Some(ty.val_dup(val));
                }
                Ok(())
            }
            Err(_) => Err(DictError::KeyExists),
        }
    }

    /// Низкоуровневая вставка: создаёт узел с пустой ячейкой значения и
    /// отдаёт его вызывающему. Если ключ уже есть, возвращает
    /// существующий узел вместе с непоглощённым ключом.
    pub fn add_raw(
        &mut self,
        key: K,
    ) -> RawAdd<'_, K, V> {
        match self.raw_add(key) {
            Ok((table, idx)) => {
                // Новый узел всегда в голове цепочки.
                let entry = chain_nth_mut(&mut self.ht[table].buckets[idx], 0).unwrap();
                RawAdd::Created(entry)
            }
            Err((pos, key)) => RawAdd::Found {
                entry: self.entry_at_mut(pos),
                key,
            },
        }
    }

    /// Возвращает узел ключа, создавая его при отсутствии.
    pub fn add_or_find(
        &mut self,
        key: K,
    ) -> &mut Entry<K, V> {
        match self.add_raw(key) {
            RawAdd::Created(entry) => entry,
            RawAdd::Found { entry, .. } => entry,
        }
    }

    /// Вставляет или перезаписывает пару `(key, val)`. Возвращает `true`,
    /// если ключ был добавлен, и `false`, если значение обновлено.
    ///
    /// При обновлении новое значение записывается до уничтожения старого:
    /// для значений со счётчиком ссылок порядок "увеличить, затем
    /// уменьшить" обязателен, когда старое и новое значение совпадают.
    pub fn replace(
        &mut self,
        key: K,
        val: V,
    ) -> bool {
        match self.raw_add(key) {
            Ok((table, idx)) => {
                let Dict { ty, ht, .. } = self;
                if let Some(e) = ht[table].buckets[idx].as_deref_mut() {
                    e.val = Some(ty.val_dup(val));
                }
                true
            }
            Err((pos, _key)) => {
                let Dict { ty, ht, .. } = self;
                let e = chain_nth_mut(&mut ht[pos.0].buckets[pos.1], pos.2).unwrap();
                let old = e.val.replace(ty.val_dup(val));
                if let Some(old) = old {
                    ty.val_destroy(old);
                }
                false
            }
        }
    }

    /// Общий путь вставки: фоновый шаг рехеширования, проверка
    /// присутствия, вставка в голову бакета целевой таблицы.
    ///
    /// `Ok((таблица, бакет))` - создан новый узел в голове бакета;
    /// `Err((позиция, ключ))` - ключ уже есть.
    fn raw_add(
        &mut self,
        key: K,
    ) -> Result<(usize, usize), (EntryPos, K)> {
        self.rehash_step();

        let hash = self.ty.hash(&key);
        self.expand_if_needed();

        if let Some(pos) = self.find_pos(hash, &key) {
            return Err((pos, key));
        }

        // Во время рехеширования новые ключи идут только в новую таблицу.
        let table = if self.is_rehashing() { 1 } else { 0 };
        let Dict { ty, ht, .. } = self;
        let tbl = &mut ht[table];
        let idx = (hash as usize) & tbl.size_mask;

        let next = tbl.buckets[idx].take();
        tbl.buckets[idx] = Some(Entry::new(ty.key_dup(key), next));
        tbl.used += 1;

        Ok((table, idx))
    }

    // ------------------------------------------------------------------
    // Поиск
    // ------------------------------------------------------------------

    /// Возвращает узел ключа или `None`. Продвигает фоновое
    /// рехеширование на один шаг.
    pub fn find(
        &mut self,
        key: &K,
    ) -> Option<&Entry<K, V>> {
        if self.len() == 0 {
            return None;
        }
        self.rehash_step();
        self.find_ref(key)
    }

    /// Значение ключа или `None`. Продвигает фоновое рехеширование.
    pub fn fetch_value(
        &mut self,
        key: &K,
    ) -> Option<&V> {
        self.find(key).and_then(|e| e.value())
    }

    /// Чтение без продвижения рехеширования (разделяемая ссылка).
    pub fn get(
        &self,
        key: &K,
    ) -> Option<&V> {
        if self.len() == 0 {
            return None;
        }
        self.find_ref(key).and_then(|e| e.value())
    }

    /// Поиск узла по заранее вычисленному хешу и предикату тождества,
    /// минуя `key_compare`. Нужен вызывающим, которые ищут конкретный
    /// экземпляр ключа, а не равный ему.
    pub fn find_entry_by_hash<F>(
        &self,
        hash: u64,
        mut same: F,
    ) -> Option<&Entry<K, V>>
    where
        F: FnMut(&K) -> bool,
    {
        if self.len() == 0 {
            return None;
        }

        for t in 0..=1 {
            let tbl = &self.ht[t];
            if tbl.size() != 0 {
                let idx = (hash as usize) & tbl.size_mask;
                let mut he = tbl.buckets[idx].as_deref();
                while let Some(e) = he {
                    if same(&e.key) {
                        return Some(e);
                    }
                    he = e.next.as_deref();
                }
            }
            if !self.is_rehashing() {
                break;
            }
        }

        None
    }

    fn find_ref(
        &self,
        key: &K,
    ) -> Option<&Entry<K, V>> {
        let hash = self.ty.hash(key);

        for t in 0..=1 {
            let tbl = &self.ht[t];
            if tbl.size() != 0 {
                let idx = (hash as usize) & tbl.size_mask;
                let mut he = tbl.buckets[idx].as_deref();
                while let Some(e) = he {
                    if self.ty.key_compare(key, &e.key) {
                        return Some(e);
                    }
                    he = e.next.as_deref();
                }
            }
            // Если рехеширование не идёт, ключ может быть только в ht[0].
            if !self.is_rehashing() {
                break;
            }
        }

        None
    }

    /// Позиция узла с данным ключом, если он есть. Просматривает обе
    /// таблицы во время рехеширования.
    fn find_pos(
        &self,
        hash: u64,
        key: &K,
    ) -> Option<EntryPos> {
        for t in 0..=1 {
            let tbl = &self.ht[t];
            if tbl.size() != 0 {
                let idx = (hash as usize) & tbl.size_mask;
                let mut he = tbl.buckets[idx].as_deref();
                let mut off = 0;
                while let Some(e) = he {
                    if self.ty.key_compare(key, &e.key) {
                        return Some((t, idx, off));
                    }
                    off += 1;
                    he = e.next.as_deref();
                }
            }
            if !self.is_rehashing() {
                break;
            }
        }

        None
    }

    /// Узел по позиции, полученной из `find_pos` на неизменённом словаре.
    fn entry_at_mut(
        &mut self,
        pos: EntryPos,
    ) -> &mut Entry<K, V> {
        chain_nth_mut(&mut self.ht[pos.0].buckets[pos.1], pos.2).unwrap()
    }

    // ------------------------------------------------------------------
    // Удаление
    // ------------------------------------------------------------------

    /// Удаляет ключ, уничтожая ключ и значение через дескриптор.
    pub fn delete(
        &mut self,
        key: &K,
    ) -> DictResult<()> {
        match self.generic_delete(key) {
            Some(entry) => {
                self.free_unlinked_entry(entry);
                Ok(())
            }
            None => Err(DictError::NotFound),
        }
    }

    /// Отцепляет узел от словаря, не уничтожая ключ и значение: вызывающий
    /// сначала осматривает узел, затем отдаёт его в
    /// `free_unlinked_entry`. Это экономит второй поиск по сравнению с
    /// парой `find` + `delete`.
    pub fn unlink(
        &mut self,
        key: &K,
    ) -> Option<Box<Entry<K, V>>> {
        self.generic_delete(key)
    }

    /// Уничтожает отцепленный ранее узел через хуки дескриптора.
    pub fn free_unlinked_entry(
        &self,
        entry: Box<Entry<K, V>>,
    ) {
        let (key, val) = entry.into_parts();
        self.ty.key_destroy(key);
        if let Some(val) = val {
            self.ty.val_destroy(val);
        }
    }

    /// Поиск и выцепление узла из цепочки. Общий путь `delete` и
    /// `unlink`.
    fn generic_delete(
        &mut self,
        key: &K,
    ) -> Option<Box<Entry<K, V>>> {
        if self.ht[0].used == 0 && self.ht[1].used == 0 {
            return None;
        }

        self.rehash_step();

        let rehashing = self.is_rehashing();
        let Dict { ty, ht, .. } = self;
        let hash = ty.hash(key);

        for t in 0..=1 {
            let tbl = &mut ht[t];
            if tbl.size() == 0 {
                continue;
            }

            let idx = (hash as usize) & tbl.size_mask;
            let mut removed = None;
            let mut cur = &mut tbl.buckets[idx];

            loop {
                match cur {
                    None => break,
                    Some(node) if ty.key_compare(key, &node.key) => {
                        let next = node.next.take();
                        removed = std::mem::replace(cur, next);
                        break;
                    }
                    Some(node) => cur = &mut node.next,
                }
            }

            if removed.is_some() {
                tbl.used -= 1;
                return removed;
            }

            // Без рехеширования вторую таблицу смотреть не нужно.
            if !rehashing {
                break;
            }
        }

        None
    }

    // ------------------------------------------------------------------
    // Очистка
    // ------------------------------------------------------------------

    /// Удаляет все элементы, сохраняя дескриптор. `tick` вызывается на
    /// каждые 65 536 просмотренных бакетов, чтобы долгий снос большой
    /// таблицы мог уступать хост-циклу.
    pub fn empty<F>(
        &mut self,
        mut tick: F,
    ) where
        F: FnMut(),
    {
        let Dict {
            ty,
            ht,
            rehash_idx,
            iterators,
        } = self;

        Self::clear_table(ty, &mut ht[0], &mut tick);
        Self::clear_table(ty, &mut ht[1], &mut tick);
        *rehash_idx = -1;
        iterators.set(0);
    }

    /// Удаляет все элементы, сохраняя дескриптор.
    pub fn clear(&mut self) {
        self.empty(|| ());
    }

    fn clear_table<F>(
        ty: &T,
        tbl: &mut SubTable<K, V>,
        tick: &mut F,
    ) where
        F: FnMut(),
    {
        for i in 0..tbl.size() {
            if tbl.used == 0 {
                break;
            }
            if i & 65_535 == 0 {
                tick();
            }

            let mut he = tbl.buckets[i].take();
            while let Some(mut e) = he {
                he = e.next.take();
                let (key, val) = e.into_parts();
                ty.key_destroy(key);
                if let Some(v) = val {
                    ty.val_destroy(v);
                }
                tbl.used -= 1;
            }
        }

        tbl.reset();
    }

    // ------------------------------------------------------------------
    // Случайная выборка
    // ------------------------------------------------------------------

    /// Случайный узел: равномерно по бакетам, затем равномерно по
    /// цепочке выбранного бакета. Узлы длинных цепочек при этом
    /// недопредставлены, см. `fair_random_key`.
    pub fn random_key(&mut self) -> Option<&Entry<K, V>> {
        if self.len() == 0 {
            return None;
        }
        self.rehash_step();
        self.random_key_ref()
    }

    fn random_key_ref(&self) -> Option<&Entry<K, V>> {
        if self.len() == 0 {
            return None;
        }

        let mut rng = rand::thread_rng();

        let he = if self.is_rehashing() {
            // Бакеты ht[0] до rehash_idx заведомо пусты, диапазон розыгрыша
            // начинается с rehash_idx.
            let base = self.rehash_idx as usize;
            loop {
                let h = base + rng.gen_range(0..self.slots() - base);
                let bucket = if h >= self.ht[0].size() {
                    self.ht[1].buckets[h - self.ht[0].size()].as_deref()
                } else {
                    self.ht[0].buckets[h].as_deref()
                };
                if let Some(e) = bucket {
                    break e;
                }
            }
        } else {
            loop {
                let h = rng.gen::<u64>() as usize & self.ht[0].size_mask;
                if let Some(e) = self.ht[0].buckets[h].as_deref() {
                    break e;
                }
            }
        };

        let len = chain_len(Some(he));
        chain_nth(Some(he), rng.gen_range(0..len))
    }

    /// Выбирает приблизительно `count` узлов из случайных мест таблицы.
    ///
    /// Не гарантирует ни уникальность, ни равномерность, ни даже то, что
    /// при непустом словаре вернётся хоть один узел: бюджет просмотра
    /// ограничен `10 * count` позициями. Зато значительно быстрее
    /// многократного вызова `random_key`.
    pub fn some_keys(
        &mut self,
        count: usize,
    ) -> Vec<&Entry<K, V>> {
        // Продвигаем рехеширование пропорционально размеру выборки.
        for _ in 0..count {
            if !self.is_rehashing() {
                break;
            }
            self.rehash_step();
        }
        self.some_keys_ref(count)
    }

    fn some_keys_ref(
        &self,
        count: usize,
    ) -> Vec<&Entry<K, V>> {
        let count = count.min(self.len());
        let mut stored = Vec::with_capacity(count);
        if count == 0 {
            return stored;
        }

        let mut rng = rand::thread_rng();

        let tables = if self.is_rehashing() { 2 } else { 1 };
        let mut maxsizemask = self.ht[0].size_mask;
        if tables > 1 && maxsizemask < self.ht[1].size_mask {
            maxsizemask = self.ht[1].size_mask;
        }

        let mut i = rng.gen::<u64>() as usize & maxsizemask;
        let mut emptylen = 0usize;
        let mut maxsteps = count * 10;

        while stored.len() < count && maxsteps > 0 {
            maxsteps -= 1;

            for j in 0..tables {
                // Бакеты ht[0] до rehash_idx пусты по инварианту
                // рехеширования, их можно пропустить.
                if tables == 2 && j == 0 && i < self.rehash_idx as usize {
                    // Если индекс вышел и за границы новой таблицы, до
                    // rehash_idx элементов нет нигде: перескакиваем.
                    if i >= self.ht[1].size() {
                        i = self.rehash_idx as usize;
                    } else {
                        continue;
                    }
                }
                if i >= self.ht[j].size() {
                    continue;
                }

                let mut he = self.ht[j].buckets[i].as_deref();
                if he.is_none() {
                    // Длинная полоса пустых бакетов: прыгаем в новое
                    // случайное место.
                    emptylen += 1;
                    if emptylen >= 5 && emptylen > count {
                        i = rng.gen::<u64>() as usize & maxsizemask;
                        emptylen = 0;
                    }
                } else {
                    emptylen = 0;
                    while let Some(e) = he {
                        stored.push(e);
                        if stored.len() == count {
                            return stored;
                        }
                        he = e.next.as_deref();
                    }
                }
            }

            i = (i + 1) & maxsizemask;
        }

        stored
    }

    /// Как `random_key`, но с поправкой на длину цепочек: набирает пул из
    /// `some_keys` и выбирает из него равномерно. При пустом пуле (такое
    /// возможно на разреженной таблице) откатывается к `random_key`.
    pub fn fair_random_key(&mut self) -> Option<&Entry<K, V>> {
        for _ in 0..GETFAIR_NUM_ENTRIES {
            if !self.is_rehashing() {
                break;
            }
            self.rehash_step();
        }

        let entries = self.some_keys_ref(GETFAIR_NUM_ENTRIES);
        if entries.is_empty() {
            return self.random_key_ref();
        }

        let idx = rand::thread_rng().gen_range(0..entries.len());
        Some(entries[idx])
    }
}

impl<K, V, T> Drop for Dict<K, V, T>
where
    T: DictType<K, V>,
{
    fn drop(&mut self) {
        self.clear();
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
