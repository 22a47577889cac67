/// Один элемент в цепочке коллизий.
///
/// Значение хранится как `Option<V>`: низкоуровневая вставка (`add_raw`)
/// возвращает узел с незаполненной ячейкой, которую вызывающий код
/// заполняет сам.
#[derive(Debug)]
pub struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) val: Option<V>,
    pub(crate) next: Option<Box<Entry<K, V>>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<K, V> Entry<K, V> {
    /// Создаёт новый элемент цепочки с пустой ячейкой значения.
    pub(crate) fn new(
        key: K,
        next: Option<Box<Entry<K, V>>>,
    ) -> Box<Self> {
        Box::new(Entry {
            key,
            val: None,
            next,
        })
    }

    /// Возвращает ссылку на ключ.
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Возвращает ссылку на значение, если оно заполнено.
    #[inline]
    pub fn value(&self) -> Option<&V> {
        self.val.as_ref()
    }

    /// Возвращает изменяемую ссылку на значение, если оно заполнено.
    #[inline]
    pub fn value_mut(&mut self) -> Option<&mut V> {
        self.val.as_mut()
    }

    /// Записывает значение напрямую, без вызова `val_dup`. Возвращает
    /// прежнее содержимое ячейки.
    #[inline]
    pub fn set_value(
        &mut self,
        val: V,
    ) -> Option<V> {
        self.val.replace(val)
    }

    /// Разбирает узел на ключ и значение. Узел должен быть отцеплен от
    /// цепочки.
    pub(crate) fn into_parts(self) -> (K, Option<V>) {
        debug_assert!(self.next.is_none());
        (self.key, self.val)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Обход цепочек
////////////////////////////////////////////////////////////////////////////////

/// Длина цепочки, начиная с `head`.
pub(crate) fn chain_len<K, V>(head: Option<&Entry<K, V>>) -> usize {
    let mut n = 0;
    let mut cur = head;

    while let Some(e) = cur {
        n += 1;
        cur = e.next.as_deref();
    }

    n
}

/// `n`-й узел цепочки, считая от головы.
pub(crate) fn chain_nth<'a, K, V>(
    head: Option<&'a Entry<K, V>>,
    mut n: usize,
) -> Option<&'a Entry<K, V>> {
    let mut cur = head;

    while let Some(e) = cur {
        if n == 0 {
            return Some(e);
        }
        n -= 1;
        cur = e.next.as_deref();
    }

    None
}

/// `n`-й узел цепочки, изменяемая версия.
pub(crate) fn chain_nth_mut<'a, K, V>(
    head: &'a mut Option<Box<Entry<K, V>>>,
    mut n: usize,
) -> Option<&'a mut Entry<K, V>> {
    let mut cur = head.as_deref_mut();

    while let Some(e) = cur {
        if n == 0 {
            return Some(e);
        }
        n -= 1;
        cur = e.next.as_deref_mut();
    }

    None
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
