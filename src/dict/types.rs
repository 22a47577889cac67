use std::hash::{Hash, Hasher};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rand::RngCore;
use siphasher::sip::SipHasher13;

/// Дескриптор типа словаря.
///
/// Словарь ничего не знает о представлении ключей и значений: хеширование,
/// сравнение, копирование и уничтожение делегируются этому трейту. Методы
/// `*_dup` вызываются при вставке, `*_destroy` при удалении и очистке.
///
/// Обязательны только `hash` и `key_compare`. Реализации по умолчанию:
/// `key_dup`/`val_dup` передают значение как есть, `key_destroy`/
/// `val_destroy` просто освобождают его.
pub trait DictType<K, V> {
    /// Хеш ключа. Вызывается при каждой вставке, поиске и удалении.
    fn hash(&self, key: &K) -> u64;

    /// Сравнение ключей. Вызывается для каждого узла просматриваемой
    /// цепочки.
    fn key_compare(&self, a: &K, b: &K) -> bool;

    /// Подготовка ключа перед сохранением в словаре.
    fn key_dup(&self, key: K) -> K {
        key
    }

    /// Подготовка значения перед сохранением в словаре.
    fn val_dup(&self, val: V) -> V {
        val
    }

    /// Уничтожение ключа, изъятого из словаря.
    fn key_destroy(&self, key: K) {
        drop(key);
    }

    /// Уничтожение значения, изъятого из словаря.
    fn val_destroy(&self, val: V) {
        drop(val);
    }
}

////////////////////////////////////////////////////////////////////////////////
// Глобальный seed хеш-функции
////////////////////////////////////////////////////////////////////////////////

/// Общепроцессный 16-байтовый seed. Инициализируется случайно при первом
/// обращении; сервер может перезаписать его один раз на старте.
static HASH_SEED: Lazy<RwLock<[u8; 16]>> = Lazy::new(|| {
    let mut seed = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut seed);
    RwLock::new(seed)
});

/// Перезаписывает общепроцессный seed хеш-функции.
///
/// Дескрипторы снимают копию seed в момент создания, поэтому смена seed
/// не влияет на уже существующие словари.
pub fn set_hash_seed(seed: [u8; 16]) {
    *HASH_SEED.write() = seed;
}

/// Возвращает текущий общепроцессный seed хеш-функции.
pub fn get_hash_seed() -> [u8; 16] {
    *HASH_SEED.read()
}

////////////////////////////////////////////////////////////////////////////////
// Дескриптор по умолчанию
////////////////////////////////////////////////////////////////////////////////

/// Дескриптор по умолчанию: SipHash-1-3 с ключом из 16-байтового seed,
/// сравнение через `Eq`.
///
/// `new()` берёт общепроцессный seed, `with_seed()` принимает явный,
/// что делает хеширование в тестах детерминированным.
#[derive(Debug, Clone, Copy)]
pub struct SipHashType {
    k0: u64,
    k1: u64,
}

impl SipHashType {
    pub fn new() -> Self {
        Self::with_seed(get_hash_seed())
    }

    pub fn with_seed(seed: [u8; 16]) -> Self {
        let mut k0 = [0u8; 8];
        let mut k1 = [0u8; 8];
        k0.copy_from_slice(&seed[..8]);
        k1.copy_from_slice(&seed[8..]);

        SipHashType {
            k0: u64::from_le_bytes(k0),
            k1: u64::from_le_bytes(k1),
        }
    }
}

impl Default for SipHashType {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> DictType<K, V> for SipHashType
where
    K: Hash + Eq,
{
    fn hash(&self, key: &K) -> u64 {
        let mut h = SipHasher13::new_with_keys(self.k0, self.k1);
        key.hash(&mut h);
        h.finish()
    }

    fn key_compare(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// Одинаковый seed даёт одинаковые хеши, разный - как правило разные.
    #[test]
    fn sip_hash_is_seeded() {
        let a = SipHashType::with_seed([1; 16]);
        let b = SipHashType::with_seed([1; 16]);
        let c = SipHashType::with_seed([2; 16]);

        let ha = DictType::<u64, ()>::hash(&a, &42);
        let hb = DictType::<u64, ()>::hash(&b, &42);
        let hc = DictType::<u64, ()>::hash(&c, &42);

        assert_eq!(ha, hb);
        assert_ne!(ha, hc);
    }

    /// Дефолтные реализации dup/destroy передают значение как есть.
    #[test]
    fn default_dup_is_identity() {
        let ty = SipHashType::with_seed([0; 16]);
        let key = String::from("k");
        let dup: String = DictType::<String, ()>::key_dup(&ty, key.clone());
        assert_eq!(dup, key);
    }
}
