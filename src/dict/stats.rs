//! Chain-length statistics over the dictionary tables.

use std::fmt::{self, Display};

use super::{dict_base::Dict, table::SubTable, types::DictType};

/// Длина гистограммы распределения длин цепочек. Цепочки длиннее
/// собираются в последнюю корзину.
pub const STATS_VECTLEN: usize = 50;

/// Статистика одной хеш-таблицы.
#[derive(Debug, Clone)]
pub struct HtStats {
    /// 0 для основной таблицы, 1 для цели рехеширования.
    pub table_id: usize,
    /// Количество бакетов.
    pub size: usize,
    /// Количество элементов.
    pub used: usize,
    /// Количество непустых бакетов.
    pub slots: usize,
    /// Длина самой длинной цепочки.
    pub max_chain_len: usize,
    /// Средняя длина цепочки по подсчёту узлов.
    pub avg_chain_len_counted: f64,
    /// Средняя длина цепочки по счётчику `used`.
    pub avg_chain_len_computed: f64,
    /// Число бакетов для каждой длины цепочки; корзина 0 - пустые бакеты.
    pub clvector: [usize; STATS_VECTLEN],
}

/// Статистика словаря: основная таблица и, во время рехеширования, цель
/// миграции.
#[derive(Debug, Clone)]
pub struct DictStats {
    pub main: HtStats,
    pub rehashing: Option<HtStats>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<K, V, T> Dict<K, V, T>
where
    T: DictType<K, V>,
{
    /// Снимок статистики обеих таблиц.
    pub fn stats(&self) -> DictStats {
        DictStats {
            main: ht_stats(&self.ht[0], 0),
            rehashing: if self.is_rehashing() {
                Some(ht_stats(&self.ht[1], 1))
            } else {
                None
            },
        }
    }
}

fn ht_stats<K, V>(
    tbl: &SubTable<K, V>,
    table_id: usize,
) -> HtStats {
    let mut stats = HtStats {
        table_id,
        size: tbl.size(),
        used: tbl.used,
        slots: 0,
        max_chain_len: 0,
        avg_chain_len_counted: 0.0,
        avg_chain_len_computed: 0.0,
        clvector: [0; STATS_VECTLEN],
    };

    if tbl.used == 0 {
        return stats;
    }

    let mut tot_chain_len = 0usize;

    for bucket in &tbl.buckets {
        let mut chain_len = 0usize;
        let mut he = bucket.as_deref();
        while let Some(e) = he {
            chain_len += 1;
            he = e.next.as_deref();
        }

        if chain_len == 0 {
            stats.clvector[0] += 1;
            continue;
        }

        stats.slots += 1;
        stats.clvector[chain_len.min(STATS_VECTLEN - 1)] += 1;
        stats.max_chain_len = stats.max_chain_len.max(chain_len);
        tot_chain_len += chain_len;
    }

    stats.avg_chain_len_counted = tot_chain_len as f64 / stats.slots as f64;
    stats.avg_chain_len_computed = tbl.used as f64 / stats.slots as f64;
    stats
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Display for HtStats {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.used == 0 {
            return writeln!(f, "No stats available for empty dictionaries");
        }

        writeln!(
            f,
            "Hash table {} stats ({}):",
            self.table_id,
            if self.table_id == 0 {
                "main hash table"
            } else {
                "rehashing target"
            }
        )?;
        writeln!(f, " table size: {}", self.size)?;
        writeln!(f, " number of elements: {}", self.used)?;
        writeln!(f, " different slots: {}", self.slots)?;
        writeln!(f, " max chain length: {}", self.max_chain_len)?;
        writeln!(f, " avg chain length (counted): {:.2}", self.avg_chain_len_counted)?;
        writeln!(f, " avg chain length (computed): {:.2}", self.avg_chain_len_computed)?;
        writeln!(f, " Chain length distribution:")?;

        for (len, &buckets) in self.clvector.iter().enumerate() {
            if buckets == 0 {
                continue;
            }
            writeln!(
                f,
                "   {}{}: {} ({:.2}%)",
                if len == STATS_VECTLEN - 1 { ">= " } else { "" },
                len,
                buckets,
                buckets as f64 / self.size as f64 * 100.0
            )?;
        }

        Ok(())
    }
}

impl Display for DictStats {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        self.main.fmt(f)?;
        if let Some(rehashing) = &self.rehashing {
            rehashing.fmt(f)?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
