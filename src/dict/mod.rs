//! Dictionary core: two hash tables with incremental rehashing.
//!
//! - `dict_base`: the dictionary itself and its operations.
//! - `entry`: chain nodes.
//! - `iter`: plain and stateful (safe/unsafe) iterators.
//! - `scan`: stateless resize-tolerant cursor scan.
//! - `stats`: chain-length statistics.
//! - `types`: the type descriptor trait, the default SipHash descriptor
//!   and the process-wide hash seed.

pub mod dict_base;
pub mod entry;
pub mod iter;
pub mod scan;
pub mod stats;
pub mod types;

mod table;

// Публичный экспорт основных типов из вложенных модулей, чтобы упростить
// доступ к ним из внешнего кода.
pub use dict_base::{disable_resize, enable_resize, Dict, RawAdd, SipDict};
pub use entry::Entry;
pub use iter::{DictIterator, Iter};
pub use stats::{DictStats, HtStats, STATS_VECTLEN};
pub use types::{get_hash_seed, set_hash_seed, DictType, SipHashType};
