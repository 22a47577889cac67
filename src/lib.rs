//! Zdict - an in-memory dictionary with incremental rehashing.
//!
//! The container keeps two hash tables and migrates buckets between them
//! one at a time, piggy-backed on ordinary operations, so growing or
//! shrinking a large table never stalls the host event loop. A stateless
//! cursor scan based on a reverse-binary counter survives table resizes
//! without missing entries.
//!
//! Main modules:
//! - `dict`: the dictionary core (tables, rehash machinery, iterators,
//!   scan, random sampling, stats)
//! - `error`: operation error types
//!
//! The container assumes a single mutator: no locks, no atomics on the
//! hot path, suitable for cooperative event-loop hosts.

/// Dictionary core: tables, rehashing, iterators, scan, sampling, stats.
pub mod dict;
/// Operation errors and result types.
pub mod error;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// The dictionary, its descriptor trait and the default SipHash descriptor.
pub use dict::{
    disable_resize, enable_resize, get_hash_seed, set_hash_seed, Dict, DictIterator, DictStats,
    DictType, Entry, HtStats, Iter, RawAdd, SipDict, SipHashType, STATS_VECTLEN,
};

/// Operation errors and result types.
pub use error::{DictError, DictResult};
