//! Content-addressed result cache.
//!
//! Single-node, file-backed key/value store keyed by media fingerprints.
//! Entries carry an optional TTL; in-memory counters feed the stats
//! endpoint. There is no per-key locking: two concurrent requests for the
//! same cold key may both miss and duplicate work, which is accepted
//! because the stored value is identical either way.

pub mod error;
pub mod store;

pub use error::{CacheError, CacheResult};
pub use store::{AnalysisCache, CacheStats, DEFAULT_ANALYSIS_TTL};
