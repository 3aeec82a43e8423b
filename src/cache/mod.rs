//! Result cache.
//!
//! Memoizes database measure results per `(measure, scope)` pair. A cached
//! entry is a table restricted to the scope's grouping columns and the
//! measure's column, so partial hits can be merged into a fresh result.
//!
//! # Contract
//!
//! ```text
//! contains(measure, scope)                    -> bool
//! create_raw_result(scope)                    -> grouping columns of a cached scope
//! contribute_to_cache(result, measures, scope)   store one entry per measure
//! contribute_to_result(result, measures, scope)  merge cached columns by point
//! clear(), stats()
//! ```
//!
//! [`EmptyQueryCache`] is the disabled variant: every lookup misses, writes are
//! discarded and statistics report `(-1, -1, -1)`.

mod empty;
mod hash;
mod memory;

pub use empty::EmptyQueryCache;
pub use hash::{compute_hash, measure_key};
pub use memory::{InMemoryQueryCache, DEFAULT_MAX_ENTRIES};

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::model::Measure;
use crate::plan::ScopeKey;
use crate::table::{ColumnarTable, TableError};

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Measure '{measure}' is not cached for scope {scope}")]
    NotCached { measure: String, scope: ScopeKey },

    #[error("Cache is disabled")]
    Disabled,

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Hit, miss and size counters. All three are `-1` when caching is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hit_count: i64,
    pub miss_count: i64,
    pub size: i64,
}

impl CacheStats {
    pub const DISABLED: CacheStats = CacheStats {
        hit_count: -1,
        miss_count: -1,
        size: -1,
    };

    pub fn is_disabled(&self) -> bool {
        *self == Self::DISABLED
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} size={}",
            self.hit_count, self.miss_count, self.size
        )
    }
}

/// Key of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub scope: ScopeKey,
    pub measure: String,
}

impl CacheKey {
    pub fn new(measure: &Measure, scope: &ScopeKey) -> CacheResult<Self> {
        Ok(Self {
            scope: scope.clone(),
            measure: measure_key(measure)?,
        })
    }
}

/// Shared result cache. Implementations must be safe under concurrent access.
pub trait QueryCache: Send + Sync + fmt::Debug {
    fn contains(&self, measure: &Measure, scope: &ScopeKey) -> bool;

    /// Grouping columns of a scope, rebuilt from cached entries.
    fn create_raw_result(&self, scope: &ScopeKey) -> CacheResult<ColumnarTable>;

    /// Store each measure column of `result` with the grouping columns.
    fn contribute_to_cache(
        &self,
        result: &ColumnarTable,
        measures: &[Measure],
        scope: &ScopeKey,
    ) -> CacheResult<()>;

    /// Append the cached columns of `measures` to `result`, aligned on the
    /// grouping values of each row. Rows absent from the cache get `NULL`.
    fn contribute_to_result(
        &self,
        result: &mut ColumnarTable,
        measures: &[Measure],
        scope: &ScopeKey,
    ) -> CacheResult<()>;

    fn clear(&self);

    fn stats(&self) -> CacheStats;

    /// Lock held while a scope is computed, so concurrent requests for the
    /// same scope run its SQL once.
    fn scope_lock(&self, scope: &ScopeKey) -> Arc<Mutex<()>>;

    /// Forget the lock of `scope` if nobody holds it anymore.
    fn release_scope_lock(&self, _scope: &ScopeKey) {}
}
