//! In-process cache backed by concurrent maps.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{CacheError, CacheKey, CacheResult, CacheStats, QueryCache};
use crate::model::{Measure, Value};
use crate::plan::ScopeKey;
use crate::table::{ColumnarTable, Header};

/// Default bound on the number of `(measure, scope)` entries.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug)]
struct Entry {
    /// Insertion sequence, for eviction order.
    seq: u64,
    table: Arc<ColumnarTable>,
}

/// Cache shared by every request of an executor.
///
/// Holds at most `max_entries` entries and evicts the oldest insertion first.
#[derive(Debug)]
pub struct InMemoryQueryCache {
    entries: DashMap<CacheKey, Entry>,
    locks: DashMap<ScopeKey, Arc<Mutex<()>>>,
    max_entries: usize,
    seq: AtomicU64,
    hits: AtomicI64,
    misses: AtomicI64,
}

impl Default for InMemoryQueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl InMemoryQueryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            locks: DashMap::new(),
            max_entries: max_entries.max(1),
            seq: AtomicU64::new(0),
            hits: AtomicI64::new(0),
            misses: AtomicI64::new(0),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Number of scope locks currently tracked.
    pub fn scope_lock_count(&self) -> usize {
        self.locks.len()
    }

    fn evict_if_full(&self) {
        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.value().seq)
                .map(|e| e.key().clone());
            match oldest {
                Some(key) => {
                    warn!(scope = %key.scope, max_entries = self.max_entries, "evicting cache entry");
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl QueryCache for InMemoryQueryCache {
    fn contains(&self, measure: &Measure, scope: &ScopeKey) -> bool {
        match CacheKey::new(measure, scope) {
            Ok(key) => self.entries.contains_key(&key),
            Err(_) => false,
        }
    }

    fn create_raw_result(&self, scope: &ScopeKey) -> CacheResult<ColumnarTable> {
        let table = self
            .entries
            .iter()
            .find(|e| &e.key().scope == scope)
            .map(|e| Arc::clone(&e.value().table))
            .ok_or_else(|| CacheError::NotCached {
                measure: "*".to_string(),
                scope: scope.clone(),
            })?;
        let grouping: Vec<String> = table
            .grouping_headers()
            .into_iter()
            .map(|h| h.name.clone())
            .collect();
        Ok(table.project(&grouping)?)
    }

    fn contribute_to_cache(
        &self,
        result: &ColumnarTable,
        measures: &[Measure],
        scope: &ScopeKey,
    ) -> CacheResult<()> {
        let grouping: Vec<String> = result
            .grouping_headers()
            .into_iter()
            .map(|h| h.name.clone())
            .collect();
        for measure in measures {
            let mut columns = grouping.clone();
            columns.push(measure.alias().to_string());
            let table = Arc::new(result.project(&columns)?);
            let key = CacheKey::new(measure, scope)?;
            self.evict_if_full();
            let seq = self.seq.fetch_add(1, Ordering::Relaxed);
            self.entries.insert(key, Entry { seq, table });
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(scope = %scope, measure = measure.alias(), "cached measure");
        }
        Ok(())
    }

    fn contribute_to_result(
        &self,
        result: &mut ColumnarTable,
        measures: &[Measure],
        scope: &ScopeKey,
    ) -> CacheResult<()> {
        for measure in measures {
            let key = CacheKey::new(measure, scope)?;
            let cached = self
                .entries
                .get(&key)
                .map(|e| Arc::clone(&e.value().table))
                .ok_or_else(|| CacheError::NotCached {
                    measure: measure.alias().to_string(),
                    scope: scope.clone(),
                })?;

            let cached_grouping = cached.grouping_indices();
            let index: HashMap<Vec<Value>, usize> = (0..cached.row_count())
                .map(|r| (cached.values_at(r, &cached_grouping), r))
                .collect();
            let target_indices = cached_grouping
                .iter()
                .map(|&i| {
                    let name = &cached.headers()[i].name;
                    result
                        .column_index(name)
                        .ok_or_else(|| crate::table::TableError::UnknownColumn(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let header = cached.header(measure.alias())?.clone();
            let source = cached.column(measure.alias())?;
            let values = (0..result.row_count())
                .map(|r| {
                    index
                        .get(&result.values_at(r, &target_indices))
                        .map(|&row| source[row].clone())
                        .unwrap_or(Value::Null)
                })
                .collect();
            result.add_column(Header::measure(header.name, header.field_type), values)?;
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(scope = %scope, measure = measure.alias(), "cache hit");
        }
        Ok(())
    }

    fn clear(&self) {
        self.entries.clear();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            size: self.entries.len() as i64,
        }
    }

    fn scope_lock(&self, scope: &ScopeKey) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(scope.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    fn release_scope_lock(&self, scope: &ScopeKey) {
        self.locks.remove_if(scope, |_, lock| Arc::strong_count(lock) == 1);
    }
}
