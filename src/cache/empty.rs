use std::sync::Arc;

use tokio::sync::Mutex;

use super::{CacheError, CacheResult, CacheStats, QueryCache};
use crate::model::Measure;
use crate::plan::ScopeKey;
use crate::table::ColumnarTable;

/// Cache used when caching is disabled for a request: nothing is stored and
/// every lookup misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyQueryCache;

impl QueryCache for EmptyQueryCache {
    fn contains(&self, _measure: &Measure, _scope: &ScopeKey) -> bool {
        false
    }

    fn create_raw_result(&self, _scope: &ScopeKey) -> CacheResult<ColumnarTable> {
        Err(CacheError::Disabled)
    }

    fn contribute_to_cache(
        &self,
        _result: &ColumnarTable,
        _measures: &[Measure],
        _scope: &ScopeKey,
    ) -> CacheResult<()> {
        Ok(())
    }

    fn contribute_to_result(
        &self,
        _result: &mut ColumnarTable,
        measures: &[Measure],
        _scope: &ScopeKey,
    ) -> CacheResult<()> {
        if measures.is_empty() {
            Ok(())
        } else {
            Err(CacheError::Disabled)
        }
    }

    fn clear(&self) {}

    fn stats(&self) -> CacheStats {
        CacheStats::DISABLED
    }

    fn scope_lock(&self, _scope: &ScopeKey) -> Arc<Mutex<()>> {
        Arc::new(Mutex::new(()))
    }
}
