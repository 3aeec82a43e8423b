//! Result cache behaviour through the executor.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{sales_backend, sales_engine, value_at, MemoryBackend};
use sqlcube::cache::{CacheStats, EmptyQueryCache, InMemoryQueryCache, QueryCache};
use sqlcube::engine::{Backend, SqlQueryEngine};
use sqlcube::executor::QueryExecutor;
use sqlcube::model::functions::*;
use sqlcube::model::{CacheAction, Datastore, Measure, Parameter, Query, QueryDto, Value, CACHE_PARAMETER_KEY};
use sqlcube::sql::{DatabaseQuery, Dialect};
use sqlcube::table::ColumnarTable;
use sqlcube::QueryResult;

fn setup() -> (Arc<SqlQueryEngine<MemoryBackend>>, QueryExecutor) {
    let engine = sales_engine(Dialect::DuckDb);
    let executor = QueryExecutor::new(engine.clone(), Arc::new(InMemoryQueryCache::default()));
    (engine, executor)
}

fn by_scenario(measures: Vec<Measure>) -> QueryDto {
    Query::from("sales")
        .select(tfs(&["scenario"]), measures)
        .build()
}

fn with_action(query: QueryDto, action: CacheAction) -> QueryDto {
    let mut query = query;
    query
        .parameters
        .insert(CACHE_PARAMETER_KEY.to_string(), Parameter::QueryCache { action });
    query
}

#[tokio::test]
async fn test_second_execution_runs_no_sql() {
    let (engine, executor) = setup();
    let query = by_scenario(vec![sum("p", tf("price"))]);

    let first = executor.execute(&query).await.unwrap();
    let second = executor.execute(&query).await.unwrap();

    assert_eq!(engine.backend().statements().len(), 1);
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(
        executor.cache().stats(),
        CacheStats {
            hit_count: 1,
            miss_count: 1,
            size: 1,
        }
    );
}

#[tokio::test]
async fn test_partial_hit_computes_only_missing_measures() {
    let (engine, executor) = setup();
    executor
        .execute(&by_scenario(vec![sum("p", tf("price"))]))
        .await
        .unwrap();

    let table = executor
        .execute(&by_scenario(vec![sum("p", tf("price")), sum("q", tf("quantity"))]))
        .await
        .unwrap();

    let statements = engine.backend().statements();
    assert_eq!(statements.len(), 2);
    assert!(statements[1].contains(r#"sum("quantity")"#), "{}", statements[1]);
    assert!(!statements[1].contains(r#"sum("price")"#), "{}", statements[1]);

    let names: Vec<&str> = table.headers().iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["scenario", "p", "q"]);
    assert_eq!(value_at(&table, &["s1"], "p"), Value::Float(12.0));
    assert_eq!(value_at(&table, &["s1"], "q"), Value::Int(37));
    assert_eq!(executor.cache().stats().size, 2);
}

#[tokio::test]
async fn test_full_cache_keeps_partial_hits() {
    let engine = sales_engine(Dialect::DuckDb);
    let cache = Arc::new(InMemoryQueryCache::new(1));
    let executor = QueryExecutor::new(engine.clone(), cache.clone());
    executor
        .execute(&by_scenario(vec![sum("p", tf("price"))]))
        .await
        .unwrap();

    // Storing q evicts p, which was just counted as a hit.
    let table = executor
        .execute(&by_scenario(vec![sum("p", tf("price")), sum("q", tf("quantity"))]))
        .await
        .unwrap();

    let statements = engine.backend().statements();
    assert_eq!(statements.len(), 2);
    assert!(!statements[1].contains(r#"sum("price")"#), "{}", statements[1]);
    assert_eq!(value_at(&table, &["s1"], "p"), Value::Float(12.0));
    assert_eq!(value_at(&table, &["s1"], "q"), Value::Int(37));
    assert_eq!(cache.stats().size, 1);
    assert_eq!(cache.scope_lock_count(), 0);
}

/// Backend answering after a delay, so concurrent requests overlap.
struct DelayedBackend(MemoryBackend);

#[async_trait]
impl Backend for DelayedBackend {
    fn datastore(&self) -> &Datastore {
        self.0.datastore()
    }

    async fn execute(&self, sql: &str, query: &DatabaseQuery) -> QueryResult<ColumnarTable> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.0.execute(sql, query).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_requests_compute_a_scope_once() {
    let engine = Arc::new(SqlQueryEngine::new(DelayedBackend(sales_backend(true)), Dialect::DuckDb));
    let executor = QueryExecutor::new(engine.clone(), Arc::new(InMemoryQueryCache::default()));
    let query = by_scenario(vec![sum("p", tf("price"))]);

    let (first, second) = tokio::join!(executor.execute(&query), executor.execute(&query));
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(engine.backend().0.statements().len(), 1);
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(
        executor.cache().stats(),
        CacheStats {
            hit_count: 1,
            miss_count: 1,
            size: 1,
        }
    );
}

#[tokio::test]
async fn test_different_scopes_do_not_share_entries() {
    let (engine, executor) = setup();
    let measures = vec![sum("p", tf("price"))];
    executor.execute(&by_scenario(measures.clone())).await.unwrap();

    let filtered = Query::from("sales")
        .where_(criterion(tf("category"), eq("food")))
        .select(tfs(&["scenario"]), measures)
        .build();
    let table = executor.execute(&filtered).await.unwrap();

    assert_eq!(engine.backend().statements().len(), 2);
    assert_eq!(value_at(&table, &["base"], "p"), Value::Float(5.0));
}

#[tokio::test]
async fn test_not_use_bypasses_the_cache() {
    let (engine, executor) = setup();
    let query = with_action(by_scenario(vec![sum("p", tf("price"))]), CacheAction::NotUse);

    executor.execute(&query).await.unwrap();
    executor.execute(&query).await.unwrap();

    assert_eq!(engine.backend().statements().len(), 2);
    assert_eq!(executor.cache().stats().size, 0);
}

#[tokio::test]
async fn test_invalidate_clears_before_running() {
    let (engine, executor) = setup();
    let query = by_scenario(vec![sum("p", tf("price"))]);
    executor.execute(&query).await.unwrap();
    executor.execute(&query).await.unwrap();

    executor
        .execute(&with_action(query.clone(), CacheAction::Invalidate))
        .await
        .unwrap();

    assert_eq!(engine.backend().statements().len(), 2);
    assert_eq!(
        executor.cache().stats(),
        CacheStats {
            hit_count: 0,
            miss_count: 1,
            size: 1,
        }
    );
}

#[tokio::test]
async fn test_cached_totals_are_merged_by_point() {
    let (engine, executor) = setup();
    let query = Query::from("sales")
        .select(tfs(&["scenario", "category"]), vec![sum("p", tf("price"))])
        .rollup(tfs(&["category"]))
        .build();
    executor.execute(&query).await.unwrap();
    let table = executor.execute(&query).await.unwrap();

    assert_eq!(engine.backend().statements().len(), 1);
    assert_eq!(value_at(&table, &["base", "___total___"], "p"), Value::Float(10.0));
    assert_eq!(value_at(&table, &["s2", "food"], "p"), Value::Float(0.5));
}

#[tokio::test]
async fn test_disabled_cache_reports_no_stats() {
    let engine = sales_engine(Dialect::Generic);
    let executor = QueryExecutor::new(engine.clone(), Arc::new(EmptyQueryCache));
    let query = by_scenario(vec![count()]);
    executor.execute(&query).await.unwrap();
    executor.execute(&query).await.unwrap();

    assert_eq!(engine.backend().statements().len(), 2);
    assert!(executor.cache().stats().is_disabled());
}

#[test]
fn test_cache_capacity_is_bounded() {
    let cache = InMemoryQueryCache::new(0);
    assert_eq!(cache.max_entries(), 1);
    assert_eq!(cache.stats().size, 0);
}
