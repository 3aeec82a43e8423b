//! End-to-end execution over the in-memory backend.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{rows, sales_backend, sales_engine, value_at, MemoryBackend};
use sqlcube::cache::{InMemoryQueryCache, QueryCache};
use sqlcube::config::Settings;
use sqlcube::engine::{Backend, QueryEngine, SqlQueryEngine};
use sqlcube::executor::QueryExecutor;
use sqlcube::model::functions::*;
use sqlcube::model::{ColumnSet, ComparisonMethod, Datastore, Period, Query, Transformer, Value};
use sqlcube::sql::{DatabaseQuery, Dialect, QueryRewriter};
use sqlcube::table::ColumnarTable;
use sqlcube::{QueryError, QueryResult};
use tokio::sync::watch;

fn executor(dialect: Dialect) -> (Arc<SqlQueryEngine<MemoryBackend>>, QueryExecutor) {
    let engine = sales_engine(dialect);
    let executor = QueryExecutor::new(engine.clone(), Arc::new(InMemoryQueryCache::default()));
    (engine, executor)
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_binary_measures_are_computed_in_memory() {
    let (_, executor) = executor(Dialect::DuckDb);
    let query = Query::from("sales")
        .select(
            tfs(&["scenario"]),
            vec![
                divide("unit", sum("p", tf("price")), sum("q", tf("quantity"))),
                plus("qq", measure_ref("q"), measure_ref("q")),
            ],
        )
        .build();
    let table = executor.execute(&query).await.unwrap();

    let names: Vec<&str> = table.headers().iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["scenario", "unit", "qq"]);
    assert_eq!(value_at(&table, &["base"], "unit"), Value::Float(10.0 / 37.0));
    assert_eq!(value_at(&table, &["s2"], "qq"), Value::Int(60));
}

#[tokio::test]
async fn test_default_order_puts_totals_first() {
    let (_, executor) = executor(Dialect::DuckDb);
    let query = Query::from("sales")
        .select(tfs(&["category"]), vec![sum("q", tf("quantity"))])
        .rollup(tfs(&["category"]))
        .build();
    let table = executor.execute(&query).await.unwrap();
    assert_eq!(
        rows(&table),
        vec![
            strings(&["___total___", "104"]),
            strings(&["drink", "40"]),
            strings(&["food", "64"]),
        ]
    );
}

#[tokio::test]
async fn test_explicit_and_descending_orders() {
    let (_, executor) = executor(Dialect::Generic);
    let query = Query::from("sales")
        .select(tfs(&["scenario", "category"]), vec![count()])
        .order_by(tf("category"), explicit(["food"]))
        .order_by(tf("scenario"), desc())
        .build();
    let table = executor.execute(&query).await.unwrap();
    let points: Vec<Vec<String>> = rows(&table).into_iter().map(|r| r[..2].to_vec()).collect();
    assert_eq!(
        points,
        vec![
            strings(&["s2", "food"]),
            strings(&["s1", "food"]),
            strings(&["base", "food"]),
            strings(&["s2", "drink"]),
            strings(&["s1", "drink"]),
            strings(&["base", "drink"]),
        ]
    );
}

#[tokio::test]
async fn test_bucket_column_set_adds_leading_column() {
    let (_, executor) = executor(Dialect::DuckDb);
    let query = Query::from("sales")
        .select(tfs(&["scenario"]), vec![sum("p", tf("price"))])
        .column_set(
            ColumnSet::bucket("group", tf("scenario"))
                .with_bucket("group1", vec!["base".into(), "s1".into()])
                .with_bucket("group2", vec!["base".into(), "s2".into()]),
        )
        .build();
    let table = executor.execute(&query).await.unwrap();
    assert_eq!(
        rows(&table),
        vec![
            strings(&["group1", "base", "10"]),
            strings(&["group1", "s1", "12"]),
            strings(&["group2", "base", "10"]),
            strings(&["group2", "s2", "1.5"]),
        ]
    );
}

#[tokio::test]
async fn test_vector_measure_follows_axis_order() {
    let (_, executor) = executor(Dialect::DuckDb);
    let query = Query::from("sales")
        .select(
            tfs(&["scenario"]),
            vec![
                vector_tuple_agg("v", vec![(tf("price"), "sum".to_string())], tf("year"), None),
                vector_tuple_agg(
                    "n",
                    vec![(tf("quantity"), "sum".to_string())],
                    tf("year"),
                    Some(Transformer::new(|values| Value::Int(values.len() as i64))),
                ),
            ],
        )
        .build();
    let table = executor.execute(&query).await.unwrap();

    assert_eq!(
        value_at(&table, &["base"], "v"),
        Value::List(vec![Value::Float(2.0), Value::Float(8.0)])
    );
    assert_eq!(value_at(&table, &["s2"], "n"), Value::Int(2));
}

#[tokio::test]
async fn test_limit_bounds_the_result() {
    let (_, executor) = executor(Dialect::Generic);
    let query = Query::from("sales")
        .select(tfs(&["city"]), vec![sum("p", tf("price"))])
        .limit(2)
        .build();
    let table = executor.execute(&query).await.unwrap();
    assert_eq!(table.row_count(), 2);
}

#[tokio::test]
async fn test_cycle_is_rejected_before_any_statement() {
    let (engine, executor) = executor(Dialect::Generic);
    let query = Query::from("sales")
        .select(
            tfs(&["scenario"]),
            vec![
                plus("a", measure_ref("b"), sum("p", tf("price"))),
                plus("b", measure_ref("a"), sum("p", tf("price"))),
            ],
        )
        .build();
    let err = executor.execute(&query).await.unwrap_err();
    assert!(matches!(err, QueryError::CyclicDependency(_)), "{}", err);
    assert!(engine.backend().statements().is_empty());
}

#[tokio::test]
async fn test_unknown_table_is_reported_with_known_tables() {
    let (engine, executor) = executor(Dialect::Generic);
    let query = Query::from("salez")
        .select(tfs(&["scenario"]), vec![sum("p", tf("price"))])
        .build();

    let err = executor.execute(&query).await.unwrap_err();
    assert!(matches!(err, QueryError::UnknownTable { ref table, .. } if table == "salez"), "{}", err);
    assert_eq!(
        err.to_string(),
        "Cannot find table with name salez. Available tables: [products, sales]"
    );
    assert!(matches!(executor.sql(&query), Err(QueryError::UnknownTable { .. })));
    assert!(engine.backend().statements().is_empty());
}

#[tokio::test]
async fn test_unknown_measure_reference() {
    let (_, executor) = executor(Dialect::Generic);
    let query = Query::from("sales")
        .select(tfs(&["scenario"]), vec![plus("a", measure_ref("missing"), count())])
        .build();
    assert!(matches!(
        executor.execute(&query).await,
        Err(QueryError::UnknownMeasure(alias)) if alias == "missing"
    ));
}

#[tokio::test]
async fn test_backend_error_surfaces() {
    let (engine, executor) = executor(Dialect::Generic);
    let query = Query::from("sales")
        .select(
            tfs(&["scenario", "year"]),
            vec![comparison_with_period(
                "growth",
                ComparisonMethod::AbsoluteDifference,
                sum("p", tf("price")),
                positions([(tf("year"), "y-1")]),
                Period::Year { year: tf("year") },
            )],
        )
        .where_(criterion(tf("year"), eq(2023)))
        .having(measure_criterion(sum("p", tf("price")), gt(1)))
        .build();
    // The memory backend cannot evaluate the root scope's having clause.
    assert_eq!(executor.sql(&query).unwrap().len(), 2);
    assert!(matches!(executor.execute(&query).await, Err(QueryError::Backend(_))));
    assert!(!engine.backend().statements().is_empty());
}

/// Backend that never answers in time.
struct SlowBackend(MemoryBackend);

#[async_trait]
impl Backend for SlowBackend {
    fn datastore(&self) -> &Datastore {
        self.0.datastore()
    }

    async fn execute(&self, sql: &str, query: &DatabaseQuery) -> QueryResult<ColumnarTable> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        self.0.execute(sql, query).await
    }
}

#[tokio::test]
async fn test_cancellation_returns_promptly() {
    let engine = SqlQueryEngine::new(SlowBackend(sales_backend(false)), Dialect::Generic);
    let executor = QueryExecutor::new(Arc::new(engine), Arc::new(InMemoryQueryCache::default()));
    let query = Query::from("sales")
        .select(tfs(&["scenario"]), vec![sum("p", tf("price"))])
        .build();

    let (tx, rx) = watch::channel(false);
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send(true)
    });
    let result = tokio::time::timeout(Duration::from_secs(5), executor.execute_with_cancel(&query, rx))
        .await
        .expect("cancellation did not interrupt execution");
    assert!(matches!(result, Err(QueryError::Cancelled(_))));
    canceller.await.unwrap().unwrap();
    assert_eq!(executor.cache().stats().size, 0);
}

#[tokio::test]
async fn test_dropped_cancel_sender_never_cancels() {
    let (_, executor) = executor(Dialect::Generic);
    let query = Query::from("sales")
        .select(tfs(&["scenario"]), vec![count()])
        .build();
    let (tx, rx) = watch::channel(false);
    drop(tx);
    let table = executor.execute_with_cancel(&query, rx).await.unwrap();
    assert_eq!(table.row_count(), 3);
}

#[tokio::test]
async fn test_bounded_concurrency_still_runs_every_scope() {
    let engine = sales_engine(Dialect::DuckDb);
    let executor = QueryExecutor::new(engine.clone(), Arc::new(InMemoryQueryCache::default()))
        .with_max_concurrent_scopes(1);
    let query = Query::from("sales")
        .where_(criterion(tf("year"), eq(2023)))
        .select(
            tfs(&["year"]),
            vec![comparison_with_period(
                "growth",
                ComparisonMethod::AbsoluteDifference,
                sum("p", tf("price")),
                positions([(tf("year"), "y-1")]),
                Period::Year { year: tf("year") },
            )],
        )
        .build();
    let table = executor.execute(&query).await.unwrap();
    assert_eq!(engine.backend().statements().len(), 2);
    assert_eq!(value_at(&table, &["2023"], "growth"), Value::Float(12.5));
}

#[tokio::test]
async fn test_executor_from_settings() {
    let mut settings = Settings::default();
    settings.cache.enabled = false;
    let executor = QueryExecutor::from_settings(sales_engine(Dialect::DuckDb), &settings);
    assert!(executor.cache().stats().is_disabled());
    assert_eq!(executor.engine().rewriter().name(), "duckdb");
}
