//! Comparison measures evaluated end to end.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{sales_engine, value_at, MemoryBackend};
use sqlcube::cache::InMemoryQueryCache;
use sqlcube::engine::SqlQueryEngine;
use sqlcube::executor::QueryExecutor;
use sqlcube::model::functions::*;
use sqlcube::model::{ColumnSet, ComparisonMethod, Measure, Period, Query, QueryDto, Value};
use sqlcube::sql::Dialect;
use sqlcube::QueryError;

fn executor() -> (Arc<SqlQueryEngine<MemoryBackend>>, QueryExecutor) {
    let engine = sales_engine(Dialect::DuckDb);
    let executor = QueryExecutor::new(engine.clone(), Arc::new(InMemoryQueryCache::default()));
    (engine, executor)
}

fn price() -> Measure {
    sum("p", tf("price"))
}

fn year_over_year(method: ComparisonMethod) -> Measure {
    comparison_with_period(
        "growth",
        method,
        price(),
        positions([(tf("year"), "y-1")]),
        Period::Year { year: tf("year") },
    )
}

fn base_scenario(columns: &[&str], measures: Vec<Measure>) -> QueryDto {
    Query::from("sales")
        .where_(criterion(tf("scenario"), eq("base")))
        .select(tfs(columns), measures)
        .build()
}

#[tokio::test]
async fn test_year_over_year_difference() {
    let (engine, executor) = executor();
    let query = base_scenario(
        &["year"],
        vec![price(), year_over_year(ComparisonMethod::AbsoluteDifference)],
    );
    let table = executor.execute(&query).await.unwrap();

    assert_eq!(value_at(&table, &["2023"], "growth"), Value::Float(6.0));
    assert_eq!(value_at(&table, &["2022"], "growth"), Value::Null);
    assert_eq!(value_at(&table, &["2022"], "p"), Value::Float(2.0));
    // Reference rows are the query's own rows.
    assert_eq!(engine.backend().statements().len(), 1);
}

#[tokio::test]
async fn test_filtered_period_reads_reference_from_prefetch() {
    let (engine, executor) = executor();
    let query = Query::from("sales")
        .where_(all(vec![
            criterion(tf("scenario"), eq("base")),
            criterion(tf("year"), eq(2023)),
        ]))
        .select(tfs(&["year"]), vec![year_over_year(ComparisonMethod::Divide)])
        .build();
    let table = executor.execute(&query).await.unwrap();

    assert_eq!(table.row_count(), 1);
    assert_eq!(value_at(&table, &["2023"], "growth"), Value::Float(4.0));

    let statements = engine.backend().statements();
    assert_eq!(statements.len(), 2);
    assert!(statements.iter().any(|s| !s.contains("2023")), "{:?}", statements);
}

#[tokio::test]
async fn test_quarter_shift_carries_into_previous_year() {
    let (_, executor) = executor();
    let growth = comparison_with_period(
        "growth",
        ComparisonMethod::RelativeDifference,
        price(),
        positions([(tf("year"), "y"), (tf("quarter"), "q-1")]),
        Period::Quarter {
            year: tf("year"),
            quarter: tf("quarter"),
        },
    );
    let table = executor
        .execute(&base_scenario(&["year", "quarter"], vec![growth]))
        .await
        .unwrap();

    assert_eq!(value_at(&table, &["2022", "4"], "growth"), Value::Null);
    assert_eq!(value_at(&table, &["2023", "1"], "growth"), Value::Float(1.0));
    assert_eq!(value_at(&table, &["2023", "2"], "growth"), Value::Float(0.0));
}

#[tokio::test]
async fn test_bucket_comparison_against_first_member() {
    let (_, executor) = executor();
    let delta = comparison_with_bucket(
        "delta",
        ComparisonMethod::AbsoluteDifference,
        price(),
        positions([(tf("scenario"), "first")]),
    );
    let query = Query::from("sales")
        .select(tfs(&["scenario"]), vec![price(), delta])
        .column_set(
            ColumnSet::bucket("group", tf("scenario"))
                .with_bucket("group1", vec!["base".into(), "s1".into()])
                .with_bucket("group2", vec!["base".into(), "s2".into()]),
        )
        .build();
    let table = executor.execute(&query).await.unwrap();

    assert_eq!(value_at(&table, &["group1", "base"], "delta"), Value::Float(0.0));
    assert_eq!(value_at(&table, &["group1", "s1"], "delta"), Value::Float(2.0));
    assert_eq!(value_at(&table, &["group2", "s2"], "delta"), Value::Float(-8.5));
}

#[tokio::test]
async fn test_parent_comparison_divides_by_next_level() {
    let (engine, executor) = executor();
    let share = comparison_with_parent(
        "share",
        ComparisonMethod::Divide,
        price(),
        tfs(&["city", "country", "continent"]),
    );
    let table = executor
        .execute(&base_scenario(&["continent", "country", "city"], vec![share]))
        .await
        .unwrap();

    assert_eq!(table.row_count(), 4);
    assert_eq!(
        value_at(&table, &["eu", "france", "paris"], "share"),
        Value::Float(2.0 / 5.0)
    );
    assert_eq!(value_at(&table, &["eu", "uk", "london"], "share"), Value::Float(1.0));

    let statements = engine.backend().statements();
    assert!(
        statements
            .iter()
            .any(|s| s.contains(r#"rollup("continent", "country", "city")"#)),
        "{:?}",
        statements
    );
}

#[tokio::test]
async fn test_parent_comparison_rejects_grouping_sets() {
    let (_, executor) = executor();
    let share = comparison_with_parent("share", ComparisonMethod::Divide, price(), tfs(&["city", "country"]));
    let query = Query::from("sales")
        .select(tfs(&["country", "city"]), vec![share])
        .grouping_sets(vec![tfs(&["country", "city"]), tfs(&["country"])])
        .build();
    assert!(matches!(
        executor.execute(&query).await,
        Err(QueryError::InvalidQuery(_))
    ));
}

#[tokio::test]
async fn test_first_is_not_a_period_position() {
    let (_, executor) = executor();
    let growth = comparison_with_period(
        "growth",
        ComparisonMethod::AbsoluteDifference,
        price(),
        positions([(tf("year"), "first")]),
        Period::Year { year: tf("year") },
    );
    assert!(matches!(
        executor.execute(&base_scenario(&["year"], vec![growth])).await,
        Err(QueryError::InvalidQuery(_))
    ));
}
