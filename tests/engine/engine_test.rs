//! Engine execution: statement generation, backend round trip and totals.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{rows, sales_backend, sales_datastore, sales_engine, value_at, MarkerRewriter};
use sqlcube::engine::{QueryEngine, SqlQueryEngine};
use sqlcube::model::functions::*;
use sqlcube::model::{Query, QueryDto, Value};
use sqlcube::plan::{compile_scope, QueryScope};
use sqlcube::sql::{CompiledTable, DatabaseQuery, Dialect};
use sqlcube::QueryError;

fn database_query(query: &QueryDto) -> DatabaseQuery {
    compile_scope(&QueryScope::of(query), &query.measures, &sales_datastore()).unwrap()
}

fn scenario_category_rollup() -> QueryDto {
    Query::from("sales")
        .select(tfs(&["scenario", "category"]), vec![sum("p", tf("price"))])
        .rollup(tfs(&["category"]))
        .build()
}

#[tokio::test]
async fn test_grouping_markers_become_totals() {
    let engine = SqlQueryEngine::with_rewriter(sales_backend(true), Arc::new(MarkerRewriter));
    let table = engine
        .execute(&database_query(&scenario_category_rollup()))
        .await
        .unwrap();

    let names: Vec<&str> = table.headers().iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["scenario", "category", "p"]);
    assert_eq!(value_at(&table, &["base", "___total___"], "p"), Value::Float(10.0));
    assert_eq!(value_at(&table, &["s1", "drink"], "p"), Value::Float(6.0));
    assert_eq!(value_at(&table, &["s2", "___total___"], "p"), Value::Float(1.5));
    assert_eq!(table.row_count(), 9);
}

#[tokio::test]
async fn test_null_is_total_without_grouping_function() {
    let engine = sales_engine(Dialect::ClickHouse);
    let table = engine
        .execute(&database_query(&scenario_category_rollup()))
        .await
        .unwrap();

    assert_eq!(table.headers().len(), 3);
    assert_eq!(value_at(&table, &["s1", "___total___"], "p"), Value::Float(12.0));
    assert!(table.column("category").unwrap().iter().all(|c| !c.is_null()));
}

#[tokio::test]
async fn test_backend_receives_generated_statement() {
    let engine = sales_engine(Dialect::DuckDb);
    let query = database_query(&scenario_category_rollup());
    engine.execute(&query).await.unwrap();

    let statements = engine.backend().statements();
    assert_eq!(statements, vec![engine.sql(&query).unwrap()]);
    insta::assert_snapshot!(
        statements[0],
        @r#"select "scenario", "category", grouping("category"), sum("price") as "p" from "sales" group by "scenario", rollup("category")"#
    );
}

#[tokio::test]
async fn test_full_rollup_total_row() {
    let query = Query::from("sales")
        .select(tfs(&["category"]), vec![sum("q", tf("quantity"))])
        .rollup(tfs(&["category"]))
        .build();
    let table = sales_engine(Dialect::Postgres)
        .execute(&database_query(&query))
        .await
        .unwrap();
    let mut result = rows(&table);
    result.sort();
    assert_eq!(
        result,
        vec![
            vec!["___total___".to_string(), "104".to_string()],
            vec!["drink".to_string(), "40".to_string()],
            vec!["food".to_string(), "64".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_where_and_limit_reach_the_backend() {
    let query = Query::from("sales")
        .where_(criterion(tf("country"), is_in(["france", "uk"])))
        .select(tfs(&["city"]), vec![count()])
        .limit(2)
        .build();
    let table = sales_engine(Dialect::Generic)
        .execute(&database_query(&query))
        .await
        .unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(value_at(&table, &["london"], "_contributors_count_"), Value::Int(3));
}

#[tokio::test]
async fn test_unknown_table_is_rejected_before_execution() {
    let engine = sales_engine(Dialect::Generic);
    let query = DatabaseQuery {
        table: Some(CompiledTable::new("orders")),
        ..Default::default()
    };
    let err = engine.execute(&query).await.unwrap_err();
    assert!(matches!(err, QueryError::UnknownTable { .. }));
    assert_eq!(
        err.to_string(),
        "Cannot find table with name orders. Available tables: [products, sales]"
    );
    assert!(engine.backend().statements().is_empty());
}
