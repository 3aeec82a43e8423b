//! Query descriptors against the golden JSON fixtures shared with clients.

#[path = "../common/mod.rs"]
mod common;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use common::MemoryBackend;
use sqlcube::cache::EmptyQueryCache;
use sqlcube::engine::SqlQueryEngine;
use sqlcube::executor::QueryExecutor;
use sqlcube::model::functions::*;
use sqlcube::model::{
    CacheAction, ComparisonMethod, ConditionType, Datastore, FieldType, JoinType, Parameter, Period,
    Query, QueryDto, TableDto, Value, VirtualTableDto, CACHE_PARAMETER_KEY,
};
use sqlcube::sql::Dialect;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e))
}

fn spending_query() -> QueryDto {
    Query::from("sales")
        .join("products", JoinType::Inner)
        .on(criterion_fields(tf("sales.product"), tf("products.label"), ConditionType::Eq))
        .where_(criterion(tf("country"), eq("france")))
        .select(tfs(&["scenario", "category"]), vec![sum("p", tf("price")), count()])
        .rollup(tfs(&["category"]))
        .order_by(tf("category"), desc())
        .limit(100)
        .parameter(
            CACHE_PARAMETER_KEY,
            Parameter::QueryCache {
                action: CacheAction::NotUse,
            },
        )
        .build()
}

fn comparison_query() -> QueryDto {
    Query::from("sales")
        .select(
            tfs(&["scenario", "year"]),
            vec![comparison_with_period(
                "growth",
                ComparisonMethod::RelativeDifference,
                sum("p", tf("price")),
                positions([(tf("year"), "y-1")]),
                Period::Year { year: tf("year") },
            )],
        )
        .build()
}

fn rates() -> VirtualTableDto {
    VirtualTableDto::new(
        "rates",
        vec!["label".to_string(), "rate".to_string()],
        vec![
            vec!["bread".into(), Value::Float(1.5)],
            vec!["water".into(), Value::Float(0.5)],
        ],
    )
}

fn rate_growth() -> sqlcube::model::Measure {
    comparison_with_period(
        "growth",
        ComparisonMethod::AbsoluteDifference,
        sum("r", tf("rate")),
        positions([(tf("year"), "y-1")]),
        Period::Year { year: tf("year") },
    )
}

fn products_with_rates() -> TableDto {
    TableDto::new("products").join(
        TableDto::new("rates"),
        JoinType::Left,
        Some(criterion_fields(tf("products.label"), tf("rates.label"), ConditionType::Eq)),
    )
}

fn nested_join_query() -> QueryDto {
    Query::from("sales")
        .join(products_with_rates(), JoinType::Inner)
        .on(criterion_fields(tf("sales.product"), tf("products.label"), ConditionType::Eq))
        .with_virtual_table(rates())
        .select(tfs(&["scenario", "year"]), vec![rate_growth()])
        .build()
}

#[test]
fn test_nested_join_query_construction_paths_agree() {
    let direct = QueryDto {
        table: Some(TableDto::new("sales").join(
            products_with_rates(),
            JoinType::Inner,
            Some(criterion_fields(tf("sales.product"), tf("products.label"), ConditionType::Eq)),
        )),
        columns: tfs(&["scenario", "year"]),
        measures: vec![rate_growth()],
        virtual_tables: vec![rates()],
        ..Default::default()
    };
    let decoded = QueryDto::from_json(&fixture("nested_join_query.json")).unwrap();

    assert_eq!(nested_join_query(), direct);
    assert_eq!(decoded, direct);
    let expected: serde_json::Value = serde_json::from_str(&fixture("nested_join_query.json")).unwrap();
    assert_eq!(serde_json::to_value(&direct).unwrap(), expected);
}

#[test]
fn test_nested_join_renders_inside_its_parent() {
    let datastore: Datastore = serde_json::from_str(&fixture("schema.json")).unwrap();
    let engine = SqlQueryEngine::new(MemoryBackend::new(datastore, false), Dialect::Generic);
    let executor = QueryExecutor::new(Arc::new(engine), Arc::new(EmptyQueryCache));

    let statements = executor.sql(&nested_join_query()).unwrap();
    assert_eq!(statements.len(), 1);
    insta::assert_snapshot!(
        statements[0],
        @"with rates as (select 'bread' as label, 1.5 as rate union all select 'water' as label, 0.5 as rate) select scenario, year, sum(rate) as r from sales inner join products left join rates on products.label = rates.label on sales.product = products.label group by scenario, year"
    );
}

#[test]
fn test_fixtures_decode_to_builder_queries() {
    let decoded = QueryDto::from_json(&fixture("spending_query.json")).unwrap();
    assert_eq!(decoded, spending_query());
    assert_eq!(decoded.cache_action(), CacheAction::NotUse);

    let decoded = QueryDto::from_json(&fixture("comparison_query.json")).unwrap();
    assert_eq!(decoded, comparison_query());
}

#[test]
fn test_builder_queries_encode_to_fixtures() {
    for (name, query) in [
        ("spending_query.json", spending_query()),
        ("comparison_query.json", comparison_query()),
    ] {
        let expected: serde_json::Value = serde_json::from_str(&fixture(name)).unwrap();
        assert_eq!(serde_json::to_value(&query).unwrap(), expected, "{}", name);
    }
}

#[test]
fn test_schema_fixture() {
    let datastore: Datastore = serde_json::from_str(&fixture("schema.json")).unwrap();
    assert_eq!(datastore.store_names(), vec!["products", "sales"]);
    let price = datastore.store("sales").and_then(|s| s.field("price"));
    assert_eq!(price.map(|f| f.field_type), Some(FieldType::Double));
}

#[test]
fn test_fixtures_compile_against_schema() {
    let datastore: Datastore = serde_json::from_str(&fixture("schema.json")).unwrap();
    let engine = SqlQueryEngine::new(MemoryBackend::new(datastore, false), Dialect::Generic);
    let executor = QueryExecutor::new(Arc::new(engine), Arc::new(EmptyQueryCache));

    let statements = executor.sql(&spending_query()).unwrap();
    assert_eq!(statements.len(), 1);
    assert!(
        statements[0].contains("inner join products on sales.product = products.label"),
        "{}",
        statements[0]
    );
    assert!(statements[0].ends_with(" limit 100"), "{}", statements[0]);

    // The reference rows are the query's own rows: no second scope.
    let statements = executor.sql(&comparison_query()).unwrap();
    assert_eq!(statements.len(), 1);
}

#[test]
fn test_unknown_class_is_rejected() {
    let json = r#"{"table":{"name":"sales"},"columns":[{"@class":"ColumnField","name":"x"}],"measures":[]}"#;
    assert!(QueryDto::from_json(json).is_err());
}
