//! Statement generation from query descriptors, across dialects.

#[path = "../common/mod.rs"]
mod common;

use common::{sales_datastore, MarkerRewriter};
use sqlcube::model::functions::*;
use sqlcube::model::{ConditionType, FieldType, JoinType, Measure, Query, QueryDto, Value, VirtualTableDto};
use sqlcube::plan::{compile_scope, QueryScope};
use sqlcube::sql::{translate, CompiledTable, DatabaseQuery, Dialect, QueryRewriter, TypedField};
use sqlcube::QueryError;

fn compile(query: &QueryDto, measures: &[Measure]) -> DatabaseQuery {
    compile_scope(&QueryScope::of(query), measures, &sales_datastore()).unwrap()
}

fn sql(query: &QueryDto, measures: &[Measure], rewriter: &dyn QueryRewriter) -> String {
    translate(&compile(query, measures), rewriter).unwrap()
}

/// Text between `group by ` and the end of the statement.
fn group_by(sql: &str) -> &str {
    sql.split(" group by ").nth(1).unwrap_or("")
}

fn price() -> Vec<Measure> {
    vec![sum("p", tf("price"))]
}

#[test]
fn test_two_level_fallback_enumeration() {
    let query = Query::from("sales")
        .select(tfs(&["scenario", "category", "product"]), vec![])
        .rollup(tfs(&["category", "product"]))
        .build();
    assert_eq!(
        group_by(&sql(&query, &price(), &Dialect::ClickHouse)),
        "grouping sets ((`scenario`,`category`,`product`),(`scenario`,`category`),(`scenario`))"
    );
}

#[test]
fn test_three_level_fallback_enumeration() {
    let query = Query::from("sales")
        .select(tfs(&["scenario", "continent", "country", "city"]), vec![])
        .rollup(tfs(&["continent", "country", "city"]))
        .build();
    assert_eq!(
        group_by(&sql(&query, &price(), &MarkerRewriter)),
        "grouping sets ((scenario,continent,country,city),(scenario,continent,country),\
         (scenario,continent),(scenario))"
    );
}

#[test]
fn test_native_partial_rollup_keeps_rollup_order() {
    let query = Query::from("sales")
        .select(tfs(&["scenario", "category", "product"]), vec![])
        .rollup(tfs(&["product", "category"]))
        .build();
    assert_eq!(
        group_by(&sql(&query, &price(), &Dialect::Generic)),
        "scenario, rollup(product, category)"
    );
}

#[test]
fn test_full_rollup_is_native_everywhere() {
    let query = Query::from("sales")
        .select(tfs(&["category"]), vec![])
        .rollup(tfs(&["category"]))
        .build();
    for dialect in Dialect::ALL {
        let statement = sql(&query, &price(), &dialect);
        assert!(group_by(&statement).starts_with("rollup("), "{}: {}", dialect, statement);
    }
}

#[test]
fn test_end_to_end_marker_statement() {
    let query = Query::from("sales")
        .select(tfs(&["scenario", "category"]), vec![])
        .rollup(tfs(&["category"]))
        .build();
    insta::assert_snapshot!(
        sql(&query, &price(), &MarkerRewriter),
        @"select scenario, category, grouping(category), sum(price) as p from sales group by grouping sets ((scenario,category),(scenario))"
    );
}

#[test]
fn test_explicit_grouping_sets_are_verbatim() {
    let query = Query::from("sales")
        .select(tfs(&["scenario", "category"]), vec![])
        .grouping_sets(vec![tfs(&["scenario", "category"]), tfs(&["scenario"]), vec![]])
        .build();
    let statement = sql(&query, &price(), &Dialect::Generic);
    assert_eq!(
        group_by(&statement),
        "grouping sets((scenario,category), (scenario), ())"
    );

    // Only category is missing from a set.
    let query = Query::from("sales")
        .select(tfs(&["scenario", "category"]), vec![])
        .grouping_sets(vec![tfs(&["scenario", "category"]), tfs(&["scenario"])])
        .build();
    let statement = sql(&query, &price(), &Dialect::DuckDb);
    assert!(statement.contains(r#"grouping("category")"#), "{}", statement);
    assert!(!statement.contains(r#"grouping("scenario")"#), "{}", statement);
}

#[test]
fn test_virtual_table_is_rendered_as_cte() {
    let query = Query::from("sales")
        .join("rates", JoinType::Inner)
        .on(criterion_fields(tf("sales.scenario"), tf("rates.scenario"), ConditionType::Eq))
        .with_virtual_table(VirtualTableDto::new(
            "rates",
            vec!["scenario".to_string(), "rate".to_string()],
            vec![
                vec!["base".into(), Value::Float(1.0)],
                vec!["s1".into(), Value::Float(1.1)],
            ],
        ))
        .select(tfs(&["sales.scenario"]), vec![])
        .build();
    insta::assert_snapshot!(
        sql(&query, &[sum("r", tf("rate"))], &Dialect::Generic),
        @"with rates as (select 'base' as scenario, 1 as rate union all select 's1' as scenario, 1.1 as rate) select sales.scenario, sum(rate) as r from sales inner join rates on sales.scenario = rates.scenario group by sales.scenario"
    );
}

#[test]
fn test_where_having_and_limit() {
    let query = Query::from("sales")
        .where_(all(vec![
            criterion(tf("category"), eq("food")),
            criterion(tf("year"), ge(Value::Int(2023))),
        ]))
        .select(tfs(&["scenario"]), vec![])
        .having(measure_criterion(sum("p", tf("price")), gt(Value::Int(1))))
        .limit(10)
        .build();
    assert_eq!(
        sql(&query, &price(), &Dialect::Generic),
        "select scenario, sum(price) as p from sales where (category = 'food' and year >= 2023) \
         group by scenario having sum(price) > 1 limit 10"
    );
}

#[test]
fn test_sub_query_is_inlined() {
    let inner = Query::from("sales")
        .select(tfs(&["scenario", "category"]), vec![sum("p", tf("price"))])
        .build();
    let outer = Query::from_sub_query(inner)
        .select(tfs(&["scenario"]), vec![])
        .build();
    assert_eq!(
        sql(&outer, &[avg("ap", tf("p"))], &Dialect::Generic),
        "select scenario, avg(p) as ap from (select scenario, category, sum(price) as p from sales \
         group by scenario, category) group by scenario"
    );
}

#[test]
fn test_rollup_outside_select_is_rejected() {
    let compiled = DatabaseQuery {
        table: Some(CompiledTable::new("sales")),
        select: vec![TypedField::table(None, "scenario", FieldType::String)],
        rollup: vec![TypedField::table(None, "category", FieldType::String)],
        ..Default::default()
    };
    let err = translate(&compiled, &Dialect::Generic).unwrap_err();
    assert!(matches!(err, QueryError::InvalidRollup { .. }));
    assert_eq!(
        err.to_string(),
        "The columns contained in rollup [category] must be a subset of the columns contained in the select [scenario]"
    );
}

#[test]
fn test_translation_is_idempotent() {
    let query = Query::from("sales")
        .where_(criterion(tf("category"), is_in(["food", "drink"])))
        .select(tfs(&["scenario", "category"]), vec![])
        .rollup(tfs(&["category"]))
        .build();
    for dialect in Dialect::ALL {
        let compiled = compile(&query, &price());
        assert_eq!(
            translate(&compiled, &dialect).unwrap(),
            translate(&compiled, &dialect).unwrap()
        );
    }
}
