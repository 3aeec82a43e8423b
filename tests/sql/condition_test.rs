//! Criteria compilation through the public API.

use sqlcube::model::functions::*;
use sqlcube::model::{ConditionDto, ConditionType, FieldType, Value};
use sqlcube::sql::{compile_condition, quote_literal, CompiledCriteria, CompiledMeasure, Dialect, TypedField};
use sqlcube::QueryError;

fn string_quote(value: &Value) -> sqlcube::QueryResult<String> {
    quote_literal(FieldType::String, value)
}

fn field(name: &str, field_type: FieldType) -> TypedField {
    TypedField::table(None, name, field_type)
}

#[test]
fn test_single_value_conditions() {
    let cases = [
        (eq("paris"), "city = 'paris'"),
        (neq("paris"), "city <> 'paris'"),
        (lt("m"), "city < 'm'"),
        (ge("m"), "city >= 'm'"),
        (like("par%"), "city like 'par%'"),
    ];
    for (condition, expected) in cases {
        assert_eq!(compile_condition("city", &condition, &string_quote).unwrap(), expected);
    }
}

#[test]
fn test_in_and_constant_conditions() {
    assert_eq!(
        compile_condition("city", &is_in(["paris", "london"]), &string_quote).unwrap(),
        "city in ('paris', 'london')"
    );
    assert_eq!(
        compile_condition("city", &is_null(), &string_quote).unwrap(),
        "city is null"
    );
    assert_eq!(
        compile_condition("city", &is_not_null(), &string_quote).unwrap(),
        "city is not null"
    );
}

#[test]
fn test_logical_condition_keeps_nesting() {
    let condition = and(ge(1), or(lt(5), eq(10)));
    let quote = |v: &Value| quote_literal(FieldType::Int, v);
    assert_eq!(
        compile_condition("qty", &condition, &quote).unwrap(),
        "(qty >= 1 and (qty < 5 or qty = 10))"
    );
}

#[test]
fn test_quoting_follows_declared_type() {
    let numeric = CompiledCriteria::Field {
        field: field("year", FieldType::Long),
        condition: eq(Value::Int(2023)),
    };
    assert_eq!(
        numeric.sql_expression(&Dialect::Generic).unwrap().unwrap(),
        "year = 2023"
    );

    // A number compared to a string column is quoted.
    let textual = CompiledCriteria::Field {
        field: field("code", FieldType::String),
        condition: eq(Value::Int(42)),
    };
    assert_eq!(
        textual.sql_expression(&Dialect::Generic).unwrap().unwrap(),
        "code = '42'"
    );
}

#[test]
fn test_unsupported_literal_type() {
    let criteria = CompiledCriteria::Field {
        field: field("day", FieldType::Date),
        condition: eq("2023-01-01"),
    };
    assert!(matches!(
        criteria.sql_expression(&Dialect::Generic),
        Err(QueryError::UnsupportedLiteralType(_))
    ));
}

#[test]
fn test_invalid_condition_shapes() {
    let single_with_logical_type = ConditionDto::SingleValue {
        condition_type: ConditionType::And,
        value: Value::Int(1),
    };
    let in_with_eq_type = ConditionDto::In {
        condition_type: ConditionType::Eq,
        values: vec![Value::Int(1)],
    };
    for condition in [single_with_logical_type, in_with_eq_type] {
        assert!(matches!(
            compile_condition("x", &condition, &string_quote),
            Err(QueryError::UnsupportedCondition { .. })
        ));
    }
}

#[test]
fn test_criteria_tree_per_dialect() {
    let criteria = CompiledCriteria::Logical {
        condition_type: ConditionType::And,
        children: vec![
            CompiledCriteria::Field {
                field: TypedField::table(Some("sales"), "category", FieldType::String),
                condition: is_in(["food", "drink"]),
            },
            CompiledCriteria::Field {
                field: field("quantity", FieldType::Long),
                condition: gt(Value::Int(3)),
            },
        ],
    };
    insta::assert_snapshot!(
        criteria.sql_expression(&Dialect::Generic).unwrap().unwrap(),
        @"(sales.category in ('food', 'drink') and quantity > 3)"
    );
    insta::assert_snapshot!(
        criteria.sql_expression(&Dialect::Postgres).unwrap().unwrap(),
        @r#"("sales"."category" in ('food', 'drink') and "quantity" > 3)"#
    );
    insta::assert_snapshot!(
        criteria.sql_expression(&Dialect::BigQuery).unwrap().unwrap(),
        @"(`sales`.`category` in ('food', 'drink') and `quantity` > 3)"
    );
}

#[test]
fn test_measure_criteria_renders_aggregate() {
    let criteria = CompiledCriteria::Measure {
        measure: Box::new(CompiledMeasure::Aggregated {
            alias: "p".to_string(),
            field: field("price", FieldType::Double),
            aggregation_function: "sum".to_string(),
            criteria: None,
        }),
        condition: gt(Value::Int(10)),
    };
    assert_eq!(
        criteria.sql_expression(&Dialect::Generic).unwrap().unwrap(),
        "sum(price) > 10"
    );
}
