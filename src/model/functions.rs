//! Constructor functions for fields, conditions, criteria, measures and orders.
//!
//! ```ignore
//! use sqlcube::prelude::*;
//!
//! let query = Query::from("sales")
//!     .where_(criterion(tf("country"), eq("france")))
//!     .select(vec![tf("scenario"), tf("category")], vec![sum("p", tf("price"))])
//!     .rollup(vec![tf("category")])
//!     .build();
//! ```

use std::collections::BTreeMap;

use super::column_set::ColumnSetKey;
use super::condition::{ConditionDto, ConditionType, CriteriaDto};
use super::field::Field;
use super::measure::{BinaryOperator, ComparisonMethod, Measure, Period, Transformer};
use super::query::{OrderDto, OrderKeyword};
use super::types::Value;

// =============================================================================
// Fields
// =============================================================================

/// A table field.
pub fn tf(full_name: impl Into<String>) -> Field {
    Field::table(full_name)
}

pub fn tfs<S: AsRef<str>>(names: &[S]) -> Vec<Field> {
    names.iter().map(|n| Field::table(n.as_ref())).collect()
}

// =============================================================================
// Conditions
// =============================================================================

fn single(condition_type: ConditionType, value: impl Into<Value>) -> ConditionDto {
    ConditionDto::SingleValue {
        condition_type,
        value: value.into(),
    }
}

pub fn eq(value: impl Into<Value>) -> ConditionDto {
    single(ConditionType::Eq, value)
}

pub fn neq(value: impl Into<Value>) -> ConditionDto {
    single(ConditionType::Neq, value)
}

pub fn lt(value: impl Into<Value>) -> ConditionDto {
    single(ConditionType::Lt, value)
}

pub fn le(value: impl Into<Value>) -> ConditionDto {
    single(ConditionType::Le, value)
}

pub fn gt(value: impl Into<Value>) -> ConditionDto {
    single(ConditionType::Gt, value)
}

pub fn ge(value: impl Into<Value>) -> ConditionDto {
    single(ConditionType::Ge, value)
}

pub fn like(pattern: impl Into<String>) -> ConditionDto {
    single(ConditionType::Like, pattern.into())
}

pub fn is_in<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> ConditionDto {
    ConditionDto::in_list(values.into_iter().map(Into::into).collect())
}

pub fn is_null() -> ConditionDto {
    ConditionDto::Constant {
        condition_type: ConditionType::Null,
    }
}

pub fn is_not_null() -> ConditionDto {
    ConditionDto::Constant {
        condition_type: ConditionType::NotNull,
    }
}

pub fn and(one: ConditionDto, two: ConditionDto) -> ConditionDto {
    ConditionDto::Logical {
        condition_type: ConditionType::And,
        one: Box::new(one),
        two: Box::new(two),
    }
}

pub fn or(one: ConditionDto, two: ConditionDto) -> ConditionDto {
    ConditionDto::Logical {
        condition_type: ConditionType::Or,
        one: Box::new(one),
        two: Box::new(two),
    }
}

// =============================================================================
// Criteria
// =============================================================================

pub fn criterion(field: Field, condition: ConditionDto) -> CriteriaDto {
    CriteriaDto::Field { field, condition }
}

/// Compare two fields, e.g. a join key.
pub fn criterion_fields(left: Field, right: Field, condition_type: ConditionType) -> CriteriaDto {
    CriteriaDto::FieldPair {
        left,
        right,
        condition_type,
    }
}

/// A `having` leaf on a measure.
pub fn measure_criterion(measure: Measure, condition: ConditionDto) -> CriteriaDto {
    CriteriaDto::Measure {
        measure: Box::new(measure),
        condition,
    }
}

pub fn all(children: Vec<CriteriaDto>) -> CriteriaDto {
    CriteriaDto::Logical {
        condition_type: ConditionType::And,
        children,
    }
}

pub fn any(children: Vec<CriteriaDto>) -> CriteriaDto {
    CriteriaDto::Logical {
        condition_type: ConditionType::Or,
        children,
    }
}

// =============================================================================
// Measures
// =============================================================================

pub fn agg(alias: impl Into<String>, field: Field, aggregation_function: impl Into<String>) -> Measure {
    Measure::Aggregated {
        alias: alias.into(),
        field,
        aggregation_function: aggregation_function.into(),
        criteria: None,
    }
}

pub fn agg_if(
    alias: impl Into<String>,
    field: Field,
    aggregation_function: impl Into<String>,
    criteria: CriteriaDto,
) -> Measure {
    Measure::Aggregated {
        alias: alias.into(),
        field,
        aggregation_function: aggregation_function.into(),
        criteria: Some(criteria),
    }
}

pub fn sum(alias: impl Into<String>, field: Field) -> Measure {
    agg(alias, field, "sum")
}

pub fn avg(alias: impl Into<String>, field: Field) -> Measure {
    agg(alias, field, "avg")
}

pub fn min(alias: impl Into<String>, field: Field) -> Measure {
    agg(alias, field, "min")
}

pub fn max(alias: impl Into<String>, field: Field) -> Measure {
    agg(alias, field, "max")
}

pub fn sum_if(alias: impl Into<String>, field: Field, criteria: CriteriaDto) -> Measure {
    agg_if(alias, field, "sum", criteria)
}

pub fn count() -> Measure {
    Measure::count()
}

pub fn expression(alias: impl Into<String>, sql: impl Into<String>) -> Measure {
    Measure::Expression {
        alias: alias.into(),
        expression: sql.into(),
    }
}

fn binary(alias: impl Into<String>, operator: BinaryOperator, left: Measure, right: Measure) -> Measure {
    Measure::BinaryOperation {
        alias: alias.into(),
        operator,
        left_operand: Box::new(left),
        right_operand: Box::new(right),
    }
}

pub fn plus(alias: impl Into<String>, left: Measure, right: Measure) -> Measure {
    binary(alias, BinaryOperator::Plus, left, right)
}

pub fn minus(alias: impl Into<String>, left: Measure, right: Measure) -> Measure {
    binary(alias, BinaryOperator::Minus, left, right)
}

pub fn multiply(alias: impl Into<String>, left: Measure, right: Measure) -> Measure {
    binary(alias, BinaryOperator::Multiply, left, right)
}

pub fn divide(alias: impl Into<String>, left: Measure, right: Measure) -> Measure {
    binary(alias, BinaryOperator::Divide, left, right)
}

pub fn measure_ref(alias: impl Into<String>) -> Measure {
    Measure::Ref {
        alias: alias.into(),
    }
}

/// Compare `measure` with itself at a shifted calendar position.
pub fn comparison_with_period(
    alias: impl Into<String>,
    method: ComparisonMethod,
    measure: Measure,
    reference_position: BTreeMap<Field, String>,
    period: Period,
) -> Measure {
    Measure::Comparison {
        alias: alias.into(),
        comparison_method: method,
        measure: Box::new(measure),
        reference_position,
        period: Some(period),
        column_set_key: None,
        ancestors: None,
    }
}

/// Compare `measure` with itself at another bucket position.
pub fn comparison_with_bucket(
    alias: impl Into<String>,
    method: ComparisonMethod,
    measure: Measure,
    reference_position: BTreeMap<Field, String>,
) -> Measure {
    Measure::Comparison {
        alias: alias.into(),
        comparison_method: method,
        measure: Box::new(measure),
        reference_position,
        period: None,
        column_set_key: Some(ColumnSetKey::Bucket),
        ancestors: None,
    }
}

/// Compare `measure` with its value at the parent level. `ancestors` are
/// listed finest first.
pub fn comparison_with_parent(
    alias: impl Into<String>,
    method: ComparisonMethod,
    measure: Measure,
    ancestors: Vec<Field>,
) -> Measure {
    Measure::Comparison {
        alias: alias.into(),
        comparison_method: method,
        measure: Box::new(measure),
        reference_position: BTreeMap::new(),
        period: None,
        column_set_key: None,
        ancestors: Some(ancestors),
    }
}

pub fn vector_tuple_agg(
    alias: impl Into<String>,
    field_to_aggregate_and_agg_func: Vec<(Field, String)>,
    vector_axis: Field,
    transformer: Option<Transformer>,
) -> Measure {
    Measure::VectorTupleAgg {
        alias: alias.into(),
        field_to_aggregate_and_agg_func,
        vector_axis,
        transformer,
    }
}

/// Build a reference-position map from `(field, position)` pairs.
pub fn positions<const N: usize>(pairs: [(Field, &str); N]) -> BTreeMap<Field, String> {
    pairs.into_iter().map(|(f, p)| (f, p.to_string())).collect()
}

// =============================================================================
// Orders
// =============================================================================

pub fn asc() -> OrderDto {
    OrderDto::Simple {
        order: OrderKeyword::Asc,
    }
}

pub fn desc() -> OrderDto {
    OrderDto::Simple {
        order: OrderKeyword::Desc,
    }
}

pub fn explicit<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> OrderDto {
    OrderDto::Explicit {
        explicit: values.into_iter().map(Into::into).collect(),
    }
}
