//! Measure algebra.
//!
//! Measures nest on the wire (a comparison owns its base measure), but the
//! planner flattens them into an arena keyed by alias, so a sub-measure shared
//! by several parents is computed once.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::column_set::ColumnSetKey;
use super::condition::CriteriaDto;
use super::field::Field;
use super::types::Value;

/// Default alias of the count measure.
pub const COUNT_ALIAS: &str = "_contributors_count_";

/// Arithmetic operator of a binary measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        }
    }
}

/// How a comparison relates the current value to the reference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonMethod {
    AbsoluteDifference,
    RelativeDifference,
    Divide,
}

/// Calendar granularity a period comparison shifts along.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "@class")]
pub enum Period {
    Year { year: Field },
    Semester { year: Field, semester: Field },
    Quarter { year: Field, quarter: Field },
    Month { year: Field, month: Field },
}

impl Period {
    /// Fields of the period, coarsest first.
    pub fn fields(&self) -> Vec<&Field> {
        match self {
            Period::Year { year } => vec![year],
            Period::Semester { year, semester } => vec![year, semester],
            Period::Quarter { year, quarter } => vec![year, quarter],
            Period::Month { year, month } => vec![year, month],
        }
    }

    /// Number of sub-periods in one year.
    pub fn periods_per_year(&self) -> i64 {
        match self {
            Period::Year { .. } => 1,
            Period::Semester { .. } => 2,
            Period::Quarter { .. } => 4,
            Period::Month { .. } => 12,
        }
    }
}

/// In-process function reducing a vector of values to one value.
///
/// Never serialized; two transformers always compare equal.
#[derive(Clone)]
pub struct Transformer(pub Arc<dyn Fn(&[Value]) -> Value + Send + Sync>);

impl Transformer {
    pub fn new(f: impl Fn(&[Value]) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, values: &[Value]) -> Value {
        (self.0)(values)
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transformer")
    }
}

impl PartialEq for Transformer {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// A named value computed per result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@class")]
pub enum Measure {
    /// `fn(field)`, optionally restricted to rows matching `criteria`.
    #[serde(rename = "AggregatedMeasure", rename_all = "camelCase")]
    Aggregated {
        alias: String,
        field: Field,
        aggregation_function: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        criteria: Option<CriteriaDto>,
    },

    /// Raw SQL aggregate expression.
    #[serde(rename = "ExpressionMeasure")]
    Expression { alias: String, expression: String },

    #[serde(rename = "BinaryOperationMeasure", rename_all = "camelCase")]
    BinaryOperation {
        alias: String,
        operator: BinaryOperator,
        left_operand: Box<Measure>,
        right_operand: Box<Measure>,
    },

    #[serde(rename = "CountMeasure")]
    Count { alias: String },

    /// Relates `measure` at the current row to its value at a shifted position.
    #[serde(rename = "ComparisonMeasureReferencePosition", rename_all = "camelCase")]
    Comparison {
        alias: String,
        comparison_method: ComparisonMethod,
        measure: Box<Measure>,
        #[serde(default, with = "reference_position_pairs")]
        reference_position: BTreeMap<Field, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        period: Option<Period>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column_set_key: Option<ColumnSetKey>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ancestors: Option<Vec<Field>>,
    },

    /// For each row, the per-axis tuples of aggregates along `vector_axis`.
    #[serde(rename = "VectorTupleAggMeasure", rename_all = "camelCase")]
    VectorTupleAgg {
        alias: String,
        field_to_aggregate_and_agg_func: Vec<(Field, String)>,
        vector_axis: Field,
        #[serde(skip)]
        transformer: Option<Transformer>,
    },

    /// Another measure of the same query, by alias.
    #[serde(rename = "MeasureRef")]
    Ref { alias: String },
}

impl Measure {
    pub fn alias(&self) -> &str {
        match self {
            Measure::Aggregated { alias, .. }
            | Measure::Expression { alias, .. }
            | Measure::BinaryOperation { alias, .. }
            | Measure::Count { alias }
            | Measure::Comparison { alias, .. }
            | Measure::VectorTupleAgg { alias, .. }
            | Measure::Ref { alias } => alias,
        }
    }

    /// Human-readable expression, used in plans and logs.
    pub fn expression(&self) -> String {
        match self {
            Measure::Aggregated {
                field,
                aggregation_function,
                criteria,
                ..
            } => match criteria {
                Some(_) => format!("{}If({}, ...)", aggregation_function, field.name()),
                None => format!("{}({})", aggregation_function, field.name()),
            },
            Measure::Expression { expression, .. } => expression.clone(),
            Measure::BinaryOperation {
                operator,
                left_operand,
                right_operand,
                ..
            } => format!(
                "{} {} {}",
                left_operand.alias(),
                operator.symbol(),
                right_operand.alias()
            ),
            Measure::Count { .. } => "count(*)".to_string(),
            Measure::Comparison {
                comparison_method,
                measure,
                reference_position,
                ancestors,
                ..
            } => {
                let positions: Vec<String> = reference_position
                    .iter()
                    .map(|(f, p)| format!("{}={}", f.name(), p))
                    .collect();
                let mut text = format!(
                    "{:?}({}, [{}])",
                    comparison_method,
                    measure.alias(),
                    positions.join(", ")
                );
                if let Some(ancestors) = ancestors {
                    let names: Vec<String> = ancestors.iter().map(Field::name).collect();
                    text.push_str(&format!(" ancestors=[{}]", names.join(", ")));
                }
                text
            }
            Measure::VectorTupleAgg {
                field_to_aggregate_and_agg_func,
                vector_axis,
                ..
            } => {
                let aggs: Vec<String> = field_to_aggregate_and_agg_func
                    .iter()
                    .map(|(f, agg)| format!("{}({})", agg, f.name()))
                    .collect();
                format!("vector({}) by {}", aggs.join(", "), vector_axis.name())
            }
            Measure::Ref { alias } => alias.clone(),
        }
    }

    /// Whether the measure is computed by the database, as opposed to in memory.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Measure::Aggregated { .. } | Measure::Expression { .. } | Measure::Count { .. }
        )
    }

    pub fn count() -> Self {
        Measure::Count {
            alias: COUNT_ALIAS.to_string(),
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} := {}", self.alias(), self.expression())
    }
}

/// `BTreeMap<Field, String>` as a list of `[field, position]` pairs, since
/// JSON object keys must be strings.
mod reference_position_pairs {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::model::field::Field;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<Field, String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let pairs: Vec<(&Field, &String)> = map.iter().collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Field, String>, D::Error> {
        let pairs: Vec<(Field, String)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
