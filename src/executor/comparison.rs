//! Comparison measures: relate a measure at each row to its value at a
//! shifted position of a reference table.
//!
//! Positions are written per field:
//!
//! ```text
//! first      first value (bucket comparisons)
//! y          same value
//! y-1, y+2   value shifted by n
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{QueryError, QueryResult};
use crate::model::{ColumnSet, ColumnSetKey, ComparisonMethod, Field, Measure, Period, Value};
use crate::plan::{operand_alias, QueryScope};
use crate::table::{ColumnarTable, TableError};

static POSITION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*(?:([+-])\s*(\d+))?$").unwrap());

/// A parsed reference position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    First,
    Offset(i64),
}

impl Shift {
    pub fn parse(position: &str) -> QueryResult<Self> {
        let position = position.trim();
        if position == "first" {
            return Ok(Shift::First);
        }
        let captures = POSITION_PATTERN
            .captures(position)
            .ok_or_else(|| QueryError::invalid(format!("invalid reference position '{}'", position)))?;
        let offset = match (captures.get(2), captures.get(3)) {
            (Some(sign), Some(digits)) => {
                let n: i64 = digits
                    .as_str()
                    .parse()
                    .map_err(|_| QueryError::invalid(format!("invalid offset in '{}'", position)))?;
                if sign.as_str() == "-" {
                    -n
                } else {
                    n
                }
            }
            _ => 0,
        };
        Ok(Shift::Offset(offset))
    }

    /// Index reached from `index` in a list of `len` items.
    fn apply(self, index: usize, len: usize) -> Option<usize> {
        match self {
            Shift::First => (len > 0).then_some(0),
            Shift::Offset(n) => {
                let shifted = (index as i64).checked_add(n)?;
                (0..len as i64).contains(&shifted).then_some(shifted as usize)
            }
        }
    }
}

fn position_of<'a>(positions: &'a [(Field, String)], name: &str) -> Option<&'a str> {
    positions
        .iter()
        .find(|(f, _)| f.name() == name)
        .map(|(_, p)| p.as_str())
}

fn column_index(names: &[String], name: &str) -> QueryResult<usize> {
    names
        .iter()
        .position(|n| n == name)
        .ok_or_else(|| TableError::UnknownColumn(name.to_string()).into())
}

/// Maps a row's grouping point to the point of its reference row.
#[derive(Debug)]
enum Shifter {
    Period {
        year: usize,
        sub_period: Option<usize>,
        periods_per_year: i64,
        year_shift: i64,
        sub_period_shift: i64,
    },
    Bucket {
        group: usize,
        value: usize,
        buckets: Vec<(String, Vec<Value>)>,
        group_shift: Shift,
        value_shift: Shift,
    },
    Parent {
        /// Ancestor columns, finest first.
        ancestors: Vec<usize>,
    },
}

impl Shifter {
    fn new(measure: &Measure, scope: &QueryScope, names: &[String]) -> QueryResult<Self> {
        let Measure::Comparison {
            alias,
            reference_position,
            period,
            column_set_key,
            ancestors,
            ..
        } = measure
        else {
            return Err(QueryError::IncorrectPath(format!(
                "'{}' is not a comparison measure",
                measure.alias()
            )));
        };
        let positions: Vec<(Field, String)> = reference_position
            .iter()
            .map(|(f, p)| (f.clone(), p.clone()))
            .collect();

        if let Some(period) = period {
            return Self::period(alias, period, &positions, names);
        }
        if let Some(ancestors) = ancestors {
            let indices = ancestors
                .iter()
                .filter_map(|a| names.iter().position(|n| *n == a.name()))
                .collect();
            return Ok(Shifter::Parent { ancestors: indices });
        }
        if let Some(ColumnSetKey::Bucket) = column_set_key {
            let Some(ColumnSet::Bucket { name, field, values }) =
                scope.column_sets.get(&ColumnSetKey::Bucket)
            else {
                return Err(QueryError::invalid(format!(
                    "'{}' compares buckets but the query has no bucket column set",
                    alias
                )));
            };
            let parse = |column: &str| {
                position_of(&positions, column)
                    .map(Shift::parse)
                    .unwrap_or(Ok(Shift::Offset(0)))
            };
            return Ok(Shifter::Bucket {
                group: column_index(names, name)?,
                value: column_index(names, &field.name())?,
                buckets: values.clone(),
                group_shift: parse(name.as_str())?,
                value_shift: parse(field.name().as_str())?,
            });
        }
        Err(QueryError::invalid(format!(
            "comparison '{}' needs a period, a column set or ancestors",
            alias
        )))
    }

    fn period(alias: &str, period: &Period, positions: &[(Field, String)], names: &[String]) -> QueryResult<Self> {
        let fields = period.fields();
        let offset = |field: &Field| -> QueryResult<i64> {
            match position_of(positions, &field.name()).map(Shift::parse).transpose()? {
                None => Ok(0),
                Some(Shift::Offset(n)) => Ok(n),
                Some(Shift::First) => Err(QueryError::invalid(format!(
                    "'first' is not a valid period position in '{}'",
                    alias
                ))),
            }
        };
        let field_names: Vec<String> = fields.iter().map(|f| f.name()).collect();
        if let Some((field, _)) = positions
            .iter()
            .find(|(f, p)| !field_names.contains(&f.name()) && Shift::parse(p).ok() != Some(Shift::Offset(0)))
        {
            return Err(QueryError::invalid(format!(
                "'{}' shifts {} which is not a field of its period",
                alias,
                field.name()
            )));
        }
        Ok(Shifter::Period {
            year: column_index(names, &fields[0].name())?,
            sub_period: match fields.get(1) {
                Some(f) => Some(column_index(names, &f.name())?),
                None => None,
            },
            periods_per_year: period.periods_per_year(),
            year_shift: offset(fields[0])?,
            sub_period_shift: match fields.get(1) {
                Some(f) => offset(*f)?,
                None => 0,
            },
        })
    }

    fn shift(&self, point: &[Value]) -> Option<Vec<Value>> {
        let mut shifted = point.to_vec();
        match self {
            Shifter::Period {
                year,
                sub_period,
                periods_per_year,
                year_shift,
                sub_period_shift,
            } => {
                let y = integer(&point[*year])?;
                match sub_period {
                    None => shifted[*year] = with_integer(&point[*year], y.checked_add(*year_shift)?),
                    Some(sub) => {
                        let s = integer(&point[*sub])?;
                        let n = *periods_per_year;
                        let index = y
                            .checked_add(*year_shift)?
                            .checked_mul(n)?
                            .checked_add(s.checked_sub(1)?)?
                            .checked_add(*sub_period_shift)?;
                        shifted[*year] = with_integer(&point[*year], index.div_euclid(n));
                        shifted[*sub] = with_integer(&point[*sub], index.rem_euclid(n) + 1);
                    }
                }
            }
            Shifter::Bucket {
                group,
                value,
                buckets,
                group_shift,
                value_shift,
            } => {
                let name = point[*group].as_str()?;
                let group_index = buckets.iter().position(|(b, _)| b == name)?;
                let member_index = buckets[group_index].1.iter().position(|v| *v == point[*value])?;
                let target_group = group_shift.apply(group_index, buckets.len())?;
                let members = &buckets[target_group].1;
                let target_member = value_shift.apply(member_index, members.len())?;
                shifted[*group] = Value::from(buckets[target_group].0.as_str());
                shifted[*value] = members[target_member].clone();
            }
            Shifter::Parent { ancestors } => {
                let level = ancestors.iter().find(|&&i| !point[i].is_total())?;
                shifted[*level] = Value::total();
            }
        }
        Some(shifted)
    }
}

/// Integer value of a period cell. Totals have none.
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Str(s) => s.trim().parse().ok(),
        other => other.as_i64(),
    }
}

/// `n` in the representation of `like`.
fn with_integer(like: &Value, n: i64) -> Value {
    match like {
        Value::Str(_) => Value::Str(n.to_string()),
        Value::Float(_) => Value::Float(n as f64),
        _ => Value::Int(n),
    }
}

/// Combine the current and reference values.
pub fn compare(method: ComparisonMethod, current: &Value, reference: &Value) -> Value {
    if let (ComparisonMethod::AbsoluteDifference, Value::Int(a), Value::Int(b)) = (method, current, reference) {
        return a.checked_sub(*b).map(Value::Int).unwrap_or(Value::Null);
    }
    let (Some(a), Some(b)) = (current.as_f64(), reference.as_f64()) else {
        return Value::Null;
    };
    match method {
        ComparisonMethod::AbsoluteDifference => Value::Float(a - b),
        ComparisonMethod::RelativeDifference if b != 0.0 => Value::Float((a - b) / b),
        ComparisonMethod::Divide if b != 0.0 => Value::Float(a / b),
        _ => Value::Null,
    }
}

/// Values of the comparison `measure` for every row of `current`, reading
/// reference values from `reference`. A missing reference row gives `NULL`.
pub fn evaluate(
    measure: &Measure,
    scope: &QueryScope,
    current: &ColumnarTable,
    reference: &ColumnarTable,
) -> QueryResult<Vec<Value>> {
    let Measure::Comparison {
        comparison_method,
        measure: base,
        ..
    } = measure
    else {
        return Err(QueryError::IncorrectPath(format!(
            "'{}' is not a comparison measure",
            measure.alias()
        )));
    };
    let operand = operand_alias(base);

    let grouping = current.grouping_indices();
    let names: Vec<String> = grouping
        .iter()
        .map(|&i| current.headers()[i].name.clone())
        .collect();
    let reference_grouping = names
        .iter()
        .map(|n| {
            reference
                .column_index(n)
                .ok_or_else(|| TableError::UnknownColumn(n.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let index: HashMap<Vec<Value>, usize> = (0..reference.row_count())
        .map(|r| (reference.values_at(r, &reference_grouping), r))
        .collect();

    let shifter = Shifter::new(measure, scope, &names)?;
    let values = current.column(operand)?;
    let reference_values = reference.column(operand)?;

    Ok((0..current.row_count())
        .map(|row| {
            let reference_value = shifter
                .shift(&current.values_at(row, &grouping))
                .and_then(|point| index.get(&point))
                .map(|&r| &reference_values[r])
                .unwrap_or(&Value::Null);
            compare(*comparison_method, &values[row], reference_value)
        })
        .collect())
}
