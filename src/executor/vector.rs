//! Vector tuple aggregation.

use std::collections::HashMap;

use crate::error::{QueryError, QueryResult};
use crate::model::{Measure, Value};
use crate::plan::vector_component_alias;
use crate::table::{ColumnarTable, TableError};

/// Values of the vector `measure` for every row of `current`.
///
/// `vectors` holds the component aggregates split along the vector axis. The
/// rows matching a point of `current` are ordered by axis value; each element
/// is the component value, or a list of them when there are several. The
/// transformer, if any, reduces the vector to one value.
pub fn evaluate(measure: &Measure, current: &ColumnarTable, vectors: &ColumnarTable) -> QueryResult<Vec<Value>> {
    let Measure::VectorTupleAgg {
        alias,
        field_to_aggregate_and_agg_func,
        vector_axis,
        transformer,
    } = measure
    else {
        return Err(QueryError::IncorrectPath(format!(
            "'{}' is not a vector measure",
            measure.alias()
        )));
    };

    let lookup = |table: &ColumnarTable, name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    };
    let grouping = current.grouping_indices();
    let vector_grouping = grouping
        .iter()
        .map(|&i| lookup(vectors, &current.headers()[i].name))
        .collect::<Result<Vec<_>, _>>()?;
    let axis = lookup(vectors, &vector_axis.name())?;
    let components = (0..field_to_aggregate_and_agg_func.len())
        .map(|i| lookup(vectors, &vector_component_alias(alias, i)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut groups: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
    for row in 0..vectors.row_count() {
        groups
            .entry(vectors.values_at(row, &vector_grouping))
            .or_default()
            .push(row);
    }
    let columns = vectors.columns();
    for rows in groups.values_mut() {
        rows.sort_by(|&a, &b| columns[axis][a].cmp(&columns[axis][b]));
    }

    Ok((0..current.row_count())
        .map(|row| {
            let Some(rows) = groups.get(&current.values_at(row, &grouping)) else {
                return Value::Null;
            };
            let elements: Vec<Value> = rows
                .iter()
                .map(|&r| match components.as_slice() {
                    [single] => columns[*single][r].clone(),
                    many => Value::List(many.iter().map(|&c| columns[c][r].clone()).collect()),
                })
                .collect();
            match transformer {
                Some(transformer) => transformer.apply(&elements),
                None => Value::List(elements),
            }
        })
        .collect())
}
