//! In-memory ordering of the final result.

use std::cmp::Ordering;

use crate::error::QueryResult;
use crate::model::{Field, OrderDto, OrderKeyword, Value};
use crate::table::{ColumnarTable, TableError};

/// Sort rows by `orders`, or by every grouping column ascending when no order
/// is given. Total cells always come first.
pub fn order_rows(table: &ColumnarTable, orders: &[(Field, OrderDto)]) -> QueryResult<ColumnarTable> {
    let default_order = OrderDto::Simple {
        order: OrderKeyword::Asc,
    };
    let keys: Vec<(usize, &OrderDto)> = if orders.is_empty() {
        table
            .grouping_indices()
            .into_iter()
            .map(|i| (i, &default_order))
            .collect()
    } else {
        orders
            .iter()
            .map(|(field, order)| {
                let name = field.name();
                table
                    .column_index(&name)
                    .map(|i| (i, order))
                    .ok_or(TableError::UnknownColumn(name))
            })
            .collect::<Result<_, _>>()?
    };

    let columns = table.columns();
    let mut rows: Vec<usize> = (0..table.row_count()).collect();
    rows.sort_by(|&a, &b| {
        keys.iter()
            .map(|(i, order)| compare(&columns[*i][a], &columns[*i][b], order))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    Ok(table.take_rows(&rows))
}

fn compare(a: &Value, b: &Value, order: &OrderDto) -> Ordering {
    match (a.is_total(), b.is_total()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }
    match order {
        OrderDto::Simple {
            order: OrderKeyword::Asc,
        } => a.cmp(b),
        OrderDto::Simple {
            order: OrderKeyword::Desc,
        } => b.cmp(a),
        OrderDto::Explicit { explicit } => {
            let position = |v: &Value| explicit.iter().position(|e| e == v);
            match (position(a), position(b)) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => a.cmp(b),
            }
        }
    }
}
