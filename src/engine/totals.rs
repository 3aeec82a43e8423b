//! Rollup post-processing: rewrite backend total markers to [`TOTAL_CELL`].
//!
//! [`TOTAL_CELL`]: crate::model::TOTAL_CELL

use crate::error::QueryResult;
use crate::model::Value;
use crate::sql::dialect::helpers;
use crate::sql::DatabaseQuery;
use crate::table::ColumnarTable;

/// Replace rolled-up cells of `table` with the total sentinel.
///
/// With `grouping()` markers, every `___grouping___<field>___` column is
/// dropped and `<field>` is overwritten wherever the marker equals 1,
/// whatever numeric type the backend used for it. Without markers, a `NULL`
/// in a rolled-up column is read as a total.
pub fn mark_totals(table: &mut ColumnarTable, query: &DatabaseQuery, uses_grouping_function: bool) -> QueryResult<()> {
    if uses_grouping_function {
        let markers: Vec<String> = table
            .headers()
            .iter()
            .filter(|h| helpers::is_grouping_alias(&h.name))
            .map(|h| h.name.clone())
            .collect();
        for marker in markers {
            let (_, flags) = table.remove_column(&marker)?;
            let Some(field) = helpers::field_from_grouping_alias(&marker) else {
                continue;
            };
            let column = table.column_mut(&field)?;
            for (cell, flag) in column.iter_mut().zip(&flags) {
                if flag.as_f64() == Some(1.0) {
                    *cell = Value::total();
                }
            }
        }
    } else {
        for field in query.grouping_select() {
            let column = table.column_mut(&field.name())?;
            for cell in column.iter_mut().filter(|c| c.is_null()) {
                *cell = Value::total();
            }
        }
    }
    Ok(())
}
