//! Bucket column sets, computed in memory.

use crate::error::{QueryError, QueryResult};
use crate::model::{FieldType, Value};
use crate::plan::QueryScope;
use crate::table::{ColumnarTable, Header};

/// Add the bucket column of every column set of `scope` to `table`.
///
/// A row is emitted once per bucket containing its source value, in bucket
/// order; rows in no bucket are dropped. The bucket column goes first.
pub fn expand_buckets(table: ColumnarTable, scope: &QueryScope) -> QueryResult<ColumnarTable> {
    let mut result = table;
    for set in scope.column_sets.values().rev() {
        let source = set.source_column().name();
        let values = result.column(&source).map_err(|_| {
            QueryError::invalid(format!(
                "column set '{}' reads {} which is not selected",
                set.new_column().name(),
                source
            ))
        })?;

        let mut rows = Vec::new();
        let mut buckets = Vec::new();
        for (row, value) in values.iter().enumerate() {
            for bucket in set.buckets_of(value) {
                rows.push(row);
                buckets.push(Value::from(bucket));
            }
        }
        result = result.take_rows(&rows);
        result.insert_column(
            0,
            Header::grouping(set.new_column().name(), FieldType::String),
            buckets,
        )?;
    }
    Ok(result)
}
