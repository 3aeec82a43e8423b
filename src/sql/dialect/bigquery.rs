//! BigQuery query rewriter.
//!
//! BigQuery rejects `group by a, rollup(b)`, so partial rollups are expanded
//! into `grouping sets`. Table names are project/dataset qualified and each
//! path segment is quoted on its own.

use super::helpers;
use super::QueryRewriter;

/// BigQuery query rewriter.
#[derive(Debug, Clone, Copy)]
pub struct BigQuery;

impl QueryRewriter for BigQuery {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn table_name(&self, table: &str) -> String {
        table
            .split('.')
            .map(helpers::quote_backtick)
            .collect::<Vec<_>>()
            .join(".")
    }

    fn uses_partial_rollup_syntax(&self) -> bool {
        false
    }

    fn uses_grouping_function(&self) -> bool {
        true
    }
}
