//! DuckDB query rewriter.
//!
//! - ANSI identifier quoting (`"`)
//! - Native `group by a, rollup(b)`
//! - `grouping()` to identify totals

use super::helpers;
use super::QueryRewriter;

/// DuckDB query rewriter.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl QueryRewriter for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn uses_grouping_function(&self) -> bool {
        true
    }
}
