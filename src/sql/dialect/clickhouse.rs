//! ClickHouse query rewriter.
//!
//! No partial rollup and no `grouping()`: rolled-up cells come back as `NULL`
//! (with `group_by_use_nulls` enabled on the server).

use super::helpers;
use super::QueryRewriter;

/// ClickHouse query rewriter.
#[derive(Debug, Clone, Copy)]
pub struct ClickHouse;

impl QueryRewriter for ClickHouse {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn uses_partial_rollup_syntax(&self) -> bool {
        false
    }
}
