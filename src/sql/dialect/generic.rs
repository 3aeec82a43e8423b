//! Generic SQL rewriter.
//!
//! Leaves identifiers unquoted and relies on standard `rollup(...)` syntax.
//! Totals come back as `NULL` in the rolled-up columns.

use super::helpers;
use super::QueryRewriter;

/// Generic SQL rewriter.
#[derive(Debug, Clone, Copy)]
pub struct Generic;

impl QueryRewriter for Generic {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_none(ident)
    }

    // Uses default partial rollup support, no grouping() markers
}
