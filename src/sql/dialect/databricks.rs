//! Databricks (Spark SQL) query rewriter.
//!
//! - Backtick identifier quoting
//! - Native partial rollup
//! - `grouping()` returns a narrow integer type; the engine compares its
//!   numeric value

use super::helpers;
use super::QueryRewriter;

/// Databricks query rewriter.
#[derive(Debug, Clone, Copy)]
pub struct Databricks;

impl QueryRewriter for Databricks {
    fn name(&self) -> &'static str {
        "databricks"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn uses_grouping_function(&self) -> bool {
        true
    }
}
