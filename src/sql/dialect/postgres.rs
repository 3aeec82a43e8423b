//! PostgreSQL query rewriter.

use super::helpers;
use super::QueryRewriter;

/// PostgreSQL query rewriter.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl QueryRewriter for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn uses_grouping_function(&self) -> bool {
        true
    }
}
