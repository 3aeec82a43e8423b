//! Snowflake query rewriter.
//!
//! Snowflake folds unquoted identifiers to upper case, so every name is
//! double-quoted to keep the case the datastore declares.

use super::helpers;
use super::QueryRewriter;

/// Snowflake query rewriter.
#[derive(Debug, Clone, Copy)]
pub struct Snowflake;

impl QueryRewriter for Snowflake {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn uses_grouping_function(&self) -> bool {
        true
    }
}
