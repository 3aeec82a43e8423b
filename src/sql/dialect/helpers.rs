//! Shared helper functions for query rewriter implementations.
//!
//! Dialects compose these to implement `QueryRewriter` with minimal duplication.

use std::sync::LazyLock;

use regex::Regex;

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, DuckDB, Snowflake
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: BigQuery, Databricks, ClickHouse
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Leave identifier as written.
/// Used by: Generic
pub fn quote_none(ident: &str) -> String {
    ident.to_string()
}

// =============================================================================
// Grouping Markers
// =============================================================================

const GROUPING_PREFIX: &str = "___grouping___";
const GROUPING_SUFFIX: &str = "___";

static GROUPING_ALIAS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^___grouping___(.+)___$").unwrap());

/// Name of the column holding `grouping(<field>)`.
pub fn grouping_alias(field: &str) -> String {
    format!("{}{}{}", GROUPING_PREFIX, field, GROUPING_SUFFIX)
}

/// Recover the field name from a grouping-marker column name.
pub fn field_from_grouping_alias(alias: &str) -> Option<&str> {
    GROUPING_ALIAS_PATTERN
        .captures(alias)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Whether a column name is a grouping marker.
pub fn is_grouping_alias(name: &str) -> bool {
    GROUPING_ALIAS_PATTERN.is_match(name)
}
