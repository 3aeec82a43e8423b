//! Query rewriters: per-backend naming, quoting and syntax capabilities.
//!
//! The statement generator has no per-backend conditionals of its own. Every
//! difference goes through [`QueryRewriter`]:
//!
//! - Identifier quoting: none (generic), `"` (DuckDB/Postgres/Snowflake),
//!   `` ` `` (BigQuery/Databricks/ClickHouse)
//! - Partial rollup: `group by a, rollup(b)` natively, or expanded into
//!   `grouping sets`
//! - Total markers: explicit `grouping(...)` columns, or `NULL` cells
//!
//! | Dialect | Quoting | Partial rollup | `grouping()` |
//! |------------|---------|----------------|--------------|
//! | generic | none | ✓ | ❌ |
//! | duckdb | `"` | ✓ | ✓ |
//! | postgres | `"` | ✓ | ✓ |
//! | snowflake | `"` | ✓ | ✓ |
//! | databricks | `` ` `` | ✓ | ✓ |
//! | bigquery | `` ` `` | ❌ | ✓ |
//! | clickhouse | `` ` `` | ❌ | ❌ |
//!
//! # Usage
//!
//! ```ignore
//! use sqlcube::sql::{Dialect, QueryRewriter};
//!
//! let dialect: Dialect = "postgres".parse()?;
//! assert_eq!(dialect.table_name("sales"), "\"sales\"");
//! ```

mod bigquery;
mod clickhouse;
mod databricks;
mod duckdb;
mod generic;
pub mod helpers;
mod postgres;
mod snowflake;

pub use bigquery::BigQuery;
pub use clickhouse::ClickHouse;
pub use databricks::Databricks;
pub use duckdb::DuckDb;
pub use generic::Generic;
pub use postgres::Postgres;
pub use snowflake::Snowflake;

use std::str::FromStr;

use super::expression::TypedField;
use crate::error::QueryResult;

/// Rewriter trait - defines how a backend names and groups things.
///
/// The defaults render every name through `quote_identifier` and assume
/// native partial rollup without `grouping()` markers.
pub trait QueryRewriter: std::fmt::Debug + Send + Sync {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Naming and Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Render a column name.
    fn field_name(&self, field: &str) -> String {
        self.quote_identifier(field)
    }

    /// Render a physical table name.
    fn table_name(&self, table: &str) -> String {
        self.quote_identifier(table)
    }

    /// Render the name of a virtual table (CTE).
    fn cte_name(&self, cte: &str) -> String {
        self.quote_identifier(cte)
    }

    /// Render a measure alias.
    fn measure_alias(&self, alias: &str) -> String {
        self.quote_identifier(alias)
    }

    // =========================================================================
    // Field Rendering
    // =========================================================================

    /// Render a field in a `select` or `group by` position, without alias.
    fn select(&self, field: &TypedField) -> QueryResult<String> {
        field.sql_expression(self)
    }

    /// Render a field inside `rollup(...)` or `grouping sets(...)`.
    fn rollup(&self, field: &TypedField) -> QueryResult<String> {
        self.select(field)
    }

    // =========================================================================
    // Grouping Capabilities
    // =========================================================================

    /// Whether `group by a, rollup(b)` is understood natively.
    fn uses_partial_rollup_syntax(&self) -> bool {
        true
    }

    /// Whether totals are identified through `grouping(...)` marker columns.
    ///
    /// When false, a `NULL` in a rolled-up column marks a total.
    fn uses_grouping_function(&self) -> bool {
        false
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    Generic,
    #[default]
    DuckDb,
    Postgres,
    Snowflake,
    Databricks,
    BigQuery,
    ClickHouse,
}

impl Dialect {
    /// Every dialect, in declaration order.
    pub const ALL: [Dialect; 7] = [
        Dialect::Generic,
        Dialect::DuckDb,
        Dialect::Postgres,
        Dialect::Snowflake,
        Dialect::Databricks,
        Dialect::BigQuery,
        Dialect::ClickHouse,
    ];

    /// Get the rewriter implementation.
    pub fn rewriter(&self) -> &'static dyn QueryRewriter {
        match self {
            Dialect::Generic => &Generic,
            Dialect::DuckDb => &DuckDb,
            Dialect::Postgres => &Postgres,
            Dialect::Snowflake => &Snowflake,
            Dialect::Databricks => &Databricks,
            Dialect::BigQuery => &BigQuery,
            Dialect::ClickHouse => &ClickHouse,
        }
    }
}

// Implement QueryRewriter for Dialect enum by delegating to concrete types
impl QueryRewriter for Dialect {
    fn name(&self) -> &'static str {
        self.rewriter().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.rewriter().quote_identifier(ident)
    }

    fn field_name(&self, field: &str) -> String {
        self.rewriter().field_name(field)
    }

    fn table_name(&self, table: &str) -> String {
        self.rewriter().table_name(table)
    }

    fn cte_name(&self, cte: &str) -> String {
        self.rewriter().cte_name(cte)
    }

    fn measure_alias(&self, alias: &str) -> String {
        self.rewriter().measure_alias(alias)
    }

    fn select(&self, field: &TypedField) -> QueryResult<String> {
        self.rewriter().select(field)
    }

    fn rollup(&self, field: &TypedField) -> QueryResult<String> {
        self.rewriter().rollup(field)
    }

    fn uses_partial_rollup_syntax(&self) -> bool {
        self.rewriter().uses_partial_rollup_syntax()
    }

    fn uses_grouping_function(&self) -> bool {
        self.rewriter().uses_grouping_function()
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generic" | "ansi" => Ok(Dialect::Generic),
            "duckdb" => Ok(Dialect::DuckDb),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "snowflake" => Ok(Dialect::Snowflake),
            "databricks" | "spark" => Ok(Dialect::Databricks),
            "bigquery" => Ok(Dialect::BigQuery),
            "clickhouse" => Ok(Dialect::ClickHouse),
            other => Err(format!("unknown dialect: {}", other)),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rewriter().name())
    }
}
