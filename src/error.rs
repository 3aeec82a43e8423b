//! Crate-wide error type.
//!
//! Every error here is fatal for the request that raised it: nothing is retried,
//! and the error surfaces to the caller of the component that detected it.

use thiserror::Error;

use crate::cache::CacheError;
use crate::model::ConditionType;
use crate::table::TableError;

/// Result type for query compilation and execution.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while compiling or executing an analytical query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The descriptor references a physical table the datastore does not know.
    #[error("Cannot find table with name {table}. Available tables: [{}]", .known.join(", "))]
    UnknownTable { table: String, known: Vec<String> },

    /// Some rollup columns are not part of the select list.
    #[error(
        "The columns contained in rollup [{}] must be a subset of the columns contained in the select [{}]",
        .rollup.join(", "),
        .select.join(", ")
    )]
    InvalidRollup {
        rollup: Vec<String>,
        select: Vec<String>,
    },

    /// A condition node declares a type its kind does not support.
    #[error("Unsupported condition: {kind} cannot be of type {condition_type:?}")]
    UnsupportedCondition {
        kind: &'static str,
        condition_type: ConditionType,
    },

    /// No literal-quoting rule exists for the field type.
    #[error("Literal quoting is not supported for type {0}")]
    UnsupportedLiteralType(String),

    /// Comparison or measure references form a cycle.
    #[error("Cyclic dependency detected: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    /// The field resolver does not know this field.
    #[error("Cannot find field with name {0}")]
    UnknownField(String),

    /// A measure alias is referenced but never defined.
    #[error("Unknown measure: '{0}'")]
    UnknownMeasure(String),

    /// Two different measures share the same alias.
    #[error("Measure alias '{0}' is used by two different measures")]
    DuplicateMeasureAlias(String),

    /// Field or measure asked for something it cannot provide.
    #[error("Incorrect path of execution: {0}")]
    IncorrectPath(String),

    /// The query description is structurally invalid.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The backend collaborator failed to execute a statement.
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// A spawned scope execution was aborted before completing.
    #[error("Scope execution was cancelled: {0}")]
    Cancelled(String),
}

impl QueryError {
    /// Create a backend error from any displayable message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Create an invalid-query error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }
}
