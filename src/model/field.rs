//! Field references as they appear in a query description.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::Value;
use crate::error::{QueryError, QueryResult};

/// A reference to something that can be selected, grouped or filtered.
///
/// Only table fields map to a physical column. Constants and function fields
/// are evaluated elsewhere and fail if asked for one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "@class")]
pub enum Field {
    /// A physical column, `column` or `store.column`.
    #[serde(rename = "TableField", rename_all = "camelCase")]
    Table {
        full_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },

    /// A literal projected as a column.
    #[serde(rename = "ConstantField")]
    Constant { value: Value },

    /// A derived expression computed outside of SQL.
    #[serde(rename = "FunctionField")]
    Function { expression: String },

    /// A reference to a column by its alias, e.g. a sub-query output.
    #[serde(rename = "AliasedField")]
    Aliased { alias: String },
}

impl Field {
    pub fn table(full_name: impl Into<String>) -> Self {
        Field::Table {
            full_name: full_name.into(),
            alias: None,
        }
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Field::Constant {
            value: value.into(),
        }
    }

    pub fn function(expression: impl Into<String>) -> Self {
        Field::Function {
            expression: expression.into(),
        }
    }

    pub fn aliased(alias: impl Into<String>) -> Self {
        Field::Aliased {
            alias: alias.into(),
        }
    }

    /// Give a table field an output alias. Other kinds are returned unchanged.
    pub fn with_alias(self, new_alias: impl Into<String>) -> Self {
        match self {
            Field::Table { full_name, .. } => Field::Table {
                full_name,
                alias: Some(new_alias.into()),
            },
            other => other,
        }
    }

    /// Stable display name: the alias when set, the raw expression otherwise.
    pub fn name(&self) -> String {
        match self {
            Field::Table {
                alias: Some(alias), ..
            } => alias.clone(),
            Field::Table { full_name, .. } => full_name.clone(),
            Field::Constant { value } => value.to_string(),
            Field::Function { expression } => expression.clone(),
            Field::Aliased { alias } => alias.clone(),
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            Field::Table { alias, .. } => alias.as_deref(),
            Field::Aliased { alias } => Some(alias),
            _ => None,
        }
    }

    /// The physical column this field reads, as `(store, column)`.
    pub fn column(&self) -> QueryResult<(Option<&str>, &str)> {
        match self {
            Field::Table { full_name, .. } => Ok(match full_name.rsplit_once('.') {
                Some((store, column)) => (Some(store), column),
                None => (None, full_name.as_str()),
            }),
            Field::Aliased { alias } => Ok((None, alias.as_str())),
            Field::Constant { value } => Err(QueryError::IncorrectPath(format!(
                "constant field {} has no column",
                value
            ))),
            Field::Function { expression } => Err(QueryError::IncorrectPath(format!(
                "function field {} has no column",
                expression
            ))),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
