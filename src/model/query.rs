//! The query description exchanged with clients.
//!
//! Field names and `@class` tags are part of the cross-client wire contract
//! and are checked against golden fixtures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::column_set::{ColumnSet, ColumnSetKey};
use super::condition::CriteriaDto;
use super::field::Field;
use super::measure::Measure;
use super::types::Value;

/// Key of the cache parameter in [`QueryDto::parameters`].
pub const CACHE_PARAMETER_KEY: &str = "cache";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinType {
    pub fn sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "inner join",
            JoinType::Left => "left join",
            JoinType::Right => "right join",
            JoinType::Full => "full join",
            JoinType::Cross => "cross join",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDto {
    pub table: TableDto,
    #[serde(rename = "type")]
    pub join_type: JoinType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_criteria: Option<CriteriaDto>,
}

/// A table and the tables joined to it. Joined tables may declare joins of
/// their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDto {
    pub name: String,
    #[serde(default)]
    pub joins: Vec<JoinDto>,
}

impl From<&str> for TableDto {
    fn from(name: &str) -> Self {
        TableDto::new(name)
    }
}

impl From<String> for TableDto {
    fn from(name: String) -> Self {
        TableDto::new(name)
    }
}

impl TableDto {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            joins: Vec::new(),
        }
    }

    pub fn join(mut self, table: TableDto, join_type: JoinType, criteria: Option<CriteriaDto>) -> Self {
        self.joins.push(JoinDto {
            table,
            join_type,
            join_criteria: criteria,
        });
        self
    }

    /// This table and every joined table, depth first in declaration order.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names = vec![self.name.as_str()];
        for join in &self.joins {
            names.extend(join.table.table_names());
        }
        names
    }
}

/// An inline table defined by literal rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualTableDto {
    pub name: String,
    pub fields: Vec<String>,
    pub records: Vec<Vec<Value>>,
}

impl VirtualTableDto {
    pub fn new(name: impl Into<String>, fields: Vec<String>, records: Vec<Vec<Value>>) -> Self {
        Self {
            name: name.into(),
            fields,
            records,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKeyword {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@class")]
pub enum OrderDto {
    #[serde(rename = "SimpleOrderDto")]
    Simple { order: OrderKeyword },
    /// Listed values first, in list order; other values after, naturally ordered.
    #[serde(rename = "ExplicitOrderDto")]
    Explicit { explicit: Vec<Value> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheAction {
    Use,
    NotUse,
    Invalidate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@class")]
pub enum Parameter {
    #[serde(rename = "QueryCacheParameter")]
    QueryCache { action: CacheAction },
}

/// A complete analytical request.
///
/// Exactly one of `table` and `sub_query` is set. `rollup_columns` and
/// `grouping_sets` are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_query: Option<Box<QueryDto>>,
    #[serde(default)]
    pub columns: Vec<Field>,
    #[serde(default)]
    pub rollup_columns: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grouping_sets: Vec<Vec<Field>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub column_sets: BTreeMap<ColumnSetKey, ColumnSet>,
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default, rename = "whereCriteriaDto", skip_serializing_if = "Option::is_none")]
    pub where_criteria: Option<CriteriaDto>,
    #[serde(default, rename = "havingCriteriaDto", skip_serializing_if = "Option::is_none")]
    pub having_criteria: Option<CriteriaDto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orders: Vec<(Field, OrderDto)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, rename = "virtualTableDtos", skip_serializing_if = "Vec::is_empty")]
    pub virtual_tables: Vec<VirtualTableDto>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,
}

impl QueryDto {
    pub fn cache_action(&self) -> CacheAction {
        match self.parameters.get(CACHE_PARAMETER_KEY) {
            Some(Parameter::QueryCache { action }) => *action,
            None => CacheAction::Use,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
