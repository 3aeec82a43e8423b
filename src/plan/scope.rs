//! Scopes: the identity of one physical query.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::cache::{compute_hash, CacheError};
use crate::error::QueryResult;
use crate::model::{ColumnSet, ColumnSetKey, CriteriaDto, Field, QueryDto, TableDto, VirtualTableDto};

/// Hash of a [`QueryScope`]. Equal scopes have equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeKey(String);

impl ScopeKey {
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.get(..12).unwrap_or(&self.0))
    }
}

/// Shape of a query independent of the measures it computes: tables, filters
/// and groups. Two requests with equal scopes share one execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryScope {
    pub table: Option<TableDto>,
    pub sub_query: Option<Box<QueryDto>>,
    pub columns: Vec<Field>,
    pub rollup_columns: Vec<Field>,
    pub grouping_sets: Vec<Vec<Field>>,
    pub column_sets: BTreeMap<ColumnSetKey, ColumnSet>,
    pub where_criteria: Option<CriteriaDto>,
    pub having_criteria: Option<CriteriaDto>,
    pub limit: Option<u64>,
    pub virtual_tables: Vec<VirtualTableDto>,
}

impl QueryScope {
    pub fn of(query: &QueryDto) -> Self {
        Self {
            table: query.table.clone(),
            sub_query: query.sub_query.clone(),
            columns: query.columns.clone(),
            rollup_columns: query.rollup_columns.clone(),
            grouping_sets: query.grouping_sets.clone(),
            column_sets: query.column_sets.clone(),
            where_criteria: query.where_criteria.clone(),
            having_criteria: query.having_criteria.clone(),
            limit: query.limit,
            virtual_tables: query.virtual_tables.clone(),
        }
    }

    pub fn key(&self) -> QueryResult<ScopeKey> {
        let hash = compute_hash(self).map_err(CacheError::from)?;
        Ok(ScopeKey(hash))
    }

    /// Copy used to prefetch reference rows: no post-aggregation filter and
    /// no limit, so every reference position is available.
    pub fn prefetch(&self) -> Self {
        Self {
            having_criteria: None,
            limit: None,
            ..self.clone()
        }
    }

    /// Grouping column names of this scope's result, in order: column-set
    /// columns first, then the selected columns.
    pub fn grouping_names(&self) -> Vec<String> {
        self.column_sets
            .values()
            .map(|set| set.new_column().name())
            .chain(self.columns.iter().map(Field::name))
            .collect()
    }

    pub fn has_column(&self, field: &Field) -> bool {
        let name = field.name();
        self.columns.iter().any(|c| c.name() == name)
    }
}

impl fmt::Display for QueryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.table, &self.sub_query) {
            (Some(table), _) => write!(f, "table={}", table.table_names().join("+"))?,
            (None, Some(_)) => write!(f, "table=(sub-query)")?,
            (None, None) => write!(f, "table=?")?,
        }
        let names = |fields: &[Field]| fields.iter().map(Field::name).collect::<Vec<_>>().join(", ");
        write!(f, ", columns=[{}]", names(&self.columns))?;
        if !self.rollup_columns.is_empty() {
            write!(f, ", rollup=[{}]", names(&self.rollup_columns))?;
        }
        if !self.grouping_sets.is_empty() {
            let sets: Vec<String> = self
                .grouping_sets
                .iter()
                .map(|s| format!("[{}]", names(s)))
                .collect();
            write!(f, ", groupingSets=[{}]", sets.join(", "))?;
        }
        if let Some(criteria) = &self.where_criteria {
            let fields: Vec<String> = criteria.fields().into_iter().map(Field::name).collect();
            write!(f, ", where on [{}]", fields.join(", "))?;
        }
        if self.having_criteria.is_some() {
            write!(f, ", having")?;
        }
        if let Some(limit) = self.limit {
            write!(f, ", limit={}", limit)?;
        }
        Ok(())
    }
}

/// Unit of work of the plan: one measure computed in one scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryPlanNodeKey {
    pub scope: ScopeKey,
    pub measure: String,
}

impl QueryPlanNodeKey {
    pub fn new(scope: ScopeKey, measure: impl Into<String>) -> Self {
        Self {
            scope,
            measure: measure.into(),
        }
    }
}

impl fmt::Display for QueryPlanNodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.measure, self.scope)
    }
}
