//! The compiled query descriptor: one SQL-producing unit.

use super::condition::CompiledCriteria;
use super::dialect::helpers;
use super::expression::{CompiledMeasure, TypedField};
use crate::model::{JoinType, VirtualTableDto};

/// A table reference with its joins resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTable {
    pub name: String,
    /// The name refers to a virtual table of the same query.
    pub is_cte: bool,
    pub joins: Vec<CompiledJoin>,
}

impl CompiledTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_cte: false,
            joins: Vec::new(),
        }
    }

    fn collect_physical<'a>(&'a self, out: &mut Vec<&'a str>) {
        if !self.is_cte {
            out.push(&self.name);
        }
        for join in &self.joins {
            join.table.collect_physical(out);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledJoin {
    pub table: CompiledTable,
    pub join_type: JoinType,
    pub criteria: Option<CompiledCriteria>,
}

/// Validated shape of one statement.
///
/// Exactly one of `table` and `sub_query` is set; `rollup` and
/// `grouping_sets` are mutually exclusive; `rollup` is a subset of `select`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatabaseQuery {
    pub table: Option<CompiledTable>,
    pub sub_query: Option<Box<DatabaseQuery>>,
    pub virtual_tables: Vec<VirtualTableDto>,
    pub select: Vec<TypedField>,
    pub rollup: Vec<TypedField>,
    pub grouping_sets: Vec<Vec<TypedField>>,
    pub measures: Vec<CompiledMeasure>,
    pub where_criteria: Option<CompiledCriteria>,
    pub having_criteria: Option<CompiledCriteria>,
    pub limit: Option<u64>,
}

impl DatabaseQuery {
    /// Columns that get a `grouping(...)` marker: the rollup columns, or with
    /// explicit grouping sets the select columns missing from some set.
    pub fn grouping_select(&self) -> Vec<&TypedField> {
        if self.grouping_sets.is_empty() {
            return self.rollup.iter().collect();
        }
        self.select
            .iter()
            .filter(|f| self.grouping_sets.iter().any(|set| !set.contains(*f)))
            .collect()
    }

    /// Whether some rows of the result are totals.
    pub fn has_totals(&self) -> bool {
        !self.grouping_select().is_empty()
    }

    /// Column names of the backend result, in order: select columns, then
    /// grouping markers if the dialect uses them, then measures.
    pub fn column_names(&self, uses_grouping_function: bool) -> Vec<String> {
        let mut names: Vec<String> = self.select.iter().map(TypedField::name).collect();
        if uses_grouping_function {
            names.extend(
                self.grouping_select()
                    .into_iter()
                    .map(|f| helpers::grouping_alias(&f.name())),
            );
        }
        names.extend(self.measures.iter().map(|m| m.alias().to_string()));
        names
    }

    /// Physical tables read by this statement, sub-queries included.
    pub fn physical_tables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        if let Some(table) = &self.table {
            table.collect_physical(&mut out);
        }
        if let Some(sub) = &self.sub_query {
            out.extend(sub.physical_tables());
        }
        out
    }
}
