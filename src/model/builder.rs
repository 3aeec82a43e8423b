//! Fluent construction of [`QueryDto`].

use std::marker::PhantomData;

use super::column_set::ColumnSet;
use super::condition::CriteriaDto;
use super::field::Field;
use super::measure::Measure;
use super::query::{JoinDto, JoinType, OrderDto, Parameter, QueryDto, TableDto, VirtualTableDto};

/// Entry point of the builder.
pub struct Query;

/// Root of a builder started with [`Query::from`]. Only these accept joins.
#[derive(Debug, Clone, Copy)]
pub struct TableRoot;

/// Root of a builder started with [`Query::from_sub_query`].
#[derive(Debug, Clone, Copy)]
pub struct SubQueryRoot;

impl Query {
    /// Start a query on a table.
    #[allow(clippy::should_implement_trait)]
    pub fn from(table: impl Into<String>) -> QueryBuilder<TableRoot> {
        QueryBuilder::new(QueryDto {
            table: Some(TableDto::new(table)),
            ..Default::default()
        })
    }

    /// Start a query on the result of another query.
    ///
    /// Such a query has no main table to join to:
    ///
    /// ```compile_fail
    /// use sqlcube::model::{JoinType, Query};
    ///
    /// let inner = Query::from("sales").build();
    /// Query::from_sub_query(inner).join("products", JoinType::Inner);
    /// ```
    pub fn from_sub_query(sub_query: QueryDto) -> QueryBuilder<SubQueryRoot> {
        QueryBuilder::new(QueryDto {
            sub_query: Some(Box::new(sub_query)),
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder<R = TableRoot> {
    query: QueryDto,
    root: PhantomData<R>,
}

impl QueryBuilder<TableRoot> {
    /// Join a table to the main table; finish with [`JoinBuilder::on`].
    /// The joined table may carry joins of its own.
    pub fn join(self, table: impl Into<TableDto>, join_type: JoinType) -> JoinBuilder {
        JoinBuilder {
            parent: self,
            table: table.into(),
            join_type,
        }
    }
}

impl<R> QueryBuilder<R> {
    fn new(query: QueryDto) -> Self {
        Self {
            query,
            root: PhantomData,
        }
    }

    pub fn with_virtual_table(mut self, table: VirtualTableDto) -> Self {
        self.query.virtual_tables.push(table);
        self
    }

    pub fn where_(mut self, criteria: CriteriaDto) -> Self {
        self.query.where_criteria = Some(criteria);
        self
    }

    pub fn select(mut self, columns: Vec<Field>, measures: Vec<Measure>) -> Self {
        self.query.columns = columns;
        self.query.measures = measures;
        self
    }

    pub fn column_set(mut self, set: ColumnSet) -> Self {
        self.query.column_sets.insert(set.key(), set);
        self
    }

    pub fn rollup(mut self, columns: Vec<Field>) -> Self {
        self.query.rollup_columns = columns;
        self
    }

    pub fn grouping_sets(mut self, sets: Vec<Vec<Field>>) -> Self {
        self.query.grouping_sets = sets;
        self
    }

    pub fn having(mut self, criteria: CriteriaDto) -> Self {
        self.query.having_criteria = Some(criteria);
        self
    }

    pub fn order_by(mut self, field: Field, order: OrderDto) -> Self {
        self.query.orders.push((field, order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, parameter: Parameter) -> Self {
        self.query.parameters.insert(key.into(), parameter);
        self
    }

    pub fn build(self) -> QueryDto {
        self.query
    }
}

/// Pending join waiting for its condition.
#[derive(Debug, Clone)]
pub struct JoinBuilder {
    parent: QueryBuilder<TableRoot>,
    table: TableDto,
    join_type: JoinType,
}

impl JoinBuilder {
    pub fn on(self, criteria: CriteriaDto) -> QueryBuilder<TableRoot> {
        self.attach(Some(criteria))
    }

    /// Join without condition (cross join).
    pub fn unconditionally(self) -> QueryBuilder<TableRoot> {
        self.attach(None)
    }

    fn attach(self, criteria: Option<CriteriaDto>) -> QueryBuilder<TableRoot> {
        let JoinBuilder {
            mut parent,
            table,
            join_type,
        } = self;
        // A table root always has a main table.
        if let Some(main) = parent.query.table.as_mut() {
            main.joins.push(JoinDto {
                table,
                join_type,
                join_criteria: criteria,
            });
        }
        parent
    }
}
