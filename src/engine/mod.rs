//! Backend boundary.
//!
//! A [`Backend`] executes SQL text and returns a column table whose columns
//! are, in order: the select columns, one `grouping()` marker per rolled-up
//! column when the dialect uses markers, then the measures. [`SqlQueryEngine`]
//! checks tables, generates the statement, runs it and rewrites totals.

mod totals;

pub use totals::mark_totals;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::{QueryError, QueryResult};
use crate::model::Datastore;
use crate::sql::{translate, DatabaseQuery, Dialect, QueryRewriter};
use crate::table::ColumnarTable;

/// A concrete SQL engine.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Schema of the tables this backend can read.
    fn datastore(&self) -> &Datastore;

    /// Run `sql`, compiled from `query`. Column order must follow
    /// [`DatabaseQuery::column_names`].
    async fn execute(&self, sql: &str, query: &DatabaseQuery) -> QueryResult<ColumnarTable>;
}

/// Compiles and executes database queries.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    fn datastore(&self) -> &Datastore;

    fn rewriter(&self) -> &dyn QueryRewriter;

    /// SQL for `query`, after checking every physical table exists.
    fn sql(&self, query: &DatabaseQuery) -> QueryResult<String>;

    /// Execute `query` and return its post-processed result.
    async fn execute(&self, query: &DatabaseQuery) -> QueryResult<ColumnarTable>;
}

/// [`QueryEngine`] generating SQL with a rewriter and running it on a backend.
pub struct SqlQueryEngine<B> {
    backend: B,
    rewriter: Arc<dyn QueryRewriter>,
}

impl<B: Backend> SqlQueryEngine<B> {
    pub fn new(backend: B, dialect: Dialect) -> Self {
        Self {
            backend,
            rewriter: Arc::new(dialect),
        }
    }

    /// Engine using a rewriter outside the built-in dialects.
    pub fn with_rewriter(backend: B, rewriter: Arc<dyn QueryRewriter>) -> Self {
        Self { backend, rewriter }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn check_tables(&self, query: &DatabaseQuery) -> QueryResult<()> {
        let datastore = self.backend.datastore();
        for table in query.physical_tables() {
            if datastore.store(table).is_none() {
                return Err(QueryError::UnknownTable {
                    table: table.to_string(),
                    known: datastore.store_names(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<B: Backend> QueryEngine for SqlQueryEngine<B> {
    fn datastore(&self) -> &Datastore {
        self.backend.datastore()
    }

    fn rewriter(&self) -> &dyn QueryRewriter {
        self.rewriter.as_ref()
    }

    fn sql(&self, query: &DatabaseQuery) -> QueryResult<String> {
        self.check_tables(query)?;
        translate(query, self.rewriter.as_ref())
    }

    async fn execute(&self, query: &DatabaseQuery) -> QueryResult<ColumnarTable> {
        let sql = self.sql(query)?;
        info!(dialect = self.rewriter.name(), sql = %sql, "executing statement");
        let mut table = self.backend.execute(&sql, query).await?;
        if query.has_totals() {
            mark_totals(&mut table, query, self.rewriter.uses_grouping_function())?;
        }
        Ok(table)
    }
}
