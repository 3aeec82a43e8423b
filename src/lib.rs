//! # sqlcube
//!
//! Compiles backend-agnostic analytical queries to multi-dialect SQL and executes them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 QueryDto (wire model)                    │
//! │  (tables, joins, CTEs, rollups, criteria, measures)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [plan]
//! ┌─────────────────────────────────────────────────────────┐
//! │     MeasureArena + QueryScope + DependencyGraph          │
//! │        (scope, measure) nodes, layered order             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [executor]  ◄──── QueryCache
//! ┌─────────────────────────────────────────────────────────┐
//! │   DatabaseQuery ──[sql]──► SQL text ──[engine]──► rows   │
//! │            (rewriter per dialect, rollup post-process)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                   ColumnarTable                          │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod model;
pub mod plan;
pub mod sql;
pub mod table;

pub use error::{QueryError, QueryResult};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::cache::{CacheStats, EmptyQueryCache, InMemoryQueryCache, QueryCache};
    pub use crate::engine::{Backend, QueryEngine, SqlQueryEngine};
    pub use crate::executor::QueryExecutor;
    pub use crate::model::functions::*;
    pub use crate::model::{
        ColumnSet, ColumnSetKey, ComparisonMethod, ConditionDto, ConditionType, CriteriaDto,
        Datastore, Field, FieldType, JoinType, Measure, Period, Query, QueryDto, Store, TableDto,
        Value, VirtualTableDto, TOTAL_CELL,
    };
    pub use crate::sql::{Dialect, QueryRewriter};
    pub use crate::table::ColumnarTable;
}
