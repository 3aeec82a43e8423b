//! Query description model.
//!
//! These are the wire types a client sends: fields, measures, conditions and
//! the query itself, plus the datastore schema they are resolved against.
//! Nothing here knows about SQL dialects; see [`crate::plan`] for resolution
//! and [`crate::sql`] for rendering.

mod builder;
mod column_set;
mod condition;
mod field;
pub mod functions;
mod measure;
mod query;
mod store;
mod types;

pub use builder::{JoinBuilder, Query, QueryBuilder, SubQueryRoot, TableRoot};
pub use column_set::{ColumnSet, ColumnSetKey};
pub use condition::{ConditionDto, ConditionType, CriteriaDto};
pub use field::Field;
pub use measure::{BinaryOperator, ComparisonMethod, Measure, Period, Transformer, COUNT_ALIAS};
pub use query::{
    CacheAction, JoinDto, JoinType, OrderDto, OrderKeyword, Parameter, QueryDto, TableDto,
    VirtualTableDto, CACHE_PARAMETER_KEY,
};
pub use store::{Datastore, Store, StoreField};
pub use types::{FieldType, Value, TOTAL_CELL};
