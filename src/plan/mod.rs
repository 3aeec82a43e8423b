//! Query planning.
//!
//! A request is split into scopes (one physical query each) and a dependency
//! graph of `(scope, measure)` nodes. Database measures are leaves; binary,
//! comparison and vector measures are computed in memory once the nodes they
//! read are available.
//!
//! ```text
//! QueryDto ──► MeasureArena ──► ExecutionPlan { scopes, DependencyGraph }
//!                                    │
//!                                    └─► compile_scope ──► DatabaseQuery
//! ```

mod arena;
mod compile;
mod graph;
mod planner;
mod resolver;
mod scope;

pub use arena::{operand_alias, vector_component_alias, vector_components, MeasureArena};
pub use compile::{compile_criteria, compile_measure, compile_scope};
pub use graph::DependencyGraph;
pub use planner::ExecutionPlan;
pub use resolver::FieldResolver;
pub use scope::{QueryPlanNodeKey, QueryScope, ScopeKey};
