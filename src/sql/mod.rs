//! SQL compilation.
//!
//! - [`dialect`] - per-backend rewriters (quoting, rollup capabilities)
//! - [`expression`] - resolved fields and database measures
//! - [`condition`] - criteria compiler
//! - [`query`] - the compiled query descriptor
//! - [`statement`] - descriptor to SQL text, including the rollup fallback

pub mod condition;
pub mod dialect;
pub mod expression;
pub mod query;
pub mod statement;

#[cfg(test)]
pub mod test_utils;

pub use condition::{compile_condition, CompiledCriteria};
pub use dialect::{Dialect, QueryRewriter};
pub use expression::{quote_literal, CompiledMeasure, TypedField};
pub use query::{CompiledJoin, CompiledTable, DatabaseQuery};
pub use statement::translate;
