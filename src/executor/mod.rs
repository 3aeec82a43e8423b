//! Query execution.
//!
//! A query is planned into scopes, each scope's database measures are
//! fetched (from the cache when possible, otherwise by running its SQL), and
//! the remaining measures are evaluated in memory layer by layer.
//!
//! ```text
//! QueryDto ─► ExecutionPlan ─► one task per scope ─► per-scope tables
//!                                  │ cache lookups          │
//!                                  ▼                        ▼
//!                              QueryEngine        in-memory layers ─► root table
//! ```

mod binary;
mod bucket;
mod comparison;
mod order;
mod vector;

pub use bucket::expand_buckets;
pub use comparison::{compare, Shift};
pub use order::order_rows;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info};

use crate::cache::{CacheError, EmptyQueryCache, QueryCache};
use crate::config::Settings;
use crate::engine::QueryEngine;
use crate::error::{QueryError, QueryResult};
use crate::model::{CacheAction, FieldType, Measure, QueryDto, Value};
use crate::plan::{ExecutionPlan, QueryPlanNodeKey, QueryScope, ScopeKey};
use crate::sql::DatabaseQuery;
use crate::table::{ColumnarTable, Header};

/// Default bound on scopes executed at the same time.
pub const DEFAULT_MAX_CONCURRENT_SCOPES: usize = 8;

/// Executes queries against an engine, sharing one result cache.
#[derive(Clone)]
pub struct QueryExecutor {
    engine: Arc<dyn QueryEngine>,
    cache: Arc<dyn QueryCache>,
    max_concurrent_scopes: usize,
}

impl QueryExecutor {
    pub fn new(engine: Arc<dyn QueryEngine>, cache: Arc<dyn QueryCache>) -> Self {
        Self {
            engine,
            cache,
            max_concurrent_scopes: DEFAULT_MAX_CONCURRENT_SCOPES,
        }
    }

    /// Executor with the cache and concurrency bound of `settings`.
    pub fn from_settings(engine: Arc<dyn QueryEngine>, settings: &Settings) -> Self {
        Self::new(engine, settings.cache.build())
            .with_max_concurrent_scopes(settings.executor.max_concurrent_scopes)
    }

    pub fn with_max_concurrent_scopes(mut self, max: usize) -> Self {
        self.max_concurrent_scopes = max.max(1);
        self
    }

    pub fn cache(&self) -> &Arc<dyn QueryCache> {
        &self.cache
    }

    pub fn engine(&self) -> &Arc<dyn QueryEngine> {
        &self.engine
    }

    pub fn plan(&self, query: &QueryDto) -> QueryResult<ExecutionPlan> {
        ExecutionPlan::build(query)
    }

    /// SQL of every scope `query` needs, in discovery order. Nothing runs.
    pub fn sql(&self, query: &QueryDto) -> QueryResult<Vec<String>> {
        let plan = self.plan(query)?;
        plan.database_queries(self.engine.datastore())?
            .iter()
            .map(|(_, q)| self.engine.sql(q))
            .collect()
    }

    pub async fn execute(&self, query: &QueryDto) -> QueryResult<ColumnarTable> {
        self.run(query, None).await
    }

    /// Like [`execute`](Self::execute), returning [`QueryError::Cancelled`]
    /// once `cancel` turns `true`. Scope tasks already started finish in the
    /// background and still populate the cache.
    pub async fn execute_with_cancel(
        &self,
        query: &QueryDto,
        cancel: watch::Receiver<bool>,
    ) -> QueryResult<ColumnarTable> {
        self.run(query, Some(cancel)).await
    }

    fn cache_for(&self, query: &QueryDto) -> Arc<dyn QueryCache> {
        match query.cache_action() {
            CacheAction::Use => self.cache.clone(),
            CacheAction::NotUse => Arc::new(EmptyQueryCache),
            CacheAction::Invalidate => {
                debug!("invalidating query cache");
                self.cache.clear();
                self.cache.clone()
            }
        }
    }

    async fn run(&self, query: &QueryDto, cancel: Option<watch::Receiver<bool>>) -> QueryResult<ColumnarTable> {
        let cache = self.cache_for(query);
        let plan = self.plan(query)?;

        // Every statement is generated before any of them runs.
        let mut jobs = Vec::new();
        for (key, database_query) in plan.database_queries(self.engine.datastore())? {
            self.engine.sql(&database_query)?;
            let measures = plan.database_measures(&key)?;
            let scope = plan.scope(&key)?.clone();
            jobs.push((key, scope, database_query, measures));
        }
        info!(scopes = jobs.len(), "executing query");

        let permits = Arc::new(Semaphore::new(self.max_concurrent_scopes));
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|(key, scope, database_query, measures)| {
                let engine = self.engine.clone();
                let cache = cache.clone();
                let permits = permits.clone();
                tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|e| QueryError::Cancelled(e.to_string()))?;
                    let table = execute_scope(engine, cache, &key, &scope, database_query, measures).await?;
                    Ok::<_, QueryError>((key, table))
                })
            })
            .collect();

        let joined = join_all(handles);
        let outcomes = match cancel {
            Some(mut cancel) => tokio::select! {
                outcomes = joined => outcomes,
                _ = cancelled(&mut cancel) => {
                    return Err(QueryError::Cancelled("query was cancelled".to_string()));
                }
            },
            None => joined.await,
        };

        let mut results = HashMap::new();
        for outcome in outcomes {
            let (key, table) = outcome.map_err(|e| QueryError::Cancelled(e.to_string()))??;
            results.insert(key, table);
        }

        evaluate_in_memory(&plan, &mut results)?;

        let root_scope = plan.root_scope()?;
        let mut root = results.remove(plan.root()).ok_or_else(|| {
            QueryError::IncorrectPath(format!("no result for root scope {}", plan.root()))
        })?;
        let mut names = root_scope.grouping_names();
        names.extend(plan.requested().iter().cloned());
        root = root.project(&names)?;
        order_rows(&root, &query.orders)
    }
}

/// Resolves once `cancel` holds `true`. Never resolves if the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Database measures of one scope: cached columns are merged in, missing
/// ones are computed by the engine and cached.
async fn execute_scope(
    engine: Arc<dyn QueryEngine>,
    cache: Arc<dyn QueryCache>,
    key: &ScopeKey,
    scope: &QueryScope,
    database_query: DatabaseQuery,
    measures: Vec<Measure>,
) -> QueryResult<ColumnarTable> {
    let lock = cache.scope_lock(key);
    let guard = lock.lock().await;

    let (cached, missing): (Vec<Measure>, Vec<Measure>) =
        measures.iter().cloned().partition(|m| cache.contains(m, key));
    debug!(scope = %key, hits = cached.len(), misses = missing.len(), "cache lookup");

    let outcome = match merge_cached(engine.as_ref(), cache.as_ref(), key, &database_query, &cached, &missing).await {
        Ok(Some(table)) => Ok(table),
        Ok(None) => {
            debug!(scope = %key, "cached entries were evicted, recomputing scope");
            match fetch(engine.as_ref(), &database_query, &measures).await {
                Ok(table) => cache
                    .contribute_to_cache(&table, &measures, key)
                    .map(|_| table)
                    .map_err(QueryError::from),
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    };

    drop(guard);
    drop(lock);
    cache.release_scope_lock(key);
    expand_buckets(outcome?, scope)
}

/// Result holding `cached` and `missing`, with the cached columns merged
/// before the new ones are stored. `None` when a cached entry disappeared
/// after the lookup.
async fn merge_cached(
    engine: &dyn QueryEngine,
    cache: &dyn QueryCache,
    key: &ScopeKey,
    database_query: &DatabaseQuery,
    cached: &[Measure],
    missing: &[Measure],
) -> QueryResult<Option<ColumnarTable>> {
    let mut table = if missing.is_empty() {
        match cache.create_raw_result(key) {
            Ok(table) => table,
            Err(CacheError::NotCached { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        }
    } else {
        fetch(engine, database_query, missing).await?
    };
    match cache.contribute_to_result(&mut table, cached, key) {
        Ok(()) => {}
        Err(CacheError::NotCached { .. }) => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    if !missing.is_empty() {
        cache.contribute_to_cache(&table, missing, key)?;
    }
    Ok(Some(table))
}

/// Runs the scope statement restricted to `measures`.
async fn fetch(
    engine: &dyn QueryEngine,
    database_query: &DatabaseQuery,
    measures: &[Measure],
) -> QueryResult<ColumnarTable> {
    let mut database_query = database_query.clone();
    database_query
        .measures
        .retain(|m| measures.iter().any(|measure| measure.alias() == m.alias()));
    engine.execute(&database_query).await
}

/// Compute every in-memory measure into the table of its scope.
fn evaluate_in_memory(plan: &ExecutionPlan, results: &mut HashMap<ScopeKey, ColumnarTable>) -> QueryResult<()> {
    for layer in plan.in_memory_layers()? {
        debug!(nodes = layer.len(), "evaluating layer");
        for node in layer {
            let values = evaluate_node(plan, results, &node)?;
            let field_type = infer_type(&values);
            let table = results.get_mut(&node.scope).ok_or_else(|| missing_scope(&node.scope))?;
            table.add_column(Header::measure(node.measure.clone(), field_type), values)?;
        }
    }
    Ok(())
}

fn evaluate_node(
    plan: &ExecutionPlan,
    results: &HashMap<ScopeKey, ColumnarTable>,
    node: &QueryPlanNodeKey,
) -> QueryResult<Vec<Value>> {
    let table = |key: &ScopeKey| results.get(key).ok_or_else(|| missing_scope(key));
    let measure = plan.arena().get(&node.measure)?;
    let current = table(&node.scope)?;
    let dependencies = plan.graph().dependencies(node);

    match measure {
        Measure::BinaryOperation { operator, .. } => {
            let operands = plan.arena().operands(measure);
            Ok(binary::evaluate(
                *operator,
                current.column(&operands[0])?,
                current.column(&operands[1])?,
            ))
        }
        Measure::Comparison { .. } => {
            let reference = dependencies
                .iter()
                .find(|d| d.scope != node.scope)
                .map(|d| &d.scope)
                .unwrap_or(&node.scope);
            comparison::evaluate(measure, plan.scope(&node.scope)?, current, table(reference)?)
        }
        Measure::VectorTupleAgg { .. } => {
            let vectors = dependencies
                .first()
                .map(|d| &d.scope)
                .ok_or_else(|| QueryError::IncorrectPath(format!("vector '{}' has no components", node.measure)))?;
            vector::evaluate(measure, current, table(vectors)?)
        }
        _ => Err(QueryError::IncorrectPath(format!(
            "'{}' is computed by the database",
            node.measure
        ))),
    }
}

fn missing_scope(key: &ScopeKey) -> QueryError {
    QueryError::IncorrectPath(format!("scope {} has not been executed", key))
}

/// Type of a computed column, from its first non-null value.
fn infer_type(values: &[Value]) -> FieldType {
    values
        .iter()
        .find(|v| !v.is_null())
        .map(FieldType::of)
        .unwrap_or(FieldType::Double)
}
