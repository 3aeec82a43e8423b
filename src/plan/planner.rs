//! Execution plan: the scopes a query needs and the graph of measures
//! computed in each.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::model::{ColumnSetKey, Datastore, Field, Measure, QueryDto};
use crate::sql::DatabaseQuery;

use super::arena::{operand_alias, MeasureArena};
use super::compile::compile_scope;
use super::graph::DependencyGraph;
use super::scope::{QueryPlanNodeKey, QueryScope, ScopeKey};

#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    root: ScopeKey,
    /// Scopes in discovery order, root first.
    scope_order: Vec<ScopeKey>,
    scopes: HashMap<ScopeKey, QueryScope>,
    graph: DependencyGraph<QueryPlanNodeKey>,
    arena: MeasureArena,
    requested: Vec<String>,
}

impl ExecutionPlan {
    /// Discover every (scope, measure) node `query` needs. Fails on cycles
    /// before anything executes.
    pub fn build(query: &QueryDto) -> QueryResult<Self> {
        if query.table.is_some() == query.sub_query.is_some() {
            return Err(QueryError::invalid(
                "a query needs exactly one of a table or a sub-query",
            ));
        }
        let arena = MeasureArena::build(&query.measures)?;

        let root_scope = QueryScope::of(query);
        let root = root_scope.key()?;
        let mut plan = Self {
            root: root.clone(),
            scope_order: vec![root.clone()],
            scopes: HashMap::from([(root.clone(), root_scope)]),
            graph: DependencyGraph::new(),
            arena,
            requested: Vec::new(),
        };

        let mut queue = VecDeque::new();
        for measure in &query.measures {
            let alias = operand_alias(measure).to_string();
            plan.arena.get(&alias)?;
            if !plan.requested.contains(&alias) {
                plan.requested.push(alias.clone());
                let node = QueryPlanNodeKey::new(root.clone(), alias);
                plan.graph.add_node(node.clone());
                queue.push_back(node);
            }
        }

        let mut visited = HashSet::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node.clone()) {
                continue;
            }
            let scope = plan.scope(&node.scope)?.clone();
            let measure = plan.arena.get(&node.measure)?.clone();
            for (dep_scope, alias) in plan.dependencies(&scope, &measure)? {
                let key = dep_scope.key()?;
                if !plan.scopes.contains_key(&key) {
                    plan.scope_order.push(key.clone());
                    plan.scopes.insert(key.clone(), dep_scope);
                }
                let dep = QueryPlanNodeKey::new(key, alias);
                plan.graph.add_dependency(node.clone(), dep.clone());
                queue.push_back(dep);
            }
        }

        plan.graph.validate_no_cycles()?;
        debug!(
            scopes = plan.scopes.len(),
            nodes = plan.graph.len(),
            "built execution plan"
        );
        Ok(plan)
    }

    /// Scopes and measures `measure` reads when computed in `scope`.
    fn dependencies(&self, scope: &QueryScope, measure: &Measure) -> QueryResult<Vec<(QueryScope, String)>> {
        let operands = self.arena.operands(measure);
        match measure {
            Measure::Aggregated { .. }
            | Measure::Expression { .. }
            | Measure::Count { .. }
            | Measure::Ref { .. } => Ok(vec![]),
            Measure::BinaryOperation { .. } => Ok(operands
                .into_iter()
                .map(|alias| (scope.clone(), alias))
                .collect()),
            Measure::Comparison { .. } => {
                let prefetch = comparison_scope(scope, measure)?;
                let mut deps: Vec<(QueryScope, String)> = operands
                    .iter()
                    .map(|alias| (scope.clone(), alias.clone()))
                    .collect();
                if prefetch != *scope {
                    deps.extend(operands.into_iter().map(|alias| (prefetch.clone(), alias)));
                }
                Ok(deps)
            }
            Measure::VectorTupleAgg { vector_axis, .. } => {
                let vector_scope = vector_scope(scope, vector_axis);
                Ok(operands
                    .into_iter()
                    .map(|alias| (vector_scope.clone(), alias))
                    .collect())
            }
        }
    }

    pub fn root(&self) -> &ScopeKey {
        &self.root
    }

    pub fn root_scope(&self) -> QueryResult<&QueryScope> {
        self.scope(&self.root)
    }

    pub fn scope(&self, key: &ScopeKey) -> QueryResult<&QueryScope> {
        self.scopes
            .get(key)
            .ok_or_else(|| QueryError::IncorrectPath(format!("scope {} is not part of the plan", key)))
    }

    pub fn scope_keys(&self) -> &[ScopeKey] {
        &self.scope_order
    }

    pub fn arena(&self) -> &MeasureArena {
        &self.arena
    }

    pub fn graph(&self) -> &DependencyGraph<QueryPlanNodeKey> {
        &self.graph
    }

    /// Aliases of the requested measures, in query order.
    pub fn requested(&self) -> &[String] {
        &self.requested
    }

    /// Measures the database computes for `scope`. A scope read only for its
    /// rows computes the count measure.
    pub fn database_measures(&self, scope: &ScopeKey) -> QueryResult<Vec<Measure>> {
        let mut measures = Vec::new();
        for node in self.graph.nodes().filter(|n| &n.scope == scope) {
            let measure = self.arena.get(&node.measure)?;
            if measure.is_primitive() {
                measures.push(measure.clone());
            }
        }
        if measures.is_empty() {
            measures.push(Measure::count());
        }
        Ok(measures)
    }

    /// Nodes evaluated in memory, layer by layer, dependencies first.
    pub fn in_memory_layers(&self) -> QueryResult<Vec<Vec<QueryPlanNodeKey>>> {
        let mut layers = Vec::new();
        for layer in self.graph.execution_layers()? {
            let mut nodes = Vec::new();
            for node in layer {
                if !self.arena.get(&node.measure)?.is_primitive() {
                    nodes.push(node);
                }
            }
            if !nodes.is_empty() {
                layers.push(nodes);
            }
        }
        Ok(layers)
    }

    /// One database query per scope, in discovery order.
    pub fn database_queries(&self, datastore: &Datastore) -> QueryResult<Vec<(ScopeKey, DatabaseQuery)>> {
        self.scope_order
            .iter()
            .map(|key| {
                let measures = self.database_measures(key)?;
                let query = compile_scope(self.scope(key)?, &measures, datastore)?;
                Ok((key.clone(), query))
            })
            .collect()
    }

    fn scope_id(&self, key: &ScopeKey) -> usize {
        self.scope_order.iter().position(|k| k == key).unwrap_or(usize::MAX)
    }

    /// Textual plan: the measure tree from the requested measures, then the
    /// scopes.
    pub fn print(&self) -> String {
        let mut out = self.graph.print(|id, node| {
            let expression = self
                .arena
                .get(&node.measure)
                .map(Measure::expression)
                .unwrap_or_default();
            format!(
                "#{}, n=scope=#{}, measure=[{}]; [{}]",
                id + 1,
                self.scope_id(&node.scope),
                node.measure,
                expression
            )
        });
        out.push_str("Scopes:\n");
        for (id, key) in self.scope_order.iter().enumerate() {
            if let Some(scope) = self.scopes.get(key) {
                out.push_str(&format!("#{}: {}\n", id, scope));
            }
        }
        out
    }
}

/// Scope holding the reference rows of a comparison measure.
fn comparison_scope(scope: &QueryScope, measure: &Measure) -> QueryResult<QueryScope> {
    let Measure::Comparison {
        alias,
        period,
        column_set_key,
        ancestors,
        ..
    } = measure
    else {
        return Err(QueryError::IncorrectPath(format!(
            "'{}' is not a comparison measure",
            measure.alias()
        )));
    };

    if let Some(period) = period {
        let fields = period.fields();
        if let Some(missing) = fields.iter().find(|f| !scope.has_column(f)) {
            return Err(QueryError::invalid(format!(
                "{} is used by the period of '{}' but is not selected",
                missing.name(),
                alias
            )));
        }
        // Reference periods are filtered out by criteria on period fields.
        let mut prefetch = scope.prefetch();
        prefetch.where_criteria = scope
            .where_criteria
            .as_ref()
            .and_then(|c| c.without_fields(&fields));
        return Ok(prefetch);
    }

    if let Some(ancestors) = ancestors {
        if !scope.grouping_sets.is_empty() {
            return Err(QueryError::invalid(format!(
                "parent comparison '{}' cannot be used with grouping sets",
                alias
            )));
        }
        let mut prefetch = scope.prefetch();
        let ancestor_names: Vec<String> = ancestors.iter().map(Field::name).collect();
        let mut rollup: Vec<Field> = scope
            .rollup_columns
            .iter()
            .filter(|f| !ancestor_names.contains(&f.name()))
            .cloned()
            .collect();
        rollup.extend(
            ancestors
                .iter()
                .rev()
                .filter_map(|a| scope.columns.iter().find(|c| c.name() == a.name()))
                .cloned(),
        );
        prefetch.rollup_columns = rollup;
        return Ok(prefetch);
    }

    if let Some(ColumnSetKey::Bucket) = column_set_key {
        if !scope.column_sets.contains_key(&ColumnSetKey::Bucket) {
            return Err(QueryError::invalid(format!(
                "'{}' compares buckets but the query has no bucket column set",
                alias
            )));
        }
        return Ok(scope.clone());
    }

    Err(QueryError::invalid(format!(
        "comparison '{}' needs a period, a column set or ancestors",
        alias
    )))
}

/// Scope of a vector measure: the same rows split along the vector axis.
fn vector_scope(scope: &QueryScope, vector_axis: &Field) -> QueryScope {
    let mut vector = scope.prefetch();
    if !vector.has_column(vector_axis) {
        vector.columns.push(vector_axis.clone());
    }
    vector
}
