//! Lowering of a scope and its database measures to a [`DatabaseQuery`].

use crate::error::{QueryError, QueryResult};
use crate::model::{CriteriaDto, Datastore, Measure, TableDto};
use crate::sql::{CompiledCriteria, CompiledJoin, CompiledMeasure, CompiledTable, DatabaseQuery};

use super::resolver::FieldResolver;
use super::scope::QueryScope;

/// Compile `scope` computing `measures`. Every measure must be computed by the
/// database.
pub fn compile_scope(
    scope: &QueryScope,
    measures: &[Measure],
    datastore: &Datastore,
) -> QueryResult<DatabaseQuery> {
    if let Some(table) = &scope.table {
        check_tables(table, scope, datastore)?;
    }
    let resolver = FieldResolver::new(datastore, scope)?;

    let (table, sub_query) = match (&scope.table, &scope.sub_query) {
        (Some(table), None) => (Some(compile_table(table, &resolver)?), None),
        (None, Some(sub_query)) => {
            if !sub_query.column_sets.is_empty() {
                return Err(QueryError::invalid("column sets are not supported in sub-queries"));
            }
            let sub_scope = QueryScope::of(sub_query);
            let compiled = compile_scope(&sub_scope, &sub_query.measures, datastore)?;
            (None, Some(Box::new(compiled)))
        }
        (Some(_), Some(_)) => {
            return Err(QueryError::invalid("query has both a table and a sub-query"))
        }
        (None, None) => return Err(QueryError::invalid("query has neither table nor sub-query")),
    };

    let resolve_all = |fields: &[crate::model::Field]| {
        fields
            .iter()
            .map(|f| resolver.resolve(f))
            .collect::<QueryResult<Vec<_>>>()
    };

    Ok(DatabaseQuery {
        table,
        sub_query,
        virtual_tables: scope.virtual_tables.clone(),
        select: resolve_all(&scope.columns)?,
        rollup: resolve_all(&scope.rollup_columns)?,
        grouping_sets: scope
            .grouping_sets
            .iter()
            .map(|set| resolve_all(set))
            .collect::<QueryResult<Vec<_>>>()?,
        measures: measures
            .iter()
            .map(|m| compile_measure(m, &resolver))
            .collect::<QueryResult<Vec<_>>>()?,
        where_criteria: compile_optional(scope.where_criteria.as_ref(), &resolver)?,
        having_criteria: compile_optional(scope.having_criteria.as_ref(), &resolver)?,
        limit: scope.limit,
    })
}

fn compile_table(table: &TableDto, resolver: &FieldResolver<'_>) -> QueryResult<CompiledTable> {
    let mut compiled = CompiledTable::new(table.name.clone());
    compiled.is_cte = resolver.is_virtual(&table.name);
    for join in &table.joins {
        compiled.joins.push(CompiledJoin {
            table: compile_table(&join.table, resolver)?,
            join_type: join.join_type,
            criteria: compile_optional(join.join_criteria.as_ref(), resolver)?,
        });
    }
    Ok(compiled)
}

/// Compile a measure computed by the database.
pub fn compile_measure(measure: &Measure, resolver: &FieldResolver<'_>) -> QueryResult<CompiledMeasure> {
    match measure {
        Measure::Aggregated {
            alias,
            field,
            aggregation_function,
            criteria,
        } => Ok(CompiledMeasure::Aggregated {
            alias: alias.clone(),
            field: resolver.resolve(field)?,
            aggregation_function: aggregation_function.clone(),
            criteria: compile_optional(criteria.as_ref(), resolver)?,
        }),
        Measure::Expression { alias, expression } => Ok(CompiledMeasure::Expression {
            alias: alias.clone(),
            expression: expression.clone(),
        }),
        Measure::Count { alias } => Ok(CompiledMeasure::Count {
            alias: alias.clone(),
        }),
        other => Err(QueryError::IncorrectPath(format!(
            "measure '{}' is computed in memory, not by the database",
            other.alias()
        ))),
    }
}

fn compile_optional(
    criteria: Option<&CriteriaDto>,
    resolver: &FieldResolver<'_>,
) -> QueryResult<Option<CompiledCriteria>> {
    criteria.map(|c| compile_criteria(c, resolver)).transpose()
}

pub fn compile_criteria(criteria: &CriteriaDto, resolver: &FieldResolver<'_>) -> QueryResult<CompiledCriteria> {
    match criteria {
        CriteriaDto::Field { field, condition } => Ok(CompiledCriteria::Field {
            field: resolver.resolve(field)?,
            condition: condition.clone(),
        }),
        CriteriaDto::FieldPair {
            left,
            right,
            condition_type,
        } => Ok(CompiledCriteria::FieldPair {
            left: resolver.resolve(left)?,
            right: resolver.resolve(right)?,
            condition_type: *condition_type,
        }),
        CriteriaDto::Measure { measure, condition } => {
            if !measure.is_primitive() {
                return Err(QueryError::invalid(format!(
                    "having criteria on '{}' which is not computed by the database",
                    measure.alias()
                )));
            }
            Ok(CompiledCriteria::Measure {
                measure: Box::new(compile_measure(measure, resolver)?),
                condition: condition.clone(),
            })
        }
        CriteriaDto::Logical {
            condition_type,
            children,
        } => Ok(CompiledCriteria::Logical {
            condition_type: *condition_type,
            children: children
                .iter()
                .map(|c| compile_criteria(c, resolver))
                .collect::<QueryResult<Vec<_>>>()?,
        }),
    }
}

/// Every physical table of `table` and its joins must exist in `datastore`.
/// Virtual tables of the scope are skipped.
fn check_tables(table: &TableDto, scope: &QueryScope, datastore: &Datastore) -> QueryResult<()> {
    let is_virtual = scope.virtual_tables.iter().any(|v| v.name == table.name);
    if !is_virtual && datastore.store(&table.name).is_none() {
        return Err(QueryError::UnknownTable {
            table: table.name.clone(),
            known: datastore.store_names(),
        });
    }
    for join in &table.joins {
        check_tables(&join.table, scope, datastore)?;
    }
    Ok(())
}
