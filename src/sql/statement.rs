//! Statement generator: compiles a [`DatabaseQuery`] into SQL text.
//!
//! Assembly order:
//!
//! ```text
//! [with <cte> as (...), ...] select <columns>, [grouping(...),] <measures>
//! from <table | (sub-query)> [where ...] [group by ...] [having ...] [limit n]
//! ```

use super::dialect::QueryRewriter;
use super::expression::{literal, TypedField};
use super::query::{CompiledTable, DatabaseQuery};
use crate::error::{QueryError, QueryResult};
use crate::model::{JoinType, VirtualTableDto};

/// Compile `query` into one statement for the given rewriter.
///
/// Fails before producing any text if the query is structurally invalid.
pub fn translate(query: &DatabaseQuery, rewriter: &dyn QueryRewriter) -> QueryResult<String> {
    validate(query)?;

    let mut group_by = Vec::with_capacity(query.select.len());
    let mut selects = Vec::with_capacity(query.select.len() + query.measures.len());
    for field in &query.select {
        let expression = rewriter.select(field)?;
        selects.push(match field.alias() {
            Some(alias) => format!("{} as {}", expression, rewriter.field_name(alias)),
            None => expression.clone(),
        });
        group_by.push(expression);
    }
    if rewriter.uses_grouping_function() {
        for field in query.grouping_select() {
            selects.push(format!("grouping({})", rewriter.select(field)?));
        }
    }
    for measure in &query.measures {
        selects.push(measure.sql_expression(rewriter, true)?);
    }

    let mut statement = String::new();
    append_ctes(&query.virtual_tables, rewriter, &mut statement);
    statement.push_str("select ");
    statement.push_str(&selects.join(", "));
    statement.push_str(" from ");
    match (&query.sub_query, &query.table) {
        (Some(sub_query), _) => {
            statement.push('(');
            statement.push_str(&translate(sub_query, rewriter)?);
            statement.push(')');
        }
        (None, Some(table)) => statement.push_str(&table_expression(table, rewriter)?),
        (None, None) => return Err(QueryError::invalid("query has neither table nor sub-query")),
    }

    if let Some(criteria) = &query.where_criteria {
        if let Some(clause) = criteria.sql_expression(rewriter)? {
            statement.push_str(" where ");
            statement.push_str(&clause);
        }
    }

    if !query.grouping_sets.is_empty() {
        append_grouping_sets(&query.grouping_sets, rewriter, &mut statement)?;
    } else {
        append_group_by_and_rollup(query, &group_by, rewriter, &mut statement)?;
    }

    if let Some(criteria) = &query.having_criteria {
        if let Some(clause) = criteria.sql_expression(rewriter)? {
            statement.push_str(" having ");
            statement.push_str(&clause);
        }
    }

    if let Some(limit) = query.limit.filter(|l| *l > 0) {
        statement.push_str(&format!(" limit {}", limit));
    }

    Ok(statement)
}

/// Check the structural invariants of a query.
pub fn validate(query: &DatabaseQuery) -> QueryResult<()> {
    let missing: Vec<&TypedField> = query
        .rollup
        .iter()
        .filter(|r| !query.select.contains(*r))
        .collect();
    if !missing.is_empty() {
        return Err(QueryError::InvalidRollup {
            rollup: missing.iter().map(|f| f.name()).collect(),
            select: query.select.iter().map(TypedField::name).collect(),
        });
    }
    if !query.rollup.is_empty() && !query.grouping_sets.is_empty() {
        return Err(QueryError::invalid(
            "rollup and grouping sets cannot be used together",
        ));
    }
    if query.table.is_some() && query.sub_query.is_some() {
        return Err(QueryError::invalid("query has both a table and a sub-query"));
    }
    Ok(())
}

fn append_ctes(tables: &[VirtualTableDto], rewriter: &dyn QueryRewriter, statement: &mut String) {
    if tables.is_empty() {
        return;
    }
    let ctes: Vec<String> = tables
        .iter()
        .map(|table| {
            let rows: Vec<String> = table
                .records
                .iter()
                .map(|row| {
                    let columns: Vec<String> = row
                        .iter()
                        .zip(&table.fields)
                        .map(|(value, field)| {
                            format!("{} as {}", literal(value), rewriter.field_name(field))
                        })
                        .collect();
                    format!("select {}", columns.join(", "))
                })
                .collect();
            format!("{} as ({})", rewriter.cte_name(&table.name), rows.join(" union all "))
        })
        .collect();
    statement.push_str("with ");
    statement.push_str(&ctes.join(", "));
    statement.push(' ');
}

fn table_expression(table: &CompiledTable, rewriter: &dyn QueryRewriter) -> QueryResult<String> {
    let mut sql = if table.is_cte {
        rewriter.cte_name(&table.name)
    } else {
        rewriter.table_name(&table.name)
    };
    for join in &table.joins {
        sql.push(' ');
        sql.push_str(join.join_type.sql());
        sql.push(' ');
        sql.push_str(&table_expression(&join.table, rewriter)?);
        if join.join_type == JoinType::Cross {
            continue;
        }
        if let Some(criteria) = &join.criteria {
            if let Some(condition) = criteria.join_sql(rewriter)? {
                sql.push_str(" on ");
                sql.push_str(&condition);
            }
        }
    }
    Ok(sql)
}

fn append_grouping_sets(
    sets: &[Vec<TypedField>],
    rewriter: &dyn QueryRewriter,
    statement: &mut String,
) -> QueryResult<()> {
    let mut rendered = Vec::with_capacity(sets.len());
    for set in sets {
        let columns = set
            .iter()
            .map(|f| rewriter.rollup(f))
            .collect::<QueryResult<Vec<_>>>()?;
        rendered.push(format!("({})", columns.join(",")));
    }
    statement.push_str(" group by grouping sets(");
    statement.push_str(&rendered.join(", "));
    statement.push(')');
    Ok(())
}

fn append_group_by_and_rollup(
    query: &DatabaseQuery,
    group_by: &[String],
    rewriter: &dyn QueryRewriter,
    statement: &mut String,
) -> QueryResult<()> {
    if query.select.is_empty() {
        return Ok(());
    }
    let has_rollup = !query.rollup.is_empty();
    let is_partial = query.select.iter().any(|f| !query.rollup.contains(f));

    statement.push_str(" group by ");

    if has_rollup && is_partial && !rewriter.uses_partial_rollup_syntax() {
        // group by a, rollup(b, c) == grouping sets ((a,b,c),(a,b),(a))
        let mut sets = vec![format!("({})", group_by.join(","))];
        let mut removed: Vec<&TypedField> = Vec::new();
        for rolled in query.rollup.iter().rev() {
            removed.push(rolled);
            let kept: Vec<&str> = query
                .select
                .iter()
                .zip(group_by)
                .filter(|(f, _)| !removed.contains(f))
                .map(|(_, sql)| sql.as_str())
                .collect();
            sets.push(format!("({})", kept.join(",")));
        }
        statement.push_str("grouping sets (");
        statement.push_str(&sets.join(","));
        statement.push(')');
        return Ok(());
    }

    let plain: Vec<&str> = query
        .select
        .iter()
        .zip(group_by)
        .filter(|(f, _)| !query.rollup.contains(*f))
        .map(|(_, sql)| sql.as_str())
        .collect();
    statement.push_str(&plain.join(", "));
    if has_rollup {
        // Rollup columns keep the rollup's declared order.
        let rolled = query
            .rollup
            .iter()
            .map(|f| rewriter.rollup(f))
            .collect::<QueryResult<Vec<_>>>()?;
        if !plain.is_empty() {
            statement.push_str(", ");
        }
        statement.push_str(&format!("rollup({})", rolled.join(", ")));
    }
    Ok(())
}
