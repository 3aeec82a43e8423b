//! Condition and criteria compiler.
//!
//! A criteria tree compiles to `Some(sql)` or to `None` when it has no
//! leaves; callers omit the clause keyword entirely in the latter case.

use super::dialect::QueryRewriter;
use super::expression::{CompiledMeasure, TypedField};
use crate::error::{QueryError, QueryResult};
use crate::model::{ConditionDto, ConditionType, Value};

/// A criteria tree whose fields and measures are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledCriteria {
    Field {
        field: TypedField,
        condition: ConditionDto,
    },
    FieldPair {
        left: TypedField,
        right: TypedField,
        condition_type: ConditionType,
    },
    Measure {
        measure: Box<CompiledMeasure>,
        condition: ConditionDto,
    },
    Logical {
        condition_type: ConditionType,
        children: Vec<CompiledCriteria>,
    },
}

impl CompiledCriteria {
    pub fn sql_expression<R: QueryRewriter + ?Sized>(&self, rewriter: &R) -> QueryResult<Option<String>> {
        match self {
            CompiledCriteria::Field { field, condition } => {
                let expression = field.sql_expression(rewriter)?;
                let sql = compile_condition(&expression, condition, &|v: &Value| field.sql_literal(v))?;
                Ok(Some(sql))
            }
            CompiledCriteria::FieldPair {
                left,
                right,
                condition_type,
            } => {
                if !is_comparison(*condition_type) {
                    return Err(QueryError::UnsupportedCondition {
                        kind: "field comparison",
                        condition_type: *condition_type,
                    });
                }
                Ok(Some(format!(
                    "{} {} {}",
                    left.sql_expression(rewriter)?,
                    condition_type.sql_infix(),
                    right.sql_expression(rewriter)?
                )))
            }
            CompiledCriteria::Measure { measure, condition } => {
                let expression = measure.sql_expression(rewriter, false)?;
                let sql = compile_condition(&expression, condition, &|v: &Value| Ok(v.to_string()))?;
                Ok(Some(sql))
            }
            CompiledCriteria::Logical {
                condition_type,
                children,
            } => {
                let parts = compile_children(*condition_type, children, rewriter)?;
                if parts.is_empty() {
                    return Ok(None);
                }
                let separator = format!(" {} ", condition_type.sql_infix());
                Ok(Some(format!("({})", parts.join(&separator))))
            }
        }
    }

    /// Render a join condition: top-level `and` children are joined without
    /// enclosing parentheses.
    pub fn join_sql<R: QueryRewriter + ?Sized>(&self, rewriter: &R) -> QueryResult<Option<String>> {
        match self {
            CompiledCriteria::Logical {
                condition_type: ConditionType::And,
                children,
            } => {
                let parts = compile_children(ConditionType::And, children, rewriter)?;
                Ok((!parts.is_empty()).then(|| parts.join(" and ")))
            }
            other => other.sql_expression(rewriter),
        }
    }
}

fn compile_children<R: QueryRewriter + ?Sized>(
    condition_type: ConditionType,
    children: &[CompiledCriteria],
    rewriter: &R,
) -> QueryResult<Vec<String>> {
    if !matches!(condition_type, ConditionType::And | ConditionType::Or) {
        return Err(QueryError::UnsupportedCondition {
            kind: "logical criteria",
            condition_type,
        });
    }
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        if let Some(sql) = child.sql_expression(rewriter)? {
            parts.push(sql);
        }
    }
    Ok(parts)
}

fn is_comparison(condition_type: ConditionType) -> bool {
    matches!(
        condition_type,
        ConditionType::Eq
            | ConditionType::Neq
            | ConditionType::Lt
            | ConditionType::Le
            | ConditionType::Gt
            | ConditionType::Ge
            | ConditionType::Like
    )
}

/// Compile a condition applied to an already rendered expression.
///
/// `quote` renders literal values for the left-hand side's type.
pub fn compile_condition(
    expression: &str,
    condition: &ConditionDto,
    quote: &dyn Fn(&Value) -> QueryResult<String>,
) -> QueryResult<String> {
    condition.validate()?;
    render(expression, condition, quote)
}

fn render(
    expression: &str,
    condition: &ConditionDto,
    quote: &dyn Fn(&Value) -> QueryResult<String>,
) -> QueryResult<String> {
    match condition {
        ConditionDto::SingleValue {
            condition_type,
            value,
        } => Ok(format!(
            "{} {} {}",
            expression,
            condition_type.sql_infix(),
            quote(value)?
        )),
        ConditionDto::In { values, .. } => {
            let literals = values.iter().map(quote).collect::<QueryResult<Vec<_>>>()?;
            Ok(format!("{} in ({})", expression, literals.join(", ")))
        }
        ConditionDto::Logical {
            condition_type,
            one,
            two,
        } => Ok(format!(
            "({} {} {})",
            render(expression, one, quote)?,
            condition_type.sql_infix(),
            render(expression, two, quote)?
        )),
        ConditionDto::Constant { condition_type } => {
            Ok(format!("{} {}", expression, condition_type.sql_infix()))
        }
    }
}
