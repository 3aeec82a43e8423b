//! Resolved fields and database measures, and their SQL rendering.

use std::fmt;

use super::condition::CompiledCriteria;
use super::dialect::QueryRewriter;
use crate::error::{QueryError, QueryResult};
use crate::model::{FieldType, Value};

/// A field resolved against the datastore, carrying its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypedField {
    /// A physical column. `store` is the qualifier the query used, if any.
    Table {
        store: Option<String>,
        name: String,
        field_type: FieldType,
        alias: Option<String>,
    },
    Constant {
        value: Value,
    },
    Function {
        expression: String,
    },
    /// An output column of a sub-query, by alias.
    Aliased {
        alias: String,
        field_type: FieldType,
    },
}

impl TypedField {
    pub fn table(store: Option<&str>, name: &str, field_type: FieldType) -> Self {
        TypedField::Table {
            store: store.map(str::to_string),
            name: name.to_string(),
            field_type,
            alias: None,
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            TypedField::Table { field_type, .. } | TypedField::Aliased { field_type, .. } => *field_type,
            TypedField::Constant { value } => FieldType::of(value),
            TypedField::Function { .. } => FieldType::Unknown,
        }
    }

    /// Column name in results: alias, else the (qualified) column name.
    pub fn name(&self) -> String {
        match self {
            TypedField::Table {
                alias: Some(alias), ..
            } => alias.clone(),
            TypedField::Table {
                store: Some(store),
                name,
                ..
            } => format!("{}.{}", store, name),
            TypedField::Table { name, .. } => name.clone(),
            TypedField::Constant { value } => value.to_string(),
            TypedField::Function { expression } => expression.clone(),
            TypedField::Aliased { alias, .. } => alias.clone(),
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            TypedField::Table { alias, .. } => alias.as_deref(),
            _ => None,
        }
    }

    /// SQL expression reading this field.
    pub fn sql_expression<R: QueryRewriter + ?Sized>(&self, rewriter: &R) -> QueryResult<String> {
        match self {
            TypedField::Table {
                store: Some(store),
                name,
                ..
            } => Ok(format!(
                "{}.{}",
                rewriter.table_name(store),
                rewriter.field_name(name)
            )),
            TypedField::Table { name, .. } => Ok(rewriter.field_name(name)),
            TypedField::Constant { value } => Ok(literal(value)),
            TypedField::Function { expression } => Err(QueryError::IncorrectPath(format!(
                "function field {} cannot be rendered as SQL",
                expression
            ))),
            TypedField::Aliased { alias, .. } => Ok(rewriter.field_name(alias)),
        }
    }

    /// Literal rendering for values compared against this field.
    ///
    /// Quoting follows the field's declared type, never the value's.
    pub fn sql_literal(&self, value: &Value) -> QueryResult<String> {
        match self {
            TypedField::Table { field_type, .. } | TypedField::Aliased { field_type, .. } => {
                quote_literal(*field_type, value)
            }
            _ => Ok(value.to_string()),
        }
    }
}

impl fmt::Display for TypedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Render `value` as a literal of a column declared as `field_type`.
///
/// Embedded quotes are not escaped.
pub fn quote_literal(field_type: FieldType, value: &Value) -> QueryResult<String> {
    match field_type {
        FieldType::Int
        | FieldType::Long
        | FieldType::Float
        | FieldType::Double
        | FieldType::Boolean
        | FieldType::Unknown => Ok(value.to_string()),
        FieldType::String => Ok(format!("'{}'", value)),
        other => Err(QueryError::UnsupportedLiteralType(other.to_string())),
    }
}

/// Render a literal by its runtime type, as in virtual-table rows.
pub fn literal(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("'{}'", s),
        other => other.to_string(),
    }
}

// =============================================================================
// Database Measures
// =============================================================================

/// A measure the database computes.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledMeasure {
    Aggregated {
        alias: String,
        field: TypedField,
        aggregation_function: String,
        criteria: Option<CompiledCriteria>,
    },
    Expression {
        alias: String,
        expression: String,
    },
    Count {
        alias: String,
    },
}

impl CompiledMeasure {
    pub fn alias(&self) -> &str {
        match self {
            CompiledMeasure::Aggregated { alias, .. }
            | CompiledMeasure::Expression { alias, .. }
            | CompiledMeasure::Count { alias } => alias,
        }
    }

    /// SQL aggregate expression, optionally followed by ` as <alias>`.
    pub fn sql_expression<R: QueryRewriter + ?Sized>(&self, rewriter: &R, with_alias: bool) -> QueryResult<String> {
        let expression = match self {
            CompiledMeasure::Aggregated {
                field,
                aggregation_function,
                criteria,
                ..
            } => {
                let column = match field {
                    TypedField::Constant { .. } => field.sql_expression(rewriter)?,
                    _ => rewriter.select(field)?,
                };
                let filter = match criteria {
                    Some(c) => c.sql_expression(rewriter)?,
                    None => None,
                };
                match filter {
                    Some(condition) => format!(
                        "{}(case when {} then {} end)",
                        aggregation_function, condition, column
                    ),
                    None => format!("{}({})", aggregation_function, column),
                }
            }
            CompiledMeasure::Expression { expression, .. } => expression.clone(),
            CompiledMeasure::Count { .. } => "count(*)".to_string(),
        };
        if with_alias {
            Ok(format!("{} as {}", expression, rewriter.measure_alias(self.alias())))
        } else {
            Ok(expression)
        }
    }
}
