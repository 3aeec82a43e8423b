//! Field resolution against the datastore, virtual tables and sub-queries.

use std::collections::HashMap;

use crate::error::{QueryError, QueryResult};
use crate::model::{Datastore, Field, FieldType, Measure};
use crate::sql::TypedField;

use super::scope::QueryScope;

/// Resolves the fields of one scope to typed fields.
#[derive(Debug)]
pub struct FieldResolver<'a> {
    datastore: &'a Datastore,
    /// Tables of the scope, main table first, then joins depth first.
    tables: Vec<String>,
    virtual_tables: HashMap<String, Vec<(String, FieldType)>>,
    sub_query_fields: Option<Vec<(String, FieldType)>>,
}

impl<'a> FieldResolver<'a> {
    pub fn new(datastore: &'a Datastore, scope: &QueryScope) -> QueryResult<Self> {
        let virtual_tables = scope
            .virtual_tables
            .iter()
            .map(|vt| {
                let fields = vt
                    .fields
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let field_type = vt
                            .records
                            .iter()
                            .filter_map(|row| row.get(i))
                            .find(|v| !v.is_null())
                            .map(FieldType::of)
                            .unwrap_or_default();
                        (name.clone(), field_type)
                    })
                    .collect();
                (vt.name.clone(), fields)
            })
            .collect();

        let sub_query_fields = match &scope.sub_query {
            Some(sub_query) => {
                let sub_scope = QueryScope::of(sub_query);
                let resolver = FieldResolver::new(datastore, &sub_scope)?;
                let mut fields = Vec::new();
                for column in &sub_query.columns {
                    fields.push((column.name(), resolver.resolve(column)?.field_type()));
                }
                for measure in &sub_query.measures {
                    let field_type = match measure {
                        Measure::Count { .. } => FieldType::Long,
                        _ => FieldType::Unknown,
                    };
                    fields.push((measure.alias().to_string(), field_type));
                }
                Some(fields)
            }
            None => None,
        };

        Ok(Self {
            datastore,
            tables: scope
                .table
                .as_ref()
                .map(|t| t.table_names().into_iter().map(str::to_string).collect())
                .unwrap_or_default(),
            virtual_tables,
            sub_query_fields,
        })
    }

    pub fn is_virtual(&self, table: &str) -> bool {
        self.virtual_tables.contains_key(table)
    }

    /// Resolve `field`, failing with [`QueryError::UnknownField`] if no table
    /// of the scope declares it.
    pub fn resolve(&self, field: &Field) -> QueryResult<TypedField> {
        match field {
            Field::Table { full_name, alias } => {
                if let Some(outputs) = &self.sub_query_fields {
                    return outputs
                        .iter()
                        .find(|(name, _)| name == full_name)
                        .map(|(name, field_type)| TypedField::Aliased {
                            alias: name.clone(),
                            field_type: *field_type,
                        })
                        .ok_or_else(|| QueryError::UnknownField(full_name.clone()));
                }
                let (store, name) = field.column()?;
                let field_type = self
                    .lookup(store, name)
                    .ok_or_else(|| QueryError::UnknownField(full_name.clone()))?;
                Ok(TypedField::Table {
                    store: store.map(str::to_string),
                    name: name.to_string(),
                    field_type,
                    alias: alias.clone(),
                })
            }
            Field::Constant { value } => Ok(TypedField::Constant {
                value: value.clone(),
            }),
            Field::Function { expression } => Ok(TypedField::Function {
                expression: expression.clone(),
            }),
            Field::Aliased { alias } => {
                let field_type = self
                    .sub_query_fields
                    .iter()
                    .flatten()
                    .find(|(name, _)| name == alias)
                    .map(|(_, t)| *t)
                    .unwrap_or_default();
                Ok(TypedField::Aliased {
                    alias: alias.clone(),
                    field_type,
                })
            }
        }
    }

    fn lookup(&self, store: Option<&str>, name: &str) -> Option<FieldType> {
        match store {
            Some(store) => self.lookup_in(store, name),
            None => self.tables.iter().find_map(|t| self.lookup_in(t, name)),
        }
    }

    fn lookup_in(&self, table: &str, name: &str) -> Option<FieldType> {
        if let Some(fields) = self.virtual_tables.get(table) {
            return fields.iter().find(|(f, _)| f == name).map(|(_, t)| *t);
        }
        self.datastore
            .store(table)
            .and_then(|s| s.field(name))
            .map(|f| f.field_type)
    }
}
