//! Measures of a query indexed by alias.
//!
//! Nested operands are flattened into the arena so shared sub-measures are
//! stored once; [`Measure::Ref`] operands point at an alias instead of owning
//! a copy.

use std::collections::HashMap;

use crate::error::{QueryError, QueryResult};
use crate::model::{Field, Measure};

#[derive(Debug, Clone, Default)]
pub struct MeasureArena {
    measures: Vec<Measure>,
    by_alias: HashMap<String, usize>,
}

/// Alias a measure operand stands for: the referenced alias for a
/// [`Measure::Ref`], its own alias otherwise.
pub fn operand_alias(measure: &Measure) -> &str {
    match measure {
        Measure::Ref { alias } => alias,
        other => other.alias(),
    }
}

/// Alias of the `index`-th aggregate computed for a vector measure.
pub fn vector_component_alias(vector_alias: &str, index: usize) -> String {
    format!("__{}_{}__", vector_alias, index)
}

/// The database measures a vector measure aggregates along its axis.
pub fn vector_components(alias: &str, fields: &[(Field, String)]) -> Vec<Measure> {
    fields
        .iter()
        .enumerate()
        .map(|(i, (field, function))| Measure::Aggregated {
            alias: vector_component_alias(alias, i),
            field: field.clone(),
            aggregation_function: function.clone(),
            criteria: None,
        })
        .collect()
}

impl MeasureArena {
    pub fn build<'a>(measures: impl IntoIterator<Item = &'a Measure>) -> QueryResult<Self> {
        let mut arena = Self::default();
        for measure in measures {
            arena.register(measure)?;
        }
        arena.check_references()?;
        Ok(arena)
    }

    fn register(&mut self, measure: &Measure) -> QueryResult<()> {
        if let Measure::Ref { .. } = measure {
            return Ok(());
        }
        match self.by_alias.get(measure.alias()) {
            Some(&i) if self.measures[i] == *measure => return Ok(()),
            Some(_) => return Err(QueryError::DuplicateMeasureAlias(measure.alias().to_string())),
            None => {}
        }
        self.by_alias
            .insert(measure.alias().to_string(), self.measures.len());
        self.measures.push(measure.clone());

        match measure {
            Measure::BinaryOperation {
                left_operand,
                right_operand,
                ..
            } => {
                self.register(left_operand)?;
                self.register(right_operand)?;
            }
            Measure::Comparison { measure: base, .. } => self.register(base)?,
            Measure::VectorTupleAgg {
                alias,
                field_to_aggregate_and_agg_func,
                ..
            } => {
                for component in vector_components(alias, field_to_aggregate_and_agg_func) {
                    self.register(&component)?;
                }
            }
            Measure::Aggregated { .. }
            | Measure::Expression { .. }
            | Measure::Count { .. }
            | Measure::Ref { .. } => {}
        }
        Ok(())
    }

    fn check_references(&self) -> QueryResult<()> {
        for measure in &self.measures {
            for alias in self.operands(measure) {
                self.get(&alias)?;
            }
        }
        Ok(())
    }

    pub fn get(&self, alias: &str) -> QueryResult<&Measure> {
        self.by_alias
            .get(alias)
            .map(|&i| &self.measures[i])
            .ok_or_else(|| QueryError::UnknownMeasure(alias.to_string()))
    }

    /// Aliases a measure reads, in operand order.
    pub fn operands(&self, measure: &Measure) -> Vec<String> {
        match measure {
            Measure::BinaryOperation {
                left_operand,
                right_operand,
                ..
            } => vec![
                operand_alias(left_operand).to_string(),
                operand_alias(right_operand).to_string(),
            ],
            Measure::Comparison { measure: base, .. } => vec![operand_alias(base).to_string()],
            Measure::VectorTupleAgg {
                alias,
                field_to_aggregate_and_agg_func,
                ..
            } => (0..field_to_aggregate_and_agg_func.len())
                .map(|i| vector_component_alias(alias, i))
                .collect(),
            Measure::Aggregated { .. }
            | Measure::Expression { .. }
            | Measure::Count { .. }
            | Measure::Ref { .. } => vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }
}
