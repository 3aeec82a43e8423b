//! Predicate trees: conditions on a single value and criteria binding them
//! to fields or measures.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::field::Field;
use super::measure::Measure;
use super::types::Value;
use crate::error::{QueryError, QueryResult};

/// The operator a condition node declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionType {
    And,
    Or,
    In,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    Null,
    NotNull,
}

impl ConditionType {
    /// SQL text of the operator.
    pub fn sql_infix(&self) -> &'static str {
        match self {
            ConditionType::And => "and",
            ConditionType::Or => "or",
            ConditionType::In => "in",
            ConditionType::Eq => "=",
            ConditionType::Neq => "<>",
            ConditionType::Lt => "<",
            ConditionType::Le => "<=",
            ConditionType::Gt => ">",
            ConditionType::Ge => ">=",
            ConditionType::Like => "like",
            ConditionType::Null => "is null",
            ConditionType::NotNull => "is not null",
        }
    }
}

const SINGLE_VALUE_TYPES: &[ConditionType] = &[
    ConditionType::Eq,
    ConditionType::Neq,
    ConditionType::Lt,
    ConditionType::Le,
    ConditionType::Gt,
    ConditionType::Ge,
    ConditionType::Like,
];
const IN_TYPES: &[ConditionType] = &[ConditionType::In];
const LOGICAL_TYPES: &[ConditionType] = &[ConditionType::And, ConditionType::Or];
const CONSTANT_TYPES: &[ConditionType] = &[ConditionType::Null, ConditionType::NotNull];

// =============================================================================
// Conditions
// =============================================================================

/// A predicate on one value. Logical nodes always have exactly two children;
/// longer chains nest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "@class")]
pub enum ConditionDto {
    #[serde(rename = "SingleValueConditionDto")]
    SingleValue {
        #[serde(rename = "type")]
        condition_type: ConditionType,
        value: Value,
    },

    #[serde(rename = "InConditionDto")]
    In {
        #[serde(rename = "type")]
        condition_type: ConditionType,
        values: Vec<Value>,
    },

    #[serde(rename = "LogicalConditionDto")]
    Logical {
        #[serde(rename = "type")]
        condition_type: ConditionType,
        one: Box<ConditionDto>,
        two: Box<ConditionDto>,
    },

    #[serde(rename = "ConstantConditionDto")]
    Constant {
        #[serde(rename = "type")]
        condition_type: ConditionType,
    },
}

impl ConditionDto {
    pub fn single(condition_type: ConditionType, value: impl Into<Value>) -> QueryResult<Self> {
        let condition = ConditionDto::SingleValue {
            condition_type,
            value: value.into(),
        };
        condition.validate()?;
        Ok(condition)
    }

    pub fn logical(condition_type: ConditionType, one: ConditionDto, two: ConditionDto) -> QueryResult<Self> {
        let condition = ConditionDto::Logical {
            condition_type,
            one: Box::new(one),
            two: Box::new(two),
        };
        condition.validate()?;
        Ok(condition)
    }

    pub fn constant(condition_type: ConditionType) -> QueryResult<Self> {
        let condition = ConditionDto::Constant { condition_type };
        condition.validate()?;
        Ok(condition)
    }

    pub fn in_list(values: Vec<Value>) -> Self {
        ConditionDto::In {
            condition_type: ConditionType::In,
            values,
        }
    }

    pub fn condition_type(&self) -> ConditionType {
        match self {
            ConditionDto::SingleValue { condition_type, .. }
            | ConditionDto::In { condition_type, .. }
            | ConditionDto::Logical { condition_type, .. }
            | ConditionDto::Constant { condition_type } => *condition_type,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConditionDto::SingleValue { .. } => "SingleValueConditionDto",
            ConditionDto::In { .. } => "InConditionDto",
            ConditionDto::Logical { .. } => "LogicalConditionDto",
            ConditionDto::Constant { .. } => "ConstantConditionDto",
        }
    }

    /// Check that every node declares a type its kind supports.
    pub fn validate(&self) -> QueryResult<()> {
        let supported = match self {
            ConditionDto::SingleValue { .. } => SINGLE_VALUE_TYPES,
            ConditionDto::In { .. } => IN_TYPES,
            ConditionDto::Logical { .. } => LOGICAL_TYPES,
            ConditionDto::Constant { .. } => CONSTANT_TYPES,
        };
        if !supported.contains(&self.condition_type()) {
            return Err(QueryError::UnsupportedCondition {
                kind: self.kind(),
                condition_type: self.condition_type(),
            });
        }
        if let ConditionDto::Logical { one, two, .. } = self {
            one.validate()?;
            two.validate()?;
        }
        Ok(())
    }
}

impl fmt::Display for ConditionDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionDto::SingleValue {
                condition_type,
                value,
            } => write!(f, "{} {}", condition_type.sql_infix(), value),
            ConditionDto::In { values, .. } => {
                write!(f, "in {}", Value::List(values.clone()))
            }
            ConditionDto::Logical {
                condition_type,
                one,
                two,
            } => write!(f, "({} {} {})", one, condition_type.sql_infix(), two),
            ConditionDto::Constant { condition_type } => f.write_str(condition_type.sql_infix()),
        }
    }
}

// =============================================================================
// Criteria
// =============================================================================

/// A `where` or `having` predicate tree.
///
/// Leaves bind a condition to a field (`where`) or a measure (`having`), or
/// compare two fields (join conditions). Logical nodes hold any number of
/// children.
#[derive(Debug, Clone, PartialEq)]
pub enum CriteriaDto {
    Field {
        field: Field,
        condition: ConditionDto,
    },
    FieldPair {
        left: Field,
        right: Field,
        condition_type: ConditionType,
    },
    Measure {
        measure: Box<Measure>,
        condition: ConditionDto,
    },
    Logical {
        condition_type: ConditionType,
        children: Vec<CriteriaDto>,
    },
}

impl CriteriaDto {
    /// Every field a leaf of this tree filters on.
    pub fn fields(&self) -> Vec<&Field> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a Field>) {
        match self {
            CriteriaDto::Field { field, .. } => out.push(field),
            CriteriaDto::FieldPair { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            CriteriaDto::Measure { .. } => {}
            CriteriaDto::Logical { children, .. } => {
                for child in children {
                    child.collect_fields(out);
                }
            }
        }
    }

    /// Copy of this tree without the leaves filtering on any of `fields`.
    ///
    /// Returns `None` when nothing remains.
    pub fn without_fields(&self, fields: &[&Field]) -> Option<CriteriaDto> {
        match self {
            CriteriaDto::Field { field, .. } if fields.contains(&field) => None,
            CriteriaDto::Logical {
                condition_type,
                children,
            } => {
                let kept: Vec<CriteriaDto> = children
                    .iter()
                    .filter_map(|c| c.without_fields(fields))
                    .collect();
                if kept.is_empty() {
                    None
                } else {
                    Some(CriteriaDto::Logical {
                        condition_type: *condition_type,
                        children: kept,
                    })
                }
            }
            other => Some(other.clone()),
        }
    }
}

/// Flat wire shape shared with the client libraries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CriteriaWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field: Option<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field_other: Option<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    measure: Option<Box<Measure>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<ConditionDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition_type: Option<ConditionType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<CriteriaDto>,
}

impl TryFrom<CriteriaWire> for CriteriaDto {
    type Error = String;

    fn try_from(wire: CriteriaWire) -> Result<Self, Self::Error> {
        match wire {
            CriteriaWire {
                field: Some(left),
                field_other: Some(right),
                condition_type: Some(condition_type),
                ..
            } => Ok(CriteriaDto::FieldPair {
                left,
                right,
                condition_type,
            }),
            CriteriaWire {
                field: Some(field),
                condition: Some(condition),
                ..
            } => Ok(CriteriaDto::Field { field, condition }),
            CriteriaWire {
                measure: Some(measure),
                condition: Some(condition),
                ..
            } => Ok(CriteriaDto::Measure { measure, condition }),
            CriteriaWire {
                field: None,
                measure: None,
                condition_type: Some(condition_type),
                children,
                ..
            } => Ok(CriteriaDto::Logical {
                condition_type,
                children,
            }),
            _ => Err("criteria must set a field, a measure or a logical conditionType".to_string()),
        }
    }
}

impl From<CriteriaDto> for CriteriaWire {
    fn from(criteria: CriteriaDto) -> Self {
        match criteria {
            CriteriaDto::Field { field, condition } => CriteriaWire {
                field: Some(field),
                condition: Some(condition),
                ..Default::default()
            },
            CriteriaDto::FieldPair {
                left,
                right,
                condition_type,
            } => CriteriaWire {
                field: Some(left),
                field_other: Some(right),
                condition_type: Some(condition_type),
                ..Default::default()
            },
            CriteriaDto::Measure { measure, condition } => CriteriaWire {
                measure: Some(measure),
                condition: Some(condition),
                ..Default::default()
            },
            CriteriaDto::Logical {
                condition_type,
                children,
            } => CriteriaWire {
                condition_type: Some(condition_type),
                children,
                ..Default::default()
            },
        }
    }
}

impl Serialize for CriteriaDto {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CriteriaWire::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CriteriaDto {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = CriteriaWire::deserialize(deserializer)?;
        CriteriaDto::try_from(wire).map_err(serde::de::Error::custom)
    }
}
