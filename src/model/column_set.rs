//! Column sets: virtual grouping columns computed in memory.

use serde::{Deserialize, Serialize};

use super::field::Field;
use super::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnSetKey {
    Bucket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@class")]
pub enum ColumnSet {
    /// Groups the values of `field` into named buckets; `name` becomes a new
    /// column holding the bucket of each row.
    #[serde(rename = "BucketColumnSetDto")]
    Bucket {
        name: String,
        field: Field,
        values: Vec<(String, Vec<Value>)>,
    },
}

impl ColumnSet {
    pub fn bucket(name: impl Into<String>, field: Field) -> Self {
        ColumnSet::Bucket {
            name: name.into(),
            field,
            values: Vec::new(),
        }
    }

    /// Append a bucket, keeping declaration order.
    pub fn with_bucket(mut self, bucket: impl Into<String>, members: Vec<Value>) -> Self {
        match &mut self {
            ColumnSet::Bucket { values, .. } => values.push((bucket.into(), members)),
        }
        self
    }

    pub fn key(&self) -> ColumnSetKey {
        match self {
            ColumnSet::Bucket { .. } => ColumnSetKey::Bucket,
        }
    }

    /// Field added to the result by this column set.
    pub fn new_column(&self) -> Field {
        match self {
            ColumnSet::Bucket { name, .. } => Field::table(name.clone()),
        }
    }

    /// Field that must be grouped by the database for this set to be computed.
    pub fn source_column(&self) -> &Field {
        match self {
            ColumnSet::Bucket { field, .. } => field,
        }
    }

    /// Buckets containing `value`, in declaration order.
    pub fn buckets_of<'a>(&'a self, value: &'a Value) -> impl Iterator<Item = &'a str> + 'a {
        match self {
            ColumnSet::Bucket { values, .. } => values
                .iter()
                .filter(move |(_, members)| members.contains(value))
                .map(|(name, _)| name.as_str()),
        }
    }

    /// Ordered bucket list.
    pub fn buckets(&self) -> &[(String, Vec<Value>)] {
        match self {
            ColumnSet::Bucket { values, .. } => values,
        }
    }
}
