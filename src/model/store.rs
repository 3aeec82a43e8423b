//! Datastore schema: the physical tables a backend exposes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::FieldType;

/// A typed column of a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// A physical table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub name: String,
    pub fields: Vec<StoreField>,
}

impl Store {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(StoreField {
            name: name.into(),
            field_type,
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&StoreField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The set of stores known to a backend, by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Datastore {
    pub stores: BTreeMap<String, Store>,
}

impl Datastore {
    pub fn new(stores: impl IntoIterator<Item = Store>) -> Self {
        Self {
            stores: stores.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    pub fn store(&self, name: &str) -> Option<&Store> {
        self.stores.get(name)
    }

    pub fn store_names(&self) -> Vec<String> {
        self.stores.keys().cloned().collect()
    }
}
