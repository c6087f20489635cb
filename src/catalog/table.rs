//! Table Module
//!
//! A relational table backed by one document collection.

use serde::{Deserialize, Serialize};

use super::column::Column;

/// Represents a table mapped onto a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name as exposed to SQL
    name: String,
    /// Backend collection; defaults to the table name
    #[serde(default)]
    collection: Option<String>,
    /// Declared columns in schema order
    #[serde(default)]
    columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Table {
            name: name.into(),
            collection: None,
            columns,
        }
    }

    /// Set the backend collection backing this table
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend collection name
    pub fn collection(&self) -> &str {
        self.collection.as_deref().unwrap_or(&self.name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Case-insensitive column lookup
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name().eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}
