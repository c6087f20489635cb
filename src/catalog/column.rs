// Column Module
//
// A declared column: its SQL name, the document field it reads and its type.

use serde::{Deserialize, Serialize};

use super::schema::SqlType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    name: String,
    /// Dotted document field path; defaults to the column name
    #[serde(default)]
    field: Option<String>,
    /// Declared type
    sql_type: SqlType,
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Column {
            name: name.into(),
            field: None,
            sql_type,
        }
    }

    /// Map the column onto a different document field path
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Document field path read by scans
    pub fn field(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }
}
