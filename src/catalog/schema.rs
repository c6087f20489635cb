// Schema Module
//
// The top of the catalog: a set of databases, each a set of tables. Lookups
// compare names case-insensitively and hand back the canonical definition.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::table::Table;

/// Declared SQL type of a column or expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    Int,
    Uint,
    Float,
    Decimal,
    Boolean,
    Varchar,
    ObjectId,
    Date,
    Timestamp,
    /// Type of a bare NULL or of an expression whose type cannot be known
    Null,
}

impl SqlType {
    /// Parse a type name as it appears in schema files
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "int" | "integer" | "bigint" | "int64" | "long" => Some(SqlType::Int),
            "uint" | "unsigned" => Some(SqlType::Uint),
            "float" | "double" | "real" => Some(SqlType::Float),
            "decimal" | "numeric" | "decimal128" => Some(SqlType::Decimal),
            "bool" | "boolean" => Some(SqlType::Boolean),
            "varchar" | "text" | "string" | "char" => Some(SqlType::Varchar),
            "objectid" => Some(SqlType::ObjectId),
            "date" => Some(SqlType::Date),
            "timestamp" | "datetime" => Some(SqlType::Timestamp),
            "null" => Some(SqlType::Null),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SqlType::Int | SqlType::Uint | SqlType::Float | SqlType::Decimal)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::Int => "int",
            SqlType::Uint => "uint",
            SqlType::Float => "float",
            SqlType::Decimal => "decimal",
            SqlType::Boolean => "boolean",
            SqlType::Varchar => "varchar",
            SqlType::ObjectId => "objectid",
            SqlType::Date => "date",
            SqlType::Timestamp => "timestamp",
            SqlType::Null => "null",
        };
        write!(f, "{}", name)
    }
}

/// A database: a named set of tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Database {
    pub fn new(name: impl Into<String>, tables: Vec<Table>) -> Self {
        Database { name: name.into(), tables }
    }

    /// Case-insensitive table lookup
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name().eq_ignore_ascii_case(name))
    }
}

/// The full relational view over the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub databases: Vec<Database>,
}

impl Schema {
    pub fn new(databases: Vec<Database>) -> Self {
        Schema { databases }
    }

    /// Load a schema from its JSON representation
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Case-insensitive database lookup
    pub fn database(&self, name: &str) -> Option<&Database> {
        self.databases.iter().find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Find a table in the given database
    pub fn table(&self, database: &str, table: &str) -> Option<&Table> {
        self.database(database).and_then(|db| db.table(table))
    }
}
