#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tempfile::NamedTempFile;

use docsql::query::executor::ConnectionInfo;
use docsql::{EngineConfig, Evaluator, MemoryStore, QueryResultSet, Schema, SimpleConnection, SqlValue};

// Employees and departments in database "test", plus a small numeric
// table "nums". Employee 4 has no department, employee 5 points at a
// department that does not exist and has no salary, department 40 has
// no employees.
pub const SCHEMA_JSON: &str = r#"{
    "databases": [{
        "name": "test",
        "tables": [
            {
                "name": "employees",
                "collection": "emp",
                "columns": [
                    {"name": "id", "field": "_id", "sql_type": "int"},
                    {"name": "name", "sql_type": "varchar"},
                    {"name": "dept_id", "sql_type": "int"},
                    {"name": "salary", "sql_type": "int"},
                    {"name": "city", "field": "address.city", "sql_type": "varchar"}
                ]
            },
            {
                "name": "departments",
                "collection": "dept",
                "columns": [
                    {"name": "id", "field": "_id", "sql_type": "int"},
                    {"name": "name", "sql_type": "varchar"}
                ]
            },
            {
                "name": "nums",
                "columns": [
                    {"name": "a", "sql_type": "int"},
                    {"name": "b", "sql_type": "float"}
                ]
            }
        ]
    }]
}"#;

pub const DATA_JSON: &str = r#"{
    "test": {
        "emp": [
            {"_id": 1, "name": "ann", "dept_id": 10, "salary": 100, "address": {"city": "Oslo"}},
            {"_id": 2, "name": "bob", "dept_id": 10, "salary": 200, "address": {"city": "Bergen"}},
            {"_id": 3, "name": "cid", "dept_id": 20, "salary": 150},
            {"_id": 4, "name": "dee", "dept_id": null, "salary": 50, "address": {"city": "Oslo"}},
            {"_id": 5, "name": "eve", "dept_id": 30}
        ],
        "dept": [
            {"_id": 10, "name": "eng"},
            {"_id": 20, "name": "ops"},
            {"_id": 40, "name": "hr"}
        ],
        "nums": [
            {"a": 1, "b": 1.5},
            {"a": 2, "b": 2.5},
            {"a": 3}
        ]
    }
}"#;

pub fn test_schema() -> Result<Schema> {
    Ok(Schema::from_json_str(SCHEMA_JSON)?)
}

pub fn test_store() -> Result<Arc<MemoryStore>> {
    Ok(Arc::new(MemoryStore::from_json_str(DATA_JSON)?))
}

/// Evaluator and connection over the fixture, with "test" selected
pub struct Fixture {
    pub evaluator: Evaluator,
    pub store: Arc<MemoryStore>,
    pub connection: SimpleConnection,
}

impl Fixture {
    pub fn new() -> Result<Self> {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Result<Self> {
        let store = test_store()?;
        let connection = SimpleConnection::new(store.clone())
            .with_database("test")
            .with_info(ConnectionInfo::default());
        Ok(Fixture {
            evaluator: Evaluator::new(Arc::new(test_schema()?), config),
            store,
            connection,
        })
    }

    /// Run a query to completion
    pub fn run(&self, query: &str) -> Result<QueryResultSet> {
        let (_, rows) = self.evaluator.evaluate("", query, None, &self.connection)?;
        Ok(rows.collect_result_set()?)
    }

    /// Run a query and return its rows as value vectors
    pub fn values(&self, query: &str) -> Result<Vec<Vec<SqlValue>>> {
        Ok(self.run(query)?.rows().to_vec())
    }

    /// Values of the first column
    pub fn column(&self, query: &str) -> Result<Vec<SqlValue>> {
        Ok(self
            .values(query)?
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }
}

pub fn int(v: i64) -> SqlValue {
    SqlValue::Int(v)
}

pub fn text(v: &str) -> SqlValue {
    SqlValue::from(v)
}

/// Write `contents` to a temporary file that lives as long as the handle
pub fn write_temp_file(contents: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}
