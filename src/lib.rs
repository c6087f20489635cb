// docsql: SQL queries over a document store

pub mod catalog;
pub mod common;
pub mod query;
pub mod store;

// Re-export key items for convenient access
pub use catalog::{Column, Database, Schema, SqlType, Table};
pub use common::{CancellationToken, EngineConfig};
pub use query::executor::result::{QueryError, QueryResult, QueryResultSet};
pub use query::executor::value::SqlValue;
pub use query::executor::RowIter;
pub use query::{ConnectionContext, Evaluator, SimpleConnection};
pub use store::{Cursor, MemoryStore, Session, StoreError};
