// Query Executor Module
//
// This module is responsible for executing query plans and producing results.
// It implements the iterator-based execution model for query processing.

pub mod context;
pub mod engine;
pub mod expression_eval;
pub mod functions;
pub mod operators;
pub mod result;
pub mod value;

pub use self::context::{ConnectionInfo, ExecutionContext};
pub use self::engine::{execute, RowIter};
pub use self::operators::Operator;
pub use self::result::{ColumnDescriptor, QueryError, QueryResult, QueryResultSet, Row};
pub use self::value::SqlValue;
