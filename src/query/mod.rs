// Query Processing Module
//
// SQL parsing, name resolution, planning and execution, tied together by
// the `Evaluator` facade.

pub mod algebrizer;
pub mod evaluator;
pub mod executor;
pub mod parser;
pub mod planner;

pub use algebrizer::algebrize;
pub use evaluator::{ConnectionContext, Evaluator, SimpleConnection};
pub use executor::{QueryError, QueryResult, QueryResultSet, RowIter, SqlValue};
pub use parser::{parse, Parser};
pub use planner::{LogicalPlan, Planner};
