// Query Operators Module
//
// This module defines the operators used for query execution in the
// iterator-based execution model. The set of operators is closed, so the
// tree is an enum over the concrete operator types.

pub mod agg;
pub mod distinct;
pub mod filter;
pub mod join;
pub mod limit;
pub mod project;
pub mod scan;
pub mod sort;
pub mod subquery;
pub mod values;

use std::sync::Arc;

use crate::query::executor::context::ExecutionContext;
use crate::query::executor::result::{QueryError, QueryResult, Row};

pub use self::agg::HashAggregateOperator;
pub use self::distinct::DistinctOperator;
pub use self::filter::FilterOperator;
pub use self::join::NestedLoopJoin;
pub use self::limit::LimitOperator;
pub use self::project::ProjectOperator;
pub use self::scan::ScanOperator;
pub use self::sort::SortOperator;
pub use self::subquery::SubqueryOperator;
pub use self::values::ValuesOperator;

/// The Operator trait defines the interface for all query execution
/// operators. `open` opens the children before any local work, `next`
/// yields rows until `None`, and `close` releases resources; closing twice
/// is harmless.
pub trait Operator: Send {
    fn open(&mut self, ctx: &Arc<ExecutionContext>) -> QueryResult<()>;

    fn next(&mut self) -> QueryResult<Option<Row>>;

    fn close(&mut self) -> QueryResult<()>;
}

/// A node of an operator tree
pub enum OperatorNode {
    Scan(ScanOperator),
    Values(ValuesOperator),
    Join(NestedLoopJoin),
    Filter(FilterOperator),
    Group(HashAggregateOperator),
    Project(ProjectOperator),
    Subquery(SubqueryOperator),
    Distinct(DistinctOperator),
    Sort(SortOperator),
    Limit(LimitOperator),
}

impl OperatorNode {
    fn inner(&mut self) -> &mut dyn Operator {
        match self {
            OperatorNode::Scan(op) => op,
            OperatorNode::Values(op) => op,
            OperatorNode::Join(op) => op,
            OperatorNode::Filter(op) => op,
            OperatorNode::Group(op) => op,
            OperatorNode::Project(op) => op,
            OperatorNode::Subquery(op) => op,
            OperatorNode::Distinct(op) => op,
            OperatorNode::Sort(op) => op,
            OperatorNode::Limit(op) => op,
        }
    }
}

impl Operator for OperatorNode {
    fn open(&mut self, ctx: &Arc<ExecutionContext>) -> QueryResult<()> {
        self.inner().open(ctx)
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        self.inner().next()
    }

    fn close(&mut self) -> QueryResult<()> {
        self.inner().close()
    }
}

/// Error for an operator driven before `open`
pub(crate) fn not_open(operator: &str) -> QueryError {
    QueryError::Execution(format!("{} operator used before open", operator))
}

/// Close two children, keeping the first failure
pub(crate) fn close_both(first: &mut OperatorNode, second: &mut OperatorNode) -> QueryResult<()> {
    let first = first.close();
    let second = second.close();
    first.and(second)
}
