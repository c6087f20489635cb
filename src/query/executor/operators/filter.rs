// Filter Operator Implementation
//
// Passes through the input rows for which the predicate is exactly TRUE.

use std::sync::Arc;

use crate::query::executor::context::ExecutionContext;
use crate::query::executor::expression_eval::evaluate_predicate;
use crate::query::executor::operators::{not_open, Operator, OperatorNode};
use crate::query::executor::result::{QueryResult, Row};
use crate::query::planner::expression::SqlExpr;

/// Filter operator that filters rows based on a predicate
pub struct FilterOperator {
    input: Box<OperatorNode>,
    predicate: SqlExpr,
    ctx: Option<Arc<ExecutionContext>>,
}

impl FilterOperator {
    pub fn new(input: OperatorNode, predicate: SqlExpr) -> Self {
        FilterOperator {
            input: Box::new(input),
            predicate,
            ctx: None,
        }
    }
}

impl Operator for FilterOperator {
    fn open(&mut self, ctx: &Arc<ExecutionContext>) -> QueryResult<()> {
        self.input.open(ctx)?;
        self.ctx = Some(Arc::clone(ctx));
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        let ctx = self.ctx.as_ref().ok_or_else(|| not_open("filter"))?;
        while let Some(row) = self.input.next()? {
            if evaluate_predicate(&self.predicate, &row, ctx)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> QueryResult<()> {
        self.ctx = None;
        self.input.close()
    }
}
