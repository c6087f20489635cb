// Projection Operator Implementation
//
// Evaluates the select list for each input row and builds the output row
// from the projected column descriptors.

use std::sync::Arc;

use crate::query::executor::context::ExecutionContext;
use crate::query::executor::expression_eval::evaluate;
use crate::query::executor::operators::{not_open, Operator, OperatorNode};
use crate::query::executor::result::{ColumnDescriptor, QueryResult, Row};
use crate::query::planner::expression::SqlExpr;

pub struct ProjectOperator {
    input: Box<OperatorNode>,
    exprs: Vec<SqlExpr>,
    columns: Vec<ColumnDescriptor>,
    ctx: Option<Arc<ExecutionContext>>,
}

impl ProjectOperator {
    pub fn new(input: OperatorNode, exprs: Vec<SqlExpr>, columns: Vec<ColumnDescriptor>) -> Self {
        ProjectOperator {
            input: Box::new(input),
            exprs,
            columns,
            ctx: None,
        }
    }
}

impl Operator for ProjectOperator {
    fn open(&mut self, ctx: &Arc<ExecutionContext>) -> QueryResult<()> {
        self.input.open(ctx)?;
        self.ctx = Some(Arc::clone(ctx));
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        let ctx = self.ctx.as_ref().ok_or_else(|| not_open("project"))?;
        let Some(row) = self.input.next()? else {
            return Ok(None);
        };
        let values = self
            .exprs
            .iter()
            .map(|expr| evaluate(expr, &row, ctx))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(Some(Row::from_columns(&self.columns, values)))
    }

    fn close(&mut self) -> QueryResult<()> {
        self.ctx = None;
        self.input.close()
    }
}
