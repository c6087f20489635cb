// Derived Table Operator
//
// Re-tags the rows of a derived table's query under the derived table's
// alias so the enclosing query can address them as `alias.column`.

use std::sync::Arc;

use crate::query::executor::context::ExecutionContext;
use crate::query::executor::operators::{Operator, OperatorNode};
use crate::query::executor::result::{ColumnDescriptor, QueryResult, Row};

pub struct SubqueryOperator {
    input: Box<OperatorNode>,
    columns: Vec<ColumnDescriptor>,
}

impl SubqueryOperator {
    pub fn new(input: OperatorNode, columns: Vec<ColumnDescriptor>) -> Self {
        SubqueryOperator {
            input: Box::new(input),
            columns,
        }
    }
}

impl Operator for SubqueryOperator {
    fn open(&mut self, ctx: &Arc<ExecutionContext>) -> QueryResult<()> {
        self.input.open(ctx)
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        Ok(self
            .input
            .next()?
            .map(|row| Row::from_columns(&self.columns, row.into_values())))
    }

    fn close(&mut self) -> QueryResult<()> {
        self.input.close()
    }
}
