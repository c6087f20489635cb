// Distinct Operator
//
// Streams the first occurrence of each distinct row.

use std::collections::HashSet;
use std::sync::Arc;

use crate::query::executor::context::ExecutionContext;
use crate::query::executor::operators::{Operator, OperatorNode};
use crate::query::executor::result::{QueryResult, Row};
use crate::query::executor::value::SqlValue;

pub struct DistinctOperator {
    input: Box<OperatorNode>,
    seen: HashSet<Vec<SqlValue>>,
}

impl DistinctOperator {
    pub fn new(input: OperatorNode) -> Self {
        DistinctOperator {
            input: Box::new(input),
            seen: HashSet::new(),
        }
    }
}

impl Operator for DistinctOperator {
    fn open(&mut self, ctx: &Arc<ExecutionContext>) -> QueryResult<()> {
        self.seen.clear();
        self.input.open(ctx)
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        while let Some(row) = self.input.next()? {
            let key: Vec<SqlValue> = row.values().into_iter().cloned().collect();
            if self.seen.insert(key) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> QueryResult<()> {
        self.seen.clear();
        self.input.close()
    }
}
