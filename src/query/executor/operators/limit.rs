// Limit Operator
//
// Skips `offset` rows and then passes at most `count` rows through.

use std::sync::Arc;

use crate::query::executor::context::ExecutionContext;
use crate::query::executor::operators::{Operator, OperatorNode};
use crate::query::executor::result::{QueryResult, Row};

pub struct LimitOperator {
    input: Box<OperatorNode>,
    offset: u64,
    count: u64,
    skipped: u64,
    returned: u64,
}

impl LimitOperator {
    pub fn new(input: OperatorNode, offset: u64, count: u64) -> Self {
        LimitOperator {
            input: Box::new(input),
            offset,
            count,
            skipped: 0,
            returned: 0,
        }
    }
}

impl Operator for LimitOperator {
    fn open(&mut self, ctx: &Arc<ExecutionContext>) -> QueryResult<()> {
        self.skipped = 0;
        self.returned = 0;
        self.input.open(ctx)
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        if self.returned >= self.count {
            return Ok(None);
        }
        while self.skipped < self.offset {
            if self.input.next()?.is_none() {
                return Ok(None);
            }
            self.skipped += 1;
        }
        let row = self.input.next()?;
        if row.is_some() {
            self.returned += 1;
        }
        Ok(row)
    }

    fn close(&mut self) -> QueryResult<()> {
        self.input.close()
    }
}
