// Sort Operator
//
// Drains its input on the first call to `next`, computes the sort keys of
// every row once and emits the rows in key order. NULLs sort first in
// ascending order; rows with equal keys keep their input order.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::query::executor::context::ExecutionContext;
use crate::query::executor::expression_eval::evaluate;
use crate::query::executor::operators::{not_open, Operator, OperatorNode};
use crate::query::executor::result::{QueryError, QueryResult, Row};
use crate::query::executor::value::SqlValue;
use crate::query::planner::logical::SortKey;

pub struct SortOperator {
    input: Box<OperatorNode>,
    keys: Vec<SortKey>,
    ctx: Option<Arc<ExecutionContext>>,
    output: Option<std::vec::IntoIter<Row>>,
}

impl SortOperator {
    pub fn new(input: OperatorNode, keys: Vec<SortKey>) -> Self {
        SortOperator {
            input: Box::new(input),
            keys,
            ctx: None,
            output: None,
        }
    }

    fn sorted(&mut self, ctx: &Arc<ExecutionContext>) -> QueryResult<Vec<Row>> {
        let mut keyed: Vec<(Vec<SqlValue>, Row)> = Vec::new();
        while let Some(row) = self.input.next()? {
            let key = self
                .keys
                .iter()
                .map(|k| evaluate(&k.expr, &row, ctx))
                .collect::<QueryResult<Vec<_>>>()?;
            keyed.push((key, row));
        }

        let mut failure: Option<QueryError> = None;
        keyed.sort_by(|(a, _), (b, _)| {
            for ((x, y), key) in a.iter().zip(b).zip(&self.keys) {
                let ordering = match x.compare(y) {
                    Ok(ordering) => ordering,
                    Err(e) => {
                        failure.get_or_insert(e);
                        Ordering::Equal
                    }
                };
                let ordering = if key.descending { ordering.reverse() } else { ordering };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        match failure {
            Some(e) => Err(e),
            None => Ok(keyed.into_iter().map(|(_, row)| row).collect()),
        }
    }
}

impl Operator for SortOperator {
    fn open(&mut self, ctx: &Arc<ExecutionContext>) -> QueryResult<()> {
        self.input.open(ctx)?;
        self.ctx = Some(Arc::clone(ctx));
        self.output = None;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        if self.output.is_none() {
            let ctx = self.ctx.clone().ok_or_else(|| not_open("sort"))?;
            let rows = self.sorted(&ctx)?;
            self.output = Some(rows.into_iter());
        }
        Ok(self.output.as_mut().and_then(Iterator::next))
    }

    fn close(&mut self) -> QueryResult<()> {
        self.output = None;
        self.ctx = None;
        self.input.close()
    }
}
