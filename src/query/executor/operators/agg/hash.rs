// Hash-based Grouping Operator
//
// Buffers its whole input into groups keyed by the GROUP BY values, then
// emits one row per group in first-seen order. Each emitted row is the
// first row of its group with the group's rows attached, so aggregates
// evaluated later see every member.

use std::sync::Arc;

use linked_hash_map::LinkedHashMap;
use log::debug;

use crate::query::executor::context::ExecutionContext;
use crate::query::executor::expression_eval::evaluate;
use crate::query::executor::operators::{not_open, Operator, OperatorNode};
use crate::query::executor::result::{QueryError, QueryResult, Row};
use crate::query::executor::value::SqlValue;
use crate::query::planner::expression::SqlExpr;

pub struct HashAggregateOperator {
    input: Box<OperatorNode>,
    keys: Vec<SqlExpr>,
    ctx: Option<Arc<ExecutionContext>>,
    /// Groups ready to emit, filled on the first call to `next`
    groups: Option<std::vec::IntoIter<Row>>,
}

impl HashAggregateOperator {
    pub fn new(input: OperatorNode, keys: Vec<SqlExpr>) -> Self {
        HashAggregateOperator {
            input: Box::new(input),
            keys,
            ctx: None,
            groups: None,
        }
    }

    fn build_groups(&mut self, ctx: &Arc<ExecutionContext>) -> QueryResult<Vec<Row>> {
        let limit = ctx.config().max_group_rows;
        let mut groups: LinkedHashMap<Vec<SqlValue>, Vec<Row>> = LinkedHashMap::new();
        let mut buffered = 0usize;

        while let Some(row) = self.input.next()? {
            buffered += 1;
            if limit.is_some_and(|limit| buffered > limit) {
                return Err(QueryError::Execution(format!(
                    "grouping buffered more than {} rows",
                    buffered - 1
                )));
            }
            let key = self
                .keys
                .iter()
                .map(|k| evaluate(k, &row, ctx))
                .collect::<QueryResult<Vec<_>>>()?;
            groups.entry(key).or_insert_with(Vec::new).push(row);
        }

        // Aggregates without GROUP BY still produce one row
        if self.keys.is_empty() && groups.is_empty() {
            groups.insert(Vec::new(), Vec::new());
        }
        debug!("Grouped {} rows into {} groups", buffered, groups.len());

        Ok(groups
            .into_iter()
            .map(|(_, rows)| {
                let mut representative = rows.first().cloned().unwrap_or_default();
                representative.group = Some(rows);
                representative
            })
            .collect())
    }
}

impl Operator for HashAggregateOperator {
    fn open(&mut self, ctx: &Arc<ExecutionContext>) -> QueryResult<()> {
        self.input.open(ctx)?;
        self.ctx = Some(Arc::clone(ctx));
        self.groups = None;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        if self.groups.is_none() {
            let ctx = self.ctx.clone().ok_or_else(|| not_open("group"))?;
            let groups = self.build_groups(&ctx)?;
            self.groups = Some(groups.into_iter());
        }
        Ok(self.groups.as_mut().and_then(Iterator::next))
    }

    fn close(&mut self) -> QueryResult<()> {
        self.groups = None;
        self.ctx = None;
        self.input.close()
    }
}
