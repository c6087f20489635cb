// Nested Loop Join Implementation
//
// Works for any join condition. Both inputs are gathered first; the output
// is then produced incrementally, one combined row per call. Outer joins
// pad the unmatched side with absent values.

use std::sync::Arc;

use super::gather;
use crate::query::executor::context::ExecutionContext;
use crate::query::executor::expression_eval::evaluate_predicate;
use crate::query::executor::operators::{close_both, not_open, Operator, OperatorNode};
use crate::query::executor::result::{ColumnDescriptor, QueryResult, Row};
use crate::query::planner::expression::SqlExpr;
use crate::query::planner::logical::JoinKind;

/// Position in the nested loops
struct JoinState {
    /// Rows of the loop-driving side: the right side for RIGHT JOIN
    outer: Vec<Row>,
    inner: Vec<Row>,
    outer_index: usize,
    inner_index: usize,
    matched: bool,
}

/// Nested Loop Join operator implementation
pub struct NestedLoopJoin {
    left: Box<OperatorNode>,
    right: Box<OperatorNode>,
    kind: JoinKind,
    on: Option<SqlExpr>,
    left_columns: Vec<ColumnDescriptor>,
    right_columns: Vec<ColumnDescriptor>,
    ctx: Option<Arc<ExecutionContext>>,
    state: Option<JoinState>,
}

impl NestedLoopJoin {
    pub fn new(
        left: OperatorNode,
        right: OperatorNode,
        kind: JoinKind,
        on: Option<SqlExpr>,
        left_columns: Vec<ColumnDescriptor>,
        right_columns: Vec<ColumnDescriptor>,
    ) -> Self {
        NestedLoopJoin {
            left: Box::new(left),
            right: Box::new(right),
            kind,
            on,
            left_columns,
            right_columns,
            ctx: None,
            state: None,
        }
    }

    fn load(&mut self, ctx: &Arc<ExecutionContext>) -> QueryResult<JoinState> {
        let config = ctx.config();
        let (left, right) = gather(
            &mut self.left,
            &mut self.right,
            config.concurrent_join_gather,
            config.channel_capacity(),
        )?;
        let (outer, inner) = match self.kind {
            JoinKind::RightOuter => (right, left),
            _ => (left, right),
        };
        Ok(JoinState {
            outer,
            inner,
            outer_index: 0,
            inner_index: 0,
            matched: false,
        })
    }

    /// Combine rows of the loop sides back into left-then-right order
    fn combine(kind: JoinKind, outer: &Row, inner: &Row) -> Row {
        match kind {
            JoinKind::RightOuter => Row::join(inner, outer),
            _ => Row::join(outer, inner),
        }
    }
}

impl Operator for NestedLoopJoin {
    fn open(&mut self, ctx: &Arc<ExecutionContext>) -> QueryResult<()> {
        self.left.open(ctx)?;
        self.right.open(ctx)?;
        self.ctx = Some(Arc::clone(ctx));
        self.state = None;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        let ctx = self.ctx.clone().ok_or_else(|| not_open("join"))?;
        if self.state.is_none() {
            self.state = Some(self.load(&ctx)?);
        }

        let kind = self.kind;
        let Some(state) = self.state.as_mut() else {
            return Ok(None);
        };
        while state.outer_index < state.outer.len() {
            let outer = &state.outer[state.outer_index];
            if state.inner_index < state.inner.len() {
                let combined = Self::combine(kind, outer, &state.inner[state.inner_index]);
                state.inner_index += 1;
                let hit = match &self.on {
                    Some(on) => evaluate_predicate(on, &combined, &ctx)?,
                    None => true,
                };
                if hit {
                    state.matched = true;
                    return Ok(Some(combined));
                }
                continue;
            }

            let padded = if kind.is_outer() && !state.matched {
                Some(match kind {
                    JoinKind::RightOuter => Row::join(&Row::absent(&self.left_columns), outer),
                    _ => Row::join(outer, &Row::absent(&self.right_columns)),
                })
            } else {
                None
            };
            state.outer_index += 1;
            state.inner_index = 0;
            state.matched = false;
            if padded.is_some() {
                return Ok(padded);
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> QueryResult<()> {
        self.state = None;
        self.ctx = None;
        close_both(&mut self.left, &mut self.right)
    }
}
