// Query Execution Engine Implementation
//
// Builds and opens the operator tree of a plan and exposes it as a row
// iterator. The iterator owns the tree: it checks for cancellation between
// rows and closes the tree exactly once, on exhaustion, on error, on request
// or when dropped. Panics raised while opening the tree or producing a row
// become execution errors.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, warn};

use crate::query::executor::context::ExecutionContext;
use crate::query::executor::operators::{Operator, OperatorNode};
use crate::query::executor::result::{ColumnDescriptor, QueryError, QueryResult, QueryResultSet, Row};
use crate::query::planner::logical::LogicalPlan;
use crate::query::planner::operator_builder::build_operator;

/// Build, open and wrap the operator tree for `plan`
pub fn execute(plan: &LogicalPlan, ctx: Arc<ExecutionContext>) -> QueryResult<RowIter> {
    RowIter::open(plan, ctx)
}

/// Rows of an executing query
pub struct RowIter {
    root: OperatorNode,
    columns: Vec<ColumnDescriptor>,
    ctx: Arc<ExecutionContext>,
    error: Option<QueryError>,
    exhausted: bool,
    closed: bool,
}

impl RowIter {
    pub fn open(plan: &LogicalPlan, ctx: Arc<ExecutionContext>) -> QueryResult<Self> {
        let root = guarded("opening the query", || {
            let mut root = build_operator(plan)?;
            if let Err(e) = root.open(&ctx) {
                if let Err(close_error) = root.close() {
                    warn!("Closing after failed open also failed: {}", close_error);
                }
                return Err(e);
            }
            Ok(root)
        })?;
        debug!("Opened operator tree for plan:\n{}", plan);
        Ok(RowIter {
            root,
            columns: plan.columns(),
            ctx,
            error: None,
            exhausted: false,
            closed: false,
        })
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Display labels of the output columns
    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.label.clone()).collect()
    }

    /// The error that ended iteration, if any
    pub fn err(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    /// Release the operator tree. Later calls return `Ok` without doing
    /// anything.
    pub fn close(&mut self) -> QueryResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.root.close() {
            Ok(()) => Ok(()),
            Err(e) if self.error.is_some() => {
                warn!("Close failed after an earlier error: {}", e);
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Drain the remaining rows into a result set
    pub fn collect_result_set(mut self) -> QueryResult<QueryResultSet> {
        let mut result = QueryResultSet::new(self.columns.clone());
        for row in self.by_ref() {
            result.add_row(row?);
        }
        self.close()?;
        Ok(result)
    }

    fn fail(&mut self, error: QueryError) -> QueryError {
        self.exhausted = true;
        self.error = Some(error.clone());
        if let Err(close_error) = self.close() {
            warn!("Close failed after an earlier error: {}", close_error);
        }
        error
    }

    fn produce(&mut self) -> QueryResult<Option<Row>> {
        self.ctx.check_cancelled()?;
        let root = &mut self.root;
        guarded("producing a row", || root.next())
    }
}

impl Iterator for RowIter {
    type Item = QueryResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted || self.closed {
            return None;
        }
        match self.produce() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.exhausted = true;
                self.close().err().map(Err)
            }
            Err(e) => Some(Err(self.fail(e))),
        }
    }
}

impl Drop for RowIter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close row iterator: {}", e);
        }
    }
}

/// Run `f`, reporting a panic inside it as an execution error
fn guarded<T>(action: &str, f: impl FnOnce() -> QueryResult<T>) -> QueryResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(QueryError::Execution(format!(
            "panic while {}: {}",
            action,
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
