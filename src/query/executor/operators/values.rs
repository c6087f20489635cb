// Values operator - emits a fixed list of rows
//
// Used as the source of a SELECT without FROM, which sees a single empty row.

use std::sync::Arc;

use super::Operator;
use crate::query::executor::context::ExecutionContext;
use crate::query::executor::result::{QueryResult, Row};

#[derive(Debug, Default)]
pub struct ValuesOperator {
    rows: Vec<Row>,
    position: usize,
}

impl ValuesOperator {
    pub fn new(rows: Vec<Row>) -> Self {
        ValuesOperator { rows, position: 0 }
    }

    /// One empty row
    pub fn single_empty_row() -> Self {
        ValuesOperator::new(vec![Row::default()])
    }
}

impl Operator for ValuesOperator {
    fn open(&mut self, _ctx: &Arc<ExecutionContext>) -> QueryResult<()> {
        self.position = 0;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        let row = self.rows.get(self.position).cloned();
        if row.is_some() {
            self.position += 1;
        }
        Ok(row)
    }

    fn close(&mut self) -> QueryResult<()> {
        self.position = self.rows.len();
        Ok(())
    }
}
