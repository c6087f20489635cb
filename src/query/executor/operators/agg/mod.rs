// Aggregation
//
// Aggregate functions folded over the values of one group, and the hash
// grouping operator that builds the groups.

pub mod hash;

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::query::executor::result::{QueryError, QueryResult};
use crate::query::executor::value::{ArithmeticOp, SqlValue};
use crate::query::parser::ast::AggregateFunction;

pub use self::hash::HashAggregateOperator;

/// Running state of one aggregate
#[derive(Debug, Clone)]
struct Accumulator {
    func: AggregateFunction,
    /// Values seen, NULLs included
    rows: usize,
    /// Non-null values seen
    count: usize,
    sum: SqlValue,
    /// Sum of squares for the standard deviation
    squares: f64,
    best: Option<SqlValue>,
    parts: Vec<String>,
}

impl Accumulator {
    fn new(func: AggregateFunction) -> Self {
        Accumulator {
            func,
            rows: 0,
            count: 0,
            sum: SqlValue::Int(0),
            squares: 0.0,
            best: None,
            parts: Vec::new(),
        }
    }

    fn update(&mut self, value: SqlValue) -> QueryResult<()> {
        self.rows += 1;
        if value.is_null() {
            return Ok(());
        }
        self.count += 1;

        match self.func {
            AggregateFunction::Count => {}
            AggregateFunction::Sum | AggregateFunction::Avg => {
                self.sum = self.sum.arithmetic(ArithmeticOp::Add, &value)?;
            }
            AggregateFunction::StdDev => {
                let x = value.to_f64().ok_or_else(|| {
                    QueryError::TypeMismatch(format!("std over {} value", value.sql_type()))
                })?;
                self.sum = self.sum.arithmetic(ArithmeticOp::Add, &SqlValue::Float(x))?;
                self.squares += x * x;
            }
            AggregateFunction::Min => self.keep_if(value, Ordering::Less)?,
            AggregateFunction::Max => self.keep_if(value, Ordering::Greater)?,
            AggregateFunction::GroupConcat => self.parts.push(value.to_string()),
        }
        Ok(())
    }

    fn keep_if(&mut self, value: SqlValue, wanted: Ordering) -> QueryResult<()> {
        let replace = match &self.best {
            None => true,
            Some(best) => value.compare(best)? == wanted,
        };
        if replace {
            self.best = Some(value);
        }
        Ok(())
    }

    fn result(self) -> QueryResult<SqlValue> {
        let value = match self.func {
            AggregateFunction::Count => SqlValue::Int(self.count as i64),
            AggregateFunction::Sum if self.rows == 0 => SqlValue::Null,
            AggregateFunction::Sum => self.sum,
            AggregateFunction::Avg | AggregateFunction::StdDev if self.count == 0 => SqlValue::Null,
            AggregateFunction::Avg => {
                let sum = self.sum.to_f64().ok_or(QueryError::NumericOverflow)?;
                SqlValue::Float(sum / self.count as f64)
            }
            AggregateFunction::StdDev => {
                let n = self.count as f64;
                let mean = self.sum.to_f64().ok_or(QueryError::NumericOverflow)? / n;
                SqlValue::Float((self.squares / n - mean * mean).max(0.0).sqrt())
            }
            AggregateFunction::Min | AggregateFunction::Max => self.best.unwrap_or(SqlValue::Null),
            AggregateFunction::GroupConcat if self.parts.is_empty() => SqlValue::Null,
            AggregateFunction::GroupConcat => SqlValue::Str(self.parts.join(",")),
        };
        Ok(value)
    }
}

/// Fold the per-row values of one group into the aggregate's result.
///
/// With `distinct`, values are deduplicated by SQL equality: numerically
/// equal values of different types (`1` and `1.0`) count once, as do NULL
/// and an absent field.
pub fn aggregate(func: AggregateFunction, distinct: bool, values: Vec<SqlValue>) -> QueryResult<SqlValue> {
    let mut accumulator = Accumulator::new(func);
    let mut seen = HashSet::new();
    for value in values {
        if distinct && !seen.insert(value.clone()) {
            continue;
        }
        accumulator.update(value)?;
    }
    accumulator.result()
}
