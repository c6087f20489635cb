// Filter Pushdown
//
// Renders WHERE conjuncts sitting directly above a collection scan into the
// scan's filter document. Conjuncts that cannot be expressed as a filter
// document stay behind in an in-memory Filter node.

use bson::{doc, Bson, Document};
use log::debug;
use thiserror::Error;

use crate::catalog::{Column, SqlType, Table};
use crate::common::config::EngineConfig;
use crate::query::executor::value::SqlValue;
use crate::query::planner::expression::{CompareOp, LogicalOp, SqlExpr};
use crate::query::planner::logical::LogicalPlan;

/// A condition with no filter-document equivalent. Handled inside this
/// module by keeping the condition in memory.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("untransformable condition: {0}")]
pub struct Untransformable(String);

type RenderResult = Result<Document, Untransformable>;

/// Attach `predicate` above `input`, moving what can be rendered into the
/// filter document of a scan
pub fn push_filter(input: LogicalPlan, predicate: SqlExpr, config: &EngineConfig) -> LogicalPlan {
    match input {
        LogicalPlan::Scan {
            alias,
            database,
            table,
            columns,
            filter: None,
        } if config.pushdown => {
            let renderer = FilterRenderer::new(&alias, &table);
            let mut rendered = Vec::new();
            let mut residual = Vec::new();
            for conjunct in split_conjuncts(predicate) {
                match renderer.render(&conjunct, false) {
                    Ok(document) => rendered.push(document),
                    Err(reason) => {
                        debug!("Evaluating {} in memory: {}", conjunct, reason);
                        residual.push(conjunct);
                    }
                }
            }

            let filter = match rendered.len() {
                0 => None,
                1 => rendered.pop(),
                _ => Some(doc! { "$and": rendered }),
            };
            if let Some(filter) = &filter {
                debug!("Pushing filter {} into scan of {}", filter, alias);
            }

            let scan = LogicalPlan::Scan {
                alias,
                database,
                table,
                columns,
                filter,
            };
            match conjoin(residual) {
                Some(predicate) => LogicalPlan::Filter {
                    input: Box::new(scan),
                    predicate,
                },
                None => scan,
            }
        }
        input => LogicalPlan::Filter {
            input: Box::new(input),
            predicate,
        },
    }
}

/// Split a predicate at its top-level ANDs
pub fn split_conjuncts(predicate: SqlExpr) -> Vec<SqlExpr> {
    match predicate {
        SqlExpr::Logical {
            left,
            op: LogicalOp::And,
            right,
        } => {
            let mut conjuncts = split_conjuncts(*left);
            conjuncts.extend(split_conjuncts(*right));
            conjuncts
        }
        other => vec![other],
    }
}

fn conjoin(conjuncts: Vec<SqlExpr>) -> Option<SqlExpr> {
    conjuncts.into_iter().reduce(SqlExpr::and)
}

/// Renders conditions over the columns of one scanned table
pub struct FilterRenderer<'a> {
    alias: &'a str,
    table: &'a Table,
}

impl<'a> FilterRenderer<'a> {
    pub fn new(alias: &'a str, table: &'a Table) -> Self {
        FilterRenderer { alias, table }
    }

    /// Render `expr`, or its negation when `negated` is set. Negations are
    /// pushed down to the leaves so that NULL fields never match.
    pub fn render(&self, expr: &SqlExpr, negated: bool) -> RenderResult {
        match expr {
            SqlExpr::Logical { left, op, right } => {
                let (left, right) = (self.render(left, negated)?, self.render(right, negated)?);
                match (op, negated) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(doc! { "$and": [left, right] }),
                    (LogicalOp::Or, false) | (LogicalOp::And, true) => Ok(doc! { "$or": [left, right] }),
                    (LogicalOp::Xor, _) => Err(untransformable(expr)),
                }
            }
            SqlExpr::Not(inner) => self.render(inner, !negated),
            SqlExpr::Comparison { left, op, right } => {
                let (column, value, op) = match (self.column(left), self.column(right)) {
                    (Some(column), None) => (column, constant(right), *op),
                    (None, Some(column)) => (column, constant(left), op.mirror()),
                    _ => return Err(untransformable(expr)),
                };
                let value = self.value_for(column, value.ok_or_else(|| untransformable(expr))?)?;
                let op = if negated { op.negate() } else { op };
                let condition = match op {
                    CompareOp::Eq => doc! { "$eq": value },
                    CompareOp::NotEq => doc! { "$nin": [value, Bson::Null] },
                    CompareOp::Lt => doc! { "$lt": value },
                    CompareOp::LtEq => doc! { "$lte": value },
                    CompareOp::Gt => doc! { "$gt": value },
                    CompareOp::GtEq => doc! { "$gte": value },
                };
                Ok(field_condition(column, condition))
            }
            SqlExpr::IsNull { expr: inner, negated: not_null } => {
                let column = self.column(inner).ok_or_else(|| untransformable(expr))?;
                let condition = if *not_null == negated {
                    doc! { "$eq": Bson::Null }
                } else {
                    doc! { "$ne": Bson::Null }
                };
                Ok(field_condition(column, condition))
            }
            SqlExpr::InList { expr: inner, list, negated: not_in } => {
                let column = self.column(inner).ok_or_else(|| untransformable(expr))?;
                let mut values = list
                    .iter()
                    .map(|item| {
                        let value = constant(item).ok_or_else(|| untransformable(item))?;
                        self.value_for(column, value)
                    })
                    .collect::<Result<Vec<Bson>, _>>()?;
                let condition = if *not_in == negated {
                    doc! { "$in": values }
                } else {
                    values.push(Bson::Null);
                    doc! { "$nin": values }
                };
                Ok(field_condition(column, condition))
            }
            SqlExpr::Between {
                expr: inner,
                low,
                high,
                negated: not_between,
            } => {
                let column = self.column(inner).ok_or_else(|| untransformable(expr))?;
                let low = self.value_for(column, constant(low).ok_or_else(|| untransformable(low))?)?;
                let high = self.value_for(column, constant(high).ok_or_else(|| untransformable(high))?)?;
                if *not_between == negated {
                    Ok(field_condition(column, doc! { "$gte": low, "$lte": high }))
                } else {
                    Ok(doc! { "$or": [
                        field_condition(column, doc! { "$lt": low }),
                        field_condition(column, doc! { "$gt": high })
                    ] })
                }
            }
            // LIKE matches the text form of any stored value; `$regex` only
            // matches stored strings
            SqlExpr::Like { .. } => Err(untransformable(expr)),
            other => Err(untransformable(other)),
        }
    }

    /// The scanned column an expression refers to directly
    fn column(&self, expr: &SqlExpr) -> Option<&'a Column> {
        match expr {
            SqlExpr::Column { table, name, depth: 0 } if table.eq_ignore_ascii_case(self.alias) => {
                self.table.column(name)
            }
            _ => None,
        }
    }

    /// Filter value for comparing `value` with `column`
    fn value_for(&self, column: &Column, value: SqlValue) -> Result<Bson, Untransformable> {
        let sql_type = column.sql_type();
        if value.is_null() {
            return Err(Untransformable(format!("NULL compared with {}", column.name())));
        }
        // Scans coerce these from other stored forms (strings, datetimes
        // with a time of day), which the store compares as stored
        if matches!(sql_type, SqlType::Date | SqlType::Timestamp | SqlType::ObjectId) {
            return Err(Untransformable(format!("{} column {}", sql_type, column.name())));
        }
        let value = value.coerce_to(sql_type);
        let compatible = match (&value, sql_type) {
            (SqlValue::Uint(u), _) if *u > i64::MAX as u64 => false,
            (v, t) if t.is_numeric() => v.is_numeric(),
            (SqlValue::Str(_), SqlType::Varchar) => true,
            (SqlValue::Bool(_), SqlType::Boolean) => true,
            (SqlValue::ObjectId(_), SqlType::ObjectId) => true,
            (SqlValue::Date(_) | SqlValue::Timestamp(_), SqlType::Timestamp) => true,
            _ => false,
        };
        if !compatible {
            return Err(Untransformable(format!(
                "{} value for {} column {}",
                value.sql_type(),
                sql_type,
                column.name()
            )));
        }
        value
            .to_bson()
            .ok_or_else(|| Untransformable(format!("no document form for {}", value)))
    }
}

fn field_condition(column: &Column, condition: Document) -> Document {
    let mut document = Document::new();
    document.insert(column.field(), condition);
    document
}

/// Fold an expression built only from literals
fn constant(expr: &SqlExpr) -> Option<SqlValue> {
    match expr {
        SqlExpr::Literal(value) => Some(value.clone()),
        SqlExpr::Negate(inner) => constant(inner)?.negate().ok(),
        SqlExpr::Arithmetic { left, op, right } => constant(left)?.arithmetic(*op, &constant(right)?).ok(),
        _ => None,
    }
}

fn untransformable(expr: &SqlExpr) -> Untransformable {
    Untransformable(expr.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::executor::result::ColumnDescriptor;
    use crate::query::executor::value::ArithmeticOp;

    fn table() -> Table {
        Table::new(
            "bar",
            vec![
                Column::new("a", SqlType::Int),
                Column::new("b", SqlType::Varchar).with_field("info.b"),
                Column::new("d", SqlType::Date),
                Column::new("ts", SqlType::Timestamp),
                Column::new("o", SqlType::ObjectId),
            ],
        )
    }

    fn scan() -> LogicalPlan {
        LogicalPlan::Scan {
            alias: "bar".to_string(),
            database: "test".to_string(),
            table: table(),
            columns: vec![ColumnDescriptor::new("bar", "a", SqlType::Int)],
            filter: None,
        }
    }

    fn col(name: &str) -> Box<SqlExpr> {
        Box::new(SqlExpr::column("bar", name))
    }

    fn lit(value: impl Into<SqlValue>) -> Box<SqlExpr> {
        Box::new(SqlExpr::Literal(value.into()))
    }

    fn cmp(left: Box<SqlExpr>, op: CompareOp, right: Box<SqlExpr>) -> SqlExpr {
        SqlExpr::Comparison { left, op, right }
    }

    fn render(expr: &SqlExpr) -> RenderResult {
        let table = table();
        FilterRenderer::new("bar", &table).render(expr, false)
    }

    #[test]
    fn test_literal_on_left_is_mirrored() {
        let expr = cmp(lit(5_i64), CompareOp::Lt, col("a"));
        assert_eq!(render(&expr).unwrap(), doc! { "a": { "$gt": 5_i64 } });
    }

    #[test]
    fn test_field_paths_and_not_equal() {
        let expr = cmp(col("b"), CompareOp::NotEq, lit("x"));
        assert_eq!(render(&expr).unwrap(), doc! { "info.b": { "$nin": ["x", Bson::Null] } });
    }

    #[test]
    fn test_negation_reaches_leaves() {
        let inner = SqlExpr::Logical {
            left: Box::new(cmp(col("a"), CompareOp::Gt, lit(1_i64))),
            op: LogicalOp::Or,
            right: Box::new(SqlExpr::IsNull { expr: col("b"), negated: false }),
        };
        let expr = SqlExpr::Not(Box::new(inner));
        assert_eq!(
            render(&expr).unwrap(),
            doc! { "$and": [ { "a": { "$lte": 1_i64 } }, { "info.b": { "$ne": Bson::Null } } ] }
        );
    }

    #[test]
    fn test_in_and_between() {
        let not_in = SqlExpr::InList {
            expr: col("a"),
            list: vec![SqlExpr::Literal(SqlValue::Int(1)), SqlExpr::Literal(SqlValue::Int(2))],
            negated: true,
        };
        assert_eq!(render(&not_in).unwrap(), doc! { "a": { "$nin": [1_i64, 2_i64, Bson::Null] } });

        let between = SqlExpr::Between {
            expr: col("a"),
            low: lit(1_i64),
            high: Box::new(SqlExpr::Arithmetic {
                left: lit(2_i64),
                op: ArithmeticOp::Multiply,
                right: lit(3_i64),
            }),
            negated: true,
        };
        assert_eq!(
            render(&between).unwrap(),
            doc! { "$or": [ { "a": { "$lt": 1_i64 } }, { "a": { "$gt": 6_i64 } } ] }
        );
    }

    #[test]
    fn test_untransformable_conditions() {
        assert!(render(&cmp(col("a"), CompareOp::Eq, col("a"))).is_err());
        assert!(render(&cmp(col("a"), CompareOp::Eq, Box::new(SqlExpr::Literal(SqlValue::Null)))).is_err());
        assert!(render(&cmp(col("a"), CompareOp::Eq, lit("x"))).is_err());
        assert!(render(&cmp(col("d"), CompareOp::Eq, lit("2020-01-01"))).is_err());
        let not_like = SqlExpr::Like {
            expr: col("b"),
            pattern: lit("a%"),
            escape: None,
            negated: true,
        };
        assert!(render(&not_like).is_err());
        let null_in_list = SqlExpr::InList {
            expr: col("a"),
            list: vec![SqlExpr::Literal(SqlValue::Null)],
            negated: false,
        };
        assert!(render(&null_in_list).is_err());
    }

    #[test]
    fn test_scan_coerced_columns_stay_in_memory() {
        assert!(render(&cmp(col("ts"), CompareOp::Gt, lit("2020-01-01 00:00:00"))).is_err());
        assert!(render(&cmp(col("o"), CompareOp::Eq, lit("5f1d7e1c2a3b4c5d6e7f8091"))).is_err());
        let like = SqlExpr::Like {
            expr: col("b"),
            pattern: lit("a_c%"),
            escape: None,
            negated: false,
        };
        assert!(render(&like).is_err());
        let in_list = SqlExpr::InList {
            expr: col("ts"),
            list: vec![SqlExpr::Literal(SqlValue::from("2020-01-01 00:00:00"))],
            negated: false,
        };
        assert!(render(&in_list).is_err());
    }

    #[test]
    fn test_push_filter_splits_conjuncts() {
        let predicate = SqlExpr::and(
            cmp(col("a"), CompareOp::Eq, lit(1_i64)),
            cmp(col("a"), CompareOp::Eq, col("a")),
        );
        let plan = push_filter(scan(), predicate, &EngineConfig::default());
        match plan {
            LogicalPlan::Filter { input, predicate } => {
                assert_eq!(predicate.to_string(), "bar.a = bar.a");
                assert!(matches!(*input, LogicalPlan::Scan { filter: Some(ref f), .. } if *f == doc! { "a": { "$eq": 1_i64 } }));
            }
            other => panic!("unexpected plan {}", other),
        }
    }

    #[test]
    fn test_pushdown_disabled() {
        let config = EngineConfig {
            pushdown: false,
            ..EngineConfig::default()
        };
        let plan = push_filter(scan(), cmp(col("a"), CompareOp::Eq, lit(1_i64)), &config);
        assert!(matches!(plan, LogicalPlan::Filter { ref input, .. } if matches!(**input, LogicalPlan::Scan { filter: None, .. })));
    }
}
