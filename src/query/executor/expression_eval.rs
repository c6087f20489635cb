// Expression Evaluation
//
// Evaluates `SqlExpr` trees against a row with SQL three-valued logic.
// Subqueries are planned once and executed per outer row with a correlated
// execution context.

use std::cmp::Ordering;
use std::sync::Arc;

use regex::Regex;

use crate::query::executor::context::ExecutionContext;
use crate::query::executor::operators::agg::aggregate;
use crate::query::executor::operators::{Operator, OperatorNode};
use crate::query::executor::result::{QueryError, QueryResult, Row};
use crate::query::executor::value::SqlValue;
use crate::query::planner::expression::{LogicalOp, SqlExpr};
use crate::query::planner::logical::LogicalPlan;
use crate::query::planner::operator_builder::build_operator;

/// Evaluate an expression for one row
pub fn evaluate(expr: &SqlExpr, row: &Row, ctx: &Arc<ExecutionContext>) -> QueryResult<SqlValue> {
    match expr {
        SqlExpr::Literal(value) => Ok(value.clone()),
        SqlExpr::Column { table, name, depth } => {
            let source = if *depth == 0 {
                row
            } else {
                ctx.outer_row(*depth)
                    .ok_or_else(|| QueryError::Execution(format!("no outer row for {}.{}", table, name)))?
            };
            match source.get(table, name) {
                Some(value) => Ok(value.clone()),
                // the single row of an empty group
                None if source.is_empty() => Ok(SqlValue::Null),
                None => Err(QueryError::Execution(format!("column {}.{} is not available", table, name))),
            }
        }
        SqlExpr::Negate(inner) => evaluate(inner, row, ctx)?.negate(),
        SqlExpr::Not(inner) => Ok(truth(evaluate(inner, row, ctx)?.to_bool()?.map(|b| !b))),
        SqlExpr::Arithmetic { left, op, right } => {
            let left = evaluate(left, row, ctx)?;
            let right = evaluate(right, row, ctx)?;
            left.arithmetic(*op, &right)
        }
        SqlExpr::Comparison { left, op, right } => {
            let left = evaluate(left, row, ctx)?;
            let right = evaluate(right, row, ctx)?;
            Ok(truth(left.sql_compare(&right)?.map(|ord| op.holds(ord))))
        }
        SqlExpr::Logical { left, op, right } => evaluate_logical(left, *op, right, row, ctx),
        SqlExpr::IsNull { expr, negated } => Ok(SqlValue::Bool(evaluate(expr, row, ctx)?.is_null() != *negated)),
        SqlExpr::IsBool { expr, value, negated } => {
            let actual = evaluate(expr, row, ctx)?.to_bool()?;
            Ok(SqlValue::Bool((actual == *value) != *negated))
        }
        SqlExpr::Between { expr, low, high, negated } => {
            let value = evaluate(expr, row, ctx)?;
            let above = value
                .sql_compare(&evaluate(low, row, ctx)?)?
                .map(|ord| ord != Ordering::Less);
            let below = value
                .sql_compare(&evaluate(high, row, ctx)?)?
                .map(|ord| ord != Ordering::Greater);
            Ok(truth(negate_if(kleene_and(above, below), *negated)))
        }
        SqlExpr::InList { expr, list, negated } => {
            let value = evaluate(expr, row, ctx)?;
            let found = membership(&value, list.iter().map(|item| evaluate(item, row, ctx)))?;
            Ok(truth(negate_if(found, *negated)))
        }
        SqlExpr::InSubquery { expr, plan, negated } => {
            let value = evaluate(expr, row, ctx)?;
            let rows = run_subquery(plan, row, ctx, None)?;
            let found = membership(&value, rows.into_iter().map(|r| Ok(row_value(r))))?;
            Ok(truth(negate_if(found, *negated)))
        }
        SqlExpr::Exists { plan, negated } => {
            let rows = run_subquery(plan, row, ctx, Some(1))?;
            Ok(SqlValue::Bool(rows.is_empty() == *negated))
        }
        SqlExpr::ScalarSubquery(plan) => {
            let mut rows = run_subquery(plan, row, ctx, Some(2))?;
            match rows.len() {
                0 => Ok(SqlValue::Null),
                1 => Ok(rows.pop().map(row_value).unwrap_or(SqlValue::Null)),
                _ => Err(QueryError::Execution("subquery returns more than 1 row".to_string())),
            }
        }
        SqlExpr::Like { expr, pattern, escape, negated } => {
            let value = evaluate(expr, row, ctx)?;
            let pattern = evaluate(pattern, row, ctx)?;
            let escape = match escape {
                None => Some('\\'),
                Some(escape) => escape_char(&evaluate(escape, row, ctx)?)?,
            };
            if value.is_null() || pattern.is_null() {
                return Ok(SqlValue::Null);
            }
            let regex = Regex::new(&like_to_regex(&pattern.to_string(), escape))
                .map_err(|e| QueryError::Execution(format!("invalid LIKE pattern: {}", e)))?;
            Ok(SqlValue::Bool(regex.is_match(&value.to_string()) != *negated))
        }
        SqlExpr::Case { operand, when_then, else_result } => {
            let operand = operand.as_ref().map(|o| evaluate(o, row, ctx)).transpose()?;
            for (when, then) in when_then {
                let when = evaluate(when, row, ctx)?;
                let hit = match &operand {
                    Some(operand) => operand.sql_compare(&when)? == Some(Ordering::Equal),
                    None => when.to_bool()? == Some(true),
                };
                if hit {
                    return evaluate(then, row, ctx);
                }
            }
            match else_result {
                Some(else_result) => evaluate(else_result, row, ctx),
                None => Ok(SqlValue::Null),
            }
        }
        SqlExpr::Tuple(items) => Ok(SqlValue::Tuple(
            items.iter().map(|item| evaluate(item, row, ctx)).collect::<QueryResult<_>>()?,
        )),
        SqlExpr::Function { func, args } => {
            let args = args.iter().map(|arg| evaluate(arg, row, ctx)).collect::<QueryResult<Vec<_>>>()?;
            func.evaluate(&args, ctx)
        }
        SqlExpr::Aggregate { func, arg, distinct } => {
            let rows = match &row.group {
                Some(rows) => rows.as_slice(),
                None => std::slice::from_ref(row),
            };
            let values = match arg {
                None => vec![SqlValue::Int(1); rows.len()],
                Some(arg) => rows.iter().map(|r| evaluate(arg, r, ctx)).collect::<QueryResult<_>>()?,
            };
            aggregate(*func, *distinct, values)
        }
    }
}

/// Evaluate a predicate; only an exact TRUE keeps the row
pub fn evaluate_predicate(expr: &SqlExpr, row: &Row, ctx: &Arc<ExecutionContext>) -> QueryResult<bool> {
    Ok(evaluate(expr, row, ctx)?.to_bool()? == Some(true))
}

/// Translate a LIKE pattern into an anchored regular expression
pub fn like_to_regex(pattern: &str, escape: Option<char>) -> String {
    let mut regex = String::from("(?s)^");
    let mut chars = pattern.chars();
    let mut buf = [0u8; 4];
    while let Some(c) = chars.next() {
        if Some(c) == escape {
            let literal = chars.next().unwrap_or(c);
            regex.push_str(&regex::escape(literal.encode_utf8(&mut buf)));
            continue;
        }
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            other => regex.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    regex.push('$');
    regex
}

fn evaluate_logical(
    left: &SqlExpr,
    op: LogicalOp,
    right: &SqlExpr,
    row: &Row,
    ctx: &Arc<ExecutionContext>,
) -> QueryResult<SqlValue> {
    let left = evaluate(left, row, ctx)?.to_bool()?;
    match (op, left) {
        (LogicalOp::And, Some(false)) => return Ok(SqlValue::Bool(false)),
        (LogicalOp::Or, Some(true)) => return Ok(SqlValue::Bool(true)),
        _ => {}
    }
    let right = evaluate(right, row, ctx)?.to_bool()?;
    let result = match op {
        LogicalOp::And => kleene_and(left, right),
        LogicalOp::Or => match (left, right) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        LogicalOp::Xor => match (left, right) {
            (Some(l), Some(r)) => Some(l != r),
            _ => None,
        },
    };
    Ok(truth(result))
}

fn kleene_and(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn negate_if(value: Option<bool>, negated: bool) -> Option<bool> {
    value.map(|b| b != negated)
}

fn truth(value: Option<bool>) -> SqlValue {
    match value {
        Some(b) => SqlValue::Bool(b),
        None => SqlValue::Null,
    }
}

/// IN semantics: TRUE on a match, UNKNOWN when a comparison was unknown
fn membership(
    value: &SqlValue,
    candidates: impl Iterator<Item = QueryResult<SqlValue>>,
) -> QueryResult<Option<bool>> {
    let mut unknown = false;
    for candidate in candidates {
        match value.sql_compare(&candidate?)? {
            Some(Ordering::Equal) => return Ok(Some(true)),
            None => unknown = true,
            Some(_) => {}
        }
    }
    Ok(if unknown { None } else { Some(false) })
}

fn escape_char(value: &SqlValue) -> QueryResult<Option<char>> {
    let text = value.to_text().unwrap_or_default();
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok(None),
        (Some(c), None) => Ok(Some(c)),
        _ => Err(QueryError::WrongArgumentCount("ESCAPE".to_string())),
    }
}

/// Single value of a one-column row, a tuple otherwise
fn row_value(row: Row) -> SqlValue {
    let mut values = row.into_values();
    if values.len() == 1 {
        values.pop().unwrap_or(SqlValue::Null)
    } else {
        SqlValue::Tuple(values)
    }
}

/// Run a subquery on behalf of `row`, stopping after `limit` rows
fn run_subquery(
    plan: &LogicalPlan,
    row: &Row,
    ctx: &Arc<ExecutionContext>,
    limit: Option<usize>,
) -> QueryResult<Vec<Row>> {
    let child = ctx.correlated(row);
    let mut operator = build_operator(plan)?;
    if let Err(e) = operator.open(&child) {
        let _ = operator.close();
        return Err(e);
    }
    let drained = drain(&mut operator, limit);
    let closed = operator.close();
    let rows = drained?;
    closed?;
    Ok(rows)
}

fn drain(operator: &mut OperatorNode, limit: Option<usize>) -> QueryResult<Vec<Row>> {
    let mut rows = Vec::new();
    while limit.map_or(true, |limit| rows.len() < limit) {
        match operator.next()? {
            Some(row) => rows.push(row),
            None => break,
        }
    }
    Ok(rows)
}
