// Evaluable Expressions
//
// `SqlExpr` is the executable form of a resolved AST expression. Literals
// are converted to `SqlValue`s, functions are bound to their
// implementations and subqueries carry their own logical plan.

use std::cmp::Ordering;
use std::fmt;

use crate::catalog::SqlType;
use crate::query::executor::functions::ScalarFunction;
use crate::query::executor::result::{ColumnDescriptor, QueryError, QueryResult};
use crate::query::executor::value::{ArithmeticOp, SqlValue};
use crate::query::parser::ast::{AggregateArg, AggregateFunction, Expression, Operator, UnaryOperator, Value};
use crate::query::planner::Planner;
use crate::query::planner::logical::LogicalPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    fn from_operator(op: Operator) -> Option<Self> {
        match op {
            Operator::Equals => Some(CompareOp::Eq),
            Operator::NotEquals => Some(CompareOp::NotEq),
            Operator::LessThan => Some(CompareOp::Lt),
            Operator::LessEquals => Some(CompareOp::LtEq),
            Operator::GreaterThan => Some(CompareOp::Gt),
            Operator::GreaterEquals => Some(CompareOp::GtEq),
            _ => None,
        }
    }

    /// Operator with operands swapped
    pub fn mirror(&self) -> Self {
        match self {
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::LtEq => CompareOp::GtEq,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::GtEq => CompareOp::LtEq,
            other => *other,
        }
    }

    /// Logical complement for non-null operands
    pub fn negate(&self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::NotEq,
            CompareOp::NotEq => CompareOp::Eq,
            CompareOp::Lt => CompareOp::GtEq,
            CompareOp::LtEq => CompareOp::Gt,
            CompareOp::Gt => CompareOp::LtEq,
            CompareOp::GtEq => CompareOp::Lt,
        }
    }

    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::LtEq => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::GtEq => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Xor,
}

/// Executable expression
#[derive(Debug, Clone)]
pub enum SqlExpr {
    Literal(SqlValue),
    /// Column of a table alias; `depth` counts enclosing queries
    Column { table: String, name: String, depth: usize },
    Negate(Box<SqlExpr>),
    Not(Box<SqlExpr>),
    Arithmetic { left: Box<SqlExpr>, op: ArithmeticOp, right: Box<SqlExpr> },
    Comparison { left: Box<SqlExpr>, op: CompareOp, right: Box<SqlExpr> },
    Logical { left: Box<SqlExpr>, op: LogicalOp, right: Box<SqlExpr> },
    IsNull { expr: Box<SqlExpr>, negated: bool },
    IsBool { expr: Box<SqlExpr>, value: Option<bool>, negated: bool },
    Between { expr: Box<SqlExpr>, low: Box<SqlExpr>, high: Box<SqlExpr>, negated: bool },
    InList { expr: Box<SqlExpr>, list: Vec<SqlExpr>, negated: bool },
    InSubquery { expr: Box<SqlExpr>, plan: Box<LogicalPlan>, negated: bool },
    Exists { plan: Box<LogicalPlan>, negated: bool },
    ScalarSubquery(Box<LogicalPlan>),
    Like { expr: Box<SqlExpr>, pattern: Box<SqlExpr>, escape: Option<Box<SqlExpr>>, negated: bool },
    Case { operand: Option<Box<SqlExpr>>, when_then: Vec<(SqlExpr, SqlExpr)>, else_result: Option<Box<SqlExpr>> },
    Tuple(Vec<SqlExpr>),
    Function { func: ScalarFunction, args: Vec<SqlExpr> },
    /// Aggregate over the rows of the current group; `arg` of `None` is `*`
    Aggregate { func: AggregateFunction, arg: Option<Box<SqlExpr>>, distinct: bool },
}

impl SqlExpr {
    pub fn column(table: &str, name: &str) -> Self {
        SqlExpr::Column {
            table: table.to_string(),
            name: name.to_string(),
            depth: 0,
        }
    }

    pub fn and(left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::Logical {
            left: Box::new(left),
            op: LogicalOp::And,
            right: Box::new(right),
        }
    }

    /// Declared type of the value this expression produces over `columns`
    pub fn result_type(&self, columns: &[ColumnDescriptor]) -> SqlType {
        match self {
            SqlExpr::Literal(v) => v.sql_type(),
            SqlExpr::Column { table, name, .. } => columns
                .iter()
                .find(|c| c.table.eq_ignore_ascii_case(table) && c.name.eq_ignore_ascii_case(name))
                .map(|c| c.sql_type)
                .unwrap_or(SqlType::Null),
            SqlExpr::Negate(inner) => inner.result_type(columns),
            SqlExpr::Arithmetic { left, op, right } => {
                let (l, r) = (left.result_type(columns), right.result_type(columns));
                if l == SqlType::Float || r == SqlType::Float {
                    SqlType::Float
                } else if l == SqlType::Decimal || r == SqlType::Decimal || *op == ArithmeticOp::Divide {
                    SqlType::Decimal
                } else if l == SqlType::Null {
                    r
                } else {
                    l
                }
            }
            SqlExpr::ScalarSubquery(plan) => plan.columns().first().map(|c| c.sql_type).unwrap_or(SqlType::Null),
            SqlExpr::Case { when_then, else_result, .. } => when_then
                .iter()
                .map(|(_, then)| then)
                .chain(else_result.iter().map(|e| e.as_ref()))
                .map(|e| e.result_type(columns))
                .find(|t| *t != SqlType::Null)
                .unwrap_or(SqlType::Null),
            SqlExpr::Tuple(_) => SqlType::Null,
            SqlExpr::Function { func, args } => {
                let types: Vec<SqlType> = args.iter().map(|a| a.result_type(columns)).collect();
                func.result_type(&types)
            }
            SqlExpr::Aggregate { func, arg, .. } => {
                let arg_type = arg.as_ref().map(|a| a.result_type(columns)).unwrap_or(SqlType::Int);
                match func {
                    AggregateFunction::Count => SqlType::Int,
                    // Sums start from integer zero and widen as the values do
                    AggregateFunction::Sum => match arg_type {
                        SqlType::Float | SqlType::Decimal => arg_type,
                        _ => SqlType::Int,
                    },
                    AggregateFunction::Avg | AggregateFunction::StdDev => SqlType::Float,
                    AggregateFunction::Min | AggregateFunction::Max => arg_type,
                    AggregateFunction::GroupConcat => SqlType::Varchar,
                }
            }
            _ => SqlType::Boolean,
        }
    }

    /// True when an aggregate appears outside nested subqueries
    pub fn contains_aggregate(&self) -> bool {
        match self {
            SqlExpr::Aggregate { .. } => true,
            SqlExpr::Literal(_)
            | SqlExpr::Column { .. }
            | SqlExpr::Exists { .. }
            | SqlExpr::ScalarSubquery(_) => false,
            SqlExpr::Negate(e) | SqlExpr::Not(e) | SqlExpr::IsNull { expr: e, .. } | SqlExpr::IsBool { expr: e, .. } => {
                e.contains_aggregate()
            }
            SqlExpr::InSubquery { expr, .. } => expr.contains_aggregate(),
            SqlExpr::Arithmetic { left, right, .. }
            | SqlExpr::Comparison { left, right, .. }
            | SqlExpr::Logical { left, right, .. } => left.contains_aggregate() || right.contains_aggregate(),
            SqlExpr::Between { expr, low, high, .. } => {
                expr.contains_aggregate() || low.contains_aggregate() || high.contains_aggregate()
            }
            SqlExpr::InList { expr, list, .. } => expr.contains_aggregate() || list.iter().any(SqlExpr::contains_aggregate),
            SqlExpr::Like { expr, pattern, escape, .. } => {
                expr.contains_aggregate()
                    || pattern.contains_aggregate()
                    || escape.as_ref().is_some_and(|e| e.contains_aggregate())
            }
            SqlExpr::Case { operand, when_then, else_result } => {
                operand.as_ref().is_some_and(|e| e.contains_aggregate())
                    || when_then.iter().any(|(w, t)| w.contains_aggregate() || t.contains_aggregate())
                    || else_result.as_ref().is_some_and(|e| e.contains_aggregate())
            }
            SqlExpr::Tuple(items) | SqlExpr::Function { args: items, .. } => items.iter().any(SqlExpr::contains_aggregate),
        }
    }
}

/// Convert a parsed literal
pub fn literal_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(*i),
        Value::Unsigned(u) => SqlValue::Uint(*u),
        Value::Decimal(d) => SqlValue::Decimal(*d),
        Value::Float(f) => SqlValue::Float(*f),
        Value::String(s) => SqlValue::Str(s.clone()),
        Value::Boolean(b) => SqlValue::Bool(*b),
        Value::Date(d) => SqlValue::Date(*d),
        Value::Timestamp(ts) => SqlValue::Timestamp(*ts),
    }
}

impl Planner<'_> {
    /// Build the executable form of a resolved expression
    pub fn build_expr(&self, expr: &Expression) -> QueryResult<SqlExpr> {
        let boxed = |e: &Expression| self.build_expr(e).map(Box::new);
        let built = match expr {
            Expression::Literal(v) => SqlExpr::Literal(literal_value(v)),
            Expression::Column(column) => {
                let table = column
                    .table
                    .clone()
                    .ok_or_else(|| QueryError::UnknownColumn(column.name.clone()))?;
                SqlExpr::Column {
                    table,
                    name: column.name.clone(),
                    depth: column.depth,
                }
            }
            Expression::BinaryOp { left, op, right } => {
                let (left, right) = (boxed(left)?, boxed(right)?);
                match op {
                    Operator::And => SqlExpr::Logical { left, op: LogicalOp::And, right },
                    Operator::Or => SqlExpr::Logical { left, op: LogicalOp::Or, right },
                    Operator::Xor => SqlExpr::Logical { left, op: LogicalOp::Xor, right },
                    Operator::Plus => SqlExpr::Arithmetic { left, op: ArithmeticOp::Add, right },
                    Operator::Minus => SqlExpr::Arithmetic { left, op: ArithmeticOp::Subtract, right },
                    Operator::Multiply => SqlExpr::Arithmetic { left, op: ArithmeticOp::Multiply, right },
                    Operator::Divide => SqlExpr::Arithmetic { left, op: ArithmeticOp::Divide, right },
                    Operator::IntDivide => SqlExpr::Arithmetic { left, op: ArithmeticOp::IntDivide, right },
                    Operator::Modulo => SqlExpr::Arithmetic { left, op: ArithmeticOp::Modulo, right },
                    comparison => {
                        let op = CompareOp::from_operator(*comparison)
                            .ok_or_else(|| QueryError::NotImplemented(format!("operator {}", comparison)))?;
                        SqlExpr::Comparison { left, op, right }
                    }
                }
            }
            Expression::UnaryOp { op, expr } => match op {
                UnaryOperator::Plus => self.build_expr(expr)?,
                UnaryOperator::Minus => SqlExpr::Negate(boxed(expr)?),
                UnaryOperator::Not => SqlExpr::Not(boxed(expr)?),
            },
            Expression::IsNull { expr, negated } => SqlExpr::IsNull {
                expr: boxed(expr)?,
                negated: *negated,
            },
            Expression::IsBool { expr, value, negated } => SqlExpr::IsBool {
                expr: boxed(expr)?,
                value: *value,
                negated: *negated,
            },
            Expression::Between { expr, low, high, negated } => SqlExpr::Between {
                expr: boxed(expr)?,
                low: boxed(low)?,
                high: boxed(high)?,
                negated: *negated,
            },
            Expression::InList { expr, list, negated } => SqlExpr::InList {
                expr: boxed(expr)?,
                list: list.iter().map(|e| self.build_expr(e)).collect::<QueryResult<_>>()?,
                negated: *negated,
            },
            Expression::InSubquery { expr, query, negated } => {
                let plan = self.plan(query)?;
                let expected = match expr.as_ref() {
                    Expression::Tuple(items) => items.len(),
                    _ => 1,
                };
                check_subquery_width(&plan, expected)?;
                SqlExpr::InSubquery {
                    expr: boxed(expr)?,
                    plan: Box::new(plan),
                    negated: *negated,
                }
            }
            Expression::Exists { query, negated } => SqlExpr::Exists {
                plan: Box::new(self.plan(query)?),
                negated: *negated,
            },
            Expression::Subquery(query) => SqlExpr::ScalarSubquery(Box::new(self.plan(query)?)),
            Expression::Like { expr, pattern, escape, negated } => SqlExpr::Like {
                expr: boxed(expr)?,
                pattern: boxed(pattern)?,
                escape: escape.as_deref().map(boxed).transpose()?,
                negated: *negated,
            },
            Expression::Function { name, args } => {
                let func = ScalarFunction::from_name(name).ok_or_else(|| QueryError::UnknownFunction(name.clone()))?;
                func.check_arity(args.len())?;
                SqlExpr::Function {
                    func,
                    args: args.iter().map(|e| self.build_expr(e)).collect::<QueryResult<_>>()?,
                }
            }
            Expression::Aggregate { function, arg, distinct } => {
                let arg = match arg {
                    AggregateArg::Star if *function == AggregateFunction::Count && !*distinct => None,
                    AggregateArg::Star => return Err(QueryError::WrongArgumentCount(function.name().to_string())),
                    AggregateArg::Expr(e) => Some(boxed(e)?),
                };
                SqlExpr::Aggregate {
                    func: *function,
                    arg,
                    distinct: *distinct,
                }
            }
            Expression::Case { operand, when_then, else_result } => SqlExpr::Case {
                operand: operand.as_deref().map(boxed).transpose()?,
                when_then: when_then
                    .iter()
                    .map(|(w, t)| Ok((self.build_expr(w)?, self.build_expr(t)?)))
                    .collect::<QueryResult<_>>()?,
                else_result: else_result.as_deref().map(boxed).transpose()?,
            },
            Expression::Tuple(items) => {
                SqlExpr::Tuple(items.iter().map(|e| self.build_expr(e)).collect::<QueryResult<_>>()?)
            }
        };
        Ok(built)
    }
}

fn check_subquery_width(plan: &LogicalPlan, expected: usize) -> QueryResult<()> {
    let width = plan.columns().len();
    if width != expected {
        return Err(QueryError::TypeMismatch(format!(
            "operand should contain {} column(s), subquery returns {}",
            expected, width
        )));
    }
    Ok(())
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[SqlExpr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        };
        write!(f, "{}", symbol)
    }
}

impl fmt::Display for SqlExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = |negated: &bool| if *negated { "NOT " } else { "" };
        match self {
            SqlExpr::Literal(SqlValue::Str(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            SqlExpr::Literal(v) => write!(f, "{}", v),
            SqlExpr::Column { table, name, depth: 0 } => write!(f, "{}.{}", table, name),
            SqlExpr::Column { table, name, depth } => write!(f, "{}.{}^{}", table, name, depth),
            SqlExpr::Negate(e) => write!(f, "-({})", e),
            SqlExpr::Not(e) => write!(f, "NOT ({})", e),
            SqlExpr::Arithmetic { left, op, right } => write!(f, "({} {} {})", left, op, right),
            SqlExpr::Comparison { left, op, right } => write!(f, "{} {} {}", left, op, right),
            SqlExpr::Logical { left, op, right } => {
                let op = match op {
                    LogicalOp::And => "AND",
                    LogicalOp::Or => "OR",
                    LogicalOp::Xor => "XOR",
                };
                write!(f, "({} {} {})", left, op, right)
            }
            SqlExpr::IsNull { expr, negated } => write!(f, "{} IS {}NULL", expr, not(negated)),
            SqlExpr::IsBool { expr, value, negated } => {
                let value = match value {
                    Some(true) => "TRUE",
                    Some(false) => "FALSE",
                    None => "UNKNOWN",
                };
                write!(f, "{} IS {}{}", expr, not(negated), value)
            }
            SqlExpr::Between { expr, low, high, negated } => {
                write!(f, "{} {}BETWEEN {} AND {}", expr, not(negated), low, high)
            }
            SqlExpr::InList { expr, list, negated } => {
                write!(f, "{} {}IN (", expr, not(negated))?;
                write_list(f, list)?;
                write!(f, ")")
            }
            SqlExpr::InSubquery { expr, negated, .. } => write!(f, "{} {}IN (<subquery>)", expr, not(negated)),
            SqlExpr::Exists { negated, .. } => write!(f, "{}EXISTS (<subquery>)", not(negated)),
            SqlExpr::ScalarSubquery(_) => write!(f, "(<subquery>)"),
            SqlExpr::Like { expr, pattern, escape, negated } => {
                write!(f, "{} {}LIKE {}", expr, not(negated), pattern)?;
                if let Some(escape) = escape {
                    write!(f, " ESCAPE {}", escape)?;
                }
                Ok(())
            }
            SqlExpr::Case { operand, when_then, else_result } => {
                write!(f, "CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {}", operand)?;
                }
                for (when, then) in when_then {
                    write!(f, " WHEN {} THEN {}", when, then)?;
                }
                if let Some(else_result) = else_result {
                    write!(f, " ELSE {}", else_result)?;
                }
                write!(f, " END")
            }
            SqlExpr::Tuple(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
            SqlExpr::Function { func, args } => {
                write!(f, "{}(", func.name())?;
                write_list(f, args)?;
                write!(f, ")")
            }
            SqlExpr::Aggregate { func, arg, distinct } => {
                write!(f, "{}({}", func.name(), if *distinct { "DISTINCT " } else { "" })?;
                match arg {
                    Some(arg) => write!(f, "{})", arg),
                    None => write!(f, "*)"),
                }
            }
        }
    }
}
