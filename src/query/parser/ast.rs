// SQL Abstract Syntax Tree (AST) Implementation
//
// This module defines the AST nodes for parsed SELECT statements. Name
// resolution rewrites these nodes in place: column references gain their
// table qualifier and scope depth, tables gain their backend collection.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// Represents a SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Box<SelectStatement>),
    Union {
        left: Box<Statement>,
        right: Box<Statement>,
        all: bool,
    },
}

/// SELECT statement representation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub distinct: bool,
    /// Columns in SELECT clause
    pub columns: Vec<SelectColumn>,
    /// FROM clause table expressions; several entries form a cross product
    pub from: Vec<TableExpression>,
    pub where_clause: Option<Expression>,
    pub group_by: Vec<Expression>,
    pub having: Option<Expression>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<LimitClause>,
}

/// Column in a SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    /// All columns (*)
    Wildcard,
    /// All columns of one table (t.*)
    QualifiedWildcard(String),
    /// Expression with optional alias
    Expression { expr: Expression, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expression,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitClause {
    pub offset: Option<u64>,
    pub count: u64,
}

/// Table reference in FROM clause
#[derive(Debug, Clone, PartialEq)]
pub struct TableName {
    pub database: Option<String>,
    pub name: String,
    pub alias: Option<String>,
    /// Backend collection, filled in by name resolution
    pub collection: Option<String>,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        TableName {
            database: None,
            name: name.into(),
            alias: None,
            collection: None,
        }
    }

    /// The name the table is known by in its scope
    pub fn binding_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// One element of a FROM clause
#[derive(Debug, Clone, PartialEq)]
pub enum TableExpression {
    Table(TableName),
    Join(Box<JoinClause>),
    /// Parenthesized table list `( t1, t2 )`
    Parenthesized(Vec<TableExpression>),
    /// Derived table `( SELECT ... ) AS alias`
    Subquery {
        query: Box<Statement>,
        alias: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub left: TableExpression,
    pub right: TableExpression,
    pub kind: JoinType,
    pub constraint: JoinConstraint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
    Straight,
    Natural,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinConstraint {
    None,
    On(Expression),
    Using(Vec<String>),
}

/// Column reference (could be qualified with table name)
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReference {
    pub table: Option<String>,
    pub name: String,
    /// Number of scopes between the reference and the table it resolved
    /// to; zero for the local scope
    pub depth: usize,
}

impl ColumnReference {
    pub fn new(table: Option<&str>, name: &str) -> Self {
        ColumnReference {
            table: table.map(str::to_string),
            name: name.to_string(),
            depth: 0,
        }
    }
}

/// Expression in SQL
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    Column(ColumnReference),
    BinaryOp {
        left: Box<Expression>,
        op: Operator,
        right: Box<Expression>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
    IsNull {
        expr: Box<Expression>,
        negated: bool,
    },
    /// `IS [NOT] TRUE|FALSE|UNKNOWN`; `value` of `None` is UNKNOWN
    IsBool {
        expr: Box<Expression>,
        value: Option<bool>,
        negated: bool,
    },
    Between {
        expr: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        negated: bool,
    },
    InList {
        expr: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expression>,
        query: Box<Statement>,
        negated: bool,
    },
    Exists {
        query: Box<Statement>,
        negated: bool,
    },
    /// Scalar subquery `(SELECT ...)`
    Subquery(Box<Statement>),
    Like {
        expr: Box<Expression>,
        pattern: Box<Expression>,
        escape: Option<Box<Expression>>,
        negated: bool,
    },
    Function {
        name: String,
        args: Vec<Expression>,
    },
    Aggregate {
        function: AggregateFunction,
        arg: AggregateArg,
        distinct: bool,
    },
    Case {
        operand: Option<Box<Expression>>,
        when_then: Vec<(Expression, Expression)>,
        else_result: Option<Box<Expression>>,
    },
    /// Row value `(a, b)`
    Tuple(Vec<Expression>),
}

impl Expression {
    pub fn column(table: Option<&str>, name: &str) -> Self {
        Expression::Column(ColumnReference::new(table, name))
    }

    pub fn binary(left: Expression, op: Operator, right: Expression) -> Self {
        Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// True when an aggregate appears outside any nested subquery
    pub fn contains_aggregate(&self) -> bool {
        let mut found = false;
        self.walk(&mut |e| {
            if matches!(e, Expression::Aggregate { .. }) {
                found = true;
            }
        });
        found
    }

    /// Visit this expression and its children, not descending into
    /// subqueries
    pub fn walk<F: FnMut(&Expression)>(&self, f: &mut F) {
        f(self);
        match self {
            Expression::Literal(_) | Expression::Column(_) | Expression::Subquery(_) | Expression::Exists { .. } => {}
            Expression::BinaryOp { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Expression::UnaryOp { expr, .. }
            | Expression::IsNull { expr, .. }
            | Expression::IsBool { expr, .. }
            | Expression::InSubquery { expr, .. } => expr.walk(f),
            Expression::Between { expr, low, high, .. } => {
                expr.walk(f);
                low.walk(f);
                high.walk(f);
            }
            Expression::InList { expr, list, .. } => {
                expr.walk(f);
                list.iter().for_each(|e| e.walk(f));
            }
            Expression::Like { expr, pattern, escape, .. } => {
                expr.walk(f);
                pattern.walk(f);
                if let Some(escape) = escape {
                    escape.walk(f);
                }
            }
            Expression::Function { args, .. } | Expression::Tuple(args) => args.iter().for_each(|e| e.walk(f)),
            Expression::Aggregate { arg, .. } => {
                if let AggregateArg::Expr(e) = arg {
                    e.walk(f);
                }
            }
            Expression::Case { operand, when_then, else_result } => {
                if let Some(operand) = operand {
                    operand.walk(f);
                }
                for (when, then) in when_then {
                    when.walk(f);
                    then.walk(f);
                }
                if let Some(else_result) = else_result {
                    else_result.walk(f);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    GroupConcat,
    StdDev,
}

impl AggregateFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "count" => Some(AggregateFunction::Count),
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            "group_concat" => Some(AggregateFunction::GroupConcat),
            "std" | "stddev" | "stddev_pop" => Some(AggregateFunction::StdDev),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::GroupConcat => "group_concat",
            AggregateFunction::StdDev => "std",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateArg {
    /// `count(*)`
    Star,
    Expr(Box<Expression>),
}

/// SQL values
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Unsigned(u64),
    Decimal(Decimal),
    Float(f64),
    String(String),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

/// SQL binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    // Comparison
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessEquals,
    GreaterEquals,
    // Logical
    And,
    Or,
    Xor,
    // Arithmetic
    Plus,
    Minus,
    Multiply,
    Divide,
    IntDivide,
    Modulo,
}

impl Operator {
    /// Binding strength; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Or => 1,
            Operator::Xor => 2,
            Operator::And => 3,
            Operator::Equals
            | Operator::NotEquals
            | Operator::LessThan
            | Operator::GreaterThan
            | Operator::LessEquals
            | Operator::GreaterEquals => 5,
            Operator::Plus | Operator::Minus => 6,
            Operator::Multiply | Operator::Divide | Operator::IntDivide | Operator::Modulo => 7,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == 5
    }

    /// The comparison obtained by swapping operands
    pub fn mirror(&self) -> Operator {
        match self {
            Operator::LessThan => Operator::GreaterThan,
            Operator::GreaterThan => Operator::LessThan,
            Operator::LessEquals => Operator::GreaterEquals,
            Operator::GreaterEquals => Operator::LessEquals,
            other => *other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
    Plus,
    Not,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Equals => "=",
            Operator::NotEquals => "<>",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::LessEquals => "<=",
            Operator::GreaterEquals => ">=",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Xor => "XOR",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::IntDivide => "DIV",
            Operator::Modulo => "%",
        };
        write!(f, "{}", symbol)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Unsigned(u) => write!(f, "{}", u),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Float(v) => write!(f, "{:e}", v),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Date(d) => write!(f, "DATE '{}'", d.format("%Y-%m-%d")),
            Value::Timestamp(ts) => write!(f, "TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

impl fmt::Display for ColumnReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Write an operand, parenthesized when it binds looser than its parent
fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expression, parent: u8, right: bool) -> fmt::Result {
    match expr {
        Expression::BinaryOp { op, .. } if op.precedence() < parent || (right && op.precedence() == parent) => {
            write!(f, "({})", expr)
        }
        _ => write!(f, "{}", expr),
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = |negated: &bool| if *negated { "NOT " } else { "" };
        match self {
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::Column(c) => write!(f, "{}", c),
            Expression::BinaryOp { left, op, right } => {
                write_operand(f, left, op.precedence(), false)?;
                write!(f, " {} ", op)?;
                write_operand(f, right, op.precedence(), true)
            }
            Expression::UnaryOp { op, expr } => match op {
                UnaryOperator::Minus => write!(f, "-{}", expr),
                UnaryOperator::Plus => write!(f, "+{}", expr),
                UnaryOperator::Not => write!(f, "NOT {}", expr),
            },
            Expression::IsNull { expr, negated } => write!(f, "{} IS {}NULL", expr, not(negated)),
            Expression::IsBool { expr, value, negated } => {
                let value = match value {
                    Some(true) => "TRUE",
                    Some(false) => "FALSE",
                    None => "UNKNOWN",
                };
                write!(f, "{} IS {}{}", expr, not(negated), value)
            }
            Expression::Between { expr, low, high, negated } => {
                write!(f, "{} {}BETWEEN {} AND {}", expr, not(negated), low, high)
            }
            Expression::InList { expr, list, negated } => {
                write!(f, "{} {}IN (", expr, not(negated))?;
                write_list(f, list)?;
                write!(f, ")")
            }
            Expression::InSubquery { expr, query, negated } => write!(f, "{} {}IN ({})", expr, not(negated), query),
            Expression::Exists { query, negated } => write!(f, "{}EXISTS ({})", not(negated), query),
            Expression::Subquery(query) => write!(f, "({})", query),
            Expression::Like { expr, pattern, escape, negated } => {
                write!(f, "{} {}LIKE {}", expr, not(negated), pattern)?;
                if let Some(escape) = escape {
                    write!(f, " ESCAPE {}", escape)?;
                }
                Ok(())
            }
            Expression::Function { name, args } => {
                write!(f, "{}(", name)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expression::Aggregate { function, arg, distinct } => {
                write!(f, "{}(", function.name())?;
                if *distinct {
                    write!(f, "DISTINCT ")?;
                }
                match arg {
                    AggregateArg::Star => write!(f, "*")?,
                    AggregateArg::Expr(e) => write!(f, "{}", e)?,
                }
                write!(f, ")")
            }
            Expression::Case { operand, when_then, else_result } => {
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
            Expression::Tuple(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for SelectColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectColumn::Wildcard => write!(f, "*"),
            SelectColumn::QualifiedWildcard(table) => write!(f, "{}.*", table),
            SelectColumn::Expression { expr, alias: Some(alias) } => write!(f, "{} AS {}", expr, alias),
            SelectColumn::Expression { expr, alias: None } => write!(f, "{}", expr),
        }
    }
}

impl fmt::Display for TableExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableExpression::Table(table) => {
                if let Some(database) = &table.database {
                    write!(f, "{}.", database)?;
                }
                write!(f, "{}", table.name)?;
                if let Some(alias) = &table.alias {
                    write!(f, " AS {}", alias)?;
                }
                Ok(())
            }
            TableExpression::Join(join) => {
                let keyword = match join.kind {
                    JoinType::Inner => "JOIN",
                    JoinType::LeftOuter => "LEFT JOIN",
                    JoinType::RightOuter => "RIGHT JOIN",
                    JoinType::FullOuter => "FULL JOIN",
                    JoinType::Cross => "CROSS JOIN",
                    JoinType::Straight => "STRAIGHT_JOIN",
                    JoinType::Natural => "NATURAL JOIN",
                };
                write!(f, "{} {} {}", join.left, keyword, join.right)?;
                match &join.constraint {
                    JoinConstraint::None => Ok(()),
                    JoinConstraint::On(e) => write!(f, " ON {}", e),
                    JoinConstraint::Using(columns) => {
                        write!(f, " USING (")?;
                        write_list(f, columns)?;
                        write!(f, ")")
                    }
                }
            }
            TableExpression::Parenthesized(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
            TableExpression::Subquery { query, alias } => {
                write!(f, "({})", query)?;
                if let Some(alias) = alias {
                    write!(f, " AS {}", alias)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        write_list(f, &self.columns)?;
        if !self.from.is_empty() {
            write!(f, " FROM ")?;
            write_list(f, &self.from)?;
        }
        if let Some(where_clause) = &self.where_clause {
            write!(f, " WHERE {}", where_clause)?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY ")?;
            write_list(f, &self.group_by)?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY ")?;
            for (i, item) in self.order_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}{}", item.expr, if item.descending { " DESC" } else { "" })?;
            }
        }
        if let Some(limit) = &self.limit {
            match limit.offset {
                Some(offset) => write!(f, " LIMIT {}, {}", offset, limit.count)?,
                None => write!(f, " LIMIT {}", limit.count)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Select(select) => write!(f, "{}", select),
            Statement::Union { left, right, all } => {
                write!(f, "{} UNION {}{}", left, if *all { "ALL " } else { "" }, right)
            }
        }
    }
}
