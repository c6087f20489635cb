// Logical Query Plan Implementation
//
// The plan is a tree of operators built structurally from a resolved
// statement. Every node knows its output columns once it is constructed.

use std::fmt;

use bson::Document;

use crate::catalog::Table;
use crate::query::executor::result::ColumnDescriptor;
use crate::query::planner::expression::SqlExpr;

/// Join semantics carried by a join node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    Cross,
    Straight,
    Natural,
}

impl JoinKind {
    /// Kinds that pad unmatched rows of one side
    pub fn is_outer(&self) -> bool {
        matches!(self, JoinKind::LeftOuter | JoinKind::RightOuter)
    }
}

/// How a join node produces its output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    NestedLoop,
    SortMerge,
    Hash,
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub expr: SqlExpr,
    pub descending: bool,
}

/// Represents a node in the logical query plan
#[derive(Debug, Clone)]
pub enum LogicalPlan {
    /// Read a collection, optionally through a backend filter document
    Scan {
        alias: String,
        database: String,
        table: Table,
        columns: Vec<ColumnDescriptor>,
        filter: Option<Document>,
    },
    /// Source of exactly one empty row, used when there is no FROM clause
    Noop,
    Join {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        kind: JoinKind,
        strategy: JoinStrategy,
        on: Option<SqlExpr>,
        columns: Vec<ColumnDescriptor>,
    },
    Filter {
        input: Box<LogicalPlan>,
        predicate: SqlExpr,
    },
    /// Buffer the input and emit one row per group
    Group {
        input: Box<LogicalPlan>,
        keys: Vec<SqlExpr>,
    },
    Project {
        input: Box<LogicalPlan>,
        exprs: Vec<SqlExpr>,
        columns: Vec<ColumnDescriptor>,
    },
    /// Re-tag the rows of a derived table under its alias
    Subquery {
        input: Box<LogicalPlan>,
        alias: String,
        columns: Vec<ColumnDescriptor>,
    },
    Distinct {
        input: Box<LogicalPlan>,
    },
    Sort {
        input: Box<LogicalPlan>,
        keys: Vec<SortKey>,
    },
    Limit {
        input: Box<LogicalPlan>,
        offset: u64,
        count: u64,
    },
}

impl LogicalPlan {
    /// Output columns of this node
    pub fn columns(&self) -> Vec<ColumnDescriptor> {
        match self {
            LogicalPlan::Scan { columns, .. }
            | LogicalPlan::Join { columns, .. }
            | LogicalPlan::Project { columns, .. }
            | LogicalPlan::Subquery { columns, .. } => columns.clone(),
            LogicalPlan::Noop => Vec::new(),
            LogicalPlan::Filter { input, .. }
            | LogicalPlan::Group { input, .. }
            | LogicalPlan::Distinct { input }
            | LogicalPlan::Sort { input, .. }
            | LogicalPlan::Limit { input, .. } => input.columns(),
        }
    }

    /// Node name used by explain output
    pub fn name(&self) -> &'static str {
        match self {
            LogicalPlan::Scan { .. } => "Scan",
            LogicalPlan::Noop => "Noop",
            LogicalPlan::Join { .. } => "Join",
            LogicalPlan::Filter { .. } => "Filter",
            LogicalPlan::Group { .. } => "Group",
            LogicalPlan::Project { .. } => "Project",
            LogicalPlan::Subquery { .. } => "Subquery",
            LogicalPlan::Distinct { .. } => "Distinct",
            LogicalPlan::Sort { .. } => "Sort",
            LogicalPlan::Limit { .. } => "Limit",
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{}{}", "  ".repeat(depth), self.name())?;
        match self {
            LogicalPlan::Scan { alias, database, table, filter, .. } => {
                write!(f, ": {}.{} AS {} [{}]", database, table.name(), alias, table.collection())?;
                if let Some(filter) = filter {
                    write!(f, " filter={}", filter)?;
                }
                writeln!(f)
            }
            LogicalPlan::Noop => writeln!(f),
            LogicalPlan::Join { left, right, kind, strategy, on, .. } => {
                write!(f, ": {:?} ({:?})", kind, strategy)?;
                if let Some(on) = on {
                    write!(f, " ON {}", on)?;
                }
                writeln!(f)?;
                left.fmt_indented(f, depth + 1)?;
                right.fmt_indented(f, depth + 1)
            }
            LogicalPlan::Filter { input, predicate } => {
                writeln!(f, ": {}", predicate)?;
                input.fmt_indented(f, depth + 1)
            }
            LogicalPlan::Group { input, keys } => {
                write!(f, ":")?;
                if keys.is_empty() {
                    write!(f, " <all rows>")?;
                }
                for (i, key) in keys.iter().enumerate() {
                    write!(f, "{} {}", if i > 0 { "," } else { "" }, key)?;
                }
                writeln!(f)?;
                input.fmt_indented(f, depth + 1)
            }
            LogicalPlan::Project { input, exprs, columns } => {
                write!(f, ":")?;
                for (i, (expr, column)) in exprs.iter().zip(columns).enumerate() {
                    write!(f, "{} {} AS {}", if i > 0 { "," } else { "" }, expr, column.label)?;
                }
                writeln!(f)?;
                input.fmt_indented(f, depth + 1)
            }
            LogicalPlan::Subquery { input, alias, .. } => {
                writeln!(f, ": {}", alias)?;
                input.fmt_indented(f, depth + 1)
            }
            LogicalPlan::Distinct { input } => {
                writeln!(f)?;
                input.fmt_indented(f, depth + 1)
            }
            LogicalPlan::Sort { input, keys } => {
                write!(f, ":")?;
                for (i, key) in keys.iter().enumerate() {
                    let direction = if key.descending { "DESC" } else { "ASC" };
                    write!(f, "{} {} {}", if i > 0 { "," } else { "" }, key.expr, direction)?;
                }
                writeln!(f)?;
                input.fmt_indented(f, depth + 1)
            }
            LogicalPlan::Limit { input, offset, count } => {
                writeln!(f, ": offset={} count={}", offset, count)?;
                input.fmt_indented(f, depth + 1)
            }
        }
    }
}

impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
