// Query Planner Module
//
// Translates resolved statements into logical plans. Expressions are bound
// in `expression`, WHERE conjuncts move into scan filters in
// `filter_pushdown` and `operator_builder` turns a plan into operators.

pub mod expression;
pub mod filter_pushdown;
pub mod logical;
pub mod operator_builder;

use crate::catalog::Schema;
use crate::common::config::EngineConfig;
use crate::query::executor::result::{ColumnDescriptor, QueryError, QueryResult};
use crate::query::parser::ast::{
    JoinClause, JoinConstraint, JoinType, SelectColumn, SelectStatement, Statement, TableExpression, TableName,
};

pub use self::expression::SqlExpr;
pub use self::logical::{JoinKind, JoinStrategy, LogicalPlan, SortKey};

/// Builds logical plans from statements that have been through name
/// resolution
pub struct Planner<'a> {
    schema: &'a Schema,
    config: &'a EngineConfig,
}

impl<'a> Planner<'a> {
    pub fn new(schema: &'a Schema, config: &'a EngineConfig) -> Self {
        Planner { schema, config }
    }

    /// Plan a statement, including the subqueries nested in it
    pub fn plan(&self, statement: &Statement) -> QueryResult<LogicalPlan> {
        match statement {
            Statement::Select(select) => self.plan_select(select),
            Statement::Union { .. } => Err(QueryError::NotImplemented("UNION".to_string())),
        }
    }

    fn plan_select(&self, select: &SelectStatement) -> QueryResult<LogicalPlan> {
        let mut plan = self.plan_from(&select.from)?;

        if let Some(where_clause) = &select.where_clause {
            let predicate = self.build_expr(where_clause)?;
            plan = filter_pushdown::push_filter(plan, predicate, self.config);
        }

        let mut projections = Vec::with_capacity(select.columns.len());
        for column in &select.columns {
            match column {
                SelectColumn::Expression { expr, alias } => {
                    let label = alias.clone().unwrap_or_else(|| expr.to_string());
                    projections.push((self.build_expr(expr)?, label));
                }
                SelectColumn::Wildcard if select.from.is_empty() => return Err(QueryError::NoTablesUsed),
                star => return Err(QueryError::NotImplemented(format!("unexpanded {}", star))),
            }
        }
        let having = select.having.as_ref().map(|h| self.build_expr(h)).transpose()?;
        let sort_keys = select
            .order_by
            .iter()
            .map(|item| {
                Ok(SortKey {
                    expr: self.build_expr(&item.expr)?,
                    descending: item.descending,
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;

        let aggregated = !select.group_by.is_empty()
            || projections.iter().any(|(e, _)| e.contains_aggregate())
            || having.as_ref().is_some_and(SqlExpr::contains_aggregate)
            || sort_keys.iter().any(|k| k.expr.contains_aggregate());
        if aggregated {
            let keys = select
                .group_by
                .iter()
                .map(|term| self.build_expr(term))
                .collect::<QueryResult<Vec<_>>>()?;
            plan = LogicalPlan::Group {
                input: Box::new(plan),
                keys,
            };
        }

        if let Some(predicate) = having {
            plan = LogicalPlan::Filter {
                input: Box::new(plan),
                predicate,
            };
        }

        if !sort_keys.is_empty() {
            plan = LogicalPlan::Sort {
                input: Box::new(plan),
                keys: sort_keys,
            };
        }

        let source = plan.columns();
        let columns = projections
            .iter()
            .map(|(expr, label)| match expr {
                SqlExpr::Column { table, name, .. } => {
                    ColumnDescriptor::new(table.clone(), name.clone(), expr.result_type(&source)).with_label(label.clone())
                }
                computed => ColumnDescriptor::new("", label.clone(), computed.result_type(&source)),
            })
            .collect();
        plan = LogicalPlan::Project {
            input: Box::new(plan),
            exprs: projections.into_iter().map(|(e, _)| e).collect(),
            columns,
        };

        if select.distinct {
            plan = LogicalPlan::Distinct { input: Box::new(plan) };
        }

        if let Some(limit) = select.limit {
            plan = LogicalPlan::Limit {
                input: Box::new(plan),
                offset: limit.offset.unwrap_or(0),
                count: limit.count,
            };
        }

        Ok(plan)
    }

    /// Plan a FROM list; several entries form a left-deep cross product
    fn plan_from(&self, from: &[TableExpression]) -> QueryResult<LogicalPlan> {
        let mut items = from.iter();
        let mut plan = match items.next() {
            Some(first) => self.plan_table_expression(first)?,
            None => return Ok(LogicalPlan::Noop),
        };
        for item in items {
            let right = self.plan_table_expression(item)?;
            plan = join_node(plan, right, JoinKind::Cross, None);
        }
        Ok(plan)
    }

    fn plan_table_expression(&self, item: &TableExpression) -> QueryResult<LogicalPlan> {
        match item {
            TableExpression::Table(table) => self.plan_scan(table),
            TableExpression::Join(join) => self.plan_join(join),
            TableExpression::Parenthesized(items) if items.is_empty() => Err(QueryError::NoTablesUsed),
            TableExpression::Parenthesized(items) => self.plan_from(items),
            TableExpression::Subquery { query, alias } => {
                let alias = alias.clone().ok_or(QueryError::DerivedTableAlias)?;
                let input = self.plan(query)?;
                let columns = input
                    .columns()
                    .into_iter()
                    .map(|c| ColumnDescriptor::new(alias.clone(), c.label.clone(), c.sql_type).with_label(c.label))
                    .collect();
                Ok(LogicalPlan::Subquery {
                    input: Box::new(input),
                    alias,
                    columns,
                })
            }
        }
    }

    fn plan_scan(&self, table: &TableName) -> QueryResult<LogicalPlan> {
        let database = table.database.clone().unwrap_or_default();
        let definition = self
            .schema
            .table(&database, &table.name)
            .ok_or_else(|| QueryError::UnknownTable(format!("{}.{}", database, table.name)))?
            .clone();
        let alias = table.binding_name().to_string();
        let columns = definition
            .columns()
            .iter()
            .map(|c| ColumnDescriptor::new(alias.clone(), c.name(), c.sql_type()))
            .collect();
        Ok(LogicalPlan::Scan {
            alias,
            database,
            table: definition,
            columns,
            filter: None,
        })
    }

    fn plan_join(&self, join: &JoinClause) -> QueryResult<LogicalPlan> {
        let kind = match join.kind {
            JoinType::Inner => JoinKind::Inner,
            JoinType::LeftOuter => JoinKind::LeftOuter,
            JoinType::RightOuter => JoinKind::RightOuter,
            JoinType::Cross => JoinKind::Cross,
            JoinType::Straight => JoinKind::Straight,
            JoinType::Natural => JoinKind::Natural,
            JoinType::FullOuter => return Err(QueryError::NotImplemented("FULL OUTER JOIN".to_string())),
        };
        let left = self.plan_table_expression(&join.left)?;
        let right = self.plan_table_expression(&join.right)?;
        let on = match &join.constraint {
            JoinConstraint::None => None,
            JoinConstraint::On(condition) => Some(self.build_expr(condition)?),
            JoinConstraint::Using(_) => return Err(QueryError::NotImplemented("unresolved USING".to_string())),
        };
        Ok(join_node(left, right, kind, on))
    }
}

fn join_node(left: LogicalPlan, right: LogicalPlan, kind: JoinKind, on: Option<SqlExpr>) -> LogicalPlan {
    let mut columns = left.columns();
    columns.extend(right.columns());
    LogicalPlan::Join {
        left: Box::new(left),
        right: Box::new(right),
        kind,
        strategy: JoinStrategy::NestedLoop,
        on,
        columns,
    }
}
