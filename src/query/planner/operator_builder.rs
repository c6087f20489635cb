// Operator Builder
//
// Turns a logical plan into the operator tree that executes it.

use crate::query::executor::operators::{
    DistinctOperator, FilterOperator, HashAggregateOperator, LimitOperator, NestedLoopJoin, OperatorNode,
    ProjectOperator, ScanOperator, SortOperator, SubqueryOperator, ValuesOperator,
};
use crate::query::executor::result::{QueryError, QueryResult};
use crate::query::planner::logical::{JoinStrategy, LogicalPlan};

/// Build an unopened operator tree for `plan`
pub fn build_operator(plan: &LogicalPlan) -> QueryResult<OperatorNode> {
    let node = match plan {
        LogicalPlan::Scan {
            alias,
            database,
            table,
            filter,
            ..
        } => OperatorNode::Scan(ScanOperator::new(
            alias.clone(),
            database.clone(),
            table.clone(),
            filter.clone(),
        )),
        LogicalPlan::Noop => OperatorNode::Values(ValuesOperator::single_empty_row()),
        LogicalPlan::Join {
            left,
            right,
            kind,
            strategy,
            on,
            ..
        } => {
            if *strategy != JoinStrategy::NestedLoop {
                return Err(QueryError::NotImplemented(format!("{:?} join", strategy)));
            }
            OperatorNode::Join(NestedLoopJoin::new(
                build_operator(left)?,
                build_operator(right)?,
                *kind,
                on.clone(),
                left.columns(),
                right.columns(),
            ))
        }
        LogicalPlan::Filter { input, predicate } => {
            OperatorNode::Filter(FilterOperator::new(build_operator(input)?, predicate.clone()))
        }
        LogicalPlan::Group { input, keys } => {
            OperatorNode::Group(HashAggregateOperator::new(build_operator(input)?, keys.clone()))
        }
        LogicalPlan::Project { input, exprs, columns } => OperatorNode::Project(ProjectOperator::new(
            build_operator(input)?,
            exprs.clone(),
            columns.clone(),
        )),
        LogicalPlan::Subquery { input, columns, .. } => {
            OperatorNode::Subquery(SubqueryOperator::new(build_operator(input)?, columns.clone()))
        }
        LogicalPlan::Distinct { input } => OperatorNode::Distinct(DistinctOperator::new(build_operator(input)?)),
        LogicalPlan::Sort { input, keys } => OperatorNode::Sort(SortOperator::new(build_operator(input)?, keys.clone())),
        LogicalPlan::Limit { input, offset, count } => {
            OperatorNode::Limit(LimitOperator::new(build_operator(input)?, *offset, *count))
        }
    };
    Ok(node)
}
