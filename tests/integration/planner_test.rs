use anyhow::Result;
use bson::doc;
use docsql::catalog::SqlType;
use docsql::query::planner::{JoinKind, JoinStrategy, LogicalPlan};
use docsql::{EngineConfig, QueryError};

#[path = "../common/mod.rs"]
mod common;
use common::Fixture;

fn explain(fixture: &Fixture, sql: &str) -> Result<LogicalPlan, QueryError> {
    fixture.evaluator.explain("", sql, &fixture.connection)
}

/// Node names from the root down through the first input of each node
fn spine(plan: &LogicalPlan) -> Vec<&'static str> {
    let mut names = vec![plan.name()];
    let child = match plan {
        LogicalPlan::Filter { input, .. }
        | LogicalPlan::Group { input, .. }
        | LogicalPlan::Project { input, .. }
        | LogicalPlan::Subquery { input, .. }
        | LogicalPlan::Distinct { input }
        | LogicalPlan::Sort { input, .. }
        | LogicalPlan::Limit { input, .. } => Some(input),
        LogicalPlan::Join { left, .. } => Some(left),
        LogicalPlan::Scan { .. } | LogicalPlan::Noop => None,
    };
    if let Some(child) = child {
        names.extend(spine(child));
    }
    names
}

/// The first scan reached along the spine
fn first_scan(plan: &LogicalPlan) -> Option<&LogicalPlan> {
    match plan {
        LogicalPlan::Scan { .. } => Some(plan),
        LogicalPlan::Filter { input, .. }
        | LogicalPlan::Group { input, .. }
        | LogicalPlan::Project { input, .. }
        | LogicalPlan::Subquery { input, .. }
        | LogicalPlan::Distinct { input }
        | LogicalPlan::Sort { input, .. }
        | LogicalPlan::Limit { input, .. } => first_scan(input),
        LogicalPlan::Join { left, .. } => first_scan(left),
        LogicalPlan::Noop => None,
    }
}

#[test]
fn test_clause_order() -> Result<()> {
    let fixture = Fixture::new()?;
    let plan = explain(
        &fixture,
        "SELECT DISTINCT dept_id, count(*) FROM employees WHERE salary + 0 > 1 GROUP BY dept_id \
         HAVING count(*) > 0 ORDER BY dept_id LIMIT 1, 2",
    )?;
    assert_eq!(
        spine(&plan),
        vec!["Limit", "Distinct", "Project", "Sort", "Filter", "Group", "Filter", "Scan"]
    );
    Ok(())
}

#[test]
fn test_where_is_pushed_into_scan() -> Result<()> {
    let fixture = Fixture::new()?;
    let plan = explain(&fixture, "SELECT name FROM employees WHERE salary > 100")?;
    assert_eq!(spine(&plan), vec!["Project", "Scan"]);
    match first_scan(&plan) {
        Some(LogicalPlan::Scan { filter, .. }) => {
            assert_eq!(filter.as_ref(), Some(&doc! { "salary": { "$gt": 100_i64 } }));
        }
        other => panic!("Expected scan, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_untransformable_conjunct_stays_in_memory() -> Result<()> {
    let fixture = Fixture::new()?;
    let plan = explain(&fixture, "SELECT name FROM employees WHERE salary * 2 > 100 AND city = 'Oslo'")?;
    assert_eq!(spine(&plan), vec!["Project", "Filter", "Scan"]);
    match first_scan(&plan) {
        Some(LogicalPlan::Scan { filter, .. }) => {
            // column names render to their field paths
            assert_eq!(filter.as_ref(), Some(&doc! { "address.city": { "$eq": "Oslo" } }));
        }
        other => panic!("Expected scan, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_pushdown_can_be_disabled() -> Result<()> {
    let config = EngineConfig {
        pushdown: false,
        ..EngineConfig::default()
    };
    let fixture = Fixture::with_config(config)?;
    let plan = explain(&fixture, "SELECT name FROM employees WHERE salary > 100")?;
    assert_eq!(spine(&plan), vec!["Project", "Filter", "Scan"]);
    assert!(matches!(first_scan(&plan), Some(LogicalPlan::Scan { filter: None, .. })));
    Ok(())
}

#[test]
fn test_where_above_join_is_not_pushed() -> Result<()> {
    let fixture = Fixture::new()?;
    let plan = explain(
        &fixture,
        "SELECT e.name FROM employees e JOIN departments d ON e.dept_id = d.id WHERE d.name = 'eng'",
    )?;
    assert_eq!(spine(&plan), vec!["Project", "Filter", "Join", "Scan"]);
    Ok(())
}

#[test]
fn test_from_list_is_left_deep() -> Result<()> {
    let fixture = Fixture::new()?;
    let plan = explain(&fixture, "SELECT e.name FROM employees e, departments d, nums")?;
    match &plan {
        LogicalPlan::Project { input, .. } => match &**input {
            LogicalPlan::Join { left, right, kind, strategy, .. } => {
                assert_eq!(*kind, JoinKind::Cross);
                assert_eq!(*strategy, JoinStrategy::NestedLoop);
                assert!(matches!(**left, LogicalPlan::Join { .. }));
                assert!(matches!(**right, LogicalPlan::Scan { ref alias, .. } if alias == "nums"));
                assert_eq!(input.columns().len(), 5 + 2 + 2);
            }
            other => panic!("Expected join, got {:?}", other),
        },
        other => panic!("Expected projection, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_output_columns() -> Result<()> {
    let fixture = Fixture::new()?;
    let plan = explain(&fixture, "SELECT name AS n, e.salary, 1 FROM employees e")?;
    let columns = plan.columns();
    let labels: Vec<&str> = columns.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["n", "salary", "1"]);
    assert_eq!(columns[0].sql_type, SqlType::Varchar);
    assert_eq!(columns[1].sql_type, SqlType::Int);
    assert_eq!(columns[1].table, "e");
    Ok(())
}

#[test]
fn test_select_without_from_and_aggregates_form_one_group() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(spine(&explain(&fixture, "SELECT 1 + 1")?), vec!["Project", "Noop"]);
    assert_eq!(
        spine(&explain(&fixture, "SELECT max(salary) FROM employees")?),
        vec!["Project", "Group", "Scan"]
    );
    match explain(&fixture, "SELECT max(salary) FROM employees")? {
        LogicalPlan::Project { input, .. } => assert!(matches!(*input, LogicalPlan::Group { ref keys, .. } if keys.is_empty())),
        other => panic!("Expected projection, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_unsupported_statements() -> Result<()> {
    let fixture = Fixture::new()?;
    assert!(matches!(
        explain(&fixture, "SELECT name FROM employees UNION SELECT name FROM departments"),
        Err(QueryError::NotImplemented(_))
    ));
    assert!(matches!(
        explain(&fixture, "SELECT e.name FROM employees e FULL JOIN departments d ON e.dept_id = d.id"),
        Err(QueryError::NotImplemented(_))
    ));
    assert!(matches!(explain(&fixture, "SELECT *"), Err(QueryError::NoTablesUsed)));
    Ok(())
}

#[test]
fn test_explain_output() -> Result<()> {
    let fixture = Fixture::new()?;
    let text = explain(&fixture, "SELECT name FROM employees WHERE salary > 100")?.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Project:"));
    assert!(lines[1].starts_with("  Scan: test.employees AS employees [emp] filter="));
    Ok(())
}
