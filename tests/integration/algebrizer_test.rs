use anyhow::{anyhow, Result};
use docsql::query::algebrize;
use docsql::query::parser::ast::{Expression, SelectColumn, SelectStatement, Statement, TableExpression};
use docsql::query::parser::parse;
use docsql::QueryError;

#[path = "../common/mod.rs"]
mod common;
use common::test_schema;

fn resolve_in(database: &str, sql: &str) -> Result<Statement, QueryError> {
    let mut statement = parse(sql)?;
    let schema = test_schema().map_err(|e| QueryError::Execution(e.to_string()))?;
    algebrize(&mut statement, &schema, database)?;
    Ok(statement)
}

fn resolve(sql: &str) -> Result<Statement, QueryError> {
    resolve_in("test", sql)
}

fn select(statement: Statement) -> Result<SelectStatement> {
    match statement {
        Statement::Select(select) => Ok(*select),
        other => Err(anyhow!("Expected SELECT statement, got {:?}", other)),
    }
}

fn labels(select: &SelectStatement) -> Vec<String> {
    select
        .columns
        .iter()
        .filter_map(|c| match c {
            SelectColumn::Expression { alias, .. } => alias.clone(),
            _ => None,
        })
        .collect()
}

#[test]
fn test_table_and_column_names_are_canonicalized() -> Result<()> {
    let select = select(resolve("SELECT NAME, e.Salary FROM EMPLOYEES e")?)?;
    match &select.columns[0] {
        SelectColumn::Expression { expr, alias } => {
            assert_eq!(expr, &Expression::column(Some("e"), "name"));
            assert_eq!(alias.as_deref(), Some("NAME"));
        }
        other => panic!("Unexpected column {:?}", other),
    }
    match &select.from[0] {
        TableExpression::Table(table) => {
            assert_eq!(table.name, "employees");
            assert_eq!(table.database.as_deref(), Some("test"));
            assert_eq!(table.collection.as_deref(), Some("emp"));
        }
        other => panic!("Unexpected table {:?}", other),
    }
    Ok(())
}

#[test]
fn test_database_selection() -> Result<()> {
    assert!(matches!(resolve_in("", "SELECT name FROM employees"), Err(QueryError::NoDatabaseSelected)));
    assert!(resolve_in("", "SELECT name FROM test.employees").is_ok());
    assert!(resolve_in("", "SELECT 1").is_ok());
    assert!(matches!(resolve("SELECT name FROM other.employees"), Err(QueryError::UnknownTable(_))));
    Ok(())
}

#[test]
fn test_star_expansion_across_joins() -> Result<()> {
    let select = select(resolve("SELECT d.*, e.name FROM employees e JOIN departments d ON e.dept_id = d.id")?)?;
    assert_eq!(labels(&select), vec!["id", "name", "name"]);

    let select = self::select(resolve("SELECT * FROM nums")?)?;
    assert_eq!(labels(&select), vec!["a", "b"]);
    Ok(())
}

#[test]
fn test_select_aliases_are_not_visible_in_where() -> Result<()> {
    assert!(matches!(
        resolve("SELECT salary AS pay FROM employees WHERE pay > 10"),
        Err(QueryError::UnknownColumn(_))
    ));

    let select = select(resolve("SELECT salary AS pay FROM employees ORDER BY pay DESC")?)?;
    assert_eq!(select.order_by[0].expr, Expression::column(Some("employees"), "salary"));
    assert!(select.order_by[0].descending);
    Ok(())
}

#[test]
fn test_ambiguity_and_unknown_names() -> Result<()> {
    assert!(matches!(
        resolve("SELECT name FROM employees, departments"),
        Err(QueryError::AmbiguousColumn(_))
    ));
    assert!(matches!(
        resolve("SELECT x.name FROM employees e"),
        Err(QueryError::UnknownTable(_))
    ));
    assert!(matches!(
        resolve("SELECT e.nope FROM employees e"),
        Err(QueryError::UnknownColumn(_))
    ));
    assert!(matches!(
        resolve("SELECT * FROM employees e, departments e"),
        Err(QueryError::DuplicateAlias(_))
    ));
    Ok(())
}

#[test]
fn test_derived_table_columns() -> Result<()> {
    let select = select(resolve("SELECT s.total FROM (SELECT sum(salary) AS total FROM employees) s")?)?;
    match &select.columns[0] {
        SelectColumn::Expression { expr, .. } => assert_eq!(expr, &Expression::column(Some("s"), "total")),
        other => panic!("Unexpected column {:?}", other),
    }

    assert!(matches!(
        resolve("SELECT employees.name FROM (SELECT name FROM employees) s"),
        Err(QueryError::AliasMismatch { .. })
    ));
    assert!(matches!(
        resolve("SELECT * FROM (SELECT name FROM employees)"),
        Err(QueryError::DerivedTableAlias)
    ));
    Ok(())
}

#[test]
fn test_correlated_subquery_in_select_list() -> Result<()> {
    let select = select(resolve(
        "SELECT d.name, (SELECT count(*) FROM employees e WHERE e.dept_id = d.id) FROM departments d",
    )?)?;
    let inner = match &select.columns[1] {
        SelectColumn::Expression { expr: Expression::Subquery(query), .. } => self::select((**query).clone())?,
        other => panic!("Unexpected column {:?}", other),
    };
    match inner.where_clause {
        Some(Expression::BinaryOp { right, .. }) => {
            assert!(matches!(*right, Expression::Column(ref c) if c.depth == 1 && c.table.as_deref() == Some("d")));
        }
        other => panic!("Unexpected predicate {:?}", other),
    }
    Ok(())
}

#[test]
fn test_aggregate_misuse() -> Result<()> {
    assert!(matches!(
        resolve("SELECT name FROM employees WHERE count(*) > 1"),
        Err(QueryError::InvalidAggregate(_))
    ));
    assert!(matches!(
        resolve("SELECT name FROM employees GROUP BY count(*)"),
        Err(QueryError::InvalidAggregate(_))
    ));
    Ok(())
}
