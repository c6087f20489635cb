use anyhow::Result;
use docsql::{EngineConfig, QueryError, SqlValue};

#[path = "../common/mod.rs"]
mod common;
use common::{int, text, Fixture};

fn pairs(rows: Vec<Vec<SqlValue>>) -> Vec<(SqlValue, SqlValue)> {
    rows.into_iter()
        .map(|row| {
            let mut values = row.into_iter();
            (
                values.next().unwrap_or(SqlValue::NoValue),
                values.next().unwrap_or(SqlValue::NoValue),
            )
        })
        .collect()
}

#[test]
fn test_inner_join() -> Result<()> {
    let fixture = Fixture::new()?;
    let rows = fixture.values(
        "SELECT e.name, d.name FROM employees e JOIN departments d ON e.dept_id = d.id ORDER BY e.id",
    )?;
    assert_eq!(
        pairs(rows),
        vec![
            (text("ann"), text("eng")),
            (text("bob"), text("eng")),
            (text("cid"), text("ops")),
        ]
    );
    Ok(())
}

#[test]
fn test_left_outer_join_pads_with_null() -> Result<()> {
    let fixture = Fixture::new()?;
    let rows = fixture.values(
        "SELECT e.name, d.name FROM employees e LEFT JOIN departments d ON e.dept_id = d.id ORDER BY e.id",
    )?;
    assert_eq!(
        pairs(rows),
        vec![
            (text("ann"), text("eng")),
            (text("bob"), text("eng")),
            (text("cid"), text("ops")),
            (text("dee"), SqlValue::Null),
            (text("eve"), SqlValue::Null),
        ]
    );

    // anti-join through the padded side
    let names = fixture.column(
        "SELECT e.name FROM employees e LEFT JOIN departments d ON e.dept_id = d.id WHERE d.id IS NULL ORDER BY 1",
    )?;
    assert_eq!(names, vec![text("dee"), text("eve")]);
    Ok(())
}

#[test]
fn test_right_outer_join() -> Result<()> {
    let fixture = Fixture::new()?;
    let rows = fixture.values(
        "SELECT d.name, e.name FROM employees e RIGHT JOIN departments d ON e.dept_id = d.id ORDER BY d.id, e.id",
    )?;
    assert_eq!(
        pairs(rows),
        vec![
            (text("eng"), text("ann")),
            (text("eng"), text("bob")),
            (text("ops"), text("cid")),
            (text("hr"), SqlValue::Null),
        ]
    );
    Ok(())
}

#[test]
fn test_cross_join_and_comma_list() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(fixture.run("SELECT e.id FROM employees e CROSS JOIN departments d")?.row_count(), 15);
    assert_eq!(fixture.run("SELECT e.id FROM employees e, departments d, nums")?.row_count(), 45);
    assert_eq!(
        fixture.column("SELECT count(*) FROM employees e, departments d WHERE e.dept_id = d.id")?,
        vec![int(3)]
    );
    Ok(())
}

#[test]
fn test_three_way_join() -> Result<()> {
    let fixture = Fixture::new()?;
    let rows = fixture.values(
        "SELECT e.name, d.name, n.b FROM employees e JOIN departments d ON e.dept_id = d.id \
         JOIN nums n ON n.a = e.id ORDER BY e.id",
    )?;
    assert_eq!(
        rows,
        vec![
            vec![text("ann"), text("eng"), SqlValue::Float(1.5)],
            vec![text("bob"), text("eng"), SqlValue::Float(2.5)],
            vec![text("cid"), text("ops"), SqlValue::Null],
        ]
    );
    Ok(())
}

#[test]
fn test_using_with_derived_table() -> Result<()> {
    let fixture = Fixture::new()?;
    let result = fixture.run(
        "SELECT * FROM employees e JOIN (SELECT id AS dept_id, name AS dname FROM departments) d USING (dept_id) \
         ORDER BY e.id",
    )?;
    assert_eq!(result.labels(), vec!["id", "name", "dept_id", "salary", "city", "dname"]);
    assert_eq!(result.row_count(), 3);
    assert_eq!(result.column_values(5), vec![&text("eng"), &text("eng"), &text("ops")]);
    Ok(())
}

#[test]
fn test_natural_join_on_shared_names() -> Result<()> {
    let fixture = Fixture::new()?;
    // employees and departments share id and name; no row agrees on both
    let result = fixture.run("SELECT * FROM employees NATURAL JOIN departments")?;
    assert_eq!(result.labels(), vec!["id", "name", "dept_id", "salary", "city"]);
    assert_eq!(result.row_count(), 0);
    Ok(())
}

#[test]
fn test_sequential_gather_matches_concurrent() -> Result<()> {
    let sql = "SELECT e.name, d.name FROM employees e LEFT JOIN departments d ON e.dept_id = d.id ORDER BY e.id";
    let concurrent = Fixture::with_config(EngineConfig {
        join_channel_capacity: 1,
        ..EngineConfig::default()
    })?;
    let sequential = Fixture::with_config(EngineConfig {
        concurrent_join_gather: false,
        ..EngineConfig::default()
    })?;
    assert_eq!(concurrent.values(sql)?, sequential.values(sql)?);
    Ok(())
}

#[test]
fn test_join_condition_errors_propagate() -> Result<()> {
    let fixture = Fixture::new()?;
    let err = fixture
        .run("SELECT e.name FROM employees e JOIN departments d ON e.salary / 0 > d.id")
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<QueryError>(), Some(QueryError::DivisionByZero)));
    Ok(())
}
