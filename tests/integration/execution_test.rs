use std::sync::Arc;

use anyhow::Result;
use docsql::{CancellationToken, EngineConfig, Evaluator, MemoryStore, QueryError, Schema, SimpleConnection, SqlValue};

#[path = "../common/mod.rs"]
mod common;
use common::{int, text, Fixture};

#[test]
fn test_select_without_from() -> Result<()> {
    let fixture = Fixture::new()?;
    let result = fixture.run("SELECT 1 + 2 AS three, 'a', NULL, 7 DIV 2, 7 % 4")?;
    assert_eq!(result.labels(), vec!["three", "'a'", "NULL", "7 DIV 2", "7 % 4"]);
    assert_eq!(
        result.rows(),
        &[vec![int(3), text("a"), SqlValue::Null, int(3), int(3)]]
    );
    Ok(())
}

#[test]
fn test_filter_sort_and_limit() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(
        fixture.column("SELECT name FROM employees WHERE salary >= 100 ORDER BY salary DESC LIMIT 2")?,
        vec![text("bob"), text("cid")]
    );
    assert_eq!(
        fixture.column("SELECT name FROM employees ORDER BY id LIMIT 1, 2")?,
        vec![text("bob"), text("cid")]
    );
    assert_eq!(
        fixture.column("SELECT name FROM employees ORDER BY id LIMIT 2 OFFSET 4")?,
        vec![text("eve")]
    );
    Ok(())
}

#[test]
fn test_nulls_sort_first() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(
        fixture.column("SELECT name FROM employees ORDER BY salary")?,
        vec![text("eve"), text("dee"), text("ann"), text("cid"), text("bob")]
    );
    assert_eq!(
        fixture.column("SELECT name FROM employees ORDER BY salary DESC")?,
        vec![text("bob"), text("cid"), text("ann"), text("dee"), text("eve")]
    );
    Ok(())
}

#[test]
fn test_nested_fields_and_missing_values() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(
        fixture.column("SELECT name FROM employees WHERE city = 'Oslo' ORDER BY name")?,
        vec![text("ann"), text("dee")]
    );
    assert_eq!(
        fixture.column("SELECT name FROM employees WHERE city IS NULL ORDER BY name")?,
        vec![text("cid"), text("eve")]
    );
    let cities = fixture.column("SELECT city FROM employees ORDER BY id")?;
    assert!(cities[2].is_no_value());
    Ok(())
}

#[test]
fn test_three_valued_logic() -> Result<()> {
    let fixture = Fixture::new()?;
    // eve has no salary: neither the predicate nor its negation holds
    assert_eq!(
        fixture.column("SELECT name FROM employees WHERE NOT (salary > 100) ORDER BY name")?,
        vec![text("ann"), text("dee")]
    );
    assert_eq!(
        fixture.column("SELECT name FROM employees WHERE dept_id <> 10 ORDER BY name")?,
        vec![text("cid"), text("eve")]
    );
    assert_eq!(
        fixture.values("SELECT NULL AND FALSE, NULL OR TRUE, NULL AND TRUE, NULL = NULL")?,
        vec![vec![SqlValue::Bool(false), SqlValue::Bool(true), SqlValue::Null, SqlValue::Null]]
    );
    Ok(())
}

#[test]
fn test_subqueries() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(
        fixture.column("SELECT name FROM employees WHERE dept_id IN (SELECT id FROM departments) ORDER BY name")?,
        vec![text("ann"), text("bob"), text("cid")]
    );
    // dee's NULL department makes NOT IN unknown for her
    assert_eq!(
        fixture.column("SELECT name FROM employees WHERE dept_id NOT IN (SELECT id FROM departments)")?,
        vec![text("eve")]
    );
    assert_eq!(
        fixture.column(
            "SELECT d.name FROM departments d WHERE EXISTS (SELECT 1 FROM employees e WHERE e.dept_id = d.id) ORDER BY d.name"
        )?,
        vec![text("eng"), text("ops")]
    );
    assert_eq!(
        fixture.values(
            "SELECT d.name, (SELECT count(*) FROM employees e WHERE e.dept_id = d.id) FROM departments d ORDER BY d.id"
        )?,
        vec![
            vec![text("eng"), int(2)],
            vec![text("ops"), int(1)],
            vec![text("hr"), int(0)],
        ]
    );
    assert!(fixture.run("SELECT (SELECT id FROM departments)").is_err());
    Ok(())
}

#[test]
fn test_derived_table() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(
        fixture.column("SELECT t.total FROM (SELECT sum(salary) AS total FROM employees) t")?,
        vec![int(500)]
    );
    assert_eq!(
        fixture.column("SELECT rich.name FROM (SELECT name, salary FROM employees WHERE salary > 100) rich ORDER BY rich.salary")?,
        vec![text("cid"), text("bob")]
    );
    Ok(())
}

#[test]
fn test_derived_table_round_trip() -> Result<()> {
    let fixture = Fixture::new()?;
    for table in ["employees", "departments", "nums"] {
        let direct = fixture.run(&format!("SELECT * FROM {}", table))?;
        let derived = fixture.run(&format!("SELECT * FROM (SELECT * FROM {}) AS d", table))?;
        assert_eq!(derived.labels(), direct.labels());
        assert_eq!(derived.rows(), direct.rows());
    }
    Ok(())
}

#[test]
fn test_star_follows_schema_order_with_absent_fields() -> Result<()> {
    let schema = Schema::from_json_str(
        r#"{"databases": [{"name": "test", "tables": [{"name": "bar", "columns": [
            {"name": "a", "sql_type": "int"},
            {"name": "b", "sql_type": "int"},
            {"name": "c", "sql_type": "int"},
            {"name": "d", "sql_type": "int"}
        ]}]}]}"#,
    )?;
    // Field order in the documents differs from the declared column order
    let store = MemoryStore::from_json_str(r#"{"test": {"bar": [{"b": 7, "a": 6}, {"c": 17, "a": 16}]}}"#)?;
    let connection = SimpleConnection::new(Arc::new(store)).with_database("test");
    let evaluator = Evaluator::new(Arc::new(schema), EngineConfig::default());

    let (labels, rows) = evaluator.evaluate("", "select * from bar", None, &connection)?;
    assert_eq!(labels, vec!["a", "b", "c", "d"]);
    let rows = rows.collect_result_set()?;
    assert_eq!(
        rows.rows(),
        &[
            vec![int(6), int(7), SqlValue::Null, SqlValue::Null],
            vec![int(16), SqlValue::Null, int(17), SqlValue::Null],
        ]
    );
    assert!(rows.rows()[1][1].is_null());
    Ok(())
}

#[test]
fn test_case_like_and_functions() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(
        fixture.column(
            "SELECT CASE WHEN salary >= 150 THEN 'high' WHEN salary IS NULL THEN 'none' ELSE 'low' END FROM employees ORDER BY id"
        )?,
        vec![text("low"), text("high"), text("high"), text("low"), text("none")]
    );
    assert_eq!(fixture.column("SELECT name FROM employees WHERE name LIKE '_e%'")?, vec![text("dee")]);
    assert_eq!(
        fixture.values("SELECT upper(name), length(name), concat(name, '-', id), coalesce(city, 'n/a') FROM employees WHERE id = 3")?,
        vec![vec![text("CID"), int(3), text("cid-3"), text("n/a")]]
    );
    assert!(matches!(
        fixture.run("SELECT nosuch(1)").unwrap_err().downcast_ref::<QueryError>(),
        Some(QueryError::UnknownFunction(_))
    ));
    Ok(())
}

#[test]
fn test_distinct() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(
        fixture.column("SELECT DISTINCT city FROM employees ORDER BY city")?,
        vec![SqlValue::Null, text("Bergen"), text("Oslo")]
    );
    Ok(())
}

#[test]
fn test_labels_returned_with_rows() -> Result<()> {
    let fixture = Fixture::new()?;
    let (labels, rows) = fixture
        .evaluator
        .evaluate("test", "SELECT e.name AS who, salary FROM employees e", None, &fixture.connection)?;
    assert_eq!(labels, vec!["who".to_string(), "salary".to_string()]);
    assert_eq!(rows.count(), 5);
    Ok(())
}

#[test]
fn test_cancellation() -> Result<()> {
    let fixture = Fixture::new()?;
    let token = CancellationToken::new();
    let (_, mut rows) = fixture.evaluator.evaluate_cancellable(
        "",
        "SELECT name FROM employees",
        None,
        &fixture.connection,
        token.clone(),
    )?;
    assert!(rows.next().transpose()?.is_some());
    token.cancel();
    assert!(matches!(rows.next(), Some(Err(QueryError::Cancelled))));
    assert!(rows.next().is_none());
    assert!(matches!(rows.err(), Some(QueryError::Cancelled)));
    assert!(rows.close().is_ok());
    Ok(())
}

#[test]
fn test_partial_iteration_then_close() -> Result<()> {
    let fixture = Fixture::new()?;
    let (_, mut rows) = fixture.evaluator.evaluate("", "SELECT name FROM employees", None, &fixture.connection)?;
    assert!(rows.next().is_some());
    rows.close()?;
    rows.close()?;
    assert!(rows.next().is_none());
    assert!(rows.err().is_none());
    Ok(())
}

#[test]
fn test_missing_collection_is_empty() -> Result<()> {
    let fixture = Fixture::new()?;
    let empty = SimpleConnection::new(Arc::new(MemoryStore::new())).with_database("test");
    let (labels, rows) = fixture.evaluator.evaluate("", "SELECT a FROM nums", None, &empty)?;
    assert_eq!(labels, vec!["a".to_string()]);
    assert_eq!(rows.count(), 0);
    assert_eq!(fixture.run("SELECT id FROM departments WHERE id > 100")?.row_count(), 0);
    Ok(())
}
