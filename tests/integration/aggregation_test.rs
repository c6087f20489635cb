use anyhow::Result;
use bson::doc;
use docsql::{EngineConfig, QueryError, SqlType, SqlValue};

#[path = "../common/mod.rs"]
mod common;
use common::{int, text, Fixture};

#[test]
fn test_group_by_with_aggregates() -> Result<()> {
    let fixture = Fixture::new()?;
    let rows = fixture.values(
        "SELECT dept_id, count(*), count(salary), sum(salary), avg(salary), max(salary), group_concat(name) \
         FROM employees GROUP BY dept_id ORDER BY dept_id",
    )?;
    assert_eq!(
        rows,
        vec![
            vec![SqlValue::Null, int(1), int(1), int(50), SqlValue::Float(50.0), int(50), text("dee")],
            vec![int(10), int(2), int(2), int(300), SqlValue::Float(150.0), int(200), text("ann,bob")],
            vec![int(20), int(1), int(1), int(150), SqlValue::Float(150.0), int(150), text("cid")],
            // eve has no salary
            vec![int(30), int(1), int(0), int(0), SqlValue::Null, SqlValue::Null, text("eve")],
        ]
    );
    Ok(())
}

#[test]
fn test_std_and_min() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(
        fixture.values("SELECT std(salary), min(salary), min(name) FROM employees WHERE dept_id = 10")?,
        vec![vec![SqlValue::Float(50.0), int(100), text("ann")]]
    );
    Ok(())
}

#[test]
fn test_having_sees_select_aliases() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(
        fixture.values("SELECT dept_id, count(*) AS n FROM employees GROUP BY dept_id HAVING n > 1")?,
        vec![vec![int(10), int(2)]]
    );
    assert_eq!(
        fixture.column("SELECT dept_id FROM employees GROUP BY dept_id HAVING sum(salary) >= 150 ORDER BY dept_id")?,
        vec![int(10), int(20)]
    );
    Ok(())
}

#[test]
fn test_aggregate_over_empty_input() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(
        fixture.values("SELECT count(*), sum(salary), avg(salary), max(name) FROM employees WHERE salary > 1000")?,
        vec![vec![int(0), SqlValue::Null, SqlValue::Null, SqlValue::Null]]
    );
    // grouped queries produce no groups at all
    assert_eq!(
        fixture.run("SELECT dept_id, count(*) FROM employees WHERE salary > 1000 GROUP BY dept_id")?.row_count(),
        0
    );
    Ok(())
}

#[test]
fn test_distinct_aggregates() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(
        fixture.values("SELECT count(DISTINCT city), count(DISTINCT dept_id), sum(DISTINCT dept_id) FROM employees")?,
        vec![vec![int(2), int(3), int(60)]]
    );
    Ok(())
}

#[test]
fn test_sum_types_match_values() -> Result<()> {
    let fixture = Fixture::new()?;
    let result = fixture.run("SELECT sum(a), sum(DISTINCT a), sum(b) FROM nums")?;
    let types: Vec<SqlType> = result.columns().iter().map(|c| c.sql_type).collect();
    assert_eq!(types, vec![SqlType::Int, SqlType::Int, SqlType::Float]);
    assert_eq!(result.rows(), &[vec![int(6), int(6), SqlValue::Float(4.0)]]);
    for (value, column) in result.rows()[0].iter().zip(result.columns()) {
        assert_eq!(value.sql_type(), column.sql_type);
    }
    Ok(())
}

#[test]
fn test_count_skips_null_and_missing_fields() -> Result<()> {
    let fixture = Fixture::new()?;
    // dee has a null dept_id, cid and eve have no city, eve has no salary
    assert_eq!(
        fixture.values("SELECT count(*), count(salary), count(city), count(dept_id), count(name) FROM employees")?,
        vec![vec![int(5), int(4), int(3), int(4), int(5)]]
    );
    Ok(())
}

#[test]
fn test_distinct_sum_ignores_order_and_duplicates() -> Result<()> {
    let fixture = Fixture::new()?;
    let query = "SELECT sum(DISTINCT salary), count(DISTINCT salary) FROM employees";
    let expected = vec![vec![int(500), int(4)]];
    assert_eq!(fixture.values(query)?, expected);
    assert_eq!(
        fixture.values(
            "SELECT sum(DISTINCT salary), count(DISTINCT salary) \
             FROM (SELECT salary FROM employees ORDER BY salary DESC) AS s"
        )?,
        expected
    );

    fixture.store.insert(
        "test",
        "emp",
        vec![
            doc! { "_id": 6, "name": "fay", "salary": 200 },
            doc! { "_id": 7, "name": "gus", "salary": 50 },
            doc! { "_id": 8, "name": "hal" },
        ],
    );
    assert_eq!(fixture.values(query)?, expected);
    assert_eq!(fixture.column("SELECT sum(salary) FROM employees")?, vec![int(750)]);
    Ok(())
}

#[test]
fn test_group_by_ordinal_and_alias() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(
        fixture.values("SELECT city, count(*) FROM employees GROUP BY 1 ORDER BY 1")?,
        vec![
            vec![SqlValue::Null, int(2)],
            vec![text("Bergen"), int(1)],
            vec![text("Oslo"), int(2)],
        ]
    );
    assert_eq!(
        fixture.column("SELECT upper(city) AS town FROM employees GROUP BY town ORDER BY town DESC")?,
        vec![text("OSLO"), text("BERGEN"), SqlValue::Null]
    );
    Ok(())
}

#[test]
fn test_order_by_aggregate() -> Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(
        fixture.values("SELECT dept_id, sum(salary) AS total FROM employees GROUP BY dept_id ORDER BY total DESC")?,
        vec![
            vec![int(10), int(300)],
            vec![int(20), int(150)],
            vec![SqlValue::Null, int(50)],
            vec![int(30), int(0)],
        ]
    );
    Ok(())
}

#[test]
fn test_grouping_errors() -> Result<()> {
    let fixture = Fixture::new()?;
    let err = fixture
        .run("SELECT count(*) AS n FROM employees GROUP BY n")
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<QueryError>(), Some(QueryError::InvalidAggregate(_))));

    let err = fixture
        .run("SELECT name FROM employees GROUP BY nope")
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<QueryError>(), Some(QueryError::GroupTermNotInScope(_))));
    Ok(())
}

#[test]
fn test_group_row_cap() -> Result<()> {
    let fixture = Fixture::with_config(EngineConfig {
        max_group_rows: Some(3),
        ..EngineConfig::default()
    })?;
    let err = fixture.run("SELECT count(*) FROM employees").unwrap_err();
    assert!(matches!(err.downcast_ref::<QueryError>(), Some(QueryError::Execution(_))));
    assert_eq!(fixture.column("SELECT count(*) FROM departments")?, vec![int(3)]);
    Ok(())
}
