use std::sync::Arc;

use anyhow::{anyhow, Result};
use bson::{doc, Bson, Document};
use docsql::{EngineConfig, Evaluator, MemoryStore, Schema, SimpleConnection, SqlValue};

#[path = "../common/mod.rs"]
mod common;
use common::{int, text, Fixture};

/// Run `sql` and return the filter the employees collection received
fn emp_filter(fixture: &Fixture, sql: &str) -> Result<(Vec<SqlValue>, Document)> {
    let values = fixture.column(sql)?;
    let (_, filter) = fixture
        .store
        .find_log()
        .into_iter()
        .rev()
        .find(|(collection, _)| collection == "emp")
        .ok_or_else(|| anyhow!("employees were never scanned"))?;
    Ok((values, filter))
}

fn names(values: &[&str]) -> Vec<SqlValue> {
    values.iter().map(|v| text(v)).collect()
}

#[test]
fn test_negated_comparison() -> Result<()> {
    let fixture = Fixture::new()?;
    let (values, filter) = emp_filter(&fixture, "SELECT name FROM employees WHERE NOT (salary > 100)")?;
    assert_eq!(filter, doc! { "salary": { "$lte": 100_i64 } });
    assert_eq!(values, names(&["ann", "dee"]));

    let (values, filter) = emp_filter(&fixture, "SELECT name FROM employees WHERE dept_id <> 10")?;
    assert_eq!(filter, doc! { "dept_id": { "$nin": [10_i64, Bson::Null] } });
    assert_eq!(values, names(&["cid", "eve"]));
    Ok(())
}

#[test]
fn test_in_lists() -> Result<()> {
    let fixture = Fixture::new()?;
    let (values, filter) = emp_filter(&fixture, "SELECT name FROM employees WHERE dept_id IN (10, 20)")?;
    assert_eq!(filter, doc! { "dept_id": { "$in": [10_i64, 20_i64] } });
    assert_eq!(values, names(&["ann", "bob", "cid"]));

    let (values, filter) = emp_filter(&fixture, "SELECT name FROM employees WHERE dept_id NOT IN (10, 20)")?;
    assert_eq!(filter, doc! { "dept_id": { "$nin": [10_i64, 20_i64, Bson::Null] } });
    assert_eq!(values, names(&["eve"]));
    Ok(())
}

#[test]
fn test_between() -> Result<()> {
    let fixture = Fixture::new()?;
    let (values, filter) = emp_filter(&fixture, "SELECT name FROM employees WHERE salary BETWEEN 100 AND 150")?;
    assert_eq!(filter, doc! { "salary": { "$gte": 100_i64, "$lte": 150_i64 } });
    assert_eq!(values, names(&["ann", "cid"]));

    let (values, filter) = emp_filter(&fixture, "SELECT name FROM employees WHERE salary NOT BETWEEN 100 AND 150")?;
    assert_eq!(
        filter,
        doc! { "$or": [ { "salary": { "$lt": 100_i64 } }, { "salary": { "$gt": 150_i64 } } ] }
    );
    assert_eq!(values, names(&["bob", "dee"]));
    Ok(())
}

#[test]
fn test_like_and_null_checks() -> Result<()> {
    let fixture = Fixture::new()?;
    // LIKE is evaluated in memory
    let (values, filter) = emp_filter(&fixture, "SELECT name FROM employees WHERE name LIKE 'b%'")?;
    assert_eq!(filter, Document::new());
    assert_eq!(values, names(&["bob"]));

    let (values, filter) = emp_filter(&fixture, "SELECT name FROM employees WHERE name NOT LIKE 'b%'")?;
    assert_eq!(filter, Document::new());
    assert_eq!(values, names(&["ann", "cid", "dee", "eve"]));

    let (values, filter) = emp_filter(&fixture, "SELECT name FROM employees WHERE city IS NOT NULL")?;
    assert_eq!(filter, doc! { "address.city": { "$ne": Bson::Null } });
    assert_eq!(values, names(&["ann", "bob", "dee"]));
    Ok(())
}

#[test]
fn test_conjunction_and_disjunction() -> Result<()> {
    let fixture = Fixture::new()?;
    let (values, filter) = emp_filter(
        &fixture,
        "SELECT name FROM employees WHERE salary >= 100 AND (city = 'Oslo' OR city = 'Bergen')",
    )?;
    assert_eq!(
        filter,
        doc! { "$and": [
            { "salary": { "$gte": 100_i64 } },
            { "$or": [ { "address.city": { "$eq": "Oslo" } }, { "address.city": { "$eq": "Bergen" } } ] }
        ] }
    );
    assert_eq!(values, names(&["ann", "bob"]));
    Ok(())
}

#[test]
fn test_residual_conjuncts() -> Result<()> {
    let fixture = Fixture::new()?;
    let (values, filter) = emp_filter(
        &fixture,
        "SELECT name FROM employees WHERE salary * 2 > 250 AND dept_id = 10",
    )?;
    assert_eq!(filter, doc! { "dept_id": { "$eq": 10_i64 } });
    assert_eq!(values, names(&["bob"]));
    Ok(())
}

#[test]
fn test_results_match_without_pushdown() -> Result<()> {
    let pushed = Fixture::new()?;
    let in_memory = Fixture::with_config(EngineConfig {
        pushdown: false,
        ..EngineConfig::default()
    })?;
    let queries = [
        "SELECT name FROM employees WHERE NOT (salary > 100 OR city = 'Oslo')",
        "SELECT name FROM employees WHERE dept_id NOT IN (10, 30)",
        "SELECT name FROM employees WHERE salary NOT BETWEEN 60 AND 150",
        "SELECT name FROM employees WHERE city IS NULL AND name LIKE '%e%'",
        "SELECT name FROM employees WHERE NOT (dept_id IS NULL) AND id >= 2",
        "SELECT name FROM employees WHERE 100 < salary",
    ];
    for query in queries {
        assert_eq!(pushed.values(query)?, in_memory.values(query)?, "{}", query);
    }
    for (_, filter) in in_memory.store.find_log() {
        assert_eq!(filter, Document::new());
    }
    Ok(())
}

const EVENTS_SCHEMA: &str = r#"{
    "databases": [{
        "name": "test",
        "tables": [{
            "name": "ev",
            "columns": [
                {"name": "id", "field": "_id", "sql_type": "int"},
                {"name": "ts", "sql_type": "timestamp"},
                {"name": "code", "sql_type": "varchar"},
                {"name": "owner", "sql_type": "objectid"}
            ]
        }]
    }]
}"#;

// Values stored in a different form than their column type
const EVENTS_DATA: &str = r#"{
    "test": {
        "ev": [
            {"_id": 1, "ts": "2021-05-01 10:00:00", "code": 123, "owner": "5f1d7e1c2a3b4c5d6e7f8091"},
            {"_id": 2, "ts": "2019-01-01 00:00:00", "code": "abc", "owner": {"$oid": "5f1d7e1c2a3b4c5d6e7f8092"}}
        ]
    }
}"#;

#[test]
fn test_mixed_representations_match_without_pushdown() -> Result<()> {
    let store = Arc::new(MemoryStore::from_json_str(EVENTS_DATA)?);
    let connection = SimpleConnection::new(store.clone()).with_database("test");
    let schema = Arc::new(Schema::from_json_str(EVENTS_SCHEMA)?);
    let ids = |pushdown: bool, sql: &str| -> Result<Vec<Vec<SqlValue>>> {
        let evaluator = Evaluator::new(schema.clone(), EngineConfig { pushdown, ..EngineConfig::default() });
        let (_, rows) = evaluator.evaluate("", sql, None, &connection)?;
        Ok(rows.collect_result_set()?.rows().to_vec())
    };

    let queries = [
        ("SELECT id FROM ev WHERE ts > '2020-01-01 00:00:00'", vec![vec![int(1)]]),
        ("SELECT id FROM ev WHERE ts BETWEEN '2018-06-01' AND '2019-06-01'", vec![vec![int(2)]]),
        ("SELECT id FROM ev WHERE code LIKE '1%'", vec![vec![int(1)]]),
        ("SELECT id FROM ev WHERE owner = '5f1d7e1c2a3b4c5d6e7f8091'", vec![vec![int(1)]]),
        ("SELECT id FROM ev WHERE owner IN ('5f1d7e1c2a3b4c5d6e7f8092')", vec![vec![int(2)]]),
    ];
    for (query, expected) in queries {
        assert_eq!(ids(true, query)?, expected, "{}", query);
        assert_eq!(ids(false, query)?, expected, "{}", query);
    }
    for (_, filter) in store.find_log() {
        assert_eq!(filter, Document::new());
    }
    Ok(())
}
