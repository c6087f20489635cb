use anyhow::{anyhow, Result};
use docsql::query::parser::ast::{
    AggregateArg, AggregateFunction, Expression, JoinConstraint, JoinType, LimitClause, Operator, SelectColumn,
    SelectStatement, Statement, TableExpression,
};
use docsql::query::parser::{parse, ParseError, Parser};

fn select(sql: &str) -> Result<SelectStatement> {
    match parse(sql).map_err(|e| anyhow!("Parse error: {:?}", e))? {
        Statement::Select(select) => Ok(*select),
        other => Err(anyhow!("Expected SELECT statement, got {:?}", other)),
    }
}

#[test]
fn test_simple_select_query() -> Result<()> {
    let sql = "SELECT id, name FROM test_table WHERE id > 5";
    let mut parser = Parser::new(sql);

    let statement = parser.parse_statement().map_err(|e| anyhow!("Parse error: {:?}", e))?;

    if let Statement::Select(select) = statement {
        assert_eq!(select.columns.len(), 2);
        assert_eq!(select.from.len(), 1);
        match &select.from[0] {
            TableExpression::Table(table) => assert_eq!(table.name, "test_table"),
            other => panic!("Expected a table, got {:?}", other),
        }
        match select.where_clause {
            Some(Expression::BinaryOp { op, .. }) => assert_eq!(op, Operator::GreaterThan),
            other => panic!("Expected binary operation in WHERE clause, got {:?}", other),
        }
    } else {
        panic!("Expected SELECT statement");
    }

    Ok(())
}

#[test]
fn test_select_without_from() -> Result<()> {
    let select = select("SELECT 1 + 2 AS three, 'x'")?;
    assert!(select.from.is_empty());
    assert!(matches!(&select.columns[0], SelectColumn::Expression { alias: Some(a), .. } if a == "three"));
    Ok(())
}

#[test]
fn test_join_forms() -> Result<()> {
    let select = select("SELECT * FROM a RIGHT JOIN b USING (x, y) STRAIGHT_JOIN c ON b.z = c.z")?;
    let outer = match &select.from[0] {
        TableExpression::Join(join) => join,
        other => panic!("Expected a join, got {:?}", other),
    };
    assert_eq!(outer.kind, JoinType::Straight);
    assert!(matches!(outer.constraint, JoinConstraint::On(_)));
    match &outer.left {
        TableExpression::Join(join) => {
            assert_eq!(join.kind, JoinType::RightOuter);
            assert_eq!(join.constraint, JoinConstraint::Using(vec!["x".to_string(), "y".to_string()]));
        }
        other => panic!("Expected a nested join, got {:?}", other),
    }

    // comma-separated tables stay separate FROM entries
    let select = self::select("SELECT * FROM a, b CROSS JOIN c")?;
    assert_eq!(select.from.len(), 2);
    Ok(())
}

#[test]
fn test_aggregates_in_select_list() -> Result<()> {
    let select = select("SELECT count(*), sum(DISTINCT salary), group_concat(name), std(salary) FROM emp")?;
    let functions: Vec<(AggregateFunction, bool)> = select
        .columns
        .iter()
        .map(|c| match c {
            SelectColumn::Expression {
                expr: Expression::Aggregate { function, distinct, .. },
                ..
            } => (*function, *distinct),
            other => panic!("Expected aggregate, got {:?}", other),
        })
        .collect();
    assert_eq!(
        functions,
        vec![
            (AggregateFunction::Count, false),
            (AggregateFunction::Sum, true),
            (AggregateFunction::GroupConcat, false),
            (AggregateFunction::StdDev, false),
        ]
    );
    assert!(matches!(
        &select.columns[0],
        SelectColumn::Expression { expr: Expression::Aggregate { arg: AggregateArg::Star, .. }, .. }
    ));
    Ok(())
}

#[test]
fn test_limit_forms() -> Result<()> {
    assert_eq!(select("SELECT a FROM t LIMIT 5")?.limit, Some(LimitClause { offset: None, count: 5 }));
    assert_eq!(select("SELECT a FROM t LIMIT 2, 5")?.limit, Some(LimitClause { offset: Some(2), count: 5 }));
    assert_eq!(
        select("SELECT a FROM t LIMIT 5 OFFSET 2")?.limit,
        Some(LimitClause { offset: Some(2), count: 5 })
    );
    Ok(())
}

#[test]
fn test_display_reparses_to_same_statement() -> Result<()> {
    let sql = "SELECT DISTINCT e.name, count(*) AS n FROM test.employees AS e LEFT JOIN departments AS d ON e.dept_id = d.id \
               WHERE e.salary BETWEEN 10 AND 20 AND d.name NOT LIKE 'x%' GROUP BY e.name HAVING n > 1 ORDER BY 2 DESC LIMIT 1, 3";
    let statement = parse(sql)?;
    let reparsed = parse(&statement.to_string())?;
    assert_eq!(statement, reparsed);
    Ok(())
}

#[test]
fn test_union_statement() -> Result<()> {
    let statement = parse("SELECT a FROM t UNION SELECT a FROM u")?;
    assert!(matches!(statement, Statement::Union { all: false, .. }));
    Ok(())
}

#[test]
fn test_parse_errors() -> Result<()> {
    assert!(matches!(parse("SELECT a FROM t WHERE"), Err(ParseError::EndOfInput)));
    assert!(matches!(parse("SELECT a FROM t t2 t3"), Err(ParseError::UnexpectedToken(_))));
    assert!(parse("CREATE TABLE users (id INTEGER)").is_err());
    assert!(parse("SELECT * FROM a FULL JOIN b").is_err());
    Ok(())
}
