// SELECT Statement Parser Implementation
//
// Parses query expressions: SELECT blocks joined by UNION, FROM clauses with
// joins and derived tables, and the trailing GROUP BY / HAVING / ORDER BY /
// LIMIT clauses.

use super::parser_core::{ParseError, ParseResult, Parser};
use super::parser_expressions::{parse_expression, parse_expression_list};
use crate::query::parser::ast::*;
use crate::query::parser::lexer::TokenType;

/// Parse a query expression: SELECT blocks optionally combined with UNION
pub fn parse_query(parser: &mut Parser) -> ParseResult<Statement> {
    let mut statement = parse_query_term(parser)?;
    while parser.consume_if(&TokenType::UNION) {
        let all = parser.consume_if(&TokenType::ALL);
        if !all {
            parser.consume_if(&TokenType::DISTINCT);
        }
        let right = parse_query_term(parser)?;
        statement = Statement::Union {
            left: Box::new(statement),
            right: Box::new(right),
            all,
        };
    }
    Ok(statement)
}

fn parse_query_term(parser: &mut Parser) -> ParseResult<Statement> {
    if parser.consume_if(&TokenType::LeftParen) {
        let statement = parse_query(parser)?;
        parser.expect_token(TokenType::RightParen)?;
        return Ok(statement);
    }
    Ok(Statement::Select(Box::new(parse_select(parser)?)))
}

/// Parse a single SELECT block
pub fn parse_select(parser: &mut Parser) -> ParseResult<SelectStatement> {
    parser.expect_token(TokenType::SELECT)?;

    let distinct = parser.consume_if(&TokenType::DISTINCT);
    if !distinct {
        parser.consume_if(&TokenType::ALL);
    }

    let columns = parse_select_columns(parser)?;

    let from = if parser.consume_if(&TokenType::FROM) {
        parse_table_list(parser)?
    } else {
        Vec::new()
    };

    let where_clause = if parser.consume_if(&TokenType::WHERE) {
        Some(parse_expression(parser)?)
    } else {
        None
    };

    let group_by = if parser.consume_if(&TokenType::GROUP) {
        parser.expect_token(TokenType::BY)?;
        parse_expression_list(parser)?
    } else {
        Vec::new()
    };

    let having = if parser.consume_if(&TokenType::HAVING) {
        Some(parse_expression(parser)?)
    } else {
        None
    };

    let order_by = if parser.consume_if(&TokenType::ORDER) {
        parser.expect_token(TokenType::BY)?;
        parse_order_by(parser)?
    } else {
        Vec::new()
    };

    let limit = if parser.consume_if(&TokenType::LIMIT) {
        Some(parse_limit(parser)?)
    } else {
        None
    };

    Ok(SelectStatement {
        distinct,
        columns,
        from,
        where_clause,
        group_by,
        having,
        order_by,
        limit,
    })
}

fn parse_select_columns(parser: &mut Parser) -> ParseResult<Vec<SelectColumn>> {
    let mut columns = vec![parse_select_column(parser)?];
    while parser.consume_if(&TokenType::COMMA) {
        columns.push(parse_select_column(parser)?);
    }
    Ok(columns)
}

fn parse_select_column(parser: &mut Parser) -> ParseResult<SelectColumn> {
    if parser.consume_if(&TokenType::MULTIPLY) {
        return Ok(SelectColumn::Wildcard);
    }

    // t.*
    if matches!(parser.current_token_type(), Some(TokenType::IDENTIFIER(_)))
        && matches!(parser.peek_token_type(1), Some(TokenType::DOT))
        && matches!(parser.peek_token_type(2), Some(TokenType::MULTIPLY))
    {
        let table = parser.parse_identifier()?;
        parser.next_token();
        parser.next_token();
        return Ok(SelectColumn::QualifiedWildcard(table));
    }

    let expr = parse_expression(parser)?;
    let alias = parse_alias(parser)?;
    Ok(SelectColumn::Expression { expr, alias })
}

/// Optional `[AS] alias`
fn parse_alias(parser: &mut Parser) -> ParseResult<Option<String>> {
    let explicit = parser.consume_if(&TokenType::AS);
    match parser.current_token_type().cloned() {
        Some(TokenType::IDENTIFIER(name)) => {
            parser.next_token();
            Ok(Some(name))
        }
        Some(TokenType::STRING(name)) => {
            parser.next_token();
            Ok(Some(name))
        }
        _ if explicit => Err(ParseError::InvalidSyntax("expected alias after AS".to_string())),
        _ => Ok(None),
    }
}

/// Comma-separated table references
fn parse_table_list(parser: &mut Parser) -> ParseResult<Vec<TableExpression>> {
    let mut tables = vec![parse_table_reference(parser)?];
    while parser.consume_if(&TokenType::COMMA) {
        tables.push(parse_table_reference(parser)?);
    }
    Ok(tables)
}

/// A table factor followed by any number of joins
fn parse_table_reference(parser: &mut Parser) -> ParseResult<TableExpression> {
    let mut left = parse_table_factor(parser)?;

    while let Some(kind) = parse_join_keyword(parser)? {
        let right = parse_table_factor(parser)?;
        let constraint = if kind == JoinType::Natural {
            JoinConstraint::None
        } else if parser.consume_if(&TokenType::ON) {
            JoinConstraint::On(parse_expression(parser)?)
        } else if parser.consume_if(&TokenType::USING) {
            parser.expect_token(TokenType::LeftParen)?;
            let mut names = vec![parser.parse_identifier()?];
            while parser.consume_if(&TokenType::COMMA) {
                names.push(parser.parse_identifier()?);
            }
            parser.expect_token(TokenType::RightParen)?;
            JoinConstraint::Using(names)
        } else if matches!(kind, JoinType::LeftOuter | JoinType::RightOuter | JoinType::FullOuter) {
            return Err(ParseError::InvalidSyntax("outer join requires ON or USING".to_string()));
        } else {
            JoinConstraint::None
        };

        left = TableExpression::Join(Box::new(JoinClause { left, right, kind, constraint }));
    }

    Ok(left)
}

fn parse_join_keyword(parser: &mut Parser) -> ParseResult<Option<JoinType>> {
    let kind = match parser.current_token_type() {
        Some(TokenType::JOIN) => JoinType::Inner,
        Some(TokenType::INNER) => JoinType::Inner,
        Some(TokenType::CROSS) => JoinType::Cross,
        Some(TokenType::StraightJoin) => {
            parser.next_token();
            return Ok(Some(JoinType::Straight));
        }
        Some(TokenType::LEFT) => JoinType::LeftOuter,
        Some(TokenType::RIGHT) => JoinType::RightOuter,
        Some(TokenType::FULL) => JoinType::FullOuter,
        Some(TokenType::NATURAL) => JoinType::Natural,
        _ => return Ok(None),
    };

    if !parser.current_token_is(&TokenType::JOIN) {
        parser.next_token();
        if matches!(kind, JoinType::LeftOuter | JoinType::RightOuter | JoinType::FullOuter) {
            parser.consume_if(&TokenType::OUTER);
        }
        if kind == JoinType::Natural {
            parser.consume_if(&TokenType::INNER);
        }
    }
    parser.expect_token(TokenType::JOIN)?;
    Ok(Some(kind))
}

fn parse_table_factor(parser: &mut Parser) -> ParseResult<TableExpression> {
    if parser.consume_if(&TokenType::LeftParen) {
        if parser.current_token_is(&TokenType::SELECT) {
            let query = parse_query(parser)?;
            parser.expect_token(TokenType::RightParen)?;
            let alias = parse_alias(parser)?;
            return Ok(TableExpression::Subquery { query: Box::new(query), alias });
        }
        let tables = parse_table_list(parser)?;
        parser.expect_token(TokenType::RightParen)?;
        return Ok(TableExpression::Parenthesized(tables));
    }

    let first = parser.parse_identifier()?;
    let mut table = if parser.consume_if(&TokenType::DOT) {
        let name = parser.parse_identifier()?;
        let mut table = TableName::new(name);
        table.database = Some(first);
        table
    } else {
        TableName::new(first)
    };
    table.alias = parse_alias(parser)?;
    Ok(TableExpression::Table(table))
}

fn parse_order_by(parser: &mut Parser) -> ParseResult<Vec<OrderByExpr>> {
    let mut items = Vec::new();
    loop {
        let expr = parse_expression(parser)?;
        let descending = if parser.consume_if(&TokenType::DESC) {
            true
        } else {
            parser.consume_if(&TokenType::ASC);
            false
        };
        items.push(OrderByExpr { expr, descending });
        if !parser.consume_if(&TokenType::COMMA) {
            return Ok(items);
        }
    }
}

/// `LIMIT n`, `LIMIT offset, n` or `LIMIT n OFFSET offset`
fn parse_limit(parser: &mut Parser) -> ParseResult<LimitClause> {
    let first = parse_limit_number(parser)?;
    if parser.consume_if(&TokenType::COMMA) {
        let count = parse_limit_number(parser)?;
        return Ok(LimitClause { offset: Some(first), count });
    }
    if parser.consume_if(&TokenType::OFFSET) {
        let offset = parse_limit_number(parser)?;
        return Ok(LimitClause { offset: Some(offset), count: first });
    }
    Ok(LimitClause { offset: None, count: first })
}

fn parse_limit_number(parser: &mut Parser) -> ParseResult<u64> {
    match parser.current_token_type().cloned() {
        Some(TokenType::INTEGER(value)) if value >= 0 => {
            parser.next_token();
            Ok(value as u64)
        }
        Some(TokenType::UNSIGNED(value)) => {
            parser.next_token();
            Ok(value)
        }
        Some(TokenType::INTEGER(value)) => Err(ParseError::InvalidLiteral(format!("negative limit {}", value))),
        _ => Err(parser.unexpected()),
    }
}
