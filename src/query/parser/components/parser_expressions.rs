// Expression Parser Implementation
//
// Precedence-climbing parser for SQL expressions. Levels from loosest to
// tightest: OR, XOR, AND, NOT, comparison and predicates, additive,
// multiplicative, unary.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::parser_core::{ParseError, ParseResult, Parser};
use super::parser_select::parse_query;
use crate::query::executor::value::{parse_date, parse_timestamp};
use crate::query::parser::ast::*;
use crate::query::parser::lexer::TokenType;

const NOT_PRECEDENCE: u8 = 4;
const COMPARISON_PRECEDENCE: u8 = 5;
const ADDITIVE_PRECEDENCE: u8 = 6;
const UNARY_PRECEDENCE: u8 = 8;

/// Parse a full expression
pub fn parse_expression(parser: &mut Parser) -> ParseResult<Expression> {
    parse_expression_with_precedence(parser, 0)
}

/// Parse an expression whose operators bind at least as tight as `min_precedence`
pub fn parse_expression_with_precedence(parser: &mut Parser, min_precedence: u8) -> ParseResult<Expression> {
    let mut left = parse_prefix_expression(parser)?;

    loop {
        if COMPARISON_PRECEDENCE >= min_precedence {
            if let Some(expr) = parse_predicate_suffix(parser, &left)? {
                left = expr;
                continue;
            }
        }

        let op = match current_binary_operator(parser) {
            Some(op) if op.precedence() >= min_precedence => op,
            _ => break,
        };
        parser.next_token();
        let right = parse_expression_with_precedence(parser, op.precedence() + 1)?;
        left = Expression::binary(left, op, right);
    }

    Ok(left)
}

fn current_binary_operator(parser: &Parser) -> Option<Operator> {
    let op = match parser.current_token_type()? {
        TokenType::OR | TokenType::LogicalOr => Operator::Or,
        TokenType::XOR => Operator::Xor,
        TokenType::AND | TokenType::LogicalAnd => Operator::And,
        TokenType::EQUALS => Operator::Equals,
        TokenType::NotEqual => Operator::NotEquals,
        TokenType::LessThan => Operator::LessThan,
        TokenType::GreaterThan => Operator::GreaterThan,
        TokenType::LessEqual => Operator::LessEquals,
        TokenType::GreaterEqual => Operator::GreaterEquals,
        TokenType::PLUS => Operator::Plus,
        TokenType::MINUS => Operator::Minus,
        TokenType::MULTIPLY => Operator::Multiply,
        TokenType::DIVIDE => Operator::Divide,
        TokenType::MODULO => Operator::Modulo,
        TokenType::IDENTIFIER(word) if word.eq_ignore_ascii_case("div") => Operator::IntDivide,
        TokenType::IDENTIFIER(word) if word.eq_ignore_ascii_case("mod") => Operator::Modulo,
        _ => return None,
    };
    Some(op)
}

/// IS, IN, BETWEEN and LIKE with their NOT forms. Returns `None` when the
/// current token does not start a predicate.
fn parse_predicate_suffix(parser: &mut Parser, left: &Expression) -> ParseResult<Option<Expression>> {
    let negated = match parser.current_token_type() {
        Some(TokenType::IS) => return parse_is(parser, left).map(Some),
        Some(TokenType::NOT)
            if matches!(
                parser.peek_token_type(1),
                Some(TokenType::IN | TokenType::BETWEEN | TokenType::LIKE)
            ) =>
        {
            parser.next_token();
            true
        }
        Some(TokenType::IN | TokenType::BETWEEN | TokenType::LIKE) => false,
        _ => return Ok(None),
    };

    let expr = Box::new(left.clone());
    match parser.next_token().map(|t| t.token_type) {
        Some(TokenType::IN) => {
            parser.expect_token(TokenType::LeftParen)?;
            if parser.current_token_is(&TokenType::SELECT) {
                let query = parse_query(parser)?;
                parser.expect_token(TokenType::RightParen)?;
                return Ok(Some(Expression::InSubquery { expr, query: Box::new(query), negated }));
            }
            let list = parse_expression_list(parser)?;
            parser.expect_token(TokenType::RightParen)?;
            Ok(Some(Expression::InList { expr, list, negated }))
        }
        Some(TokenType::BETWEEN) => {
            let low = parse_expression_with_precedence(parser, ADDITIVE_PRECEDENCE)?;
            parser.expect_token(TokenType::AND)?;
            let high = parse_expression_with_precedence(parser, ADDITIVE_PRECEDENCE)?;
            Ok(Some(Expression::Between {
                expr,
                low: Box::new(low),
                high: Box::new(high),
                negated,
            }))
        }
        Some(TokenType::LIKE) => {
            let pattern = parse_expression_with_precedence(parser, ADDITIVE_PRECEDENCE)?;
            let escape = if parser.consume_if(&TokenType::ESCAPE) {
                Some(Box::new(parse_prefix_expression(parser)?))
            } else {
                None
            };
            Ok(Some(Expression::Like {
                expr,
                pattern: Box::new(pattern),
                escape,
                negated,
            }))
        }
        _ => Err(parser.unexpected()),
    }
}

fn parse_is(parser: &mut Parser, left: &Expression) -> ParseResult<Expression> {
    parser.expect_token(TokenType::IS)?;
    let negated = parser.consume_if(&TokenType::NOT);
    let expr = Box::new(left.clone());
    match parser.current_token_type() {
        Some(TokenType::NULL) => {
            parser.next_token();
            Ok(Expression::IsNull { expr, negated })
        }
        Some(TokenType::TRUE | TokenType::FALSE | TokenType::UNKNOWN) => {
            let value = match parser.next_token().map(|t| t.token_type) {
                Some(TokenType::TRUE) => Some(true),
                Some(TokenType::FALSE) => Some(false),
                _ => None,
            };
            Ok(Expression::IsBool { expr, value, negated })
        }
        _ => Err(ParseError::InvalidSyntax(
            "expected NULL, TRUE, FALSE or UNKNOWN after IS".to_string(),
        )),
    }
}

/// Comma-separated expressions
pub fn parse_expression_list(parser: &mut Parser) -> ParseResult<Vec<Expression>> {
    let mut list = vec![parse_expression(parser)?];
    while parser.consume_if(&TokenType::COMMA) {
        list.push(parse_expression(parser)?);
    }
    Ok(list)
}

/// Parse a prefix expression (literal, identifier, unary operator, ...)
fn parse_prefix_expression(parser: &mut Parser) -> ParseResult<Expression> {
    let token_type = match parser.current_token_type() {
        Some(t) => t.clone(),
        None => return Err(ParseError::EndOfInput),
    };

    match token_type {
        TokenType::NOT => {
            parser.next_token();
            let operand = parse_expression_with_precedence(parser, NOT_PRECEDENCE)?;
            Ok(Expression::UnaryOp { op: UnaryOperator::Not, expr: Box::new(operand) })
        }
        TokenType::BANG => {
            parser.next_token();
            let operand = parse_expression_with_precedence(parser, UNARY_PRECEDENCE)?;
            Ok(Expression::UnaryOp { op: UnaryOperator::Not, expr: Box::new(operand) })
        }
        TokenType::MINUS | TokenType::PLUS => {
            parser.next_token();
            let operand = parse_expression_with_precedence(parser, UNARY_PRECEDENCE)?;
            let op = if token_type == TokenType::MINUS { UnaryOperator::Minus } else { UnaryOperator::Plus };
            Ok(Expression::UnaryOp { op, expr: Box::new(operand) })
        }
        TokenType::INTEGER(value) => {
            parser.next_token();
            Ok(Expression::Literal(Value::Integer(value)))
        }
        TokenType::UNSIGNED(value) => {
            parser.next_token();
            Ok(Expression::Literal(Value::Unsigned(value)))
        }
        TokenType::DECIMAL(text) => {
            parser.next_token();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map(|d| Expression::Literal(Value::Decimal(d)))
                .or_else(|_| {
                    text.parse::<f64>()
                        .map(|f| Expression::Literal(Value::Float(f)))
                        .map_err(|_| ParseError::InvalidLiteral(text.clone()))
                })
        }
        TokenType::FLOAT(value) => {
            parser.next_token();
            Ok(Expression::Literal(Value::Float(value)))
        }
        TokenType::STRING(value) => {
            parser.next_token();
            Ok(Expression::Literal(Value::String(value)))
        }
        TokenType::NULL => {
            parser.next_token();
            Ok(Expression::Literal(Value::Null))
        }
        TokenType::TRUE | TokenType::FALSE => {
            parser.next_token();
            Ok(Expression::Literal(Value::Boolean(token_type == TokenType::TRUE)))
        }
        TokenType::EXISTS => {
            parser.next_token();
            parser.expect_token(TokenType::LeftParen)?;
            let query = parse_query(parser)?;
            parser.expect_token(TokenType::RightParen)?;
            Ok(Expression::Exists { query: Box::new(query), negated: false })
        }
        TokenType::CASE => parse_case(parser),
        TokenType::LeftParen => {
            parser.next_token();
            if parser.current_token_is(&TokenType::SELECT) {
                let query = parse_query(parser)?;
                parser.expect_token(TokenType::RightParen)?;
                return Ok(Expression::Subquery(Box::new(query)));
            }
            let mut items = parse_expression_list(parser)?;
            parser.expect_token(TokenType::RightParen)?;
            if items.len() == 1 {
                Ok(items.remove(0))
            } else {
                Ok(Expression::Tuple(items))
            }
        }
        TokenType::IDENTIFIER(name) => parse_identifier_expression(parser, name),
        // Keyword-named functions such as LEFT(...) are not supported
        _ => Err(parser.unexpected()),
    }
}

fn parse_identifier_expression(parser: &mut Parser, name: String) -> ParseResult<Expression> {
    // Typed temporal literals: DATE '2020-01-01', TIMESTAMP '...'
    if let Some(TokenType::STRING(text)) = parser.peek_token_type(1).cloned() {
        if name.eq_ignore_ascii_case("date") {
            parser.next_token();
            parser.next_token();
            return parse_date(&text)
                .map(|d| Expression::Literal(Value::Date(d)))
                .ok_or(ParseError::InvalidLiteral(format!("DATE '{}'", text)));
        }
        if name.eq_ignore_ascii_case("timestamp") || name.eq_ignore_ascii_case("datetime") {
            parser.next_token();
            parser.next_token();
            return parse_timestamp(&text)
                .map(|ts| Expression::Literal(Value::Timestamp(ts)))
                .ok_or(ParseError::InvalidLiteral(format!("TIMESTAMP '{}'", text)));
        }
    }

    parser.next_token();

    if parser.current_token_is(&TokenType::LeftParen) {
        parser.next_token();
        return parse_function_call(parser, name);
    }

    if parser.consume_if(&TokenType::DOT) {
        let column = parser.parse_identifier()?;
        return Ok(Expression::column(Some(&name), &column));
    }

    Ok(Expression::column(None, &name))
}

/// Arguments after the opening parenthesis of a call
fn parse_function_call(parser: &mut Parser, name: String) -> ParseResult<Expression> {
    if let Some(function) = AggregateFunction::from_name(&name) {
        let distinct = parser.consume_if(&TokenType::DISTINCT);
        if !distinct {
            parser.consume_if(&TokenType::ALL);
        }
        let arg = if parser.consume_if(&TokenType::MULTIPLY) {
            AggregateArg::Star
        } else {
            let args = parse_expression_list(parser)?;
            let arg = if args.len() == 1 {
                args.into_iter().next().ok_or(ParseError::EndOfInput)?
            } else {
                Expression::Tuple(args)
            };
            AggregateArg::Expr(Box::new(arg))
        };
        parser.expect_token(TokenType::RightParen)?;
        return Ok(Expression::Aggregate { function, arg, distinct });
    }

    let args = if parser.current_token_is(&TokenType::RightParen) {
        Vec::new()
    } else {
        parse_expression_list(parser)?
    };
    parser.expect_token(TokenType::RightParen)?;
    Ok(Expression::Function { name: name.to_lowercase(), args })
}

fn parse_case(parser: &mut Parser) -> ParseResult<Expression> {
    parser.expect_token(TokenType::CASE)?;
    let operand = if parser.current_token_is(&TokenType::WHEN) {
        None
    } else {
        Some(Box::new(parse_expression(parser)?))
    };

    let mut when_then = Vec::new();
    while parser.consume_if(&TokenType::WHEN) {
        let when = parse_expression(parser)?;
        parser.expect_token(TokenType::THEN)?;
        let then = parse_expression(parser)?;
        when_then.push((when, then));
    }
    if when_then.is_empty() {
        return Err(ParseError::InvalidSyntax("CASE requires at least one WHEN".to_string()));
    }

    let else_result = if parser.consume_if(&TokenType::ELSE) {
        Some(Box::new(parse_expression(parser)?))
    } else {
        None
    };
    parser.expect_token(TokenType::END)?;
    Ok(Expression::Case { operand, when_then, else_result })
}
