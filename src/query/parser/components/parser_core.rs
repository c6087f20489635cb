// Core Parser Implementation
//
// Token cursor, error type and small helpers shared by the expression and
// SELECT parsers.

use thiserror::Error;

use crate::query::parser::ast::Statement;
use crate::query::parser::lexer::{Lexer, Token, TokenType};

/// SQL Parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected token {0}")]
    UnexpectedToken(Token),
    #[error("expected {0:?}, found {1}")]
    ExpectedToken(TokenType, Token),
    #[error("invalid literal: {0}")]
    InvalidLiteral(String),
    #[error("unexpected end of input")]
    EndOfInput,
    #[error("not yet implemented: {0}")]
    NotYetImplemented(String),
    #[error("invalid syntax: {0}")]
    InvalidSyntax(String),
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// SQL Parser for constructing an AST from SQL tokens
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a SQL query string
    pub fn new(input: &str) -> Self {
        Parser {
            tokens: Lexer::new(input).tokenize(),
            position: 0,
        }
    }

    /// Parse a single statement, optionally terminated by a semicolon
    pub fn parse_statement(&mut self) -> ParseResult<Statement> {
        let statement = super::parser_select::parse_query(self)?;
        if self.current_token_is(&TokenType::SEMICOLON) {
            self.next_token();
        }
        match self.current() {
            Some(token) if token.token_type == TokenType::EOF => Ok(statement),
            Some(token) => Err(ParseError::UnexpectedToken(token.clone())),
            None => Ok(statement),
        }
    }

    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    pub fn current_token_type(&self) -> Option<&TokenType> {
        self.current().map(|t| &t.token_type)
    }

    /// Token type `offset` positions ahead of the current one
    pub fn peek_token_type(&self, offset: usize) -> Option<&TokenType> {
        self.tokens.get(self.position + offset).map(|t| &t.token_type)
    }

    /// Advance to the next token, returning the one consumed
    pub fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    /// Check if the current token is of the given type
    pub fn current_token_is(&self, token_type: &TokenType) -> bool {
        self.current_token_type().is_some_and(|t| matches_token_type(t, token_type))
    }

    /// Consume the current token if it has the given type
    pub fn consume_if(&mut self, token_type: &TokenType) -> bool {
        if self.current_token_is(token_type) {
            self.next_token();
            true
        } else {
            false
        }
    }

    /// Consume a token of the expected type or fail
    pub fn expect_token(&mut self, expected: TokenType) -> ParseResult<Token> {
        match self.current().cloned() {
            Some(token) if matches_token_type(&token.token_type, &expected) => {
                self.next_token();
                Ok(token)
            }
            Some(token) if token.token_type == TokenType::EOF => Err(ParseError::EndOfInput),
            Some(token) => Err(ParseError::ExpectedToken(expected, token)),
            None => Err(ParseError::EndOfInput),
        }
    }

    /// Parse an identifier
    pub fn parse_identifier(&mut self) -> ParseResult<String> {
        match self.current().cloned() {
            Some(Token { token_type: TokenType::IDENTIFIER(name), .. }) => {
                self.next_token();
                Ok(name)
            }
            Some(token) if token.token_type == TokenType::EOF => Err(ParseError::EndOfInput),
            Some(token) => Err(ParseError::ExpectedToken(TokenType::IDENTIFIER(String::new()), token)),
            None => Err(ParseError::EndOfInput),
        }
    }

    /// Is the current token an identifier spelled `word` (case-insensitive)
    pub fn current_word_is(&self, word: &str) -> bool {
        matches!(self.current_token_type(), Some(TokenType::IDENTIFIER(name)) if name.eq_ignore_ascii_case(word))
    }

    /// Error for the current token
    pub fn unexpected(&self) -> ParseError {
        match self.current() {
            Some(token) if token.token_type == TokenType::EOF => ParseError::EndOfInput,
            Some(token) => ParseError::UnexpectedToken(token.clone()),
            None => ParseError::EndOfInput,
        }
    }
}

/// Helper function to check if a token type matches the expected type
pub fn matches_token_type(token_type: &TokenType, expected: &TokenType) -> bool {
    match (token_type, expected) {
        (TokenType::IDENTIFIER(actual), TokenType::IDENTIFIER(wanted)) => {
            wanted.is_empty() || actual.eq_ignore_ascii_case(wanted)
        }
        // Other variants match on their discriminant
        _ => std::mem::discriminant(token_type) == std::mem::discriminant(expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_token_is() {
        let mut parser = Parser::new("SELECT * FROM users");
        assert!(parser.current_token_is(&TokenType::SELECT));
        parser.next_token();
        assert!(parser.current_token_is(&TokenType::MULTIPLY));
        parser.next_token();
        assert!(parser.current_token_is(&TokenType::FROM));
    }

    #[test]
    fn test_expect_token() {
        let mut parser = Parser::new("SELECT * FROM users");
        assert!(parser.expect_token(TokenType::SELECT).is_ok());
        assert!(parser.expect_token(TokenType::MULTIPLY).is_ok());
        assert!(parser.expect_token(TokenType::FROM).is_ok());
        assert!(parser.expect_token(TokenType::IDENTIFIER(String::new())).is_ok());
        assert!(parser.expect_token(TokenType::EOF).is_ok());
        assert_eq!(parser.expect_token(TokenType::FROM), Err(ParseError::EndOfInput));
    }

    #[test]
    fn test_parse_identifier() {
        let mut parser = Parser::new("users WHERE id = 1");
        assert_eq!(parser.parse_identifier().unwrap(), "users");
        assert!(parser.parse_identifier().is_err());
    }

    #[test]
    fn test_matches_token_type_helper() {
        assert!(matches_token_type(&TokenType::SELECT, &TokenType::SELECT));
        assert!(!matches_token_type(&TokenType::SELECT, &TokenType::FROM));
        assert!(matches_token_type(&TokenType::IDENTIFIER("abc".to_string()), &TokenType::IDENTIFIER(String::new())));
        assert!(matches_token_type(&TokenType::INTEGER(1), &TokenType::INTEGER(0)));
        assert!(!matches_token_type(&TokenType::INTEGER(1), &TokenType::FLOAT(0.0)));
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        let err = Parser::new("SELECT 1 2").parse_statement().unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken(_)));
        assert!(Parser::new("SELECT 1;").parse_statement().is_ok());
    }
}
