// SQL Parser Module
//
// This module is responsible for parsing SQL queries and converting them
// into an abstract syntax tree (AST) representation.

pub mod ast;
pub mod components;
pub mod lexer;

pub use self::ast::Statement;
pub use self::components::{ParseError, ParseResult, Parser};
pub use self::lexer::{Lexer, Token};

/// Parse one statement from query text
pub fn parse(query: &str) -> ParseResult<Statement> {
    Parser::new(query).parse_statement()
}
