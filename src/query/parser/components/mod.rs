// SQL Parser Components
//
// This module contains the separate components of the SQL parser.
// Each component handles a specific aspect of SQL parsing.

pub mod parser_core;
pub mod parser_expressions;
pub mod parser_select;

pub use parser_core::{ParseError, ParseResult, Parser};
pub use parser_expressions::parse_expression;
pub use parser_select::{parse_query, parse_select};
