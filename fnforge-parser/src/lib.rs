//! Parser for candidate programs
//!
//! Candidates use a JavaScript subset. Lexing is done with logos, parsing
//! with a hand-written recursive descent parser producing the tree in
//! `fnforge_core::ast`.

pub mod error;
pub mod lexer;
pub mod parser;

#[cfg(test)]
mod parser_tests;

pub use error::{ErrorKind, ParseError};
pub use parser::{Parser, DEFAULT_MAX_DEPTH};

use fnforge_core::ast::{Expr, Program};

/// Parse a candidate into a program
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    Parser::new(source)?.parse_program()
}

/// Parse a single expression, rejecting trailing input
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    Parser::new(source)?.parse_standalone_expression()
}

/// Parse with a custom nesting limit
pub fn parse_with_depth_limit(source: &str, max_depth: usize) -> Result<Program, ParseError> {
    Parser::new(source)?.with_max_depth(max_depth).parse_program()
}
