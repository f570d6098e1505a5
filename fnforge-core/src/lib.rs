//! Core types shared across the fnforge workspace
//!
//! - `ast`: the tagged AST that candidate programs are parsed into
//! - `canonical`: key-order independent serialization used for cache keys

pub mod ast;
pub mod canonical;
pub mod error;

pub use ast::{Entry, Expr, Function, Program, Span, Stmt};
pub use canonical::{canonical_json, canonical_key};
pub use error::{Error, Result};
