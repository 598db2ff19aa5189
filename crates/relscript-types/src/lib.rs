//! Shared types for the RelScript execution engine.
//!
//! This crate defines the statement/expression AST consumed by the
//! interpreter and the source spans attached to every node. The tokenizer
//! and parser that produce these trees live outside the engine.

mod span;
pub mod ast;

pub use span::Span;
