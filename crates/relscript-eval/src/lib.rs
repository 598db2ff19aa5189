//! RelScript execution engine: tree-walking interpreter over the node graph.
//!
//! The engine consumes parsed statement/expression trees
//! ([`relscript_types::ast`]) and mutates a [`relscript_graph::Graph`] in
//! place, writing user-visible lines to an [`OutputSink`]. Single-threaded
//! and synchronous: every statement fully executes before the next is
//! dispatched, and a raised error aborts the remainder of the batch.

mod control;
mod env;
mod error;
mod evaluator;
mod interp;
mod output;
mod query;

pub use env::Environment;
pub use error::{ErrorKind, EvalError, EvalResult};
pub use interp::Interpreter;
pub use output::{MemorySink, OutputSink, StdoutSink};
