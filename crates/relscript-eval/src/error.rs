//! Runtime error types for the RelScript engine.

use relscript_types::Span;
use std::fmt;
use thiserror::Error;

/// The flat runtime error taxonomy.
///
/// Almost nothing is recovered locally; errors propagate to the driver.
/// The one exception is WHERE-clause evaluation during querying, which
/// silently excludes the failing candidate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("property not found: {0}")]
    PropertyNotFound(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    #[error("division by zero: {0}")]
    DivisionByZero(String),

    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    #[error("cannot perform: {0}")]
    CannotPerform(String),

    /// Catch-all for states a well-formed AST cannot reach.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// An error tagged with the source location of the offending construct,
/// when available.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
}

impl EvalError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, span: None }
    }

    pub fn at(kind: ErrorKind, span: Span) -> Self {
        Self {
            kind,
            span: Some(span),
        }
    }

    /// Attach a span if the error does not already carry one. Outer
    /// dispatch uses this so inner errors keep their precise location.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span.get_or_insert(span);
        self
    }
}

impl From<ErrorKind> for EvalError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "{span}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Result alias for engine operations.
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_span() {
        let err = EvalError::at(ErrorKind::NodeNotFound("Ghost".into()), Span::point(3, 7));
        assert_eq!(format!("{err}"), "3:7: node not found: Ghost");
    }

    #[test]
    fn test_display_without_span() {
        let err = EvalError::new(ErrorKind::DivisionByZero("10 / 0".into()));
        assert_eq!(format!("{err}"), "division by zero: 10 / 0");
    }

    #[test]
    fn test_with_span_keeps_existing() {
        let err = EvalError::at(ErrorKind::Runtime("x".into()), Span::point(1, 1))
            .with_span(Span::point(9, 9));
        assert_eq!(err.span, Some(Span::point(1, 1)));

        let err = EvalError::new(ErrorKind::Runtime("x".into())).with_span(Span::point(9, 9));
        assert_eq!(err.span, Some(Span::point(9, 9)));
    }
}
