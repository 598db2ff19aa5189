//! The runtime value domain.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Tolerance used for numeric matching in queries and WHEN condition
/// statements. General `==` comparison stays exact.
pub(crate) const NUMERIC_TOLERANCE: f64 = 1e-4;

/// A runtime value: number, string, boolean, node reference, or null.
///
/// Numbers are uniformly 64-bit floats; the language has no integer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Boolean(bool),
    Node(NodeId),
    Null,
}

impl Value {
    /// The value's type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Node(_) => "node",
            Value::Null => "null",
        }
    }

    /// Truthy coercion: null, false, 0, and the empty string are false;
    /// everything else (including any node) is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Node(_) => true,
        }
    }

    /// Numeric coercion for values that carry one: numbers pass through,
    /// booleans map to 0/1. Returns `None` for everything else — the
    /// evaluator turns that into a TypeMismatch with full context.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Match two values with numeric tolerance.
    ///
    /// Numbers compare within ~1e-4; all other combinations use exact
    /// equality. Used by query HAS-value matching and WHEN condition
    /// statements, never by the `==` operator.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => (a - b).abs() < NUMERIC_TOLERANCE,
            _ => self == other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthy_coercion() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Text(String::new()).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(Value::Text("x".into()).is_truthy());
        assert!(Value::Node(NodeId(0)).is_truthy());
    }

    #[test]
    fn test_as_number() {
        assert_eq!(Value::Number(2.5).as_number(), Some(2.5));
        assert_eq!(Value::Boolean(true).as_number(), Some(1.0));
        assert_eq!(Value::Boolean(false).as_number(), Some(0.0));
        assert_eq!(Value::Text("3".into()).as_number(), None);
        assert_eq!(Value::Null.as_number(), None);
    }

    #[test]
    fn test_loose_eq_tolerance() {
        assert!(Value::Number(1.0).loose_eq(&Value::Number(1.00009)));
        assert!(!Value::Number(1.0).loose_eq(&Value::Number(1.001)));
        // Exact equality still distinguishes these
        assert_ne!(Value::Number(1.0), Value::Number(1.00009));
    }

    #[test]
    fn test_serde_round_trip() {
        let v = Value::Node(NodeId(3));
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn test_loose_eq_non_numeric_is_exact() {
        assert!(Value::Text("a".into()).loose_eq(&Value::Text("a".into())));
        assert!(!Value::Text("a".into()).loose_eq(&Value::Text("b".into())));
        assert!(!Value::Null.loose_eq(&Value::Boolean(false)));
    }
}
