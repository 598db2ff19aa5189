//! Scoped variable environment for role, loop, and query bindings.

use relscript_graph::Value;
use std::collections::BTreeMap;

/// A single scope level.
#[derive(Debug, Clone)]
struct Scope {
    bindings: BTreeMap<String, Value>,
}

impl Scope {
    fn new() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }
}

/// Scoped variable environment with push/pop semantics.
///
/// Variables are looked up from innermost scope outward, so a relation
/// call nested inside another sees the caller's bindings but shadows
/// colliding role names with its own scope. Handlers must pop their scope
/// on every exit path, including the error path, so a failing nested body
/// never leaks bindings into sibling statements.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Environment {
    /// Create an empty environment (no scopes — callers push as needed).
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// Push a new scope (role bindings, EACH bodies, WHEN subjects).
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Pop the innermost scope, dropping its bindings.
    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Define a variable in the current (innermost) scope.
    ///
    /// Pushes an implicit scope if none exists, so ad-hoc bindings made
    /// outside any handler still land somewhere.
    pub fn define(&mut self, name: &str, value: Value) {
        if self.scopes.is_empty() {
            self.push_scope();
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.bindings.insert(name.to_string(), value);
        }
    }

    /// Look up a variable, searching from innermost to outermost scope.
    pub fn get(&self, name: &str) -> Option<&Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(v) = scope.bindings.get(name) {
                return Some(v);
            }
        }
        None
    }

    /// True if any scope binds `name`. Used by context-first node
    /// resolution to prefer bindings over graph lookup-or-create.
    pub fn is_bound(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let mut env = Environment::new();
        env.define("x", Value::Number(1.0));
        assert_eq!(env.get("x"), Some(&Value::Number(1.0)));
        assert!(env.is_bound("x"));
        assert!(!env.is_bound("y"));
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let mut env = Environment::new();
        env.define("x", Value::Number(1.0));
        env.push_scope();
        env.define("x", Value::Number(2.0));
        assert_eq!(env.get("x"), Some(&Value::Number(2.0)));
        env.pop_scope();
        assert_eq!(env.get("x"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_pop_drops_bindings() {
        let mut env = Environment::new();
        env.push_scope();
        env.define("role", Value::Null);
        env.pop_scope();
        assert!(!env.is_bound("role"));
    }

    #[test]
    fn test_outer_bindings_visible_in_inner_scope() {
        let mut env = Environment::new();
        env.define("caller", Value::Number(7.0));
        env.push_scope();
        assert_eq!(env.get("caller"), Some(&Value::Number(7.0)));
        env.pop_scope();
    }
}
