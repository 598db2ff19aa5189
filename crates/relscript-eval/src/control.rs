//! Control statements: WHEN (both forms), CHANCE, ALL, EACH.

use crate::error::{ErrorKind, EvalError, EvalResult};
use crate::interp::Interpreter;
use rand::Rng;
use relscript_graph::Value;
use relscript_types::ast::*;

impl Interpreter {
    // ── WHEN, condition-statement form ───────────────────────────────────

    /// Evaluate a restricted HAS/IS/CAN condition against the graph and
    /// run the body only if it holds. No ELSE in this form; a missing
    /// subject simply fails the condition.
    pub(crate) fn exec_when_condition(
        &mut self,
        stmt: &WhenConditionStmt,
    ) -> EvalResult<Option<Value>> {
        let Some(subject) = self.resolve_existing(&stmt.subject.name) else {
            return Ok(None);
        };
        let holds = match &stmt.condition {
            Condition::Is(type_name) => self.graph.is_type(subject, &type_name.name),
            Condition::Can(ability) => self.graph.can(subject, &ability.name),
            Condition::Has(property, expected) => {
                match self.graph.get_property(subject, &property.name) {
                    None => false,
                    Some(actual) => match expected {
                        None => true,
                        // Tolerant matching, as in query HAS filtering.
                        Some(expr) => {
                            let expected = self.eval_expr(expr)?;
                            actual.loose_eq(&expected)
                        }
                    },
                }
            }
        };
        if holds {
            self.exec_block(&stmt.body)
        } else {
            Ok(None)
        }
    }

    // ── WHEN, expression form ────────────────────────────────────────────

    /// Binds the subject as both a context variable and the when-subject
    /// (bare identifiers in the condition and body resolve to its
    /// properties), then runs the body or recurses into the ELSE chain.
    /// The prior when-subject and binding are restored on every exit path.
    pub(crate) fn exec_when(&mut self, stmt: &WhenStmt) -> EvalResult<Option<Value>> {
        let subject = self.resolve_node(&stmt.subject.name, stmt.subject.span)?;
        let previous = self.when_subject.replace(subject);
        self.env.push_scope();
        self.env.define(&stmt.subject.name, Value::Node(subject));

        let result = self.exec_when_arms(stmt);

        self.env.pop_scope();
        self.when_subject = previous;
        result
    }

    fn exec_when_arms(&mut self, stmt: &WhenStmt) -> EvalResult<Option<Value>> {
        let condition = self.eval_expr(&stmt.condition)?;
        if condition.is_truthy() {
            return self.exec_block(&stmt.body);
        }
        match &stmt.else_arm {
            Some(ElseArm::ElseWhen(nested)) => self.exec_when(nested),
            Some(ElseArm::Else(body)) => self.exec_block(body),
            None => Ok(None),
        }
    }

    // ── CHANCE ───────────────────────────────────────────────────────────

    /// Draw one uniform integer in [0, 100); run the body if the draw is
    /// below the percentage, else the ELSE body if present.
    pub(crate) fn exec_chance(&mut self, stmt: &ChanceStmt) -> EvalResult<Option<Value>> {
        let percent = self.eval_expr(&stmt.percent)?;
        let percent = self.to_number(&percent, stmt.percent.span)?;
        if !(0.0..=100.0).contains(&percent) {
            return Err(EvalError::at(
                ErrorKind::InvalidCondition(format!(
                    "CHANCE percentage must be between 0 and 100, got {percent}"
                )),
                stmt.percent.span,
            ));
        }
        let draw = self.rng.gen_range(0..100);
        if (draw as f64) < percent {
            self.exec_block(&stmt.body)
        } else if let Some(else_body) = &stmt.else_body {
            self.exec_block(else_body)
        } else {
            Ok(None)
        }
    }

    // ── ALL ──────────────────────────────────────────────────────────────

    /// Resolve the target set (a stored query result's children, or the
    /// transitive type closure); report the count, or re-dispatch the
    /// action once per matching node.
    pub(crate) fn exec_all(&mut self, stmt: &AllStmt) -> EvalResult<Option<Value>> {
        let members: Vec<_> = match self.graph.get(&stmt.target.name) {
            Some(id) if self.graph.is_type(id, "QueryResult") => {
                self.graph.node(id).children().to_vec()
            }
            _ => self
                .graph
                .get_all_nodes_by_type(&stmt.target.name)
                .into_iter()
                .collect(),
        };

        match &stmt.action {
            None => {
                self.sink.write_line(&format!(
                    "{}: {} node(s)",
                    stmt.target.name,
                    members.len()
                ));
            }
            Some(action) => {
                for member in members {
                    self.exec_relation_on(member, &action.relation, &action.args, action.span)?;
                }
            }
        }
        Ok(None)
    }

    // ── EACH ─────────────────────────────────────────────────────────────

    /// Iterate a collection node's children, binding the loop variable
    /// each round. The binding scope is popped on every exit path.
    pub(crate) fn exec_each(&mut self, stmt: &EachStmt) -> EvalResult<Option<Value>> {
        let Some(collection) = self.resolve_existing(&stmt.collection.name) else {
            return Err(EvalError::at(
                ErrorKind::NodeNotFound(stmt.collection.name.clone()),
                stmt.collection.span,
            ));
        };
        // Snapshot, so a body mutating the collection doesn't skip or
        // repeat members.
        let members = self.graph.node(collection).children().to_vec();

        self.env.push_scope();
        let result = self.exec_each_rounds(&stmt.variable.name, &members, &stmt.body);
        self.env.pop_scope();
        result
    }

    fn exec_each_rounds(
        &mut self,
        variable: &str,
        members: &[relscript_graph::NodeId],
        body: &[Stmt],
    ) -> EvalResult<Option<Value>> {
        let mut gives = None;
        for &member in members {
            self.env.define(variable, Value::Node(member));
            if let Some(value) = self.exec_block(body)? {
                gives = Some(value);
            }
        }
        Ok(gives)
    }
}
