//! Expression evaluation: literals, identifier resolution, operators,
//! RANDOM, and relation-call expressions.

use crate::error::{ErrorKind, EvalError, EvalResult};
use crate::interp::Interpreter;
use rand::Rng;
use relscript_graph::Value;
use relscript_types::ast::*;
use relscript_types::Span;

impl Interpreter {
    /// Evaluate an expression to a [`Value`].
    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::String(s) => Ok(Value::Text(s.clone())),
            ExprKind::Boolean(b) => Ok(Value::Boolean(*b)),
            ExprKind::Identifier(name) => self.eval_identifier(name, expr.span),
            ExprKind::PropertyAccess { object, property } => {
                self.eval_property_access(object, property, expr.span)
            }
            ExprKind::Binary { left, op, right } => self.eval_binary(left, *op, right, expr.span),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, expr.span),
            ExprKind::Grouping(inner) => self.eval_expr(inner),
            ExprKind::Random { min, max, real } => self.eval_random(min, max, *real, expr.span),
            ExprKind::RelationCall {
                subject,
                relation,
                args,
            } => {
                let subject = self.resolve_node(&subject.name, subject.span)?;
                let gives = self.exec_relation_on(subject, relation, args, expr.span)?;
                Ok(gives.unwrap_or(Value::Null))
            }
        }
    }

    /// Identifier resolution order: (1) variable bindings, (2) a graph
    /// node of that name, (3) the active when-subject's property of the
    /// same name.
    fn eval_identifier(&mut self, name: &str, span: Span) -> EvalResult<Value> {
        if let Some(value) = self.env.get(name) {
            return Ok(value.clone());
        }
        if let Some(id) = self.graph.get(name) {
            return Ok(Value::Node(id));
        }
        if let Some(subject) = self.when_subject {
            if let Some(value) = self.graph.get_property(subject, name) {
                return Ok(value);
            }
        }
        Err(EvalError::at(ErrorKind::NodeNotFound(name.to_string()), span))
    }

    /// `Object.Property` — the object must reduce to a node; lookup on a
    /// resolved node never falls back to identifier resolution.
    fn eval_property_access(
        &mut self,
        object: &Expr,
        property: &str,
        span: Span,
    ) -> EvalResult<Value> {
        let value = self.eval_expr(object)?;
        let Value::Node(id) = value else {
            return Err(EvalError::at(
                ErrorKind::TypeMismatch(format!(
                    "cannot access property '{property}' on {} ({})",
                    self.graph.display_value(&value),
                    value.type_name()
                )),
                span,
            ));
        };
        self.graph.get_property(id, property).ok_or_else(|| {
            EvalError::at(
                ErrorKind::PropertyNotFound(format!(
                    "'{property}' on node '{}'",
                    self.graph.node(id).name()
                )),
                span,
            )
        })
    }

    // ── Operators ────────────────────────────────────────────────────────

    fn eval_binary(&mut self, left: &Expr, op: BinOp, right: &Expr, span: Span) -> EvalResult<Value> {
        // Short-circuit: the right operand is only evaluated if needed.
        if op == BinOp::And {
            let lv = self.eval_expr(left)?;
            if !lv.is_truthy() {
                return Ok(Value::Boolean(false));
            }
            let rv = self.eval_expr(right)?;
            return Ok(Value::Boolean(rv.is_truthy()));
        }
        if op == BinOp::Or {
            let lv = self.eval_expr(left)?;
            if lv.is_truthy() {
                return Ok(Value::Boolean(true));
            }
            let rv = self.eval_expr(right)?;
            return Ok(Value::Boolean(rv.is_truthy()));
        }

        let lv = self.eval_expr(left)?;
        let rv = self.eval_expr(right)?;

        match op {
            BinOp::Add => self.eval_add(&lv, &rv, span),
            BinOp::Sub => self.arith(&lv, &rv, |a, b| a - b, span),
            BinOp::Mul => self.arith(&lv, &rv, |a, b| a * b, span),
            BinOp::Div => {
                let a = self.to_number(&lv, span)?;
                let b = self.to_number(&rv, span)?;
                if b == 0.0 {
                    return Err(EvalError::at(
                        ErrorKind::DivisionByZero(format!(
                            "{} / {}",
                            self.graph.display_value(&lv),
                            self.graph.display_value(&rv)
                        )),
                        span,
                    ));
                }
                Ok(Value::Number(a / b))
            }
            BinOp::Mod => {
                let a = self.to_number(&lv, span)?;
                let b = self.to_number(&rv, span)?;
                if b == 0.0 {
                    return Err(EvalError::at(
                        ErrorKind::DivisionByZero(format!(
                            "{} % {}",
                            self.graph.display_value(&lv),
                            self.graph.display_value(&rv)
                        )),
                        span,
                    ));
                }
                Ok(Value::Number(a % b))
            }
            // Exact value equality here; the ~1e-4 tolerance only applies
            // in query/condition matching.
            BinOp::Eq => Ok(Value::Boolean(lv == rv)),
            BinOp::NotEq => Ok(Value::Boolean(lv != rv)),
            BinOp::Less => self.compare(&lv, &rv, |a, b| a < b, span),
            BinOp::LessEq => self.compare(&lv, &rv, |a, b| a <= b, span),
            BinOp::Greater => self.compare(&lv, &rv, |a, b| a > b, span),
            BinOp::GreaterEq => self.compare(&lv, &rv, |a, b| a >= b, span),
            BinOp::And | BinOp::Or => unreachable!("handled above"),
        }
    }

    /// `+` concatenates if either operand is a string, else adds numbers.
    fn eval_add(&mut self, lv: &Value, rv: &Value, span: Span) -> EvalResult<Value> {
        if matches!(lv, Value::Text(_)) || matches!(rv, Value::Text(_)) {
            return Ok(Value::Text(format!(
                "{}{}",
                self.graph.display_value(lv),
                self.graph.display_value(rv)
            )));
        }
        self.arith(lv, rv, |a, b| a + b, span)
    }

    fn arith(
        &self,
        lv: &Value,
        rv: &Value,
        op: fn(f64, f64) -> f64,
        span: Span,
    ) -> EvalResult<Value> {
        let a = self.to_number(lv, span)?;
        let b = self.to_number(rv, span)?;
        Ok(Value::Number(op(a, b)))
    }

    fn compare(
        &self,
        lv: &Value,
        rv: &Value,
        op: fn(f64, f64) -> bool,
        span: Span,
    ) -> EvalResult<Value> {
        let a = self.to_number(lv, span)?;
        let b = self.to_number(rv, span)?;
        Ok(Value::Boolean(op(a, b)))
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> EvalResult<Value> {
        let value = self.eval_expr(operand)?;
        match op {
            UnaryOp::Neg => Ok(Value::Number(-self.to_number(&value, span)?)),
            UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
        }
    }

    /// Numeric coercion with a descriptive failure.
    pub(crate) fn to_number(&self, value: &Value, span: Span) -> EvalResult<f64> {
        value.as_number().ok_or_else(|| {
            EvalError::at(
                ErrorKind::TypeMismatch(format!(
                    "cannot convert {} ({}) to a number",
                    self.graph.display_value(value),
                    value.type_name()
                )),
                span,
            )
        })
    }

    // ── RANDOM ───────────────────────────────────────────────────────────

    /// `real` draws a uniform float in [min, max]; otherwise a uniform
    /// integer in [min, max], inclusive of max.
    fn eval_random(&mut self, min: &Expr, max: &Expr, real: bool, span: Span) -> EvalResult<Value> {
        let min_value = self.eval_expr(min)?;
        let min_value = self.to_number(&min_value, min.span)?;
        let max_value = self.eval_expr(max)?;
        let max_value = self.to_number(&max_value, max.span)?;
        if max_value < min_value {
            return Err(EvalError::at(
                ErrorKind::InvalidOperand(format!(
                    "RANDOM range {min_value}..{max_value} is empty"
                )),
                span,
            ));
        }
        if real {
            Ok(Value::Number(self.rng.gen_range(min_value..=max_value)))
        } else {
            let lo = min_value as i64;
            let hi = max_value as i64;
            Ok(Value::Number(self.rng.gen_range(lo..=hi) as f64))
        }
    }
}
