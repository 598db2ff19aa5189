//! The interpreter: statement dispatch, relation handlers, graph dump.
//!
//! One [`Interpreter`] owns the graph, the binding environment, the output
//! sink, and the RNG; expression evaluation, control statements, and the
//! query engine are further `impl` blocks in sibling modules.

use crate::env::Environment;
use crate::error::{ErrorKind, EvalError, EvalResult};
use crate::output::{OutputSink, StdoutSink};
use rand::rngs::StdRng;
use rand::SeedableRng;
use relscript_graph::{Graph, NodeId, Value};
use relscript_types::ast::*;
use relscript_types::Span;

/// The RelScript execution engine.
///
/// Single-threaded and synchronous: statements mutate the graph in place
/// with no transaction boundary, so a raising statement leaves whatever
/// intermediate state it reached.
pub struct Interpreter {
    /// The node graph, one per session.
    pub graph: Graph,
    /// Shared binding scope for roles, loop variables, and query WHERE.
    pub(crate) env: Environment,
    /// Destination for all user-visible lines.
    pub(crate) sink: Box<dyn OutputSink>,
    pub(crate) rng: StdRng,
    /// Implicit receiver for bare-identifier property resolution inside
    /// WHEN expressions.
    pub(crate) when_subject: Option<NodeId>,
}

impl Interpreter {
    /// Create an interpreter writing to stdout, entropy-seeded.
    pub fn new() -> Self {
        Self::with_sink(Box::new(StdoutSink))
    }

    /// Create an interpreter with a custom output sink.
    pub fn with_sink(sink: Box<dyn OutputSink>) -> Self {
        Self {
            graph: Graph::new(),
            env: Environment::new(),
            sink,
            rng: StdRng::from_entropy(),
            when_subject: None,
        }
    }

    /// Create with a fixed RNG seed, for deterministic RANDOM/CHANCE.
    pub fn with_seed(sink: Box<dyn OutputSink>, seed: u64) -> Self {
        let mut interp = Self::with_sink(sink);
        interp.rng = StdRng::seed_from_u64(seed);
        interp
    }

    // ══════════════════════════════════════════════════════════════════════
    // Driver
    // ══════════════════════════════════════════════════════════════════════

    /// Execute a batch of statements in order. The first error aborts the
    /// remainder of the batch.
    pub fn execute(&mut self, statements: &[Stmt]) -> EvalResult<()> {
        for stmt in statements {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    /// Execute one statement. Returns the GIVES value produced by the
    /// statement (or a nested body), threaded up explicitly so relation
    /// calls never rely on shared mutable return state.
    pub(crate) fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<Option<Value>> {
        let result = match &stmt.kind {
            StmtKind::Relation(rel) => self.exec_relation_stmt(rel),
            StmtKind::DefineRelation(def) => {
                self.exec_define_relation(def);
                Ok(None)
            }
            StmtKind::Query(query) => self.exec_query(query).map(|_| None),
            StmtKind::InstanceQuery(query) => self.exec_instance_query(query).map(|_| None),
            StmtKind::WhenCondition(when) => self.exec_when_condition(when),
            StmtKind::When(when) => self.exec_when(when),
            StmtKind::Chance(chance) => self.exec_chance(chance),
            StmtKind::All(all) => self.exec_all(all),
            StmtKind::Each(each) => self.exec_each(each),
            StmtKind::Loses(loses) => self.exec_loses(loses).map(|_| None),
            StmtKind::Gives(gives) => self.eval_expr(&gives.value).map(Some),
        };
        result.map_err(|e| e.with_span(stmt.span))
    }

    /// Execute a statement body. The last GIVES value wins.
    pub(crate) fn exec_block(&mut self, stmts: &[Stmt]) -> EvalResult<Option<Value>> {
        let mut gives = None;
        for stmt in stmts {
            if let Some(value) = self.exec_stmt(stmt)? {
                gives = Some(value);
            }
        }
        Ok(gives)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Node resolution
    // ══════════════════════════════════════════════════════════════════════

    /// Context-first resolution: a variable binding wins over the graph;
    /// otherwise the node is looked up or eagerly created.
    pub(crate) fn resolve_node(&mut self, name: &str, span: Span) -> EvalResult<NodeId> {
        if let Some(value) = self.env.get(name) {
            return match value {
                Value::Node(id) => Ok(*id),
                other => Err(EvalError::at(
                    ErrorKind::TypeMismatch(format!(
                        "'{name}' is bound to {} ({}), not a node",
                        self.graph.display_value(other),
                        other.type_name()
                    )),
                    span,
                )),
            };
        }
        Ok(self.graph.get_or_create(name))
    }

    /// Resolve without creating: binding first, then existing graph node.
    pub(crate) fn resolve_existing(&self, name: &str) -> Option<NodeId> {
        if let Some(Value::Node(id)) = self.env.get(name) {
            return Some(*id);
        }
        self.graph.get(name)
    }

    /// Resolve a relation argument to a node. Identifiers go through
    /// context-first resolution (so nested calls pass bound nodes through
    /// by name); any other expression must evaluate to a node reference.
    pub(crate) fn resolve_arg_node(&mut self, arg: &Expr) -> EvalResult<NodeId> {
        match &arg.kind {
            ExprKind::Identifier(name) => self.resolve_node(name, arg.span),
            ExprKind::Grouping(inner) => self.resolve_arg_node(inner),
            _ => {
                let value = self.eval_expr(arg)?;
                match value {
                    Value::Node(id) => Ok(id),
                    other => Err(EvalError::at(
                        ErrorKind::TypeMismatch(format!(
                            "expected a node, got {} ({})",
                            self.graph.display_value(&other),
                            other.type_name()
                        )),
                        arg.span,
                    )),
                }
            }
        }
    }

    /// Extract the identifier argument at `idx`.
    fn ident_arg<'a>(
        &self,
        args: &'a [Expr],
        idx: usize,
        what: &str,
        span: Span,
    ) -> EvalResult<&'a str> {
        match args.get(idx) {
            Some(Expr {
                kind: ExprKind::Identifier(name),
                ..
            }) => Ok(name),
            Some(other) => Err(EvalError::at(
                ErrorKind::InvalidOperand(format!("{what} must be an identifier")),
                other.span,
            )),
            None => Err(EvalError::at(
                ErrorKind::InvalidOperand(format!("{what} is missing")),
                span,
            )),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Relation statements
    // ══════════════════════════════════════════════════════════════════════

    fn exec_relation_stmt(&mut self, stmt: &RelationStmt) -> EvalResult<Option<Value>> {
        let subject = self.resolve_node(&stmt.subject.name, stmt.subject.span)?;
        self.exec_relation_on(subject, &stmt.relation, &stmt.args, stmt.span)
    }

    /// Dispatch one relation form against an already-resolved subject.
    /// Also entered by ALL re-dispatch and RelationCall expressions.
    pub(crate) fn exec_relation_on(
        &mut self,
        subject: NodeId,
        relation: &Ident,
        args: &[Expr],
        span: Span,
    ) -> EvalResult<Option<Value>> {
        match relation.name.to_uppercase().as_str() {
            "IS" => {
                let type_name = self.ident_arg(args, 0, "IS type name", span)?.to_string();
                let parent = self.resolve_node(&type_name, span)?;
                self.graph.add_parent(subject, parent);
                Ok(None)
            }
            "HAS" => self.exec_has(subject, args, span).map(|_| None),
            "CAN" => {
                let ability = self.ident_arg(args, 0, "CAN ability name", span)?.to_string();
                self.graph.node_mut(subject).add_ability(ability);
                Ok(None)
            }
            "CONTAINS" => {
                let child_name = self.ident_arg(args, 0, "CONTAINS target", span)?.to_string();
                let child = self.resolve_node(&child_name, span)?;
                self.graph.add_child(subject, child);
                Ok(None)
            }
            "IN" => {
                let parent_name = self.ident_arg(args, 0, "IN container", span)?.to_string();
                let parent = self.resolve_node(&parent_name, span)?;
                self.graph.add_child(parent, subject);
                Ok(None)
            }
            "PRINT" => {
                self.exec_print(subject);
                Ok(None)
            }
            _ => self.exec_custom_relation(subject, relation, args, span),
        }
    }

    fn exec_has(&mut self, subject: NodeId, args: &[Expr], span: Span) -> EvalResult<()> {
        let property = self.ident_arg(args, 0, "HAS property name", span)?.to_string();
        if property.eq_ignore_ascii_case("INVERSE") {
            let inverse = self.ident_arg(args, 1, "INVERSE relation name", span)?.to_string();
            return self.set_relation_inverse(subject, &inverse, span);
        }
        if property.eq_ignore_ascii_case("DIRECTION") {
            let direction = self.ident_arg(args, 1, "DIRECTION value", span)?.to_string();
            return self.set_relation_direction(subject, &direction, span);
        }

        let value_expr = args.get(1).ok_or_else(|| {
            EvalError::at(
                ErrorKind::InvalidOperand(format!("HAS {property} requires a value")),
                span,
            )
        })?;
        let mut value = self.eval_expr(value_expr)?;
        // Auto-box: a string naming an existing node becomes a node
        // reference, enabling later dot-access.
        if let Value::Text(text) = &value {
            if let Some(id) = self.graph.get(text) {
                value = Value::Node(id);
            }
        }
        self.graph.node_mut(subject).set_property(property, value);
        Ok(())
    }

    /// `Rel HAS INVERSE Name` — auto-creates/tags the inverse relation
    /// node and mirrors the role list in reversed order.
    fn set_relation_inverse(&mut self, subject: NodeId, inverse: &str, span: Span) -> EvalResult<()> {
        self.require_relation(subject, "INVERSE", span)?;
        let inverse_node = self.graph.get_or_create(inverse);
        let relation_type = self.graph.get_or_create("RELATION");
        self.graph.add_parent(inverse_node, relation_type);
        let mut roles = self.graph.node(subject).roles().to_vec();
        roles.reverse();
        self.graph.node_mut(inverse_node).set_roles(roles);
        self.graph.node_mut(subject).set_inverse(inverse);
        Ok(())
    }

    /// `Rel HAS DIRECTION BIDIRECTIONAL` — flag consumed when instances
    /// are recorded.
    fn set_relation_direction(
        &mut self,
        subject: NodeId,
        direction: &str,
        span: Span,
    ) -> EvalResult<()> {
        self.require_relation(subject, "DIRECTION", span)?;
        let bidirectional = direction.eq_ignore_ascii_case("BIDIRECTIONAL");
        self.graph.node_mut(subject).set_bidirectional(bidirectional);
        Ok(())
    }

    fn require_relation(&self, subject: NodeId, meta: &str, span: Span) -> EvalResult<()> {
        if self.graph.is_type(subject, "RELATION") {
            Ok(())
        } else {
            Err(EvalError::at(
                ErrorKind::CannotPerform(format!(
                    "'{}' is not a relation; {meta} applies to relations",
                    self.graph.node(subject).name()
                )),
                span,
            ))
        }
    }

    fn exec_print(&mut self, subject: NodeId) {
        let line = match self.graph.get_property(subject, "Name") {
            // Follow one level of node-reference through Name.
            Some(Value::Node(id)) => self.graph.node(id).name().to_string(),
            Some(value) => self.graph.display_value(&value),
            None => self.graph.node(subject).name().to_string(),
        };
        self.sink.write_line(&line);
    }

    // ══════════════════════════════════════════════════════════════════════
    // Custom relation invocation
    // ══════════════════════════════════════════════════════════════════════

    fn exec_custom_relation(
        &mut self,
        subject: NodeId,
        relation: &Ident,
        args: &[Expr],
        span: Span,
    ) -> EvalResult<Option<Value>> {
        let Some(rel_id) = self.graph.get(&relation.name) else {
            // No declared relation: silently tag the subject with the
            // first argument's object (free-form tagging fallback).
            if let Some(first) = args.first() {
                let target = self.resolve_arg_node(first)?;
                let key = format!("_{}", relation.name);
                self.graph.node_mut(subject).set_property(key, Value::Node(target));
            }
            return Ok(None);
        };
        if !self.graph.is_type(rel_id, "RELATION") {
            return Err(EvalError::at(
                ErrorKind::CannotPerform(format!("'{}' is not a relation", relation.name)),
                span,
            ));
        }

        // The first argument is the target, eagerly created before role
        // validation runs.
        let target = match args.first() {
            Some(first) => Some(self.resolve_arg_node(first)?),
            None => None,
        };

        let roles = self.graph.node(rel_id).roles().to_vec();
        if !roles.is_empty() && args.len() != roles.len() - 1 {
            return Err(self.role_arity_error(&relation.name, &roles, args.len(), span));
        }

        // Resolve the remaining arguments before installing role bindings,
        // so resolution sees the caller's context, not the callee's roles.
        let mut arg_nodes = Vec::with_capacity(args.len());
        if let Some(target) = target {
            arg_nodes.push(target);
        }
        for arg in args.iter().skip(1) {
            arg_nodes.push(self.resolve_arg_node(arg)?);
        }

        let body = self.graph.node(rel_id).body().cloned();
        let mut gives = None;
        if let Some(body) = &body {
            self.env.push_scope();
            if let Some(subject_role) = roles.first() {
                self.env.define(subject_role, Value::Node(subject));
            }
            for (role, node) in roles.iter().skip(1).zip(arg_nodes.iter()) {
                self.env.define(role, Value::Node(*node));
            }
            let result = self.exec_block(body);
            // Role cleanup runs whether or not the body raised; the GIVES
            // value survives it.
            self.env.pop_scope();
            gives = result?;
        }

        if let Some(target) = target {
            self.graph
                .add_relation_instance(subject, &relation.name, target, false, None);
            let inverse = self.graph.node(rel_id).inverse().map(str::to_string);
            if let Some(inverse) = inverse {
                self.graph.add_relation_instance(
                    target,
                    &inverse,
                    subject,
                    true,
                    Some(relation.name.clone()),
                );
            }
            if self.graph.node(rel_id).bidirectional() {
                self.graph.add_relation_instance(
                    target,
                    &relation.name,
                    subject,
                    true,
                    Some(relation.name.clone()),
                );
            }
        }
        Ok(gives)
    }

    fn role_arity_error(
        &self,
        relation: &str,
        roles: &[String],
        got: usize,
        span: Span,
    ) -> EvalError {
        let expected = roles.len() - 1;
        let usage = format!(
            "<{}> {relation} {}",
            roles[0],
            roles[1..]
                .iter()
                .map(|r| format!("<{r}>"))
                .collect::<Vec<_>>()
                .join(" ")
        );
        let message = if got < expected {
            format!(
                "relation '{relation}' is missing roles: {}. Usage: {usage}",
                roles[1 + got..].join(", ")
            )
        } else {
            format!(
                "relation '{relation}' takes roles ({}), got {got} argument(s). Usage: {usage}",
                roles.join(", ")
            )
        };
        EvalError::at(ErrorKind::CannotPerform(message), span)
    }

    fn exec_define_relation(&mut self, def: &DefineRelationStmt) {
        let id = self.graph.get_or_create(&def.name.name);
        let relation_type = self.graph.get_or_create("RELATION");
        self.graph.add_parent(id, relation_type);
        if !def.roles.is_empty() {
            self.graph
                .node_mut(id)
                .set_roles(def.roles.iter().map(|r| r.name.clone()).collect());
        }
        if let Some(body) = &def.body {
            self.graph.node_mut(id).set_body(body.clone());
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // LOSES
    // ══════════════════════════════════════════════════════════════════════

    /// Detaches edges/properties/abilities; never removes the node itself.
    fn exec_loses(&mut self, stmt: &LosesStmt) -> EvalResult<()> {
        let subject = self.resolve_node(&stmt.subject.name, stmt.subject.span)?;
        match &stmt.kind {
            LosesKind::Parent(name) => {
                if let Some(parent) = self.graph.get(&name.name) {
                    self.graph.remove_parent(subject, parent);
                }
            }
            LosesKind::Child(name) => {
                if let Some(child) = self.graph.get(&name.name) {
                    self.graph.remove_child(subject, child);
                }
            }
            LosesKind::Auto(name) => {
                // Try an ability first, else drop the property.
                let node = self.graph.node_mut(subject);
                if !node.remove_ability(&name.name) {
                    node.remove_property(&name.name);
                }
            }
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Debug dump & result retrieval
    // ══════════════════════════════════════════════════════════════════════

    /// Pretty-print every node: parents, visible properties (internal
    /// `_`-prefixed ones hidden), children, abilities. Name-sorted.
    pub fn dump_graph(&self) -> String {
        let mut out = String::new();
        for node in self.graph.all_nodes() {
            out.push_str(node.name());
            out.push('\n');
            if !node.parents().is_empty() {
                let names: Vec<_> = node
                    .parents()
                    .iter()
                    .map(|&p| self.graph.node(p).name())
                    .collect();
                out.push_str(&format!("  IS {}\n", names.join(", ")));
            }
            for (key, value) in node.properties() {
                if key.starts_with('_') {
                    continue;
                }
                out.push_str(&format!("  HAS {key} = {}\n", self.graph.display_value(value)));
            }
            if !node.children().is_empty() {
                let names: Vec<_> = node
                    .children()
                    .iter()
                    .map(|&c| self.graph.node(c).name())
                    .collect();
                out.push_str(&format!("  CONTAINS {}\n", names.join(", ")));
            }
            let abilities: Vec<_> = node.abilities().map(String::as_str).collect();
            if !abilities.is_empty() {
                out.push_str(&format!("  CAN {}\n", abilities.join(", ")));
            }
        }
        out
    }

    /// JSON form of the dump, for host tooling.
    pub fn dump_json(&self) -> serde_json::Value {
        let nodes: Vec<serde_json::Value> = self
            .graph
            .all_nodes()
            .map(|node| {
                let mut map = serde_json::Map::new();
                map.insert("name".into(), node.name().into());
                map.insert(
                    "parents".into(),
                    node.parents()
                        .iter()
                        .map(|&p| self.graph.node(p).name())
                        .collect::<Vec<_>>()
                        .into(),
                );
                let mut props = serde_json::Map::new();
                for (key, value) in node.properties() {
                    if !key.starts_with('_') {
                        props.insert(key.clone(), self.value_to_json(value));
                    }
                }
                map.insert("properties".into(), serde_json::Value::Object(props));
                map.insert(
                    "children".into(),
                    node.children()
                        .iter()
                        .map(|&c| self.graph.node(c).name())
                        .collect::<Vec<_>>()
                        .into(),
                );
                map.insert(
                    "abilities".into(),
                    node.abilities().cloned().collect::<Vec<_>>().into(),
                );
                serde_json::Value::Object(map)
            })
            .collect();
        serde_json::Value::Array(nodes)
    }

    fn value_to_json(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    serde_json::Value::Number(serde_json::Number::from(*n as i64))
                } else {
                    serde_json::json!(*n)
                }
            }
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Node(id) => serde_json::Value::String(self.graph.node(*id).name().to_string()),
            Value::Null => serde_json::Value::Null,
        }
    }

    /// Names of the nodes stored in a query result, by result variable.
    pub fn query_result(&self, variable: &str) -> Option<Vec<String>> {
        let id = self.graph.get(variable)?;
        if !self.graph.is_type(id, "QueryResult") {
            return None;
        }
        Some(
            self.graph
                .node(id)
                .children()
                .iter()
                .map(|&c| self.graph.node(c).name().to_string())
                .collect(),
        )
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
