//! The query engine: pattern queries over IS/HAS/CAN/IN/CONTAINS with
//! WHERE filtering and QueryResult materialization, plus relation-instance
//! queries.

use crate::error::{ErrorKind, EvalError, EvalResult};
use crate::interp::Interpreter;
use relscript_graph::{NodeId, Value};
use relscript_types::ast::*;
use std::collections::BTreeSet;

impl Interpreter {
    // ══════════════════════════════════════════════════════════════════════
    // Pattern queries
    // ══════════════════════════════════════════════════════════════════════

    /// `?`/`?var Relation [Target [Value]] [WHERE expr]`.
    ///
    /// IS and IN retrieve through the type index / direct child list;
    /// the other forms scan all nodes.
    pub(crate) fn exec_query(&mut self, stmt: &QueryStmt) -> EvalResult<()> {
        // The comparison value is evaluated once, outside the scan.
        let value = match &stmt.value {
            Some(expr) => Some(self.eval_expr(expr)?),
            None => None,
        };

        let relation = stmt.relation.name.to_uppercase();
        let mut matches = self.collect_candidates(&relation, stmt, value.as_ref())?;

        if let Some(where_expr) = &stmt.where_clause {
            matches = self.filter_where(matches, stmt, where_expr);
        }

        matches.sort_by(|&a, &b| self.graph.node(a).name().cmp(self.graph.node(b).name()));

        if let Some(variable) = &stmt.variable {
            self.materialize_result(&variable.name, &matches);
        }

        self.emit_query_output(stmt, &relation, value.as_ref(), &matches);
        Ok(())
    }

    fn collect_candidates(
        &mut self,
        relation: &str,
        stmt: &QueryStmt,
        value: Option<&Value>,
    ) -> EvalResult<Vec<NodeId>> {
        let all: Vec<NodeId> = self.graph.all_nodes().map(|n| n.id()).collect();
        let target = stmt.target.as_ref();

        let matches = match (relation, target) {
            ("IS", None) => all,
            ("IS", Some(target)) => {
                let mut set = self.graph.get_all_nodes_by_type(&target.name);
                // `is` is reflexive, so the type node itself matches too.
                if let Some(id) = self.graph.get(&target.name) {
                    set.insert(id);
                }
                set.into_iter().collect()
            }
            ("HAS", None) => all
                .into_iter()
                .filter(|&id| self.graph.node(id).properties().next().is_some())
                .collect(),
            ("HAS", Some(target)) => {
                let property = target.name.clone();
                all.into_iter()
                    .filter(|&id| match self.graph.get_property(id, &property) {
                        None => false,
                        Some(actual) => match value {
                            None => true,
                            // ~1e-4 numeric tolerance, unlike `==`.
                            Some(expected) => actual.loose_eq(expected),
                        },
                    })
                    .collect()
            }
            ("CAN", None) => all
                .into_iter()
                .filter(|&id| self.graph.node(id).abilities().next().is_some())
                .collect(),
            ("CAN", Some(target)) => all
                .into_iter()
                .filter(|&id| self.graph.can(id, &target.name))
                .collect(),
            ("IN", Some(target)) => match self.graph.get(&target.name) {
                Some(container) => self.graph.node(container).children().to_vec(),
                None => Vec::new(),
            },
            ("IN", None) => {
                return Err(EvalError::at(
                    ErrorKind::InvalidOperand("IN query requires a container".into()),
                    stmt.span,
                ));
            }
            ("CONTAINS", None) => all
                .into_iter()
                .filter(|&id| !self.graph.node(id).children().is_empty())
                .collect(),
            ("CONTAINS", Some(target)) => match self.graph.get(&target.name) {
                Some(child) => all
                    .into_iter()
                    .filter(|&id| self.graph.node(id).children().contains(&child))
                    .collect(),
                None => Vec::new(),
            },
            _ => {
                return Err(EvalError::at(
                    ErrorKind::Runtime(format!("unsupported query relation '{relation}'")),
                    stmt.span,
                ));
            }
        };
        Ok(matches)
    }

    /// Bind the query variable (`_` for the bare wildcard) to each
    /// candidate and keep it iff the WHERE expression yields boolean true
    /// or a nonzero number. Evaluation errors silently exclude the single
    /// candidate; the binding is removed regardless of outcome.
    fn filter_where(
        &mut self,
        candidates: Vec<NodeId>,
        stmt: &QueryStmt,
        where_expr: &Expr,
    ) -> Vec<NodeId> {
        let variable = stmt
            .variable
            .as_ref()
            .map(|v| v.name.clone())
            .unwrap_or_else(|| "_".to_string());
        let mut kept = Vec::new();
        for id in candidates {
            self.env.push_scope();
            self.env.define(&variable, Value::Node(id));
            let keep = match self.eval_expr(where_expr) {
                Ok(Value::Boolean(true)) => true,
                Ok(Value::Number(n)) => n != 0.0,
                Ok(_) => false,
                Err(_) => false,
            };
            self.env.pop_scope();
            if keep {
                kept.push(id);
            }
        }
        kept
    }

    /// Get-or-create the result node, tag it `QueryResult`, and replace
    /// its children with the current matches so EACH/ALL can consume it.
    fn materialize_result(&mut self, variable: &str, matches: &[NodeId]) {
        let result = self.graph.get_or_create(variable);
        let tag = self.graph.get_or_create("QueryResult");
        self.graph.add_parent(result, tag);
        for child in self.graph.node(result).children().to_vec() {
            self.graph.remove_child(result, child);
        }
        for &id in matches {
            self.graph.add_child(result, id);
        }
    }

    fn emit_query_output(
        &mut self,
        stmt: &QueryStmt,
        relation: &str,
        value: Option<&Value>,
        matches: &[NodeId],
    ) {
        let mut describe = match &stmt.variable {
            Some(variable) => format!("?{}", variable.name),
            None => "?".to_string(),
        };
        describe.push(' ');
        describe.push_str(relation);
        if let Some(target) = &stmt.target {
            describe.push(' ');
            describe.push_str(&target.name);
        }
        if let Some(value) = value {
            describe.push(' ');
            describe.push_str(&self.graph.display_value(value));
        }

        let summary = format!("{} node(s) matched {describe}", matches.len());
        let lines: Vec<String> = matches
            .iter()
            .map(|&id| format!("  {}", self.graph.node(id).name()))
            .collect();
        self.sink.write_line(&summary);
        for line in lines {
            self.sink.write_line(&line);
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Relation-instance queries
    // ══════════════════════════════════════════════════════════════════════

    pub(crate) fn exec_instance_query(&mut self, stmt: &InstanceQueryStmt) -> EvalResult<()> {
        match (&stmt.subject, &stmt.object) {
            (Some(subject), None) => self.forward_instance_query(subject, &stmt.relation),
            (None, Some(object)) => self.reverse_instance_query(&stmt.relation, object),
            (None, None) => {
                self.wildcard_instance_query(&stmt.relation);
                Ok(())
            }
            (Some(_), Some(_)) => Err(EvalError::at(
                ErrorKind::Runtime("malformed relation-instance query".into()),
                stmt.span,
            )),
        }
    }

    /// `Subject Rel ?` — the subject's outgoing instances. Inverse
    /// instances of bidirectional relations are displayed as if forward.
    fn forward_instance_query(&mut self, subject: &Ident, relation: &Ident) -> EvalResult<()> {
        let Some(id) = self.resolve_existing(&subject.name) else {
            return Err(EvalError::at(
                ErrorKind::NodeNotFound(subject.name.clone()),
                subject.span,
            ));
        };
        let node = self.graph.node(id);
        let mut lines = Vec::new();
        for inst in node.relation_instances(Some(&relation.name)) {
            let visible = if inst.is_inverse {
                inst.original
                    .as_deref()
                    .and_then(|original| self.graph.get(original))
                    .map(|rel| self.graph.node(rel).bidirectional())
                    .unwrap_or(false)
            } else {
                true
            };
            if visible {
                lines.push(format!(
                    "  {} {} {}",
                    node.name(),
                    inst.relation,
                    self.graph.node(inst.target).name()
                ));
            }
        }
        self.sink.write_line(&format!(
            "{} relation(s) matched {} {} ?",
            lines.len(),
            subject.name,
            relation.name.to_uppercase()
        ));
        for line in lines {
            self.sink.write_line(&line);
        }
        Ok(())
    }

    /// `? Rel Object` — the reverse-index answers forward edges in O(1);
    /// inverse-tagged instances are never indexed, so they come from a
    /// scan.
    fn reverse_instance_query(&mut self, relation: &Ident, object: &Ident) -> EvalResult<()> {
        let Some(target) = self.resolve_existing(&object.name) else {
            return Err(EvalError::at(
                ErrorKind::NodeNotFound(object.name.clone()),
                object.span,
            ));
        };
        let mut sources: BTreeSet<NodeId> = self.graph.get_source_nodes(&relation.name, target);
        for node in self.graph.all_nodes() {
            for inst in node.relation_instances(Some(&relation.name)) {
                if inst.is_inverse && inst.target == target {
                    sources.insert(node.id());
                }
            }
        }

        let mut names: Vec<String> = sources
            .iter()
            .map(|&id| self.graph.node(id).name().to_string())
            .collect();
        names.sort();
        self.sink.write_line(&format!(
            "{} node(s) matched ? {} {}",
            names.len(),
            relation.name.to_uppercase(),
            object.name
        ));
        for name in names {
            self.sink.write_line(&format!("  {name}"));
        }
        Ok(())
    }

    /// `? Rel ?` — every non-inverse instance of the relation, anywhere.
    fn wildcard_instance_query(&mut self, relation: &Ident) {
        let mut lines = Vec::new();
        for node in self.graph.all_nodes() {
            for inst in node.relation_instances(Some(&relation.name)) {
                if !inst.is_inverse {
                    lines.push(format!(
                        "  {} {} {}",
                        node.name(),
                        inst.relation,
                        self.graph.node(inst.target).name()
                    ));
                }
            }
        }
        self.sink.write_line(&format!(
            "{} relation(s) matched ? {} ?",
            lines.len(),
            relation.name.to_uppercase()
        ));
        for line in lines {
            self.sink.write_line(&line);
        }
    }
}
