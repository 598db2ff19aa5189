//! A single graph node: properties, edges, abilities, relation instances.

use crate::value::Value;
use relscript_types::ast::Stmt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Arena handle for a node. Stable for the lifetime of the graph — nodes
/// are never deleted, only detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// One outgoing typed edge recorded on a node.
///
/// Inverse-tagged instances mirror a forward edge held by the other
/// endpoint; only forward instances are registered in the graph's
/// reverse-index.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationInstance {
    pub relation: String,
    pub target: NodeId,
    pub is_inverse: bool,
    /// The forward relation this instance was derived from, for inverse
    /// and bidirectional instances.
    pub original: Option<String>,
}

/// A named, mutable vertex.
///
/// Edge mutation goes through [`Graph`](crate::Graph) so the derived
/// indexes stay in sync; everything that touches only this node's own
/// data lives here.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) properties: BTreeMap<String, Value>,
    pub(crate) parents: Vec<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) abilities: BTreeSet<String>,
    pub(crate) relation_instances: Vec<RelationInstance>,
    // Interpreter bookkeeping for relation-definition nodes.
    pub(crate) roles: Vec<String>,
    pub(crate) body: Option<Vec<Stmt>>,
    pub(crate) inverse: Option<String>,
    pub(crate) bidirectional: bool,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            properties: BTreeMap::new(),
            parents: Vec::new(),
            children: Vec::new(),
            abilities: BTreeSet::new(),
            relation_instances: Vec::new(),
            roles: Vec::new(),
            body: None,
            inverse: None,
            bidirectional: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Properties ────────────────────────────────────────────────────────

    /// Own property only — inherited lookup lives on the graph.
    pub fn get_own_property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn has_own_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Direct assignment; always succeeds, overwrites.
    pub fn set_property(&mut self, name: impl Into<String>, value: Value) {
        self.properties.insert(name.into(), value);
    }

    pub fn remove_property(&mut self, name: &str) -> Option<Value> {
        self.properties.remove(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.properties.iter()
    }

    // ── Edges (read-only views) ───────────────────────────────────────────

    /// Parents in declared order; first match wins during resolution.
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    // ── Abilities ─────────────────────────────────────────────────────────

    pub fn add_ability(&mut self, ability: impl Into<String>) {
        self.abilities.insert(ability.into());
    }

    pub fn remove_ability(&mut self, ability: &str) -> bool {
        self.abilities.remove(ability)
    }

    pub fn has_own_ability(&self, ability: &str) -> bool {
        self.abilities.contains(ability)
    }

    pub fn abilities(&self) -> impl Iterator<Item = &String> {
        self.abilities.iter()
    }

    // ── Relation instances ────────────────────────────────────────────────

    /// All instances, or those whose relation name matches `filter`
    /// case-insensitively.
    pub fn relation_instances(&self, filter: Option<&str>) -> Vec<&RelationInstance> {
        match filter {
            None => self.relation_instances.iter().collect(),
            Some(name) => self
                .relation_instances
                .iter()
                .filter(|inst| inst.relation.eq_ignore_ascii_case(name))
                .collect(),
        }
    }

    // ── Relation-definition bookkeeping ───────────────────────────────────

    /// Declared role names; first role is the caller/subject slot.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn set_roles(&mut self, roles: Vec<String>) {
        self.roles = roles;
    }

    pub fn body(&self) -> Option<&Vec<Stmt>> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: Vec<Stmt>) {
        self.body = Some(body);
    }

    pub fn inverse(&self) -> Option<&str> {
        self.inverse.as_deref()
    }

    pub fn set_inverse(&mut self, name: impl Into<String>) {
        self.inverse = Some(name.into());
    }

    pub fn bidirectional(&self) -> bool {
        self.bidirectional
    }

    pub fn set_bidirectional(&mut self, flag: bool) {
        self.bidirectional = flag;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_round_trip() {
        let mut node = Node::new(NodeId(0), "Player");
        node.set_property("HP", Value::Number(100.0));
        assert!(node.has_own_property("HP"));
        assert_eq!(node.get_own_property("HP"), Some(&Value::Number(100.0)));
        node.set_property("HP", Value::Number(75.0));
        assert_eq!(node.get_own_property("HP"), Some(&Value::Number(75.0)));
        assert_eq!(node.remove_property("HP"), Some(Value::Number(75.0)));
        assert!(!node.has_own_property("HP"));
    }

    #[test]
    fn test_abilities() {
        let mut node = Node::new(NodeId(0), "Player");
        node.add_ability("Fight");
        node.add_ability("Fight");
        assert!(node.has_own_ability("Fight"));
        assert_eq!(node.abilities().count(), 1);
        assert!(node.remove_ability("Fight"));
        assert!(!node.remove_ability("Fight"));
    }

    #[test]
    fn test_relation_instance_filter_case_insensitive() {
        let mut node = Node::new(NodeId(0), "Player");
        node.relation_instances.push(RelationInstance {
            relation: "Owns".into(),
            target: NodeId(1),
            is_inverse: false,
            original: None,
        });
        assert_eq!(node.relation_instances(Some("OWNS")).len(), 1);
        assert_eq!(node.relation_instances(Some("owns")).len(), 1);
        assert_eq!(node.relation_instances(Some("LIKES")).len(), 0);
        assert_eq!(node.relation_instances(None).len(), 1);
    }
}
