//! The graph arena: node ownership, edge mutation, derived indexes,
//! and cycle-guarded inherited lookup.

use crate::node::{Node, NodeId, RelationInstance};
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Owns every node of one interpreter session, keyed by unique name.
///
/// Two derived indexes are maintained incrementally, mirrored exactly when
/// the corresponding forward structure mutates:
///
/// - **type index**: type name → nodes with that name as a *direct*
///   IS-parent. Transitive queries do a breadth-first closure over it.
/// - **relation reverse-index**: (upper-cased relation name, target) →
///   nodes holding a forward relation instance to that target.
///
/// Ordered maps keep every scan and dump deterministic.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    by_name: BTreeMap<String, NodeId>,
    type_index: BTreeMap<String, BTreeSet<NodeId>>,
    relation_index: BTreeMap<(String, NodeId), BTreeSet<NodeId>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Node lifecycle ────────────────────────────────────────────────────

    /// Look up a node by name, creating it on first reference.
    pub fn get_or_create(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(id, name));
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn has(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in name order.
    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.by_name.values().map(|&id| self.node(id))
    }

    // ── Inheritance edges ─────────────────────────────────────────────────

    /// Add an IS edge. Idempotent; registers `child` in the type index
    /// under the parent's name.
    pub fn add_parent(&mut self, child: NodeId, parent: NodeId) {
        if self.nodes[child.0 as usize].parents.contains(&parent) {
            return;
        }
        self.nodes[child.0 as usize].parents.push(parent);
        let type_name = self.node(parent).name().to_string();
        self.register_node_type(&type_name, child);
    }

    pub fn remove_parent(&mut self, child: NodeId, parent: NodeId) {
        let parents = &mut self.nodes[child.0 as usize].parents;
        let Some(pos) = parents.iter().position(|&p| p == parent) else {
            return;
        };
        parents.remove(pos);
        let type_name = self.node(parent).name().to_string();
        self.unregister_node_type(&type_name, child);
    }

    // ── Containment edges ─────────────────────────────────────────────────

    /// Add a CONTAINS edge. Idempotent; no index — containment lookups
    /// scan the child list directly.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        let children = &mut self.nodes[parent.0 as usize].children;
        if !children.contains(&child) {
            children.push(child);
        }
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        let children = &mut self.nodes[parent.0 as usize].children;
        if let Some(pos) = children.iter().position(|&c| c == child) {
            children.remove(pos);
        }
    }

    // ── Type index ────────────────────────────────────────────────────────

    /// Nodes with `type_name` as a direct IS-parent (non-transitive).
    pub fn get_nodes_by_type(&self, type_name: &str) -> BTreeSet<NodeId> {
        self.type_index
            .get(type_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Transitive closure: breadth-first over the type index, expanding
    /// through every discovered node's own name as a further type key.
    /// The result set doubles as the visited set.
    pub fn get_all_nodes_by_type(&self, type_name: &str) -> BTreeSet<NodeId> {
        let mut result = BTreeSet::new();
        let mut queue = vec![type_name.to_string()];
        while let Some(name) = queue.pop() {
            if let Some(direct) = self.type_index.get(&name) {
                for &id in direct {
                    if result.insert(id) {
                        queue.push(self.node(id).name().to_string());
                    }
                }
            }
        }
        result
    }

    fn register_node_type(&mut self, type_name: &str, node: NodeId) {
        self.type_index
            .entry(type_name.to_string())
            .or_default()
            .insert(node);
    }

    fn unregister_node_type(&mut self, type_name: &str, node: NodeId) {
        if let Some(set) = self.type_index.get_mut(type_name) {
            set.remove(&node);
            if set.is_empty() {
                self.type_index.remove(type_name);
            }
        }
    }

    // ── Relation instances & reverse-index ────────────────────────────────

    /// Record an outgoing relation instance on `source`. Forward (non-
    /// inverse) instances are also registered in the reverse-index under
    /// the upper-cased relation name.
    pub fn add_relation_instance(
        &mut self,
        source: NodeId,
        relation: &str,
        target: NodeId,
        is_inverse: bool,
        original: Option<String>,
    ) {
        self.nodes[source.0 as usize]
            .relation_instances
            .push(RelationInstance {
                relation: relation.to_string(),
                target,
                is_inverse,
                original,
            });
        if !is_inverse {
            self.relation_index
                .entry((relation.to_uppercase(), target))
                .or_default()
                .insert(source);
        }
    }

    /// "Who points at `target` via `relation`" — O(1) average, relation
    /// name case-normalized.
    pub fn get_source_nodes(&self, relation: &str, target: NodeId) -> BTreeSet<NodeId> {
        self.relation_index
            .get(&(relation.to_uppercase(), target))
            .cloned()
            .unwrap_or_default()
    }

    // ── Cycle-guarded inherited lookup ────────────────────────────────────

    /// Inherited property lookup: own value first, then each parent in
    /// declared order, first match wins. Safe on cyclic inheritance.
    pub fn get_property(&self, id: NodeId, name: &str) -> Option<Value> {
        let mut visited = HashSet::new();
        self.get_property_guarded(id, name, &mut visited)
    }

    fn get_property_guarded(
        &self,
        id: NodeId,
        name: &str,
        visited: &mut HashSet<NodeId>,
    ) -> Option<Value> {
        if !visited.insert(id) {
            return None;
        }
        let node = self.node(id);
        if let Some(value) = node.get_own_property(name) {
            return Some(value.clone());
        }
        for &parent in &node.parents {
            if let Some(value) = self.get_property_guarded(parent, name, visited) {
                return Some(value);
            }
        }
        None
    }

    /// True if the node's own name equals `type_name`, or any ancestor's
    /// does. A node "is" itself.
    pub fn is_type(&self, id: NodeId, type_name: &str) -> bool {
        let mut visited = HashSet::new();
        self.is_type_guarded(id, type_name, &mut visited)
    }

    fn is_type_guarded(&self, id: NodeId, type_name: &str, visited: &mut HashSet<NodeId>) -> bool {
        if !visited.insert(id) {
            return false;
        }
        let node = self.node(id);
        if node.name() == type_name {
            return true;
        }
        node.parents
            .iter()
            .any(|&parent| self.is_type_guarded(parent, type_name, visited))
    }

    /// Abilities inherit like properties.
    pub fn can(&self, id: NodeId, ability: &str) -> bool {
        let mut visited = HashSet::new();
        self.can_guarded(id, ability, &mut visited)
    }

    fn can_guarded(&self, id: NodeId, ability: &str, visited: &mut HashSet<NodeId>) -> bool {
        if !visited.insert(id) {
            return false;
        }
        let node = self.node(id);
        if node.has_own_ability(ability) {
            return true;
        }
        node.parents
            .iter()
            .any(|&parent| self.can_guarded(parent, ability, visited))
    }

    // ── Display ───────────────────────────────────────────────────────────

    /// Render a value for user-visible output. Integral numbers drop the
    /// trailing `.0`; node references render as the node's name.
    pub fn display_value(&self, value: &Value) -> String {
        match value {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Value::Text(s) => s.clone(),
            Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Node(id) => self.node(*id).name().to_string(),
            Value::Null => "null".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut g = Graph::new();
        let a = g.get_or_create("Player");
        let b = g.get_or_create("Player");
        assert_eq!(a, b);
        assert_eq!(g.len(), 1);
        assert!(g.has("Player"));
        assert_eq!(g.get("Ghost"), None);
    }

    #[test]
    fn test_add_parent_idempotent_and_indexed() {
        let mut g = Graph::new();
        let dog = g.get_or_create("Dog");
        let animal = g.get_or_create("Animal");
        g.add_parent(dog, animal);
        g.add_parent(dog, animal);
        assert_eq!(g.node(dog).parents(), &[animal]);
        let direct = g.get_nodes_by_type("Animal");
        assert_eq!(direct.len(), 1);
        assert!(direct.contains(&dog));
    }

    #[test]
    fn test_remove_parent_unregisters_type() {
        let mut g = Graph::new();
        let dog = g.get_or_create("Dog");
        let animal = g.get_or_create("Animal");
        g.add_parent(dog, animal);
        g.remove_parent(dog, animal);
        assert!(g.node(dog).parents().is_empty());
        assert!(g.get_nodes_by_type("Animal").is_empty());
        // Removing again is a no-op
        g.remove_parent(dog, animal);
    }

    #[test]
    fn test_type_closure_transitive() {
        let mut g = Graph::new();
        let animal = g.get_or_create("Animal");
        let dog = g.get_or_create("Dog");
        let puppy = g.get_or_create("Puppy");
        g.add_parent(dog, animal);
        g.add_parent(puppy, dog);

        let direct = g.get_nodes_by_type("Animal");
        assert!(direct.contains(&dog));
        assert!(!direct.contains(&puppy));

        let all = g.get_all_nodes_by_type("Animal");
        assert!(all.contains(&dog));
        assert!(all.contains(&puppy));
    }

    #[test]
    fn test_inherited_property_first_match_wins() {
        let mut g = Graph::new();
        let a = g.get_or_create("A");
        let b = g.get_or_create("B");
        let c = g.get_or_create("C");
        g.add_parent(a, b);
        g.add_parent(a, c);
        g.node_mut(c).set_property("HP", Value::Number(10.0));
        assert_eq!(g.get_property(a, "HP"), Some(Value::Number(10.0)));

        // B is earlier in the parent list, so its value shadows C's.
        g.node_mut(b).set_property("HP", Value::Number(5.0));
        assert_eq!(g.get_property(a, "HP"), Some(Value::Number(5.0)));

        // Own value shadows everything.
        g.node_mut(a).set_property("HP", Value::Number(1.0));
        assert_eq!(g.get_property(a, "HP"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_cycle_safety() {
        let mut g = Graph::new();
        let a = g.get_or_create("A");
        let b = g.get_or_create("B");
        g.add_parent(a, b);
        g.add_parent(b, a);
        // All traversals terminate on the cycle.
        assert!(g.is_type(a, "A"));
        assert!(g.is_type(a, "B"));
        assert!(!g.is_type(a, "C"));
        assert_eq!(g.get_property(a, "anything"), None);
        assert!(!g.can(a, "anything"));
    }

    #[test]
    fn test_is_type_reflexive_and_transitive() {
        let mut g = Graph::new();
        let a = g.get_or_create("A");
        let b = g.get_or_create("B");
        let c = g.get_or_create("C");
        g.add_parent(a, b);
        g.add_parent(b, c);
        assert!(g.is_type(a, "A"));
        assert!(g.is_type(a, "C"));
        assert!(!g.is_type(c, "A"));
    }

    #[test]
    fn test_abilities_inherit() {
        let mut g = Graph::new();
        let player = g.get_or_create("Player");
        let entity = g.get_or_create("Entity");
        g.add_parent(player, entity);
        g.node_mut(entity).add_ability("Move");
        assert!(g.can(player, "Move"));
        assert!(!g.can(entity, "Fly"));
    }

    #[test]
    fn test_children_idempotent() {
        let mut g = Graph::new();
        let bag = g.get_or_create("Bag");
        let coin = g.get_or_create("Coin");
        g.add_child(bag, coin);
        g.add_child(bag, coin);
        assert_eq!(g.node(bag).children(), &[coin]);
        g.remove_child(bag, coin);
        assert!(g.node(bag).children().is_empty());
    }

    #[test]
    fn test_reverse_index() {
        let mut g = Graph::new();
        let player = g.get_or_create("Player");
        let sword = g.get_or_create("Sword");
        g.add_relation_instance(player, "Owns", sword, false, None);
        // Case-normalized lookup
        let sources = g.get_source_nodes("OWNS", sword);
        assert!(sources.contains(&player));
        let sources = g.get_source_nodes("owns", sword);
        assert!(sources.contains(&player));
        // Inverse instances are not indexed
        g.add_relation_instance(sword, "OwnedBy", player, true, Some("Owns".into()));
        assert!(g.get_source_nodes("OWNEDBY", player).is_empty());
    }

    #[test]
    fn test_display_value() {
        let mut g = Graph::new();
        let hero = g.get_or_create("Hero");
        assert_eq!(g.display_value(&Value::Number(100.0)), "100");
        assert_eq!(g.display_value(&Value::Number(2.5)), "2.5");
        assert_eq!(g.display_value(&Value::Text("hi".into())), "hi");
        assert_eq!(g.display_value(&Value::Boolean(true)), "true");
        assert_eq!(g.display_value(&Value::Node(hero)), "Hero");
        assert_eq!(g.display_value(&Value::Null), "null");
    }
}
