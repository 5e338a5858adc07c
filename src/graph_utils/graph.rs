use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::entity::{Edge, KindTag, Node, NodeId};

/// Canonicalized node/edge set shared by a view. Node ids are unique across kinds.
/// Edge endpoints name a node in `nodes`, except in overlay builds whose edges attach
/// to the graph they get merged into.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkGraph {
    pub nodes: BTreeMap<NodeId, Node>,
    pub edges: Vec<Edge>,
}

impl NetworkGraph {
    // Instantiate a new, empty graph
    pub fn new() -> Self { Self::default() }

    // Insert or replace a node; returns true when the id was new
    pub fn add_node(&mut self, node: Node) -> bool {
        self.nodes.insert(node.id.clone(), node).is_none()
    }

    // Add an edge if both ends exist and it is not already present
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if !self.nodes.contains_key(&edge.from) || !self.nodes.contains_key(&edge.to) {
            return false;
        }
        if self.has_edge(&edge.from, &edge.to) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges.iter().any(|e| e.from == from && e.to == to)
    }

    pub fn remove_edge(&mut self, from: &str, to: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| !(e.from == from && e.to == to));
        before != self.edges.len()
    }

    pub fn remove_node(&mut self, id: &str) -> bool {
        if self.nodes.remove(id).is_some() {
            // Cascade delete edges involving this node
            self.edges.retain(|e| !e.touches(id));
            true
        } else {
            false
        }
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> { self.nodes.get(id) }
    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut Node> { self.nodes.get_mut(id) }
    pub fn contains(&self, id: &str) -> bool { self.nodes.contains_key(id) }
    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.edges.len() }

    pub fn node_ids(&self) -> BTreeSet<NodeId> { self.nodes.keys().cloned().collect() }

    // Fetch helpers
    pub fn find_node_ids_by_label(&self, label: &str) -> Vec<NodeId> {
        self
            .nodes
            .values()
            .filter_map(|node| if node.label == label { Some(node.id.clone()) } else { None })
            .collect()
    }

    pub fn nodes_of_kind(&self, tag: KindTag) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |n| n.tag() == tag)
    }

    pub fn find_by_backend_id(&self, backend_id: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.backend_ids.iter().any(|b| b == backend_id))
    }

    pub fn neighbors(&self, id: &str) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .edges
            .iter()
            .filter_map(|e| {
                if e.from == id { Some(e.to.clone()) } else if e.to == id { Some(e.from.clone()) } else { None }
            })
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Fold `other` into this graph, skipping nodes already present.
    /// Returns the ids that were actually added.
    pub fn merge(&mut self, other: &NetworkGraph) -> Vec<NodeId> {
        let mut added = Vec::new();
        for node in other.nodes.values() {
            if !self.contains(&node.id) {
                self.nodes.insert(node.id.clone(), node.clone());
                added.push(node.id.clone());
            }
        }
        for edge in &other.edges {
            self.add_edge(edge.clone());
        }
        added
    }
}
