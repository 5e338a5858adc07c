use std::collections::BTreeMap;

use crate::graph_utils::entity::{Edge, NodeId, Position};
use crate::style::StyledNode;

use super::surface::{RenderSurface, SurfaceEvent};

/// Headless surface: keeps what it is given and replays queued events.
/// Used when no window is available and throughout the test suite.
#[derive(Debug, Default)]
pub struct MemorySurface {
    pub nodes: BTreeMap<NodeId, StyledNode>,
    pub edges: Vec<Edge>,
    pub positions: BTreeMap<NodeId, Position>,
    pending: Vec<SurfaceEvent>,
    // Ids of each `update` batch, newest last
    pub update_log: Vec<Vec<NodeId>>,
}

impl MemorySurface {
    pub fn new() -> Self { Self::default() }

    pub fn push_event(&mut self, event: SurfaceEvent) { self.pending.push(event); }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges.iter().any(|e| e.from == from && e.to == to)
    }

    fn place(&mut self, node: &StyledNode) {
        let k = self.positions.len() as f32;
        let pos = node.node.position.unwrap_or(Position { x: k * 10.0, y: 0.0 });
        self.positions.entry(node.node.id.clone()).or_insert(pos);
    }
}

impl RenderSurface for MemorySurface {
    fn set_data(&mut self, nodes: Vec<StyledNode>, edges: Vec<Edge>) {
        self.nodes.clear();
        self.positions.clear();
        for n in nodes {
            self.place(&n);
            self.nodes.insert(n.node.id.clone(), n);
        }
        self.edges = edges;
    }

    fn get(&self, id: &str) -> Option<&StyledNode> { self.nodes.get(id) }

    fn update(&mut self, nodes: Vec<StyledNode>) {
        let mut batch = Vec::with_capacity(nodes.len());
        for n in nodes {
            if let Some(slot) = self.nodes.get_mut(&n.node.id) {
                batch.push(n.node.id.clone());
                *slot = n;
            }
        }
        self.update_log.push(batch);
    }

    fn add(&mut self, nodes: Vec<StyledNode>, edges: Vec<Edge>) {
        for n in nodes {
            self.place(&n);
            self.nodes.insert(n.node.id.clone(), n);
        }
        for e in edges {
            if !self.has_edge(&e.from, &e.to) {
                self.edges.push(e);
            }
        }
    }

    fn remove(&mut self, ids: &[NodeId]) {
        for id in ids {
            self.nodes.remove(id);
            self.positions.remove(id);
            self.edges.retain(|e| !e.touches(id));
        }
    }

    fn remove_edges(&mut self, pairs: &[(NodeId, NodeId)]) {
        self.edges.retain(|e| !pairs.iter().any(|(f, t)| e.from == *f && e.to == *t));
    }

    fn positions(&self, ids: &[NodeId]) -> BTreeMap<NodeId, Position> {
        ids.iter().filter_map(|id| self.positions.get(id).map(|p| (id.clone(), *p))).collect()
    }

    fn take_events(&mut self) -> Vec<SurfaceEvent> { std::mem::take(&mut self.pending) }
}
