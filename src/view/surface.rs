use std::collections::BTreeMap;

use crate::graph_utils::entity::{Edge, NodeId, Position};
use crate::style::StyledNode;

#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceEvent {
    // None when the click landed on empty canvas
    Click(Option<NodeId>),
    DoubleClick(NodeId),
    Deselect(Vec<NodeId>),
}

/// Drawing component a view renders into. It owns node positions; everything else
/// it holds is a copy of what the view pushed.
pub trait RenderSurface {
    /// Replace everything currently drawn.
    fn set_data(&mut self, nodes: Vec<StyledNode>, edges: Vec<Edge>);
    fn get(&self, id: &str) -> Option<&StyledNode>;
    /// Restyle nodes already on the surface; unknown ids are ignored.
    fn update(&mut self, nodes: Vec<StyledNode>);
    fn add(&mut self, nodes: Vec<StyledNode>, edges: Vec<Edge>);
    /// Remove nodes together with every edge touching them.
    fn remove(&mut self, ids: &[NodeId]);
    fn remove_edges(&mut self, pairs: &[(NodeId, NodeId)]);
    fn positions(&self, ids: &[NodeId]) -> BTreeMap<NodeId, Position>;
    /// Drain interaction events raised since the last call.
    fn take_events(&mut self) -> Vec<SurfaceEvent>;
}
