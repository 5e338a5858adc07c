use std::collections::{BTreeMap, HashSet};
use std::sync::mpsc::Receiver;

use crate::graph_utils::entity::{Edge, Node, NodeId};
use crate::graph_utils::graph::NetworkGraph;
use crate::persistence::settings::ExplorerConfig;
use crate::selection::{SelectionCommand, SelectionContext, SelectionEntry, SelectionEvent, SelectionRegistry, SubscriptionId};
use crate::style::gradient::NO_EXPRESSION;
use crate::style::{self, StyleFlags, StyledNode};

use super::surface::{RenderSurface, SurfaceEvent};

#[derive(Clone, Debug, PartialEq)]
pub struct CachedNode {
    pub styled: StyledNode,
    pub selected: bool,
}

impl CachedNode {
    pub fn node(&self) -> &Node { &self.styled.node }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ViewAction {
    ShowDetails(NodeId),
    HideDetails,
}

/// Glue between one rendering surface and the shared selection registry.
/// Owns the per-view style cache keyed by canonical id.
pub struct ViewAdapter<S: RenderSurface> {
    context: SelectionContext,
    surface: S,
    config: ExplorerConfig,
    cache: BTreeMap<NodeId, CachedNode>,
    edges: Vec<Edge>,
    subscription: Option<(SubscriptionId, Receiver<SelectionEvent>)>,
    highlight_seeds: bool,
    gradients: BTreeMap<NodeId, f32>,
}

impl<S: RenderSurface> ViewAdapter<S> {
    pub fn new(context: SelectionContext, surface: S, config: ExplorerConfig, registry: &mut SelectionRegistry) -> Self {
        let subscription = Some(registry.subscribe());
        ViewAdapter {
            context,
            surface,
            config,
            cache: BTreeMap::new(),
            edges: Vec::new(),
            subscription,
            highlight_seeds: true,
            gradients: BTreeMap::new(),
        }
    }

    pub fn context(&self) -> &SelectionContext { &self.context }
    pub fn surface(&self) -> &S { &self.surface }
    pub fn surface_mut(&mut self) -> &mut S { &mut self.surface }
    pub fn config(&self) -> &ExplorerConfig { &self.config }
    pub fn is_attached(&self) -> bool { self.subscription.is_some() }
    pub fn highlight_seeds(&self) -> bool { self.highlight_seeds }
    pub fn gradients(&self) -> &BTreeMap<NodeId, f32> { &self.gradients }

    pub fn cached(&self, id: &str) -> Option<&CachedNode> { self.cache.get(id) }
    pub fn cached_nodes(&self) -> impl Iterator<Item = &CachedNode> { self.cache.values() }
    pub fn edges(&self) -> &[Edge] { &self.edges }
    pub fn node_count(&self) -> usize { self.cache.len() }

    pub fn is_selected(&self, id: &str) -> bool { self.cache.get(id).is_some_and(|c| c.selected) }

    fn flags_for(&self, node: &Node, selected: bool) -> StyleFlags {
        let mut flags = StyleFlags::new(node.is_seed && self.highlight_seeds, selected);
        if let Some(g) = self.gradients.get(&node.id) {
            flags = flags.with_gradient(*g);
        }
        flags
    }

    fn restyle_ids(&mut self, ids: &[NodeId]) -> Vec<StyledNode> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(cached) = self.cache.get(id) else { continue };
            let flags = self.flags_for(cached.node(), cached.selected);
            let styled = style::restyle(&cached.styled, &self.config, &flags);
            if let Some(slot) = self.cache.get_mut(id) {
                slot.styled = styled.clone();
            }
            out.push(styled);
        }
        out
    }

    fn restyle_all(&mut self) {
        let ids: Vec<NodeId> = self.cache.keys().cloned().collect();
        log::debug!("{}: re-resolving {} nodes", self.context, ids.len());
        let batch = self.restyle_ids(&ids);
        self.surface.update(batch);
    }

    /// Render `graph` from scratch. Selection flags are read from the registry;
    /// every node starts from its base group.
    pub fn load(&mut self, graph: &NetworkGraph, registry: &SelectionRegistry) {
        self.cache.clear();
        self.gradients.clear();
        for node in graph.nodes.values() {
            let selected = registry.contains(&self.context, node.lookup_id());
            let flags = self.flags_for(node, selected);
            let styled = style::resolve(node, &self.config, &flags);
            self.cache.insert(node.id.clone(), CachedNode { styled, selected });
        }
        self.edges = graph.edges.clone();
        let nodes = self.cache.values().map(|c| c.styled.clone()).collect();
        self.surface.set_data(nodes, self.edges.clone());
        log::debug!("{}: loaded {} nodes, {} edges", self.context, self.cache.len(), self.edges.len());
    }

    /// Drain pending registry notifications; returns how many applied to this view.
    pub fn sync(&mut self) -> usize {
        let events: Vec<SelectionEvent> = match &self.subscription {
            Some((_, rx)) => rx.try_iter().collect(),
            None => return 0,
        };
        let mut applied = 0;
        for event in events {
            if event.context() != &self.context {
                continue;
            }
            applied += 1;
            match event {
                SelectionEvent::Changed { items, added, .. } => {
                    let wanted: HashSet<&str> = items.iter().map(|e| e.lookup_id.as_str()).collect();
                    let mut touched = Vec::new();
                    for (id, cached) in self.cache.iter_mut() {
                        if wanted.contains(cached.styled.node.lookup_id()) && cached.selected != added {
                            cached.selected = added;
                            touched.push(id.clone());
                        }
                    }
                    let batch = self.restyle_ids(&touched);
                    self.surface.update(batch);
                }
                SelectionEvent::Resync { items, .. } => {
                    let wanted: HashSet<&str> = items.iter().map(|e| e.lookup_id.as_str()).collect();
                    for cached in self.cache.values_mut() {
                        cached.selected = wanted.contains(cached.styled.node.lookup_id());
                    }
                    self.restyle_all();
                }
            }
        }
        applied
    }

    /// Translate surface interaction into registry commands and UI actions.
    pub fn handle_surface_events(&mut self, registry: &mut SelectionRegistry) -> Vec<ViewAction> {
        let mut actions = Vec::new();
        for event in self.surface.take_events() {
            match event {
                SurfaceEvent::Click(Some(id)) if self.cache.contains_key(&id) => actions.push(ViewAction::ShowDetails(id)),
                SurfaceEvent::Click(_) | SurfaceEvent::Deselect(_) => actions.push(ViewAction::HideDetails),
                SurfaceEvent::DoubleClick(id) => {
                    if let Some(cached) = self.cache.get(&id) {
                        let node = cached.node();
                        if node.is_selectable() {
                            registry.dispatch_to(&self.context, SelectionCommand::Toggle(SelectionEntry::from_node(node)));
                        }
                    }
                }
            }
        }
        actions
    }

    /// Current node with its position mirrored from the surface.
    pub fn node(&self, id: &str) -> Option<Node> {
        let mut node = self.cache.get(id)?.node().clone();
        if let Some(pos) = self.surface.positions(&[node.id.clone()]).remove(&node.id) {
            node.position = Some(pos);
        }
        Some(node)
    }

    /// Swap the style config between passes; every rendered node is re-resolved.
    pub fn set_config(&mut self, config: ExplorerConfig) {
        self.config = config;
        self.restyle_all();
    }

    pub fn set_highlight_seeds(&mut self, on: bool) {
        if self.highlight_seeds == on {
            return;
        }
        self.highlight_seeds = on;
        let seeds: Vec<NodeId> = self.cache.values().filter(|c| c.node().is_seed).map(|c| c.node().id.clone()).collect();
        let batch = self.restyle_ids(&seeds);
        self.surface.update(batch);
    }

    /// Apply expression gradients; ids not rendered by this view are skipped.
    pub fn set_gradients(&mut self, gradients: BTreeMap<NodeId, f32>) {
        let previous: Vec<NodeId> = self.gradients.keys().cloned().collect();
        self.gradients = gradients.into_iter().filter(|(id, _)| self.cache.contains_key(id)).collect();
        let mut ids: Vec<NodeId> = previous;
        ids.extend(self.gradients.keys().cloned());
        ids.sort();
        ids.dedup();
        let missing = self.gradients.values().filter(|g| **g == NO_EXPRESSION).count();
        log::debug!("{}: {} gradient nodes, {} without expression data", self.context, self.gradients.len(), missing);
        let batch = self.restyle_ids(&ids);
        self.surface.update(batch);
    }

    pub fn clear_gradients(&mut self) {
        let ids: Vec<NodeId> = std::mem::take(&mut self.gradients).into_keys().collect();
        let batch = self.restyle_ids(&ids);
        self.surface.update(batch);
    }

    /// Add nodes and edges not yet rendered. Returns the node ids that were new.
    pub fn add_overlay(&mut self, graph: &NetworkGraph, registry: &SelectionRegistry) -> Vec<NodeId> {
        let mut new_nodes = Vec::new();
        for node in graph.nodes.values() {
            if self.cache.contains_key(&node.id) {
                continue;
            }
            let selected = registry.contains(&self.context, node.lookup_id());
            let flags = self.flags_for(node, selected);
            let styled = style::resolve(node, &self.config, &flags);
            self.cache.insert(node.id.clone(), CachedNode { styled: styled.clone(), selected });
            new_nodes.push(styled);
        }
        let mut new_edges = Vec::new();
        for edge in &graph.edges {
            let present = self.edges.iter().any(|e| e.from == edge.from && e.to == edge.to);
            if !present && self.cache.contains_key(&edge.from) && self.cache.contains_key(&edge.to) {
                self.edges.push(edge.clone());
                new_edges.push(edge.clone());
            }
        }
        let ids = new_nodes.iter().map(|n| n.node.id.clone()).collect();
        self.surface.add(new_nodes, new_edges);
        ids
    }

    /// Remove overlay nodes (with their edges) and any extra overlay edges.
    pub fn remove_overlay(&mut self, ids: &[NodeId], edges: &[(NodeId, NodeId)]) {
        for id in ids {
            self.cache.remove(id);
            self.gradients.remove(id);
        }
        self.edges.retain(|e| !ids.iter().any(|id| e.touches(id)));
        self.edges.retain(|e| !edges.iter().any(|(f, t)| e.from == *f && e.to == *t));
        self.surface.remove(ids);
        self.surface.remove_edges(edges);
    }

    /// Stop listening to the registry. The cache stays readable.
    pub fn detach(&mut self, registry: &mut SelectionRegistry) {
        if let Some((id, _)) = self.subscription.take() {
            registry.unsubscribe(id);
        }
    }
}
