use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::graph_utils::entity::{KindTag, Node, NodeId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SelectionContext {
    Main,
    // Keyed by analysis task token
    Analysis(String),
}

impl fmt::Display for SelectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionContext::Main => write!(f, "main"),
            SelectionContext::Analysis(token) => write!(f, "analysis:{token}"),
        }
    }
}

/// A selected entity. `lookup_id` is stable across views and rebuilds;
/// `node_id` is the canonical id in the view that created the entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub lookup_id: String,
    pub node_id: NodeId,
    pub label: String,
    pub kind: KindTag,
}

impl SelectionEntry {
    pub fn from_node(node: &Node) -> Self {
        SelectionEntry {
            lookup_id: node.lookup_id().to_string(),
            node_id: node.id.clone(),
            label: node.label.clone(),
            kind: node.tag(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectionCommand {
    Add(Vec<SelectionEntry>),
    Remove(Vec<SelectionEntry>),
    Toggle(SelectionEntry),
    Reset,
    SwitchContext(SelectionContext),
    CloseContext(SelectionContext),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectionEvent {
    // Incremental: `items` were added (true) or removed (false)
    Changed { context: SelectionContext, items: Vec<SelectionEntry>, added: bool },
    // Rebuild from scratch: `items` is the complete selection of `context`
    Resync { context: SelectionContext, items: Vec<SelectionEntry> },
}

impl SelectionEvent {
    pub fn context(&self) -> &SelectionContext {
        match self {
            SelectionEvent::Changed { context, .. } | SelectionEvent::Resync { context, .. } => context,
        }
    }
}

pub type SubscriptionId = Uuid;

#[derive(Clone, Debug, Default)]
struct ContextSelection {
    order: Vec<SelectionEntry>,
    index: HashSet<String>,
}

impl ContextSelection {
    fn insert(&mut self, entry: SelectionEntry) -> bool {
        if !self.index.insert(entry.lookup_id.clone()) {
            return false;
        }
        self.order.push(entry);
        true
    }

    fn remove(&mut self, lookup_id: &str) -> Option<SelectionEntry> {
        if !self.index.remove(lookup_id) {
            return None;
        }
        let pos = self.order.iter().position(|e| e.lookup_id == lookup_id)?;
        Some(self.order.remove(pos))
    }
}

/// The selection owner for a session. All mutations go through [`SelectionRegistry::dispatch`],
/// which applies them in issue order and broadcasts one event per effective change.
#[derive(Debug)]
pub struct SelectionRegistry {
    contexts: BTreeMap<SelectionContext, ContextSelection>,
    active: SelectionContext,
    subscribers: Vec<(SubscriptionId, Sender<SelectionEvent>)>,
}

impl Default for SelectionRegistry {
    fn default() -> Self { Self::new() }
}

impl SelectionRegistry {
    pub fn new() -> Self {
        let mut contexts = BTreeMap::new();
        contexts.insert(SelectionContext::Main, ContextSelection::default());
        SelectionRegistry { contexts, active: SelectionContext::Main, subscribers: Vec::new() }
    }

    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<SelectionEvent>) {
        let (tx, rx) = mpsc::channel();
        let id = Uuid::now_v7();
        self.subscribers.push((id, tx));
        (id, rx)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        before != self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize { self.subscribers.len() }

    pub fn active_context(&self) -> &SelectionContext { &self.active }

    /// Apply one command to the active context; returns the events it produced.
    pub fn dispatch(&mut self, command: SelectionCommand) -> Vec<SelectionEvent> {
        let context = self.active.clone();
        self.dispatch_to(&context, command)
    }

    /// Apply one command to `context`, which need not be the active one.
    pub fn dispatch_to(&mut self, context: &SelectionContext, command: SelectionCommand) -> Vec<SelectionEvent> {
        let events = self.reduce(context, command);
        for event in &events {
            self.broadcast(event);
        }
        events
    }

    fn reduce(&mut self, context: &SelectionContext, command: SelectionCommand) -> Vec<SelectionEvent> {
        match command {
            SelectionCommand::Add(items) => {
                let set = self.contexts.entry(context.clone()).or_default();
                let added: Vec<SelectionEntry> = items.into_iter().filter(|e| set.insert(e.clone())).collect();
                changed(context, added, true)
            }
            SelectionCommand::Remove(items) => {
                let set = self.contexts.entry(context.clone()).or_default();
                let removed: Vec<SelectionEntry> = items.iter().filter_map(|e| set.remove(&e.lookup_id)).collect();
                changed(context, removed, false)
            }
            SelectionCommand::Toggle(entry) => {
                let set = self.contexts.entry(context.clone()).or_default();
                match set.remove(&entry.lookup_id) {
                    Some(removed) => changed(context, vec![removed], false),
                    None => {
                        set.insert(entry.clone());
                        changed(context, vec![entry], true)
                    }
                }
            }
            SelectionCommand::Reset => {
                self.contexts.insert(context.clone(), ContextSelection::default());
                vec![SelectionEvent::Resync { context: context.clone(), items: Vec::new() }]
            }
            SelectionCommand::SwitchContext(target) => {
                if target == self.active {
                    return Vec::new();
                }
                log::info!("selection context {} -> {}", self.active, target);
                self.active = target.clone();
                let items = self.contexts.entry(target.clone()).or_default().order.clone();
                vec![SelectionEvent::Resync { context: target, items }]
            }
            SelectionCommand::CloseContext(target) => {
                if target == SelectionContext::Main {
                    // The main set lives as long as the session
                    return Vec::new();
                }
                self.contexts.remove(&target);
                if self.active == target {
                    self.reduce(context, SelectionCommand::SwitchContext(SelectionContext::Main))
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn broadcast(&mut self, event: &SelectionEvent) {
        // Drop subscribers whose receiving view is gone
        self.subscribers.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    // Convenience wrappers over dispatch on the active context
    pub fn add(&mut self, items: Vec<SelectionEntry>) -> Vec<SelectionEvent> { self.dispatch(SelectionCommand::Add(items)) }
    pub fn remove(&mut self, items: Vec<SelectionEntry>) -> Vec<SelectionEvent> { self.dispatch(SelectionCommand::Remove(items)) }
    pub fn toggle(&mut self, entry: SelectionEntry) -> Vec<SelectionEvent> { self.dispatch(SelectionCommand::Toggle(entry)) }
    pub fn reset(&mut self) -> Vec<SelectionEvent> { self.dispatch(SelectionCommand::Reset) }

    pub fn switch_context(&mut self, context: SelectionContext) -> Vec<SelectionEvent> {
        self.dispatch(SelectionCommand::SwitchContext(context))
    }

    pub fn close_context(&mut self, context: SelectionContext) -> Vec<SelectionEvent> {
        self.dispatch(SelectionCommand::CloseContext(context))
    }

    pub fn in_selection(&self, entry: &SelectionEntry) -> bool { self.contains(&self.active, &entry.lookup_id) }

    pub fn contains(&self, context: &SelectionContext, lookup_id: &str) -> bool {
        self.contexts.get(context).is_some_and(|s| s.index.contains(lookup_id))
    }

    /// Selection of the active context in insertion order.
    pub fn selection(&self) -> Vec<SelectionEntry> { self.selection_of(&self.active) }

    pub fn selection_of(&self, context: &SelectionContext) -> Vec<SelectionEntry> {
        self.contexts.get(context).map(|s| s.order.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize { self.contexts.get(&self.active).map_or(0, |s| s.order.len()) }

    pub fn has_context(&self, context: &SelectionContext) -> bool { self.contexts.contains_key(context) }
}

fn changed(context: &SelectionContext, items: Vec<SelectionEntry>, added: bool) -> Vec<SelectionEvent> {
    // Idempotent no-ops stay silent
    if items.is_empty() {
        return Vec::new();
    }
    vec![SelectionEvent::Changed { context: context.clone(), items, added }]
}
