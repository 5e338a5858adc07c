use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use anyhow::bail;
use serde_json::Value;

use crate::error::ExplorerError;
use crate::graph_utils::builder::{strip_ensg_version, GraphBuilder};
use crate::graph_utils::entity::{KindTag, NodeId};
use crate::graph_utils::graph::NetworkGraph;
use crate::graph_utils::payload::NetworkPayload;
use crate::graph_utils::scores::ScoreTable;
use crate::persistence::export;
use crate::persistence::settings::{ExplorerConfig, IdentifierKind};
use crate::remote::task::TaskState;
use crate::remote::{algorithms_for, Algorithm, AnalysisRequest, DisorderSource, ScoringService, TaskHandle, TaskTarget, TaskTransition, Tissue};
use crate::selection::{SelectionCommand, SelectionContext, SelectionEntry, SelectionRegistry};
use crate::style::gradient::expression_gradients;
use crate::view::{RenderSurface, ViewAction, ViewAdapter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreKind {
    Drugs,
    Proteins,
}

/// Nodes and edges an explorer overlay contributed to the main view.
#[derive(Clone, Debug, Default)]
struct OverlayRecord {
    graph: NetworkGraph,
}

impl OverlayRecord {
    fn edge_pairs(&self) -> Vec<(NodeId, NodeId)> {
        self.graph.edges.iter().map(|e| (e.from.clone(), e.to.clone())).collect()
    }
}

/// State of one opened analysis: the polled task and, once done, its result view.
pub struct AnalysisPanel<S: RenderSurface> {
    pub token: String,
    pub handle: TaskHandle,
    pub view: Option<ViewAdapter<S>>,
    pub graph: NetworkGraph,
    pub algorithm: Option<Algorithm>,
    pub drugs: ScoreTable,
    pub proteins: ScoreTable,
    pub normalize: bool,
    pub error: Option<String>,
    pub diagnostics: Vec<ExplorerError>,
}

impl<S: RenderSurface> AnalysisPanel<S> {
    pub fn context(&self) -> SelectionContext { SelectionContext::Analysis(self.token.clone()) }

    pub fn table(&self, kind: ScoreKind) -> &ScoreTable {
        match kind {
            ScoreKind::Drugs => &self.drugs,
            ScoreKind::Proteins => &self.proteins,
        }
    }

    pub fn drug_tooltip(&self) -> Option<&'static str> { self.algorithm.and_then(Algorithm::drug_tooltip) }
    pub fn protein_tooltip(&self) -> Option<&'static str> { self.algorithm.and_then(Algorithm::protein_tooltip) }
}

/// Single owner of config, selection and views. Every mutation of shared state
/// goes through here, one call at a time.
pub struct ExplorerSession<S: RenderSurface + Default, R: ScoringService> {
    config: ExplorerConfig,
    registry: SelectionRegistry,
    service: R,
    main: ViewAdapter<S>,
    graph: NetworkGraph,
    lookup: HashMap<String, NodeId>,
    diagnostics: Vec<ExplorerError>,
    analysis: Option<AnalysisPanel<S>>,
    drug_overlay: Option<OverlayRecord>,
    disorder_overlays: BTreeMap<DisorderSource, OverlayRecord>,
    tissue: Option<Tissue>,
    details: Option<NodeId>,
}

impl<S: RenderSurface + Default, R: ScoringService> ExplorerSession<S, R> {
    pub fn new(config: ExplorerConfig, service: R) -> Self {
        let mut registry = SelectionRegistry::new();
        let main = ViewAdapter::new(SelectionContext::Main, S::default(), config.clone(), &mut registry);
        ExplorerSession {
            config,
            registry,
            service,
            main,
            graph: NetworkGraph::new(),
            lookup: HashMap::new(),
            diagnostics: Vec::new(),
            analysis: None,
            drug_overlay: None,
            disorder_overlays: BTreeMap::new(),
            tissue: None,
            details: None,
        }
    }

    pub fn config(&self) -> &ExplorerConfig { &self.config }
    pub fn registry(&self) -> &SelectionRegistry { &self.registry }
    pub fn service(&self) -> &R { &self.service }
    pub fn service_mut(&mut self) -> &mut R { &mut self.service }
    pub fn main_view(&self) -> &ViewAdapter<S> { &self.main }
    pub fn main_view_mut(&mut self) -> &mut ViewAdapter<S> { &mut self.main }
    pub fn graph(&self) -> &NetworkGraph { &self.graph }
    pub fn diagnostics(&self) -> &[ExplorerError] { &self.diagnostics }
    pub fn analysis(&self) -> Option<&AnalysisPanel<S>> { self.analysis.as_ref() }
    pub fn analysis_mut(&mut self) -> Option<&mut AnalysisPanel<S>> { self.analysis.as_mut() }
    pub fn selected_tissue(&self) -> Option<&Tissue> { self.tissue.as_ref() }
    pub fn details(&self) -> Option<&NodeId> { self.details.as_ref() }
    pub fn has_drug_overlay(&self) -> bool { self.drug_overlay.is_some() }
    pub fn has_disorder_overlay(&self, source: DisorderSource) -> bool { self.disorder_overlays.contains_key(&source) }

    /// Map, build and render an input network. Mapping rejections propagate;
    /// data-shape problems come back as diagnostics.
    pub fn load_network(&mut self, payload: &NetworkPayload) -> anyhow::Result<Vec<ExplorerError>> {
        let mut payload = payload.clone();
        if self.config.identifier == IdentifierKind::Ensg {
            for node in &mut payload.nodes {
                node.id = node.id.as_deref().map(strip_ensg_version);
            }
            for edge in &mut payload.edges {
                edge.from = strip_ensg_version(&edge.from);
                edge.to = strip_ensg_version(&edge.to);
            }
        }

        let mapped = self.service.map_nodes(&payload.nodes, self.config.identifier)?;
        let mut edges = payload.edges;
        if self.config.autofill_edges {
            edges.extend(self.service.fetch_edges(&mapped, self.config.interaction_protein_protein)?);
        }
        let built = GraphBuilder::new(&self.config).build(&NetworkPayload { nodes: mapped, edges });
        log::info!(
            "network loaded: {} nodes, {} edges, {} diagnostics",
            built.graph.node_count(),
            built.graph.edge_count(),
            built.diagnostics.len()
        );

        self.drug_overlay = None;
        self.disorder_overlays.clear();
        self.tissue = None;
        self.details = None;
        self.graph = built.graph;
        self.lookup = built.lookup;
        self.diagnostics = built.diagnostics.clone();

        self.registry.dispatch_to(&SelectionContext::Main, SelectionCommand::Reset);
        self.main.load(&self.graph, &self.registry);
        self.pump();
        Ok(built.diagnostics)
    }

    /// Apply a runtime config change and re-resolve every rendered node.
    pub fn apply_config_overrides(&mut self, overrides: &Value) -> anyhow::Result<Vec<ExplorerError>> {
        let (main_cfg, issues) = self.config.with_overrides(overrides)?;
        let analysis_cfg = match self.analysis.as_ref().and_then(|p| p.view.as_ref()) {
            Some(view) => Some(view.config().with_overrides(overrides)?.0),
            None => None,
        };

        self.config = main_cfg;
        self.main.set_config(self.config.clone());
        if let (Some(view), Some(cfg)) = (self.analysis.as_mut().and_then(|p| p.view.as_mut()), analysis_cfg) {
            view.set_config(cfg);
        }
        Ok(issues)
    }

    /// Drain surface events and registry notifications until nothing is pending.
    pub fn pump(&mut self) -> Vec<ViewAction> {
        let mut actions = Vec::new();
        loop {
            let mut round = self.main.handle_surface_events(&mut self.registry);
            if let Some(view) = self.analysis.as_mut().and_then(|p| p.view.as_mut()) {
                round.extend(view.handle_surface_events(&mut self.registry));
            }
            let mut applied = self.main.sync();
            if let Some(view) = self.analysis.as_mut().and_then(|p| p.view.as_mut()) {
                applied += view.sync();
            }
            if round.is_empty() && applied == 0 {
                break;
            }
            actions.extend(round);
        }
        for action in &actions {
            match action {
                ViewAction::ShowDetails(id) => self.details = Some(id.clone()),
                ViewAction::HideDetails => self.details = None,
            }
        }
        self.refresh_tables();
        actions
    }

    fn refresh_tables(&mut self) {
        if let Some(panel) = self.analysis.as_mut() {
            let ctx = panel.context();
            let registry = &self.registry;
            panel.proteins.mark_selected(|id| registry.contains(&ctx, id));
            panel.drugs.mark_selected(|id| registry.contains(&ctx, id));
        }
    }

    fn active_view(&self) -> &ViewAdapter<S> {
        match self.analysis.as_ref().and_then(|p| p.view.as_ref()) {
            Some(view) if view.context() == self.registry.active_context() => view,
            _ => &self.main,
        }
    }

    fn active_view_mut(&mut self) -> &mut ViewAdapter<S> {
        let active = self.registry.active_context().clone();
        match self.analysis.as_mut().and_then(|p| p.view.as_mut()) {
            Some(view) if *view.context() == active => view,
            _ => &mut self.main,
        }
    }

    /// Double-click behaviour: flip the selection of a mapped protein in the active view.
    pub fn toggle_selection(&mut self, node_id: &str) -> bool {
        let view = self.active_view();
        let Some(cached) = view.cached(node_id) else { return false };
        if !cached.node().is_selectable() {
            return false;
        }
        let entry = SelectionEntry::from_node(cached.node());
        let context = view.context().clone();
        self.registry.dispatch_to(&context, SelectionCommand::Toggle(entry));
        self.pump();
        true
    }

    pub fn clear_selection(&mut self) {
        self.registry.reset();
        self.pump();
    }

    /// Open the result panel for `token`: switch selection context and poll once.
    pub fn open_analysis(&mut self, token: &str) -> anyhow::Result<TaskTransition> {
        self.close_analysis();
        let context = SelectionContext::Analysis(token.to_string());
        self.registry.switch_context(context);
        self.analysis = Some(AnalysisPanel {
            token: token.to_string(),
            handle: TaskHandle::new(token),
            view: None,
            graph: NetworkGraph::new(),
            algorithm: None,
            drugs: ScoreTable::default(),
            proteins: ScoreTable::default(),
            normalize: true,
            error: None,
            diagnostics: Vec::new(),
        });
        self.pump();
        self.poll_analysis()
    }

    /// Poll the open task once; builds the result view on completion.
    pub fn poll_analysis(&mut self) -> anyhow::Result<TaskTransition> {
        let Some(panel) = self.analysis.as_mut() else { bail!("no analysis panel open") };
        if panel.handle.is_terminal() {
            // A finished task whose result could not be fetched yet is retried on every poll
            if panel.handle.state == TaskState::Done && panel.view.is_none() {
                self.load_task_result()?;
                return Ok(TaskTransition::Completed);
            }
            return Ok(TaskTransition::Unchanged);
        }
        let task = match self.service.task(&panel.token) {
            Ok(t) => t,
            Err(err) => {
                panel.error = Some(err.to_string());
                return Err(err);
            }
        };
        let transition = panel.handle.observe(task);
        match &transition {
            TaskTransition::Completed => self.load_task_result()?,
            TaskTransition::Failed(err) => panel.error = Some(err.to_string()),
            _ => {}
        }
        Ok(transition)
    }

    fn load_task_result(&mut self) -> anyhow::Result<()> {
        let Some(panel) = self.analysis.as_mut() else { return Ok(()) };
        let result = match self.service.task_result(&panel.token) {
            Ok(r) => r,
            Err(err) => {
                panel.error = Some(err.to_string());
                return Err(err);
            }
        };
        panel.error = None;

        let mut cfg = self.config.clone();
        if let Some(embedded) = &result.parameters.config {
            match cfg.apply_overrides(embedded) {
                Ok(issues) => panel.diagnostics.extend(issues),
                Err(err) => log::warn!("task {} carries an unusable config: {err}", panel.token),
            }
        }
        let built = GraphBuilder::new(&cfg).build_task_result(&result);
        panel.diagnostics.extend(built.diagnostics);
        panel.graph = built.graph;

        let mut view = ViewAdapter::new(panel.context(), S::default(), cfg, &mut self.registry);
        // Seeds are only highlighted on request in result views
        view.set_highlight_seeds(false);
        view.load(&panel.graph, &self.registry);
        panel.view = Some(view);

        panel.algorithm = panel.handle.algorithm().and_then(Algorithm::from_slug);
        panel.normalize = panel.algorithm.is_none_or(Algorithm::normalize_by_default);
        panel.drugs = ScoreTable::from_graph(&panel.graph, KindTag::Drug);
        panel.proteins = ScoreTable::from_graph(&panel.graph, KindTag::Protein);
        panel.drugs.normalize(panel.normalize);
        panel.proteins.normalize(panel.normalize);
        log::info!(
            "task {} result: {} drugs, {} proteins",
            panel.token,
            panel.drugs.len(),
            panel.proteins.len()
        );
        self.pump();
        Ok(())
    }

    /// Discard the task handle and result view, then return to the main selection.
    pub fn close_analysis(&mut self) {
        let Some(mut panel) = self.analysis.take() else { return };
        if let Some(view) = panel.view.as_mut() {
            view.detach(&mut self.registry);
        }
        let context = panel.context();
        if panel.view.as_ref().is_some_and(|v| !v.gradients().is_empty()) {
            self.tissue = None;
        }
        self.registry.close_context(context);
        self.pump();
    }

    pub fn offered_algorithms(&self, target: TaskTarget) -> Vec<Algorithm> { algorithms_for(target, &self.config) }

    /// Queue an analysis seeded with the proteins selected in the active context.
    pub fn launch_analysis(&mut self, algorithm: Algorithm, target: TaskTarget) -> anyhow::Result<String> {
        if !self.offered_algorithms(target).contains(&algorithm) {
            bail!("{} is not offered for {} searches", algorithm.name(), target.label());
        }
        let seeds: Vec<String> = self
            .registry
            .selection()
            .into_iter()
            .filter(|e| e.kind == KindTag::Protein)
            .map(|e| e.lookup_id)
            .collect();
        let request = AnalysisRequest::new(algorithm, target, seeds, &self.config);
        let token = self.service.start_task(&request)?;
        log::info!("launched {} ({}) as task {token}", algorithm.slug(), target.label());
        Ok(token)
    }

    pub fn set_normalization(&mut self, on: bool) {
        if let Some(panel) = self.analysis.as_mut() {
            panel.normalize = on;
            panel.drugs.normalize(on);
            panel.proteins.normalize(on);
        }
    }

    pub fn set_highlight_seeds(&mut self, on: bool) {
        if let Some(view) = self.analysis.as_mut().and_then(|p| p.view.as_mut()) {
            view.set_highlight_seeds(on);
        }
    }

    fn mapped_ids(graph: &NetworkGraph, tag: KindTag) -> Vec<String> {
        graph.nodes_of_kind(tag).filter_map(|n| n.primary_backend_id().map(str::to_string)).collect()
    }

    fn attach_overlay(&mut self, payload: &NetworkPayload) -> OverlayRecord {
        let built = GraphBuilder::new(&self.config).build_with_lookup(payload, &self.lookup);
        for (k, v) in &built.lookup {
            self.lookup.entry(k.clone()).or_insert_with(|| v.clone());
        }
        self.main.add_overlay(&built.graph, &self.registry);
        OverlayRecord { graph: built.graph }
    }

    fn detach_overlay(&mut self, overlay: &OverlayRecord, keep: &BTreeSet<NodeId>) {
        let nodes: Vec<NodeId> = overlay
            .graph
            .nodes
            .keys()
            .filter(|id| !keep.contains(*id) && !self.graph.contains(id))
            .cloned()
            .collect();
        let edges: Vec<(NodeId, NodeId)> =
            overlay.edge_pairs().into_iter().filter(|(f, t)| !self.graph.has_edge(f, t)).collect();
        self.main.remove_overlay(&nodes, &edges);
    }

    /// Show or hide drugs targeting the main network's proteins. Returns the new state.
    pub fn toggle_adjacent_drugs(&mut self) -> anyhow::Result<bool> {
        if let Some(overlay) = self.drug_overlay.take() {
            // Drug-disorder links hang off the drugs; they go too
            if let Some(drug_disorders) = self.disorder_overlays.remove(&DisorderSource::Drugs) {
                let keep = self.overlay_nodes(DisorderSource::Proteins);
                self.detach_overlay(&drug_disorders, &keep);
            }
            self.detach_overlay(&overlay, &BTreeSet::new());
            return Ok(false);
        }
        let ids = Self::mapped_ids(&self.graph, KindTag::Protein);
        let payload = self.service.adjacent_drugs(&ids, self.config.interaction_drug_protein)?;
        let overlay = self.attach_overlay(&payload);
        self.drug_overlay = Some(overlay);
        Ok(true)
    }

    fn overlay_nodes(&self, source: DisorderSource) -> BTreeSet<NodeId> {
        self.disorder_overlays.get(&source).map(|o| o.graph.node_ids()).unwrap_or_default()
    }

    /// Show or hide disorders linked to the network's proteins or to the shown drugs.
    pub fn toggle_adjacent_disorders(&mut self, source: DisorderSource) -> anyhow::Result<bool> {
        let other = match source {
            DisorderSource::Proteins => DisorderSource::Drugs,
            DisorderSource::Drugs => DisorderSource::Proteins,
        };
        if let Some(overlay) = self.disorder_overlays.remove(&source) {
            let keep = self.overlay_nodes(other);
            self.detach_overlay(&overlay, &keep);
            return Ok(false);
        }
        let ids = match source {
            DisorderSource::Proteins => Self::mapped_ids(&self.graph, KindTag::Protein),
            DisorderSource::Drugs => match &self.drug_overlay {
                Some(o) => Self::mapped_ids(&o.graph, KindTag::Drug),
                None => bail!("show adjacent drugs before their disorders"),
            },
        };
        let payload = self.service.adjacent_disorders(source, &ids)?;
        let overlay = self.attach_overlay(&payload);
        self.disorder_overlays.insert(source, overlay);
        Ok(true)
    }

    pub fn tissues(&self) -> anyhow::Result<Vec<Tissue>> { self.service.tissues() }

    /// Color the active view's proteins by expression in `tissue`; `None` clears it.
    pub fn select_tissue(&mut self, tissue: Option<Tissue>) -> anyhow::Result<()> {
        let Some(tissue) = tissue else {
            self.tissue = None;
            self.active_view_mut().clear_gradients();
            return Ok(());
        };
        let view = self.active_view();
        let mut by_backend: HashMap<String, NodeId> = HashMap::new();
        for cached in view.cached_nodes() {
            let node = cached.node();
            if node.tag() == KindTag::Protein {
                if let Some(bid) = node.primary_backend_id() {
                    by_backend.insert(bid.to_string(), node.id.clone());
                }
            }
        }
        let mut ids: Vec<String> = by_backend.keys().cloned().collect();
        ids.sort();
        let levels = self.service.tissue_expression(&tissue, &ids)?;
        let per_node: BTreeMap<NodeId, Option<f64>> = levels
            .into_iter()
            .filter_map(|(bid, level)| by_backend.get(&bid).map(|id| (id.clone(), level)))
            .collect();
        log::info!("tissue {}: expression for {} proteins", tissue.name, per_node.len());
        self.active_view_mut().set_gradients(expression_gradients(&per_node));
        self.tissue = Some(tissue);
        Ok(())
    }

    /// Write one score table of the open analysis as CSV; returns the file written.
    pub fn export_scores(&self, kind: ScoreKind, dir: Option<PathBuf>) -> anyhow::Result<PathBuf> {
        let Some(panel) = self.analysis.as_ref() else { bail!("no analysis panel open") };
        let dir = dir.unwrap_or_else(|| self.config.export_dir());
        let stem = match kind {
            ScoreKind::Drugs => format!("{}_drugs", panel.token),
            ScoreKind::Proteins => format!("{}_proteins", panel.token),
        };
        let path = export::versioned_export_path(&dir, &stem);
        export::export_scores_csv(panel.table(kind), &path)?;
        Ok(path)
    }
}
