use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::graph_utils::payload::{NetworkPayload, OneOrMany, RawEdge, RawNode, TaskResult};
use crate::persistence::settings::{DrugProteinDataset, IdentifierKind, ProteinProteinDataset};
use crate::style::groups::{DISORDER_GROUP, FOUND_DRUG_GROUP};

use super::analysis::AnalysisRequest;
use super::task::Task;
use super::{DisorderSource, ScoringService, Tissue};

/// Canned backend data, usually loaded from a JSON file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OfflineFixture {
    // Input identifier -> backend record
    pub mappings: BTreeMap<String, RawNode>,
    pub protein_interactions: Vec<RawEdge>,
    // protein backend id -> drug backend id
    pub drug_targets: Vec<RawEdge>,
    pub drugs: BTreeMap<String, RawNode>,
    // protein or drug backend id -> disorder backend id
    pub disorder_links: Vec<RawEdge>,
    pub disorders: BTreeMap<String, RawNode>,
    pub tissues: Vec<Tissue>,
    // tissue id -> backend id -> level
    pub expression: BTreeMap<String, BTreeMap<String, Option<f64>>>,
    // Successive poll answers per token; the last one repeats
    pub tasks: BTreeMap<String, Vec<Task>>,
    pub results: BTreeMap<String, TaskResult>,
    // Tokens handed out by start_task, in order
    pub launch_tokens: Vec<String>,
    // Make every mapping call fail, as an unreachable backend would
    pub reject_mapping: bool,
}

/// In-process [`ScoringService`] answering from an [`OfflineFixture`].
#[derive(Debug, Default)]
pub struct OfflineService {
    fixture: OfflineFixture,
    cursors: RefCell<HashMap<String, usize>>,
    launch_tokens: RefCell<VecDeque<String>>,
    launched: RefCell<Vec<AnalysisRequest>>,
}

impl OfflineService {
    pub fn new(fixture: OfflineFixture) -> Self {
        let launch_tokens = RefCell::new(fixture.launch_tokens.iter().cloned().collect());
        OfflineService { fixture, cursors: RefCell::default(), launch_tokens, launched: RefCell::default() }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let s = fs::read_to_string(path)?;
        let fixture: OfflineFixture = serde_json::from_str(&s)?;
        Ok(Self::new(fixture))
    }

    pub fn fixture(&self) -> &OfflineFixture { &self.fixture }
    pub fn fixture_mut(&mut self) -> &mut OfflineFixture { &mut self.fixture }

    /// Requests received by `start_task`, oldest first.
    pub fn launched(&self) -> Vec<AnalysisRequest> { self.launched.borrow().clone() }

    fn linked(edges: &[RawEdge], ids: &BTreeSet<&str>) -> Vec<RawEdge> {
        edges.iter().filter(|e| ids.contains(e.from.as_str())).cloned().collect()
    }
}

impl ScoringService for OfflineService {
    fn task(&self, token: &str) -> anyhow::Result<Task> {
        let seq = self.fixture.tasks.get(token).ok_or_else(|| anyhow!("unknown task token {token}"))?;
        let mut cursors = self.cursors.borrow_mut();
        let cursor = cursors.entry(token.to_string()).or_insert(0);
        let task = seq
            .get(*cursor)
            .or_else(|| seq.last())
            .cloned()
            .ok_or_else(|| anyhow!("task {token} has no state"))?;
        *cursor += 1;
        Ok(task)
    }

    fn task_result(&self, token: &str) -> anyhow::Result<TaskResult> {
        self.fixture.results.get(token).cloned().ok_or_else(|| anyhow!("no result for task {token}"))
    }

    fn start_task(&self, request: &AnalysisRequest) -> anyhow::Result<String> {
        if request.seeds.is_empty() {
            bail!("an analysis needs at least one seed");
        }
        let token = self
            .launch_tokens
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("task queue is full"))?;
        self.launched.borrow_mut().push(request.clone());
        Ok(token)
    }

    fn map_nodes(&self, nodes: &[RawNode], identifier: IdentifierKind) -> anyhow::Result<Vec<RawNode>> {
        if self.fixture.reject_mapping {
            bail!("mapping service unavailable");
        }
        log::debug!("mapping {} nodes by {:?}", nodes.len(), identifier);
        Ok(nodes
            .iter()
            .map(|raw| {
                let key = raw.id.as_deref().or(raw.label.as_deref()).unwrap_or_default();
                let Some(hit) = self.fixture.mappings.get(key) else { return raw.clone() };
                let mut out = raw.clone();
                out.backend_id = hit.backend_id.clone();
                out.symbol = out.symbol.or_else(|| hit.symbol.clone());
                out.uniprot_ac = out.uniprot_ac.or_else(|| hit.uniprot_ac.clone());
                out.ensg = out.ensg.or_else(|| hit.ensg.clone());
                if out.kind_marker().is_none() {
                    out.kind = hit.kind_marker().map(str::to_string).or_else(|| Some("protein".to_string()));
                }
                out
            })
            .collect())
    }

    fn fetch_edges(&self, nodes: &[RawNode], dataset: ProteinProteinDataset) -> anyhow::Result<Vec<RawEdge>> {
        let ids: BTreeSet<String> = nodes.iter().flat_map(RawNode::backend_ids).collect();
        log::debug!("autofill from {:?} for {} proteins", dataset, ids.len());
        Ok(self
            .fixture
            .protein_interactions
            .iter()
            .filter(|e| ids.contains(&e.from) && ids.contains(&e.to))
            .cloned()
            .collect())
    }

    fn adjacent_drugs(&self, protein_ids: &[String], dataset: DrugProteinDataset) -> anyhow::Result<NetworkPayload> {
        let ids: BTreeSet<&str> = protein_ids.iter().map(String::as_str).collect();
        let edges = Self::linked(&self.fixture.drug_targets, &ids);
        log::debug!("{} drug links from {:?}", edges.len(), dataset);
        let drug_ids: BTreeSet<&str> = edges.iter().map(|e| e.to.as_str()).collect();
        let nodes = drug_ids
            .into_iter()
            .map(|id| {
                let mut drug = self.fixture.drugs.get(id).cloned().unwrap_or_else(|| RawNode::with_id(id));
                drug.backend_id = Some(OneOrMany::One(id.to_string()));
                drug.kind = Some("drug".to_string());
                drug.group = Some(FOUND_DRUG_GROUP.to_string());
                drug
            })
            .collect();
        Ok(NetworkPayload { nodes, edges })
    }

    fn adjacent_disorders(&self, source: DisorderSource, ids: &[String]) -> anyhow::Result<NetworkPayload> {
        let ids: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
        let edges = Self::linked(&self.fixture.disorder_links, &ids);
        log::debug!("{} disorder links for {:?}", edges.len(), source);
        let disorder_ids: BTreeSet<&str> = edges.iter().map(|e| e.to.as_str()).collect();
        let nodes = disorder_ids
            .into_iter()
            .map(|id| {
                let mut disorder = self.fixture.disorders.get(id).cloned().unwrap_or_else(|| RawNode::with_id(id));
                disorder.backend_id = Some(OneOrMany::One(id.to_string()));
                disorder.kind = Some("disorder".to_string());
                disorder.group = Some(DISORDER_GROUP.to_string());
                disorder
            })
            .collect();
        Ok(NetworkPayload { nodes, edges })
    }

    fn tissues(&self) -> anyhow::Result<Vec<Tissue>> { Ok(self.fixture.tissues.clone()) }

    fn tissue_expression(&self, tissue: &Tissue, protein_ids: &[String]) -> anyhow::Result<BTreeMap<String, Option<f64>>> {
        let levels = self
            .fixture
            .expression
            .get(&tissue.id)
            .ok_or_else(|| anyhow!("unknown tissue {}", tissue.name))?;
        Ok(protein_ids.iter().map(|id| (id.clone(), levels.get(id).copied().flatten())).collect())
    }
}
