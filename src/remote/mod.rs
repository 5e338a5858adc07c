pub mod analysis;
pub mod endpoints;
pub mod offline;
pub mod task;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph_utils::payload::{NetworkPayload, RawEdge, RawNode, TaskResult};
use crate::persistence::settings::{DrugProteinDataset, IdentifierKind, ProteinProteinDataset};

pub use analysis::{algorithms_for, Algorithm, AnalysisRequest};
pub use offline::OfflineService;
pub use task::{Task, TaskHandle, TaskTarget, TaskTransition};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tissue {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisorderSource {
    Proteins,
    Drugs,
}

/// Everything the explorer asks of the remote scoring backend. A rejected call
/// surfaces as `Err` and is shown to the user; nothing here retries.
pub trait ScoringService {
    fn task(&self, token: &str) -> anyhow::Result<Task>;
    fn task_result(&self, token: &str) -> anyhow::Result<TaskResult>;
    /// Queue an analysis; returns its token.
    fn start_task(&self, request: &AnalysisRequest) -> anyhow::Result<String>;

    /// Annotate records with their canonical backend id. Records the backend cannot
    /// resolve come back unchanged.
    fn map_nodes(&self, nodes: &[RawNode], identifier: IdentifierKind) -> anyhow::Result<Vec<RawNode>>;
    fn fetch_edges(&self, nodes: &[RawNode], dataset: ProteinProteinDataset) -> anyhow::Result<Vec<RawEdge>>;

    /// Drugs targeting the given proteins, with protein-drug edges.
    fn adjacent_drugs(&self, protein_ids: &[String], dataset: DrugProteinDataset) -> anyhow::Result<NetworkPayload>;
    /// Disorders associated with the given proteins or drugs.
    fn adjacent_disorders(&self, source: DisorderSource, ids: &[String]) -> anyhow::Result<NetworkPayload>;

    fn tissues(&self) -> anyhow::Result<Vec<Tissue>>;
    /// Expression level per backend id; `None` where the tissue has no data.
    fn tissue_expression(&self, tissue: &Tissue, protein_ids: &[String]) -> anyhow::Result<BTreeMap<String, Option<f64>>>;
}
