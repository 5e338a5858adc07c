use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::DrugStatus;

// Backend fields arrive either as a bare string or as a list of equivalent values
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s.clone()],
            OneOrMany::Many(v) => v.clone(),
        }
    }

    pub fn first(&self) -> Option<&str> {
        match self {
            OneOrMany::One(s) => Some(s.as_str()),
            OneOrMany::Many(v) => v.first().map(String::as_str),
        }
    }
}

/// A node record as delivered by the user or the backend, before canonicalization.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, alias = "drugstoneId", skip_serializing_if = "Option::is_none")]
    pub backend_id: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netex_id: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drugstone_type: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniprot_ac: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensg: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DrugStatus>,
    #[serde(default)]
    pub in_trial: bool,
    #[serde(default)]
    pub in_literature: bool,
    #[serde(default)]
    pub trial_links: Vec<String>,
    #[serde(default)]
    pub icd10: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(default)]
    pub is_seed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    // Set for nodes an analysis returned as result targets
    #[serde(default)]
    pub target: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RawNode {
    pub fn with_id(id: impl Into<String>) -> Self {
        RawNode { id: Some(id.into()), ..Default::default() }
    }

    /// Every backend id variant carried by this record.
    pub fn backend_ids(&self) -> Vec<String> {
        let mut ids = self.backend_id.as_ref().map(OneOrMany::to_vec).unwrap_or_default();
        if let Some(netex) = &self.netex_id {
            ids.push(netex.clone());
        }
        ids.retain(|id| !id.trim().is_empty());
        ids
    }

    pub fn kind_marker(&self) -> Option<&str> {
        self.drugstone_type.as_deref().or(self.kind.as_deref())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEdge {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl RawEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        RawEdge { from: from.into(), to: to.into(), group: None, label: None }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkPayload {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

// Result networks list nodes as bare ids; full records live in nodeAttributes.details
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultNodeRef {
    Id(String),
    Record(RawNode),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultNetwork {
    #[serde(default)]
    pub nodes: Vec<ResultNodeRef>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAttributes {
    #[serde(default)]
    pub is_seed: HashMap<String, bool>,
    #[serde(default)]
    pub scores: HashMap<String, f64>,
    #[serde(default)]
    pub details: BTreeMap<String, RawNode>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskParameters {
    // Config the analysis was launched with; applied to the result view
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub seeds: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    #[serde(default)]
    pub network: ResultNetwork,
    #[serde(default)]
    pub node_attributes: NodeAttributes,
    #[serde(default)]
    pub target_nodes: Vec<String>,
    #[serde(default)]
    pub parameters: TaskParameters,
}
