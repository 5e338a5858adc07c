use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// Canonical display id, namespaced by kind prefix (e.g. "p_P04637")
pub type NodeId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindTag {
    Protein,
    Drug,
    Disorder,
    Custom,
}

impl KindTag {
    pub fn prefix(self) -> &'static str {
        match self {
            KindTag::Protein => "p_",
            KindTag::Drug => "dr_",
            KindTag::Disorder => "di_",
            KindTag::Custom => "c_",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            KindTag::Protein => "Protein",
            KindTag::Drug => "Drug",
            KindTag::Disorder => "Disorder",
            KindTag::Custom => "Custom",
        }
    }

    /// Parse an explicit kind marker as it appears in backend records ("protein", "Drug", ...).
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker.trim().to_ascii_lowercase().as_str() {
            "protein" | "gene" => Some(KindTag::Protein),
            "drug" => Some(KindTag::Drug),
            "disorder" => Some(KindTag::Disorder),
            "custom" => Some(KindTag::Custom),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrugStatus {
    Approved,
    #[default]
    Investigational,
}

// Kind-specific payload; dispatch on this instead of probing optional fields
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeKind {
    Protein {
        symbol: Option<String>,
        uniprot_ac: Option<String>,
        ensg: Vec<String>,
    },
    Drug {
        status: DrugStatus,
        in_trial: bool,
        in_literature: bool,
        trial_links: Vec<String>,
    },
    Disorder {
        icd10: Vec<String>,
    },
    Custom,
}

impl NodeKind {
    pub fn tag(&self) -> KindTag {
        match self {
            NodeKind::Protein { .. } => KindTag::Protein,
            NodeKind::Drug { .. } => KindTag::Drug,
            NodeKind::Disorder { .. } => KindTag::Disorder,
            NodeKind::Custom => KindTag::Custom,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    // User-assigned (or builder-assigned) style group. Seed/selection never overwrite it.
    pub group: String,
    pub score: Option<f64>,
    pub raw_score: Option<f64>,
    pub is_seed: bool,
    // Owned by the rendering surface; mirrored here on read
    pub position: Option<Position>,
    // All equivalent backend ids, sorted and deduplicated
    pub backend_ids: Vec<String>,
    pub image: Option<String>,
    pub details: BTreeMap<String, Value>,
}

impl Node {
    pub fn tag(&self) -> KindTag { self.kind.tag() }

    pub fn is_mapped(&self) -> bool { !self.backend_ids.is_empty() }

    pub fn primary_backend_id(&self) -> Option<&str> { self.backend_ids.first().map(String::as_str) }

    /// Stable id used by selection entries: the primary backend id when mapped, else the canonical id.
    pub fn lookup_id(&self) -> &str { self.primary_backend_id().unwrap_or(&self.id) }

    // Only proteins known to the backend can serve as analysis seeds
    pub fn is_selectable(&self) -> bool { self.tag() == KindTag::Protein && self.is_mapped() }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    ProteinProtein,
    ProteinDrug,
    ProteinDisorder,
    DrugDisorder,
    Custom,
}

impl EdgeKind {
    pub fn between(a: KindTag, b: KindTag) -> Self {
        use KindTag::*;
        match (a, b) {
            (Protein, Protein) => EdgeKind::ProteinProtein,
            (Protein, Drug) | (Drug, Protein) => EdgeKind::ProteinDrug,
            (Protein, Disorder) | (Disorder, Protein) => EdgeKind::ProteinDisorder,
            (Drug, Disorder) | (Disorder, Drug) => EdgeKind::DrugDisorder,
            _ => EdgeKind::Custom,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
    pub group: String,
    pub label: Option<String>,
}

impl Edge {
    pub fn touches(&self, id: &str) -> bool { self.from == id || self.to == id }
}
