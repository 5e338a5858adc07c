use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::persistence::settings::{DrugProteinDataset, ExplorerConfig, IdentifierKind, ProteinProteinDataset};

use super::task::TaskTarget;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Trustrank,
    Closeness,
    Degree,
    Proximity,
    Betweenness,
    Keypathwayminer,
    Multisteiner,
    Quick,
    Super,
}

impl Algorithm {
    pub const ALL: [Algorithm; 9] = [
        Algorithm::Trustrank,
        Algorithm::Closeness,
        Algorithm::Degree,
        Algorithm::Proximity,
        Algorithm::Betweenness,
        Algorithm::Keypathwayminer,
        Algorithm::Multisteiner,
        Algorithm::Quick,
        Algorithm::Super,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Algorithm::Trustrank => "trustrank",
            Algorithm::Closeness => "closeness",
            Algorithm::Degree => "degree",
            Algorithm::Proximity => "proximity",
            Algorithm::Betweenness => "betweenness",
            Algorithm::Keypathwayminer => "keypathwayminer",
            Algorithm::Multisteiner => "multisteiner",
            Algorithm::Quick => "quick",
            Algorithm::Super => "super",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> { Self::ALL.into_iter().find(|a| a.slug() == slug) }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Trustrank => "TrustRank",
            Algorithm::Closeness => "Closeness Centrality",
            Algorithm::Degree => "Degree Centrality",
            Algorithm::Proximity => "Network Proximity",
            Algorithm::Betweenness => "Betweenness Centrality",
            Algorithm::Keypathwayminer => "KeyPathwayMiner",
            Algorithm::Multisteiner => "Multi-Steiner",
            Algorithm::Quick => "Simple",
            Algorithm::Super => "Quick-Start",
        }
    }

    pub fn has_scores(self) -> bool { !matches!(self, Algorithm::Keypathwayminer | Algorithm::Multisteiner) }

    // Proximity z-scores rank lower-is-better; dividing by the max makes no sense
    pub fn normalize_by_default(self) -> bool { self != Algorithm::Proximity }

    pub fn drug_tooltip(self) -> Option<&'static str> { self.tooltip("drug") }
    pub fn protein_tooltip(self) -> Option<&'static str> { self.tooltip("protein") }

    fn tooltip(self, entity: &str) -> Option<&'static str> {
        let drug = entity == "drug";
        let text = match self {
            Algorithm::Degree if drug => {
                "Normalized number of direct interactions of the drug with the seeds. The higher the score, the more relevant the drug."
            }
            Algorithm::Degree => {
                "Normalized number of direct interactions of the protein with the seeds. The higher the score, the more relevant the protein."
            }
            Algorithm::Closeness | Algorithm::Quick | Algorithm::Super if drug => {
                "Normalized inverse mean distance of the drug to the seeds. The higher the score, the more relevant the drug."
            }
            Algorithm::Closeness | Algorithm::Quick | Algorithm::Super => {
                "Normalized inverse mean distance of the protein to the seeds. The higher the score, the more relevant the protein."
            }
            Algorithm::Trustrank if drug => {
                "Amount of 'trust' on the drug at termination of the algorithm. The higher the score, the more relevant the drug."
            }
            Algorithm::Trustrank => {
                "Amount of 'trust' on the protein at termination of the algorithm. The higher the score, the more relevant the protein."
            }
            Algorithm::Proximity => {
                "Empirical z-score of mean minimum distance between the drug's targets and the seeds. The lower the score, the more relevant the drug."
            }
            _ => return None,
        };
        Some(text)
    }

    pub fn default_parameters(self) -> Value {
        match self {
            Algorithm::Trustrank => json!({ "dampingFactor": 0.85, "hubPenalty": 0.0, "resultSize": 20, "maxDeg": null }),
            Algorithm::Closeness | Algorithm::Degree | Algorithm::Proximity | Algorithm::Betweenness => {
                json!({ "hubPenalty": 0.0, "resultSize": 20, "maxDeg": null })
            }
            Algorithm::Keypathwayminer => json!({ "k": 5 }),
            Algorithm::Multisteiner => json!({ "numTrees": 5, "tolerance": 10, "hubPenalty": 0.0, "maxDeg": null }),
            Algorithm::Quick | Algorithm::Super => json!({ "resultSize": 20 }),
        }
    }
}

/// Algorithms offered for `target`, narrowed by the config's allow-list.
/// Never empty: falls back to trustrank.
pub fn algorithms_for(target: TaskTarget, config: &ExplorerConfig) -> Vec<Algorithm> {
    let offered: &[Algorithm] = match target {
        TaskTarget::DrugTarget => &[
            Algorithm::Multisteiner,
            Algorithm::Keypathwayminer,
            Algorithm::Trustrank,
            Algorithm::Closeness,
            Algorithm::Degree,
            Algorithm::Betweenness,
        ],
        TaskTarget::Drug => &[Algorithm::Trustrank, Algorithm::Closeness, Algorithm::Degree, Algorithm::Proximity],
    };
    let allowed = match target {
        TaskTarget::DrugTarget => &config.algorithms.drug_target,
        TaskTarget::Drug => &config.algorithms.drug,
    };
    let list: Vec<Algorithm> = offered
        .iter()
        .copied()
        .filter(|a| allowed.is_empty() || allowed.iter().any(|s| s == a.slug()))
        .collect();
    if list.is_empty() { vec![Algorithm::Trustrank] } else { list }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub algorithm: Algorithm,
    pub target: TaskTarget,
    // Backend ids of the selected proteins
    pub seeds: Vec<String>,
    pub identifier: IdentifierKind,
    pub ppi_dataset: ProteinProteinDataset,
    pub pdi_dataset: DrugProteinDataset,
    pub licenced: bool,
    pub parameters: Value,
    // Config the result view should be rendered with
    pub config: Value,
}

impl AnalysisRequest {
    pub fn new(algorithm: Algorithm, target: TaskTarget, seeds: Vec<String>, config: &ExplorerConfig) -> Self {
        AnalysisRequest {
            algorithm,
            target,
            seeds,
            identifier: config.identifier,
            ppi_dataset: config.interaction_protein_protein,
            pdi_dataset: config.interaction_drug_protein,
            licenced: config.licenced_datasets,
            parameters: algorithm.default_parameters(),
            config: serde_json::to_value(config).unwrap_or(Value::Null),
        }
    }

    /// Override one algorithm parameter, e.g. `("resultSize", json!(50))`.
    pub fn with_parameter(mut self, key: &str, value: Value) -> Self {
        if let Value::Object(map) = &mut self.parameters {
            map.insert(key.to_string(), value);
        }
        self
    }
}
