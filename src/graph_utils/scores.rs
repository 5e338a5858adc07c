use serde::{Deserialize, Serialize};

use super::entity::{KindTag, NodeId};
use super::graph::NetworkGraph;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub node_id: NodeId,
    // Backend id used to match selection entries
    pub lookup_id: String,
    pub label: String,
    pub score: Option<f64>,
    pub raw_score: Option<f64>,
    pub is_seed: bool,
    pub selected: bool,
}

/// One ranked list of result entities (drugs or proteins) of an analysis.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    pub rows: Vec<ScoreRow>,
    pub normalized: bool,
}

impl ScoreTable {
    /// Collect rows for every node of `tag`, best raw score first.
    pub fn from_graph(graph: &NetworkGraph, tag: KindTag) -> Self {
        let mut rows: Vec<ScoreRow> = graph
            .nodes_of_kind(tag)
            .map(|n| ScoreRow {
                node_id: n.id.clone(),
                lookup_id: n.lookup_id().to_string(),
                label: n.label.clone(),
                score: n.raw_score,
                raw_score: n.raw_score,
                is_seed: n.is_seed,
                selected: false,
            })
            .collect();
        rows.sort_by(|a, b| {
            let (sa, sb) = (a.raw_score.unwrap_or(f64::MIN), b.raw_score.unwrap_or(f64::MIN));
            sb.total_cmp(&sa).then_with(|| a.node_id.cmp(&b.node_id))
        });
        ScoreTable { rows, normalized: false }
    }

    pub fn max_raw(&self) -> Option<f64> {
        self.rows.iter().filter_map(|r| r.raw_score).reduce(f64::max)
    }

    /// score = raw / max(raw) when `on`, else score = raw. A non-positive max leaves raw scores.
    pub fn normalize(&mut self, on: bool) {
        let max = self.max_raw().filter(|m| *m > 0.0);
        for row in &mut self.rows {
            row.score = match (on, max, row.raw_score) {
                (true, Some(m), Some(raw)) => Some(raw / m),
                (_, _, raw) => raw,
            };
        }
        self.normalized = on && max.is_some();
    }

    pub fn mark_selected(&mut self, is_selected: impl Fn(&str) -> bool) {
        for row in &mut self.rows {
            row.selected = is_selected(&row.lookup_id);
        }
    }

    pub fn selected_rows(&self) -> impl Iterator<Item = &ScoreRow> { self.rows.iter().filter(|r| r.selected) }

    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }
}
