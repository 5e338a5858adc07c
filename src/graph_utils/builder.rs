use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::ExplorerError;
use crate::persistence::settings::{ExplorerConfig, IdentifierKind};
use crate::style::groups::{DEFAULT_GROUP, DISORDER_GROUP, FOUND_DRUG_GROUP, FOUND_NODE_GROUP};

use super::entity::{Edge, EdgeKind, KindTag, Node, NodeId, NodeKind, Position};
use super::graph::NetworkGraph;
use super::payload::{NetworkPayload, OneOrMany, RawEdge, RawNode, ResultNodeRef, TaskResult};

/// Output of a build pass. `lookup` maps every backend id variant and external id
/// of a record to the canonical id its node ended up with.
#[derive(Clone, Debug, Default)]
pub struct BuiltGraph {
    pub graph: NetworkGraph,
    pub lookup: HashMap<String, NodeId>,
    pub diagnostics: Vec<ExplorerError>,
}

impl BuiltGraph {
    pub fn canonical_id(&self, any_id: &str) -> Option<&NodeId> { self.lookup.get(any_id) }
}

/// Drop the Ensembl version suffix: "ENSG00000141510.17" -> "ENSG00000141510".
pub fn strip_ensg_version(id: &str) -> String {
    if id.starts_with("ENSG") {
        if let Some((stem, _)) = id.split_once('.') {
            return stem.to_string();
        }
    }
    id.to_string()
}

// Minimal union-find over record indices
struct Clusters {
    parent: Vec<usize>,
}

impl Clusters {
    fn new(n: usize) -> Self { Clusters { parent: (0..n).collect() } }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        // Lower index stays root so the first record in payload order leads its cluster
        if ra < rb { self.parent[rb] = ra } else if rb < ra { self.parent[ra] = rb }
    }
}

struct Classified {
    tag: KindTag,
    // Values the record is known by; backend ids when mapped, else its external id
    keys: Vec<String>,
    external: String,
}

pub struct GraphBuilder<'c> {
    config: &'c ExplorerConfig,
}

impl<'c> GraphBuilder<'c> {
    pub fn new(config: &'c ExplorerConfig) -> Self { GraphBuilder { config } }

    pub fn build(&self, payload: &NetworkPayload) -> BuiltGraph {
        self.build_with_lookup(payload, &HashMap::new())
    }

    /// Build `payload`, resolving edge endpoints through `known` when the payload itself
    /// does not define them (overlays attach to nodes of an existing graph this way).
    pub fn build_with_lookup(&self, payload: &NetworkPayload, known: &HashMap<String, NodeId>) -> BuiltGraph {
        let mut diagnostics = Vec::new();
        let records: Vec<RawNode> = payload.nodes.iter().map(|r| self.normalize_record(r)).collect();

        let classified: Vec<Classified> = records
            .iter()
            .enumerate()
            .map(|(i, r)| self.classify(i, r, &mut diagnostics))
            .collect();

        // Fold records sharing any (kind, id) key into one cluster
        let mut clusters = Clusters::new(records.len());
        let mut owner: HashMap<(KindTag, &str), usize> = HashMap::new();
        for (i, c) in classified.iter().enumerate() {
            for key in &c.keys {
                match owner.get(&(c.tag, key.as_str())) {
                    Some(&j) => clusters.union(i, j),
                    None => {
                        owner.insert((c.tag, key.as_str()), i);
                    }
                }
            }
        }
        let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for i in 0..records.len() {
            let root = clusters.find(i);
            members.entry(root).or_default().push(i);
        }

        let mut graph = NetworkGraph::new();
        let mut canonical_of: Vec<NodeId> = vec![String::new(); records.len()];
        for (root, idxs) in &members {
            let tag = classified[*root].tag;
            let node = self.fold_cluster(tag, idxs, &records, &classified, &mut diagnostics);
            for &i in idxs {
                canonical_of[i] = node.id.clone();
            }
            graph.add_node(node);
        }

        // Canonical ids win over backend variants, which win over external ids
        let mut lookup: HashMap<String, NodeId> = HashMap::new();
        for id in graph.nodes.keys() {
            lookup.insert(id.clone(), id.clone());
        }
        for node in graph.nodes.values() {
            for bid in &node.backend_ids {
                lookup.entry(bid.clone()).or_insert_with(|| node.id.clone());
            }
        }
        for (i, c) in classified.iter().enumerate() {
            lookup.entry(c.external.clone()).or_insert_with(|| canonical_of[i].clone());
        }

        let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();
        for raw in &payload.edges {
            let from = self.normalize_id(&raw.from);
            let to = self.normalize_id(&raw.to);
            let resolve = |id: &str| lookup.get(id).or_else(|| known.get(id)).cloned();
            let (Some(from_id), Some(to_id)) = (resolve(&from), resolve(&to)) else {
                let err = ExplorerError::NetworkBuild {
                    from: raw.from.clone(),
                    to: raw.to.clone(),
                    reason: "endpoint not in network".into(),
                };
                log::warn!("{err}");
                diagnostics.push(err);
                continue;
            };
            if !seen.insert((from_id.clone(), to_id.clone())) {
                continue;
            }
            let edge = self.make_edge(raw, from_id, to_id, &graph, &mut diagnostics);
            // Endpoints may live in `known` only; keep the edge anyway, the caller merges graphs
            if graph.contains(&edge.from) && graph.contains(&edge.to) {
                graph.add_edge(edge);
            } else {
                graph.edges.push(edge);
            }
        }

        BuiltGraph { graph, lookup, diagnostics }
    }

    /// Turn a finished analysis into a graph. Node records are taken from
    /// `nodeAttributes.details` when the network lists bare ids.
    pub fn build_task_result(&self, result: &TaskResult) -> BuiltGraph {
        let attrs = &result.node_attributes;
        let targets: HashSet<&str> = result.target_nodes.iter().map(String::as_str).collect();

        let nodes = result
            .network
            .nodes
            .iter()
            .map(|entry| {
                let mut record = match entry {
                    ResultNodeRef::Id(id) => {
                        let mut r = attrs.details.get(id).cloned().unwrap_or_default();
                        if r.id.is_none() {
                            r.id = Some(id.clone());
                        }
                        if r.backend_id.is_none() && r.netex_id.is_none() {
                            r.backend_id = Some(OneOrMany::One(id.clone()));
                        }
                        r
                    }
                    ResultNodeRef::Record(r) => r.clone(),
                };

                let mut names: Vec<String> = record.id.iter().cloned().collect();
                names.extend(record.backend_ids());
                let seed = names.iter().find_map(|n| attrs.is_seed.get(n).copied());
                let score = names.iter().find_map(|n| attrs.scores.get(n).copied());

                record.is_seed = record.is_seed || seed.unwrap_or(false);
                if let Some(score) = score {
                    record.score = Some(score);
                }
                record.target = record.target || names.iter().any(|n| targets.contains(n.as_str()));

                match record.kind_marker().and_then(KindTag::from_marker) {
                    Some(KindTag::Drug) => record.group = Some(FOUND_DRUG_GROUP.to_string()),
                    Some(KindTag::Protein) | None if record.target => {
                        record.group = Some(FOUND_NODE_GROUP.to_string())
                    }
                    _ => {}
                }
                record
            })
            .collect();

        let payload = NetworkPayload { nodes, edges: result.network.edges.clone() };
        self.build(&payload)
    }

    fn normalize_id(&self, id: &str) -> String {
        match self.config.identifier {
            IdentifierKind::Ensg => strip_ensg_version(id),
            _ => id.to_string(),
        }
    }

    fn normalize_record(&self, raw: &RawNode) -> RawNode {
        let mut r = raw.clone();
        if self.config.identifier == IdentifierKind::Ensg {
            r.id = r.id.as_deref().map(strip_ensg_version);
            r.ensg = r.ensg.map(|e| {
                let mut v: Vec<String> = e.to_vec().iter().map(|s| strip_ensg_version(s)).collect();
                v.dedup();
                OneOrMany::Many(v)
            });
        }
        r
    }

    fn classify(&self, index: usize, r: &RawNode, diagnostics: &mut Vec<ExplorerError>) -> Classified {
        let backend_ids = r.backend_ids();
        let external = r
            .id
            .clone()
            .or_else(|| r.label.clone())
            .unwrap_or_else(|| format!("#{index}"));

        let marker = r.kind_marker().and_then(KindTag::from_marker);
        let mut tag = match marker {
            Some(t) => t,
            None if !backend_ids.is_empty() => KindTag::Protein,
            None => KindTag::Custom,
        };

        let unmapped_protein = backend_ids.is_empty() && matches!(marker, Some(KindTag::Protein) | None);
        if unmapped_protein {
            let err = ExplorerError::Mapping { identifier: external.clone() };
            log::warn!("{err}; keeping it as a custom node");
            diagnostics.push(err);
            tag = KindTag::Custom;
        }

        let keys = if backend_ids.is_empty() { vec![external.clone()] } else { backend_ids };
        Classified { tag, keys, external }
    }

    fn identifier_value(&self, r: &RawNode) -> Option<String> {
        let field = match self.config.identifier {
            IdentifierKind::Symbol => &r.symbol,
            IdentifierKind::Uniprot => &r.uniprot_ac,
            IdentifierKind::Ensg => &r.ensg,
        };
        field.as_ref().and_then(|f| f.first()).map(str::to_string)
    }

    fn fold_cluster(
        &self,
        tag: KindTag,
        idxs: &[usize],
        records: &[RawNode],
        classified: &[Classified],
        diagnostics: &mut Vec<ExplorerError>,
    ) -> Node {
        let cluster: Vec<&RawNode> = idxs.iter().map(|&i| &records[i]).collect();
        let first_some = |f: &dyn Fn(&RawNode) -> Option<String>| cluster.iter().find_map(|r| f(*r));

        let backend_ids: Vec<String> = cluster
            .iter()
            .flat_map(|r| r.backend_ids())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let externals: BTreeSet<&str> = idxs.iter().map(|&i| classified[i].external.as_str()).collect();

        // Smallest variant wins; same payload, same id
        let stem = match (backend_ids.first(), externals.first()) {
            (Some(b), _) => b.clone(),
            (None, Some(e)) => e.to_string(),
            (None, None) => String::new(),
        };
        let id = format!("{}{}", tag.prefix(), stem);

        let label = first_some(&|r: &RawNode| r.label.clone())
            .or_else(|| cluster.iter().find_map(|r| r.id.clone()))
            .or_else(|| first_some(&|r: &RawNode| self.identifier_value(r)))
            .or_else(|| backend_ids.first().cloned())
            .unwrap_or_else(|| id.clone());

        let target = cluster.iter().any(|r| r.target);
        let requested = first_some(&|r: &RawNode| r.group.clone());
        let group = match tag {
            KindTag::Protein if target => FOUND_NODE_GROUP.to_string(),
            KindTag::Protein | KindTag::Custom => requested.unwrap_or_else(|| DEFAULT_GROUP.to_string()),
            KindTag::Drug => requested.unwrap_or_else(|| FOUND_DRUG_GROUP.to_string()),
            KindTag::Disorder => requested.unwrap_or_else(|| DISORDER_GROUP.to_string()),
        };
        let group = if self.config.has_node_group(&group) {
            group
        } else {
            let err = ExplorerError::config(group.as_str(), "<group>");
            log::warn!("{err}; node {id} falls back to '{DEFAULT_GROUP}'");
            diagnostics.push(err);
            DEFAULT_GROUP.to_string()
        };

        let kind = match tag {
            KindTag::Protein => NodeKind::Protein {
                symbol: cluster.iter().find_map(|r| r.symbol.as_ref().and_then(|s| s.first()).map(str::to_string)),
                uniprot_ac: cluster
                    .iter()
                    .find_map(|r| r.uniprot_ac.as_ref().and_then(|s| s.first()).map(str::to_string)),
                ensg: cluster
                    .iter()
                    .flat_map(|r| r.ensg.as_ref().map(OneOrMany::to_vec).unwrap_or_default())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect(),
            },
            KindTag::Drug => NodeKind::Drug {
                status: cluster.iter().find_map(|r| r.status).unwrap_or_default(),
                in_trial: cluster.iter().any(|r| r.in_trial),
                in_literature: cluster.iter().any(|r| r.in_literature),
                trial_links: cluster.iter().flat_map(|r| r.trial_links.iter().cloned()).collect(),
            },
            KindTag::Disorder => NodeKind::Disorder {
                icd10: cluster
                    .iter()
                    .flat_map(|r| r.icd10.iter().cloned())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect(),
            },
            KindTag::Custom => NodeKind::Custom,
        };

        let score = cluster.iter().find_map(|r| r.score);
        let position = cluster.iter().find_map(|r| match (r.x, r.y) {
            (Some(x), Some(y)) => Some(Position { x, y }),
            _ => None,
        });
        let mut details = BTreeMap::new();
        for r in &cluster {
            for (k, v) in &r.extra {
                details.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }

        Node {
            id,
            kind,
            label,
            group,
            score,
            raw_score: score,
            is_seed: cluster.iter().any(|r| r.is_seed),
            position,
            backend_ids,
            image: first_some(&|r: &RawNode| r.image.clone()),
            details,
        }
    }

    fn make_edge(
        &self,
        raw: &RawEdge,
        from: NodeId,
        to: NodeId,
        graph: &NetworkGraph,
        diagnostics: &mut Vec<ExplorerError>,
    ) -> Edge {
        let tag_of = |id: &str| {
            graph.get_node(id).map(Node::tag).or_else(|| tag_from_prefix(id)).unwrap_or(KindTag::Custom)
        };
        let kind = EdgeKind::between(tag_of(&from), tag_of(&to));
        let group = match &raw.group {
            Some(g) if self.config.has_edge_group(g) => g.clone(),
            Some(g) => {
                let err = ExplorerError::config(g.as_str(), "<edge group>");
                log::warn!("{err}; edge {from} -> {to} falls back to '{DEFAULT_GROUP}'");
                diagnostics.push(err);
                DEFAULT_GROUP.to_string()
            }
            None => DEFAULT_GROUP.to_string(),
        };
        Edge { from, to, kind, group, label: raw.label.clone() }
    }
}

// Canonical ids carry their kind in the prefix
pub fn tag_from_prefix(id: &str) -> Option<KindTag> {
    [KindTag::Drug, KindTag::Disorder, KindTag::Protein, KindTag::Custom]
        .into_iter()
        .find(|t| id.starts_with(t.prefix()))
}
