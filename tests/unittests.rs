use std::collections::BTreeMap;
use std::io::Write;

use drugnet::error::ExplorerError;
use drugnet::graph_utils::builder::{strip_ensg_version, GraphBuilder};
use drugnet::graph_utils::entity::{EdgeKind, KindTag, Node, NodeKind};
use drugnet::graph_utils::graph::NetworkGraph;
use drugnet::graph_utils::payload::{
    NetworkPayload, NodeAttributes, OneOrMany, RawEdge, RawNode, ResultNetwork, ResultNodeRef, TaskResult,
};
use drugnet::graph_utils::scores::ScoreTable;
use drugnet::persistence::settings::{deep_merge, ExplorerConfig, IdentifierKind};
use drugnet::remote::endpoints::RemoteEndpoints;
use drugnet::remote::task::{TaskInfo, TaskState};
use drugnet::remote::{algorithms_for, Algorithm, Task, TaskHandle, TaskTarget, TaskTransition};
use drugnet::selection::{SelectionCommand, SelectionContext, SelectionEntry, SelectionEvent, SelectionRegistry};
use drugnet::style::gradient::{expression_gradients, MIN_EXPRESSION, NO_EXPRESSION};
use drugnet::style::groups::{GroupColor, Shape, DEFAULT_GROUP, SEED_GROUP, SELECTED_GROUP};
use drugnet::style::resolver::{Overlay, SELECTED_SHADOW_COLOR, SHADOW_COLOR};
use drugnet::style::{resolve, restyle, StyleFlags};
use drugnet::view::{MemorySurface, SurfaceEvent, ViewAction, ViewAdapter};
use serde_json::json;

fn protein(backend: &str, label: &str) -> Node {
    Node {
        id: format!("p_{backend}"),
        kind: NodeKind::Protein { symbol: Some(label.to_string()), uniprot_ac: None, ensg: Vec::new() },
        label: label.to_string(),
        group: DEFAULT_GROUP.to_string(),
        score: None,
        raw_score: None,
        is_seed: false,
        position: None,
        backend_ids: vec![backend.to_string()],
        image: None,
        details: BTreeMap::new(),
    }
}

fn entry(backend: &str) -> SelectionEntry { SelectionEntry::from_node(&protein(backend, backend)) }

fn mapped(id: &str, backend: &str) -> RawNode {
    RawNode { backend_id: Some(OneOrMany::One(backend.to_string())), ..RawNode::with_id(id) }
}

fn background(color: &Option<drugnet::style::groups::ColorSet>) -> Option<&str> {
    color.as_ref().and_then(|c| c.background.as_deref())
}

// ---------------------------------------------------------------- style

#[test]
fn style_resolve_is_idempotent() {
    let cfg = ExplorerConfig::default();
    let node = protein("p1", "TP53");
    for flags in [StyleFlags::new(false, false), StyleFlags::new(true, false), StyleFlags::new(true, true)] {
        let once = resolve(&node, &cfg, &flags);
        let twice = restyle(&once, &cfg, &flags);
        assert_eq!(once, twice);
    }
}

#[test]
fn style_seed_overlay_keeps_base_group() {
    let cfg = ExplorerConfig::default();
    let node = protein("p1", "TP53");

    let seeded = resolve(&node, &cfg, &StyleFlags::new(true, false));
    assert_eq!(seeded.state.effective_group, SEED_GROUP);
    assert_eq!(seeded.state.base_group, DEFAULT_GROUP);
    assert_eq!(seeded.state.shadow_group(), Some(DEFAULT_GROUP));
    assert_eq!(background(&seeded.style.color), Some("#F1111D"));
    // The node itself is untouched
    assert_eq!(seeded.node.group, DEFAULT_GROUP);

    let plain = restyle(&seeded, &cfg, &StyleFlags::new(false, false));
    assert_eq!(plain.state.effective_group, DEFAULT_GROUP);
    assert_eq!(plain.state.shadow_group(), None);
    assert_eq!(background(&plain.style.color), Some("#FFFF00"));
    assert_eq!(plain.style.shadow.color, SHADOW_COLOR);
}

#[test]
fn style_selection_composes_with_seed() {
    let cfg = ExplorerConfig::default();
    let node = protein("p1", "TP53");
    let styled = resolve(&node, &cfg, &StyleFlags::new(true, true));

    assert!(styled.state.has(Overlay::Seed));
    assert!(styled.state.has(Overlay::Selected));
    let color = styled.style.color.clone().expect("color");
    assert_eq!(color.border.as_deref(), Some("#F8981D"));
    // Selection has no background of its own, the seed one shows through
    assert_eq!(color.background.as_deref(), Some("#F1111D"));
    assert_eq!(styled.style.border_width, 3.0);
    assert_eq!(styled.style.font.color.as_deref(), Some("#F8981D"));
    assert_eq!(styled.style.shadow.color, SELECTED_SHADOW_COLOR);
}

#[test]
fn style_image_unless_seed() {
    let cfg = ExplorerConfig::default();
    let mut node = protein("p1", "TP53");
    node.image = Some("https://img.example/tp53.png".into());

    let plain = resolve(&node, &cfg, &StyleFlags::new(false, false));
    assert_eq!(plain.style.shape, Shape::Image);
    assert!(plain.style.image.is_some());

    let seeded = resolve(&node, &cfg, &StyleFlags::new(true, false));
    assert_eq!(seeded.style.shape, Shape::Triangle);
    assert!(seeded.style.image.is_none());
}

#[test]
fn style_gradient_overrides_shape_and_color() {
    let cfg = ExplorerConfig::default();
    let node = protein("p1", "TP53");

    let g = resolve(&node, &cfg, &StyleFlags::new(false, false).with_gradient(0.5));
    assert_eq!(g.style.shape, Shape::Custom);
    assert_eq!(g.style.opacity, Some(0.5));
    assert!(g.style.color.is_none());
    assert!(g.state.has(Overlay::Gradient));

    let seeded = resolve(&node, &cfg, &StyleFlags::new(true, false).with_gradient(0.5));
    assert_eq!(background(&seeded.style.color), Some("#F1111D"));
}

#[test]
fn style_gradient_on_selected_seed_uses_plain_seed_color() {
    let cfg = ExplorerConfig::default();
    let node = protein("p1", "TP53");

    let styled = resolve(&node, &cfg, &StyleFlags::new(true, true).with_gradient(0.5));
    let border = styled.style.color.as_ref().and_then(|c| c.border.as_deref());
    assert_eq!(border, Some("#F1111D"));
    assert!(styled.state.has(Overlay::Selected));
    assert_eq!(styled.style.border_width, 3.0);
}

#[test]
fn gradient_curve_and_missing_levels() {
    let mut levels = BTreeMap::new();
    levels.insert("p_a".to_string(), Some(8.0));
    levels.insert("p_b".to_string(), Some(1.0));
    levels.insert("p_c".to_string(), None);
    let g = expression_gradients(&levels);
    assert!((g["p_a"] - 1.0).abs() < 1e-6);
    let expected = (0.5 * (1.0 - MIN_EXPRESSION) + MIN_EXPRESSION) as f32;
    assert!((g["p_b"] - expected).abs() < 1e-6);
    assert_eq!(g["p_c"], NO_EXPRESSION);

    let mut zero = BTreeMap::new();
    zero.insert("p_a".to_string(), Some(0.0));
    assert_eq!(expression_gradients(&zero)["p_a"], MIN_EXPRESSION as f32);
}

// ---------------------------------------------------------------- config

#[test]
fn config_partial_override_keeps_reserved_groups() {
    let mut cfg = ExplorerConfig::default();
    let issues = cfg
        .apply_overrides(&json!({ "nodeGroups": { "myGroup": { "color": "#00FF00", "shape": "circle" } } }))
        .expect("override applies");

    assert!(cfg.has_node_group(SEED_GROUP));
    assert!(cfg.has_node_group(SELECTED_GROUP));
    let mine = cfg.node_group("myGroup").expect("myGroup");
    // String colors are expanded into the full set
    match &mine.color {
        Some(GroupColor::Detailed(set)) => {
            assert_eq!(set.border.as_deref(), Some("#00FF00"));
            assert_eq!(set.highlight.as_ref().and_then(|h| h.background.as_deref()), Some("#00FF00"));
        }
        other => panic!("expected expanded color, got {other:?}"),
    }
    assert_eq!(mine.border_width, Some(0.0));
    assert_eq!(mine.border_width_selected, Some(0.0));
    assert_eq!(mine.font.as_ref().and_then(|f| f.face.as_deref()), Some("arial"));
    assert_eq!(mine.group_name.as_deref(), Some("myGroup"));
    assert!(issues.iter().all(ExplorerError::is_config));
}

#[test]
fn config_missing_color_falls_back_to_default_group() {
    let mut cfg = ExplorerConfig::default();
    let issues = cfg.apply_overrides(&json!({ "nodeGroups": { "bare": { "shape": "box" } } })).expect("override");
    let bare = cfg.node_group("bare").expect("bare");
    assert_eq!(bare.color.as_ref().and_then(|c| c.expanded().background), Some("#FFFF00".to_string()));
    assert!(issues.contains(&ExplorerError::config("bare", "color")));
}

#[test]
fn config_shadow_flags_reach_every_group() {
    let mut cfg = ExplorerConfig::default();
    cfg.apply_overrides(&json!({ "nodeShadow": false, "edgeShadow": false })).expect("override");
    assert!(cfg.node_groups.values().all(|g| g.shadow == Some(false)));
    assert!(cfg.edge_groups.values().all(|g| g.shadow == Some(false)));
}

#[test]
fn config_keeps_unknown_keys_and_rejects_bad_group_map() {
    let mut cfg = ExplorerConfig::default();
    cfg.apply_overrides(&json!({ "customFlag": 7, "title": "Study" })).expect("override");
    assert_eq!(cfg.title, "Study");
    assert_eq!(cfg.extra.get("customFlag"), Some(&json!(7)));

    let before = cfg.clone();
    assert!(cfg.apply_overrides(&json!({ "nodeGroups": "nope" })).is_err());
    assert_eq!(cfg, before);
}

#[test]
fn config_repairs_malformed_group_keys() {
    let mut cfg = ExplorerConfig::default();
    let issues = cfg
        .apply_overrides(&json!({
            "title": "Study",
            "nodeGroups": {
                "mine": { "groupName": "Mine", "color": "#123456", "shape": "hexagon", "borderWidth": "3" },
                "broken": 5
            },
            "edgeGroups": { "dashed": { "color": "red", "dashes": "sometimes" } }
        }))
        .expect("malformed groups are repaired");

    assert_eq!(cfg.title, "Study");
    let mine = cfg.node_group("mine").expect("group survives");
    assert_eq!(mine.group_name.as_deref(), Some("Mine"));
    assert_eq!(mine.shape, Some(Shape::Triangle));
    assert_eq!(mine.border_width, Some(0.0));
    let color = mine.color.as_ref().map(|c| c.expanded());
    assert_eq!(background(&color), Some("#123456"));
    assert!(!cfg.has_node_group("broken"));
    let dashed = cfg.edge_groups.get("dashed").expect("edge group survives");
    assert_eq!(dashed.color.as_deref(), Some("red"));

    assert!(issues.contains(&ExplorerError::config("mine", "shape")));
    assert!(issues.contains(&ExplorerError::config("mine", "borderWidth")));
    assert!(issues.contains(&ExplorerError::config("broken", "<group>")));
    assert!(issues.contains(&ExplorerError::config("dashed", "dashes")));
    assert_eq!(issues.iter().filter(|i| **i == ExplorerError::config("mine", "shape")).count(), 1);
}

#[test]
fn config_file_with_bad_group_still_loads() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("explorer.json");
    std::fs::write(&path, r#"{ "nodeGroups": { "default": { "shape": 12 } } }"#).expect("write json");
    let cfg = ExplorerConfig::load_from(&path).expect("loads despite bad shape");
    assert_eq!(cfg.node_group(DEFAULT_GROUP).and_then(|g| g.shape), Some(Shape::Triangle));
}

#[test]
fn config_deep_merge_skips_null_and_replaces_arrays() {
    let mut base = json!({ "a": { "b": 1, "c": [1, 2] }, "d": "x" });
    deep_merge(&mut base, &json!({ "a": { "b": null, "c": [3] }, "e": true }));
    assert_eq!(base, json!({ "a": { "b": 1, "c": [3] }, "d": "x", "e": true }));
}

#[test]
fn config_loads_json_and_ron_files() {
    let dir = tempfile::tempdir().expect("tempdir");

    let json_path = dir.path().join("explorer.json");
    let mut f = std::fs::File::create(&json_path).expect("create json");
    f.write_all(br#"{ "title": "From JSON", "identifier": "ensg" }"#).expect("write json");
    let cfg = ExplorerConfig::load_from(&json_path).expect("json loads");
    assert_eq!(cfg.title, "From JSON");
    assert_eq!(cfg.identifier, IdentifierKind::Ensg);

    let ron_path = dir.path().join("explorer.ron");
    std::fs::write(&ron_path, r#"{ "title": "From RON", "physicsOn": true }"#).expect("write ron");
    let cfg = ExplorerConfig::load_from(&ron_path).expect("ron loads");
    assert_eq!(cfg.title, "From RON");
    assert!(cfg.physics_on);

    let saved = dir.path().join("nested").join("saved.json");
    cfg.save(&saved).expect("save");
    let back = ExplorerConfig::load_from(&saved).expect("reload");
    assert_eq!(back, cfg);
}

// ---------------------------------------------------------------- builder

#[test]
fn builder_merges_records_sharing_a_backend_id() {
    let cfg = ExplorerConfig::default();
    let payload = NetworkPayload {
        nodes: vec![mapped("b1", "p1"), mapped("B", "p1")],
        edges: vec![RawEdge::new("b1", "B")],
    };
    let built = GraphBuilder::new(&cfg).build(&payload);

    assert_eq!(built.graph.node_count(), 1);
    let node = built.graph.get_node("p_p1").expect("canonical node");
    assert_eq!(node.tag(), KindTag::Protein);
    assert_eq!(built.canonical_id("b1"), Some(&"p_p1".to_string()));
    assert_eq!(built.canonical_id("B"), Some(&"p_p1".to_string()));
    // Both endpoints collapse to one node: a self-loop survives
    assert_eq!(built.graph.edge_count(), 1);
    assert!(built.graph.has_edge("p_p1", "p_p1"));
}

#[test]
fn builder_rewrites_edge_endpoints_to_canonical_ids() {
    let cfg = ExplorerConfig::default();
    let a = RawNode {
        kind: Some("protein".into()),
        backend_id: Some(OneOrMany::Many(vec!["b1".into()])),
        ..RawNode::with_id("A")
    };
    let b = RawNode { kind: Some("drug".into()), ..RawNode::with_id("B") };
    let payload = NetworkPayload { nodes: vec![a, b], edges: vec![RawEdge::new("b1", "B")] };
    let built = GraphBuilder::new(&cfg).build(&payload);

    assert_eq!(built.graph.node_count(), 2);
    assert_eq!(built.graph.edge_count(), 1);
    let a_id = built.canonical_id("A").expect("A canonical").clone();
    assert_eq!(built.graph.edges[0].from, a_id);
    assert_ne!(built.graph.edges[0].from, "b1");
    assert_eq!(built.graph.get_node("dr_B").map(|n| n.tag()), Some(KindTag::Drug));
}

#[test]
fn builder_canonical_ids_are_stable() {
    let cfg = ExplorerConfig::default();
    let multi = RawNode {
        backend_id: Some(OneOrMany::Many(vec!["P2".into(), "P1".into()])),
        ..RawNode::with_id("TP53")
    };
    let payload = NetworkPayload { nodes: vec![multi], edges: Vec::new() };
    let first = GraphBuilder::new(&cfg).build(&payload);
    let second = GraphBuilder::new(&cfg).build(&payload);
    assert_eq!(first.graph.node_ids(), second.graph.node_ids());
    let node = first.graph.get_node("p_P1").expect("smallest variant wins");
    assert_eq!(node.backend_ids, vec!["P1".to_string(), "P2".to_string()]);
}

#[test]
fn builder_drops_edges_to_unknown_nodes() {
    let cfg = ExplorerConfig::default();
    let payload = NetworkPayload {
        nodes: vec![mapped("A", "pa"), mapped("B", "pb")],
        edges: vec![RawEdge::new("A", "B"), RawEdge::new("A", "ghost"), RawEdge::new("A", "B")],
    };
    let built = GraphBuilder::new(&cfg).build(&payload);
    assert_eq!(built.graph.edge_count(), 1);
    let edge = &built.graph.edges[0];
    assert_eq!(edge.kind, EdgeKind::between(KindTag::Protein, KindTag::Protein));
    assert!(built
        .diagnostics
        .iter()
        .any(|d| matches!(d, ExplorerError::NetworkBuild { to, .. } if to == "ghost")));
}

#[test]
fn builder_turns_unmapped_proteins_into_custom_nodes() {
    let cfg = ExplorerConfig::default();
    let payload = NetworkPayload {
        nodes: vec![RawNode { group: Some("myGroup".into()), ..RawNode::with_id("XYZ") }],
        edges: Vec::new(),
    };
    let built = GraphBuilder::new(&cfg).build(&payload);
    let node = built.graph.get_node("c_XYZ").expect("custom node");
    assert_eq!(node.kind, NodeKind::Custom);
    assert!(!node.is_selectable());
    assert!(built.diagnostics.iter().any(ExplorerError::is_mapping));
    // Unknown group falls back to the default one
    assert_eq!(node.group, DEFAULT_GROUP);
    assert!(built.diagnostics.contains(&ExplorerError::config("myGroup", "<group>")));
}

#[test]
fn builder_strips_ensembl_versions() {
    assert_eq!(strip_ensg_version("ENSG00000141510.17"), "ENSG00000141510");
    assert_eq!(strip_ensg_version("TP53.1"), "TP53.1");

    let mut cfg = ExplorerConfig::default();
    cfg.identifier = IdentifierKind::Ensg;
    let payload = NetworkPayload {
        nodes: vec![mapped("ENSG00000141510.17", "p1"), mapped("ENSG00000012048.3", "p2")],
        edges: vec![RawEdge::new("ENSG00000141510.5", "ENSG00000012048")],
    };
    let built = GraphBuilder::new(&cfg).build(&payload);
    assert!(built.graph.has_edge("p_p1", "p_p2"));
    assert_eq!(built.canonical_id("ENSG00000141510"), Some(&"p_p1".to_string()));
}

#[test]
fn builder_reads_task_results() {
    let cfg = ExplorerConfig::default();
    let mut attrs = NodeAttributes::default();
    attrs.details.insert(
        "DB00945".into(),
        RawNode { label: Some("Aspirin".into()), kind: Some("drug".into()), ..Default::default() },
    );
    attrs.details.insert("p1".into(), RawNode { label: Some("TP53".into()), ..Default::default() });
    attrs.is_seed.insert("p1".into(), true);
    attrs.scores.insert("DB00945".into(), 0.8);
    attrs.scores.insert("p1".into(), 0.4);

    let result = TaskResult {
        network: ResultNetwork {
            nodes: vec![ResultNodeRef::Id("p1".into()), ResultNodeRef::Id("DB00945".into())],
            edges: vec![RawEdge::new("p1", "DB00945")],
        },
        node_attributes: attrs,
        target_nodes: vec!["DB00945".into()],
        ..Default::default()
    };
    let built = GraphBuilder::new(&cfg).build_task_result(&result);

    let drug = built.graph.get_node("dr_DB00945").expect("drug node");
    assert_eq!(drug.raw_score, Some(0.8));
    assert_eq!(drug.group, "foundDrug");
    let seed = built.graph.get_node("p_p1").expect("seed node");
    assert!(seed.is_seed);
    assert_eq!(seed.label, "TP53");
    assert!(built.graph.has_edge("p_p1", "dr_DB00945"));
    assert_eq!(built.graph.edges[0].kind, EdgeKind::between(KindTag::Protein, KindTag::Drug));
}

#[test]
fn graph_remove_node_cascades() {
    let mut g = NetworkGraph::new();
    g.add_node(protein("a", "A"));
    g.add_node(protein("b", "B"));
    let cfg = ExplorerConfig::default();
    let built = GraphBuilder::new(&cfg).build(&NetworkPayload {
        nodes: vec![mapped("A", "a"), mapped("B", "b")],
        edges: vec![RawEdge::new("A", "B")],
    });
    g.merge(&built.graph);
    assert!(g.has_edge("p_a", "p_b"));
    assert!(g.remove_node("p_a"));
    assert_eq!(g.edge_count(), 0);
}

// ---------------------------------------------------------------- scores

#[test]
fn scores_normalize_by_max() {
    let mut g = NetworkGraph::new();
    for (id, s) in [("a", 2.0), ("b", 4.0), ("c", 1.0)] {
        let mut n = protein(id, id);
        n.raw_score = Some(s);
        g.add_node(n);
    }
    let mut table = ScoreTable::from_graph(&g, KindTag::Protein);
    assert_eq!(table.rows[0].lookup_id, "b");
    table.normalize(true);
    assert_eq!(table.rows[0].score, Some(1.0));
    assert_eq!(table.rows[1].score, Some(0.5));
    table.normalize(false);
    assert_eq!(table.rows[0].score, Some(4.0));
}

#[test]
fn scores_nonpositive_max_keeps_raw() {
    let mut g = NetworkGraph::new();
    let mut n = protein("a", "A");
    n.raw_score = Some(0.0);
    g.add_node(n);
    let mut table = ScoreTable::from_graph(&g, KindTag::Protein);
    table.normalize(true);
    assert_eq!(table.rows[0].score, Some(0.0));
    assert!(!table.normalized);
}

// ---------------------------------------------------------------- selection

#[test]
fn selection_add_remove_symmetry_and_idempotence() {
    let mut reg = SelectionRegistry::new();
    let events = reg.add(vec![entry("a"), entry("b")]);
    assert_eq!(events.len(), 1);
    assert!(reg.add(vec![entry("a")]).is_empty(), "re-adding is silent");

    let removed = reg.remove(vec![entry("a")]);
    assert!(matches!(&removed[0], SelectionEvent::Changed { added: false, items, .. } if items.len() == 1));
    assert!(reg.remove(vec![entry("a")]).is_empty());
    assert_eq!(reg.selection().iter().map(|e| e.lookup_id.as_str()).collect::<Vec<_>>(), vec!["b"]);
}

#[test]
fn selection_keeps_insertion_order() {
    let mut reg = SelectionRegistry::new();
    reg.add(vec![entry("c")]);
    reg.add(vec![entry("a")]);
    reg.toggle(entry("b"));
    let order: Vec<String> = reg.selection().into_iter().map(|e| e.lookup_id).collect();
    assert_eq!(order, vec!["c", "a", "b"]);
}

#[test]
fn selection_context_switch_resyncs_subscribers() {
    let mut reg = SelectionRegistry::new();
    let (_id, rx) = reg.subscribe();
    reg.add(vec![entry("a")]);
    let analysis = SelectionContext::Analysis("tok".into());
    reg.switch_context(analysis.clone());
    assert_eq!(reg.count(), 0);
    assert!(reg.switch_context(analysis.clone()).is_empty());

    reg.close_context(analysis.clone());
    assert_eq!(reg.active_context(), &SelectionContext::Main);
    assert!(!reg.has_context(&analysis));
    assert!(reg.close_context(SelectionContext::Main).is_empty());

    let seen: Vec<SelectionEvent> = rx.try_iter().collect();
    assert_eq!(seen.len(), 3);
    assert!(matches!(&seen[1], SelectionEvent::Resync { context, items } if *context == analysis && items.is_empty()));
    assert!(matches!(&seen[2], SelectionEvent::Resync { context, items } if *context == SelectionContext::Main && items.len() == 1));
}

#[test]
fn selection_drops_dead_subscribers() {
    let mut reg = SelectionRegistry::new();
    let (_, rx) = reg.subscribe();
    drop(rx);
    reg.dispatch(SelectionCommand::Add(vec![entry("a")]));
    assert_eq!(reg.subscriber_count(), 0);
}

// ---------------------------------------------------------------- view

fn loaded_view(reg: &mut SelectionRegistry) -> ViewAdapter<MemorySurface> {
    let mut g = NetworkGraph::new();
    for id in ["a", "b", "c"] {
        g.add_node(protein(id, id));
    }
    let mut view = ViewAdapter::new(SelectionContext::Main, MemorySurface::new(), ExplorerConfig::default(), reg);
    view.load(&g, reg);
    view
}

#[test]
fn view_updates_only_affected_nodes() {
    let mut reg = SelectionRegistry::new();
    let mut view = loaded_view(&mut reg);
    reg.add(vec![entry("b")]);
    assert_eq!(view.sync(), 1);
    assert_eq!(view.surface().update_log.last(), Some(&vec!["p_b".to_string()]));
    assert!(view.is_selected("p_b"));
    let styled = view.surface().nodes.get("p_b").expect("b rendered");
    assert!(styled.state.has(Overlay::Selected));
}

#[test]
fn view_resync_restyles_everything() {
    let mut reg = SelectionRegistry::new();
    let mut view = loaded_view(&mut reg);
    reg.add(vec![entry("a"), entry("c")]);
    view.sync();
    reg.reset();
    view.sync();
    assert_eq!(view.surface().update_log.last().map(Vec::len), Some(3));
    assert!(!view.is_selected("p_a"));
}

#[test]
fn view_ignores_other_contexts() {
    let mut reg = SelectionRegistry::new();
    let mut view = loaded_view(&mut reg);
    reg.dispatch_to(&SelectionContext::Analysis("t".into()), SelectionCommand::Add(vec![entry("a")]));
    assert_eq!(view.sync(), 0);
    assert!(!view.is_selected("p_a"));
}

#[test]
fn view_double_click_toggles_selection() {
    let mut reg = SelectionRegistry::new();
    let mut view = loaded_view(&mut reg);
    view.surface_mut().push_event(SurfaceEvent::DoubleClick("p_a".into()));
    view.surface_mut().push_event(SurfaceEvent::Click(Some("p_a".into())));
    let actions = view.handle_surface_events(&mut reg);
    assert_eq!(actions, vec![ViewAction::ShowDetails("p_a".into())]);
    assert!(reg.contains(&SelectionContext::Main, "a"));

    view.sync();
    view.surface_mut().push_event(SurfaceEvent::DoubleClick("p_a".into()));
    view.handle_surface_events(&mut reg);
    view.sync();
    assert!(!view.is_selected("p_a"));
}

// ---------------------------------------------------------------- remote

fn task(progress: f32, done: bool, failed: bool) -> Task {
    Task {
        token: "tok".into(),
        info: TaskInfo { algorithm: "trustrank".into(), progress, done, failed, ..Default::default() },
        ..Default::default()
    }
}

#[test]
fn task_terminal_transition_happens_once() {
    let mut handle = TaskHandle::new("tok");
    assert_eq!(handle.observe(task(0.0, false, false)), TaskTransition::Progress(0.0));
    assert_eq!(handle.observe(task(0.0, false, false)), TaskTransition::Unchanged);
    assert_eq!(handle.observe(task(0.5, false, false)), TaskTransition::Progress(0.5));
    assert_eq!(handle.observe(task(1.0, true, false)), TaskTransition::Completed);
    assert_eq!(handle.observe(task(1.0, true, false)), TaskTransition::Unchanged);
    assert_eq!(handle.observe(task(1.0, false, true)), TaskTransition::Unchanged);
    assert_eq!(handle.state, TaskState::Done);
    assert_eq!(handle.algorithm(), Some("trustrank"));
}

#[test]
fn task_failure_carries_status() {
    let mut handle = TaskHandle::new("tok");
    let mut failing = task(0.2, false, true);
    failing.info.status = Some("seeds not in network".into());
    match handle.observe(failing) {
        TaskTransition::Failed(ExplorerError::TaskFailure { status, .. }) => assert_eq!(status, "seeds not in network"),
        other => panic!("unexpected transition {other:?}"),
    }
    assert!(handle.is_terminal());
}

#[test]
fn endpoints_build_token_urls() {
    let ep = RemoteEndpoints::new("https://api.example.org/v1").expect("valid base");
    assert_eq!(ep.task_url("abc").expect("url").as_str(), "https://api.example.org/v1/task/?token=abc");
    let dl = ep.download_url("abc", "drugs", "csv").expect("url");
    assert_eq!(dl.as_str(), "https://api.example.org/v1/task_result/?token=abc&view=drugs&fmt=csv");
    assert!(RemoteEndpoints::new("not a url").is_err());
}

#[test]
fn algorithms_respect_allow_list() {
    let mut cfg = ExplorerConfig::default();
    assert!(algorithms_for(TaskTarget::Drug, &cfg).contains(&Algorithm::Proximity));

    cfg.algorithms.drug = vec!["closeness".into(), "multisteiner".into()];
    assert_eq!(algorithms_for(TaskTarget::Drug, &cfg), vec![Algorithm::Closeness]);

    cfg.algorithms.drug_target = vec!["nothing-known".into()];
    assert_eq!(algorithms_for(TaskTarget::DrugTarget, &cfg), vec![Algorithm::Trustrank]);

    assert!(!Algorithm::Proximity.normalize_by_default());
    assert!(!Algorithm::Keypathwayminer.has_scores());
    assert_eq!(Algorithm::Trustrank.default_parameters()["dampingFactor"], json!(0.85));
}
