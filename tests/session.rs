use std::collections::BTreeMap;

use drugnet::graph_utils::payload::{
    NetworkPayload, NodeAttributes, OneOrMany, RawEdge, RawNode, ResultNetwork, ResultNodeRef, TaskResult,
};
use drugnet::persistence::settings::ExplorerConfig;
use drugnet::remote::offline::OfflineFixture;
use drugnet::remote::task::TaskInfo;
use drugnet::remote::{Algorithm, DisorderSource, OfflineService, Task, TaskTarget, TaskTransition, Tissue};
use drugnet::selection::SelectionContext;
use drugnet::session::{ExplorerSession, ScoreKind};
use drugnet::style::gradient::NO_EXPRESSION;
use drugnet::style::groups::{Shape, SEED_GROUP};
use drugnet::view::{MemorySurface, RenderSurface, SurfaceEvent, ViewAction};
use serde_json::json;

type Session = ExplorerSession<MemorySurface, OfflineService>;

fn backend(id: &str, symbol: &str) -> RawNode {
    RawNode {
        backend_id: Some(OneOrMany::One(id.to_string())),
        symbol: Some(OneOrMany::One(symbol.to_string())),
        ..Default::default()
    }
}

fn labelled(label: &str) -> RawNode { RawNode { label: Some(label.to_string()), ..Default::default() } }

fn task_state(progress: f32, done: bool) -> Task {
    Task {
        token: "tok1".into(),
        info: TaskInfo {
            target: TaskTarget::Drug,
            algorithm: "trustrank".into(),
            progress,
            done,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn fixture() -> OfflineFixture {
    let mut fx = OfflineFixture::default();
    fx.mappings.insert("TP53".into(), backend("p1", "TP53"));
    fx.mappings.insert("EGFR".into(), backend("p2", "EGFR"));
    fx.protein_interactions.push(RawEdge::new("p1", "p2"));
    fx.drug_targets.push(RawEdge::new("p1", "DB1"));
    fx.drugs.insert("DB1".into(), labelled("Aspirin"));
    fx.disorder_links.push(RawEdge::new("p2", "D1"));
    fx.disorder_links.push(RawEdge::new("DB1", "D1"));
    fx.disorder_links.push(RawEdge::new("DB1", "D2"));
    fx.disorders.insert("D1".into(), labelled("Glioma"));
    fx.disorders.insert("D2".into(), labelled("Headache"));
    fx.tissues.push(Tissue { id: "t1".into(), name: "Liver".into() });
    let mut levels = BTreeMap::new();
    levels.insert("p1".to_string(), Some(4.0));
    levels.insert("p2".to_string(), None);
    fx.expression.insert("t1".into(), levels);

    fx.tasks.insert("tok1".into(), vec![task_state(0.3, false), task_state(1.0, true)]);
    let mut attrs = NodeAttributes::default();
    attrs.details.insert("p1".into(), labelled("TP53"));
    attrs.details.insert(
        "DB1".into(),
        RawNode { kind: Some("drug".into()), ..labelled("Aspirin") },
    );
    attrs.is_seed.insert("p1".into(), true);
    attrs.scores.insert("p1".into(), 0.5);
    attrs.scores.insert("DB1".into(), 0.8);
    fx.results.insert(
        "tok1".into(),
        TaskResult {
            network: ResultNetwork {
                nodes: vec![ResultNodeRef::Id("p1".into()), ResultNodeRef::Id("DB1".into())],
                edges: vec![RawEdge::new("p1", "DB1")],
            },
            node_attributes: attrs,
            target_nodes: vec!["DB1".into()],
            ..Default::default()
        },
    );
    fx.launch_tokens.push("tok1".into());
    fx
}

fn network() -> NetworkPayload {
    NetworkPayload {
        nodes: vec![RawNode::with_id("TP53"), RawNode::with_id("EGFR"), RawNode::with_id("XYZ")],
        edges: Vec::new(),
    }
}

fn loaded_session() -> Session {
    let mut session = Session::new(ExplorerConfig::default(), OfflineService::new(fixture()));
    session.load_network(&network()).expect("network loads");
    session
}

fn completed_analysis() -> Session {
    let mut session = loaded_session();
    assert!(session.toggle_selection("p_p1"));
    let token = session.launch_analysis(Algorithm::Trustrank, TaskTarget::Drug).expect("launch");
    session.open_analysis(&token).expect("open");
    assert_eq!(session.poll_analysis().expect("poll"), TaskTransition::Completed);
    session
}

#[test]
fn load_network_maps_autofills_and_reports() {
    let session = loaded_session();
    let graph = session.graph();
    assert_eq!(graph.node_count(), 3);
    assert!(graph.has_edge("p_p1", "p_p2"));
    assert!(graph.contains("c_XYZ"));
    assert!(session.diagnostics().iter().any(|d| d.is_mapping()));
    assert_eq!(session.main_view().node_count(), 3);
    assert!(session.main_view().surface().has_edge("p_p1", "p_p2"));
}

#[test]
fn rejected_mapping_aborts_load() {
    let mut fx = fixture();
    fx.reject_mapping = true;
    let mut session = Session::new(ExplorerConfig::default(), OfflineService::new(fx));
    assert!(session.load_network(&network()).is_err());
    assert_eq!(session.graph().node_count(), 0);
}

#[test]
fn surface_double_click_selects_through_pump() {
    let mut session = loaded_session();
    let surface = session.main_view_mut().surface_mut();
    surface.push_event(SurfaceEvent::DoubleClick("p_p2".into()));
    surface.push_event(SurfaceEvent::Click(Some("p_p2".into())));
    let actions = session.pump();
    assert_eq!(actions, vec![ViewAction::ShowDetails("p_p2".into())]);
    assert_eq!(session.details(), Some(&"p_p2".to_string()));
    assert!(session.registry().contains(&SelectionContext::Main, "p2"));
    assert!(session.main_view().is_selected("p_p2"));

    // Custom nodes cannot be selected
    assert!(!session.toggle_selection("c_XYZ"));
}

#[test]
fn analysis_lifecycle() {
    let mut session = loaded_session();
    session.toggle_selection("p_p1");

    assert!(session.launch_analysis(Algorithm::Multisteiner, TaskTarget::Drug).is_err());
    let token = session.launch_analysis(Algorithm::Trustrank, TaskTarget::Drug).expect("launch");
    assert_eq!(token, "tok1");
    assert_eq!(session.service().launched()[0].seeds, vec!["p1".to_string()]);

    assert_eq!(session.open_analysis(&token).expect("open"), TaskTransition::Progress(0.3));
    let analysis_ctx = SelectionContext::Analysis("tok1".into());
    assert_eq!(session.registry().active_context(), &analysis_ctx);
    assert_eq!(session.registry().count(), 0);

    assert_eq!(session.poll_analysis().expect("poll"), TaskTransition::Completed);
    assert_eq!(session.poll_analysis().expect("poll"), TaskTransition::Unchanged);

    let panel = session.analysis().expect("panel");
    assert_eq!(panel.algorithm, Some(Algorithm::Trustrank));
    assert_eq!(panel.drugs.len(), 1);
    let view = panel.view.as_ref().expect("result view");
    // Seeds are not highlighted until asked for
    let seed = view.cached("p_p1").expect("seed cached");
    assert_ne!(seed.styled.state.effective_group, SEED_GROUP);

    session.set_highlight_seeds(true);
    let view = session.analysis().and_then(|p| p.view.as_ref()).expect("result view");
    assert_eq!(view.cached("p_p1").expect("seed").styled.state.effective_group, SEED_GROUP);

    session.close_analysis();
    assert!(session.analysis().is_none());
    assert_eq!(session.registry().active_context(), &SelectionContext::Main);
    assert!(session.registry().contains(&SelectionContext::Main, "p1"));
}

#[test]
fn analysis_scores_normalize_to_one() {
    let mut session = completed_analysis();
    let panel = session.analysis().expect("panel");
    assert!(panel.normalize);
    assert_eq!(panel.drugs.rows[0].score, Some(1.0));
    assert_eq!(panel.proteins.rows[0].score, Some(1.0));

    session.set_normalization(false);
    let panel = session.analysis().expect("panel");
    assert_eq!(panel.drugs.rows[0].score, Some(0.8));
    assert_eq!(panel.proteins.rows[0].raw_score, Some(0.5));
}

#[test]
fn analysis_selection_marks_table_rows() {
    let mut session = completed_analysis();
    assert!(session.toggle_selection("p_p1"));
    let panel = session.analysis().expect("panel");
    assert!(panel.proteins.rows[0].selected);
    assert!(session.registry().contains(&SelectionContext::Analysis("tok1".into()), "p1"));
}

#[test]
fn export_writes_versioned_csv() {
    let session = completed_analysis();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = session.export_scores(ScoreKind::Drugs, Some(dir.path().to_path_buf())).expect("export");

    let name = path.file_name().and_then(|n| n.to_str()).expect("file name");
    assert!(name.starts_with("tok1_drugs_"));
    assert!(name.ends_with(".csv"));
    let text = std::fs::read_to_string(&path).expect("read csv");
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("id,label,score,raw_score,is_seed"));
    assert_eq!(lines.next(), Some("DB1,Aspirin,1,0.8,false"));
}

#[test]
fn export_without_analysis_fails() {
    let session = loaded_session();
    assert!(session.export_scores(ScoreKind::Proteins, None).is_err());
}

#[test]
fn drug_and_disorder_overlays() {
    let mut session = loaded_session();
    assert!(session.toggle_adjacent_disorders(DisorderSource::Drugs).is_err());

    assert!(session.toggle_adjacent_drugs().expect("drugs on"));
    let view = session.main_view();
    assert!(view.cached("dr_DB1").is_some());
    assert!(view.surface().has_edge("p_p1", "dr_DB1"));

    assert!(session.toggle_adjacent_disorders(DisorderSource::Drugs).expect("drug disorders on"));
    assert!(session.toggle_adjacent_disorders(DisorderSource::Proteins).expect("protein disorders on"));
    assert!(session.main_view().cached("di_D2").is_some());
    assert!(session.main_view().surface().has_edge("p_p2", "di_D1"));

    // Hiding drugs takes their disorders along; shared disorders stay
    assert!(!session.toggle_adjacent_drugs().expect("drugs off"));
    let view = session.main_view();
    assert!(view.cached("dr_DB1").is_none());
    assert!(view.cached("di_D2").is_none());
    assert!(view.cached("di_D1").is_some());
    assert!(!view.surface().has_edge("dr_DB1", "di_D1"));
    assert!(!session.has_disorder_overlay(DisorderSource::Drugs));
    assert_eq!(session.main_view().node_count(), 4);
}

#[test]
fn tissue_expression_colors_proteins() {
    let mut session = loaded_session();
    let tissue = session.tissues().expect("tissues")[0].clone();
    session.select_tissue(Some(tissue.clone())).expect("tissue");
    assert_eq!(session.selected_tissue(), Some(&tissue));

    let view = session.main_view();
    assert!(view.gradients().get("p_p1").is_some_and(|g| (g - 1.0).abs() < 1e-6));
    assert_eq!(view.gradients().get("p_p2"), Some(&NO_EXPRESSION));
    assert_eq!(view.surface().get("p_p1").expect("rendered").style.shape, Shape::Custom);

    session.select_tissue(None).expect("clear");
    assert!(session.main_view().gradients().is_empty());
    assert_ne!(session.main_view().surface().get("p_p1").expect("rendered").style.shape, Shape::Custom);
}

#[test]
fn config_overrides_restyle_rendered_nodes() {
    let mut session = loaded_session();
    session
        .apply_config_overrides(&json!({ "nodeGroups": { "default": { "color": "#123456" } } }))
        .expect("override");
    let styled = session.main_view().surface().get("p_p2").expect("rendered");
    let background = styled.style.color.as_ref().and_then(|c| c.background.as_deref());
    assert_eq!(background, Some("#123456"));
}

#[test]
fn failed_result_fetch_is_retried_on_next_poll() {
    let mut fx = fixture();
    let result = fx.results.remove("tok1").expect("fixture result");
    let mut session = Session::new(ExplorerConfig::default(), OfflineService::new(fx));
    session.load_network(&network()).expect("network loads");
    session.toggle_selection("p_p1");
    let token = session.launch_analysis(Algorithm::Trustrank, TaskTarget::Drug).expect("launch");
    session.open_analysis(&token).expect("open");

    assert!(session.poll_analysis().is_err());
    assert!(session.poll_analysis().is_err());
    let panel = session.analysis().expect("panel");
    assert!(panel.view.is_none());
    assert!(panel.error.is_some());

    session.service_mut().fixture_mut().results.insert("tok1".into(), result);
    assert_eq!(session.poll_analysis().expect("poll"), TaskTransition::Completed);
    let panel = session.analysis().expect("panel");
    assert!(panel.view.is_some());
    assert!(panel.error.is_none());
    assert_eq!(panel.drugs.len(), 1);
    assert_eq!(session.poll_analysis().expect("poll"), TaskTransition::Unchanged);
}

#[test]
fn rejected_config_override_changes_no_view() {
    let mut session = completed_analysis();
    let before = session.config().clone();
    let analysis_before = session.analysis().and_then(|p| p.view.as_ref()).expect("view").config().clone();

    assert!(session.apply_config_overrides(&json!({ "nodeGroups": "nope" })).is_err());
    assert_eq!(session.config(), &before);
    assert_eq!(session.main_view().config(), &before);
    let view = session.analysis().and_then(|p| p.view.as_ref()).expect("view");
    assert_eq!(view.config(), &analysis_before);
}

#[test]
fn closing_analysis_keeps_main_view_tissue() {
    let mut session = loaded_session();
    let tissue = session.tissues().expect("tissues")[0].clone();
    session.select_tissue(Some(tissue.clone())).expect("tissue on main view");

    assert!(session.toggle_selection("p_p1"));
    let token = session.launch_analysis(Algorithm::Trustrank, TaskTarget::Drug).expect("launch");
    session.open_analysis(&token).expect("open");
    assert_eq!(session.poll_analysis().expect("poll"), TaskTransition::Completed);
    session.close_analysis();

    assert_eq!(session.selected_tissue(), Some(&tissue));
    assert!(!session.main_view().gradients().is_empty());
}

#[test]
fn closing_analysis_drops_its_tissue() {
    let mut session = completed_analysis();
    let tissue = session.tissues().expect("tissues")[0].clone();
    session.select_tissue(Some(tissue)).expect("tissue on result view");
    assert!(session.main_view().gradients().is_empty());

    session.close_analysis();
    assert!(session.selected_tissue().is_none());
}
