use std::time::{Duration, Instant};

use eframe::egui::{self, Color32};

use crate::graph_utils::entity::NodeKind;
use crate::graph_utils::payload::NetworkPayload;
use crate::persistence::settings::ExplorerConfig;
use crate::remote::endpoints::RemoteEndpoints;
use crate::remote::{Algorithm, DisorderSource, ScoringService, TaskTarget, TaskTransition, Tissue};
use crate::session::{ExplorerSession, ScoreKind};
use crate::style::groups::GroupColor;

use super::surface::{parse_color, EguiSurface};

const POLL_EVERY: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NoticeLevel {
    Info,
    Error,
}

pub struct ExplorerApp<R: ScoringService> {
    session: ExplorerSession<EguiSurface, R>,
    endpoints: Option<RemoteEndpoints>,
    notice: Option<(NoticeLevel, String)>,
    // Launch controls
    launch_target: TaskTarget,
    launch_algorithm: Algorithm,
    // Cached once; the tissue list does not change during a session
    tissues: Vec<Tissue>,
    last_poll: Option<Instant>,
}

impl<R: ScoringService> ExplorerApp<R> {
    pub fn new(config: ExplorerConfig, service: R, endpoints: Option<RemoteEndpoints>) -> Self {
        let session = ExplorerSession::new(config, service);
        let tissues = session.tissues().unwrap_or_else(|e| {
            log::warn!("tissue list unavailable: {e}");
            Vec::new()
        });
        ExplorerApp {
            session,
            endpoints,
            notice: None,
            launch_target: TaskTarget::DrugTarget,
            launch_algorithm: Algorithm::Trustrank,
            tissues,
            last_poll: None,
        }
    }

    pub fn with_network(mut self, payload: &NetworkPayload) -> Self {
        match self.session.load_network(payload) {
            Ok(diags) if !diags.is_empty() => {
                self.info(format!("Network loaded with {} warnings", diags.len()));
            }
            Ok(_) => {}
            Err(e) => self.fail(format!("Loading network failed: {e}")),
        }
        self
    }

    fn info(&mut self, msg: String) { self.notice = Some((NoticeLevel::Info, msg)); }

    fn fail(&mut self, msg: String) {
        log::error!("{msg}");
        self.notice = Some((NoticeLevel::Error, msg));
    }

    fn report<T>(&mut self, what: &str, res: anyhow::Result<T>) -> Option<T> {
        match res {
            Ok(v) => Some(v),
            Err(e) => {
                self.fail(format!("{what}: {e}"));
                None
            }
        }
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(&self.session.config().title);
                ui.separator();
                let g = self.session.graph();
                ui.small(format!("N:{} E:{}", g.node_count(), g.edge_count()));
                ui.separator();
                ui.small(format!("context: {}", self.session.registry().active_context()));
                if ui.button("Reset View").clicked() {
                    self.session.main_view_mut().surface_mut().reset_view();
                }
                if let Some((level, msg)) = &self.notice {
                    ui.separator();
                    let color = match level {
                        NoticeLevel::Info => Color32::LIGHT_BLUE,
                        NoticeLevel::Error => Color32::RED,
                    };
                    ui.colored_label(color, msg);
                    if ui.small_button("x").clicked() {
                        self.notice = None;
                    }
                }
            });
        });
    }

    fn left_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("explorer_sidebar").resizable(true).default_width(260.0).show(ctx, |ui| {
            egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                let cfg = self.session.config().clone();
                if cfg.show_selection {
                    self.selection_section(ui);
                }
                if cfg.show_overview {
                    ui.separator();
                    self.overlay_section(ui);
                }
                if cfg.show_adv_analysis || cfg.show_simple_analysis {
                    ui.separator();
                    self.launch_section(ui, &cfg);
                }
                let diags = self.session.diagnostics();
                if !diags.is_empty() {
                    ui.separator();
                    ui.collapsing(format!("Warnings ({})", diags.len()), |ui| {
                        for d in diags {
                            ui.small(d.to_string());
                        }
                    });
                }
            });
        });
    }

    fn selection_section(&mut self, ui: &mut egui::Ui) {
        ui.strong("Selection");
        let items = self.session.registry().selection();
        if items.is_empty() {
            ui.small("Double-click a protein to select it.");
        }
        for item in &items {
            ui.horizontal(|ui| {
                ui.label(&item.label);
                ui.small(format!("({})", item.kind.label()));
            });
        }
        if !items.is_empty() && ui.button("Clear Selection").clicked() {
            self.session.clear_selection();
        }
    }

    fn overlay_section(&mut self, ui: &mut egui::Ui) {
        ui.strong("Explorer");
        let mut drugs = self.session.has_drug_overlay();
        if ui.checkbox(&mut drugs, "Adjacent drugs").changed() {
            let res = self.session.toggle_adjacent_drugs();
            self.report("Adjacent drugs", res);
        }
        let mut prot_dis = self.session.has_disorder_overlay(DisorderSource::Proteins);
        if ui.checkbox(&mut prot_dis, "Adjacent disorders (proteins)").changed() {
            let res = self.session.toggle_adjacent_disorders(DisorderSource::Proteins);
            self.report("Adjacent disorders", res);
        }
        let mut drug_dis = self.session.has_disorder_overlay(DisorderSource::Drugs);
        let enabled = self.session.has_drug_overlay();
        if ui.add_enabled(enabled, egui::Checkbox::new(&mut drug_dis, "Adjacent disorders (drugs)")).changed() {
            let res = self.session.toggle_adjacent_disorders(DisorderSource::Drugs);
            self.report("Adjacent disorders", res);
        }

        let current = self.session.selected_tissue().map(|t| t.name.clone()).unwrap_or_else(|| "None".to_string());
        let mut choice: Option<Option<Tissue>> = None;
        egui::ComboBox::from_label("Tissue").selected_text(current).show_ui(ui, |ui| {
            if ui.selectable_label(self.session.selected_tissue().is_none(), "None").clicked() {
                choice = Some(None);
            }
            for t in &self.tissues {
                let sel = self.session.selected_tissue() == Some(t);
                if ui.selectable_label(sel, &t.name).clicked() {
                    choice = Some(Some(t.clone()));
                }
            }
        });
        if let Some(tissue) = choice {
            let res = self.session.select_tissue(tissue);
            self.report("Tissue expression", res);
        }
    }

    fn launch_section(&mut self, ui: &mut egui::Ui, cfg: &ExplorerConfig) {
        ui.strong("Analysis");
        ui.horizontal(|ui| {
            ui.radio_value(&mut self.launch_target, TaskTarget::DrugTarget, &cfg.task_target_name);
            ui.radio_value(&mut self.launch_target, TaskTarget::Drug, &cfg.task_drug_name);
        });
        let offered = self.session.offered_algorithms(self.launch_target);
        if !offered.contains(&self.launch_algorithm) {
            self.launch_algorithm = offered[0];
        }
        egui::ComboBox::from_label("Algorithm").selected_text(self.launch_algorithm.name()).show_ui(ui, |ui| {
            for a in &offered {
                ui.selectable_value(&mut self.launch_algorithm, *a, a.name());
            }
        });
        let seeds = self.session.registry().count();
        if ui.add_enabled(seeds > 0, egui::Button::new(format!("Launch ({seeds} seeds)"))).clicked() {
            let res = self.session.launch_analysis(self.launch_algorithm, self.launch_target);
            if let Some(token) = self.report("Launch", res) {
                let res = self.session.open_analysis(&token);
                self.report("Task", res);
                self.last_poll = Some(Instant::now());
            }
        }
    }

    fn right_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("details_sidebar").resizable(true).default_width(320.0).show(ctx, |ui| {
            egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                self.details_section(ui);
                if self.session.analysis().is_some() {
                    ui.separator();
                    self.analysis_section(ui);
                }
            });
        });
    }

    fn details_section(&mut self, ui: &mut egui::Ui) {
        ui.strong("Details");
        let Some(id) = self.session.details().cloned() else {
            ui.small("Click a node to inspect it.");
            return;
        };
        let node = self
            .session
            .main_view()
            .node(&id)
            .or_else(|| self.session.analysis().and_then(|p| p.view.as_ref()).and_then(|v| v.node(&id)));
        let Some(node) = node else { return };
        egui::Grid::new("node_details").num_columns(2).striped(true).show(ui, |ui| {
            ui.label("Label");
            ui.label(&node.label);
            ui.end_row();
            ui.label("Id");
            ui.label(&node.id);
            ui.end_row();
            ui.label("Group");
            ui.label(&node.group);
            ui.end_row();
            match &node.kind {
                NodeKind::Protein { symbol, uniprot_ac, ensg } => {
                    ui.label("Symbol");
                    ui.label(symbol.as_deref().unwrap_or("-"));
                    ui.end_row();
                    ui.label("UniProt");
                    ui.label(uniprot_ac.as_deref().unwrap_or("-"));
                    ui.end_row();
                    ui.label("Ensembl");
                    ui.label(ensg.join(", "));
                    ui.end_row();
                }
                NodeKind::Drug { status, in_trial, in_literature, trial_links } => {
                    ui.label("Status");
                    ui.label(format!("{status:?}"));
                    ui.end_row();
                    ui.label("In trial");
                    ui.label(in_trial.to_string());
                    ui.end_row();
                    ui.label("In literature");
                    ui.label(in_literature.to_string());
                    ui.end_row();
                    for link in trial_links {
                        ui.label("Trial");
                        ui.hyperlink(link);
                        ui.end_row();
                    }
                }
                NodeKind::Disorder { icd10 } => {
                    ui.label("ICD-10");
                    ui.label(icd10.join(", "));
                    ui.end_row();
                }
                NodeKind::Custom => {}
            }
            if let Some(p) = node.position {
                ui.label("Position");
                ui.label(format!("{:.0}, {:.0}", p.x, p.y));
                ui.end_row();
            }
        });
        if node.is_selectable() {
            let label = if self.session.registry().contains(self.session.registry().active_context(), node.lookup_id()) {
                "Remove from selection"
            } else {
                "Add to selection"
            };
            if ui.button(label).clicked() {
                self.session.toggle_selection(&node.id);
            }
        }
    }

    fn analysis_section(&mut self, ui: &mut egui::Ui) {
        let Some(panel) = self.session.analysis() else { return };
        let token = panel.token.clone();
        ui.strong(format!("Task {token}"));
        if let Some(alg) = panel.algorithm.or_else(|| panel.handle.algorithm().and_then(Algorithm::from_slug)) {
            ui.label(alg.name());
        }
        if let Some(err) = &panel.error {
            ui.colored_label(Color32::RED, err);
        } else if !panel.handle.is_terminal() {
            ui.add(egui::ProgressBar::new(panel.handle.progress()).show_percentage());
            if let Some(task) = &panel.handle.last {
                ui.small(format!("queue {}/{}", task.stats.queue_position, task.stats.queue_length));
            }
        }
        if let Some(ep) = &self.endpoints {
            if let Ok(url) = ep.task_result_url(&token) {
                ui.hyperlink_to("Result link", url.as_str());
            }
        }

        let mut close = false;
        let mut normalize = panel.normalize;
        let mut highlight = panel.view.as_ref().is_some_and(|v| v.highlight_seeds());
        let has_view = panel.view.is_some();
        let (drug_tip, protein_tip) = (panel.drug_tooltip(), panel.protein_tooltip());
        let drugs = panel.drugs.clone();
        let proteins = panel.proteins.clone();

        ui.horizontal(|ui| {
            if ui.button("Close").clicked() {
                close = true;
            }
        });
        if has_view {
            let mut toggles = (false, false);
            ui.horizontal(|ui| {
                toggles.0 = ui.checkbox(&mut normalize, "Normalize").changed();
                toggles.1 = ui.checkbox(&mut highlight, "Highlight seeds").changed();
            });
            if toggles.0 {
                self.session.set_normalization(normalize);
            }
            if toggles.1 {
                self.session.set_highlight_seeds(highlight);
            }

            for (kind, title, table, tip) in [
                (ScoreKind::Drugs, "Drugs", &drugs, drug_tip),
                (ScoreKind::Proteins, "Proteins", &proteins, protein_tip),
            ] {
                if table.is_empty() {
                    continue;
                }
                ui.separator();
                ui.horizontal(|ui| {
                    let h = ui.strong(format!("{title} ({})", table.len()));
                    if let Some(t) = tip {
                        h.on_hover_text(t);
                    }
                    if ui.small_button("Export CSV").clicked() {
                        let res = self.session.export_scores(kind, None);
                        if let Some(path) = self.report("Export", res) {
                            self.info(format!("Saved {}", path.display()));
                        }
                    }
                });
                egui::Grid::new(format!("scores_{title}")).num_columns(3).striped(true).show(ui, |ui| {
                    for row in &table.rows {
                        let text = egui::RichText::new(&row.label);
                        let text = if row.selected { text.strong() } else { text };
                        let text = if row.is_seed { text.italics() } else { text };
                        ui.label(text);
                        ui.label(row.score.map(|s| format!("{s:.4}")).unwrap_or_default());
                        ui.label(if row.is_seed { "seed" } else { "" });
                        ui.end_row();
                    }
                });
            }
        }
        if close {
            self.session.close_analysis();
        }
    }

    fn legend(&mut self, ctx: &egui::Context) {
        let cfg = self.session.config();
        if !(cfg.show_footer && cfg.show_legend) {
            return;
        }
        let groups: Vec<(String, Color32)> = if cfg.show_legend_nodes {
            cfg.node_groups
                .iter()
                .filter_map(|(key, g)| {
                    let color = g.color.as_ref().map(GroupColor::expanded)?.background?;
                    Some((g.display_name(key).to_string(), parse_color(&color)?))
                })
                .collect()
        } else {
            Vec::new()
        };
        egui::TopBottomPanel::bottom("legend").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                for (name, color) in groups {
                    ui.colored_label(color, "⬤");
                    ui.small(name);
                }
            });
        });
    }

    fn auto_poll(&mut self, ctx: &egui::Context) {
        let pending = self.session.analysis().is_some_and(|p| !p.handle.is_terminal() && p.error.is_none());
        if !pending {
            return;
        }
        let due = self.last_poll.is_none_or(|t| t.elapsed() >= POLL_EVERY);
        if due {
            self.last_poll = Some(Instant::now());
            let res = self.session.poll_analysis();
            if let Some(TaskTransition::Failed(err)) = self.report("Task", res) {
                self.fail(err.to_string());
            }
        }
        ctx.request_repaint_after(POLL_EVERY);
    }
}

impl<R: ScoringService> eframe::App for ExplorerApp<R> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.auto_poll(ctx);
        self.top_bar(ctx);
        let cfg = self.session.config().clone();
        if cfg.show_left_sidebar {
            self.left_panel(ctx);
        }
        if cfg.show_right_sidebar {
            self.right_panel(ctx);
        }
        self.legend(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            let active = self.session.registry().active_context().clone();
            let analysis_surface = self
                .session
                .analysis_mut()
                .and_then(|p| p.view.as_mut())
                .filter(|v| *v.context() == active)
                .map(|v| v.surface_mut());
            match analysis_surface {
                Some(surface) => surface.show(ui),
                None => self.session.main_view_mut().surface_mut().show(ui),
            }
        });

        self.session.pump();
    }
}
