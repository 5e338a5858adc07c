use std::collections::BTreeMap;
use std::time::Duration;

use eframe::egui::{self, Color32, Pos2, Rect, Sense, Shape as PaintShape, Stroke, Vec2};

use crate::graph_utils::entity::{Edge, NodeId, Position};
use crate::style::groups::Shape;
use crate::style::StyledNode;
use crate::view::{RenderSurface, SurfaceEvent};

// Nominal world rect the spiral placement is scaled to
const WORLD_SIZE: Vec2 = Vec2::new(900.0, 600.0);
const NODE_RADIUS: f32 = 10.0;

/// Parse the color notations that appear in style configs:
/// "#rgb", "#rrggbb", "rgb(r,g,b)", "rgba(r,g,b,a)" and a few names.
pub fn parse_color(s: &str) -> Option<Color32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        let expand = |c: u8| c * 17;
        let nib = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        return match hex.len() {
            3 => Some(Color32::from_rgb(expand(nib(0)?), expand(nib(1)?), expand(nib(2)?))),
            6 => Some(Color32::from_rgb(byte(0)?, byte(2)?, byte(4)?)),
            _ => None,
        };
    }
    if let Some(body) = s.strip_prefix("rgba(").or_else(|| s.strip_prefix("rgb(")) {
        let parts: Vec<&str> = body.trim_end_matches(')').split(',').map(str::trim).collect();
        let c = |i: usize| parts.get(i).and_then(|p| p.parse::<u8>().ok());
        let a = parts.get(3).and_then(|p| p.parse::<f32>().ok()).unwrap_or(1.0);
        return Some(Color32::from_rgba_unmultiplied(c(0)?, c(1)?, c(2)?, (a.clamp(0.0, 1.0) * 255.0) as u8));
    }
    match s.to_ascii_lowercase().as_str() {
        "black" => Some(Color32::BLACK),
        "white" => Some(Color32::WHITE),
        "red" => Some(Color32::RED),
        "green" => Some(Color32::GREEN),
        "blue" => Some(Color32::BLUE),
        "yellow" => Some(Color32::YELLOW),
        "gray" | "grey" => Some(Color32::GRAY),
        _ => None,
    }
}

fn golden_spiral_position(center: Pos2, k: u32, rect: Rect) -> Pos2 {
    // Golden angle in radians
    let golden_angle = std::f32::consts::TAU * (1.0 - 1.0 / 1.618_034);
    let t = k as f32;
    let base = (rect.size().min_elem() * 0.05).max(20.0);
    let r = base * t.sqrt();
    let theta = t * golden_angle;
    Pos2::new(center.x + r * theta.cos(), center.y + r * theta.sin())
}

/// Interactive egui canvas for one view.
#[derive(Debug)]
pub struct EguiSurface {
    nodes: BTreeMap<NodeId, StyledNode>,
    edges: Vec<Edge>,
    // World coordinates, centered on the origin
    positions: BTreeMap<NodeId, Pos2>,
    placed: u32,
    pan: Vec2,
    zoom: f32,
    hover: Option<NodeId>,
    pending: Vec<SurfaceEvent>,
}

impl Default for EguiSurface {
    fn default() -> Self {
        EguiSurface {
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            positions: BTreeMap::new(),
            placed: 0,
            pan: Vec2::ZERO,
            zoom: 1.0,
            hover: None,
            pending: Vec::new(),
        }
    }
}

impl EguiSurface {
    pub fn reset_view(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
    }

    pub fn zoom(&self) -> f32 { self.zoom }

    fn place(&mut self, node: &StyledNode) {
        if self.positions.contains_key(&node.node.id) {
            return;
        }
        let pos = match node.node.position {
            Some(p) => Pos2::new(p.x, p.y),
            None => {
                let world = Rect::from_center_size(Pos2::ZERO, WORLD_SIZE);
                let p = golden_spiral_position(Pos2::ZERO, self.placed, world);
                self.placed += 1;
                p
            }
        };
        self.positions.insert(node.node.id.clone(), pos);
    }

    /// Draw the canvas into the remaining space of `ui` and record interaction events.
    pub fn show(&mut self, ui: &mut egui::Ui) {
        let available = ui.available_rect_before_wrap();
        let bg_resp = ui.allocate_rect(available, Sense::click_and_drag());

        let center = available.center();
        if bg_resp.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let factor = (1.0 + scroll * 0.001).clamp(0.9, 1.1);
                self.zoom = (self.zoom * factor).clamp(0.25, 2.5);
                ui.ctx().request_repaint_after(Duration::from_millis(16));
            }
        }
        if bg_resp.dragged() {
            self.pan += bg_resp.drag_delta();
        }
        if bg_resp.clicked() {
            self.pending.push(SurfaceEvent::Click(None));
            let selected: Vec<NodeId> = self.hover.take().into_iter().collect();
            self.pending.push(SurfaceEvent::Deselect(selected));
        }

        let zoom = self.zoom;
        let pan = self.pan;
        let to_screen = move |p: Pos2| -> Pos2 { Pos2::new(p.x * zoom + center.x + pan.x, p.y * zoom + center.y + pan.y) };

        let painter = ui.painter_at(available);

        for edge in &self.edges {
            let (Some(a), Some(b)) = (self.positions.get(&edge.from), self.positions.get(&edge.to)) else { continue };
            let incident_hover = self.hover.as_ref().is_some_and(|h| edge.touches(h));
            let stroke = if incident_hover {
                Stroke { width: 2.5, color: Color32::from_rgb(120, 220, 255) }
            } else {
                Stroke { width: 1.2, color: Color32::from_rgba_unmultiplied(90, 90, 90, 180) }
            };
            painter.line_segment([to_screen(*a), to_screen(*b)], stroke);
        }

        let radius = NODE_RADIUS * zoom;
        let mut hover = None;
        let ids: Vec<NodeId> = self.nodes.keys().cloned().collect();
        for id in ids {
            let (Some(pos_world), Some(styled)) = (self.positions.get(&id).copied(), self.nodes.get(&id)) else { continue };
            let pos = to_screen(pos_world);
            let rect = Rect::from_center_size(pos, Vec2::splat(radius * 2.0));
            let resp = ui.allocate_rect(rect, Sense::click_and_drag());

            paint_node(&painter, styled, pos, radius);

            if resp.hovered() {
                hover = Some(id.clone());
            }
            if resp.double_clicked() {
                self.pending.push(SurfaceEvent::DoubleClick(id.clone()));
            } else if resp.clicked() {
                self.pending.push(SurfaceEvent::Click(Some(id.clone())));
            }
            if resp.dragged() {
                let delta = resp.drag_delta() / zoom;
                if let Some(p) = self.positions.get_mut(&id) {
                    *p += delta;
                }
            }
            let label = styled.node.label.clone();
            let group = styled.style.group_name.clone();
            resp.on_hover_ui(|ui| {
                ui.label(egui::RichText::new(label).strong());
                ui.small(group);
            });
        }
        self.hover = hover;
    }
}

fn paint_node(painter: &egui::Painter, styled: &StyledNode, pos: Pos2, radius: f32) {
    let style = &styled.style;
    let colors = style.color.clone().unwrap_or_default();
    let mut fill = colors.background.as_deref().and_then(parse_color).unwrap_or(Color32::LIGHT_GRAY);
    let border = colors.border.as_deref().and_then(parse_color).unwrap_or(Color32::DARK_GRAY);

    if let Some(opacity) = style.opacity {
        if opacity < 0.0 {
            // No expression data: outline only
            fill = Color32::TRANSPARENT;
        } else {
            let base = if style.color.is_some() { fill } else { Color32::from_rgb(233, 30, 99) };
            fill = Color32::from_rgba_unmultiplied(base.r(), base.g(), base.b(), (opacity.clamp(0.0, 1.0) * 255.0) as u8);
        }
    }

    if style.shadow.enabled {
        let shadow = parse_color(&style.shadow.color).unwrap_or(Color32::from_black_alpha(128));
        painter.circle_filled(pos + Vec2::splat(2.0), radius, shadow);
    }

    let stroke = Stroke { width: style.border_width.max(1.0), color: border };
    let r = radius;
    match style.shape {
        Shape::Square | Shape::Box => {
            painter.rect(
                Rect::from_center_size(pos, Vec2::splat(r * 1.8)),
                2.0,
                fill,
                stroke,
                egui::StrokeKind::Middle,
            );
        }
        Shape::Triangle => {
            let pts = vec![pos + Vec2::new(0.0, -r), pos + Vec2::new(r, r * 0.8), pos + Vec2::new(-r, r * 0.8)];
            painter.add(PaintShape::convex_polygon(pts, fill, stroke));
        }
        Shape::Diamond => {
            let pts = vec![pos + Vec2::new(0.0, -r), pos + Vec2::new(r, 0.0), pos + Vec2::new(0.0, r), pos + Vec2::new(-r, 0.0)];
            painter.add(PaintShape::convex_polygon(pts, fill, stroke));
        }
        Shape::Star => {
            let pts: Vec<Pos2> = (0..10)
                .map(|i| {
                    let a = std::f32::consts::PI * (i as f32) / 5.0 - std::f32::consts::FRAC_PI_2;
                    let rr = if i % 2 == 0 { r } else { r * 0.45 };
                    pos + Vec2::new(rr * a.cos(), rr * a.sin())
                })
                .collect();
            painter.add(PaintShape::closed_line(pts, stroke));
            painter.circle_filled(pos, r * 0.45, fill);
        }
        Shape::Text => {}
        Shape::Image => {
            painter.circle(pos, r, Color32::WHITE, stroke);
            painter.text(pos, egui::Align2::CENTER_CENTER, "img", egui::FontId::proportional(r * 0.8), border);
        }
        Shape::Circle | Shape::Dot | Shape::Ellipse | Shape::Custom => {
            painter.circle(pos, r, fill, stroke);
        }
    }

    let font_color = style.font.color.as_deref().and_then(parse_color).unwrap_or(Color32::BLACK);
    let size = style.font.size.unwrap_or(14.0) * (r / NODE_RADIUS) * 0.8;
    painter.text(
        pos + Vec2::new(0.0, r + 2.0),
        egui::Align2::CENTER_TOP,
        &styled.node.label,
        egui::FontId::proportional(size.clamp(6.0, 24.0)),
        font_color,
    );
}

impl RenderSurface for EguiSurface {
    fn set_data(&mut self, nodes: Vec<StyledNode>, edges: Vec<Edge>) {
        self.nodes.clear();
        self.positions.clear();
        self.placed = 0;
        self.hover = None;
        for n in nodes {
            self.place(&n);
            self.nodes.insert(n.node.id.clone(), n);
        }
        self.edges = edges;
    }

    fn get(&self, id: &str) -> Option<&StyledNode> { self.nodes.get(id) }

    fn update(&mut self, nodes: Vec<StyledNode>) {
        for n in nodes {
            if let Some(slot) = self.nodes.get_mut(&n.node.id) {
                *slot = n;
            }
        }
    }

    fn add(&mut self, nodes: Vec<StyledNode>, edges: Vec<Edge>) {
        for n in nodes {
            self.place(&n);
            self.nodes.insert(n.node.id.clone(), n);
        }
        for e in edges {
            if !self.edges.iter().any(|x| x.from == e.from && x.to == e.to) {
                self.edges.push(e);
            }
        }
    }

    fn remove(&mut self, ids: &[NodeId]) {
        for id in ids {
            self.nodes.remove(id);
            self.positions.remove(id);
            self.edges.retain(|e| !e.touches(id));
        }
    }

    fn remove_edges(&mut self, pairs: &[(NodeId, NodeId)]) {
        self.edges.retain(|e| !pairs.iter().any(|(f, t)| e.from == *f && e.to == *t));
    }

    fn positions(&self, ids: &[NodeId]) -> BTreeMap<NodeId, Position> {
        ids.iter()
            .filter_map(|id| self.positions.get(id).map(|p| (id.clone(), Position { x: p.x, y: p.y })))
            .collect()
    }

    fn take_events(&mut self) -> Vec<SurfaceEvent> { std::mem::take(&mut self.pending) }
}
