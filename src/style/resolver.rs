use serde::{Deserialize, Serialize};

use crate::graph_utils::entity::Node;
use crate::persistence::settings::ExplorerConfig;

use super::groups::{ColorSet, Font, NodeGroup, Shape, SEED_GROUP, SELECTED_GROUP};

pub const SHADOW_COLOR: &str = "rgba(0,0,0,0.5)";
pub const SELECTED_SHADOW_COLOR: &str = "#000000";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Renderer {
    // Tissue expression: opacity-encoded fill drawn by the surface
    Expression,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientOverlay {
    pub value: f32,
    pub renderer: Renderer,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleFlags {
    pub is_seed: bool,
    pub is_selected: bool,
    pub gradient: Option<GradientOverlay>,
}

impl StyleFlags {
    pub fn new(is_seed: bool, is_selected: bool) -> Self {
        StyleFlags { is_seed, is_selected, gradient: None }
    }

    pub fn with_gradient(mut self, value: f32) -> Self {
        self.gradient = Some(GradientOverlay { value, renderer: Renderer::Expression });
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Overlay {
    Seed,
    Selected,
    Image,
    Gradient,
}

/// How a node's effective group was derived. Lives next to the node, never inside it,
/// so the user-assigned group cannot be lost to seed or selection styling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StyleState {
    pub base_group: String,
    pub effective_group: String,
    pub overlays: Vec<Overlay>,
}

impl StyleState {
    /// The group a seed overlay displaced, if any.
    pub fn shadow_group(&self) -> Option<&str> {
        self.has(Overlay::Seed).then_some(self.base_group.as_str())
    }

    pub fn has(&self, overlay: Overlay) -> bool { self.overlays.contains(&overlay) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub enabled: bool,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub group_name: String,
    pub shape: Shape,
    pub color: Option<ColorSet>,
    pub font: Font,
    pub border_width: f32,
    pub border_width_selected: f32,
    pub shadow: Shadow,
    pub image: Option<String>,
    pub opacity: Option<f32>,
    pub renderer: Option<Renderer>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StyledNode {
    pub node: Node,
    pub state: StyleState,
    pub style: NodeStyle,
}

impl StyledNode {
    pub fn id(&self) -> &str { &self.node.id }
}

fn group<'c>(config: &'c ExplorerConfig, name: &str) -> &'c NodeGroup {
    // Config validation guarantees every group a node can carry; reaching this is a bug
    match config.node_groups.get(name) {
        Some(g) => g,
        None => panic!("node group '{name}' missing from validated config"),
    }
}

fn shadow_for(group: &NodeGroup, selected: bool) -> Shadow {
    Shadow {
        enabled: group.shadow.unwrap_or(false),
        color: if selected { SELECTED_SHADOW_COLOR } else { SHADOW_COLOR }.to_string(),
    }
}

/// Compute the visual attributes of `node` under `config` and `flags`.
///
/// Pure: the node is cloned into the result, never modified, so resolving the output
/// again with the same flags (see [`restyle`]) yields an identical value.
pub fn resolve(node: &Node, config: &ExplorerConfig, flags: &StyleFlags) -> StyledNode {
    let base_group = node.group.clone();
    let mut overlays = Vec::new();

    let mut effective_group = base_group.clone();
    if flags.is_seed {
        effective_group = SEED_GROUP.to_string();
        overlays.push(Overlay::Seed);
    }

    let mut attrs = group(config, &effective_group).clone();
    let shadow = if flags.is_selected {
        // Seed and selection compose: selection is merged over whatever is active
        attrs = attrs.merged(group(config, SELECTED_GROUP));
        overlays.push(Overlay::Selected);
        shadow_for(group(config, &effective_group), true)
    } else {
        shadow_for(group(config, &base_group), false)
    };

    let mut shape = attrs.shape.unwrap_or(Shape::Triangle);
    let mut image = None;
    // Seed styling wins over custom images
    if let Some(img) = node.image.as_ref().or(attrs.image.as_ref()) {
        if !flags.is_seed {
            shape = Shape::Image;
            image = Some(img.clone());
            overlays.push(Overlay::Image);
        }
    }

    let mut style = NodeStyle {
        group_name: attrs.display_name(&effective_group).to_string(),
        shape,
        color: attrs.color.as_ref().map(|c| c.expanded()),
        font: attrs.font.clone().unwrap_or_default(),
        border_width: attrs.border_width.unwrap_or(0.0),
        border_width_selected: attrs.border_width_selected.unwrap_or(0.0),
        shadow,
        image,
        opacity: None,
        renderer: None,
    };

    if let Some(gradient) = flags.gradient {
        style.shape = Shape::Custom;
        style.opacity = Some(gradient.value);
        style.renderer = Some(gradient.renderer);
        // A seed under a gradient shows its plain group color, without the selection overlay
        style.color = if flags.is_seed {
            group(config, &effective_group).color.as_ref().map(|c| c.expanded())
        } else {
            None
        };
        style.shadow = shadow_for(group(config, &effective_group), false);
        overlays.push(Overlay::Gradient);
    }

    StyledNode {
        node: node.clone(),
        state: StyleState { base_group, effective_group, overlays },
        style,
    }
}

/// Re-resolve an already styled node, e.g. after a flag change or config swap.
pub fn restyle(styled: &StyledNode, config: &ExplorerConfig, flags: &StyleFlags) -> StyledNode {
    // The cached node still carries its base group, so nothing has to be undone first
    debug_assert_eq!(styled.node.group, styled.state.base_group);
    resolve(&styled.node, config, flags)
}
