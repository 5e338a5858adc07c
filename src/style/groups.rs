use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExplorerError;

pub const DEFAULT_GROUP: &str = "default";
pub const FOUND_NODE_GROUP: &str = "foundNode";
pub const FOUND_DRUG_GROUP: &str = "foundDrug";
pub const DISORDER_GROUP: &str = "defaultDisorder";
pub const SEED_GROUP: &str = "seedNode";
pub const SELECTED_GROUP: &str = "selectedNode";

// Groups that must survive any user override
pub const RESERVED_NODE_GROUPS: [&str; 6] = [
    DEFAULT_GROUP,
    FOUND_NODE_GROUP,
    FOUND_DRUG_GROUP,
    DISORDER_GROUP,
    SEED_GROUP,
    SELECTED_GROUP,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Circle,
    Triangle,
    Star,
    Square,
    Image,
    Text,
    Ellipse,
    Box,
    Diamond,
    Dot,
    Custom,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HighlightColor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<HighlightColor>,
}

impl ColorSet {
    pub fn solid(color: &str) -> Self {
        ColorSet {
            border: Some(color.to_string()),
            background: Some(color.to_string()),
            highlight: Some(HighlightColor {
                border: Some(color.to_string()),
                background: Some(color.to_string()),
            }),
        }
    }

    // Overlay wins wherever it says something; nested highlight is merged, not replaced
    pub fn merged(&self, overlay: &ColorSet) -> ColorSet {
        let highlight = match (&self.highlight, &overlay.highlight) {
            (Some(base), Some(top)) => Some(HighlightColor {
                border: top.border.clone().or_else(|| base.border.clone()),
                background: top.background.clone().or_else(|| base.background.clone()),
            }),
            (base, top) => top.clone().or_else(|| base.clone()),
        };
        ColorSet {
            border: overlay.border.clone().or_else(|| self.border.clone()),
            background: overlay.background.clone().or_else(|| self.background.clone()),
            highlight,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupColor {
    Solid(String),
    Detailed(ColorSet),
}

impl GroupColor {
    /// Expand the string shorthand into border/background/highlight.
    pub fn expanded(&self) -> ColorSet {
        match self {
            GroupColor::Solid(c) => ColorSet::solid(c),
            GroupColor::Detailed(set) => set.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Font {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
}

impl Font {
    pub fn merged(&self, overlay: &Font) -> Font {
        Font {
            color: overlay.color.clone().or_else(|| self.color.clone()),
            size: overlay.size.or(self.size),
            face: overlay.face.clone().or_else(|| self.face.clone()),
            stroke_width: overlay.stroke_width.or(self.stroke_width),
            stroke_color: overlay.stroke_color.clone().or_else(|| self.stroke_color.clone()),
            align: overlay.align.clone().or_else(|| self.align.clone()),
            bold: overlay.bold.or(self.bold),
        }
    }
}

/// Visual attributes for one node group. Every field is optional so that partial
/// overrides and overlays (e.g. "selectedNode") can be expressed with the same type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<GroupColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Shape>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_show_label: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width_selected: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<bool>,
}

impl NodeGroup {
    /// Deep merge: attributes present in `overlay` win, nested color/font keys the overlay omits survive.
    pub fn merged(&self, overlay: &NodeGroup) -> NodeGroup {
        let color = match (&self.color, &overlay.color) {
            (Some(base), Some(top)) => Some(GroupColor::Detailed(base.expanded().merged(&top.expanded()))),
            (base, top) => top.clone().or_else(|| base.clone()),
        };
        let font = match (&self.font, &overlay.font) {
            (Some(base), Some(top)) => Some(base.merged(top)),
            (base, top) => top.clone().or_else(|| base.clone()),
        };
        NodeGroup {
            group_name: overlay.group_name.clone().or_else(|| self.group_name.clone()),
            color,
            shape: overlay.shape.or(self.shape),
            type_label: overlay.type_label.clone().or_else(|| self.type_label.clone()),
            image: overlay.image.clone().or_else(|| self.image.clone()),
            detail_show_label: overlay.detail_show_label.or(self.detail_show_label),
            font,
            border_width: overlay.border_width.or(self.border_width),
            border_width_selected: overlay.border_width_selected.or(self.border_width_selected),
            shadow: overlay.shadow.or(self.shadow),
        }
    }

    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.group_name.as_deref().unwrap_or(key)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dashes {
    Flag(bool),
    Pattern(Vec<f32>),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashes: Option<Dashes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<bool>,
}

fn palette_group(name: &str, color: &str, shape: Shape, type_label: &str) -> NodeGroup {
    NodeGroup {
        group_name: Some(name.to_string()),
        color: Some(GroupColor::Detailed(ColorSet::solid(color))),
        shape: Some(shape),
        type_label: Some(type_label.to_string()),
        ..Default::default()
    }
}

pub static DEFAULT_FONT: Lazy<Font> = Lazy::new(|| Font {
    color: Some("#000000".into()),
    size: Some(14.0),
    face: Some("arial".into()),
    stroke_width: Some(0.0),
    stroke_color: Some("#ffffff".into()),
    align: Some("center".into()),
    bold: Some(false),
});

pub static DEFAULT_NODE_GROUPS: Lazy<BTreeMap<String, NodeGroup>> = Lazy::new(|| {
    let mut groups = BTreeMap::new();
    groups.insert(
        DEFAULT_GROUP.to_string(),
        NodeGroup {
            color: Some(GroupColor::Detailed(ColorSet {
                border: Some("#FFFF00".into()),
                background: Some("#FFFF00".into()),
                highlight: Some(HighlightColor {
                    border: Some("#FF0000".into()),
                    background: Some("#FF0000".into()),
                }),
            })),
            detail_show_label: Some(false),
            font: Some(DEFAULT_FONT.clone()),
            border_width: Some(1.0),
            border_width_selected: Some(2.0),
            ..palette_group("Default Node Group", "#FFFF00", Shape::Triangle, "default type")
        },
    );
    groups.insert(
        FOUND_NODE_GROUP.to_string(),
        palette_group("Found Nodes", "#F12590", Shape::Circle, "default node type"),
    );
    groups.insert(
        FOUND_DRUG_GROUP.to_string(),
        palette_group("Drugs", "#F12590", Shape::Diamond, "default drug type"),
    );
    groups.insert(
        DISORDER_GROUP.to_string(),
        palette_group("Disorders", "#ffa62f", Shape::Triangle, "default disorder type"),
    );
    groups.insert(
        SEED_GROUP.to_string(),
        NodeGroup {
            font: Some(Font { color: Some("#F1111D".into()), size: Some(14.0), ..Default::default() }),
            ..palette_group("Seed Nodes", "#F1111D", Shape::Triangle, "seed")
        },
    );
    // Partial on purpose: merged on top of whatever group is active
    groups.insert(
        SELECTED_GROUP.to_string(),
        NodeGroup {
            border_width: Some(3.0),
            border_width_selected: Some(4.0),
            color: Some(GroupColor::Detailed(ColorSet {
                border: Some("#F8981D".into()),
                background: None,
                highlight: Some(HighlightColor { border: Some("#F8981D".into()), background: None }),
            })),
            font: Some(Font { color: Some("#F8981D".into()), size: Some(14.0), ..Default::default() }),
            ..Default::default()
        },
    );
    groups
});

pub fn default_edge_groups() -> BTreeMap<String, EdgeGroup> {
    let mut groups = BTreeMap::new();
    groups.insert(
        DEFAULT_GROUP.to_string(),
        EdgeGroup {
            group_name: Some("Default Edge Group".into()),
            color: Some("black".into()),
            dashes: Some(Dashes::Flag(false)),
            shadow: None,
        },
    );
    groups
}

/// Drop group attributes that do not deserialize as `G`, one key at a time, and
/// groups that are not objects at all. The holes are refilled by the validators below.
/// A `groups` value that is not an object is left for typed deserialization to reject.
pub fn strip_malformed_groups<G: DeserializeOwned>(groups: &mut Value) -> Vec<ExplorerError> {
    let mut issues = Vec::new();
    let Value::Object(map) = groups else { return issues };

    map.retain(|name, group| {
        let Value::Object(attrs) = group else {
            issues.push(ExplorerError::config(name.as_str(), "<group>"));
            return false;
        };
        attrs.retain(|key, value| {
            let mut single = serde_json::Map::new();
            single.insert(key.clone(), value.clone());
            let usable = serde_json::from_value::<G>(Value::Object(single)).is_ok();
            if !usable {
                issues.push(ExplorerError::config(name.as_str(), key.as_str()));
            }
            usable
        });
        true
    });

    for issue in &issues {
        log::warn!("config: {issue}");
    }
    issues
}

/// Bring a merged node group map into the shape the resolver relies on.
/// Problems are reported and repaired, never fatal.
pub fn validate_node_groups(groups: &mut BTreeMap<String, NodeGroup>, node_shadow: bool) -> Vec<ExplorerError> {
    let mut issues = Vec::new();

    for name in RESERVED_NODE_GROUPS {
        if !groups.contains_key(name) {
            issues.push(ExplorerError::config(name, "<group>"));
            if let Some(builtin) = DEFAULT_NODE_GROUPS.get(name) {
                groups.insert(name.to_string(), builtin.clone());
            }
        }
    }

    // Fallback source for required keys: the (possibly user-tuned) default group
    let fallback = groups.get(DEFAULT_GROUP).cloned().unwrap_or_default();
    let builtin_default = DEFAULT_NODE_GROUPS.get(DEFAULT_GROUP).cloned().unwrap_or_default();

    for (name, group) in groups.iter_mut() {
        if name != SELECTED_GROUP {
            if group.color.is_none() {
                issues.push(ExplorerError::config(name.as_str(), "color"));
                group.color = fallback.color.clone().or_else(|| builtin_default.color.clone());
            }
            if group.shape.is_none() {
                issues.push(ExplorerError::config(name.as_str(), "shape"));
                group.shape = fallback.shape.or(builtin_default.shape);
            }
            if group.group_name.is_none() {
                issues.push(ExplorerError::config(name.as_str(), "groupName"));
                group.group_name = Some(name.clone());
            }
        }
        if group.border_width.is_none() {
            group.border_width = Some(0.0);
        }
        if group.border_width_selected.is_none() {
            group.border_width_selected = Some(0.0);
        }
        if group.font.is_none() {
            group.font = Some(DEFAULT_FONT.clone());
        }
        if let Some(GroupColor::Solid(c)) = &group.color {
            group.color = Some(GroupColor::Detailed(ColorSet::solid(c)));
        }
        if group.image.is_some() {
            group.shape = Some(Shape::Image);
        }
        // nodeShadow is all-or-nothing
        group.shadow = Some(node_shadow);
    }

    for issue in &issues {
        log::warn!("config: {issue}");
    }
    issues
}

pub fn validate_edge_groups(groups: &mut BTreeMap<String, EdgeGroup>, edge_shadow: bool) -> Vec<ExplorerError> {
    let mut issues = Vec::new();
    let builtin = default_edge_groups();
    if !groups.contains_key(DEFAULT_GROUP) {
        issues.push(ExplorerError::config(DEFAULT_GROUP, "<edge group>"));
        groups.extend(builtin.clone());
    }
    let fallback_color = groups
        .get(DEFAULT_GROUP)
        .and_then(|g| g.color.clone())
        .unwrap_or_else(|| "black".to_string());

    for (name, group) in groups.iter_mut() {
        if group.color.is_none() {
            issues.push(ExplorerError::config(name.as_str(), "color"));
            group.color = Some(fallback_color.clone());
        }
        if group.dashes.is_none() {
            group.dashes = Some(Dashes::Flag(false));
        }
        if group.group_name.is_none() {
            group.group_name = Some(name.clone());
        }
        group.shadow = Some(edge_shadow);
    }

    for issue in &issues {
        log::warn!("config: {issue}");
    }
    issues
}
