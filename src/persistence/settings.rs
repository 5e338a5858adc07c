use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExplorerError;
use crate::style::groups::{self, EdgeGroup, NodeGroup};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    #[default]
    Symbol,
    Uniprot,
    Ensg,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrugProteinDataset {
    #[default]
    DrugBank,
    Chembl,
    DGIdb,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProteinProteinDataset {
    #[default]
    #[serde(rename = "STRING")]
    StringDb,
    #[serde(rename = "BioGRID")]
    BioGrid,
    #[serde(rename = "APID")]
    Apid,
}

// Algorithm slugs allowed per task target; empty means "everything offered"
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmLists {
    #[serde(default)]
    pub drug: Vec<String>,
    #[serde(default, rename = "drug-target")]
    pub drug_target: Vec<String>,
}

/// Everything a host page (or the CLI) can configure about the explorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExplorerConfig {
    pub title: String,
    pub task_target_name: String,
    pub task_drug_name: String,

    // Panel visibility
    pub show_left_sidebar: bool,
    pub show_right_sidebar: bool,
    pub show_overview: bool,
    pub show_query: bool,
    pub show_item_selector: bool,
    pub show_simple_analysis: bool,
    pub show_adv_analysis: bool,
    pub show_tasks: bool,
    pub show_selection: bool,
    pub show_footer: bool,
    pub show_legend: bool,
    pub show_legend_nodes: bool,
    pub show_legend_edges: bool,

    pub node_groups: BTreeMap<String, NodeGroup>,
    pub edge_groups: BTreeMap<String, EdgeGroup>,

    pub identifier: IdentifierKind,
    pub interaction_drug_protein: DrugProteinDataset,
    pub interaction_protein_protein: ProteinProteinDataset,
    pub autofill_edges: bool,
    pub node_shadow: bool,
    pub edge_shadow: bool,
    pub physics_on: bool,
    pub algorithms: AlgorithmLists,
    pub licenced_datasets: bool,

    // If None, use OS temporary directory for exports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_override: Option<PathBuf>,

    // Host-specific keys we do not interpret
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        let mut cfg = Self {
            title: "Drugnet".to_string(),
            task_target_name: "Drug target search".to_string(),
            task_drug_name: "Drug search".to_string(),
            show_left_sidebar: true,
            show_right_sidebar: true,
            show_overview: true,
            show_query: true,
            show_item_selector: true,
            show_simple_analysis: false,
            show_adv_analysis: true,
            show_tasks: true,
            show_selection: true,
            show_footer: true,
            show_legend: true,
            show_legend_nodes: true,
            show_legend_edges: true,
            node_groups: groups::DEFAULT_NODE_GROUPS.clone(),
            edge_groups: groups::default_edge_groups(),
            identifier: IdentifierKind::Symbol,
            interaction_drug_protein: DrugProteinDataset::DrugBank,
            interaction_protein_protein: ProteinProteinDataset::StringDb,
            autofill_edges: true,
            node_shadow: true,
            edge_shadow: true,
            physics_on: false,
            algorithms: AlgorithmLists::default(),
            licenced_datasets: false,
            export_override: None,
            extra: BTreeMap::new(),
        };
        cfg.validate();
        cfg
    }
}

/// Merge `overlay` into `base`. Objects merge key by key, `null` leaves the base alone,
/// everything else (arrays included) replaces.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(b), Value::Object(o)) => {
            for (k, v) in o {
                match b.get_mut(k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        if !v.is_null() {
                            b.insert(k.clone(), v.clone());
                        }
                    }
                }
            }
        }
        (b, o) => *b = o.clone(),
    }
}

impl ExplorerConfig {
    fn config_dir() -> PathBuf {
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Drugnet
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("Drugnet");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Drugnet
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("Drugnet");
            }
            return PathBuf::from("Drugnet");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/drugnet or ~/.config/drugnet
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("drugnet");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("drugnet");
        }
    }

    /// Per-user config file picked up when no `--config` is given.
    pub fn default_path() -> PathBuf { Self::config_dir().join("config.json") }

    /// Load the per-user config if one exists, else the built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            return Self::load_from(&path);
        }
        Ok(Self::default())
    }

    /// Read a (possibly partial) override file and merge it onto the defaults.
    /// `.ron` files go through ron, anything else is treated as JSON.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let mut f = fs::File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let overrides: Value = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("ron") => ron::from_str(&s)?,
            _ => serde_json::from_str(&s)?,
        };
        let mut cfg = Self::default();
        cfg.apply_overrides(&overrides)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let s = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Deep-merge a partial override onto this config, then re-run group validation.
    /// A shape mismatch outside the groups (e.g. a string where the group map is expected)
    /// is an error and leaves `self` untouched. Missing or malformed group keys are
    /// repaired and returned.
    pub fn apply_overrides(&mut self, overrides: &Value) -> anyhow::Result<Vec<ExplorerError>> {
        let (next, issues) = self.with_overrides(overrides)?;
        *self = next;
        Ok(issues)
    }

    /// Like `apply_overrides`, but returns the merged config instead of committing it.
    pub fn with_overrides(&self, overrides: &Value) -> anyhow::Result<(Self, Vec<ExplorerError>)> {
        let mut merged = serde_json::to_value(self)?;
        deep_merge(&mut merged, overrides);

        let mut issues = Vec::new();
        if let Some(node_groups) = merged.get_mut("nodeGroups") {
            issues.extend(groups::strip_malformed_groups::<NodeGroup>(node_groups));
        }
        if let Some(edge_groups) = merged.get_mut("edgeGroups") {
            issues.extend(groups::strip_malformed_groups::<EdgeGroup>(edge_groups));
        }

        let mut next: ExplorerConfig = serde_json::from_value(merged)?;
        for issue in next.validate() {
            if !issues.contains(&issue) {
                issues.push(issue);
            }
        }
        Ok((next, issues))
    }

    pub fn validate(&mut self) -> Vec<ExplorerError> {
        let mut issues = groups::validate_node_groups(&mut self.node_groups, self.node_shadow);
        issues.extend(groups::validate_edge_groups(&mut self.edge_groups, self.edge_shadow));
        issues
    }

    pub fn node_group(&self, name: &str) -> Option<&NodeGroup> { self.node_groups.get(name) }

    pub fn has_node_group(&self, name: &str) -> bool { self.node_groups.contains_key(name) }

    pub fn has_edge_group(&self, name: &str) -> bool { self.edge_groups.contains_key(name) }

    /// Default export directory when no override is set: {temp_dir}/Drugnet/exports
    pub fn export_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push("Drugnet");
        p.push("exports");
        p
    }

    pub fn export_dir(&self) -> PathBuf {
        if let Some(p) = &self.export_override { return p.clone(); }
        Self::export_default_dir()
    }
}
