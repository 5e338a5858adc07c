use thiserror::Error;

// Diagnostics raised while ingesting config, remote payloads and task state.
// None of these abort graph construction; they are collected and logged.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ExplorerError {
    #[error("node group '{group}' has no usable attribute '{key}'")]
    Config { group: String, key: String },
    #[error("identifier '{identifier}' could not be mapped to a backend entity")]
    Mapping { identifier: String },
    #[error("analysis task {token} failed: {status}")]
    TaskFailure { token: String, status: String },
    #[error("dropped {from} -> {to}: {reason}")]
    NetworkBuild { from: String, to: String, reason: String },
}

impl ExplorerError {
    pub fn config(group: impl Into<String>, key: impl Into<String>) -> Self {
        ExplorerError::Config { group: group.into(), key: key.into() }
    }

    pub fn is_config(&self) -> bool { matches!(self, ExplorerError::Config { .. }) }
    pub fn is_mapping(&self) -> bool { matches!(self, ExplorerError::Mapping { .. }) }
}
