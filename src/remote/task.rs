use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExplorerError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskTarget {
    #[default]
    #[serde(rename = "drug")]
    Drug,
    #[serde(rename = "drug-target")]
    DrugTarget,
}

impl TaskTarget {
    pub fn label(self) -> &'static str {
        match self {
            TaskTarget::Drug => "drug",
            TaskTarget::DrugTarget => "drug-target",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskInfo {
    pub target: TaskTarget,
    pub algorithm: String,
    pub parameters: Value,
    pub progress: f32,
    pub status: Option<String>,
    pub created_at: Option<String>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub done: bool,
    pub failed: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskStats {
    pub queue_position: usize,
    pub queue_length: usize,
}

/// Remote analysis task as reported by `GET task?token`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub token: String,
    #[serde(default)]
    pub info: TaskInfo,
    #[serde(default)]
    pub stats: TaskStats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Done,
    Failed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TaskTransition {
    Unchanged,
    Progress(f32),
    Completed,
    Failed(ExplorerError),
}

/// Local view of a polled task. Terminal states are reached exactly once;
/// later polls never leave them.
#[derive(Clone, Debug)]
pub struct TaskHandle {
    pub token: String,
    pub state: TaskState,
    pub last: Option<Task>,
}

impl TaskHandle {
    pub fn new(token: impl Into<String>) -> Self {
        TaskHandle { token: token.into(), state: TaskState::Running, last: None }
    }

    pub fn is_terminal(&self) -> bool { self.state != TaskState::Running }
    pub fn progress(&self) -> f32 { self.last.as_ref().map_or(0.0, |t| t.info.progress) }
    pub fn algorithm(&self) -> Option<&str> { self.last.as_ref().map(|t| t.info.algorithm.as_str()) }

    pub fn observe(&mut self, task: Task) -> TaskTransition {
        if self.is_terminal() {
            return TaskTransition::Unchanged;
        }
        let previous = self.progress();
        let transition = if task.info.failed {
            self.state = TaskState::Failed;
            let status = task.info.status.clone().unwrap_or_else(|| "unknown error".to_string());
            TaskTransition::Failed(ExplorerError::TaskFailure { token: self.token.clone(), status })
        } else if task.info.done {
            self.state = TaskState::Done;
            TaskTransition::Completed
        } else if self.last.is_none() || task.info.progress != previous {
            TaskTransition::Progress(task.info.progress)
        } else {
            TaskTransition::Unchanged
        };
        match &transition {
            TaskTransition::Completed => log::info!("task {} done", self.token),
            TaskTransition::Failed(err) => log::info!("{err}"),
            _ => {}
        }
        self.last = Some(task);
        transition
    }
}
