//! Task protocol messages exchanged with downstream agents.

use serde::{Deserialize, Serialize};

/// Message discriminator for task requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskRequestKind {
    #[default]
    #[serde(rename = "task_request")]
    TaskRequest,
}

/// Message discriminator for task results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskResultKind {
    #[default]
    #[serde(rename = "task_result")]
    TaskResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn from_severity(severity: u32) -> Self {
        match severity {
            85.. => Self::Critical,
            70..=84 => Self::High,
            40..=69 => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// Outbound instruction for a target agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub kind: TaskRequestKind,
    pub id: String,
    pub from: String,
    pub priority: TaskPriority,
    pub task: String,
    pub context: TaskContext,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
}

/// Structured payload carried by a task request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContext {
    pub capability_id: String,
    pub recommendation_type: String,
    pub target_agent: String,
    pub entity_id: Option<String>,
    pub severity: u32,
    pub posture: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Success,
    Failure,
    Partial,
}

/// Result reported back by an agent. Consumed downstream, never produced here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub kind: TaskResultKind,
    pub task_id: String,
    pub from: String,
    pub status: TaskStatus,
    pub output: String,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    pub completed_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub path: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
}

impl TaskResult {
    /// Whether this result answers `request`
    pub fn answers(&self, request: &TaskRequest) -> bool {
        self.task_id == request.id
    }
}
