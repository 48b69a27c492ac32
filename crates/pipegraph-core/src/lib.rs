use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// "Patent Landscape" -> "patent_landscape", as the backend keys node updates
pub fn stage_key(name: &str) -> NodeId {
    NodeId(name.to_lowercase().replace(' ', "_"))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[serde(alias = "started", alias = "in_progress", alias = "running")]
    Processing,
    Completed,
    #[serde(alias = "cancelled")]
    Failed,
    // unknown strings land here too
    #[default]
    #[serde(other)]
    Pending,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[serde(alias = "in_progress", alias = "processing")]
    Running,
    Completed,
    Failed,
    #[default]
    #[serde(other)]
    Pending,
}

// ---------------- Event stream ----------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Progress {
        #[serde(default)]
        progress: u32,
        #[serde(default)]
        status: Option<JobStatus>,
    },
    NodeUpdate {
        node_id: NodeId,
        #[serde(default)]
        node_name: Option<String>,
        #[serde(default)]
        status: StageStatus,
        #[serde(default)]
        progress: u32,
        #[serde(default)]
        thought: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
    Complete {
        #[serde(default)]
        status: Option<JobStatus>,
        #[serde(default)]
        mind_map_data: Option<MindMapData>,
        #[serde(default)]
        final_report: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
    Error {
        #[serde(default, alias = "message")]
        error: Option<String>,
    },
    End,
}

impl StreamEvent {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::NodeUpdate { .. } => "node_update",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
            Self::End => "end",
        }
    }
}

// ---------------- Status pull ----------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerStatus {
    pub name: String,
    #[serde(default)]
    pub status: StageStatus,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobResult {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub mind_map_data: Option<MindMapData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub workers: Vec<WorkerStatus>,
    #[serde(default)]
    pub result: Option<JobResult>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

// ---------------- Job creation ----------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalysisOptions {
    pub include_patents: bool,
    pub include_clinical_trials: bool,
    pub include_market_data: bool,
    pub include_web_intel: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_patents: true,
            include_clinical_trials: true,
            include_market_data: true,
            include_web_intel: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateJobRequest {
    pub query: String,
    pub options: AnalysisOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateJobResponse {
    pub job_id: JobId,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub message: Option<String>,
}

// ---------------- Mind map payload ----------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Disease,
    Molecule,
    Product,
    Company,
    Category,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MindMapNode {
    pub id: NodeId,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
    #[serde(rename = "parentId", alias = "parent_id", default)]
    pub parent_id: Option<NodeId>,
    // None = payload carries no hierarchy for this node; Some(vec![]) = explicit leaf
    #[serde(rename = "childIds", alias = "child_ids", default)]
    pub child_ids: Option<Vec<NodeId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MindMapEdge {
    #[serde(default)]
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MindMapData {
    #[serde(default)]
    pub nodes: Vec<MindMapNode>,
    #[serde(default)]
    pub edges: Vec<MindMapEdge>,
}

impl MindMapData {
    pub fn is_hierarchical(&self) -> bool {
        self.nodes
            .iter()
            .any(|n| n.parent_id.is_some() || n.child_ids.is_some())
    }
}
