use pipegraph_core::{
    stage_key, JobId, JobStatus, MindMapData, NodeId, StageStatus, StatusResponse, StreamEvent,
};
use std::collections::HashMap;

use crate::net::IncomingKind;
use crate::stream::simulate::Simulator;

pub const RECONNECTING_MESSAGE: &str = "Connection lost. Reconnecting...";

#[derive(Debug, Clone, PartialEq)]
pub struct StageNode {
    pub id: NodeId,
    pub display_name: String,
    pub status: StageStatus,
    pub progress: u8,
    pub thought: Option<String>,
    pub error: Option<String>,
}

impl StageNode {
    pub fn pending(id: NodeId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            status: StageStatus::Pending,
            progress: 0,
            thought: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StageMap {
    stages: Vec<StageNode>,
    index: HashMap<NodeId, usize>,
}

impl StageMap {
    pub fn upsert(&mut self, node: StageNode) {
        match self.index.get(&node.id) {
            Some(&i) => self.stages[i] = node,
            None => {
                self.index.insert(node.id.clone(), self.stages.len());
                self.stages.push(node);
            }
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<&StageNode> {
        self.index.get(id).map(|&i| &self.stages[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &StageNode> {
        self.stages.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StageNode> {
        self.stages.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn clear(&mut self) {
        self.stages.clear();
        self.index.clear();
    }

    // halves round up
    pub fn mean_progress(&self) -> Option<u8> {
        if self.stages.is_empty() {
            return None;
        }
        let n = self.stages.len() as u64;
        let sum: u64 = self.stages.iter().map(|s| u64::from(s.progress)).sum();
        Some(((2 * sum + n) / (2 * n)) as u8)
    }

    pub fn all_completed(&self) -> bool {
        !self.stages.is_empty()
            && self
                .stages
                .iter()
                .all(|s| s.status == StageStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressSource {
    #[default]
    Server,
    StageMean,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Completion {
    pub job: Option<JobId>,
    pub final_report: Option<String>,
    pub mind_map: Option<MindMapData>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Nothing,
    Completed(Completion),
    JobFailed,
    StreamLost,
    StreamClosed,
}

#[derive(Debug, Clone, Default)]
pub struct JobStreamState {
    job: Option<JobId>,
    stages: StageMap,
    overall_progress: u8,
    status: JobStatus,
    is_connected: bool,
    is_complete: bool,
    last_error: Option<String>,
    progress_source: ProgressSource,
}

impl JobStreamState {
    pub fn new(job: Option<JobId>) -> Self {
        Self {
            job,
            ..Self::default()
        }
    }

    pub fn reset(&mut self, job: Option<JobId>) {
        *self = Self::new(job);
    }

    pub fn job(&self) -> Option<&JobId> {
        self.job.as_ref()
    }

    pub fn stages(&self) -> &StageMap {
        &self.stages
    }

    pub fn overall_progress(&self) -> u8 {
        self.overall_progress
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn progress_source(&self) -> ProgressSource {
        self.progress_source
    }

    pub fn is_terminal(&self) -> bool {
        self.is_complete || self.status == JobStatus::Failed
    }

    pub fn clear_stages(&mut self) {
        self.stages.clear();
    }

    pub fn apply(&mut self, kind: IncomingKind, sim: &mut Simulator) -> Applied {
        if self.is_complete {
            match kind {
                IncomingKind::TransportError(e) => {
                    tracing::debug!(error = %e, "transport error after completion suppressed");
                }
                other => tracing::debug!(?other, "message after completion ignored"),
            }
            return Applied::Nothing;
        }

        match kind {
            IncomingKind::Connected => {
                self.is_connected = true;
                Applied::Nothing
            }
            IncomingKind::Disconnected | IncomingKind::TransportError(_) => self.on_stream_lost(kind),
            IncomingKind::Malformed(e) => {
                tracing::warn!(job = ?self.job, error = %e, "dropping malformed stream event");
                Applied::Nothing
            }
            IncomingKind::Event(ev) => self.apply_event(ev),
            IncomingKind::Status(status) => self.apply_status(status),
            IncomingKind::PollFailed(e) => {
                tracing::debug!(error = %e, "status unavailable, simulating progress");
                self.simulate(sim)
            }
            IncomingKind::SimulateTick => self.simulate(sim),
        }
    }

    fn on_stream_lost(&mut self, kind: IncomingKind) -> Applied {
        self.is_connected = false;
        if self.status == JobStatus::Failed {
            // the job already failed; the server closing the stream is expected
            return Applied::Nothing;
        }
        match kind {
            IncomingKind::TransportError(e) => {
                tracing::warn!(job = ?self.job, error = %e, "event stream transport error");
            }
            _ => tracing::warn!(job = ?self.job, "event stream closed before completion"),
        }
        self.last_error = Some(RECONNECTING_MESSAGE.to_string());
        Applied::StreamLost
    }

    fn apply_event(&mut self, ev: StreamEvent) -> Applied {
        match ev {
            StreamEvent::Progress { progress, status } => {
                self.overall_progress = clamp_progress(progress);
                self.progress_source = ProgressSource::Server;
                // the backend reports "unknown" (read as pending) when it has no status
                if let Some(status) = status.filter(|s| *s != JobStatus::Pending) {
                    self.status = status;
                }
                Applied::Nothing
            }
            StreamEvent::NodeUpdate {
                node_id,
                node_name,
                status,
                progress,
                thought,
                error,
            } => {
                let display_name = node_name.unwrap_or_else(|| node_id.0.clone());
                self.stages.upsert(StageNode {
                    id: node_id,
                    display_name,
                    status,
                    progress: clamp_progress(progress),
                    thought,
                    error,
                });
                Applied::Nothing
            }
            StreamEvent::Complete {
                status,
                mind_map_data,
                final_report,
                error,
            } => {
                self.is_complete = true;
                self.is_connected = false;
                if status == Some(JobStatus::Failed) {
                    tracing::info!(job = ?self.job, error = ?error, "job finished as failed");
                    self.status = JobStatus::Failed;
                    self.last_error = error;
                    return Applied::JobFailed;
                }
                tracing::info!(job = ?self.job, "job completed");
                self.status = JobStatus::Completed;
                self.overall_progress = 100;
                self.last_error = None;
                Applied::Completed(Completion {
                    job: self.job.clone(),
                    final_report,
                    mind_map: mind_map_data,
                })
            }
            StreamEvent::Error { error } => {
                tracing::info!(job = ?self.job, error = ?error, "job reported failure");
                self.status = JobStatus::Failed;
                self.last_error = error;
                Applied::JobFailed
            }
            StreamEvent::End => {
                self.is_connected = false;
                Applied::StreamClosed
            }
        }
    }

    fn apply_status(&mut self, status: StatusResponse) -> Applied {
        if status.workers.is_empty() {
            self.overall_progress = clamp_progress(status.progress);
            self.progress_source = ProgressSource::Server;
        } else {
            for worker in status.workers {
                let id = stage_key(&worker.name);
                let thought = self.stages.get(&id).and_then(|s| s.thought.clone());
                self.stages.upsert(StageNode {
                    id,
                    display_name: worker.name,
                    status: worker.status,
                    progress: clamp_progress(worker.progress),
                    thought,
                    error: worker.error,
                });
            }
            self.recompute_from_stages();
        }

        match status.status {
            JobStatus::Completed => {
                let result = status.result.unwrap_or_default();
                self.status = JobStatus::Completed;
                self.overall_progress = 100;
                self.is_complete = true;
                self.last_error = None;
                tracing::info!(job = ?self.job, "job completed (polled)");
                Applied::Completed(Completion {
                    job: self.job.clone(),
                    final_report: result.summary,
                    mind_map: result.mind_map_data,
                })
            }
            JobStatus::Failed => {
                self.status = JobStatus::Failed;
                self.last_error = status.error;
                tracing::info!(job = ?self.job, error = ?self.last_error, "job failed (polled)");
                Applied::JobFailed
            }
            other => {
                self.status = other;
                Applied::Nothing
            }
        }
    }

    fn simulate(&mut self, sim: &mut Simulator) -> Applied {
        if self.status == JobStatus::Failed {
            return Applied::Nothing;
        }
        sim.seed_if_empty(&mut self.stages);
        sim.advance(&mut self.stages);
        self.recompute_from_stages();
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Processing;
        }

        if self.stages.is_empty() || self.stages.all_completed() {
            self.status = JobStatus::Completed;
            self.overall_progress = 100;
            self.is_complete = true;
            tracing::info!(job = ?self.job, "simulated job completed");
            return Applied::Completed(Completion {
                job: self.job.clone(),
                final_report: None,
                mind_map: None,
            });
        }
        Applied::Nothing
    }

    fn recompute_from_stages(&mut self) {
        if let Some(mean) = self.stages.mean_progress() {
            self.overall_progress = mean;
            self.progress_source = ProgressSource::StageMean;
        }
    }
}

fn clamp_progress(p: u32) -> u8 {
    p.min(100) as u8
}
