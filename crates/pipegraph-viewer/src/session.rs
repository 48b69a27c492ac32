use anyhow::Result;
use pipegraph_core::{AnalysisOptions, CreateJobRequest, JobId};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::graph::GraphState;
use crate::net::ApiClient;
use crate::stream::{Applied, Completion, JobStreamState, JobTracker, Simulator, StageNode, TrackerOptions};
use crate::util::config::ViewerConfig;

pub struct Session {
    api: ApiClient,
    tracker: JobTracker,
    graph: GraphState,
    sidebar_open: bool,
    final_report: Option<String>,
    demo_fallback: bool,
}

impl Session {
    pub fn from_config(cfg: &ViewerConfig) -> Result<Self> {
        let api = ApiClient::new(&cfg.api_base_url)?;
        let tracker = JobTracker::new(
            api.clone(),
            TrackerOptions::from_config(cfg),
            Simulator::new(cfg.simulated_stages.clone()),
        );
        let graph = GraphState::new(cfg.layout_direction, cfg.max_visible_nodes);
        Ok(Self::new(api, tracker, graph, cfg.sidebar_open_on_start, cfg.demo_fallback))
    }

    pub fn new(
        api: ApiClient,
        tracker: JobTracker,
        graph: GraphState,
        sidebar_open: bool,
        demo_fallback: bool,
    ) -> Self {
        Self {
            api,
            tracker,
            graph,
            sidebar_open,
            final_report: None,
            demo_fallback,
        }
    }

    // ----- Job lifecycle -----

    pub async fn start_job(&mut self, query: &str, options: AnalysisOptions) -> Result<JobId> {
        self.reset_results();
        let req = CreateJobRequest {
            query: query.to_string(),
            options,
        };
        let job = match self.api.create_job(&req).await {
            Ok(resp) => {
                tracing::info!(job = %resp.job_id, status = ?resp.status, "job created");
                self.tracker.set_job(Some(resp.job_id.clone()));
                resp.job_id
            }
            Err(e) if self.demo_fallback => {
                tracing::warn!(error = %e, "job creation failed, falling back to simulation");
                return Ok(self.start_demo());
            }
            Err(e) => return Err(e),
        };
        self.sidebar_open = true;
        Ok(job)
    }

    pub fn start_demo(&mut self) -> JobId {
        self.reset_results();
        let job = local_job_id();
        self.tracker.simulate_job(job.clone());
        self.sidebar_open = true;
        job
    }

    pub fn attach(&mut self, job: Option<JobId>) {
        self.reset_results();
        self.tracker.set_job(job);
    }

    pub fn pump(&mut self) -> Option<Completion> {
        let done = self.tracker.pump()?;
        self.install(done.clone());
        Some(done)
    }

    pub async fn next_update(&mut self) -> Applied {
        let applied = self.tracker.next_update().await;
        if let Applied::Completed(done) = &applied {
            self.install(done.clone());
        }
        applied
    }

    fn install(&mut self, done: Completion) {
        if let Some(data) = done.mind_map {
            // the finished job's stage cards must not bleed into the next view
            self.clear_pipeline_nodes();
            self.graph.replace(data);
        }
        self.final_report = done.final_report;
    }

    fn reset_results(&mut self) {
        self.final_report = None;
        self.graph.clear();
    }

    // ----- Sidebar actions -----

    pub fn open_sidebar(&mut self) {
        self.sidebar_open = true;
    }

    pub fn close_sidebar(&mut self) {
        self.sidebar_open = false;
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    pub fn is_sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn clear_pipeline_nodes(&mut self) {
        self.tracker.clear_stages();
    }

    pub fn clear(&mut self) {
        self.tracker.set_job(None);
        self.reset_results();
        self.sidebar_open = false;
    }

    // ----- Read access -----

    pub fn job(&self) -> &JobStreamState {
        self.tracker.state()
    }

    pub fn stages(&self) -> impl Iterator<Item = &StageNode> {
        self.tracker.state().stages().iter()
    }

    pub fn final_report(&self) -> Option<&str> {
        self.final_report.as_deref()
    }

    pub fn graph(&self) -> &GraphState {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut GraphState {
        &mut self.graph
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }
}

fn local_job_id() -> JobId {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    JobId(format!("local_{ms}"))
}
