use pipegraph_core::JobId;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::net::{spawn_poller, spawn_stream, spawn_ticker, ApiClient, Incoming, ReaderHandle};
use crate::stream::simulate::Simulator;
use crate::stream::state::{Applied, Completion, JobStreamState};
use crate::util::config::{DataStrategy, ViewerConfig};

#[derive(Debug, Clone)]
pub struct TrackerOptions {
    pub strategy: DataStrategy,
    pub fallback_to_polling: bool,
    pub poll_interval: Duration,
    pub simulate_interval: Duration,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

impl TrackerOptions {
    pub fn from_config(cfg: &ViewerConfig) -> Self {
        Self {
            strategy: cfg.strategy,
            fallback_to_polling: cfg.fallback_to_polling,
            poll_interval: Duration::from_millis(cfg.poll_interval_ms.max(1)),
            simulate_interval: Duration::from_millis(cfg.simulate_interval_ms.max(1)),
        }
    }
}

pub struct JobTracker {
    api: ApiClient,
    opts: TrackerOptions,
    state: JobStreamState,
    sim: Simulator,
    generation: u64,
    tx: UnboundedSender<Incoming>,
    rx: UnboundedReceiver<Incoming>,
    stream: Option<ReaderHandle>,
    poller: Option<ReaderHandle>,
    ticker: Option<ReaderHandle>,
}

impl JobTracker {
    pub fn new(api: ApiClient, opts: TrackerOptions, sim: Simulator) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api,
            opts,
            state: JobStreamState::default(),
            sim,
            generation: 0,
            tx,
            rx,
            stream: None,
            poller: None,
            ticker: None,
        }
    }

    pub fn state(&self) -> &JobStreamState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active_job(&self) -> Option<&JobId> {
        self.state.job()
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    pub fn is_simulating(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn set_job(&mut self, job: Option<JobId>) {
        self.teardown();
        self.state.reset(job.clone());
        let Some(job) = job else {
            return;
        };
        match self.opts.strategy {
            DataStrategy::Stream => {
                tracing::info!(%job, generation = self.generation, "attaching event stream");
                let task = spawn_stream(self.api.clone(), job, self.generation, self.tx.clone());
                self.stream = Some(ReaderHandle::new(task));
            }
            DataStrategy::Poll => self.start_polling(),
        }
    }

    pub fn simulate_job(&mut self, job: JobId) {
        self.teardown();
        tracing::info!(%job, "no backend available, simulating progress");
        self.state.reset(Some(job));
        self.start_simulating();
    }

    pub fn clear_stages(&mut self) {
        self.state.clear_stages();
    }

    pub fn pump(&mut self) -> Option<Completion> {
        let mut completion = None;
        while let Ok(inc) = self.rx.try_recv() {
            if let Applied::Completed(c) = self.handle(inc) {
                completion = Some(c);
            }
        }
        completion
    }

    pub async fn next_update(&mut self) -> Applied {
        match self.rx.recv().await {
            Some(inc) => self.handle(inc),
            None => Applied::Nothing,
        }
    }

    pub fn handle(&mut self, inc: Incoming) -> Applied {
        if inc.generation != self.generation {
            tracing::debug!(
                stale = inc.generation,
                current = self.generation,
                "dropping message from a previous job"
            );
            return Applied::Nothing;
        }

        let applied = self.state.apply(inc.kind, &mut self.sim);
        match &applied {
            Applied::Completed(_) => self.stop_tasks(),
            Applied::JobFailed => {
                self.poller = None;
                self.ticker = None;
            }
            Applied::StreamLost | Applied::StreamClosed => {
                self.stream = None;
                if !self.state.is_terminal() {
                    if self.opts.fallback_to_polling {
                        self.start_polling();
                    } else {
                        // no status source left; keep the job moving locally
                        tracing::info!(job = ?self.state.job(), "polling disabled, simulating progress");
                        self.start_simulating();
                    }
                }
            }
            Applied::Nothing => {}
        }
        applied
    }

    fn start_polling(&mut self) {
        if self.poller.is_some() {
            return;
        }
        let Some(job) = self.state.job().cloned() else {
            return;
        };
        let task = spawn_poller(
            self.api.clone(),
            job,
            self.opts.poll_interval,
            self.generation,
            self.tx.clone(),
        );
        self.poller = Some(ReaderHandle::new(task));
    }

    fn start_simulating(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        let task = spawn_ticker(self.opts.simulate_interval, self.generation, self.tx.clone());
        self.ticker = Some(ReaderHandle::new(task));
    }

    fn stop_tasks(&mut self) {
        self.stream = None;
        self.poller = None;
        self.ticker = None;
    }

    fn teardown(&mut self) {
        self.stop_tasks();
        self.generation += 1;
    }
}
