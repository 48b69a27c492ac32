use anyhow::{Context, Result};
use pipegraph_core::{CreateJobRequest, CreateJobResponse, JobId, StatusResponse};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        // no overall timeout: the event stream is long-lived
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn stream_url(&self, job: &JobId) -> String {
        format!("{}/stream/jobs/{}/stream", self.base, job)
    }

    pub fn status_url(&self, job: &JobId) -> String {
        format!("{}/jobs/{}/status", self.base, job)
    }

    pub fn create_url(&self) -> String {
        format!("{}/chat/initiate", self.base)
    }

    pub async fn create_job(&self, req: &CreateJobRequest) -> Result<CreateJobResponse> {
        let url = self.create_url();
        let resp = self
            .http
            .post(&url)
            .json(req)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?
            .error_for_status()
            .with_context(|| format!("POST {url}"))?;
        resp.json::<CreateJobResponse>()
            .await
            .with_context(|| format!("decode job creation response from {url}"))
    }

    pub async fn job_status(&self, job: &JobId) -> Result<StatusResponse> {
        let url = self.status_url(job);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        resp.json::<StatusResponse>()
            .await
            .with_context(|| format!("decode job status from {url}"))
    }

    pub async fn open_stream(&self, job: &JobId) -> Result<reqwest::Response> {
        let url = self.stream_url(job);
        self.http
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .with_context(|| format!("connect event stream {url}"))?
            .error_for_status()
            .with_context(|| format!("connect event stream {url}"))
    }
}
